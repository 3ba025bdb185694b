use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value bound in one of the scope namespaces: a number (parameters,
/// calculated values) or a piece of text (color bindings, string parameters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeValue {
    Number(f64),
    Text(String),
}

impl ScopeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScopeValue::Number(n) => Some(*n),
            ScopeValue::Text(_) => None,
        }
    }
}

impl From<f64> for ScopeValue {
    fn from(value: f64) -> Self {
        ScopeValue::Number(value)
    }
}

impl From<&str> for ScopeValue {
    fn from(value: &str) -> Self {
        ScopeValue::Text(value.to_string())
    }
}

impl From<String> for ScopeValue {
    fn from(value: String) -> Self {
        ScopeValue::Text(value)
    }
}

/// A recorded copy of one namespace, used as the change-detection baseline.
pub type Snapshot = BTreeMap<String, ScopeValue>;

/// The live variable binding at one update tick: three disjoint namespaces
/// (parameters, calculated values, colors), each mapping name to value.
///
/// A scope is a read-only snapshot of the owning diagram's state. It is
/// rebuilt by the caller on every evaluation and never retained by the
/// engine beyond the recorded parameter baseline. `BTreeMap` storage keeps
/// iteration and snapshot comparison deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    params: BTreeMap<String, ScopeValue>,
    calcs: BTreeMap<String, ScopeValue>,
    colors: BTreeMap<String, ScopeValue>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_param(&mut self, name: &str, value: impl Into<ScopeValue>) {
        self.params.insert(name.to_string(), value.into());
    }

    pub fn set_calc(&mut self, name: &str, value: impl Into<ScopeValue>) {
        self.calcs.insert(name.to_string(), value.into());
    }

    pub fn set_color(&mut self, name: &str, value: impl Into<ScopeValue>) {
        self.colors.insert(name.to_string(), value.into());
    }

    /// Builder-style variants, convenient for tests and inline setup.
    pub fn with_param(mut self, name: &str, value: impl Into<ScopeValue>) -> Self {
        self.set_param(name, value);
        self
    }

    pub fn with_calc(mut self, name: &str, value: impl Into<ScopeValue>) -> Self {
        self.set_calc(name, value);
        self
    }

    pub fn with_color(mut self, name: &str, value: impl Into<ScopeValue>) -> Self {
        self.set_color(name, value);
        self
    }

    /// Resolves a bare identifier across the namespaces: parameters first,
    /// then calculated values, then colors.
    pub fn lookup(&self, name: &str) -> Option<&ScopeValue> {
        self.params
            .get(name)
            .or_else(|| self.calcs.get(name))
            .or_else(|| self.colors.get(name))
    }

    /// Looks up a parameter only (reserved names like `px`/`py` resolve
    /// strictly in the parameter namespace).
    pub fn param(&self, name: &str) -> Option<&ScopeValue> {
        self.params.get(name)
    }

    /// Clones the parameter namespace for the update gate's baseline.
    pub fn params_snapshot(&self) -> Snapshot {
        self.params.clone()
    }

    /// Names and values of the numeric parameters, in map order, for
    /// derivative compilation. Text-valued parameters are skipped; a formula
    /// that references one fails to compile and degrades to a zero
    /// derivative.
    pub fn numeric_params(&self) -> (Vec<String>, Vec<f64>) {
        let mut names = Vec::new();
        let mut values = Vec::new();
        for (name, value) in &self.params {
            if let Some(v) = value.as_f64() {
                names.push(name.clone());
                values.push(v);
            }
        }
        (names, values)
    }
}
