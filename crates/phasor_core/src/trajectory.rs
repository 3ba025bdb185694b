//! The ODE trajectory engine.
//!
//! Compiles the two derivative formulas against the live scope, integrates
//! them with fixed-step RK4 from a (possibly parameter-driven) initial
//! condition, and republishes the result behind a monotonic version
//! counter. Integration never fails: formulas that do not compile and
//! evaluations that go non-finite contribute a zero derivative for that
//! component, and the degradation is reported explicitly.

use crate::attr::{self, Attr};
use crate::formula::{self, Bytecode, Compiler, FormulaError, VM};
use crate::scope::{Scope, ScopeValue, Snapshot};
use crate::solvers::Rk4;
use crate::traits::{PlaneSystem, Steppable};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use tracing::{debug, warn};

/// A single integrated point of the trajectory, in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub x: f64,
    pub y: f64,
}

/// Static configuration of one ODE curve's integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryConfig {
    /// Formula for dx/dt over `x`, `y` and parameter names.
    pub dx: String,
    /// Formula for dy/dt over `x`, `y` and parameter names.
    pub dy: String,
    /// Initial condition; numbers or expressions over the scope. Overridden
    /// by the reserved parameters `px`/`py` when both are bound.
    #[serde(default)]
    pub x0: Attr,
    #[serde(default)]
    pub y0: Attr,
    /// Number of RK4 steps; the trajectory has `steps + 1` states.
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Fixed integration step size.
    #[serde(default = "default_dt")]
    pub dt: f64,
}

fn default_steps() -> usize {
    400
}

fn default_dt() -> f64 {
    0.05
}

impl TrajectoryConfig {
    pub fn validated(self) -> Result<Self> {
        if self.steps == 0 {
            bail!("steps must be greater than zero.");
        }
        if !(self.dt > 0.0) {
            bail!("dt must be positive.");
        }
        Ok(self)
    }
}

/// Per-component outcome of the last regeneration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DerivStatus {
    Ok,
    /// The formula did not compile; the component contributed zero
    /// everywhere.
    CompileError(String),
    /// The formula produced a non-finite value on `lapses` evaluations,
    /// each clamped to zero.
    NonFinite { lapses: usize },
}

/// Outcome of one `regenerate` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegenReport {
    pub version: u64,
    pub dx: DerivStatus,
    pub dy: DerivStatus,
}

/// Both derivative formulas compiled against one parameter snapshot.
///
/// Interior mutability mirrors the bytecode VM's scratch-stack pattern:
/// `apply` takes `&self`, so the stack and the degradation counters live in
/// cells. The field is rebuilt on every regeneration and never shared.
struct CompiledField {
    dx: Option<Bytecode>,
    dy: Option<Bytecode>,
    params: Vec<f64>,
    stack: RefCell<Vec<f64>>,
    lapses: [Cell<usize>; 2],
}

impl CompiledField {
    fn compile(dx_src: &str, dy_src: &str, scope: &Scope) -> (Self, [Option<FormulaError>; 2]) {
        let (param_names, params) = scope.numeric_params();
        let compiler = Compiler::new(&["x", "y"], &param_names);

        let compile_one = |src: &str| match formula::parse(src)
            .and_then(|expr| compiler.compile(&expr))
        {
            Ok(code) => (Some(code), None),
            Err(err) => {
                warn!(formula = src, error = %err, "derivative formula rejected, using 0");
                (None, Some(err))
            }
        };

        let (dx, dx_err) = compile_one(dx_src);
        let (dy, dy_err) = compile_one(dy_src);

        (
            Self {
                dx,
                dy,
                params,
                stack: RefCell::new(Vec::with_capacity(64)),
                lapses: [Cell::new(0), Cell::new(0)],
            },
            [dx_err, dy_err],
        )
    }

    fn component(&self, code: &Option<Bytecode>, state: &[f64; 2], index: usize) -> f64 {
        match code {
            Some(code) => {
                let value = VM::execute(code, state, &self.params, &mut self.stack.borrow_mut());
                if value.is_finite() {
                    value
                } else {
                    self.lapses[index].set(self.lapses[index].get() + 1);
                    0.0
                }
            }
            None => 0.0,
        }
    }
}

impl PlaneSystem<f64> for CompiledField {
    fn apply(&self, state: &[f64; 2], out: &mut [f64; 2]) {
        out[0] = self.component(&self.dx, state, 0);
        out[1] = self.component(&self.dy, state, 1);
    }
}

/// Owns the integrated trajectory of one ODE curve, plus the change
/// detection that decides when it must be rebuilt.
pub struct OdeTrajectory {
    config: TrajectoryConfig,
    data: Vec<State>,
    version: u64,
    last_start: Option<State>,
    last_params: Snapshot,
    last_report: Option<RegenReport>,
}

impl OdeTrajectory {
    pub fn new(config: TrajectoryConfig) -> Result<Self> {
        Ok(Self {
            config: config.validated()?,
            data: Vec::new(),
            version: 0,
            last_start: None,
            last_params: Snapshot::new(),
            last_report: None,
        })
    }

    /// The full trajectory, `steps + 1` states once generated.
    pub fn data(&self) -> &[State] {
        &self.data
    }

    /// Monotonic counter, bumped on every regeneration. Consumers compare
    /// versions instead of deep-comparing trajectories.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn last_report(&self) -> Option<&RegenReport> {
        self.last_report.as_ref()
    }

    pub fn config(&self) -> &TrajectoryConfig {
        &self.config
    }

    /// Resolves the initial condition for the current tick. The reserved
    /// parameters `px`/`py`, when both bound to numbers, override the
    /// configured pair.
    fn resolve_start(&self, scope: &Scope) -> State {
        let px = scope.param("px").and_then(ScopeValue::as_f64);
        let py = scope.param("py").and_then(ScopeValue::as_f64);
        if let (Some(x), Some(y)) = (px, py) {
            return State { x, y };
        }
        State {
            x: attr::evaluate(&self.config.x0, scope).as_f64(0.0),
            y: attr::evaluate(&self.config.y0, scope).as_f64(0.0),
        }
    }

    /// Rebuilds the whole trajectory from the current scope.
    ///
    /// The formulas are recompiled on every call so that parameter-dependent
    /// sub-expressions pick up current values. The result is a pure function
    /// of (initial condition, parameters, formulas, steps, dt); only the
    /// version counter carries history.
    pub fn regenerate(&mut self, scope: &Scope) -> RegenReport {
        let start = self.resolve_start(scope);
        let (field, compile_errors) =
            CompiledField::compile(&self.config.dx, &self.config.dy, scope);

        let mut solver = Rk4::new();
        let mut state = [start.x, start.y];
        self.data.clear();
        self.data.reserve(self.config.steps + 1);
        self.data.push(start);
        for _ in 0..self.config.steps {
            solver.step(&field, &mut state, self.config.dt);
            self.data.push(State {
                x: state[0],
                y: state[1],
            });
        }

        self.version += 1;
        let [dx_err, dy_err] = compile_errors;
        let report = RegenReport {
            version: self.version,
            dx: Self::status(dx_err, field.lapses[0].get()),
            dy: Self::status(dy_err, field.lapses[1].get()),
        };
        debug!(
            version = report.version,
            states = self.data.len(),
            "trajectory regenerated"
        );
        self.last_report = Some(report.clone());
        report
    }

    fn status(compile_error: Option<FormulaError>, lapses: usize) -> DerivStatus {
        match compile_error {
            Some(err) => DerivStatus::CompileError(err.to_string()),
            None if lapses > 0 => DerivStatus::NonFinite { lapses },
            None => DerivStatus::Ok,
        }
    }

    /// The update gate: regenerates only when forced, never generated, or
    /// when the resolved initial condition or the parameter snapshot
    /// changed (exact inequality, no tolerance). Returns whether the
    /// trajectory was rebuilt.
    pub fn update(&mut self, scope: &Scope, force: bool) -> bool {
        let start = self.resolve_start(scope);
        let params = scope.params_snapshot();

        let stale = force
            || self.data.is_empty()
            || self.last_start != Some(start)
            || self.last_params != params;

        if stale {
            self.regenerate(scope);
            self.last_start = Some(start);
            self.last_params = params;
        }
        stale
    }

    /// Nearest-earlier-sample lookup at integration time `t`; out-of-range
    /// values clamp to the first or last state. `None` only before the
    /// first generation.
    pub fn evaluate_at(&self, t: f64) -> Option<State> {
        if self.data.is_empty() {
            return None;
        }
        let raw = (t / self.config.dt).floor();
        let max = (self.data.len() - 1) as f64;
        let index = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, max) };
        Some(self.data[index as usize])
    }
}
