//! Curve configuration and its per-tick resolution.
//!
//! Every visual and behavioral option may be a literal or an expression
//! over the scope namespaces. `DisplayState::resolve` re-evaluates all of
//! them on each update tick; nothing is cached across ticks, since any
//! attribute may depend on parameters that do not trigger trajectory
//! regeneration.

use crate::surface::{DotStyle, MarkerStyle};
use phasor_core::attr::{self, Attr};
use phasor_core::scope::Scope;
use phasor_core::trajectory::TrajectoryConfig;
use serde::{Deserialize, Serialize};

/// Options of one animated ODE curve, as they appear in a diagram
/// definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveOptions {
    #[serde(flatten)]
    pub trajectory: TrajectoryConfig,
    #[serde(default = "default_show_dots")]
    pub show_dots: Attr,
    #[serde(default = "default_dot_spacing")]
    pub dot_spacing: Attr,
    #[serde(default = "default_dot_radius")]
    pub dot_radius: Attr,
    #[serde(default = "default_dot_color")]
    pub dot_color: Attr,
    #[serde(default = "default_animation")]
    pub animation: Attr,
    #[serde(default = "default_speed")]
    pub speed: Attr,
    #[serde(default = "default_moving_dot_color")]
    pub moving_dot_color: Attr,
    #[serde(default = "default_moving_dot_radius")]
    pub moving_dot_radius: Attr,
    /// Settle delay before a (re)armed animation starts, in milliseconds.
    #[serde(default = "default_restart_delay")]
    pub restart_delay: Attr,
}

fn default_show_dots() -> Attr {
    Attr::Bool(false)
}

fn default_dot_spacing() -> Attr {
    Attr::Number(60.0)
}

fn default_dot_radius() -> Attr {
    Attr::Number(3.0)
}

fn default_dot_color() -> Attr {
    Attr::from("#555555")
}

fn default_animation() -> Attr {
    Attr::Bool(false)
}

fn default_speed() -> Attr {
    Attr::Number(1.0)
}

fn default_moving_dot_color() -> Attr {
    Attr::from("#cc3333")
}

fn default_moving_dot_radius() -> Attr {
    Attr::Number(5.0)
}

fn default_restart_delay() -> Attr {
    Attr::Number(1000.0)
}

impl CurveOptions {
    pub fn new(trajectory: TrajectoryConfig) -> Self {
        Self {
            trajectory,
            show_dots: default_show_dots(),
            dot_spacing: default_dot_spacing(),
            dot_radius: default_dot_radius(),
            dot_color: default_dot_color(),
            animation: default_animation(),
            speed: default_speed(),
            moving_dot_color: default_moving_dot_color(),
            moving_dot_radius: default_moving_dot_radius(),
            restart_delay: default_restart_delay(),
        }
    }
}

/// The options resolved against one tick's scope.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub show_dots: bool,
    pub dot_spacing: f64,
    pub dot_style: DotStyle,
    pub animation: bool,
    pub speed: f64,
    pub marker_style: MarkerStyle,
    pub restart_delay_ms: f64,
}

impl DisplayState {
    pub fn resolve(options: &CurveOptions, scope: &Scope) -> Self {
        Self {
            show_dots: attr::evaluate(&options.show_dots, scope).as_bool(false),
            dot_spacing: attr::evaluate(&options.dot_spacing, scope).as_f64(60.0),
            dot_style: DotStyle {
                radius: attr::evaluate(&options.dot_radius, scope).as_f64(3.0),
                color: attr::evaluate(&options.dot_color, scope).as_color("#555555"),
            },
            animation: attr::evaluate(&options.animation, scope).as_bool(false),
            speed: attr::evaluate(&options.speed, scope).as_f64(1.0),
            marker_style: MarkerStyle {
                radius: attr::evaluate(&options.moving_dot_radius, scope).as_f64(5.0),
                color: attr::evaluate(&options.moving_dot_color, scope).as_color("#cc3333"),
            },
            restart_delay_ms: attr::evaluate(&options.restart_delay, scope).as_f64(1000.0),
        }
    }
}
