//! Narrow interfaces to the host rendering stack. The engine works in data
//! coordinates; a `Scale` maps them onto the surface, and a `Surface` is an
//! opaque sink for the dot and marker primitives a curve owns.

use phasor_core::trajectory::State;
use serde::{Deserialize, Serialize};

/// Maps a data coordinate onto the rendering surface.
pub trait Scale {
    fn to_screen(&self, state: State) -> (f64, f64);
}

/// Passes data coordinates through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityScale;

impl Scale for IdentityScale {
    fn to_screen(&self, state: State) -> (f64, f64) {
        (state.x, state.y)
    }
}

/// Affine data-to-screen mapping, one factor and offset per axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinearScale {
    pub sx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Scale for LinearScale {
    fn to_screen(&self, state: State) -> (f64, f64) {
        (state.x * self.sx + self.tx, state.y * self.sy + self.ty)
    }
}

/// Styling for the static dot markers.
#[derive(Debug, Clone, PartialEq)]
pub struct DotStyle {
    pub radius: f64,
    pub color: String,
}

/// Styling for the moving marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub radius: f64,
    pub color: String,
}

/// The rendering sink for one curve: a set of static dots and at most one
/// moving marker. Implementations own the actual drawing primitives
/// (SVG, canvas, a test recorder); the curve only pushes screen
/// coordinates and styles through.
pub trait Surface {
    /// Replaces the rendered dot set.
    fn draw_dots(&mut self, dots: &[(f64, f64)], style: &DotStyle);
    /// Removes all rendered dots.
    fn clear_dots(&mut self);
    /// Places or repositions the moving marker.
    fn move_marker(&mut self, pos: (f64, f64), style: &MarkerStyle);
    /// Removes the moving marker if present.
    fn remove_marker(&mut self);
}
