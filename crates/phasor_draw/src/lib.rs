//! The `phasor_draw` crate is the interactive layer over `phasor_core`:
//! per-tick option resolution, static dot rendering, and the debounced
//! real-time playback of a moving marker along the integrated trajectory.
//!
//! Key components:
//! - **Surface/Scale**: narrow interfaces to the host rendering stack.
//! - **Timeline**: an injected clock + cancellable task queue replacing
//!   host timer and display-refresh callbacks.
//! - **Options**: the dynamic attribute set of a curve and its per-tick
//!   resolution.
//! - **Curve**: the animated ODE curve driving all of the above.

pub mod curve;
pub mod options;
pub mod surface;
pub mod timeline;
