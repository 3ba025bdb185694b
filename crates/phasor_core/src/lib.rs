//! The `phasor_core` crate is the simulation engine behind Phasor's ODE
//! curves: derivative formulas compiled to bytecode, fixed-step RK4
//! integration, change detection, and dot sampling. It works purely in
//! data coordinates; rendering and playback live in `phasor_draw`.
//!
//! Key components:
//! - **Traits**: `Scalar` (numeric type abstraction), `PlaneSystem`
//!   (two-variable vector fields), `Steppable` (solvers).
//! - **Formula engine**: tokenizer, recursive-descent parser and a small
//!   bytecode VM for user-defined expressions.
//! - **Attributes**: dynamic attribute evaluation against the live scope.
//! - **Trajectory**: RK4 integration, versioning and the update gate.
//! - **Sampler**: fixed-stride dot subsequences for static markers.

pub mod attr;
pub mod formula;
pub mod sampler;
pub mod scope;
pub mod solvers;
pub mod traits;
pub mod trajectory;
