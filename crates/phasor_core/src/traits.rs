use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in the integration kernels.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A two-variable autonomous vector field: (x, y) -> (dx/dt, dy/dt).
///
/// The curve model is fixed at exactly two coupled state variables, so the
/// state is a `[T; 2]` rather than a slice. Derivative formulas range over
/// `x`, `y` and parameters only; time never appears.
pub trait PlaneSystem<T: Scalar> {
    /// Evaluates the vector field.
    /// state: current (x, y)
    /// out: buffer to write (dx/dt, dy/dt)
    fn apply(&self, state: &[T; 2], out: &mut [T; 2]);
}

/// A trait for solvers that can step a system forward.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt, updating `state` in place.
    fn step(&mut self, system: &impl PlaneSystem<T>, state: &mut [T; 2], dt: T);
}
