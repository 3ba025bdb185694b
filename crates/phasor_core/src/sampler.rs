//! Dot sampling: reduces a trajectory to the fixed-stride subsequence used
//! for static markers. Sampling never interpolates; dots are existing
//! trajectory states.

use crate::trajectory::State;

/// Stride used when the spacing attribute resolves to something unusable.
pub const DEFAULT_STRIDE: usize = 60;

/// Converts a spacing attribute into an index stride.
///
/// A fraction strictly between 0 and 1 means "fraction of the trajectory
/// length" and yields a stride of at least 1. Values of 1 or more are used
/// directly as integer strides. Anything else (zero, negative, NaN) falls
/// back to [`DEFAULT_STRIDE`].
pub fn stride_for(len: usize, spacing: f64) -> usize {
    if spacing > 0.0 && spacing < 1.0 {
        ((len as f64 * spacing).floor() as usize).max(1)
    } else if spacing >= 1.0 {
        spacing.floor() as usize
    } else {
        DEFAULT_STRIDE
    }
}

/// Samples the trajectory at indices `0, stride, 2·stride, ...`.
///
/// Index 0 is always included; the final trajectory index is not
/// guaranteed to be.
pub fn sample(trajectory: &[State], spacing: f64) -> Vec<State> {
    if trajectory.is_empty() {
        return Vec::new();
    }
    let stride = stride_for(trajectory.len(), spacing);
    trajectory.iter().step_by(stride).copied().collect()
}
