use crate::traits::{PlaneSystem, Scalar, Steppable};

/// Classic Runge-Kutta 4th order solver over plane states.
pub struct Rk4<T: Scalar> {
    k1: [T; 2],
    k2: [T; 2],
    k3: [T; 2],
    k4: [T; 2],
    tmp: [T; 2],
}

impl<T: Scalar> Rk4<T> {
    pub fn new() -> Self {
        let z = T::zero();
        Self {
            k1: [z; 2],
            k2: [z; 2],
            k3: [z; 2],
            k4: [z; 2],
            tmp: [z; 2],
        }
    }
}

impl<T: Scalar> Default for Rk4<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> Steppable<T> for Rk4<T> {
    fn step(&mut self, system: &impl PlaneSystem<T>, state: &mut [T; 2], dt: T) {
        let half = T::from_f64(0.5).unwrap();
        let sixth = T::from_f64(1.0 / 6.0).unwrap();
        let two = T::from_f64(2.0).unwrap();

        // k1 = f(y)
        system.apply(state, &mut self.k1);

        // k2 = f(y + dt*k1/2)
        for i in 0..2 {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        system.apply(&self.tmp, &mut self.k2);

        // k3 = f(y + dt*k2/2)
        for i in 0..2 {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        system.apply(&self.tmp, &mut self.k3);

        // k4 = f(y + dt*k3)
        for i in 0..2 {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        system.apply(&self.tmp, &mut self.k4);

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..2 {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// dx/dt = 1, dy/dt = 0.
    struct Drift;

    impl PlaneSystem<f64> for Drift {
        fn apply(&self, _state: &[f64; 2], out: &mut [f64; 2]) {
            out[0] = 1.0;
            out[1] = 0.0;
        }
    }

    /// dx/dt = y, dy/dt = -x: the unit circle.
    struct Rotation;

    impl PlaneSystem<f64> for Rotation {
        fn apply(&self, state: &[f64; 2], out: &mut [f64; 2]) {
            out[0] = state[1];
            out[1] = -state[0];
        }
    }

    #[test]
    fn constant_field_integrates_exactly() {
        let mut solver = Rk4::new();
        let mut state = [0.0, 0.0];
        for _ in 0..10 {
            solver.step(&Drift, &mut state, 0.1);
        }
        assert_abs_diff_eq!(state[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rotation_returns_to_start_after_full_period() {
        let mut solver = Rk4::new();
        let mut state = [1.0, 0.0];
        let dt = 0.01;
        let steps = (std::f64::consts::TAU / dt).round() as usize;
        for _ in 0..steps {
            solver.step(&Rotation, &mut state, dt);
        }
        assert_abs_diff_eq!(state[0], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(state[1], 0.0, epsilon = 1e-3);
    }

    #[test]
    fn works_with_f32_scalars() {
        let mut solver: Rk4<f32> = Rk4::new();

        struct Decay;
        impl PlaneSystem<f32> for Decay {
            fn apply(&self, state: &[f32; 2], out: &mut [f32; 2]) {
                out[0] = -state[0];
                out[1] = 0.0;
            }
        }

        let mut state = [1.0f32, 0.0];
        for _ in 0..100 {
            solver.step(&Decay, &mut state, 0.01);
        }
        // e^-1 after unit time
        assert_abs_diff_eq!(state[0], (-1.0f32).exp(), epsilon = 1e-4);
    }
}
