use nalgebra as na;

/// A unit-mass spring-damper plant, the classic second-order testbed.
///
/// Position tracks the control effort with unity DC gain, so a converged
/// loop settles at `position == setpoint`.
pub struct SpringDamperPlant {
    /// Undamped natural frequency in rad/s.
    pub natural_frequency: f32,
    /// Dimensionless damping ratio.
    pub damping_ratio: f32,
}

impl SpringDamperPlant {
    /// State derivative for state `[position, velocity]` under control
    /// effort `u`:
    /// ┌     ┐   ┌              ┐┌    ┐   ┌     ┐
    /// │ p'  │ = │  0     1     ││ p  │ + │ 0   │ u
    /// │ p'' │   │  -ωₙ²  -2ζωₙ ││ p' │   │ ωₙ² │
    /// └     ┘   └              ┘└    ┘   └     ┘
    pub fn derivative(&self, state: na::Vector2<f32>, u: f32) -> na::Vector2<f32> {
        let omega_sq = self.natural_frequency * self.natural_frequency;
        let two_zeta_omega = 2.0 * self.damping_ratio * self.natural_frequency;

        let dynamics = na::Matrix2::new(0.0, 1.0, -omega_sq, -two_zeta_omega);
        let actuation = na::Vector2::new(0.0, omega_sq);

        dynamics * state + actuation * u
    }

    /// Advances the state by `dt` seconds with one forward-Euler step.
    pub fn step(&self, state: na::Vector2<f32>, u: f32, dt: f32) -> na::Vector2<f32> {
        state + self.derivative(state, u) * dt
    }

    /// Measured output: the position component.
    pub fn measure(&self, state: na::Vector2<f32>) -> f32 {
        state[0]
    }
}

/// A step reference: zero before `step_time` seconds, `amplitude` after.
pub struct StepSignal {
    /// Level after the step.
    pub amplitude: f32,
    /// Time of the step in seconds.
    pub step_time: f32,
}

impl StepSignal {
    /// The reference value at `time` seconds.
    pub fn value(&self, time: f32) -> f32 {
        if time < self.step_time {
            0.0
        } else {
            self.amplitude
        }
    }
}
