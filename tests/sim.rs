// Copyright © 2026 The linked_pid developers
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.


#[cfg(feature = "simulation")]
mod test_closed_loop_behavior {
    use super::fixtures::test_pid::ProcessCells;

    use core::time::Duration;

    use linked_pid::pid::{Mode, PidConfigBuilder, PidController};
    use linked_pid::sim::{SpringDamperPlant, StepSignal};

    use approx::assert_relative_eq;
    use nalgebra as na;

    const DT: f32 = 0.01;

    /// Drives one plant step per controller sample, writing the
    /// measurement and reference back into the linked cells.
    fn run_loop(
        pid: &mut PidController<f32>,
        cells: &ProcessCells,
        plant: &SpringDamperPlant,
        reference: &StepSignal,
        state: &mut na::Vector2<f32>,
        start: f32,
        steps: usize,
    ) {
        let (out_min, out_max) = (pid.output_min(), pid.output_max());
        for i in 0..steps {
            let time = start + i as f32 * DT;
            cells.setpoint.set(reference.value(time));
            cells.input.set(plant.measure(*state));
            assert!(pid.compute());

            let u = cells.output.get();
            assert!(
                (out_min..=out_max).contains(&u),
                "control effort {u} left the output limits at t = {time}"
            );
            *state = plant.step(*state, u, DT);
        }
    }

    /// A PI-D loop around a well-damped unity-gain plant must settle on
    /// the reference: the plant's DC gain is one, so any residual error
    /// would keep the integrator moving.
    #[test]
    fn test_step_response_settles_on_the_setpoint() {
        let cells = ProcessCells::new(0.0, 0.0, 0.0);
        let config = PidConfigBuilder::default()
            .kp(1.0)
            .ki(2.0)
            .kd(0.05)
            .sample_time(Duration::from_millis(10))
            .output_limits(-10.0, 10.0)
            .build()
            .unwrap();
        let mut pid = PidController::new(cells.links(), config);
        pid.set_mode(Mode::ExternallyClocked);

        let plant = SpringDamperPlant {
            natural_frequency: 2.0 * core::f32::consts::PI,
            damping_ratio: 0.7,
        };
        let reference = StepSignal {
            amplitude: 1.0,
            step_time: 0.0,
        };

        let mut state = na::Vector2::zeros();
        run_loop(&mut pid, &cells, &plant, &reference, &mut state, 0.0, 3000);

        assert_relative_eq!(plant.measure(state), 1.0, epsilon = 2e-2);
    }

    /// With the actuator pinned well below the reference, the loop rides
    /// the upper output limit and the plant settles at the limit. Once the
    /// reference drops back inside the achievable range the anti-windup
    /// must let the loop follow it without a long unwinding tail.
    #[test]
    fn test_saturated_loop_recovers_after_the_reference_drops() {
        let cells = ProcessCells::new(0.0, 0.0, 0.0);
        let config = PidConfigBuilder::default()
            .kp(1.0)
            .ki(2.0)
            .kd(0.05)
            .sample_time(Duration::from_millis(10))
            .output_limits(0.0, 0.3)
            .build()
            .unwrap();
        let mut pid = PidController::new(cells.links(), config);
        pid.set_mode(Mode::ExternallyClocked);

        let plant = SpringDamperPlant {
            natural_frequency: 2.0 * core::f32::consts::PI,
            damping_ratio: 0.7,
        };

        // Phase 1: an unreachable reference. The loop saturates at 0.3 and
        // the plant, having unity DC gain, settles there too.
        let unreachable = StepSignal {
            amplitude: 1.0,
            step_time: 0.0,
        };
        let mut state = na::Vector2::zeros();
        run_loop(
            &mut pid,
            &cells,
            &plant,
            &unreachable,
            &mut state,
            0.0,
            1500,
        );
        assert_relative_eq!(plant.measure(state), 0.3, epsilon = 2e-2);
        assert_relative_eq!(cells.output.get(), 0.3, epsilon = 1e-3);

        // Phase 2: drop the reference into the achievable range and let
        // the loop track it back down.
        let achievable = StepSignal {
            amplitude: 0.2,
            step_time: 0.0,
        };
        run_loop(
            &mut pid,
            &cells,
            &plant,
            &achievable,
            &mut state,
            15.0,
            1500,
        );
        assert_relative_eq!(plant.measure(state), 0.2, epsilon = 2e-2);
    }
}
