//! Example of step response of a spring-damper system under PID control
//! This example requires the `--features simulation` flag to be enabled.
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
pub fn main() {
    use core::cell::Cell;
    use std::time::Duration;

    use nalgebra as na;

    use linked_pid::pid::{Mode, PidConfigBuilder, PidController, ProcessLinks};
    use linked_pid::sim::{SpringDamperPlant, StepSignal};

    const FIXED_STEP_SIZE_S: f32 = 0.01;

    let input = Cell::new(0.0f32);
    let output = Cell::new(0.0f32);
    let setpoint = Cell::new(0.0f32);

    let config = PidConfigBuilder::default()
        .kp(1.0)
        .ki(2.0)
        .kd(0.05)
        .sample_time(Duration::from_millis(10))
        .output_limits(-10.0, 10.0)
        .build()
        .unwrap();
    let mut pid = PidController::new(
        ProcessLinks::new(&input, &output, &setpoint),
        config,
    );
    pid.set_mode(Mode::ExternallyClocked);

    let plant = SpringDamperPlant {
        natural_frequency: 2.0 * core::f32::consts::PI,
        damping_ratio: 0.7,
    };
    let reference = StepSignal {
        amplitude: 1.0,
        step_time: 0.1,
    };

    let mut state = na::Vector2::<f32>::zeros();

    println!("{:>8} {:>10} {:>12} {:>10}", "t [s]", "setpoint", "measurement", "control");
    for i in 0..500usize {
        let time = i as f32 * FIXED_STEP_SIZE_S;
        setpoint.set(reference.value(time));
        input.set(plant.measure(state));
        pid.compute();
        state = plant.step(state, output.get(), FIXED_STEP_SIZE_S);

        if i % 10 == 0 {
            println!(
                "{:8.2} {:10.3} {:12.4} {:10.4}",
                time,
                setpoint.get(),
                input.get(),
                output.get()
            );
        }
    }
}

#[cfg(not(feature = "simulation"))]
fn main() {
    eprintln!("This example requires `--features simulation` to run.");
}
