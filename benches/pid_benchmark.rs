//! Benchmark for the linked PID controller
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

use core::cell::Cell;
use core::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use linked_pid::pid::{Mode, PidConfig, PidConfigBuilder, PidController, ProcessLinks};
use linked_pid::time::FnClock;

fn make_config() -> PidConfig<f32> {
    PidConfigBuilder::default()
        .kp(1.0)
        .ki(0.5)
        .kd(0.1)
        .sample_time(Duration::from_millis(10))
        .output_limits(-10.0, 10.0)
        .build()
        .unwrap()
}

/// The externally clocked controller runs the control law on every call,
/// with no timestamp handling at all. This is the per-sample floor.
fn bench_externally_clocked_pid(c: &mut Criterion) {
    let input = Cell::new(0.9f32);
    let output = Cell::new(0.0f32);
    let setpoint = Cell::new(1.0f32);

    let mut pid = PidController::new(
        ProcessLinks::new(&input, &output, &setpoint),
        make_config(),
    );
    pid.set_mode(Mode::ExternallyClocked);

    c.bench_function("externally clocked PID", |b| {
        b.iter(|| {
            input.set(black_box(input.get() + 0.0001)); // prevent constant inputs
            pid.compute();
            black_box(output.get());
        });
    });
}

/// The time-gated controller pays for one clock query per call on top of
/// the control law. The synthetic clock advances one full sample period
/// per call, so every call passes the gate and runs the law.
fn bench_time_gated_pid(c: &mut Criterion) {
    let input = Cell::new(0.9f32);
    let output = Cell::new(0.0f32);
    let setpoint = Cell::new(1.0f32);

    let mut now = 0u64;
    let clock = FnClock(move || {
        now += 10_000;
        now
    });
    let mut pid = PidController::with_clock(
        ProcessLinks::new(&input, &output, &setpoint),
        make_config(),
        clock,
    );
    pid.set_mode(Mode::TimeGated);

    c.bench_function("time-gated PID", |b| {
        b.iter(|| {
            input.set(black_box(input.get() + 0.0001)); // prevent constant inputs
            pid.compute();
            black_box(output.get());
        });
    });
}

// The naive PID implementation measures the elapsed time between calls and
// divides it back into the integral and derivative terms. This is truest
// to the mathematical definition of PID but does more arithmetic per loop,
// has to guard the derivative against a zero time step, and has no term
// splitting or anti-windup beyond clamping the error sum. It should not be
// dramatically faster than the linked controller.
fn bench_naive_pid(c: &mut Criterion) {
    let kp = 1.0f32;
    let ki = 0.5f32;
    let kd = 0.1f32;
    let mut err_sum: f32 = 0.0;
    let mut last_err: f32 = 0.1;

    let mut measurement = 0.9f32;
    let setpoint = 1.0f32;

    let mut now = 0.01f32;
    let mut last_time: f32 = 0.0;
    let mut output: f32 = 0.0;
    c.bench_function("naive PID", |b| {
        b.iter(|| {
            black_box(measurement);
            black_box(setpoint);
            let time_change = now - last_time;
            if time_change <= 1e-6 {
                return; // avoid division by zero
            }
            let error = setpoint - measurement;
            err_sum += error * time_change;
            err_sum = err_sum.clamp(-10.0, 10.0);
            let d_err = (error - last_err) / time_change;

            output = kp * error + ki * err_sum + kd * d_err;
            output = output.clamp(-10.0, 10.0);

            last_err = error;
            last_time = now;
            black_box(output);

            now += 0.01;
            measurement += 0.0001; // prevent constant inputs
        });
    });
}

criterion_group!(
    benches,
    bench_externally_clocked_pid,
    bench_time_gated_pid,
    bench_naive_pid,
);
criterion_main!(benches);
