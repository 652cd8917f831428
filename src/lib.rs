#![warn(missing_docs)]

//! # Linked-Variable PID Controller Library
//!
//! This library provides a discrete-time PID (Proportional-Integral-Derivative)
//! controller that operates on *linked* process variables: the controller
//! borrows the caller's input, output and setpoint storage cells and drives
//! the output in place on every control cycle.
//!
//! ## Features
//!
//! - Respects the best practices for PID control:
//!   - Validated tuning parameters with no-op-on-rejection semantics.
//!   - Bumpless transfer on activation: the accumulator is seeded from the
//!     live output so the transition does not step the process.
//!   - Three anti-windup policies: conditional (default), hard clamp, or off.
//!   - Proportional and derivative action on error, on measurement, or both,
//!     to mitigate setpoint-change kick.
//!
//! - Explicit support for **discrete-time** control requirements:
//!   - Per-sample-period gain scaling (`ki = Ki * Ts`, `kd = Kd / Ts`),
//!     rescaled in place when the sample period changes.
//!   - Time-gated operation against an injected monotonic microsecond clock,
//!     or externally clocked operation for timer-interrupt-driven loops.
//!
//! ## Usage
//!
//! ### Externally clocked operation
//!
//! Link the controller to the process cells, activate it, and call
//! [`compute`](pid::PidController::compute) from your timer callback. The
//! caller owns the cells and updates the input and setpoint between calls.
//!
//! ```rust
//! use core::cell::Cell;
//! use linked_pid::pid::{Mode, PidConfigBuilder, PidController, ProcessLinks};
//!
//! let input = Cell::new(10.0f32);
//! let output = Cell::new(10.0f32);
//! let setpoint = Cell::new(20.0f32);
//!
//! let config = PidConfigBuilder::default()
//!     .kp(2.0)
//!     .ki(5.0)
//!     .kd(1.0)
//!     .build()
//!     .expect("valid PID config");
//!
//! let mut pid = PidController::new(ProcessLinks::new(&input, &output, &setpoint), config);
//!
//! // Activation is bumpless: the accumulator picks up the current output.
//! pid.set_mode(Mode::ExternallyClocked);
//!
//! assert!(pid.compute());
//! assert!((output.get() - 35.0).abs() < 1e-4);
//! ```
//!
//! ### Time-gated operation
//!
//! In [`Mode::TimeGated`](pid::Mode) the controller polls an injected
//! [`MonotonicClock`](time::MonotonicClock) and computes only once per sample
//! period, so `compute` can be called from a busy loop at any rate.
//!
//! ```rust
//! use core::cell::Cell;
//! use linked_pid::pid::{Mode, PidConfig, PidController, ProcessLinks};
//! use linked_pid::time::CellClock;
//!
//! let input = Cell::new(0.0f32);
//! let output = Cell::new(0.0f32);
//! let setpoint = Cell::new(1.0f32);
//! let now = Cell::new(0u64);
//!
//! let mut pid = PidController::with_clock(
//!     ProcessLinks::new(&input, &output, &setpoint),
//!     PidConfig::default(),
//!     CellClock(&now),
//! );
//! pid.set_mode(Mode::TimeGated);
//!
//! assert!(pid.compute()); // the gate is primed, so the first cycle fires
//! now.set(50_000);
//! assert!(!pid.compute()); // half of the 100 ms sample period elapsed
//! now.set(100_000);
//! assert!(pid.compute());
//! ```
//!
//! ### Plugging in your clock
//!
//! Any zero-argument function returning a monotonically increasing
//! microsecond count can serve as the clock:
//!
//! ```rust
//! use core::cell::Cell;
//! use linked_pid::pid::{PidConfig, PidController, ProcessLinks};
//! use linked_pid::time::FnClock;
//!
//! fn platform_micros() -> u64 {
//!     42 // read your hardware tick counter here
//! }
//!
//! let input = Cell::new(0.0f32);
//! let output = Cell::new(0.0f32);
//! let setpoint = Cell::new(0.0f32);
//!
//! let pid = PidController::with_clock(
//!     ProcessLinks::new(&input, &output, &setpoint),
//!     PidConfig::default(),
//!     FnClock(platform_micros),
//! );
//! ```
//!
//! ## License
//!
#![no_std]

#[cfg(feature = "std")]
extern crate std;

/// The main module for the PID controller library.
pub mod pid;

/// The module containing the monotonic clock capability and implementations.
pub mod time;

#[doc(hidden)]
#[cfg(feature = "simulation")]
pub mod sim;

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
