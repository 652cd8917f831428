// Defines the monotonic clock capability and provides several implementations
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

/// A capability for reading a monotonically non-decreasing microsecond count.
///
/// The controller consults this clock in [`Mode::TimeGated`](crate::pid::Mode)
/// to decide whether one sample period has elapsed since the last computation.
/// The count may start from any epoch; only differences are meaningful. The
/// controller tolerates a clock that never advances (the time gate simply
/// never opens) but the result of comparing against a regressing clock is
/// unspecified.
pub trait MonotonicClock {
    /// Returns the current monotonic time in microseconds.
    fn now_micros(&mut self) -> u64;
}

/// Adapts a zero-argument function or closure returning microseconds into a
/// clock.
///
/// This is the natural fit for platform tick counters exposed as free
/// functions, e.g. `FnClock(esp_timer_get_time_micros)`.
#[derive(Debug, Clone, Copy)]
pub struct FnClock<F>(pub F);

impl<F: FnMut() -> u64> MonotonicClock for FnClock<F> {
    fn now_micros(&mut self) -> u64 {
        (self.0)()
    }
}

/// A clock backed by a shared microsecond counter cell.
///
/// Hand the controller a `CellClock` and keep the `Cell` around to advance
/// time from outside, which makes time-gated behavior fully deterministic in
/// tests.
///
/// ```
/// use core::cell::Cell;
/// use linked_pid::time::{CellClock, MonotonicClock};
///
/// let now = Cell::new(0u64);
/// let mut clock = CellClock(&now);
/// now.set(250);
/// assert_eq!(clock.now_micros(), 250);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CellClock<'a>(pub &'a Cell<u64>);

impl MonotonicClock for CellClock<'_> {
    fn now_micros(&mut self) -> u64 {
        self.0.get()
    }
}

/// A convenient clock over `std::time::Instant` counting from its creation.
#[cfg(feature = "std")]
mod std_clock {

    use super::MonotonicClock;

    /// Monotonic microseconds elapsed since the clock was constructed.
    #[derive(Debug, Clone, Copy)]
    pub struct StdClock {
        origin: std::time::Instant,
    }

    impl StdClock {
        /// Creates a clock whose count starts at zero now.
        pub fn new() -> Self {
            StdClock {
                origin: std::time::Instant::now(),
            }
        }
    }

    impl Default for StdClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MonotonicClock for StdClock {
        fn now_micros(&mut self) -> u64 {
            self.origin.elapsed().as_micros() as u64
        }
    }

    /// Tests that StdClock counts up from its origin and never decreases
    /// across consecutive reads.
    #[cfg(all(test, feature = "std"))]
    #[test]
    fn test_std_clock_is_monotonic() {
        let mut clock = StdClock::new();
        let first = clock.now_micros();
        let second = clock.now_micros();
        assert!(second >= first);
    }
}

#[cfg(feature = "std")]
pub use std_clock::StdClock;
