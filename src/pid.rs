// Control-law engine: tuning management, lifecycle and the per-cycle update

use core::cell::Cell;
use core::time::Duration;

use num_traits::Float;
use thiserror::Error;

use crate::time::{FnClock, MonotonicClock};

/// Default sample period, 100000 microseconds.
pub const DEFAULT_SAMPLE_TIME: Duration = Duration::from_micros(100_000);

/// Rejection reasons for configuration updates.
///
/// Every rejected update is a no-op: the prior configuration is retained
/// exactly, and the controller keeps running on it. Callers that ignore the
/// returned `Result` get silent-reject semantics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// One of the proportional, integral or derivative gains was negative.
    #[error("PID gains must be non-negative")]
    NegativeGain,

    /// The sample period was zero.
    #[error("sample period must be positive")]
    ZeroSamplePeriod,

    /// The lower output limit was not strictly below the upper limit.
    #[error("output limit lower bound must be below the upper bound")]
    InvalidOutputLimits,
}

/// Lifecycle state of the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// The controller never computes; the caller drives the output directly.
    Idle = 0,

    /// Computation is gated on the injected clock: a call to
    /// [`PidController::compute`] produces a new output only once one sample
    /// period has elapsed since the previous computation. Without a clock the
    /// gate never opens.
    TimeGated = 1,

    /// Computation runs unconditionally on every call; the caller owns the
    /// invocation cadence, e.g. a hardware timer interrupt.
    ExternallyClocked = 2,
}

impl Mode {
    /// The fixed ordinal encoding: Idle = 0, TimeGated = 1,
    /// ExternallyClocked = 2.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Decodes an ordinal produced by [`Mode::ordinal`].
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Idle),
            1 => Some(Self::TimeGated),
            2 => Some(Self::ExternallyClocked),
            _ => None,
        }
    }
}

/// Direction of the controlled process.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Action {
    /// A larger output drives the input up.
    Direct = 0,

    /// A larger output drives the input down; error and input deltas are
    /// negated before the control law runs.
    Reverse = 1,
}

impl Action {
    /// The fixed ordinal encoding: Direct = 0, Reverse = 1.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Decodes an ordinal produced by [`Action::ordinal`].
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Direct),
            1 => Some(Self::Reverse),
            _ => None,
        }
    }
}

/// Source signal for the proportional action.
///
/// Computing the proportional action on the measurement instead of the error
/// trades setpoint-change output spikes for a slower response.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ProportionalMode {
    /// `kp * error`.
    OnError = 0,

    /// `kp * d_input`, folded into the accumulator.
    OnMeasurement = 1,

    /// Both of the above, each at half strength.
    OnErrorAndMeasurement = 2,
}

impl ProportionalMode {
    /// The fixed ordinal encoding: OnError = 0, OnMeasurement = 1,
    /// OnErrorAndMeasurement = 2.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Decodes an ordinal produced by [`ProportionalMode::ordinal`].
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::OnError),
            1 => Some(Self::OnMeasurement),
            2 => Some(Self::OnErrorAndMeasurement),
            _ => None,
        }
    }
}

/// Source signal for the derivative action.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DerivativeMode {
    /// `kd * d_error`; reacts to setpoint changes (derivative kick).
    OnError = 0,

    /// `-kd * d_input`; immune to setpoint changes.
    OnMeasurement = 1,
}

impl DerivativeMode {
    /// The fixed ordinal encoding: OnError = 0, OnMeasurement = 1.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Decodes an ordinal produced by [`DerivativeMode::ordinal`].
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::OnError),
            1 => Some(Self::OnMeasurement),
            _ => None,
        }
    }
}

/// Policy limiting integral growth while the output is saturated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AntiWindupMode {
    /// Soft-limits the integral term only while the hypothetical output is
    /// both saturated and still moving further into saturation. Correction
    /// in the opposite direction remains possible.
    Conditional = 0,

    /// Hard-clamps the accumulator to the output range on every cycle.
    Clamp = 1,

    /// No anti-windup; the accumulator grows without bound.
    Off = 2,
}

impl AntiWindupMode {
    /// The fixed ordinal encoding: Conditional = 0, Clamp = 1, Off = 2.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Decodes an ordinal produced by [`AntiWindupMode::ordinal`].
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Conditional),
            1 => Some(Self::Clamp),
            2 => Some(Self::Off),
            _ => None,
        }
    }
}

/// The valid output range and its saturation operation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OutputLimits<T> {
    min: T,
    max: T,
}

impl<T: Float> OutputLimits<T> {
    /// Builds a range, rejecting `min >= max`.
    pub fn new(min: T, max: T) -> Result<Self, ConfigError> {
        if min >= max {
            return Err(ConfigError::InvalidOutputLimits);
        }
        Ok(OutputLimits { min, max })
    }

    /// The lower bound.
    pub fn min(&self) -> T {
        self.min
    }

    /// The upper bound.
    pub fn max(&self) -> T {
        self.max
    }

    /// Saturates `value` into `[min, max]`.
    pub fn clamp(&self, value: T) -> T {
        value.max(self.min).min(self.max)
    }
}

/// The 8-bit PWM range, `[0, 255]`.
impl<T: Float> Default for OutputLimits<T> {
    fn default() -> Self {
        OutputLimits {
            min: T::zero(),
            max: from_f64(255.0),
        }
    }
}

// NumCast from f64 into the working float type; lossy casts surface as NaN
// rather than panicking.
fn from_f64<T: Float>(value: f64) -> T {
    T::from(value).unwrap_or_else(T::nan)
}

/// Tuning parameters and discrete configuration of a PID controller.
///
/// Gains are stored twice: the raw values exactly as the user supplied them
/// (for display and query) and the internally scaled per-sample-period
/// coefficients the control law consumes, `ki = Ki * Ts` and `kd = Kd / Ts`
/// with `Ts` the sample period in seconds. The scaled coefficients are
/// recomputed whenever gains or the sample period change.
///
/// All validated setters are no-ops on rejection: prior values are retained
/// and an error is returned.
#[derive(Copy, Clone, Debug)]
pub struct PidConfig<T: Float> {
    raw_kp: T,
    raw_ki: T,
    raw_kd: T,

    kp: T,
    ki: T,
    kd: T,

    sample_time: Duration,
    limits: OutputLimits<T>,

    action: Action,
    pmode: ProportionalMode,
    dmode: DerivativeMode,
    awmode: AntiWindupMode,
}

/// Zero gains, direct action, proportional-on-error,
/// derivative-on-measurement, conditional anti-windup, limits `[0, 255]`,
/// sample period 100 ms.
impl<T: Float> Default for PidConfig<T> {
    fn default() -> Self {
        PidConfig {
            raw_kp: T::zero(),
            raw_ki: T::zero(),
            raw_kd: T::zero(),
            kp: T::zero(),
            ki: T::zero(),
            kd: T::zero(),
            sample_time: DEFAULT_SAMPLE_TIME,
            limits: OutputLimits::default(),
            action: Action::Direct,
            pmode: ProportionalMode::OnError,
            dmode: DerivativeMode::OnMeasurement,
            awmode: AntiWindupMode::Conditional,
        }
    }
}

impl<T: Float> PidConfig<T> {
    /// Returns the raw proportional gain as last supplied.
    pub fn kp(&self) -> T {
        self.raw_kp
    }

    /// Returns the raw integral gain as last supplied.
    pub fn ki(&self) -> T {
        self.raw_ki
    }

    /// Returns the raw derivative gain as last supplied.
    pub fn kd(&self) -> T {
        self.raw_kd
    }

    /// Returns the sample period.
    pub fn sample_time(&self) -> Duration {
        self.sample_time
    }

    /// Returns the lower output limit.
    pub fn output_min(&self) -> T {
        self.limits.min()
    }

    /// Returns the upper output limit.
    pub fn output_max(&self) -> T {
        self.limits.max()
    }

    /// Returns the controller action.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Returns the proportional mode.
    pub fn proportional_mode(&self) -> ProportionalMode {
        self.pmode
    }

    /// Returns the derivative mode.
    pub fn derivative_mode(&self) -> DerivativeMode {
        self.dmode
    }

    /// Returns the anti-windup mode.
    pub fn anti_windup_mode(&self) -> AntiWindupMode {
        self.awmode
    }

    /// Sets the three gains, reusing the previously stored proportional,
    /// derivative and anti-windup mode selections.
    ///
    /// Rejected with [`ConfigError::NegativeGain`] if any gain is negative;
    /// nothing changes on rejection. NaN gains are not screened and propagate
    /// through the control law.
    pub fn set_tunings(&mut self, kp: T, ki: T, kd: T) -> Result<(), ConfigError> {
        self.set_tunings_with_modes(kp, ki, kd, self.pmode, self.dmode, self.awmode)
    }

    /// Sets the three gains together with the discrete mode selections, and
    /// recomputes the scaled coefficients from the current sample period.
    ///
    /// Rejected with [`ConfigError::NegativeGain`] if any gain is negative;
    /// nothing changes on rejection.
    pub fn set_tunings_with_modes(
        &mut self,
        kp: T,
        ki: T,
        kd: T,
        pmode: ProportionalMode,
        dmode: DerivativeMode,
        awmode: AntiWindupMode,
    ) -> Result<(), ConfigError> {
        if kp < T::zero() || ki < T::zero() || kd < T::zero() {
            return Err(ConfigError::NegativeGain);
        }
        self.pmode = pmode;
        self.dmode = dmode;
        self.awmode = awmode;
        self.raw_kp = kp;
        self.raw_ki = ki;
        self.raw_kd = kd;

        let period: T = from_f64(self.sample_time.as_secs_f64());
        self.kp = kp;
        self.ki = ki * period;
        self.kd = kd / period;
        Ok(())
    }

    /// Sets the sample period, rescaling the integral and derivative
    /// coefficients in place so the continuous-time behavior is unchanged.
    /// The accumulated integral and the raw gains are not reset.
    ///
    /// Rejected with [`ConfigError::ZeroSamplePeriod`] if the period is zero.
    pub fn set_sample_time(&mut self, sample_time: Duration) -> Result<(), ConfigError> {
        if sample_time.is_zero() {
            return Err(ConfigError::ZeroSamplePeriod);
        }
        let ratio: T = from_f64(sample_time.as_secs_f64() / self.sample_time.as_secs_f64());
        self.ki = self.ki * ratio;
        self.kd = self.kd / ratio;
        self.sample_time = sample_time;
        Ok(())
    }

    /// Sets the output range.
    ///
    /// Rejected with [`ConfigError::InvalidOutputLimits`] if `min >= max`;
    /// prior limits are retained. Note that changing limits through
    /// [`PidController::set_output_limits`] additionally reclamps the live
    /// output and accumulator; this method only stores the range.
    pub fn set_output_limits(&mut self, min: T, max: T) -> Result<(), ConfigError> {
        self.limits = OutputLimits::new(min, max)?;
        Ok(())
    }

    /// Sets the controller action.
    pub fn set_action(&mut self, action: Action) {
        self.action = action;
    }

    /// Sets the proportional mode.
    pub fn set_proportional_mode(&mut self, pmode: ProportionalMode) {
        self.pmode = pmode;
    }

    /// Sets the derivative mode.
    pub fn set_derivative_mode(&mut self, dmode: DerivativeMode) {
        self.dmode = dmode;
    }

    /// Sets the anti-windup mode.
    pub fn set_anti_windup_mode(&mut self, awmode: AntiWindupMode) {
        self.awmode = awmode;
    }
}

/// Builder for [`PidConfig`] with every optional field defaulted.
///
/// ```
/// use linked_pid::pid::{Action, PidConfigBuilder};
///
/// let config = PidConfigBuilder::default()
///     .kp(2.0f32)
///     .ki(5.0)
///     .kd(1.0)
///     .output_limits(-100.0, 100.0)
///     .action(Action::Reverse)
///     .build()
///     .expect("valid PID config");
/// assert_eq!(config.ki(), 5.0);
/// ```
#[derive(Copy, Clone, Debug)]
pub struct PidConfigBuilder<T: Float> {
    kp: T,
    ki: T,
    kd: T,
    sample_time: Duration,
    limits: (T, T),
    action: Action,
    pmode: ProportionalMode,
    dmode: DerivativeMode,
    awmode: AntiWindupMode,
}

impl<T: Float> Default for PidConfigBuilder<T> {
    fn default() -> Self {
        let defaults = PidConfig::<T>::default();
        PidConfigBuilder {
            kp: defaults.raw_kp,
            ki: defaults.raw_ki,
            kd: defaults.raw_kd,
            sample_time: defaults.sample_time,
            limits: (defaults.limits.min(), defaults.limits.max()),
            action: defaults.action,
            pmode: defaults.pmode,
            dmode: defaults.dmode,
            awmode: defaults.awmode,
        }
    }
}

impl<T: Float> PidConfigBuilder<T> {
    /// Sets the proportional gain.
    pub fn kp(mut self, kp: T) -> Self {
        self.kp = kp;
        self
    }

    /// Sets the integral gain.
    pub fn ki(mut self, ki: T) -> Self {
        self.ki = ki;
        self
    }

    /// Sets the derivative gain.
    pub fn kd(mut self, kd: T) -> Self {
        self.kd = kd;
        self
    }

    /// Sets the sample period.
    pub fn sample_time(mut self, sample_time: Duration) -> Self {
        self.sample_time = sample_time;
        self
    }

    /// Sets the output range.
    pub fn output_limits(mut self, min: T, max: T) -> Self {
        self.limits = (min, max);
        self
    }

    /// Sets the controller action.
    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Sets the proportional mode.
    pub fn proportional_mode(mut self, pmode: ProportionalMode) -> Self {
        self.pmode = pmode;
        self
    }

    /// Sets the derivative mode.
    pub fn derivative_mode(mut self, dmode: DerivativeMode) -> Self {
        self.dmode = dmode;
        self
    }

    /// Sets the anti-windup mode.
    pub fn anti_windup_mode(mut self, awmode: AntiWindupMode) -> Self {
        self.awmode = awmode;
        self
    }

    /// Validates and assembles the configuration, reporting the first
    /// violated rule.
    pub fn build(self) -> Result<PidConfig<T>, ConfigError> {
        let mut config = PidConfig::default();
        config.set_sample_time(self.sample_time)?;
        config.set_output_limits(self.limits.0, self.limits.1)?;
        config.set_tunings_with_modes(
            self.kp,
            self.ki,
            self.kd,
            self.pmode,
            self.dmode,
            self.awmode,
        )?;
        config.set_action(self.action);
        Ok(config)
    }
}

/// Non-owning links to the caller's input, output and setpoint storage.
///
/// The cells stay owned by the caller and must outlive the controller; the
/// borrow checker enforces that. `Cell` rules out concurrent mutation at
/// compile time while letting the caller update the input and setpoint, and
/// read the output, between `compute` calls through plain shared references.
#[derive(Copy, Clone)]
pub struct ProcessLinks<'a, T> {
    input: &'a Cell<T>,
    output: &'a Cell<T>,
    setpoint: &'a Cell<T>,
}

impl<'a, T> ProcessLinks<'a, T> {
    /// Links the controller to the given storage cells.
    pub fn new(input: &'a Cell<T>, output: &'a Cell<T>, setpoint: &'a Cell<T>) -> Self {
        ProcessLinks {
            input,
            output,
            setpoint,
        }
    }
}

/// A discrete-time PID controller operating on linked process variables.
///
/// The controller reads the input and setpoint cells, runs the control law,
/// and writes the corrected value through the output cell. It starts in
/// [`Mode::Idle`] and performs a bumpless transfer (accumulator seeded from
/// the current output) when first activated, so the output does not jump on
/// the transition.
///
/// The controller is single-threaded by construction; see [`ProcessLinks`].
pub struct PidController<'a, T: Float = f32, C: MonotonicClock = FnClock<fn() -> u64>> {
    links: ProcessLinks<'a, T>,
    config: PidConfig<T>,
    clock: Option<C>,
    mode: Mode,

    output_sum: T,
    last_error: T,
    last_input: T,
    last_time: u64,

    p_term: T,
    i_term: T,
    d_term: T,
}

impl<'a, T: Float> PidController<'a, T> {
    /// Creates an idle controller with no clock.
    ///
    /// Without a clock, [`Mode::TimeGated`] never computes; use
    /// [`Mode::ExternallyClocked`] or supply a clock through
    /// [`PidController::with_clock`] or [`PidController::set_clock`].
    pub fn new(links: ProcessLinks<'a, T>, config: PidConfig<T>) -> Self {
        Self::from_parts(links, config)
    }
}

impl<'a, T: Float, C: MonotonicClock> PidController<'a, T, C> {
    /// Creates an idle controller with an injected clock.
    ///
    /// The gate is primed so the first time-gated computation fires
    /// immediately after activation.
    pub fn with_clock(links: ProcessLinks<'a, T>, config: PidConfig<T>, clock: C) -> Self {
        let mut pid = Self::from_parts(links, config);
        pid.install_clock(clock);
        pid
    }

    fn from_parts(links: ProcessLinks<'a, T>, config: PidConfig<T>) -> Self {
        PidController {
            links,
            config,
            clock: None,
            mode: Mode::Idle,
            output_sum: T::zero(),
            last_error: T::zero(),
            last_input: T::zero(),
            last_time: 0,
            p_term: T::zero(),
            i_term: T::zero(),
            d_term: T::zero(),
        }
    }

    fn install_clock(&mut self, mut clock: C) {
        // Prime the gate one period in the past so the first gated
        // computation is immediate.
        self.last_time = clock.now_micros().wrapping_sub(self.sample_time_micros());
        self.clock = Some(clock);
    }

    fn sample_time_micros(&self) -> u64 {
        self.config.sample_time.as_micros() as u64
    }

    /// Supplies (or replaces) the monotonic clock used by [`Mode::TimeGated`].
    pub fn set_clock(&mut self, clock: C) {
        self.install_clock(clock);
    }

    /// Read-only view of the current configuration.
    pub fn config(&self) -> &PidConfig<T> {
        &self.config
    }

    /// Returns the raw proportional gain as last supplied.
    pub fn kp(&self) -> T {
        self.config.kp()
    }

    /// Returns the raw integral gain as last supplied.
    pub fn ki(&self) -> T {
        self.config.ki()
    }

    /// Returns the raw derivative gain as last supplied.
    pub fn kd(&self) -> T {
        self.config.kd()
    }

    /// Proportional contribution of the last computation.
    pub fn p_term(&self) -> T {
        self.p_term
    }

    /// Integral contribution of the last computation.
    pub fn i_term(&self) -> T {
        self.i_term
    }

    /// Derivative contribution of the last computation.
    pub fn d_term(&self) -> T {
        self.d_term
    }

    /// Returns the lifecycle state.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the controller action.
    pub fn action(&self) -> Action {
        self.config.action()
    }

    /// Returns the proportional mode.
    pub fn proportional_mode(&self) -> ProportionalMode {
        self.config.proportional_mode()
    }

    /// Returns the derivative mode.
    pub fn derivative_mode(&self) -> DerivativeMode {
        self.config.derivative_mode()
    }

    /// Returns the anti-windup mode.
    pub fn anti_windup_mode(&self) -> AntiWindupMode {
        self.config.anti_windup_mode()
    }

    /// Returns the sample period.
    pub fn sample_time(&self) -> Duration {
        self.config.sample_time()
    }

    /// Returns the lower output limit.
    pub fn output_min(&self) -> T {
        self.config.output_min()
    }

    /// Returns the upper output limit.
    pub fn output_max(&self) -> T {
        self.config.output_max()
    }

    /// Sets the three gains, reusing the stored mode selections; see
    /// [`PidConfig::set_tunings`].
    pub fn set_tunings(&mut self, kp: T, ki: T, kd: T) -> Result<(), ConfigError> {
        self.config.set_tunings(kp, ki, kd)
    }

    /// Sets gains and mode selections together; see
    /// [`PidConfig::set_tunings_with_modes`].
    pub fn set_tunings_with_modes(
        &mut self,
        kp: T,
        ki: T,
        kd: T,
        pmode: ProportionalMode,
        dmode: DerivativeMode,
        awmode: AntiWindupMode,
    ) -> Result<(), ConfigError> {
        self.config
            .set_tunings_with_modes(kp, ki, kd, pmode, dmode, awmode)
    }

    /// Sets the sample period; see [`PidConfig::set_sample_time`].
    pub fn set_sample_time(&mut self, sample_time: Duration) -> Result<(), ConfigError> {
        self.config.set_sample_time(sample_time)
    }

    /// Sets the output range.
    ///
    /// On success, if the controller is not idle, the live output cell and
    /// the integral accumulator are immediately reclamped into the new range.
    /// Rejected with [`ConfigError::InvalidOutputLimits`] if `min >= max`;
    /// prior limits are retained.
    pub fn set_output_limits(&mut self, min: T, max: T) -> Result<(), ConfigError> {
        self.config.set_output_limits(min, max)?;
        if self.mode != Mode::Idle {
            let limits = self.config.limits;
            self.links.output.set(limits.clamp(self.links.output.get()));
            self.output_sum = limits.clamp(self.output_sum);
        }
        Ok(())
    }

    /// Sets the controller action.
    pub fn set_action(&mut self, action: Action) {
        self.config.set_action(action);
    }

    /// Sets the proportional mode.
    pub fn set_proportional_mode(&mut self, pmode: ProportionalMode) {
        self.config.set_proportional_mode(pmode);
    }

    /// Sets the derivative mode.
    pub fn set_derivative_mode(&mut self, dmode: DerivativeMode) {
        self.config.set_derivative_mode(dmode);
    }

    /// Sets the anti-windup mode.
    pub fn set_anti_windup_mode(&mut self, awmode: AntiWindupMode) {
        self.config.set_anti_windup_mode(awmode);
    }

    /// Changes the lifecycle state.
    ///
    /// Leaving [`Mode::Idle`] for either active state performs a bumpless
    /// transfer: the accumulator is seeded from the current output cell
    /// (clamped to the output range) and the input history from the current
    /// input cell. Returning to `Idle` resets nothing, so re-activation goes
    /// through the same bumpless path. Switching directly between the two
    /// active states performs no re-initialization. A previously injected
    /// clock is always preserved.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode == Mode::Idle && mode != Mode::Idle {
            self.initialize();
        }
        self.mode = mode;
    }

    // Bumpless transfer: seed the accumulator and input history from the
    // linked cells so activation does not step the output.
    fn initialize(&mut self) {
        self.output_sum = self.config.limits.clamp(self.links.output.get());
        self.last_input = self.links.input.get();
    }

    /// Runs one control cycle, returning `true` iff a new output was written.
    ///
    /// In [`Mode::Idle`] this always returns `false` and touches nothing. In
    /// [`Mode::TimeGated`] it is a no-op until the injected clock shows one
    /// sample period elapsed since the last computation (always a no-op
    /// without a clock). In [`Mode::ExternallyClocked`] it computes on every
    /// call.
    pub fn compute(&mut self) -> bool {
        let now = match self.mode {
            Mode::Idle => return false,
            Mode::TimeGated => {
                let Some(clock) = self.clock.as_mut() else {
                    return false;
                };
                let now = clock.now_micros();
                if now.wrapping_sub(self.last_time) < self.sample_time_micros() {
                    return false;
                }
                Some(now)
            }
            Mode::ExternallyClocked => None,
        };
        self.step(now);
        true
    }

    // The control law proper. `now` carries the clock reading in time-gated
    // operation; externally clocked cycles leave the stored time untouched.
    fn step(&mut self, now: Option<u64>) {
        let cfg = self.config;
        let limits = cfg.limits;

        let input = self.links.input.get();
        let setpoint = self.links.setpoint.get();

        let mut d_input = input - self.last_input;
        let mut error = setpoint - input;
        if cfg.action == Action::Reverse {
            d_input = -d_input;
            error = -error;
        }
        let d_error = error - self.last_error;

        let (pe_term, pm_term) = match cfg.pmode {
            ProportionalMode::OnError => (cfg.kp * error, T::zero()),
            ProportionalMode::OnMeasurement => (T::zero(), cfg.kp * d_input),
            ProportionalMode::OnErrorAndMeasurement => {
                let half = from_f64::<T>(0.5);
                (half * cfg.kp * error, half * cfg.kp * d_input)
            }
        };
        self.p_term = pe_term - pm_term;

        let mut i_term = cfg.ki * error;
        self.d_term = match cfg.dmode {
            DerivativeMode::OnError => cfg.kd * d_error,
            DerivativeMode::OnMeasurement => -(cfg.kd * d_input),
        };

        // Conditional anti-windup: soft-limit the integral step only while
        // the hypothetical fully integrated output is saturated and the error
        // is still growing in the direction of saturation.
        if cfg.awmode == AntiWindupMode::Conditional {
            let i_term_out = (pe_term - pm_term) + cfg.ki * (i_term + error);
            let saturating = (i_term_out > limits.max() && d_error > T::zero())
                || (i_term_out < limits.min() && d_error < T::zero());
            if saturating && cfg.ki != T::zero() {
                i_term = i_term_out.max(-limits.max()).min(limits.max());
            }
        }
        self.i_term = i_term;

        self.output_sum = self.output_sum + i_term;
        self.output_sum = if cfg.awmode == AntiWindupMode::Off {
            self.output_sum - pm_term
        } else {
            limits.clamp(self.output_sum - pm_term)
        };

        self.links
            .output
            .set(limits.clamp(self.output_sum + pe_term + self.d_term));

        self.last_error = error;
        self.last_input = input;
        if let Some(now) = now {
            self.last_time = now;
        }
    }
}
