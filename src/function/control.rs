//! 0xA0–0xAF Control family (§4.2): closed-loop and drive-shaping blocks.

use super::common::{truthy, Inputs, StepCtx, StepOutput};
use super::tables::{lookup_1d, InterpMode};

/// Full PID with anti-windup (integral clamping, invariant 7), derivative
/// low-pass filtering, direction flip, and an activation gate.
///
/// Gains (`kp`/`ki`/`kd`) are thousandths-scaled fixed point, matching the
/// convention used by `ExponentialFilter`'s alpha. Inputs: `[setpoint, pv,
/// activation?, feed_forward?, custom_term?]` — everything past `pv` is
/// optional and defaults to "always active" / 0.
#[derive(Debug, Clone, Copy)]
pub struct Pid {
    pub kp: i32,
    pub ki: i32,
    pub kd: i32,
    pub out_min: i32,
    pub out_max: i32,
    pub deadband: i32,
    pub inverted: bool,
    pub derivative_filter_alpha: i32,
    integral_accum: i64,
    prev_error: i32,
    filtered_d: i32,
}

impl Pid {
    pub fn new(kp: i32, ki: i32, kd: i32, out_min: i32, out_max: i32) -> Self {
        Pid {
            kp,
            ki,
            kd,
            out_min,
            out_max,
            deadband: 0,
            inverted: false,
            derivative_filter_alpha: 0,
            integral_accum: 0,
            prev_error: 0,
            filtered_d: 0,
        }
    }

    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let setpoint = inputs.first().copied().unwrap_or(0);
        let pv = inputs.get(1).copied().unwrap_or(0);
        let active = inputs.get(2).map(|v| truthy(*v)).unwrap_or(true);
        let feed_forward = inputs.get(3).copied().unwrap_or(0);
        let custom_term = inputs.get(4).copied().unwrap_or(0);

        if !active {
            self.integral_accum = 0;
            self.prev_error = 0;
            self.filtered_d = 0;
            return (feed_forward + custom_term).clamp(self.out_min, self.out_max).into();
        }

        let mut error = setpoint - pv;
        if self.inverted {
            error = -error;
        }
        if error.abs() < self.deadband {
            error = 0;
        }

        let p = (error as i64 * self.kp as i64) / 1000;

        let dt_ms = ctx.dt_ms.max(1) as i64;
        let raw_rate = (error - self.prev_error) as i64 * 1000 / dt_ms;
        let raw_d = raw_rate * self.kd as i64 / 1000;
        let d = if self.derivative_filter_alpha > 0 {
            self.filtered_d += ((raw_d - self.filtered_d as i64) * self.derivative_filter_alpha as i64 / 1000) as i32;
            self.filtered_d as i64
        } else {
            raw_d
        };
        self.prev_error = error;

        // error * ki(thousandths) * dt_ms, unscaled by /1000 for ki only — dt
        // enters directly in milliseconds, matching the spec's literal-value
        // scenario (S3) rather than converting to seconds.
        let candidate_accum = self.integral_accum + error as i64 * self.ki as i64 * dt_ms;
        let candidate_i = candidate_accum / 1_000;
        let unclamped = p + candidate_i + d + feed_forward as i64 + custom_term as i64;
        let pushing_further = (unclamped > self.out_max as i64 && error > 0)
            || (unclamped < self.out_min as i64 && error < 0);
        if !pushing_further {
            self.integral_accum = candidate_accum;
        }
        let i_term = self.integral_accum / 1_000;
        let output = p + i_term + d + feed_forward as i64 + custom_term as i64;
        (output.clamp(self.out_min as i64, self.out_max as i64) as i32).into()
    }
}

/// PID with `kd` forced to 0.
pub fn new_pi(kp: i32, ki: i32, out_min: i32, out_max: i32) -> Pid {
    Pid::new(kp, ki, 0, out_min, out_max)
}

/// PID with `ki`/`kd` forced to 0.
pub fn new_p_only(kp: i32, out_min: i32, out_max: i32) -> Pid {
    Pid::new(kp, 0, 0, out_min, out_max)
}

/// On/off control with hysteresis around `setpoint - pv`.
#[derive(Debug, Clone, Copy)]
pub struct BangBang {
    pub hysteresis: i32,
    pub state: bool,
}
impl BangBang {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let setpoint = inputs.first().copied().unwrap_or(0);
        let pv = inputs.get(1).copied().unwrap_or(0);
        let error = setpoint - pv;
        if error > self.hysteresis {
            self.state = true;
        } else if error < -self.hysteresis {
            self.state = false;
        }
        (self.state as i32).into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DutyShape {
    Linear,
    Exponential { exponent: u32 },
    SCurve,
}

/// Maps a 0–1000 input to a 0–1000 duty using the configured shape.
#[derive(Debug, Clone, Copy)]
pub struct PwmDutyMap {
    pub shape: DutyShape,
}
impl PwmDutyMap {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let t = inputs.first().copied().unwrap_or(0).clamp(0, 1000) as i64;
        let out = match self.shape {
            DutyShape::Linear => t,
            DutyShape::Exponential { exponent } => {
                let exponent = exponent.max(1);
                let numerator = t.pow(exponent);
                let denom = 1000i64.pow(exponent - 1);
                numerator / denom.max(1)
            }
            DutyShape::SCurve => {
                let term1 = 3000 * t * t / 1_000_000;
                let term2 = 2000 * t * t * t / 1_000_000_000;
                term1 - term2
            }
        };
        (out.clamp(0, 1000) as i32).into()
    }
}

/// Linear 0→target ramp over `ramp_ms`, matching the design-notes
/// correction of the teacher's `output_max * 2 / ramp_ms` soft-start step
/// formula: the step is simply `full_scale * dt_ms / ramp_ms`, with no
/// undocumented factor of 2.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftStart {
    pub full_scale: i32,
    pub ramp_ms: u32,
    pub value: i32,
}
impl SoftStart {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let enabled = truthy(inputs.first().copied().unwrap_or(0));
        let target = inputs.get(1).copied().unwrap_or(self.full_scale);
        if !enabled {
            self.value = 0;
            return 0.into();
        }
        let ramp_ms = self.ramp_ms.max(1) as i64;
        let step = (self.full_scale as i64 * ctx.dt_ms as i64 / ramp_ms) as i32;
        if self.value < target {
            self.value = (self.value + step.max(1)).min(target);
        } else if self.value > target {
            self.value = (self.value - step.max(1)).max(target);
        }
        self.value.into()
    }
}

/// Proportional current foldback: passes the command through unchanged
/// while `measured_current <= limit`, otherwise scales it down.
#[derive(Debug, Clone, Copy)]
pub struct CurrentLimiter {
    pub limit_ma: i32,
}
impl CurrentLimiter {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let command = inputs.first().copied().unwrap_or(0);
        let measured = inputs.get(1).copied().unwrap_or(0);
        if measured <= self.limit_ma || measured <= 0 {
            command.into()
        } else {
            ((command as i64 * self.limit_ma as i64 / measured as i64) as i32).into()
        }
    }
}

/// Combines independent forward/reverse duty commands into one signed
/// H-bridge setpoint in [-1000, 1000].
#[derive(Debug, Clone, Copy, Default)]
pub struct HbridgeCombiner;
impl HbridgeCombiner {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let fwd = inputs.first().copied().unwrap_or(0);
        let rev = inputs.get(1).copied().unwrap_or(0);
        (fwd - rev).clamp(-1000, 1000).into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WiperMode {
    Off,
    Intermittent,
    Low,
    High,
    Wash,
}
impl WiperMode {
    fn from_code(v: i32) -> WiperMode {
        match v {
            1 => WiperMode::Intermittent,
            2 => WiperMode::Low,
            3 => WiperMode::High,
            4 => WiperMode::Wash,
            _ => WiperMode::Off,
        }
    }
}

/// Wiper mode sequencer: `inputs[0]` selects mode (0=off..4=wash),
/// `inputs[1]` is the park-switch state (truthy at the park position).
/// Drives at `duty_low`/`duty_high` continuously in LOW/HIGH, pulses at
/// `duty_low` for `sweep_on_ms` of each `interval_ms` in INTERMITTENT, and
/// in OFF keeps driving until the park switch trips so the blade always
/// parks. Secondary output is the wash-pump enable bit.
#[derive(Debug, Clone)]
pub struct WiperSequencer {
    pub duty_low: i32,
    pub duty_high: i32,
    pub interval_ms: u32,
    pub sweep_on_ms: u32,
    phase_ms: u32,
}
impl Default for WiperSequencer {
    fn default() -> Self {
        WiperSequencer {
            duty_low: 500,
            duty_high: 1000,
            interval_ms: 4000,
            sweep_on_ms: 800,
            phase_ms: 0,
        }
    }
}
impl WiperSequencer {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let mode = WiperMode::from_code(inputs.first().copied().unwrap_or(0));
        let parked = truthy(inputs.get(1).copied().unwrap_or(0));
        match mode {
            WiperMode::Off => {
                self.phase_ms = 0;
                StepOutput {
                    primary: if parked { 0 } else { self.duty_low },
                    secondary: Some(0),
                }
            }
            WiperMode::Low => StepOutput {
                primary: self.duty_low,
                secondary: Some(0),
            },
            WiperMode::High => StepOutput {
                primary: self.duty_high,
                secondary: Some(0),
            },
            WiperMode::Wash => StepOutput {
                primary: self.duty_high,
                secondary: Some(1),
            },
            WiperMode::Intermittent => {
                let period = (self.interval_ms).max(1);
                self.phase_ms = (self.phase_ms + ctx.dt_ms) % period;
                let driving = self.phase_ms < self.sweep_on_ms;
                StepOutput {
                    primary: if driving { self.duty_low } else { 0 },
                    secondary: Some(0),
                }
            }
        }
    }
}

/// Maintains `inputs[0]` (target speed) with an acceleration limit —
/// structurally a rate limiter, named for the use case.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cruise {
    pub accel_limit_per_sec: i32,
    pub value: i32,
    pub initialized: bool,
}
impl Cruise {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let target = inputs.first().copied().unwrap_or(0);
        if !self.initialized {
            self.value = target;
            self.initialized = true;
            return self.value.into();
        }
        let max_delta = (self.accel_limit_per_sec as i64 * ctx.dt_ms as i64 / 1000) as i32;
        let delta = (target - self.value).clamp(-max_delta.abs(), max_delta.abs());
        self.value += delta;
        self.value.into()
    }
}

/// Temporarily raises an output limit to `boost_limit` for `boost_time_ms`
/// after a rising edge on `inputs[0]`, then falls back to `normal_limit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boost {
    pub normal_limit: i32,
    pub boost_limit: i32,
    pub boost_time_ms: u32,
    pub deadline_ms: u32,
    pub prev_truthy: bool,
}
impl Boost {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let trigger = truthy(inputs.first().copied().unwrap_or(0));
        if trigger && !self.prev_truthy {
            self.deadline_ms = ctx.now_ms.wrapping_add(self.boost_time_ms);
        }
        self.prev_truthy = trigger;
        let boosting = !crate::time::at_or_after(ctx.now_ms, self.deadline_ms);
        (if boosting { self.boost_limit } else { self.normal_limit }).into()
    }
}

/// Closed-loop trim controller around a stoichiometric lambda target
/// (1000 = stoichiometric, matching the `Percent0_1Pct` channel format).
#[derive(Debug, Clone, Copy)]
pub struct Lambda {
    pub target: i32,
    pub ki: i32,
    pub trim_limit: i32,
    pub trim: i32,
}
impl Lambda {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let reading = inputs.first().copied().unwrap_or(self.target);
        let error = self.target - reading;
        self.trim += (error as i64 * self.ki as i64 * ctx.dt_ms as i64 / 1_000_000) as i32;
        self.trim = self.trim.clamp(-self.trim_limit, self.trim_limit);
        self.trim.into()
    }
}

/// Shared breakpoint lookup re-exported for PWM_DUTY's optional table mode.
pub fn duty_from_table(xs: &[i32], ys: &[i32], x: i32) -> i32 {
    lookup_1d(xs, ys, x, InterpMode::Linear)
}

#[cfg(test)]
mod tests {
    use super::*;
    fn inputs(vals: &[i32]) -> Inputs {
        Inputs::from_slice(vals).unwrap()
    }

    /// §8 S3 — PID to setpoint scenario (saturation + anti-windup).
    #[test]
    fn pid_saturates_without_integrator_runaway() {
        let mut pid = Pid::new(2000, 100, 0, 0, 1000);
        let ctx = StepCtx { now_ms: 0, dt_ms: 10 };
        for _ in 0..100 {
            pid.step(&inputs(&[500, 400]), ctx);
        }
        let out = pid.step(&inputs(&[500, 400]), ctx);
        assert_eq!(out.primary, 1000);
        let accum_before = pid.integral_accum;
        pid.step(&inputs(&[500, 400]), ctx);
        assert_eq!(pid.integral_accum, accum_before, "integrator must not grow while saturated and error pushes further into saturation");

        // pv jumps toward setpoint: output must respond downward promptly.
        let first = pid.step(&inputs(&[500, 520]), ctx).primary;
        assert!(first < 1000);
    }

    #[test]
    fn soft_start_is_strictly_linear() {
        let mut s = SoftStart {
            full_scale: 1000,
            ramp_ms: 100,
            value: 0,
        };
        let ctx = StepCtx { now_ms: 0, dt_ms: 10 };
        let mut last = 0;
        for _ in 0..10 {
            let v = s.step(&inputs(&[1, 1000]), ctx).primary;
            assert!(v >= last);
            last = v;
        }
        assert_eq!(last, 1000);
    }

    #[test]
    fn current_limiter_folds_back_over_limit() {
        let mut cl = CurrentLimiter { limit_ma: 5000 };
        let ctx = StepCtx { now_ms: 0, dt_ms: 2 };
        assert_eq!(cl.step(&inputs(&[1000, 3000]), ctx).primary, 1000);
        assert_eq!(cl.step(&inputs(&[1000, 10000]), ctx).primary, 500);
    }

    #[test]
    fn hbridge_combiner_clamps() {
        let mut c = HbridgeCombiner;
        let ctx = StepCtx { now_ms: 0, dt_ms: 2 };
        assert_eq!(c.step(&inputs(&[1000, 200]), ctx).primary, 800);
        assert_eq!(c.step(&inputs(&[2000, 0]), ctx).primary, 1000);
    }
}
