//! 0xF0–0xFF Utility family (§4.2).

use super::common::{truthy, Inputs, StepCtx, StepOutput};

#[derive(Debug, Clone, Copy)]
pub struct Constant {
    pub value: i32,
}
impl Constant {
    pub fn step(&mut self, _inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        self.value.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

/// Reads the cycle's monotonic clock, scaled to the configured unit.
#[derive(Debug, Clone, Copy)]
pub struct SystemTime {
    pub unit: TimeUnit,
}
impl SystemTime {
    pub fn step(&mut self, _inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let ms = ctx.now_ms as i64;
        let scaled = match self.unit {
            TimeUnit::Milliseconds => ms,
            TimeUnit::Seconds => ms / 1000,
            TimeUnit::Minutes => ms / 60_000,
            TimeUnit::Hours => ms / 3_600_000,
        };
        (scaled as i32).into()
    }
}

/// Wall-clock time of day in seconds since local midnight, derived from a
/// board-supplied epoch offset (since this core has no battery-backed
/// calendar of its own). `epoch_offset_s` is set once at configuration
/// time from the real-time clock peripheral.
#[derive(Debug, Clone, Copy)]
pub struct Rtc {
    pub epoch_offset_s: i32,
}
impl Rtc {
    pub fn step(&mut self, _inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let seconds_of_day = (self.epoch_offset_s as i64 + ctx.now_ms as i64 / 1000) % 86_400;
        (seconds_of_day as i32).into()
    }
}

/// Deterministic xorshift PRNG seeded at configuration time — there is no
/// hardware entropy source on this core, and determinism (§8 invariant 1)
/// rules out a nondeterministic source even if there were.
#[derive(Debug, Clone, Copy)]
pub struct Random {
    pub state: u32,
    pub min: i32,
    pub max: i32,
}
impl Random {
    pub fn step(&mut self, _inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        let span = (self.max - self.min + 1).max(1) as u32;
        (self.min + (x % span) as i32).into()
    }
}

/// Fires when `inputs[0]` has not changed for `stuck_ms`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Watchdog {
    pub stuck_ms: u32,
    pub last_value: i32,
    pub since_change_ms: u32,
    pub initialized: bool,
}
impl Watchdog {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let x = inputs.first().copied().unwrap_or(0);
        if !self.initialized {
            self.last_value = x;
            self.since_change_ms = ctx.now_ms;
            self.initialized = true;
            return 0.into();
        }
        if x != self.last_value {
            self.last_value = x;
            self.since_change_ms = ctx.now_ms;
        }
        let stuck = crate::time::at_or_after(ctx.now_ms, self.since_change_ms.wrapping_add(self.stuck_ms));
        (stuck as i32).into()
    }
}

/// Toggles once per `period_ms` — a liveness indicator for external
/// watchers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Heartbeat {
    pub period_ms: u32,
    pub phase_ms: u32,
    pub state: bool,
}
impl Heartbeat {
    pub fn step(&mut self, _inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        self.phase_ms += ctx.dt_ms;
        let half = self.period_ms.max(1) / 2;
        if self.phase_ms >= half.max(1) {
            self.phase_ms = 0;
            self.state = !self.state;
        }
        (self.state as i32).into()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BitExtract {
    pub bit: u32,
}
impl BitExtract {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let x = inputs.first().copied().unwrap_or(0);
        ((x >> self.bit.min(31)) & 1).into()
    }
}

/// Packs up to 8 boolean inputs into a single byte, input 0 as bit 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitPack;
impl BitPack {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let mut packed: i32 = 0;
        for (i, v) in inputs.iter().enumerate().take(8) {
            if truthy(*v) {
                packed |= 1 << i;
            }
        }
        packed.into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionCount;
impl ConditionCount {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        (inputs.iter().filter(|v| truthy(**v)).count() as i32).into()
    }
}

/// Linear ramp from `start` toward `inputs[0]` (target) at `rate_per_sec`,
/// free-running regardless of target changes mid-ramp.
#[derive(Debug, Clone, Copy)]
pub struct RampGenerator {
    pub rate_per_sec: i32,
    pub value: i32,
}
impl RampGenerator {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let target = inputs.first().copied().unwrap_or(0);
        let max_delta = (self.rate_per_sec as i64 * ctx.dt_ms as i64 / 1000) as i32;
        let delta = (target - self.value).clamp(-max_delta.abs().max(1), max_delta.abs().max(1));
        if self.value != target {
            self.value += delta;
        }
        self.value.into()
    }
}

/// Free-running software PWM: truthy for `duty_thousandths / 1000` of each
/// `period_ms`, consumed by a channel that has no hardware PWM peripheral
/// wired to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PwmGenerator {
    pub period_ms: u32,
    pub duty_thousandths: i32,
    pub phase_ms: u32,
}
impl PwmGenerator {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let duty = inputs.first().copied().unwrap_or(self.duty_thousandths).clamp(0, 1000);
        self.phase_ms = (self.phase_ms + ctx.dt_ms) % self.period_ms.max(1);
        let on_ms = (self.period_ms as i64 * duty as i64 / 1000) as u32;
        ((self.phase_ms < on_ms) as i32).into()
    }
}

/// Passes through the flags register of the channel named by
/// `channel_id`, resolved and written by the engine before this kind's
/// `step` is invoked (see `engine::LogicEngine`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelStatus;
impl ChannelStatus {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs.first().copied().unwrap_or(0).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Nop;
impl Nop {
    pub fn step(&mut self, _inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        0.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn inputs(vals: &[i32]) -> Inputs {
        Inputs::from_slice(vals).unwrap()
    }

    #[test]
    fn system_time_scales_by_unit() {
        let mut st = SystemTime { unit: TimeUnit::Seconds };
        let ctx = StepCtx { now_ms: 4500, dt_ms: 10 };
        assert_eq!(st.step(&inputs(&[]), ctx).primary, 4);
    }

    #[test]
    fn watchdog_fires_when_stuck() {
        let mut w = Watchdog { stuck_ms: 1000, ..Default::default() };
        let mut ctx = StepCtx { now_ms: 0, dt_ms: 10 };
        w.step(&inputs(&[5]), ctx);
        ctx.now_ms = 500;
        assert_eq!(w.step(&inputs(&[5]), ctx).primary, 0);
        ctx.now_ms = 1500;
        assert_eq!(w.step(&inputs(&[5]), ctx).primary, 1);
    }

    #[test]
    fn bit_pack_and_extract_round_trip() {
        let mut pack = BitPack;
        let packed = pack.step(&inputs(&[1, 0, 1, 1]), StepCtx { now_ms: 0, dt_ms: 2 }).primary;
        assert_eq!(packed, 0b1101);
        let mut extract = BitExtract { bit: 2 };
        assert_eq!(extract.step(&inputs(&[packed]), StepCtx { now_ms: 0, dt_ms: 2 }).primary, 1);
    }

    #[test]
    fn pwm_generator_respects_duty() {
        let mut p = PwmGenerator { period_ms: 100, duty_thousandths: 250, phase_ms: 0 };
        let ctx = StepCtx { now_ms: 0, dt_ms: 10 };
        let mut on_count = 0;
        for _ in 0..10 {
            if p.step(&inputs(&[250]), ctx).primary == 1 {
                on_count += 1;
            }
        }
        assert_eq!(on_count, 2);
    }
}
