//! 0xD0–0xDF Channel ops family (§4.2). These operate on a set of input
//! readings treated as redundant or cooperating channels, rather than on a
//! single signal.

use super::common::{Inputs, StepCtx, StepOutput};

#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelSum;
impl ChannelSum {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs.iter().sum::<i32>().into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelMin;
impl ChannelMin {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs.iter().copied().min().unwrap_or(0).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelMax;
impl ChannelMax {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs.iter().copied().max().unwrap_or(0).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelAvg;
impl ChannelAvg {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        if inputs.is_empty() {
            return 0.into();
        }
        ((inputs.iter().map(|v| *v as i64).sum::<i64>() / inputs.len() as i64) as i32).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Diff;
impl Diff {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let a = inputs.first().copied().unwrap_or(0);
        let b = inputs.get(1).copied().unwrap_or(0);
        (a - b).into()
    }
}

/// Compares `inputs[0]`/`inputs[1]` against `max_deviation`; the averaged
/// value is always the primary output, the fault flag (0/1) the secondary.
#[derive(Debug, Clone, Copy)]
pub struct RedundancyCheck {
    pub max_deviation: i32,
}
impl RedundancyCheck {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let a = inputs.first().copied().unwrap_or(0);
        let b = inputs.get(1).copied().unwrap_or(0);
        let avg = (a as i64 + b as i64) / 2;
        let fault = (a - b).abs() > self.max_deviation;
        StepOutput {
            primary: avg as i32,
            secondary: Some(fault as i32),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorSelectMode {
    Median,
    OutlierReject,
}

/// Median across redundant sensors, or the mean of inputs within
/// `outlier_threshold` of the median (outlier rejection).
#[derive(Debug, Clone, Copy)]
pub struct SensorSelect {
    pub mode: SensorSelectMode,
    pub outlier_threshold: i32,
}
impl SensorSelect {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        if inputs.is_empty() {
            return 0.into();
        }
        let mut sorted: Inputs = inputs.clone();
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 1 {
            sorted[mid]
        } else {
            (sorted[mid - 1] + sorted[mid]) / 2
        };
        match self.mode {
            SensorSelectMode::Median => median.into(),
            SensorSelectMode::OutlierReject => {
                let kept: heapless::Vec<i32, 8> = inputs
                    .iter()
                    .copied()
                    .filter(|v| (*v - median).abs() <= self.outlier_threshold)
                    .collect();
                if kept.is_empty() {
                    median.into()
                } else {
                    ((kept.iter().map(|v| *v as i64).sum::<i64>() / kept.len() as i64) as i32).into()
                }
            }
        }
    }
}

/// Applies a per-input staggered delay before passing values through,
/// so that e.g. relay-gang members close in sequence instead of at once.
/// `delays_ms[i]` gates `inputs[i]`; output is `inputs[0]` once its own
/// delay has elapsed since `enable` (`inputs[last]`, implicit truthy if
/// absent) went true — the remaining inputs are assumed already
/// individually delay-gated by sibling function instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelSync {
    pub delay_ms: u32,
    pub armed_since: Option<u32>,
}
impl ChannelSync {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let enable = super::common::truthy(inputs.get(1).copied().unwrap_or(1));
        let value = inputs.first().copied().unwrap_or(0);
        if !enable {
            self.armed_since = None;
            return 0.into();
        }
        let since = *self.armed_since.get_or_insert(ctx.now_ms);
        if crate::time::at_or_after(ctx.now_ms, since.wrapping_add(self.delay_ms)) {
            value.into()
        } else {
            0.into()
        }
    }
}

/// Drives every output in the gang to `inputs[0]` whenever `inputs[1]`
/// (enable) is truthy, else holds all off. Outputs are written by the
/// caller to each ganged channel; this block only computes the common
/// command.
#[derive(Debug, Clone, Copy, Default)]
pub struct GangControl;
impl GangControl {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let enable = super::common::truthy(inputs.get(1).copied().unwrap_or(1));
        let command = inputs.first().copied().unwrap_or(0);
        (if enable { command } else { 0 }).into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalanceMode {
    RoundRobin,
    Sequential,
    Proportional,
}

/// Distributes a single commanded `total` (`inputs[0]`) across
/// `slot_count` members, selecting `inputs[1]` as the active slot index
/// for round-robin/sequential, or splitting evenly for proportional. The
/// caller is expected to instantiate one block per member and pass its own
/// `member_index`.
#[derive(Debug, Clone, Copy)]
pub struct LoadBalance {
    pub mode: LoadBalanceMode,
    pub slot_count: i32,
    pub member_index: i32,
    pub rotation: i32,
}
impl LoadBalance {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let total = inputs.first().copied().unwrap_or(0);
        let advance = super::common::truthy(inputs.get(1).copied().unwrap_or(0));
        if self.slot_count <= 0 {
            return 0.into();
        }
        match self.mode {
            LoadBalanceMode::Proportional => (total / self.slot_count).into(),
            LoadBalanceMode::Sequential | LoadBalanceMode::RoundRobin => {
                if advance {
                    self.rotation = (self.rotation + 1) % self.slot_count;
                }
                let active = (self.member_index + self.rotation) % self.slot_count;
                (if active == 0 { total } else { 0 }).into()
            }
        }
    }
}

/// ORs the fault bit out of every input.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultAggregate;
impl FaultAggregate {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        super::common::bool_to_i32(inputs.iter().any(|v| super::common::truthy(*v))).into()
    }
}

/// Sheds lower-priority loads (higher index = lower priority) to keep the
/// summed current commitment under `limit_ma`. `inputs` are per-load
/// current draws (already ordered by descending priority); output is a
/// bitmask (bit i set => load i permitted to stay on).
#[derive(Debug, Clone, Copy)]
pub struct CurrentLimitManager {
    pub limit_ma: i32,
}
impl CurrentLimitManager {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let mut running_total: i64 = 0;
        let mut mask: i32 = 0;
        for (i, draw) in inputs.iter().enumerate() {
            running_total += *draw as i64;
            if running_total <= self.limit_ma as i64 {
                mask |= 1 << i;
            }
        }
        mask.into()
    }
}
