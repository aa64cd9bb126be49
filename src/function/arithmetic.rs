//! 0x00–0x0F Arithmetic family (§4.2).

use super::common::{bool_to_i32, checked_div, truthy, Inputs, StepCtx, StepOutput};

#[derive(Debug, Clone, Copy, Default)]
pub struct Add;
impl Add {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs.iter().sum::<i32>().into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sub;
impl Sub {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let mut it = inputs.iter();
        let first = it.next().copied().unwrap_or(0);
        it.fold(first, |acc, v| acc - v).into()
    }
}

/// Output = ((...((in0 * in1) / scale_factor) * in2) / scale_factor ...).
/// Dividing by `scale_factor` after each multiplication is what keeps the
/// running product inside `i32` for fixed-point inputs (e.g. two
/// per-mil values multiplied together would otherwise overflow `i32` at
/// far smaller magnitudes than either alone).
#[derive(Debug, Clone, Copy)]
pub struct Mul {
    pub scale_factor: i32,
}
impl Mul {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let scale = if self.scale_factor == 0 {
            1
        } else {
            self.scale_factor
        };
        let mut it = inputs.iter();
        let first = it.next().copied().unwrap_or(0);
        it.fold(first, |acc, v| (acc * v) / scale).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Div;
impl Div {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let a = inputs.first().copied().unwrap_or(0);
        let b = inputs.get(1).copied().unwrap_or(0);
        checked_div(a, b).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MinOp;
impl MinOp {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs.iter().copied().min().unwrap_or(0).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MaxOp;
impl MaxOp {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs.iter().copied().max().unwrap_or(0).into()
    }
}

/// Average of 2–8 inputs, truncating division.
#[derive(Debug, Clone, Copy, Default)]
pub struct Avg;
impl Avg {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        if inputs.is_empty() {
            return 0.into();
        }
        (inputs.iter().sum::<i32>() / inputs.len() as i32).into()
    }
}

#[derive(Debug, Clone)]
pub struct WeightedAvg {
    pub weights: heapless::Vec<i32, { super::common::MAX_INPUTS }>,
}
impl WeightedAvg {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let weight_sum: i32 = self.weights.iter().sum();
        if weight_sum == 0 {
            return 0.into();
        }
        let num: i64 = inputs
            .iter()
            .zip(self.weights.iter())
            .map(|(v, w)| (*v as i64) * (*w as i64))
            .sum();
        ((num / weight_sum as i64) as i32).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AbsOp;
impl AbsOp {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs.first().copied().unwrap_or(0).saturating_abs().into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Negate;
impl Negate {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs.first().copied().unwrap_or(0).saturating_neg().into()
    }
}

/// Edge-triggered counter: increments (or decrements) by `step` on every
/// rising edge of input 0, wrapping within [min, max].
#[derive(Debug, Clone, Copy)]
pub struct IncrDecr {
    pub increment: bool,
    pub step: i32,
    pub min: i32,
    pub max: i32,
    pub value: i32,
    pub prev_truthy: bool,
}
impl IncrDecr {
    pub fn step_fn(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let now = truthy(inputs.first().copied().unwrap_or(0));
        if now && !self.prev_truthy {
            let span = self.max - self.min + 1;
            let delta = if self.increment { self.step } else { -self.step };
            let mut v = self.value + delta;
            if span > 0 {
                v = self.min + (v - self.min).rem_euclid(span);
            }
            self.value = v;
        }
        self.prev_truthy = now;
        self.value.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(vals: &[i32]) -> Inputs {
        Inputs::from_slice(vals).unwrap()
    }
    const CTX: StepCtx = StepCtx { now_ms: 0, dt_ms: 2 };

    #[test]
    fn div_by_zero_returns_max() {
        let mut op = Div;
        assert_eq!(op.step(&inputs(&[10, 0]), CTX).primary, i32::MAX);
    }

    #[test]
    fn avg_of_four() {
        let mut op = Avg;
        assert_eq!(op.step(&inputs(&[10, 20, 30, 40]), CTX).primary, 25);
    }

    #[test]
    fn incr_wraps() {
        let mut op = IncrDecr {
            increment: true,
            step: 1,
            min: 0,
            max: 2,
            value: 2,
            prev_truthy: false,
        };
        let out = op.step_fn(&inputs(&[1]), CTX);
        assert_eq!(out.primary, 0);
    }

    #[test]
    fn mul_applies_scale_factor() {
        let mut op = Mul { scale_factor: 1000 };
        // two per-mil values: 500 * 500 / 1000 = 250
        assert_eq!(op.step(&inputs(&[500, 500]), CTX).primary, 250);
    }

    #[test]
    fn bool_to_i32_roundtrip() {
        assert_eq!(bool_to_i32(true), 1);
        assert_eq!(bool_to_i32(false), 0);
    }
}
