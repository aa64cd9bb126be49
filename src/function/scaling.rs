//! 0xE0–0xEF I/O scaling family (§4.2). Single-input unit conversions
//! reused as building blocks elsewhere (`AbsOp` from arithmetic, `Deadband`
//! from filters, both re-exported here under their family names).

use super::common::{Inputs, StepCtx, StepOutput};

pub use super::arithmetic::AbsOp as Abs;
pub use super::filters::Deadband;

#[derive(Debug, Clone, Copy, Default)]
pub struct Copy_;
impl Copy_ {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs.first().copied().unwrap_or(0).into()
    }
}

/// `y = x * factor_thousandths / 1000 + offset`.
#[derive(Debug, Clone, Copy)]
pub struct Scale {
    pub factor_thousandths: i32,
    pub offset: i32,
}
impl Scale {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let x = inputs.first().copied().unwrap_or(0);
        ((x as i64 * self.factor_thousandths as i64 / 1000 + self.offset as i64) as i32).into()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Clamp {
    pub min: i32,
    pub max: i32,
}
impl Clamp {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs.first().copied().unwrap_or(0).clamp(self.min, self.max).into()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Invert {
    pub full_scale: i32,
}
impl Invert {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        (self.full_scale - inputs.first().copied().unwrap_or(0)).into()
    }
}

/// Linear remap of `[in_min, in_max]` onto `[out_min, out_max]`; input is
/// clamped to the source range first (no extrapolation, matching tables).
#[derive(Debug, Clone, Copy)]
pub struct Map {
    pub in_min: i32,
    pub in_max: i32,
    pub out_min: i32,
    pub out_max: i32,
}
impl Map {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let x = inputs.first().copied().unwrap_or(0).clamp(self.in_min, self.in_max);
        let span_in = (self.in_max - self.in_min) as i64;
        if span_in == 0 {
            return self.out_min.into();
        }
        let span_out = (self.out_max - self.out_min) as i64;
        (self.out_min as i64 + (x - self.in_min) as i64 * span_out / span_in).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sign;
impl Sign {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs.first().copied().unwrap_or(0).signum().into()
    }
}
