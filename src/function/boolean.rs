//! 0x40–0x4F Boolean family (§4.2). 2–8 inputs; non-zero is true.

use super::common::{bool_to_i32, truthy, Inputs, StepCtx, StepOutput};

#[derive(Debug, Clone, Copy, Default)]
pub struct And;
impl And {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        bool_to_i32(!inputs.is_empty() && inputs.iter().all(|v| truthy(*v))).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Or;
impl Or {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        bool_to_i32(inputs.iter().any(|v| truthy(*v))).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Xor;
impl Xor {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let count = inputs.iter().filter(|v| truthy(**v)).count();
        bool_to_i32(count % 2 == 1).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Nand;
impl Nand {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let mut and = And;
        bool_to_i32(!truthy(and.step(inputs, ctx).primary)).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Nor;
impl Nor {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let mut or = Or;
        bool_to_i32(!truthy(or.step(inputs, ctx).primary)).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Not;
impl Not {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        bool_to_i32(!truthy(inputs.first().copied().unwrap_or(0))).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IsTrue;
impl IsTrue {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        bool_to_i32(truthy(inputs.first().copied().unwrap_or(0))).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IsFalse;
impl IsFalse {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        bool_to_i32(!truthy(inputs.first().copied().unwrap_or(0))).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const CTX: StepCtx = StepCtx { now_ms: 0, dt_ms: 2 };
    fn inputs(vals: &[i32]) -> Inputs {
        Inputs::from_slice(vals).unwrap()
    }

    #[test]
    fn and_or_xor() {
        assert_eq!(And.step(&inputs(&[1, 1, 1]), CTX).primary, 1);
        assert_eq!(And.step(&inputs(&[1, 0, 1]), CTX).primary, 0);
        assert_eq!(Or.step(&inputs(&[0, 0, 1]), CTX).primary, 1);
        assert_eq!(Xor.step(&inputs(&[1, 1, 1]), CTX).primary, 1);
        assert_eq!(Xor.step(&inputs(&[1, 1]), CTX).primary, 0);
    }
}
