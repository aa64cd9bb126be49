//! 0x20–0x2F Comparison family (§4.2). All output boolean 0/1.

use super::common::{bool_to_i32, Inputs, StepCtx, StepOutput};

fn operands(inputs: &Inputs) -> (i32, i32) {
    (
        inputs.first().copied().unwrap_or(0),
        inputs.get(1).copied().unwrap_or(0),
    )
}

macro_rules! binary_cmp {
    ($name:ident, $op:tt) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;
        impl $name {
            pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
                let (a, b) = operands(inputs);
                bool_to_i32(a $op b).into()
            }
        }
    };
}

binary_cmp!(Gt, >);
binary_cmp!(Ge, >=);
binary_cmp!(Lt, <);
binary_cmp!(Le, <=);
binary_cmp!(Ne, !=);

#[derive(Debug, Clone, Copy)]
pub struct EqOp {
    pub tolerance: i32,
}
impl EqOp {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let (a, b) = operands(inputs);
        bool_to_i32((a - b).abs() <= self.tolerance.abs()).into()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InRange {
    pub low: i32,
    pub high: i32,
}
impl InRange {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let v = inputs.first().copied().unwrap_or(0);
        bool_to_i32(v >= self.low && v <= self.high).into()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OutOfRange {
    pub low: i32,
    pub high: i32,
}
impl OutOfRange {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let v = inputs.first().copied().unwrap_or(0);
        bool_to_i32(v < self.low || v > self.high).into()
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
    fn eq_within_tolerance() {
        let mut op = EqOp { tolerance: 5 };
        assert_eq!(op.step(&inputs(&[100, 103]), CTX).primary, 1);
        assert_eq!(op.step(&inputs(&[100, 110]), CTX).primary, 0);
    }

    #[test]
    fn range_checks() {
        let mut in_range = InRange { low: 0, high: 100 };
        assert_eq!(in_range.step(&inputs(&[50]), CTX).primary, 1);
        let mut out_of_range = OutOfRange { low: 0, high: 100 };
        assert_eq!(out_of_range.step(&inputs(&[150]), CTX).primary, 1);
    }
}
