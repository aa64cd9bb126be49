//! 0x50–0x5F Control flow family (§4.2).

use super::common::{truthy, Inputs, StepCtx, StepOutput};

#[derive(Debug, Clone, Copy, Default)]
pub struct IfThenElse;
impl IfThenElse {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let cond = truthy(inputs.first().copied().unwrap_or(0));
        let then_v = inputs.get(1).copied().unwrap_or(0);
        let else_v = inputs.get(2).copied().unwrap_or(0);
        (if cond { then_v } else { else_v }).into()
    }
}

/// `inputs[0]` selects (clamped) among `inputs[1..]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Select;
impl Select {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let values = &inputs[1.min(inputs.len())..];
        if values.is_empty() {
            return 0.into();
        }
        let idx = inputs.first().copied().unwrap_or(0).clamp(0, values.len() as i32 - 1);
        values[idx as usize].into()
    }
}

/// Boolean multiplexer: `inputs[0]` selects `inputs[2]` when true, else
/// `inputs[1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mux;
impl Mux {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let sel = truthy(inputs.first().copied().unwrap_or(0));
        let a = inputs.get(1).copied().unwrap_or(0);
        let b = inputs.get(2).copied().unwrap_or(0);
        (if sel { b } else { a }).into()
    }
}

/// Index of the lowest-numbered truthy input, or `default` if none are
/// truthy.
#[derive(Debug, Clone, Copy)]
pub struct PriorityEncoder {
    pub default: i32,
}
impl PriorityEncoder {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        inputs
            .iter()
            .position(|v| truthy(*v))
            .map(|i| i as i32)
            .unwrap_or(self.default)
            .into()
    }
}

/// `inputs[0]` matched against `cases[i].0`; outputs `cases[i].1` on the
/// first match, else `default`.
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub cases: heapless::Vec<(i32, i32), 8>,
    pub default: i32,
}
impl SwitchCase {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let v = inputs.first().copied().unwrap_or(0);
        self.cases
            .iter()
            .find(|(case, _)| *case == v)
            .map(|(_, out)| *out)
            .unwrap_or(self.default)
            .into()
    }
}

/// Staircase band selector: `thresholds` ascending, `outputs.len() ==
/// thresholds.len() + 1`. Output is `outputs[k]` where `k` is the number
/// of thresholds `inputs[0]` is greater than or equal to.
#[derive(Debug, Clone)]
pub struct ThresholdSelect {
    pub thresholds: heapless::Vec<i32, 8>,
    pub outputs: heapless::Vec<i32, 9>,
}
impl ThresholdSelect {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let v = inputs.first().copied().unwrap_or(0);
        let band = self.thresholds.iter().filter(|t| v >= **t).count();
        self.outputs.get(band).copied().unwrap_or(0).into()
    }
}

/// Passes `inputs[1]` through while `inputs[0]` is truthy; otherwise holds
/// the last passed-through value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionalEnable {
    pub held: i32,
}
impl ConditionalEnable {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        if truthy(inputs.first().copied().unwrap_or(0)) {
            self.held = inputs.get(1).copied().unwrap_or(0);
        }
        self.held.into()
    }
}

/// Advances to the next configured step value on each rising edge of
/// `inputs[0]`, wrapping at the end of the sequence.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub steps: heapless::Vec<i32, 8>,
    pub index: usize,
    pub prev_truthy: bool,
}
impl Sequence {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        if self.steps.is_empty() {
            return 0.into();
        }
        let now = truthy(inputs.first().copied().unwrap_or(0));
        if now && !self.prev_truthy {
            self.index = (self.index + 1) % self.steps.len();
        }
        self.prev_truthy = now;
        self.steps[self.index].into()
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
    fn select_clamps_index() {
        let mut op = Select;
        assert_eq!(op.step(&inputs(&[5, 10, 20, 30]), CTX).primary, 30);
        assert_eq!(op.step(&inputs(&[-5, 10, 20, 30]), CTX).primary, 10);
    }

    #[test]
    fn threshold_select_bands() {
        let mut op = ThresholdSelect {
            thresholds: heapless::Vec::from_slice(&[100, 200]).unwrap(),
            outputs: heapless::Vec::from_slice(&[0, 1, 2]).unwrap(),
        };
        assert_eq!(op.step(&inputs(&[50]), CTX).primary, 0);
        assert_eq!(op.step(&inputs(&[150]), CTX).primary, 1);
        assert_eq!(op.step(&inputs(&[250]), CTX).primary, 2);
    }

    #[test]
    fn sequence_advances_on_rising_edge() {
        let mut op = Sequence {
            steps: heapless::Vec::from_slice(&[10, 20, 30]).unwrap(),
            index: 0,
            prev_truthy: false,
        };
        assert_eq!(op.step(&inputs(&[0]), CTX).primary, 10);
        assert_eq!(op.step(&inputs(&[1]), CTX).primary, 20);
        assert_eq!(op.step(&inputs(&[1]), CTX).primary, 20);
        assert_eq!(op.step(&inputs(&[0]), CTX).primary, 20);
        assert_eq!(op.step(&inputs(&[1]), CTX).primary, 30);
    }
}
