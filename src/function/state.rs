//! 0xC0–0xCF State family (§4.2).

use super::common::{truthy, Inputs, StepCtx, StepOutput};

/// Priority reset/set latch: `inputs[0]` = set, `inputs[1]` = reset. Reset
/// wins when both are truthy in the same cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SrLatch {
    pub state: bool,
}
impl SrLatch {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let set = truthy(inputs.first().copied().unwrap_or(0));
        let reset = truthy(inputs.get(1).copied().unwrap_or(0));
        if reset {
            self.state = false;
        } else if set {
            self.state = true;
        }
        (self.state as i32).into()
    }
}

/// Flips on each rising edge of `inputs[0]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Toggle {
    pub state: bool,
    pub prev_truthy: bool,
}
impl Toggle {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let now = truthy(inputs.first().copied().unwrap_or(0));
        if now && !self.prev_truthy {
            self.state = !self.state;
        }
        self.prev_truthy = now;
        (self.state as i32).into()
    }
}

/// Retriggerable one-shot: each rising edge of `inputs[0]` (re)starts a
/// `pulse_ms` window during which the output is truthy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pulse {
    pub pulse_ms: u32,
    pub deadline_ms: u32,
    pub active: bool,
    pub prev_truthy: bool,
}
impl Pulse {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let now = truthy(inputs.first().copied().unwrap_or(0));
        if now && !self.prev_truthy {
            self.deadline_ms = ctx.now_ms.wrapping_add(self.pulse_ms);
            self.active = true;
        }
        self.prev_truthy = now;
        if self.active && crate::time::at_or_after(ctx.now_ms, self.deadline_ms) {
            self.active = false;
        }
        (self.active as i32).into()
    }
}

/// Outputs truthy only after `inputs[0]` has been continuously truthy for
/// `delay_ms`; drops immediately when the input goes false.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelayOn {
    pub delay_ms: u32,
    pub since_ms: Option<u32>,
    pub state: bool,
}
impl DelayOn {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let input = truthy(inputs.first().copied().unwrap_or(0));
        if !input {
            self.since_ms = None;
            self.state = false;
        } else {
            let since = *self.since_ms.get_or_insert(ctx.now_ms);
            if crate::time::at_or_after(ctx.now_ms, since.wrapping_add(self.delay_ms)) {
                self.state = true;
            }
        }
        (self.state as i32).into()
    }
}

/// Drops truthy only after `inputs[0]` has been continuously false for
/// `delay_ms` (run-on); rises immediately when the input goes true.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelayOff {
    pub delay_ms: u32,
    pub since_false_ms: Option<u32>,
    pub state: bool,
}
impl DelayOff {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let input = truthy(inputs.first().copied().unwrap_or(0));
        if input {
            self.since_false_ms = None;
            self.state = true;
        } else {
            let since = *self.since_false_ms.get_or_insert(ctx.now_ms);
            if crate::time::at_or_after(ctx.now_ms, since.wrapping_add(self.delay_ms)) {
                self.state = false;
            }
        }
        (self.state as i32).into()
    }
}

/// Square-wave generator, free-running while `inputs[0]` is truthy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flasher {
    pub on_ms: u32,
    pub off_ms: u32,
    pub state: bool,
    pub phase_ms: u32,
}
impl Flasher {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        if !truthy(inputs.first().copied().unwrap_or(0)) {
            self.state = false;
            self.phase_ms = 0;
            return 0.into();
        }
        self.phase_ms += ctx.dt_ms;
        let period = self.on_ms.max(1) + self.off_ms.max(1);
        self.phase_ms %= period.max(1);
        self.state = self.phase_ms < self.on_ms;
        (self.state as i32).into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    Rising,
    Falling,
    Both,
}

/// Edge-triggered counter with a configurable wrap modulus (0 disables
/// wrapping).
#[derive(Debug, Clone, Copy)]
pub struct Counter {
    pub edge: EdgeMode,
    pub modulus: i32,
    pub count: i32,
    pub prev_truthy: bool,
}
impl Counter {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let now = truthy(inputs.first().copied().unwrap_or(0));
        if truthy(inputs.get(1).copied().unwrap_or(0)) {
            self.count = 0;
        }
        let rising = now && !self.prev_truthy;
        let falling = !now && self.prev_truthy;
        let fire = match self.edge {
            EdgeMode::Rising => rising,
            EdgeMode::Falling => falling,
            EdgeMode::Both => rising || falling,
        };
        if fire {
            self.count += 1;
            if self.modulus > 0 {
                self.count %= self.modulus;
            }
        }
        self.prev_truthy = now;
        self.count.into()
    }
}

/// Elapsed-time accumulator: runs while `inputs[0]` (run) is truthy, resets
/// to 0 when `inputs[1]` (reset) is truthy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timer {
    pub elapsed_ms: u32,
}
impl Timer {
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        let run = truthy(inputs.first().copied().unwrap_or(0));
        let reset = truthy(inputs.get(1).copied().unwrap_or(0));
        if reset {
            self.elapsed_ms = 0;
        } else if run {
            self.elapsed_ms = self.elapsed_ms.saturating_add(ctx.dt_ms);
        }
        (self.elapsed_ms as i32).into()
    }
}

/// One row of a programmable state machine's transition table: from
/// `state`, on condition-channel value `on_value`, go to `next_state`.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub state: i32,
    pub on_value: i32,
    pub next_state: i32,
}

/// Table-driven state machine. `inputs[0]` is the condition value compared
/// against each transition row whose `state` matches the current state;
/// the first match wins. No matching row holds the current state.
#[derive(Debug, Clone)]
pub struct StateMachine {
    pub transitions: heapless::Vec<Transition, 16>,
    pub state: i32,
}
impl StateMachine {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let cond = inputs.first().copied().unwrap_or(0);
        if let Some(t) = self
            .transitions
            .iter()
            .find(|t| t.state == self.state && t.on_value == cond)
        {
            self.state = t.next_state;
        }
        self.state.into()
    }
}

/// Sample-and-hold: captures `inputs[1]` on a rising edge of `inputs[0]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Memory {
    pub held: i32,
    pub prev_truthy: bool,
}
impl Memory {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let trigger = truthy(inputs.first().copied().unwrap_or(0));
        if trigger && !self.prev_truthy {
            self.held = inputs.get(1).copied().unwrap_or(0);
        }
        self.prev_truthy = trigger;
        self.held.into()
    }
}

/// Tracks the highest value seen on `inputs[0]`; `inputs[1]` truthy resets.
#[derive(Debug, Clone, Copy)]
pub struct PeakHold {
    pub value: i32,
    pub initialized: bool,
}
impl PeakHold {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let x = inputs.first().copied().unwrap_or(0);
        if truthy(inputs.get(1).copied().unwrap_or(0)) || !self.initialized {
            self.value = x;
            self.initialized = true;
        } else if x > self.value {
            self.value = x;
        }
        self.value.into()
    }
}

/// Tracks the lowest value seen on `inputs[0]`; `inputs[1]` truthy resets.
#[derive(Debug, Clone, Copy)]
pub struct MinHold {
    pub value: i32,
    pub initialized: bool,
}
impl MinHold {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let x = inputs.first().copied().unwrap_or(0);
        if truthy(inputs.get(1).copied().unwrap_or(0)) || !self.initialized {
            self.value = x;
            self.initialized = true;
        } else if x < self.value {
            self.value = x;
        }
        self.value.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn inputs(vals: &[i32]) -> Inputs {
        Inputs::from_slice(vals).unwrap()
    }

    #[test]
    fn sr_latch_reset_wins() {
        let mut l = SrLatch::default();
        let ctx = StepCtx { now_ms: 0, dt_ms: 2 };
        assert_eq!(l.step(&inputs(&[1, 0]), ctx).primary, 1);
        assert_eq!(l.step(&inputs(&[1, 1]), ctx).primary, 0);
    }

    /// §8 S2 — DELAY_OFF run-on scenario.
    #[test]
    fn delay_off_runs_on_after_input_drops() {
        let mut d = DelayOff {
            delay_ms: 500,
            since_false_ms: None,
            state: false,
        };
        let mut t = 0u32;
        let step = |d: &mut DelayOff, t: u32, input: i32| d.step(&inputs(&[input]), StepCtx { now_ms: t, dt_ms: 100 });

        assert_eq!(step(&mut d, t, 1).primary, 1);
        t += 100;
        assert_eq!(step(&mut d, t, 0).primary, 1, "still within run-on window");
        t += 500;
        assert_eq!(step(&mut d, t, 0).primary, 0, "run-on window elapsed");
    }

    #[test]
    fn counter_wraps_at_modulus() {
        let mut c = Counter {
            edge: EdgeMode::Rising,
            modulus: 3,
            count: 0,
            prev_truthy: false,
        };
        let ctx = StepCtx { now_ms: 0, dt_ms: 2 };
        for expect in [1, 2, 0, 1] {
            c.step(&inputs(&[0]), ctx);
            assert_eq!(c.step(&inputs(&[1]), ctx).primary, expect);
        }
    }

    #[test]
    fn state_machine_follows_transition_table() {
        let mut sm = StateMachine {
            transitions: heapless::Vec::from_slice(&[
                Transition { state: 0, on_value: 1, next_state: 1 },
                Transition { state: 1, on_value: 1, next_state: 2 },
                Transition { state: 1, on_value: 0, next_state: 0 },
            ])
            .unwrap(),
            state: 0,
        };
        let ctx = StepCtx { now_ms: 0, dt_ms: 2 };
        assert_eq!(sm.step(&inputs(&[0]), ctx).primary, 0);
        assert_eq!(sm.step(&inputs(&[1]), ctx).primary, 1);
        assert_eq!(sm.step(&inputs(&[1]), ctx).primary, 2);
    }
}
