//! §4.2 — the logic engine: an ordered function-block evaluator.
//!
//! Functions run once per cycle in ascending `function_id` order. Because
//! each function's output write lands in the channel store immediately, a
//! higher-id function reading a lower-id function's output sees this
//! cycle's fresh value (an intentional pipeline); a function reading its
//! *own* output (a running integrator, a latch) sees the value from its
//! own last run — last cycle's, since its own write for this cycle has not
//! happened yet when its inputs are resolved. Disabled functions are
//! skipped entirely: their internal state (ring buffers, latches,
//! integrators) is left untouched, not reset.

use crate::channel::ChannelStore;
use crate::error::{PmuError, PmuResult};
use crate::function::common::{Inputs, StepCtx};
use crate::function::{Function, MAX_FUNCTIONS};

/// Ascending-id function table plus the evaluation loop.
#[derive(Default)]
pub struct LogicEngine {
    functions: heapless::Vec<Function, MAX_FUNCTIONS>,
}

impl LogicEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `function` keeping the table sorted by ascending
    /// `function_id`; rejects duplicate ids and a full table.
    pub fn add(&mut self, function: Function) -> PmuResult<()> {
        if self.functions.iter().any(|f| f.function_id == function.function_id) {
            return Err(PmuError::DuplicateFunctionId(function.function_id));
        }
        let pos = self
            .functions
            .iter()
            .position(|f| f.function_id > function.function_id)
            .unwrap_or(self.functions.len());
        self.functions
            .insert(pos, function)
            .map_err(|_| PmuError::FunctionTableFull)
    }

    pub fn remove(&mut self, function_id: u8) -> bool {
        if let Some(pos) = self.functions.iter().position(|f| f.function_id == function_id) {
            self.functions.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn set_enabled(&mut self, function_id: u8, enabled: bool) -> bool {
        if let Some(f) = self.functions.iter_mut().find(|f| f.function_id == function_id) {
            f.enabled = enabled;
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Runs every enabled function once, in ascending id order.
    pub fn evaluate(&mut self, store: &mut ChannelStore, ctx: StepCtx) {
        for function in self.functions.iter_mut() {
            if !function.enabled {
                continue;
            }
            let mut inputs = Inputs::new();
            for id in function.input_channel_ids.iter() {
                // Inputs vec is bounded to MAX_INPUTS and so is the
                // descriptor's input list; this push cannot fail.
                let _ = inputs.push(store.get_value(*id));
            }
            let out = function.kind.step(&inputs, ctx);
            if store.set_value(function.output_channel_id, out.primary).is_err() {
                log::warn!(
                    target: "pmu_core::engine",
                    "function {} failed to write output channel {}",
                    function.function_id,
                    function.output_channel_id
                );
            }
            if let (Some(secondary_id), Some(secondary_value)) =
                (function.secondary_output_channel_id, out.secondary)
            {
                if store.set_value(secondary_id, secondary_value).is_err() {
                    log::warn!(
                        target: "pmu_core::engine",
                        "function {} failed to write secondary output channel {}",
                        function.function_id,
                        secondary_id
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, ChannelClass, ChannelDirection, ChannelFlags, ChannelFormat};
    use crate::function::arithmetic::Add;
    use crate::function::FunctionKind;
    use heapless::String;

    fn channel(id: u16, direction: ChannelDirection) -> Channel {
        Channel {
            id,
            name: String::try_from("c").unwrap(),
            direction,
            class: if direction == ChannelDirection::Input {
                ChannelClass::InputAnalog
            } else {
                ChannelClass::OutputFunction
            },
            format: ChannelFormat::Raw,
            physical_index: None,
            value: 0,
            min_value: -100_000,
            max_value: 100_000,
            flags: ChannelFlags::ENABLED,
            unit: String::new(),
        }
    }

    #[test]
    fn evaluates_in_ascending_id_order_and_cascades() {
        let mut store = ChannelStore::new();
        store.register(channel(1, ChannelDirection::Input)).unwrap();
        store.register(channel(2, ChannelDirection::Output)).unwrap();
        store.register(channel(3, ChannelDirection::Output)).unwrap();
        store.set_value(1, 0).unwrap();
        // seed input channel 1 directly since it's Input, not writable via set_value
        store.get_info_mut(1).unwrap().value = 10;

        let mut engine = LogicEngine::new();
        // function 5 reads channel 1 -> channel 2
        engine
            .add(Function {
                function_id: 5,
                enabled: true,
                input_channel_ids: heapless::Vec::from_slice(&[1]).unwrap(),
                output_channel_id: 2,
                secondary_output_channel_id: None,
                kind: FunctionKind::Add(Add),
            })
            .unwrap();
        // function 10 reads channel 2 (this cycle's fresh write) -> channel 3
        engine
            .add(Function {
                function_id: 10,
                enabled: true,
                input_channel_ids: heapless::Vec::from_slice(&[2]).unwrap(),
                output_channel_id: 3,
                secondary_output_channel_id: None,
                kind: FunctionKind::Add(Add),
            })
            .unwrap();

        engine.evaluate(&mut store, StepCtx { now_ms: 0, dt_ms: 10 });
        assert_eq!(store.get_value(2), 10);
        assert_eq!(store.get_value(3), 10);
    }

    #[test]
    fn disabled_function_is_skipped_and_state_persists() {
        let mut store = ChannelStore::new();
        store.register(channel(1, ChannelDirection::Output)).unwrap();
        let mut engine = LogicEngine::new();
        engine
            .add(Function {
                function_id: 1,
                enabled: false,
                input_channel_ids: heapless::Vec::new(),
                output_channel_id: 1,
                secondary_output_channel_id: None,
                kind: FunctionKind::Constant(crate::function::utility::Constant { value: 42 }),
            })
            .unwrap();
        engine.evaluate(&mut store, StepCtx { now_ms: 0, dt_ms: 10 });
        assert_eq!(store.get_value(1), 0);
    }

    #[test]
    fn duplicate_function_id_rejected() {
        let mut engine = LogicEngine::new();
        let f = Function {
            function_id: 1,
            enabled: true,
            input_channel_ids: heapless::Vec::new(),
            output_channel_id: 1,
            secondary_output_channel_id: None,
            kind: FunctionKind::Nop(crate::function::utility::Nop),
        };
        engine.add(f.clone()).unwrap();
        assert_eq!(engine.add(f), Err(PmuError::DuplicateFunctionId(1)));
    }
}
