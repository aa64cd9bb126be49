//! The top-level owning object: one `Core` per board, built once from a
//! loaded `Config` and driven by repeated calls to `tick`. Ties together
//! the channel store, the logic engine, the per-output actuation state
//! machines, and the handler subsystem in the fixed per-cycle order the
//! data model requires: sample inputs, evaluate logic, actuate outputs,
//! drain handlers.
//!
//! There is no internal locking because there is exactly one writer per
//! region (the channel table, function state, output drivers) and `Core`
//! runs on a single cooperative task, per the concurrency model. A board
//! crate owns the periodic tick source and calls `tick` once per cycle;
//! it never blocks and never panics on a malformed runtime input.

use crate::actuation::hbridge::HbridgeOutput;
use crate::actuation::switch::SwitchOutput;
use crate::actuation::telemetry::{self, TelemetryIds};
use crate::actuation::{ActuationCtx, OutputState};
use crate::channel::{ChannelClass, ChannelFlags, ChannelFormat, ChannelStore};
use crate::config::{Config, OutputKind};
use crate::engine::LogicEngine;
use crate::error::PmuResult;
use crate::function::common::StepCtx;
use crate::handler::{Event, FrameSink, HandlerSubsystem, ScriptSink};
use crate::hal::{CanSignalSample, Hal};
use crate::system::{StatusBits, CHANNEL_STATUS_BITS};
use crate::time::{at_or_after, Millis};

/// Consecutive cycle overruns that raise the system fault status and
/// trigger load shedding.
pub const MAX_CONSECUTIVE_OVERRUNS: u8 = 5;
/// Maximum number of logical outputs (switch + H-bridge combined) one
/// `Core` can drive.
pub const MAX_OUTPUTS: usize = 32;
/// Maximum number of mapped CAN signals tracked for staleness.
pub const MAX_CAN_MAPPINGS: usize = 64;
/// Maximum number of physically backed analog or digital input channels
/// indexed for per-cycle sampling — well under the 1024-channel table
/// capacity, since most registered channels are virtual or output.
pub const MAX_PHYSICAL_INPUTS: usize = 128;

enum OutputInstance {
    Switch {
        setpoint_channel_id: u16,
        enable_channel_id: u16,
        cfg: crate::actuation::OutputConfig,
        state: SwitchOutput,
        telemetry: TelemetryIds,
    },
    Hbridge {
        setpoint_channel_id: u16,
        enable_channel_id: u16,
        position_channel_id: Option<u16>,
        physical_index: u16,
        cfg: crate::actuation::hbridge::HbridgeConfig,
        state: HbridgeOutput,
        telemetry: TelemetryIds,
    },
}

/// Which of digital input's three reading styles a physically backed
/// `InputDigital` channel samples, inferred from its configured format.
#[derive(Debug, Clone, Copy)]
enum DigitalKind {
    State,
    Frequency,
    Rpm,
}

struct AnalogInput {
    channel_id: u16,
    physical_index: u16,
}

struct DigitalInput {
    channel_id: u16,
    physical_index: u16,
    kind: DigitalKind,
}

struct CanChannelState {
    signal_id: u16,
    channel_id: u16,
    timeout_ms: u32,
    default_value: i32,
    last_rx_ms: Option<Millis>,
}

/// The single owning object for one board: channel table, logic engine,
/// output actuation state, and the handler subsystem.
pub struct Core {
    channels: ChannelStore,
    engine: LogicEngine,
    handlers: HandlerSubsystem,
    outputs: heapless::Vec<OutputInstance, MAX_OUTPUTS>,
    analog_inputs: heapless::Vec<AnalogInput, MAX_PHYSICAL_INPUTS>,
    digital_inputs: heapless::Vec<DigitalInput, MAX_PHYSICAL_INPUTS>,
    can_state: heapless::Vec<CanChannelState, MAX_CAN_MAPPINGS>,
    can_staging: heapless::Deque<CanSignalSample, MAX_CAN_MAPPINGS>,
    consecutive_overruns: u8,
    load_shed: bool,
    /// Total cycle overruns observed over the process lifetime.
    pub cycle_overrun_count: u32,
}

impl Core {
    /// Registers every channel, function, output, handler, and CAN mapping
    /// from `config`, returning the first configuration-time error
    /// encountered. A malformed configuration never partially applies to
    /// a `Core` the caller goes on to use — on `Err` the returned state is
    /// meaningless and must be discarded.
    pub fn from_config(config: Config) -> PmuResult<Core> {
        let mut channels = ChannelStore::new();
        config.register_channels(&mut channels)?;
        config.validate_outputs(&channels)?;
        config.validate_can_mappings(&channels)?;

        let mut handlers = HandlerSubsystem::new();
        for descriptor in config.handlers.iter() {
            handlers.add_handler(descriptor.handler.clone())?;
        }

        let mut outputs = heapless::Vec::new();
        for output in config.outputs.iter() {
            let instance = match &output.kind {
                OutputKind::Switch(cfg) => OutputInstance::Switch {
                    setpoint_channel_id: output.setpoint_channel_id,
                    enable_channel_id: output.enable_channel_id,
                    cfg: cfg.clone(),
                    state: SwitchOutput::new(),
                    telemetry: output.telemetry,
                },
                OutputKind::Hbridge(hb) => OutputInstance::Hbridge {
                    setpoint_channel_id: output.setpoint_channel_id,
                    enable_channel_id: output.enable_channel_id,
                    position_channel_id: hb.position_channel_id,
                    physical_index: hb.physical_index,
                    cfg: hb.cfg.clone(),
                    state: HbridgeOutput::new(),
                    telemetry: output.telemetry,
                },
            };
            outputs
                .push(instance)
                .map_err(|_| crate::error::PmuError::CapacityExceeded)?;
        }

        let mut can_state = heapless::Vec::new();
        for mapping in config.can_mappings.iter() {
            can_state
                .push(CanChannelState {
                    signal_id: mapping.signal_id,
                    channel_id: mapping.channel_id,
                    timeout_ms: mapping.timeout_ms,
                    default_value: mapping.default_value,
                    last_rx_ms: None,
                })
                .map_err(|_| crate::error::PmuError::CapacityExceeded)?;
        }

        let (analog_inputs, digital_inputs) = Self::index_physical_inputs(&channels);

        let engine = config.build_engine(&channels)?;

        Ok(Core {
            channels,
            engine,
            handlers,
            outputs,
            analog_inputs,
            digital_inputs,
            can_state,
            can_staging: heapless::Deque::new(),
            consecutive_overruns: 0,
            load_shed: false,
            cycle_overrun_count: 0,
        })
    }

    /// Scans the registered channels once at build time for physically
    /// backed analog/digital inputs, so the per-cycle sampling phase never
    /// has to walk the full 1024-entry table.
    fn index_physical_inputs(
        channels: &ChannelStore,
    ) -> (
        heapless::Vec<AnalogInput, MAX_PHYSICAL_INPUTS>,
        heapless::Vec<DigitalInput, MAX_PHYSICAL_INPUTS>,
    ) {
        let mut analog = heapless::Vec::new();
        let mut digital = heapless::Vec::new();
        for channel in channels.iter() {
            let Some(physical_index) = channel.physical_index else {
                continue;
            };
            match channel.class {
                ChannelClass::InputAnalog => {
                    let _ = analog.push(AnalogInput { channel_id: channel.id, physical_index });
                }
                ChannelClass::InputDigital => {
                    let kind = match channel.format {
                        ChannelFormat::FrequencyHz => DigitalKind::Frequency,
                        ChannelFormat::Rpm => DigitalKind::Rpm,
                        _ => DigitalKind::State,
                    };
                    let _ = digital.push(DigitalInput { channel_id: channel.id, physical_index, kind });
                }
                _ => {}
            }
        }
        (analog, digital)
    }

    /// Read-only access to the channel table, for telemetry and tests.
    pub fn channels(&self) -> &ChannelStore {
        &self.channels
    }

    /// Mutable access, for a loader/operator path that writes setpoints or
    /// toggles `enabled` outside the normal logic-engine path.
    pub fn channels_mut(&mut self) -> &mut ChannelStore {
        &mut self.channels
    }

    /// Queues one CAN RX sample for the next cycle's sampling phase.
    /// Mirrors the interrupt-deposits-into-a-buffer ordering guarantee:
    /// this is safe to call from an ISR context since it never blocks and
    /// only ever drops the oldest pending sample on overflow.
    pub fn ingest_can(&mut self, sample: CanSignalSample) {
        if self.can_staging.push_back(sample).is_err() {
            let _ = self.can_staging.pop_front();
            let _ = self.can_staging.push_back(sample);
        }
    }

    /// Runs one complete cycle: sample, evaluate, actuate, drain handlers.
    ///
    /// `dt_ms` is the elapsed wall-clock time this cycle represents —
    /// normally the configured cycle period, but larger when `overran` is
    /// true and the scheduler skipped one or more ticks, so time-based
    /// function and actuation state (PID integrals, ramps, delay timers)
    /// stays wall-clock-correct rather than silently losing the skipped
    /// time. `overran` set by the caller whenever the previous cycle's
    /// wall-clock budget was exceeded; five consecutive overruns raise the
    /// system fault status and force every non-critical output off.
    pub fn tick(&mut self, now_ms: Millis, dt_ms: u32, overran: bool, hal: &mut impl Hal, frames: &mut impl FrameSink, scripts: &mut impl ScriptSink) {
        self.note_overrun(overran);
        self.sample_inputs(now_ms, hal);
        self.engine.evaluate(&mut self.channels, StepCtx { now_ms, dt_ms });
        self.actuate_outputs(now_ms, hal);
        self.handlers.drain(&mut self.channels, frames, scripts);
    }

    fn note_overrun(&mut self, overran: bool) {
        if overran {
            self.consecutive_overruns = self.consecutive_overruns.saturating_add(1);
            self.cycle_overrun_count += 1;
            log::warn!(target: "pmu_core::core", "cycle overrun (consecutive={})", self.consecutive_overruns);
        } else {
            self.consecutive_overruns = 0;
        }

        let should_shed = self.consecutive_overruns >= MAX_CONSECUTIVE_OVERRUNS;
        if should_shed && !self.load_shed {
            log::error!(target: "pmu_core::core", "cycle overrun limit reached, shedding non-critical load");
        }
        self.load_shed = should_shed;
        if self.load_shed {
            if let Some(status) = self.channels.get_info(CHANNEL_STATUS_BITS).map(|c| c.value as u32) {
                let bits = StatusBits::from_bits_truncate(status) | StatusBits::FAULT | StatusBits::CYCLE_OVERRUN | StatusBits::LOAD_SHED;
                self.channels.write_feedback(CHANNEL_STATUS_BITS, bits.bits() as i32);
            }
        }
    }

    fn sample_inputs(&mut self, now_ms: Millis, hal: &mut impl Hal) {
        for input in self.analog_inputs.iter() {
            let value = hal.sample_scaled(input.physical_index);
            self.channels.write_feedback(input.channel_id, value);
        }
        for input in self.digital_inputs.iter() {
            let value = match input.kind {
                DigitalKind::State => match hal.state(input.physical_index) {
                    crate::hal::DigitalState::Low => 0,
                    crate::hal::DigitalState::High => 1,
                },
                DigitalKind::Frequency => hal.frequency(input.physical_index) as i32,
                DigitalKind::Rpm => hal.rpm(input.physical_index),
            };
            self.channels.write_feedback(input.channel_id, value);
        }

        while let Some(sample) = self.can_staging.pop_front() {
            if let Some(mapping) = self.can_state.iter_mut().find(|m| m.signal_id == sample.signal_id) {
                self.channels.write_feedback(mapping.channel_id, sample.value);
                if let Some(c) = self.channels.get_info_mut(mapping.channel_id) {
                    c.flags.remove(ChannelFlags::STALE);
                }
                mapping.last_rx_ms = Some(sample.timestamp_ms);
            }
        }
        for mapping in self.can_state.iter_mut() {
            let stale = match mapping.last_rx_ms {
                None => true,
                Some(last) => at_or_after(now_ms, last.wrapping_add(mapping.timeout_ms)),
            };
            if stale {
                self.channels.write_feedback(mapping.channel_id, mapping.default_value);
                if let Some(c) = self.channels.get_info_mut(mapping.channel_id) {
                    c.flags.insert(ChannelFlags::STALE);
                }
            }
        }
    }

    fn actuate_outputs(&mut self, now_ms: Millis, hal: &mut impl Hal) {
        let ctx = ActuationCtx { now_ms };
        for output in self.outputs.iter_mut() {
            match output {
                OutputInstance::Switch { setpoint_channel_id, enable_channel_id, cfg, state, telemetry } => {
                    let setpoint = self.channels.get_value(*setpoint_channel_id);
                    let channel_enabled = self.channels.get_value(*enable_channel_id) != 0;
                    let enabled = channel_enabled && (!self.load_shed || cfg.critical);
                    state.tick(cfg, setpoint, enabled, ctx, hal);
                    telemetry::publish(&mut self.channels, *telemetry, state.state, state.measured_current_ma, state.applied_value, state.fault_flags);
                    Self::log_output_state(*setpoint_channel_id, state.state);
                }
                OutputInstance::Hbridge {
                    setpoint_channel_id,
                    enable_channel_id,
                    position_channel_id,
                    physical_index,
                    cfg,
                    state,
                    telemetry,
                } => {
                    let setpoint = self.channels.get_value(*setpoint_channel_id);
                    let channel_enabled = self.channels.get_value(*enable_channel_id) != 0;
                    let enabled = channel_enabled && (!self.load_shed || cfg.critical);
                    let position = position_channel_id.map(|id| self.channels.get_value(id)).unwrap_or(0);
                    state.tick(cfg, setpoint, enabled, position, ctx, hal, *physical_index);
                    telemetry::publish(&mut self.channels, *telemetry, state.state, state.measured_current_ma, state.duty_permil, state.fault_flags);
                    Self::log_output_state(*setpoint_channel_id, state.state);
                }
            }
        }
    }

    fn log_output_state(setpoint_channel_id: u16, state: OutputState) {
        match state {
            OutputState::Fault => {
                log::error!(target: "pmu_core::actuation", "output on setpoint channel {} entered terminal FAULT", setpoint_channel_id);
            }
            OutputState::Overcurrent | OutputState::Overtemp | OutputState::Short => {
                log::warn!(target: "pmu_core::actuation", "output on setpoint channel {} entered {:?}", setpoint_channel_id, state);
            }
            _ => {
                log::trace!(target: "pmu_core::actuation", "output on setpoint channel {} now {:?}", setpoint_channel_id, state);
            }
        }
    }

    /// Pushes one logic/sampling-layer event onto the handler queue, to be
    /// drained at the end of the current or next cycle.
    pub fn push_event(&mut self, event: Event) {
        self.handlers.push(event);
    }

    /// True once five consecutive cycle overruns have forced non-critical
    /// outputs off.
    pub fn is_load_shedding(&self) -> bool {
        self.load_shed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::hbridge::HbridgeConfig;
    use crate::actuation::telemetry::TelemetryIds;
    use crate::actuation::OutputConfig;
    use crate::channel::{ChannelDirection, ChannelFormat};
    use crate::config::{ChannelDescriptor, Config, HbridgeOutputConfig, OutputDescriptor, OutputKind};
    use crate::function::utility::Constant;
    use crate::function::{Function, FunctionKind};
    use crate::hal::fake::FakeBoard;
    use crate::handler::{FrameSink, ScriptSink};
    use heapless::String;

    #[derive(Default)]
    struct NullFrameSink;
    impl FrameSink for NullFrameSink {
        fn emit(&mut self, _frame_id: u16, _payload: &[u8]) {}
    }
    #[derive(Default)]
    struct NullScriptSink;
    impl ScriptSink for NullScriptSink {
        fn invoke(&mut self, _script_id: u16) {}
    }

    fn channel(id: u16, direction: ChannelDirection, min: i32, max: i32) -> ChannelDescriptor {
        ChannelDescriptor {
            id,
            name: String::try_from("c").unwrap(),
            direction,
            class: if direction == ChannelDirection::Input {
                crate::channel::ChannelClass::InputAnalog
            } else {
                crate::channel::ChannelClass::OutputPower
            },
            format: ChannelFormat::Raw,
            physical_index: None,
            min_value: min,
            max_value: max,
            initial_value: 0,
            enabled: true,
            inverted: false,
            unit: String::new(),
        }
    }

    fn switch_output_cfg() -> OutputConfig {
        OutputConfig {
            merged_pins: heapless::Vec::from_slice(&[0]).unwrap(),
            pwm_frequency_hz: 200,
            soft_start_ramp_ms: 0,
            inrush_current_ma: 8000,
            inrush_time_ms: 200,
            max_current_ma: 5000,
            min_current_ma: 0,
            over_temp_threshold_c: 125,
            startup_grace_ms: 0,
            max_retries: 3,
            retry_interval_ms: 1000,
            retry_forever: false,
            critical: false,
        }
    }

    fn basic_config() -> Config {
        let mut cfg = Config::new();
        // setpoint (written by logic), a pre-enabled enable channel, and
        // the telemetry quartet.
        cfg.channels.push(channel(100, ChannelDirection::Output, 0, 1000)).unwrap();
        let mut enable = channel(101, ChannelDirection::Output, 0, 1);
        enable.initial_value = 1;
        cfg.channels.push(enable).unwrap();
        for id in 102..106u16 {
            cfg.channels.push(channel(id, ChannelDirection::Output, i32::MIN, i32::MAX)).unwrap();
        }

        cfg.functions.push(crate::config::FunctionDescriptor {
            function_id: 0,
            enabled: true,
            input_channel_ids: heapless::Vec::new(),
            output_channel_id: 100,
            secondary_output_channel_id: None,
            kind: FunctionKind::Constant(Constant { value: 1000 }),
        });

        cfg.outputs.push(OutputDescriptor {
            setpoint_channel_id: 100,
            enable_channel_id: 101,
            kind: OutputKind::Switch(switch_output_cfg()),
            telemetry: TelemetryIds {
                status_channel_id: 102,
                current_channel_id: 103,
                dc_channel_id: 104,
                fault_channel_id: 105,
            },
        });
        cfg
    }

    #[test]
    fn runs_a_cycle_end_to_end() {
        let cfg = basic_config();
        let mut core = Core::from_config(cfg).unwrap();
        let mut board = FakeBoard::new();
        let mut frames = NullFrameSink;
        let mut scripts = NullScriptSink;

        core.tick(0, 2, false, &mut board, &mut frames, &mut scripts);
        // logic wrote 1000 into the setpoint; the switch output (no
        // soft-start) should have jumped straight to driving it.
        assert_eq!(core.channels().get_value(104), 1000);
        assert!(matches!(core.channels().get_value(102), 2 | 3));
    }

    #[test]
    fn load_sheds_non_critical_outputs_after_consecutive_overruns() {
        let cfg = basic_config();
        let mut core = Core::from_config(cfg).unwrap();
        let mut board = FakeBoard::new();
        let mut frames = NullFrameSink;
        let mut scripts = NullScriptSink;

        let mut t = 0u32;
        for _ in 0..MAX_CONSECUTIVE_OVERRUNS {
            t += 2;
            core.tick(t, 2, true, &mut board, &mut frames, &mut scripts);
        }
        assert!(core.is_load_shedding());
        t += 2;
        core.tick(t, 2, true, &mut board, &mut frames, &mut scripts);
        // non-critical switch output forced off despite a nonzero setpoint
        assert_eq!(core.channels().get_value(104), 0);
    }

    #[test]
    fn can_mapping_goes_stale_without_fresh_frames() {
        let mut cfg = Config::new();
        let mut input = channel(50, ChannelDirection::Input, i32::MIN, i32::MAX);
        input.class = crate::channel::ChannelClass::InputCan;
        cfg.channels.push(input).unwrap();
        cfg.can_mappings.push(crate::config::CanMapping {
            signal_id: 7,
            channel_id: 50,
            timeout_ms: 100,
            default_value: -1,
        });
        let mut core = Core::from_config(cfg).unwrap();
        let mut board = FakeBoard::new();
        let mut frames = NullFrameSink;
        let mut scripts = NullScriptSink;

        core.ingest_can(CanSignalSample { signal_id: 7, value: 42, timestamp_ms: 0 });
        core.tick(0, 2, false, &mut board, &mut frames, &mut scripts);
        assert_eq!(core.channels().get_value(50), 42);
        assert!(!core.channels().get_info(50).unwrap().flags.contains(ChannelFlags::STALE));

        core.tick(500, 2, false, &mut board, &mut frames, &mut scripts);
        assert_eq!(core.channels().get_value(50), -1);
        assert!(core.channels().get_info(50).unwrap().flags.contains(ChannelFlags::STALE));
    }

    #[test]
    fn hbridge_output_descriptor_wires_physical_index_and_position() {
        let mut cfg = Config::new();
        cfg.channels.push(channel(200, ChannelDirection::Output, -1000, 1000)).unwrap();
        let mut enable = channel(201, ChannelDirection::Output, 0, 1);
        enable.initial_value = 1;
        cfg.channels.push(enable).unwrap();
        cfg.channels.push(channel(202, ChannelDirection::Input, i32::MIN, i32::MAX)).unwrap();
        for id in 203..207u16 {
            cfg.channels.push(channel(id, ChannelDirection::Output, i32::MIN, i32::MAX)).unwrap();
        }
        cfg.outputs.push(OutputDescriptor {
            setpoint_channel_id: 200,
            enable_channel_id: 201,
            kind: OutputKind::Hbridge(HbridgeOutputConfig {
                cfg: HbridgeConfig::default(),
                physical_index: 3,
                position_channel_id: Some(202),
            }),
            telemetry: TelemetryIds {
                status_channel_id: 203,
                current_channel_id: 204,
                dc_channel_id: 205,
                fault_channel_id: 206,
            },
        });
        let core = Core::from_config(cfg);
        assert!(core.is_ok());
    }
}
