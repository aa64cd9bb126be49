//! §6.1 — the configuration contract: descriptors the loader assembles
//! into channels, logic functions, output drivers and handlers, plus the
//! monotonic id allocator for virtual channels created at load time.
//!
//! Channel descriptors are wire-serializable (`serde` + `bincode`, per the
//! board's persisted configuration blob); function descriptors are not —
//! the op catalog's structs carry no serde derive, so function tables are
//! assembled programmatically by a board-specific builder rather than
//! deserialized from bytes. See `DESIGN.md`.

use crate::actuation::hbridge::HbridgeConfig;
use crate::actuation::telemetry::TelemetryIds;
use crate::actuation::OutputConfig;
use crate::channel::{Channel, ChannelClass, ChannelDirection, ChannelFormat, ChannelStore, MAX_NAME_LEN, MAX_UNIT_LEN};
use crate::engine::LogicEngine;
use crate::error::{PmuError, PmuResult};
use crate::function::common::MAX_INPUTS;
use crate::function::{Function, FunctionKind};
use crate::handler::Handler;
use crate::system::USER_CHANNEL_ID_THRESHOLD;
use heapless::String;
use serde::{Deserialize, Serialize};

/// Wire form of a [`Channel`]; `build` converts it, clamping `value` into
/// range and rejecting names/units too long to fit their bounded strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub id: u16,
    pub name: heapless::String<MAX_NAME_LEN>,
    pub direction: ChannelDirection,
    pub class: ChannelClass,
    pub format: ChannelFormat,
    pub physical_index: Option<u16>,
    pub min_value: i32,
    pub max_value: i32,
    pub initial_value: i32,
    pub enabled: bool,
    pub inverted: bool,
    pub unit: heapless::String<MAX_UNIT_LEN>,
}

impl ChannelDescriptor {
    pub fn build(&self) -> Channel {
        use crate::channel::ChannelFlags;
        let mut flags = ChannelFlags::empty();
        if self.enabled {
            flags |= ChannelFlags::ENABLED;
        }
        if self.inverted {
            flags |= ChannelFlags::INVERTED;
        }
        Channel {
            id: self.id,
            name: self.name.clone(),
            direction: self.direction,
            class: self.class,
            format: self.format,
            physical_index: self.physical_index,
            value: self.initial_value.clamp(
                self.min_value.min(self.max_value),
                self.min_value.max(self.max_value),
            ),
            min_value: self.min_value,
            max_value: self.max_value,
            flags,
            unit: self.unit.clone(),
        }
    }
}

/// One row of the logic engine's function table, pre-resolved against
/// channel ids. Not serde-derived — see module docs.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    pub function_id: u8,
    pub enabled: bool,
    pub input_channel_ids: heapless::Vec<u16, MAX_INPUTS>,
    pub output_channel_id: u16,
    pub secondary_output_channel_id: Option<u16>,
    pub kind: FunctionKind,
}

impl FunctionDescriptor {
    pub fn build(self) -> Function {
        Function {
            function_id: self.function_id,
            enabled: self.enabled,
            input_channel_ids: self.input_channel_ids,
            output_channel_id: self.output_channel_id,
            secondary_output_channel_id: self.secondary_output_channel_id,
            kind: self.kind,
        }
    }
}

/// An H-bridge output's immutable config plus the two bits of wiring a
/// switch output doesn't need: which physical driver it commands, and
/// which channel (if any) feeds back a position/speed reading for stall
/// detection.
#[derive(Debug, Clone)]
pub struct HbridgeOutputConfig {
    pub cfg: HbridgeConfig,
    pub physical_index: u16,
    pub position_channel_id: Option<u16>,
}

/// The kind of state machine an [`OutputDescriptor`] drives, and the
/// parameters specific to it (high-side switch vs H-bridge).
#[derive(Debug, Clone)]
pub enum OutputKind {
    Switch(OutputConfig),
    Hbridge(HbridgeOutputConfig),
}

/// One logical output: a setpoint channel, a driven-by state machine, and
/// the telemetry quartet it publishes to (§4.3.5).
#[derive(Debug, Clone)]
pub struct OutputDescriptor {
    pub setpoint_channel_id: u16,
    pub enable_channel_id: u16,
    pub kind: OutputKind,
    pub telemetry: TelemetryIds,
}

/// One row of the handler table, paired with the channels it validates
/// against at build time.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    pub handler: Handler,
}

/// Maps one incoming CAN signal to the channel it updates (CAN RX sampling
/// adapter contract): the core writes `channel_id` and resets its stale
/// timer whenever a frame carrying `signal_id` arrives, and resets it to
/// `default_value` with the STALE flag set if no frame arrives within
/// `timeout_ms`.
#[derive(Debug, Clone, Copy)]
pub struct CanMapping {
    pub signal_id: u16,
    pub channel_id: u16,
    pub timeout_ms: u32,
    pub default_value: i32,
}

/// Monotonic allocator for virtual channel ids created at load time —
/// ids below [`USER_CHANNEL_ID_THRESHOLD`] are reserved for system,
/// constant, and physically-backed channels assigned explicitly by the
/// loader (§4.1 "Id generation").
#[derive(Debug, Clone)]
pub struct ChannelIdAllocator {
    next: u16,
}

impl Default for ChannelIdAllocator {
    fn default() -> Self {
        ChannelIdAllocator { next: USER_CHANNEL_ID_THRESHOLD }
    }
}

impl ChannelIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> PmuResult<u16> {
        let id = self.next;
        if id as usize >= crate::channel::MAX_CHANNELS {
            return Err(PmuError::CapacityExceeded);
        }
        self.next = self.next.wrapping_add(1);
        Ok(id)
    }
}

/// The full assembled configuration for one board: every descriptor the
/// loader produced from its persisted configuration blob.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub channels: heapless::Vec<ChannelDescriptor, { crate::channel::MAX_CHANNELS }>,
    pub functions: std::vec::Vec<FunctionDescriptor>,
    pub outputs: std::vec::Vec<OutputDescriptor>,
    pub handlers: std::vec::Vec<HandlerDescriptor>,
    pub can_mappings: std::vec::Vec<CanMapping>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every channel descriptor into `store`, validating
    /// function and output references as it goes. Returns as soon as the
    /// first invalid reference is found — a malformed configuration must
    /// never partially apply (§7 registration-time validation).
    pub fn register_channels(&self, store: &mut ChannelStore) -> PmuResult<()> {
        for descriptor in self.channels.iter() {
            store
                .register(descriptor.build())
                .map_err(|_| PmuError::DuplicateChannelId(descriptor.id))?;
        }
        Ok(())
    }

    /// Validates that every function's input/output channel ids exist,
    /// then builds the ordered logic engine.
    pub fn build_engine(self, store: &ChannelStore) -> PmuResult<LogicEngine> {
        let mut engine = LogicEngine::new();
        for descriptor in self.functions {
            for id in descriptor.input_channel_ids.iter() {
                if store.get_info(*id).is_none() {
                    return Err(PmuError::UnknownChannelReference(*id));
                }
            }
            if store.get_info(descriptor.output_channel_id).is_none() {
                return Err(PmuError::UnknownChannelReference(descriptor.output_channel_id));
            }
            if let Some(id) = descriptor.secondary_output_channel_id {
                if store.get_info(id).is_none() {
                    return Err(PmuError::UnknownChannelReference(id));
                }
            }
            engine.add(descriptor.build())?;
        }
        Ok(engine)
    }

    /// Validates every output descriptor's referenced channels and the
    /// merged-pin count bound (§4.3.3: 1–3 pins per logical output).
    pub fn validate_outputs(&self, store: &ChannelStore) -> PmuResult<()> {
        for output in self.outputs.iter() {
            if store.get_info(output.setpoint_channel_id).is_none() {
                return Err(PmuError::UnknownChannelReference(output.setpoint_channel_id));
            }
            if store.get_info(output.enable_channel_id).is_none() {
                return Err(PmuError::UnknownChannelReference(output.enable_channel_id));
            }
            match &output.kind {
                OutputKind::Switch(cfg) => {
                    if cfg.merged_pins.is_empty() {
                        return Err(PmuError::NoMergedPins);
                    }
                    if cfg.merged_pins.len() > 3 {
                        return Err(PmuError::TooManyMergedPins);
                    }
                }
                OutputKind::Hbridge(hb) => {
                    if let Some(id) = hb.position_channel_id {
                        if store.get_info(id).is_none() {
                            return Err(PmuError::UnknownChannelReference(id));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Validates that every CAN mapping's target channel exists.
    pub fn validate_can_mappings(&self, store: &ChannelStore) -> PmuResult<()> {
        for mapping in self.can_mappings.iter() {
            if store.get_info(mapping.channel_id).is_none() {
                return Err(PmuError::UnknownChannelReference(mapping.channel_id));
            }
        }
        Ok(())
    }
}

/// Helper used by board-specific loaders to build a channel name from a
/// `&str` without panicking on overlength input (§3.1 name bound).
pub fn bounded_name(s: &str) -> PmuResult<String<MAX_NAME_LEN>> {
    String::try_from(s).map_err(|_| PmuError::CapacityExceeded)
}

/// Encodes a channel descriptor table to the `bincode` wire format used for
/// the board's persisted configuration blob — the same encoding the
/// teacher's `eps.rs` uses (commented out there) to pull typed structs back
/// out of a raw byte buffer, applied here to the loader's own persisted
/// state rather than a telemetry frame.
pub fn channel_table_to_bytes(channels: &[ChannelDescriptor]) -> PmuResult<std::vec::Vec<u8>> {
    bincode::serialize(channels).map_err(|_| PmuError::MalformedConfigBlob)
}

/// Decodes a channel descriptor table previously written by
/// [`channel_table_to_bytes`]. Used by a board crate that persists its
/// channel table to flash/EEPROM between boots instead of re-parsing a
/// text config file every startup.
pub fn channel_table_from_bytes(bytes: &[u8]) -> PmuResult<std::vec::Vec<ChannelDescriptor>> {
    bincode::deserialize(bytes).map_err(|_| PmuError::MalformedConfigBlob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelFormat;

    fn descriptor(id: u16) -> ChannelDescriptor {
        ChannelDescriptor {
            id,
            name: bounded_name("ch").unwrap(),
            direction: ChannelDirection::Output,
            class: ChannelClass::OutputFunction,
            format: ChannelFormat::Raw,
            physical_index: None,
            min_value: 0,
            max_value: 1000,
            initial_value: 0,
            enabled: true,
            inverted: false,
            unit: String::new(),
        }
    }

    #[test]
    fn allocator_starts_above_user_threshold() {
        let mut alloc = ChannelIdAllocator::new();
        assert_eq!(alloc.allocate().unwrap(), USER_CHANNEL_ID_THRESHOLD);
        assert_eq!(alloc.allocate().unwrap(), USER_CHANNEL_ID_THRESHOLD + 1);
    }

    #[test]
    fn register_channels_rejects_duplicates() {
        let mut cfg = Config::new();
        cfg.channels.push(descriptor(5)).unwrap();
        cfg.channels.push(descriptor(5)).unwrap();
        let mut store = ChannelStore::new();
        assert!(cfg.register_channels(&mut store).is_err());
    }

    #[test]
    fn channel_table_round_trips_through_bincode() {
        let original = vec![descriptor(5), descriptor(6)];
        let bytes = channel_table_to_bytes(&original).unwrap();
        let decoded = channel_table_from_bytes(&bytes).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].id, 5);
        assert_eq!(decoded[1].id, 6);
    }

    #[test]
    fn build_engine_rejects_unknown_reference() {
        let mut cfg = Config::new();
        cfg.channels.push(descriptor(5)).unwrap();
        let mut store = ChannelStore::new();
        cfg.register_channels(&mut store).unwrap();

        let bad = FunctionDescriptor {
            function_id: 0,
            enabled: true,
            input_channel_ids: heapless::Vec::from_slice(&[999]).unwrap(),
            output_channel_id: 5,
            secondary_output_channel_id: None,
            kind: FunctionKind::Nop(crate::function::utility::Nop::default()),
        };
        cfg.functions.push(bad);
        assert!(cfg.build_engine(&store).is_err());
    }
}
