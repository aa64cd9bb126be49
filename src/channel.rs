//! §3.1 / §4.1 — the channel fabric: a uniform, id-addressable value store
//! unifying physical I/O and virtual signals with typed semantics and
//! lifecycle state.

use crate::error::ChannelWriteError;
use heapless::String;
use serde::{Deserialize, Serialize};

/// Maximum number of simultaneously registered channels (§4.1 capacity).
pub const MAX_CHANNELS: usize = 1024;
/// Maximum channel name length in bytes (§3.1).
pub const MAX_NAME_LEN: usize = 31;
/// Maximum unit string length in bytes (§3.1).
pub const MAX_UNIT_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum ChannelDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum ChannelClass {
    InputAnalog,
    InputDigital,
    InputCan,
    InputCalculated,
    OutputPower,
    OutputPwm,
    OutputHbridge,
    OutputFunction,
    OutputTable,
    System,
    Constant,
}

impl ChannelClass {
    /// Pure classification helper — downstream components branch on class.
    pub fn is_input(self) -> bool {
        matches!(
            self,
            ChannelClass::InputAnalog
                | ChannelClass::InputDigital
                | ChannelClass::InputCan
                | ChannelClass::InputCalculated
        )
    }

    pub fn is_output(self) -> bool {
        matches!(
            self,
            ChannelClass::OutputPower
                | ChannelClass::OutputPwm
                | ChannelClass::OutputHbridge
                | ChannelClass::OutputFunction
                | ChannelClass::OutputTable
        )
    }

    /// Virtual channels have no hardware backing: calculated inputs,
    /// output-function results, constants, and system aggregates that are
    /// not tied to one physical line.
    pub fn is_virtual(self) -> bool {
        matches!(
            self,
            ChannelClass::InputCalculated
                | ChannelClass::OutputFunction
                | ChannelClass::OutputTable
                | ChannelClass::Constant
                | ChannelClass::System
        )
    }

    pub fn is_physical(self) -> bool {
        !self.is_virtual()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum ChannelFormat {
    Raw,
    VoltageMv,
    CurrentMa,
    Temperature0_1C,
    Percent0_1Pct,
    Rpm,
    FrequencyHz,
    Count,
    Boolean,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ChannelFlags: u8 {
        const ENABLED  = 0b0001;
        const FAULT    = 0b0010;
        const INVERTED = 0b0100;
        const STALE    = 0b1000;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: u16,
    pub name: String<MAX_NAME_LEN>,
    pub direction: ChannelDirection,
    pub class: ChannelClass,
    pub format: ChannelFormat,
    /// Hardware index (ADC line, output driver, …) for physically backed
    /// channels; unused (0) for virtual channels.
    pub physical_index: Option<u16>,
    pub value: i32,
    pub min_value: i32,
    pub max_value: i32,
    pub flags: ChannelFlags,
    pub unit: String<MAX_UNIT_LEN>,
}

impl Channel {
    /// External value as observed by a reader: inversion is applied for
    /// outputs carrying the INVERTED flag (§3.1 invariant).
    pub fn external_value(&self) -> i32 {
        if self.direction == ChannelDirection::Output && self.flags.contains(ChannelFlags::INVERTED)
        {
            self.max_value - self.value
        } else {
            self.value
        }
    }

    /// Stores `v` as if written externally: clamps to bounds then applies
    /// inversion so a subsequent `external_value()` reproduces `clamp(v)`.
    fn store_external(&mut self, v: i32) {
        let (lo, hi) = if self.min_value <= self.max_value {
            (self.min_value, self.max_value)
        } else {
            (self.max_value, self.min_value)
        };
        let clamped = v.clamp(lo, hi);
        self.value = if self.direction == ChannelDirection::Output
            && self.flags.contains(ChannelFlags::INVERTED)
        {
            self.max_value - clamped
        } else {
            clamped
        };
    }
}

/// Central registry and current-value table (§4.1).
///
/// Ids index directly into a fixed-capacity array — O(1) lookup, no
/// hashing needed at 1024 entries. Name lookup is a linear scan.
pub struct ChannelStore {
    channels: Box<[Option<Channel>]>,
}

impl Default for ChannelStore {
    fn default() -> Self {
        Self {
            channels: vec![None; MAX_CHANNELS].into_boxed_slice(),
        }
    }
}

impl ChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: Channel) -> Result<(), RegisterError> {
        let id = channel.id as usize;
        if id >= MAX_CHANNELS {
            return Err(RegisterError::OutOfRange);
        }
        if self.channels[id].is_some() {
            return Err(RegisterError::Duplicate);
        }
        self.channels[id] = Some(channel);
        Ok(())
    }

    pub fn unregister(&mut self, id: u16) -> Result<(), NotFoundError> {
        let idx = id as usize;
        if idx >= MAX_CHANNELS || self.channels[idx].is_none() {
            return Err(NotFoundError);
        }
        self.channels[idx] = None;
        Ok(())
    }

    /// Returns 0 for unknown ids — deliberate, acts as a constant-zero
    /// fallback for dangling channel references.
    pub fn get_value(&self, id: u16) -> i32 {
        self.get_info(id).map(Channel::external_value).unwrap_or(0)
    }

    pub fn set_value(&mut self, id: u16, v: i32) -> Result<(), ChannelWriteError> {
        let idx = id as usize;
        let channel = match self.channels.get_mut(idx).and_then(Option::as_mut) {
            Some(c) => c,
            None => return Err(ChannelWriteError::NotFound),
        };
        if channel.direction != ChannelDirection::Output {
            return Err(ChannelWriteError::NotOutput);
        }
        if !channel.flags.contains(ChannelFlags::ENABLED) {
            return Err(ChannelWriteError::Disabled);
        }
        channel.store_external(v);
        Ok(())
    }

    pub fn get_info(&self, id: u16) -> Option<&Channel> {
        self.channels.get(id as usize).and_then(Option::as_ref)
    }

    pub fn get_info_mut(&mut self, id: u16) -> Option<&mut Channel> {
        self.channels.get_mut(id as usize).and_then(Option::as_mut)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Channel> {
        self.channels
            .iter()
            .filter_map(Option::as_ref)
            .find(|c| c.name.as_str() == name)
    }

    pub fn set_enabled(&mut self, id: u16, enabled: bool) -> bool {
        match self.get_info_mut(id) {
            Some(c) => {
                c.flags.set(ChannelFlags::ENABLED, enabled);
                true
            }
            None => false,
        }
    }

    /// Copy enumeration for telemetry (§4.1 `list`); returns the number of
    /// entries copied.
    pub fn list(&self, out: &mut [Channel]) -> usize {
        let mut n = 0;
        for c in self.channels.iter().filter_map(Option::as_ref) {
            if n >= out.len() {
                break;
            }
            out[n] = c.clone();
            n += 1;
        }
        n
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter_map(Option::as_ref)
    }

    /// Raw, uninverted, unclamped write used internally by the actuation
    /// layer to publish feedback sub-channels (current/status/fault) — not
    /// subject to the `ENABLED`/direction gate that guards logic writes.
    pub fn write_feedback(&mut self, id: u16, v: i32) {
        if let Some(c) = self.get_info_mut(id) {
            c.value = v;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    Duplicate,
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotFoundError;

#[cfg(test)]
mod tests {
    use super::*;

    fn output_channel(id: u16, min: i32, max: i32, inverted: bool) -> Channel {
        let mut flags = ChannelFlags::ENABLED;
        if inverted {
            flags |= ChannelFlags::INVERTED;
        }
        Channel {
            id,
            name: String::try_from("out").unwrap(),
            direction: ChannelDirection::Output,
            class: ChannelClass::OutputPower,
            format: ChannelFormat::Percent0_1Pct,
            physical_index: Some(0),
            value: 0,
            min_value: min,
            max_value: max,
            flags,
            unit: String::new(),
        }
    }

    #[test]
    fn unknown_id_reads_zero() {
        let store = ChannelStore::new();
        assert_eq!(store.get_value(999), 0);
    }

    #[test]
    fn clamping_invariant() {
        let mut store = ChannelStore::new();
        store.register(output_channel(5, 0, 1000, false)).unwrap();
        store.set_value(5, 5000).unwrap();
        assert_eq!(store.get_value(5), 1000);
        store.set_value(5, -50).unwrap();
        assert_eq!(store.get_value(5), 0);
    }

    #[test]
    fn inversion_round_trip() {
        let mut store = ChannelStore::new();
        store.register(output_channel(7, 0, 1000, true)).unwrap();
        store.set_value(7, 300).unwrap();
        assert_eq!(store.get_value(7), 300);
        // internal stored value is the mirrored one
        assert_eq!(store.get_info(7).unwrap().value, 700);
    }

    #[test]
    fn writes_to_input_rejected() {
        let mut store = ChannelStore::new();
        let input = Channel {
            id: 3,
            name: String::try_from("in").unwrap(),
            direction: ChannelDirection::Input,
            class: ChannelClass::InputAnalog,
            format: ChannelFormat::Raw,
            physical_index: Some(0),
            value: 10,
            min_value: 0,
            max_value: 4095,
            flags: ChannelFlags::ENABLED,
            unit: String::new(),
        };
        store.register(input).unwrap();
        assert_eq!(store.set_value(3, 99), Err(ChannelWriteError::NotOutput));
        assert_eq!(store.get_value(3), 10);
    }

    #[test]
    fn writes_to_disabled_output_rejected() {
        let mut store = ChannelStore::new();
        let mut c = output_channel(9, 0, 1000, false);
        c.flags.remove(ChannelFlags::ENABLED);
        store.register(c).unwrap();
        assert_eq!(store.set_value(9, 500), Err(ChannelWriteError::Disabled));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut store = ChannelStore::new();
        store.register(output_channel(1, 0, 1000, false)).unwrap();
        assert_eq!(
            store.register(output_channel(1, 0, 1000, false)),
            Err(RegisterError::Duplicate)
        );
    }

    #[test]
    fn find_by_name_linear_scan() {
        let mut store = ChannelStore::new();
        let mut c = output_channel(2, 0, 1000, false);
        c.name = String::try_from("pump_a").unwrap();
        store.register(c).unwrap();
        assert!(store.find_by_name("pump_a").is_some());
        assert!(store.find_by_name("missing").is_none());
    }
}
