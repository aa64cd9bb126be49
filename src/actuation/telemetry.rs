//! §4.3.5 — per-output telemetry sub-channel publication: `{name}.status`,
//! `{name}.current`, `{name}.dc`, `{name}.fault`.

use super::{FaultFlags, OutputState};
use crate::channel::ChannelStore;

/// Resolved channel ids for one output's telemetry quartet, produced by
/// the config loader alongside the output's own setpoint/applied channel.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryIds {
    pub status_channel_id: u16,
    pub current_channel_id: u16,
    pub dc_channel_id: u16,
    pub fault_channel_id: u16,
}

/// Stable numeric encoding of [`OutputState`] for the `.status` channel.
pub fn state_code(state: OutputState) -> i32 {
    match state {
        OutputState::Off => 0,
        OutputState::Starting => 1,
        OutputState::On => 2,
        OutputState::Pwm => 3,
        OutputState::Overcurrent => 4,
        OutputState::Overtemp => 5,
        OutputState::Short => 6,
        OutputState::OpenLoad => 7,
        OutputState::Disabled => 8,
        OutputState::Fault => 9,
    }
}

/// Writes the telemetry quartet for one output. Uses `write_feedback`
/// (§4.1), bypassing the direction/ENABLED gate that guards logic writes,
/// since this is the actuation layer publishing its own observations.
pub fn publish(
    store: &mut ChannelStore,
    ids: TelemetryIds,
    state: OutputState,
    current_ma: i32,
    duty_permil: i32,
    fault_flags: FaultFlags,
) {
    store.write_feedback(ids.status_channel_id, state_code(state));
    store.write_feedback(ids.current_channel_id, current_ma);
    store.write_feedback(ids.dc_channel_id, duty_permil);
    store.write_feedback(ids.fault_channel_id, fault_flags.bits() as i32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, ChannelClass, ChannelDirection, ChannelFlags, ChannelFormat};
    use heapless::String;

    fn telemetry_channel(id: u16) -> Channel {
        Channel {
            id,
            name: String::try_from("t").unwrap(),
            direction: ChannelDirection::Output,
            class: ChannelClass::System,
            format: ChannelFormat::Raw,
            physical_index: None,
            value: 0,
            min_value: i32::MIN,
            max_value: i32::MAX,
            flags: ChannelFlags::ENABLED,
            unit: String::new(),
        }
    }

    #[test]
    fn publishes_all_four_subchannels() {
        let mut store = ChannelStore::new();
        let ids = TelemetryIds {
            status_channel_id: 10,
            current_channel_id: 11,
            dc_channel_id: 12,
            fault_channel_id: 13,
        };
        for id in [10, 11, 12, 13] {
            store.register(telemetry_channel(id)).unwrap();
        }
        publish(&mut store, ids, OutputState::Overcurrent, 6500, 1000, FaultFlags::OVERCURRENT);
        assert_eq!(store.get_value(10), state_code(OutputState::Overcurrent));
        assert_eq!(store.get_value(11), 6500);
        assert_eq!(store.get_value(12), 1000);
        assert_eq!(store.get_value(13), FaultFlags::OVERCURRENT.bits() as i32);
    }
}
