//! Fixed-id system channels (§6.5) and the two well-known constants (§3.1).
//!
//! These ids are reserved for the sampling layer; logic and actuation code
//! must never write them. The loader is expected to register channels at
//! exactly these ids with class `System` (or `Constant` for 0/1); the core
//! itself does not auto-register them, since their units/formats are board
//! specific and come from the loader's descriptor table.

/// Constant-zero channel. Always reads 0.
pub const CHANNEL_ZERO: u16 = 0;
/// Constant-one channel. Reads 1000 (percent format, i.e. "1.000").
pub const CHANNEL_ONE: u16 = 1;

pub const CHANNEL_BATTERY_MV: u16 = 10;
pub const CHANNEL_BOARD_TEMP_L: u16 = 11;
pub const CHANNEL_BOARD_TEMP_R: u16 = 12;
pub const CHANNEL_SUPPLY_5V_MV: u16 = 13;
pub const CHANNEL_SUPPLY_3V3_MV: u16 = 14;
pub const CHANNEL_TOTAL_CURRENT_MA: u16 = 15;
pub const CHANNEL_UPTIME_MS: u16 = 16;
pub const CHANNEL_STATUS_BITS: u16 = 17;
pub const CHANNEL_USER_ERROR: u16 = 18;
pub const CHANNEL_IS_TURNING_OFF: u16 = 19;

/// First id available to the loader's monotonic allocator for user-created
/// virtual channels (§4.1 "Id generation"); ids below this are reserved for
/// system/constant/physical channels assigned explicitly by the loader.
pub const USER_CHANNEL_ID_THRESHOLD: u16 = 200;

bitflags::bitflags! {
    /// Bits of `CHANNEL_STATUS_BITS`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StatusBits: u32 {
        const FAULT            = 0b0000_0001;
        const UNDERVOLTAGE     = 0b0000_0010;
        const OVERVOLTAGE      = 0b0000_0100;
        const CYCLE_OVERRUN    = 0b0000_1000;
        const LOAD_SHED        = 0b0001_0000;
    }
}
