//! §4.3 — output actuation: per-channel state machines that turn logical
//! setpoints into protected hardware drive and feed fault/telemetry state
//! back into the channel store.

pub mod hbridge;
pub mod pwm;
pub mod switch;
pub mod telemetry;

use crate::time::Millis;

/// §3.3 output state enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Off,
    Starting,
    On,
    Pwm,
    Overcurrent,
    Overtemp,
    Short,
    OpenLoad,
    Disabled,
    Fault,
}

impl OutputState {
    pub fn is_retryable_fault(self) -> bool {
        matches!(self, OutputState::Overcurrent | OutputState::Overtemp | OutputState::Short)
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct FaultFlags: u8 {
        const OVERCURRENT = 0b0001;
        const OVERTEMP    = 0b0010;
        const SHORT       = 0b0100;
        const OPEN_LOAD   = 0b1000;
    }
}

/// Immutable per-output configuration, loaded once at registration
/// (output driver descriptors).
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub merged_pins: heapless::Vec<u16, 3>,
    pub pwm_frequency_hz: u32,
    /// 0 disables soft-start: the output jumps straight from OFF to ON/PWM.
    pub soft_start_ramp_ms: u32,
    pub inrush_current_ma: i32,
    pub inrush_time_ms: u32,
    pub max_current_ma: i32,
    pub min_current_ma: i32,
    pub over_temp_threshold_c: i32,
    pub startup_grace_ms: u32,
    pub max_retries: u8,
    pub retry_interval_ms: u32,
    pub retry_forever: bool,
    /// Survives load shedding: the core keeps driving this output even
    /// while `Core` has forced every non-critical output off.
    pub critical: bool,
}

/// Wall-clock-only scratch passed into every `tick`; mirrors
/// `function::common::StepCtx` without re-exporting it into the actuation
/// layer's own vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct ActuationCtx {
    pub now_ms: Millis,
}
