//! §4.3.4 — H-bridge output: signed setpoint, dead-band-through-zero,
//! acceleration limiting, wiper/position-PID modes, and the same fault/
//! retry discipline as the switch output (§4.3.1).

use super::{ActuationCtx, FaultFlags, OutputState};
use crate::hal::{HbridgeDirection, HbridgeDriver};
use crate::time::{at_or_after, Millis};

#[derive(Debug, Clone)]
pub struct HbridgeConfig {
    /// Minimum |setpoint| before a direction is actually commanded; below
    /// this the bridge coasts, preventing shoot-through on zero-crossing.
    pub deadband_permil: i32,
    /// Maximum |Δsetpoint| permitted per cycle.
    pub acceleration_permil_per_cycle: i32,
    pub overcurrent_ma: i32,
    pub stall_threshold_ma: i32,
    pub stall_time_ms: u32,
    pub over_temp_threshold_c: i32,
    pub max_retries: u8,
    pub retry_interval_ms: u32,
    pub retry_forever: bool,
    /// Survives load shedding; see `actuation::OutputConfig::critical`.
    pub critical: bool,
}

impl Default for HbridgeConfig {
    fn default() -> Self {
        HbridgeConfig {
            deadband_permil: 20,
            acceleration_permil_per_cycle: 1000,
            overcurrent_ma: 10_000,
            stall_threshold_ma: 3_000,
            stall_time_ms: 300,
            over_temp_threshold_c: 125,
            max_retries: 3,
            retry_interval_ms: 1000,
            retry_forever: false,
            critical: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HbridgeOutput {
    pub state: OutputState,
    pub current_setpoint_permil: i32,
    pub direction: HbridgeDirection,
    pub duty_permil: i32,
    pub measured_current_ma: i32,
    pub driver_temp_c: i32,
    pub fault_flags: FaultFlags,
    pub retry_count: u8,
    next_retry_deadline_ms: Millis,
    last_position: i32,
    stall_since_ms: Option<Millis>,
}

impl Default for HbridgeOutput {
    fn default() -> Self {
        HbridgeOutput {
            state: OutputState::Off,
            current_setpoint_permil: 0,
            direction: HbridgeDirection::Coast,
            duty_permil: 0,
            measured_current_ma: 0,
            driver_temp_c: 0,
            fault_flags: FaultFlags::empty(),
            retry_count: 0,
            next_retry_deadline_ms: 0,
            last_position: 0,
            stall_since_ms: None,
        }
    }
}

impl HbridgeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// `target_permil` is the logical setpoint in [-1000, 1000]; `position`
    /// is an externally sampled position/speed reading used for stall
    /// detection.
    pub fn tick(
        &mut self,
        cfg: &HbridgeConfig,
        target_permil: i32,
        enabled: bool,
        position: i32,
        ctx: ActuationCtx,
        driver: &mut impl HbridgeDriver,
        physical_index: u16,
    ) {
        if !enabled {
            self.current_setpoint_permil = 0;
            self.direction = HbridgeDirection::Coast;
            self.duty_permil = 0;
            self.state = OutputState::Disabled;
            driver.set_hbridge(physical_index, self.direction, 0);
            return;
        }

        if self.state.is_retryable_fault() {
            self.direction = HbridgeDirection::Coast;
            self.duty_permil = 0;
            if at_or_after(ctx.now_ms, self.next_retry_deadline_ms) {
                self.state = if self.retry_count < cfg.max_retries || cfg.retry_forever {
                    OutputState::Off
                } else {
                    OutputState::Fault
                };
            }
            driver.set_hbridge(physical_index, self.direction, 0);
            return;
        }
        if self.state == OutputState::Fault {
            driver.set_hbridge(physical_index, HbridgeDirection::Coast, 0);
            return;
        }

        let target = target_permil.clamp(-1000, 1000);
        let max_step = cfg.acceleration_permil_per_cycle.max(1);
        let delta = (target - self.current_setpoint_permil).clamp(-max_step, max_step);
        self.current_setpoint_permil += delta;

        if self.current_setpoint_permil.abs() <= cfg.deadband_permil {
            self.direction = HbridgeDirection::Coast;
            self.duty_permil = 0;
            self.state = OutputState::Off;
        } else {
            self.direction = if self.current_setpoint_permil > 0 {
                HbridgeDirection::Forward
            } else {
                HbridgeDirection::Reverse
            };
            self.duty_permil = self.current_setpoint_permil.abs().min(1000);
            self.state = if self.duty_permil >= 1000 {
                OutputState::On
            } else {
                OutputState::Pwm
            };
        }

        driver.set_hbridge(physical_index, self.direction, self.duty_permil);
        self.measured_current_ma = driver.read_current_ma(physical_index);
        self.driver_temp_c = driver.read_temp_c(physical_index);
        let driver_faults = driver.read_fault_flags(physical_index);

        if self.measured_current_ma > cfg.overcurrent_ma {
            self.enter_fault(OutputState::Overcurrent, FaultFlags::OVERCURRENT, cfg, ctx);
            return;
        }
        if self.driver_temp_c > cfg.over_temp_threshold_c {
            self.enter_fault(OutputState::Overtemp, FaultFlags::OVERTEMP, cfg, ctx);
            return;
        }
        if driver_faults != 0 {
            self.enter_fault(OutputState::Short, FaultFlags::SHORT, cfg, ctx);
            return;
        }

        if self.duty_permil > 0 && self.measured_current_ma > cfg.stall_threshold_ma && position == self.last_position
        {
            let since = *self.stall_since_ms.get_or_insert(ctx.now_ms);
            if at_or_after(ctx.now_ms, since.wrapping_add(cfg.stall_time_ms)) {
                self.enter_fault(OutputState::Overcurrent, FaultFlags::OVERCURRENT, cfg, ctx);
                self.last_position = position;
                return;
            }
        } else {
            self.stall_since_ms = None;
        }
        self.last_position = position;
    }

    fn enter_fault(&mut self, fault: OutputState, flag: FaultFlags, cfg: &HbridgeConfig, ctx: ActuationCtx) {
        self.direction = HbridgeDirection::Coast;
        self.duty_permil = 0;
        self.fault_flags.insert(flag);
        self.next_retry_deadline_ms = ctx.now_ms.wrapping_add(cfg.retry_interval_ms);
        self.retry_count += 1;
        self.state = fault;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::fake::FakeBoard;

    #[test]
    fn crosses_zero_through_coast_deadband() {
        let cfg = HbridgeConfig { acceleration_permil_per_cycle: 100, ..Default::default() };
        let mut h = HbridgeOutput::new();
        let mut board = FakeBoard::new();
        h.tick(&cfg, 500, true, 0, ActuationCtx { now_ms: 0 }, &mut board, 0);
        assert_eq!(h.direction, HbridgeDirection::Forward);
        let mut saw_coast = false;
        let mut t = 0;
        for _ in 0..20 {
            t += 10;
            h.tick(&cfg, -500, true, 0, ActuationCtx { now_ms: t }, &mut board, 0);
            if h.direction == HbridgeDirection::Coast {
                saw_coast = true;
            }
        }
        assert!(saw_coast, "must coast through the zero-crossing deadband");
        assert_eq!(h.direction, HbridgeDirection::Reverse);
    }

    #[test]
    fn acceleration_limit_caps_per_cycle_delta() {
        let cfg = HbridgeConfig { acceleration_permil_per_cycle: 50, ..Default::default() };
        let mut h = HbridgeOutput::new();
        let mut board = FakeBoard::new();
        h.tick(&cfg, 1000, true, 0, ActuationCtx { now_ms: 0 }, &mut board, 0);
        assert!(h.current_setpoint_permil <= 50);
    }

    #[test]
    fn stall_detection_trips_overcurrent() {
        let cfg = HbridgeConfig { stall_threshold_ma: 1000, stall_time_ms: 100, acceleration_permil_per_cycle: 2000, ..Default::default() };
        let mut h = HbridgeOutput::new();
        let mut board = FakeBoard::new();
        board.hbridge_current_ma.insert(0, 1500);
        let mut t = 0u32;
        h.tick(&cfg, 1000, true, 42, ActuationCtx { now_ms: t }, &mut board, 0);
        while t < 200 {
            t += 10;
            h.tick(&cfg, 1000, true, 42, ActuationCtx { now_ms: t }, &mut board, 0);
        }
        assert_eq!(h.state, OutputState::Overcurrent);
    }
}
