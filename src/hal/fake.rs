//! A fully in-memory [`super::AdcSource`]/[`super::DigitalSource`]/
//! [`super::OutputDriver`]/[`super::HbridgeDriver`] implementation for
//! tests: every reading is whatever the test last poked into it, and every
//! write is recorded for the test to assert against.

use super::{AdcSource, DigitalSource, DigitalState, HbridgeDirection, HbridgeDriver, OutputDriver};
use std::collections::HashMap;

/// What the fake last received from a call to `set_output_duty` /
/// `set_output_off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCommand {
    pub duty_permil: i32,
    pub frequency_hz: u32,
}

#[derive(Debug, Default)]
pub struct FakeBoard {
    pub adc_raw: HashMap<u16, u16>,
    pub adc_scaled: HashMap<u16, i32>,
    pub digital_state: HashMap<u16, DigitalState>,
    pub digital_frequency: HashMap<u16, u32>,
    pub digital_rpm: HashMap<u16, i32>,

    pub output_current_ma: HashMap<u16, i32>,
    pub output_temp_c: HashMap<u16, i32>,
    pub output_fault_flags: HashMap<u16, u8>,
    pub last_duty_command: HashMap<u16, DutyCommand>,
    pub last_off_count: HashMap<u16, u32>,

    pub hbridge_current_ma: HashMap<u16, i32>,
    pub hbridge_temp_c: HashMap<u16, i32>,
    pub hbridge_fault_flags: HashMap<u16, u8>,
    pub last_hbridge_command: HashMap<u16, (HbridgeDirection, i32)>,
}

impl FakeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current(&mut self, physical_index: u16, ma: i32) {
        self.output_current_ma.insert(physical_index, ma);
    }

    pub fn set_temp(&mut self, physical_index: u16, celsius: i32) {
        self.output_temp_c.insert(physical_index, celsius);
    }

    pub fn set_fault_flags(&mut self, physical_index: u16, flags: u8) {
        self.output_fault_flags.insert(physical_index, flags);
    }
}

impl AdcSource for FakeBoard {
    fn sample_raw(&mut self, index: u16) -> u16 {
        *self.adc_raw.get(&index).unwrap_or(&0)
    }
    fn sample_scaled(&mut self, index: u16) -> i32 {
        *self.adc_scaled.get(&index).unwrap_or(&0)
    }
}

impl DigitalSource for FakeBoard {
    fn state(&mut self, index: u16) -> DigitalState {
        *self.digital_state.get(&index).unwrap_or(&DigitalState::Low)
    }
    fn frequency(&mut self, index: u16) -> u32 {
        *self.digital_frequency.get(&index).unwrap_or(&0)
    }
    fn rpm(&mut self, index: u16) -> i32 {
        *self.digital_rpm.get(&index).unwrap_or(&0)
    }
}

impl OutputDriver for FakeBoard {
    fn set_output_duty(&mut self, physical_index: u16, duty_permil: i32, frequency_hz: u32) {
        self.last_duty_command.insert(
            physical_index,
            DutyCommand {
                duty_permil,
                frequency_hz,
            },
        );
    }
    fn set_output_off(&mut self, physical_index: u16) {
        *self.last_off_count.entry(physical_index).or_insert(0) += 1;
        self.last_duty_command.insert(
            physical_index,
            DutyCommand {
                duty_permil: 0,
                frequency_hz: 0,
            },
        );
    }
    fn read_output_current_ma(&mut self, physical_index: u16) -> i32 {
        *self.output_current_ma.get(&physical_index).unwrap_or(&0)
    }
    fn read_output_temp_c(&mut self, physical_index: u16) -> i32 {
        *self.output_temp_c.get(&physical_index).unwrap_or(&25)
    }
    fn read_output_fault_flags(&mut self, physical_index: u16) -> u8 {
        *self.output_fault_flags.get(&physical_index).unwrap_or(&0)
    }
}

impl HbridgeDriver for FakeBoard {
    fn set_hbridge(&mut self, physical_index: u16, direction: HbridgeDirection, duty_permil: i32) {
        self.last_hbridge_command.insert(physical_index, (direction, duty_permil));
    }
    fn read_current_ma(&mut self, physical_index: u16) -> i32 {
        *self.hbridge_current_ma.get(&physical_index).unwrap_or(&0)
    }
    fn read_temp_c(&mut self, physical_index: u16) -> i32 {
        *self.hbridge_temp_c.get(&physical_index).unwrap_or(&25)
    }
    fn read_fault_flags(&mut self, physical_index: u16) -> u8 {
        *self.hbridge_fault_flags.get(&physical_index).unwrap_or(&0)
    }
}
