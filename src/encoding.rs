use crate::config::LedSettings;
use crate::constants::{TimerCommand, FRAME_PREFIX, OP_DISPLAY_MODE, OP_TARE, OP_TIMER};

pub const FRAME_LEN: usize = 6;

pub type Frame = [u8; FRAME_LEN];

/// One control command: an opcode and its three argument bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub opcode: u8,
    pub args: [u8; 3],
}

impl Command {
    pub fn new(opcode: u8, args: [u8; 3]) -> Self {
        Self { opcode, args }
    }

    pub fn set_led(settings: LedSettings) -> Self {
        Self::new(
            OP_DISPLAY_MODE,
            [
                settings.show_weight as u8,
                settings.show_timer as u8,
                !settings.show_grams as u8,
            ],
        )
    }

    /// Display mode with the weight LED argument set to 2, which the scale
    /// interprets as "switch off".
    pub fn power_off() -> Self {
        Self::new(OP_DISPLAY_MODE, [2, 0, 0])
    }

    pub fn timer(command: TimerCommand) -> Self {
        Self::new(OP_TIMER, [command.value(), 0, 0])
    }

    pub fn tare(counter: u8) -> Self {
        Self::new(OP_TARE, [counter, 0, 0])
    }

    pub fn frame(&self) -> Frame {
        encode(self.opcode, self.args)
    }
}

pub fn encode(opcode: u8, args: [u8; 3]) -> Frame {
    let mut bytes = [FRAME_PREFIX, opcode, args[0], args[1], args[2], 0];
    bytes[FRAME_LEN - 1] = xor_checksum(&bytes[..FRAME_LEN - 1]);
    bytes
}

pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |xor, &byte| xor ^ byte)
}

/// Renders bytes as `03 0a 01 ..` for log lines.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
