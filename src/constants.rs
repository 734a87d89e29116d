use std::fmt;

use uuid::Uuid;

pub(crate) const FRAME_PREFIX: u8 = 0x03;

pub(crate) const OP_DISPLAY_MODE: u8 = 0x0a;
pub(crate) const OP_TIMER: u8 = 0x0b;
pub(crate) const OP_TARE: u8 = 0x0f;

pub(crate) const MSG_LED: u8 = 0x0a;
pub(crate) const MSG_TARE: u8 = 0x0f;
pub(crate) const MSG_WEIGHT_STABLE: u8 = 0xce;
pub(crate) const MSG_WEIGHT_CHANGING: u8 = 0xca;
pub(crate) const MSG_BUTTON: u8 = 0xaa;

/// Battery reading reported while the scale runs from USB power.
pub(crate) const USB_BATTERY: u8 = 255;

pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x0000fff0_0000_1000_8000_00805f9b34fb);
pub const DATA_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x0000fff4_0000_1000_8000_00805f9b34fb);
pub const COMMAND_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x000036f5_0000_1000_8000_00805f9b34fb);

pub const SECONDARY_SERVICE_UUID: Uuid = Uuid::from_u128(0x5833ff01_9b8b_5191_6142_22a4536ef123);
const SECONDARY_A_UUID: Uuid = Uuid::from_u128(0x5833ff02_9b8b_5191_6142_22a4536ef123);
const SECONDARY_B_UUID: Uuid = Uuid::from_u128(0x5833ff03_9b8b_5191_6142_22a4536ef123);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacteristicRole {
    /// Notify-only telemetry.
    Data,
    /// Write-only control commands.
    Command,
    Unused,
}

#[derive(Debug)]
pub struct CharacteristicDescriptor {
    pub name: &'static str,
    pub uuid: Uuid,
    pub role: CharacteristicRole,
}

#[derive(Debug)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub uuid: Uuid,
    pub required: bool,
    pub characteristics: &'static [CharacteristicDescriptor],
}

/// GATT topology of the scale, walked once per connection attempt.
/// Services that are not `required` are never discovered.
pub static SERVICES: &[ServiceDescriptor] = &[
    ServiceDescriptor {
        name: "main",
        uuid: SERVICE_UUID,
        required: true,
        characteristics: &[
            CharacteristicDescriptor {
                name: "data",
                uuid: DATA_CHARACTERISTIC_UUID,
                role: CharacteristicRole::Data,
            },
            CharacteristicDescriptor {
                name: "command",
                uuid: COMMAND_CHARACTERISTIC_UUID,
                role: CharacteristicRole::Command,
            },
        ],
    },
    ServiceDescriptor {
        name: "secondary",
        uuid: SECONDARY_SERVICE_UUID,
        required: false,
        characteristics: &[
            CharacteristicDescriptor {
                name: "a",
                uuid: SECONDARY_A_UUID,
                role: CharacteristicRole::Unused,
            },
            CharacteristicDescriptor {
                name: "b",
                uuid: SECONDARY_B_UUID,
                role: CharacteristicRole::Unused,
            },
        ],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Stop,
    Reset,
    Start,
}

impl TimerCommand {
    pub(crate) fn value(&self) -> u8 {
        match *self {
            TimerCommand::Stop => 0,
            TimerCommand::Reset => 2,
            TimerCommand::Start => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightUnit {
    Grams,
    Ounces,
}

impl WeightUnit {
    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(WeightUnit::Grams),
            1 => Some(WeightUnit::Ounces),
            _ => None,
        }
    }
}

/// Firmware revision as reported in the LED status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Firmware {
    V1_0,
    V1_1,
    V1_2,
    /// A code outside the known table. No version is inferred for it.
    Unknown(u8),
}

impl Firmware {
    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            0xfe => Firmware::V1_0,
            0x02 => Firmware::V1_1,
            0x03 => Firmware::V1_2,
            other => Firmware::Unknown(other),
        }
    }

    pub fn version(&self) -> Option<(u8, u8)> {
        match *self {
            Firmware::V1_0 => Some((1, 0)),
            Firmware::V1_1 => Some((1, 1)),
            Firmware::V1_2 => Some((1, 2)),
            Firmware::Unknown(_) => None,
        }
    }
}

impl fmt::Display for Firmware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version() {
            Some((major, minor)) => write!(f, "{}.{}", major, minor),
            None => write!(f, "unknown firmware"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left,
    Right,
    Other(u8),
}

impl Button {
    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            1 => Button::Left,
            2 => Button::Right,
            other => Button::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tap {
    Short,
    Long,
    Other(u8),
}

impl Tap {
    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            1 => Tap::Short,
            2 => Tap::Long,
            other => Tap::Other(other),
        }
    }
}
