use crate::constants::{
    Button, Firmware, Tap, WeightUnit, MSG_BUTTON, MSG_LED, MSG_TARE, MSG_WEIGHT_CHANGING,
    MSG_WEIGHT_STABLE, USB_BATTERY,
};

const WEIGHT_WITH_CHANGE_LEN: usize = 7;
const WEIGHT_WITH_TIME_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct LedStatus {
    pub weight_unit: Option<WeightUnit>,
    /// Battery percentage. `255` means the scale is USB powered.
    pub battery_life: Option<u8>,
    pub is_usb: bool,
    pub firmware: Option<Firmware>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TareAck {
    pub counter: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedTime {
    pub minutes: u8,
    pub seconds: u8,
    pub milliseconds: u8,
}

/// Extra field of a weight message, chosen by the message length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightDetail {
    Change(i16),
    Time(ElapsedTime),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightReading {
    pub is_stable: bool,
    /// Grams (or ounces) with one decimal place.
    pub weight: Option<f32>,
    pub detail: Option<WeightDetail>,
}

impl WeightReading {
    pub fn change(&self) -> Option<i16> {
        match self.detail {
            Some(WeightDetail::Change(change)) => Some(change),
            _ => None,
        }
    }

    pub fn time(&self) -> Option<ElapsedTime> {
        match self.detail {
            Some(WeightDetail::Time(time)) => Some(time),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTap {
    pub button: Option<Button>,
    pub tap: Option<Tap>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    LedStatus(LedStatus),
    TareAck(TareAck),
    Weight(WeightReading),
    ButtonTap(ButtonTap),
    Unknown { msg_type: u8, payload: Vec<u8> },
    /// Too short to carry a type byte.
    Malformed { payload: Vec<u8> },
}

/// Decodes one notification from the data characteristic. Never fails:
/// fields that are not present degrade to `None`.
pub fn decode(raw: &[u8]) -> Notification {
    Notification::from(raw)
}

impl From<&[u8]> for Notification {
    fn from(raw: &[u8]) -> Self {
        // The scale sometimes prepends a two byte preamble starting with 0.
        let payload = match raw.first() {
            Some(0) => raw.get(2..).unwrap_or(&[]),
            _ => raw,
        };

        let msg_type = match payload.get(1) {
            Some(&msg_type) => msg_type,
            None => {
                return Notification::Malformed {
                    payload: raw.to_vec(),
                }
            }
        };

        match msg_type {
            MSG_LED => {
                let battery_life = byte_at(payload, 4);
                Notification::LedStatus(LedStatus {
                    weight_unit: byte_at(payload, 3).and_then(WeightUnit::from_code),
                    battery_life,
                    is_usb: battery_life == Some(USB_BATTERY),
                    firmware: byte_at(payload, 5).map(Firmware::from_code),
                })
            }
            MSG_TARE => Notification::TareAck(TareAck {
                counter: byte_at(payload, 2),
            }),
            MSG_WEIGHT_STABLE | MSG_WEIGHT_CHANGING => {
                let detail = match payload.len() {
                    WEIGHT_WITH_CHANGE_LEN => i16_at(payload, 4).map(WeightDetail::Change),
                    WEIGHT_WITH_TIME_LEN => Some(WeightDetail::Time(ElapsedTime {
                        minutes: payload[4],
                        seconds: payload[5],
                        milliseconds: payload[6],
                    })),
                    _ => None,
                };
                Notification::Weight(WeightReading {
                    is_stable: msg_type == MSG_WEIGHT_STABLE,
                    weight: i16_at(payload, 2).map(|raw| raw as f32 / 10.0),
                    detail,
                })
            }
            MSG_BUTTON => Notification::ButtonTap(ButtonTap {
                button: byte_at(payload, 2).map(Button::from_code),
                tap: byte_at(payload, 3).map(Tap::from_code),
            }),
            _ => Notification::Unknown {
                msg_type,
                payload: payload.to_vec(),
            },
        }
    }
}

fn byte_at(payload: &[u8], offset: usize) -> Option<u8> {
    payload.get(offset).copied()
}

fn i16_at(payload: &[u8], offset: usize) -> Option<i16> {
    let bytes = payload.get(offset..offset + 2)?;
    Some(i16::from_be_bytes([bytes[0], bytes[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight(n: Notification) -> WeightReading {
        match n {
            Notification::Weight(w) => w,
            other => panic!("expected weight, got {:?}", other),
        }
    }

    #[test]
    fn stable_weight_without_extra_field() {
        let w = weight(decode(&[0x03, 0xce, 0x04, 0x1f]));
        assert!(w.is_stable);
        assert_eq!(w.weight, Some(105.5));
        assert_eq!(w.detail, None);
    }

    #[test]
    fn changing_weight_is_signed() {
        let w = weight(decode(&[0x03, 0xca, 0xff, 0xf6, 0x00, 0x00]));
        assert!(!w.is_stable);
        assert_eq!(w.weight, Some(-1.0));
        assert_eq!(w.detail, None);
    }

    #[test]
    fn seven_byte_weight_carries_change() {
        let w = weight(decode(&[0x03, 0xce, 0x00, 0x64, 0xff, 0xfe, 0x00]));
        assert_eq!(w.weight, Some(10.0));
        assert_eq!(w.change(), Some(-2));
        assert_eq!(w.time(), None);
    }

    #[test]
    fn ten_byte_weight_carries_time() {
        let w = weight(decode(&[0x03, 0xca, 0x00, 0x0a, 0x01, 0x1e, 0x05, 0x00, 0x00, 0x00]));
        assert_eq!(w.weight, Some(1.0));
        assert_eq!(w.change(), None);
        assert_eq!(
            w.time(),
            Some(ElapsedTime {
                minutes: 1,
                seconds: 30,
                milliseconds: 5
            })
        );
    }

    #[test]
    fn preamble_is_stripped() {
        let w = weight(decode(&[0x00, 0x00, 0x03, 0xce, 0x04, 0x1f]));
        assert_eq!(w.weight, Some(105.5));
    }

    #[test]
    fn truncated_weight_degrades_to_absent() {
        let w = weight(decode(&[0x03, 0xce, 0x04]));
        assert!(w.is_stable);
        assert_eq!(w.weight, None);
    }

    #[test]
    fn led_status() {
        let n = decode(&[0x03, 0x0a, 0x00, 0x01, 0x50, 0x03, 0x00]);
        assert_eq!(
            n,
            Notification::LedStatus(LedStatus {
                weight_unit: Some(WeightUnit::Ounces),
                battery_life: Some(80),
                is_usb: false,
                firmware: Some(Firmware::V1_2),
            })
        );
    }

    #[test]
    fn usb_power_and_unknown_firmware() {
        match decode(&[0x03, 0x0a, 0x00, 0x00, 0xff, 0x77]) {
            Notification::LedStatus(status) => {
                assert!(status.is_usb);
                assert_eq!(status.weight_unit, Some(WeightUnit::Grams));
                assert_eq!(status.firmware, Some(Firmware::Unknown(0x77)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn short_led_status_has_absent_fields() {
        match decode(&[0x03, 0x0a, 0x00]) {
            Notification::LedStatus(status) => {
                assert_eq!(status.weight_unit, None);
                assert_eq!(status.battery_life, None);
                assert!(!status.is_usb);
                assert_eq!(status.firmware, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn tare_ack() {
        assert_eq!(
            decode(&[0x03, 0x0f, 0x09, 0x00]),
            Notification::TareAck(TareAck { counter: Some(9) })
        );
    }

    #[test]
    fn button_taps() {
        assert_eq!(
            decode(&[0x03, 0xaa, 0x02, 0x01]),
            Notification::ButtonTap(ButtonTap {
                button: Some(Button::Right),
                tap: Some(Tap::Short),
            })
        );
        assert_eq!(
            decode(&[0x03, 0xaa, 0x09, 0x02]),
            Notification::ButtonTap(ButtonTap {
                button: Some(Button::Other(9)),
                tap: Some(Tap::Long),
            })
        );
    }

    #[test]
    fn unlisted_types_are_unknown() {
        for msg_type in 0..=u8::MAX {
            if [0x0a, 0x0f, 0xce, 0xca, 0xaa].contains(&msg_type) {
                continue;
            }
            match decode(&[0x03, msg_type, 0x01]) {
                Notification::Unknown { msg_type: t, payload } => {
                    assert_eq!(t, msg_type);
                    assert_eq!(payload, vec![0x03, msg_type, 0x01]);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn too_short_is_malformed() {
        assert_eq!(decode(&[]), Notification::Malformed { payload: vec![] });
        assert_eq!(decode(&[0x03]), Notification::Malformed { payload: vec![0x03] });
        assert_eq!(
            decode(&[0x00, 0x00, 0x03]),
            Notification::Malformed {
                payload: vec![0x00, 0x00, 0x03]
            }
        );
    }
}
