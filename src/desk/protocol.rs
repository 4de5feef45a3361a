//! Linak desk GATT protocol
//!
//! Heights on the wire are offsets above the desk's lowest position in
//! 0.1 mm units, little-endian.

use std::time::Duration;

use uuid::Uuid;

use super::DeskError;

pub const CONTROL_SERVICE_UUID: Uuid = Uuid::from_u128(0x99fa0001_338a_1024_8a49_009c0215f78a);

/// Movement commands (wakeup, stop)
pub const COMMAND_UUID: Uuid = Uuid::from_u128(0x99fa0002_338a_1024_8a49_009c0215f78a);

/// Current height and speed
pub const HEIGHT_SPEED_UUID: Uuid = Uuid::from_u128(0x99fa0021_338a_1024_8a49_009c0215f78a);

/// Target position input
pub const REFERENCE_INPUT_UUID: Uuid = Uuid::from_u128(0x99fa0031_338a_1024_8a49_009c0215f78a);

pub const COMMAND_WAKEUP: [u8; 2] = [0xfe, 0x00];
pub const COMMAND_STOP: [u8; 2] = [0xff, 0x00];
pub const REFERENCE_INPUT_STOP: [u8; 2] = [0x01, 0x80];

pub const MIN_HEIGHT_M: f64 = 0.62;
pub const MAX_HEIGHT_M: f64 = 1.27;

/// Delay between successive target writes while moving
pub const MOVE_INTERVAL: Duration = Duration::from_millis(200);

/// Distance from the target at which a stationary desk counts as arrived
pub const ARRIVAL_TOLERANCE_M: f64 = 0.001;

const UNITS_PER_METRE: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeskPosition {
    pub height_m: f64,
    /// Metres per second, negative while moving down
    pub speed: f64,
}

/// Encode a target height for the reference input characteristic
pub fn encode_target(height_m: f64) -> Result<[u8; 2], DeskError> {
    if !(MIN_HEIGHT_M..=MAX_HEIGHT_M).contains(&height_m) {
        return Err(DeskError::HeightOutOfRange(height_m));
    }
    let raw = ((height_m - MIN_HEIGHT_M) * UNITS_PER_METRE).round() as u16;
    Ok(raw.to_le_bytes())
}

/// Decode the height/speed characteristic value
pub fn decode_position(data: &[u8]) -> Result<DeskPosition, DeskError> {
    if data.len() < 4 {
        return Err(DeskError::MalformedPosition(data.len()));
    }
    let raw_height = u16::from_le_bytes([data[0], data[1]]);
    let raw_speed = i16::from_le_bytes([data[2], data[3]]);

    Ok(DeskPosition {
        height_m: f64::from(raw_height) / UNITS_PER_METRE + MIN_HEIGHT_M,
        speed: f64::from(raw_speed) / UNITS_PER_METRE,
    })
}

/// Whether a move towards `target_m` is complete.
///
/// The desk stops on its own once it reaches the reference position, so a
/// zero speed after movement has begun means it is done.
pub fn movement_finished(position: &DeskPosition, target_m: f64, started: bool) -> bool {
    if (position.height_m - target_m).abs() <= ARRIVAL_TOLERANCE_M {
        return true;
    }
    started && position.speed == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_target() {
        assert_eq!(encode_target(0.62).unwrap(), [0x00, 0x00]);
        // 0.13 m above minimum = 1300 units
        assert_eq!(encode_target(0.75).unwrap(), [0x14, 0x05]);
        // 0.65 m above minimum = 6500 units
        assert_eq!(encode_target(1.27).unwrap(), [0x64, 0x19]);
    }

    #[test]
    fn test_encode_target_out_of_range() {
        assert!(matches!(
            encode_target(0.5),
            Err(DeskError::HeightOutOfRange(h)) if h == 0.5
        ));
        assert!(encode_target(1.3).is_err());
        assert!(encode_target(f64::NAN).is_err());
    }

    #[test]
    fn test_decode_position() {
        let position = decode_position(&[0x14, 0x05, 0x00, 0x00]).unwrap();
        assert!((position.height_m - 0.75).abs() < 1e-9);
        assert_eq!(position.speed, 0.0);

        // -320 units/s while lowering
        let position = decode_position(&[0x00, 0x00, 0xc0, 0xfe]).unwrap();
        assert!((position.height_m - MIN_HEIGHT_M).abs() < 1e-9);
        assert!((position.speed + 0.032).abs() < 1e-9);
    }

    #[test]
    fn test_decode_position_too_short() {
        assert!(matches!(
            decode_position(&[0x14, 0x05]),
            Err(DeskError::MalformedPosition(2))
        ));
    }

    #[test]
    fn test_movement_finished() {
        let at_target = DeskPosition { height_m: 0.7505, speed: 0.0 };
        assert!(movement_finished(&at_target, 0.75, false));

        let moving = DeskPosition { height_m: 0.70, speed: 0.03 };
        assert!(!movement_finished(&moving, 0.75, true));

        let idle_before_start = DeskPosition { height_m: 0.70, speed: 0.0 };
        assert!(!movement_finished(&idle_before_start, 0.75, false));
        assert!(movement_finished(&idle_before_start, 0.75, true));
    }
}
