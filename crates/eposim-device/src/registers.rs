//! Object dictionary entries and bit values a simulated EPOS exposes.

use crate::object::ObjectAddress;

pub const SERIAL_NUMBER: ObjectAddress = ObjectAddress::new(0x1018, 4);
pub const ERROR_REGISTER: ObjectAddress = ObjectAddress::new(0x1001, 0);
pub const ERROR_HISTORY_COUNT: ObjectAddress = ObjectAddress::new(0x1003, 0);
pub const HOME_POSITION: ObjectAddress = ObjectAddress::new(0x6004, 0);
pub const CONTROLWORD: ObjectAddress = ObjectAddress::new(0x6040, 0);
pub const STATUSWORD: ObjectAddress = ObjectAddress::new(0x6041, 0);
pub const OPERATION_MODE: ObjectAddress = ObjectAddress::new(0x6060, 0);
pub const POSITION_ACTUAL: ObjectAddress = ObjectAddress::new(0x6064, 0);
pub const TARGET_POSITION: ObjectAddress = ObjectAddress::new(0x607A, 0);

/// Controlword commands.
pub mod control {
    pub const SHUTDOWN: u32 = 0x06;
    pub const SWITCH_ON: u32 = 0x0F;
    pub const START: u32 = 0x3F;
    pub const CLEAR_FAULT: u32 = 0x80;
}

/// Statusword bits.
pub mod status {
    pub const FAULT: u32 = 1 << 3;
    pub const TARGET_REACHED: u32 = 1 << 10;
    pub const HOMING_ERROR: u32 = 1 << 13;
    pub const HOME_REFERENCED: u32 = 1 << 15;
}

/// Operation modes.
pub mod opmode {
    pub const PROFILE_POSITION: u32 = 1;
    pub const HOMING: u32 = 6;
}

const NAMES: &[(ObjectAddress, &str)] = &[
    (SERIAL_NUMBER, "serial number"),
    (ERROR_REGISTER, "error register"),
    (ERROR_HISTORY_COUNT, "error history count"),
    (HOME_POSITION, "home position"),
    (CONTROLWORD, "controlword"),
    (STATUSWORD, "statusword"),
    (OPERATION_MODE, "operation mode"),
    (POSITION_ACTUAL, "position actual value"),
    (TARGET_POSITION, "target position"),
];

/// Human-readable name of a well-known object.
pub fn name(address: ObjectAddress) -> Option<&'static str> {
    NAMES
        .iter()
        .find(|(known, _)| *known == address)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_objects_have_names() {
        assert_eq!(name(STATUSWORD), Some("statusword"));
        assert_eq!(name(SERIAL_NUMBER), Some("serial number"));
    }

    #[test]
    fn subindex_distinguishes_objects() {
        assert_eq!(name(ObjectAddress::new(0x1018, 0)), None);
    }

    #[test]
    fn serial_key_matches_register_layout() {
        assert_eq!(SERIAL_NUMBER.key(), (0x1018 << 8) | 4);
        assert_eq!(CONTROLWORD.key(), 0x6040 << 8);
    }
}
