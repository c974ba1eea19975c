//! Device and link error codes with their descriptions.

pub use eposim_frame::error::{
    LINK_BAD_CRC, LINK_BAD_RESPONSE, LINK_NACK, LINK_RECV, LINK_TIMEOUT, LINK_XMIT,
};

pub const SUCCESS: u32 = 0x0000_0000;
pub const OBJECT_DOES_NOT_EXIST: u32 = 0x0602_0000;
pub const SUBINDEX_DOES_NOT_EXIST: u32 = 0x0609_0011;
pub const GENERAL_ERROR: u32 = 0x0800_0000;

/// Reported for requests addressed to a node that is not configured.
pub const UNKNOWN_DEVICE: u32 = 0x0F00_FFB9;

const UNKNOWN_CODE: &str = "Unknown error code";

const DESCRIPTIONS: &[(u32, &str)] = &[
    (SUCCESS, "No error."),
    (0x0503_0000, "Toggle bit not alternated."),
    (0x0504_0000, "SDO protocol timed out."),
    (0x0504_0001, "Client/server command specifier not valid or unknown."),
    (0x0504_0005, "Out of memory"),
    (0x0601_0000, "Unsupported access to an object."),
    (0x0601_0001, "Attempt to read a write only object."),
    (0x0601_0002, "Attempt to write a read only object."),
    (
        OBJECT_DOES_NOT_EXIST,
        "Object does not exist in the object dictionary.",
    ),
    (0x0604_0041, "Object cannot be mapped to the PDO."),
    (
        0x0604_0042,
        "The number and length of the objects to be mapped would exceed PDO length.",
    ),
    (0x0604_0043, "General parameter incompatibility reason."),
    (0x0604_0047, "General internal incompatibility in the device."),
    (0x0606_0000, "Access failed due to a hardware error."),
    (
        0x0607_0010,
        "Data type does not match, length of service parameter does not match.",
    ),
    (
        0x0607_0012,
        "Data type does not match, length of service parameter too high.",
    ),
    (
        0x0607_0013,
        "Data type does not match, length of service parameter too low.",
    ),
    (SUBINDEX_DOES_NOT_EXIST, "Sub-index does not exist."),
    (0x0609_0030, "Value range of parameter exceeded."),
    (0x0609_0031, "Value of parameter written too high."),
    (0x0609_0032, "Value of parameter written too low."),
    (0x0609_0036, "Maximum value is less than minimum value."),
    (GENERAL_ERROR, "General error."),
    (
        0x0800_0020,
        "Data cannot be transferred or stored to the application.",
    ),
    (
        0x0800_0021,
        "Data cannot be transferred or stored to the application because of local control.",
    ),
    (
        0x0800_0022,
        "Data cannot be transferred or stored to the application because of the present device state.",
    ),
    (0x0F00_FFC0, "The device is in wrong NMT state."),
    (0x0F00_FFBF, "The RS232 command is illegal."),
    (0x0F00_FFBE, "The password is not correct."),
    (0x0F00_FFBC, "The device is not in service mode."),
    (UNKNOWN_DEVICE, "Error Node-ID."),
    (LINK_BAD_RESPONSE, "RS232/EPOS: Bad response frame."),
    (LINK_NACK, "RS232/EPOS: Non-ACk."),
    (LINK_RECV, "RS232/EPOS: Receive error."),
    (LINK_XMIT, "RS232/EPOS: Transmit error."),
    (LINK_BAD_CRC, "RS232/EPOS: Received bad CRC."),
    (LINK_TIMEOUT, "RS232/EPOS: Timeout waiting for value."),
];

/// Describe a device or link error code.
pub fn describe(code: u32) -> &'static str {
    lookup(code).unwrap_or(UNKNOWN_CODE)
}

/// Description of `code` if it is a known error code.
pub fn lookup(code: u32) -> Option<&'static str> {
    DESCRIPTIONS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, text)| *text)
}

/// All known codes in table order.
pub fn known_codes() -> impl Iterator<Item = (u32, &'static str)> {
    DESCRIPTIONS.iter().copied()
}
