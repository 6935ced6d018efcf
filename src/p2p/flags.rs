//! P2P header flag values

pub const NORMAL: u32 = 0x00;
pub const ACKNOWLEDGEMENT: u32 = 0x02;
pub const WAITING_REPLY: u32 = 0x04;
pub const BINARY_ERROR: u32 = 0x08;
pub const MSN_OBJECT: u32 = 0x20;
pub const FILE_DATA: u32 = 0x0100_0030;
/// Direct-connection handshake
pub const HANDSHAKE: u32 = 0x100;

/// Flags of an acknowledgement answering a message with `flags`
pub const fn acknowledgement_for(flags: u32) -> u32 {
    if flags & WAITING_REPLY != 0 {
        ACKNOWLEDGEMENT | WAITING_REPLY
    } else {
        ACKNOWLEDGEMENT
    }
}

pub const fn contains(flags: u32, flag: u32) -> bool {
    flags & flag == flag
}
