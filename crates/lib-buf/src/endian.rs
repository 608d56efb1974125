/// Byte-order parameter for [`crate::Readable::read`] and
/// [`crate::Writeable::write`]. Network protocols read with [`BigEndian`];
/// same-host wire formats read with [`NativeEndian`].
pub trait Endianness {
    fn u16_from_bytes(bytes: [u8; 2]) -> u16;
    fn u32_from_bytes(bytes: [u8; 4]) -> u32;
    fn u16_to_bytes(value: u16) -> [u8; 2];
    fn u32_to_bytes(value: u32) -> [u8; 4];
}

pub struct BigEndian;

impl Endianness for BigEndian {
    fn u16_from_bytes(bytes: [u8; 2]) -> u16 {
        u16::from_be_bytes(bytes)
    }

    fn u32_from_bytes(bytes: [u8; 4]) -> u32 {
        u32::from_be_bytes(bytes)
    }

    fn u16_to_bytes(value: u16) -> [u8; 2] {
        value.to_be_bytes()
    }

    fn u32_to_bytes(value: u32) -> [u8; 4] {
        value.to_be_bytes()
    }
}

pub struct LittleEndian;

impl Endianness for LittleEndian {
    fn u16_from_bytes(bytes: [u8; 2]) -> u16 {
        u16::from_le_bytes(bytes)
    }

    fn u32_from_bytes(bytes: [u8; 4]) -> u32 {
        u32::from_le_bytes(bytes)
    }

    fn u16_to_bytes(value: u16) -> [u8; 2] {
        value.to_le_bytes()
    }

    fn u32_to_bytes(value: u32) -> [u8; 4] {
        value.to_le_bytes()
    }
}

/// Byte order of the machine this process runs on.
#[cfg(target_endian = "little")]
pub type NativeEndian = LittleEndian;

#[cfg(target_endian = "big")]
pub type NativeEndian = BigEndian;
