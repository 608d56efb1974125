mod endian;
mod error;
mod read;
mod write;

pub use endian::*;
pub use error::*;
pub use read::*;
pub use write::*;

pub mod prelude {
    pub use crate::{
        bytes_written, BigEndian, BufferError, Endianness, LittleEndian, NativeEndian, ReadBuffer,
        Readable, ReadableMulti, WriteBuffer, Writeable,
    };
}

/// Sum the byte counts of a sequence of `write` calls.
///
/// ### Example
///
/// ```
/// use netbuf::{bytes_written, BigEndian, WriteBuffer, Writeable};
///
/// let mut b = WriteBuffer::new();
/// let n = (|| -> Result<usize, netbuf::BufferError> {
///     Ok(bytes_written! {
///         1u16.write::<BigEndian>(&mut b)?;
///         2u32.write::<BigEndian>(&mut b)?
///     })
/// })();
/// assert_eq!(n, Ok(6));
/// ```
#[macro_export]
macro_rules! bytes_written {
    ($($write:expr);+ $(;)?) => {{
        let mut n = 0;
        $(n += $write;)+
        n
    }};
}
