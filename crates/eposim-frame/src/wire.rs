//! Single-call I/O primitives used by the handshake state machines.

use std::io::{Error, ErrorKind, Read, Write};

/// Read one byte. A closed channel is an `UnexpectedEof` error.
pub(crate) fn read_byte<T: Read>(io: &mut T) -> std::io::Result<u8> {
    let mut byte = [0u8; 1];
    io.read_exact(&mut byte)?;
    Ok(byte[0])
}

/// Write exactly one control byte and flush it out.
pub(crate) fn write_byte<T: Write>(io: &mut T, byte: u8) -> std::io::Result<()> {
    write_once(io, &[byte])
}

/// Write `bytes` in a single successful call.
///
/// A partial write is an error; the handshake has no way to resume one.
pub(crate) fn write_once<T: Write>(io: &mut T, bytes: &[u8]) -> std::io::Result<()> {
    loop {
        match io.write(bytes) {
            Ok(n) if n == bytes.len() => break,
            Ok(n) => {
                return Err(Error::new(
                    ErrorKind::WriteZero,
                    format!("short write ({n} of {} bytes)", bytes.len()),
                ))
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }

    loop {
        match io.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}
