use thiserror::Error;

/// Size of one UTF-16 code unit on the wire.
pub const CODE_UNIT_LEN: usize = 2;

/// Error returned when text does not fit in a fixed UTF-16 buffer.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
#[error("text needs {required_bytes} bytes but the buffer holds {capacity_bytes}")]
pub struct Utf16OverflowError {
    pub required_bytes: usize,
    pub capacity_bytes: usize,
}

/// Encodes `text` into `out` as little-endian UTF-16 code units.
///
/// Encoding stops at the first NUL character. Unused trailing units are
/// zeroed so stale secrets never survive in a reused buffer. When the text
/// does not fit, nothing is written.
///
/// Returns the number of bytes written, excluding any terminator.
///
/// # Errors
///
/// Returns [`Utf16OverflowError`] when the encoded text exceeds
/// `out.len() * 2` bytes.
///
/// ```
/// use umbctl::mbim::utf16;
///
/// let mut buffer = [0xFFFF_u16; 4];
/// let written = utf16::encode("ab", &mut buffer)?;
/// assert_eq!(4, written);
/// assert_eq!([u16::to_le(0x61), u16::to_le(0x62), 0, 0], buffer);
/// # Ok::<(), utf16::Utf16OverflowError>(())
/// ```
pub fn encode(text: &str, out: &mut [u16]) -> Result<usize, Utf16OverflowError> {
    let text = text.find('\0').map_or(text, |end| &text[..end]);
    let required_units = text.encode_utf16().count();
    if required_units > out.len() {
        return Err(Utf16OverflowError {
            required_bytes: required_units * CODE_UNIT_LEN,
            capacity_bytes: out.len() * CODE_UNIT_LEN,
        });
    }

    let (written, residual) = out.split_at_mut(required_units);
    for (slot, unit) in written.iter_mut().zip(text.encode_utf16()) {
        *slot = unit.to_le();
    }
    residual.fill(0);

    Ok(required_units * CODE_UNIT_LEN)
}

/// Decodes little-endian UTF-16 code units for display.
///
/// Reading stops at the first zero unit or the end of `units`. Each unit
/// becomes one output character: 7-bit ASCII is copied and everything else
/// becomes `?`. At most `out_capacity - 1` characters are produced, the last
/// slot being reserved for a terminator.
///
/// ```
/// use umbctl::mbim::utf16;
///
/// let units = [u16::to_le(0x48), u16::to_le(0x00E9), u16::to_le(0x69), 0];
/// assert_eq!("H?i", utf16::decode(&units, 16));
/// assert_eq!("H", utf16::decode(&units, 2));
/// ```
#[must_use]
pub fn decode(units: &[u16], out_capacity: usize) -> String {
    units
        .iter()
        .map(|unit| u16::from_le(*unit))
        .take_while(|unit| *unit != 0)
        .take(out_capacity.saturating_sub(1))
        .map(display_char)
        .collect()
}

fn display_char(unit: u16) -> char {
    u8::try_from(unit)
        .ok()
        .filter(u8::is_ascii)
        .map_or('?', char::from)
}
