use std::fmt;

use super::utf16::{self, CODE_UNIT_LEN, Utf16OverflowError};

/// Fixed buffer of `N` little-endian UTF-16 code units, as laid out in driver records.
#[derive(Clone, Copy, Eq, PartialEq)]
#[repr(transparent)]
pub struct Utf16Text<const N: usize>([u16; N]);

impl<const N: usize> Utf16Text<N> {
    /// Creates an all-zero buffer.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self([0; N])
    }

    /// Creates a buffer holding `text`.
    ///
    /// # Errors
    ///
    /// Returns an error when `text` needs more than `N` code units.
    ///
    /// ```
    /// use umbctl::mbim::Utf16Text;
    ///
    /// let provider = Utf16Text::<20>::from_text("Example Mobile")?;
    /// assert_eq!("Example Mobile", provider.decode());
    /// # Ok::<(), umbctl::mbim::utf16::Utf16OverflowError>(())
    /// ```
    pub fn from_text(text: &str) -> Result<Self, Utf16OverflowError> {
        let mut buffer = Self::zeroed();
        buffer.encode(text)?;
        Ok(buffer)
    }

    /// Replaces the buffer content, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error when `text` needs more than `N` code units; the
    /// buffer is left unchanged in that case.
    pub fn encode(&mut self, text: &str) -> Result<usize, Utf16OverflowError> {
        utf16::encode(text, &mut self.0)
    }

    /// Decodes the buffer for display into at most `N` characters.
    #[must_use]
    pub fn decode(&self) -> String {
        utf16::decode(&self.0, N + 1)
    }

    /// Raw code units in wire (little-endian) order.
    #[must_use]
    pub fn units(&self) -> &[u16; N] {
        &self.0
    }
}

impl<const N: usize> Default for Utf16Text<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> fmt::Debug for Utf16Text<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.decode(), f)
    }
}

/// UTF-16 buffer followed by its encoded length in bytes.
///
/// Mirrors the `uint16_t field[N]; int fieldlen;` pairs of the driver's
/// parameter record.
#[derive(Clone, Copy, Eq, PartialEq)]
#[repr(C)]
pub struct Utf16Field<const N: usize> {
    text: Utf16Text<N>,
    len: i32,
}

impl<const N: usize> Utf16Field<N> {
    /// Creates an empty field.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            text: Utf16Text::zeroed(),
            len: 0,
        }
    }

    /// Creates a field holding `text`.
    ///
    /// # Errors
    ///
    /// Returns an error when `text` needs more than `N` code units.
    pub fn from_text(text: &str) -> Result<Self, Utf16OverflowError> {
        let mut field = Self::zeroed();
        field.set(text)?;
        Ok(field)
    }

    /// Stores `text` and its byte length.
    ///
    /// # Errors
    ///
    /// Returns an error when `text` needs more than `N` code units; neither
    /// the buffer nor the length change in that case.
    ///
    /// ```
    /// use umbctl::mbim::Utf16Field;
    ///
    /// let mut pin = Utf16Field::<16>::zeroed();
    /// pin.set("1234")?;
    /// assert_eq!(8, pin.len_bytes());
    /// assert!(pin.set(&"9".repeat(17)).is_err());
    /// assert_eq!("1234", pin.decode());
    /// # Ok::<(), umbctl::mbim::utf16::Utf16OverflowError>(())
    /// ```
    pub fn set(&mut self, text: &str) -> Result<(), Utf16OverflowError> {
        let written = self.text.encode(text)?;
        self.len = i32::try_from(written).unwrap_or(i32::MAX);
        Ok(())
    }

    /// Encoded length in bytes as reported by the record.
    #[must_use]
    pub fn len_bytes(&self) -> usize {
        usize::try_from(self.len).unwrap_or(0)
    }

    /// Returns whether the field holds no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len_bytes() == 0
    }

    /// Number of characters a masked rendering of this field shows.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.decode().chars().count()
    }

    /// Decodes the first `len` bytes of the buffer for display.
    #[must_use]
    pub fn decode(&self) -> String {
        let units = (self.len_bytes() / CODE_UNIT_LEN).min(N);
        utf16::decode(&self.text.units()[..units], N + 1)
    }

    /// Underlying buffer.
    #[must_use]
    pub fn text(&self) -> &Utf16Text<N> {
        &self.text
    }
}

impl<const N: usize> Default for Utf16Field<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> fmt::Debug for Utf16Field<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Utf16Field")
            .field("text", &self.decode())
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::mem::{align_of, size_of};

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn field_layout_matches_buffer_plus_int() {
        assert_eq!(36, size_of::<Utf16Field<16>>());
        assert_eq!(204, size_of::<Utf16Field<100>>());
        assert_eq!(414, size_of::<Utf16Field<205>>());
        assert_eq!(4, align_of::<Utf16Field<205>>());
    }

    #[test]
    fn field_from_text_carries_length() {
        let field = Utf16Field::<8>::from_text("abc").expect("three characters should fit");
        assert_eq!(6, field.len_bytes());
        assert_eq!("abc", field.decode());
        assert!(Utf16Field::<2>::from_text("abc").is_err());
    }

    #[test]
    fn field_set_overwrites_previous_value_and_length() {
        let mut field = Utf16Field::<8>::zeroed();
        field.set("longer1").expect("seven characters should fit");
        field.set("abc").expect("three characters should fit");

        assert_eq!(6, field.len_bytes());
        assert_eq!("abc", field.decode());
        assert!(field.text().units()[3..].iter().all(|unit| *unit == 0));
    }

    #[test]
    fn field_decode_ignores_negative_length() {
        let mut field = Utf16Field::<4>::zeroed();
        field.set("ab").expect("two characters should fit");
        field.len = -1;

        assert_eq!("", field.decode());
        assert!(field.is_empty());
    }

    #[test]
    fn text_decode_is_bounded_by_capacity() {
        let text = Utf16Text::<4>::from_text("wxyz").expect("exact fit should succeed");
        assert_eq!("wxyz", text.decode());
    }

    #[test]
    fn debug_shows_decoded_text() {
        let text = Utf16Text::<8>::from_text("umb").expect("short text should fit");
        assert_eq!("\"umb\"", format!("{text:?}"));
    }
}
