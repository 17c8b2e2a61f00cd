use std::str::FromStr;

use thiserror::Error;

/// Kernel limit on interface names, including the terminating NUL.
pub(crate) const IFNAMSIZ: usize = 16;

/// Errors returned when validating an interface name.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum InterfaceNameError {
    #[error("interface name cannot be empty")]
    Empty,
    #[error("interface name `{name}` is longer than {max} bytes")]
    TooLong { name: String, max: usize },
    #[error("interface name cannot contain NUL bytes")]
    ContainsNul,
}

/// Validated network interface name such as `umb0`.
#[derive(
    Debug,
    Clone,
    Eq,
    PartialEq,
    Hash,
    derive_more::Display,
    derive_more::AsRef,
    derive_more::Into,
)]
#[as_ref(str)]
pub struct InterfaceName(String);

impl InterfaceName {
    /// Interface name bytes without terminator; at most `IFNAMSIZ - 1` long.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Interface name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for InterfaceName {
    type Err = InterfaceNameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() {
            return Err(InterfaceNameError::Empty);
        }
        if value.contains('\0') {
            return Err(InterfaceNameError::ContainsNul);
        }
        if value.len() >= IFNAMSIZ {
            return Err(InterfaceNameError::TooLong {
                name: value.to_owned(),
                max: IFNAMSIZ - 1,
            });
        }
        Ok(Self(value.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn accepts_typical_names() {
        let name: InterfaceName = "umb0".parse().expect("umb0 should be valid");
        assert_eq!("umb0", name.to_string());
        let borrowed: &str = name.as_ref();
        assert_eq!("umb0", borrowed);
        assert_eq!("umb0", String::from(name));
    }

    #[test]
    fn accepts_longest_name() {
        let longest = "u".repeat(IFNAMSIZ - 1);
        assert_matches!(longest.parse::<InterfaceName>(), Ok(_));
    }

    #[test]
    fn rejects_name_without_room_for_terminator() {
        let result = "u".repeat(IFNAMSIZ).parse::<InterfaceName>();
        assert_matches!(result, Err(InterfaceNameError::TooLong { max: 15, .. }));
    }

    #[test]
    fn rejects_empty_and_nul() {
        assert_eq!(Err(InterfaceNameError::Empty), "".parse::<InterfaceName>());
        assert_eq!(
            Err(InterfaceNameError::ContainsNul),
            "umb\00".parse::<InterfaceName>()
        );
    }
}
