use std::fmt;

use strum_macros::{Display, EnumIter, EnumString, FromRepr, IntoStaticStr};
use thiserror::Error;
use tracing::{debug, instrument};

use super::text::Utf16Field;

/// Maximum PIN/PUK length in code units.
pub const UMB_PIN_MAXLEN: usize = 16;
/// Maximum APN length in code units.
pub const UMB_APN_MAXLEN: usize = 100;
/// Maximum username length in code units.
pub const UMB_USERNAME_MAXLEN: usize = 205;
/// Maximum password length in code units.
pub const UMB_PASSWORD_MAXLEN: usize = 205;

const MASK_CHAR: char = '*';

/// Parameter names accepted on the command line and in configuration files.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum ParameterField {
    /// Access point name.
    Apn,
    /// Connection username.
    Username,
    /// Connection password.
    Password,
    /// SIM PIN code.
    Pin,
    /// SIM PUK code.
    Puk,
}

impl ParameterField {
    /// Field name as typed by the operator.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Returns whether values of this field must never be shown in cleartext.
    #[must_use]
    pub const fn is_secret(self) -> bool {
        matches!(self, Self::Password | Self::Pin | Self::Puk)
    }

    /// Returns whether this field carries a SIM lock code.
    #[must_use]
    pub const fn is_lock_code(self) -> bool {
        matches!(self, Self::Pin | Self::Puk)
    }

    const fn description(self) -> &'static str {
        match self {
            Self::Apn => "APN",
            Self::Username => "Username",
            Self::Password => "Password",
            Self::Pin => "PIN code",
            Self::Puk => "PUK code",
        }
    }
}

/// SIM lock-code operation requested through the parameter record.
#[derive(Debug, Clone, Copy, Eq, PartialEq, FromRepr, Display)]
#[repr(i32)]
pub enum PinOperation {
    #[strum(to_string = "enter")]
    Enter = 0,
    #[strum(to_string = "enable")]
    Enable = 1,
    #[strum(to_string = "disable")]
    Disable = 2,
    #[strum(to_string = "change")]
    Change = 3,
}

/// Errors returned while applying parameter assignments.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FieldError {
    /// The encoded value does not fit the field's buffer.
    #[error("{} too long", field.description())]
    TooLong { field: ParameterField },
    /// The name is not a known parameter, or it has no value.
    #[error("{token}: unknown or incomplete parameter")]
    UnknownOrIncomplete { token: String },
}

/// One `name value` pair destined for a [`ParameterRecord`].
#[derive(Clone, Eq, PartialEq)]
pub struct Assignment {
    field: String,
    value: Option<String>,
}

impl Assignment {
    /// Creates a complete assignment.
    ///
    /// ```
    /// use umbctl::mbim::Assignment;
    ///
    /// let assignment = Assignment::new("apn", "internet");
    /// assert_eq!("apn", assignment.field());
    /// assert_eq!(Some("internet"), assignment.value());
    /// ```
    #[must_use]
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: Some(value.into()),
        }
    }

    /// Creates an assignment whose value is missing.
    #[must_use]
    pub fn incomplete(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: None,
        }
    }

    pub(crate) fn from_parts(field: &str, value: Option<&str>) -> Self {
        Self {
            field: field.to_owned(),
            value: value.map(str::to_owned),
        }
    }

    /// Pairs positional tokens into assignments.
    ///
    /// Accepts `name value` and `name=value`. The first token that forms
    /// neither becomes an incomplete assignment and ends pairing, so applying
    /// the result fails at that position. An unknown `name=value` keeps only
    /// its name.
    ///
    /// ```
    /// use umbctl::mbim::Assignment;
    ///
    /// let assignments = Assignment::from_args(["apn", "internet", "pin=1234", "bogus"]);
    /// assert_eq!(3, assignments.len());
    /// assert_eq!(Some("1234"), assignments[1].value());
    /// assert_eq!(None, assignments[2].value());
    /// ```
    #[must_use]
    pub fn from_args<I, S>(tokens: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<S> = tokens.into_iter().collect();
        let mut assignments = Vec::new();
        let mut index = 0;

        while let Some(token) = tokens.get(index) {
            let token = token.as_ref();
            // An unknown `name=value` is reported by name only; its value
            // may be a secret.
            if let Some((name, value)) = token.split_once('=') {
                if is_known_field(name) {
                    assignments.push(Self::new(name, value));
                    index += 1;
                    continue;
                }
                assignments.push(Self::incomplete(name));
                break;
            }

            match tokens.get(index + 1) {
                Some(value) if is_known_field(token) => {
                    assignments.push(Self::new(token, value.as_ref()));
                    index += 2;
                }
                _ => {
                    assignments.push(Self::incomplete(token));
                    break;
                }
            }
        }

        assignments
    }

    /// Parameter name as given.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Value as given, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn known_field(&self) -> Option<ParameterField> {
        self.field.parse().ok()
    }

    fn display_value(&self) -> Option<String> {
        let value = self.value.as_deref()?;
        if self.known_field().is_some_and(ParameterField::is_secret) {
            Some(mask(value))
        } else {
            Some(value.to_owned())
        }
    }
}

impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assignment")
            .field("field", &self.field)
            .field("value", &self.display_value())
            .finish()
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_value() {
            Some(value) => write!(f, "{} {value}", self.field),
            None => write!(f, "{}", self.field),
        }
    }
}

fn is_known_field(name: &str) -> bool {
    name.parse::<ParameterField>().is_ok()
}

/// Replaces every character of a secret with a mask character.
///
/// ```
/// assert_eq!("****", umbctl::mbim::mask("1234"));
/// ```
#[must_use]
pub fn mask(secret: &str) -> String {
    secret.chars().map(|_char| MASK_CHAR).collect()
}

/// Connection parameters exchanged with the driver (`struct umb_parameter`).
#[derive(Clone, Copy, Eq, PartialEq)]
#[repr(C)]
pub struct ParameterRecord {
    op: i32,
    is_puk: i32,
    pin: Utf16Field<UMB_PIN_MAXLEN>,
    new_pin: Utf16Field<UMB_PIN_MAXLEN>,
    apn: Utf16Field<UMB_APN_MAXLEN>,
    username: Utf16Field<UMB_USERNAME_MAXLEN>,
    password: Utf16Field<UMB_PASSWORD_MAXLEN>,
    roaming: i32,
    preferred_classes: u32,
}

impl ParameterRecord {
    /// Creates an all-zero record.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            op: 0,
            is_puk: 0,
            pin: Utf16Field::zeroed(),
            new_pin: Utf16Field::zeroed(),
            apn: Utf16Field::zeroed(),
            username: Utf16Field::zeroed(),
            password: Utf16Field::zeroed(),
            roaming: 0,
            preferred_classes: 0,
        }
    }

    /// Applies one named field.
    ///
    /// `pin` and `puk` share the lock-code buffer; the last one applied
    /// decides whether the code is a PUK. On error the record is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::UnknownOrIncomplete`] for an unknown name or a
    /// missing value, and [`FieldError::TooLong`] when the value does not fit.
    ///
    /// ```
    /// use umbctl::mbim::{FieldError, ParameterRecord};
    ///
    /// let mut record = ParameterRecord::zeroed();
    /// record.apply_field("puk", Some("12345678"))?;
    /// assert!(record.is_puk());
    /// assert!(record.apply_field("Apn", Some("internet")).is_err());
    /// # Ok::<(), FieldError>(())
    /// ```
    pub fn apply_field(&mut self, name: &str, value: Option<&str>) -> Result<(), FieldError> {
        let incomplete = || FieldError::UnknownOrIncomplete {
            token: name.to_owned(),
        };
        let field = name.parse::<ParameterField>().map_err(|_error| incomplete())?;
        let value = value.ok_or_else(incomplete)?;
        self.set(field, value)
    }

    /// Applies one assignment.
    ///
    /// # Errors
    ///
    /// See [`ParameterRecord::apply_field`].
    pub fn apply(&mut self, assignment: &Assignment) -> Result<(), FieldError> {
        self.apply_field(assignment.field(), assignment.value())
    }

    /// Stores `value` in `field`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::TooLong`] when the value does not fit.
    pub fn set(&mut self, field: ParameterField, value: &str) -> Result<(), FieldError> {
        match field {
            ParameterField::Apn => store(&mut self.apn, field, value),
            ParameterField::Username => store(&mut self.username, field, value),
            ParameterField::Password => store(&mut self.password, field, value),
            ParameterField::Pin | ParameterField::Puk => {
                store(&mut self.pin, field, value)?;
                self.is_puk = i32::from(field == ParameterField::Puk);
                self.op = PinOperation::Enter as i32;
                Ok(())
            }
        }
    }

    /// Decoded APN.
    #[must_use]
    pub fn apn(&self) -> String {
        self.apn.decode()
    }

    /// Decoded username.
    #[must_use]
    pub fn username(&self) -> String {
        self.username.decode()
    }

    /// Decoded password. Never log this value.
    #[must_use]
    pub fn password(&self) -> String {
        self.password.decode()
    }

    /// Decoded PIN or PUK, depending on [`ParameterRecord::is_puk`]. Never log this value.
    #[must_use]
    pub fn lock_code(&self) -> String {
        self.pin.decode()
    }

    /// Encoded length in bytes of the buffer behind `field`.
    #[must_use]
    pub fn encoded_len(&self, field: ParameterField) -> usize {
        match field {
            ParameterField::Apn => self.apn.len_bytes(),
            ParameterField::Username => self.username.len_bytes(),
            ParameterField::Password => self.password.len_bytes(),
            ParameterField::Pin | ParameterField::Puk => self.pin.len_bytes(),
        }
    }

    /// Returns whether the lock code is a PUK rather than a PIN.
    #[must_use]
    pub fn is_puk(&self) -> bool {
        self.is_puk != 0
    }

    /// Requested lock-code operation, if the raw value is known.
    #[must_use]
    pub fn operation(&self) -> Option<PinOperation> {
        PinOperation::from_repr(self.op)
    }

    pub(crate) fn apn_field(&self) -> &Utf16Field<UMB_APN_MAXLEN> {
        &self.apn
    }

    pub(crate) fn username_field(&self) -> &Utf16Field<UMB_USERNAME_MAXLEN> {
        &self.username
    }

    pub(crate) fn password_field(&self) -> &Utf16Field<UMB_PASSWORD_MAXLEN> {
        &self.password
    }
}

impl Default for ParameterRecord {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl fmt::Debug for ParameterRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = |len: usize| MASK_CHAR.to_string().repeat(len);
        f.debug_struct("ParameterRecord")
            .field("op", &self.op)
            .field("is_puk", &self.is_puk)
            .field("pin", &masked(self.pin.char_len()))
            .field("new_pin", &masked(self.new_pin.char_len()))
            .field("apn", &self.apn.decode())
            .field("username", &self.username.decode())
            .field("password", &masked(self.password.char_len()))
            .field("roaming", &self.roaming)
            .field("preferred_classes", &format_args!("{:#010x}", self.preferred_classes))
            .finish()
    }
}

fn store<const N: usize>(
    slot: &mut Utf16Field<N>,
    field: ParameterField,
    value: &str,
) -> Result<(), FieldError> {
    slot.set(value)
        .map_err(|_overflow| FieldError::TooLong { field })
}

/// Applies `assignments` in order, stopping at the first failure.
///
/// Assignments applied before the failure stay in the record.
///
/// # Errors
///
/// Returns the first [`FieldError`] encountered.
#[instrument(skip_all, level = "debug", fields(count = assignments.len()))]
pub fn apply_sequence(
    record: &mut ParameterRecord,
    assignments: &[Assignment],
) -> Result<(), FieldError> {
    for assignment in assignments {
        record.apply(assignment)?;
        debug!(%assignment, "applied parameter");
    }
    Ok(())
}
