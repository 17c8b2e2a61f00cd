use std::io;
use std::process::ExitCode;

use derive_more::From;
use thiserror::Error;

use crate::device::{ControlRequest, InterfaceName};
use crate::mbim::{FieldError, utf16::Utf16OverflowError};

/// Errors returned by the device control channel.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket")]
    Socket { source: io::Error },
    #[error("{interface}: not an MBIM device ({request})")]
    DeviceAbsent {
        interface: InterfaceName,
        request: ControlRequest,
        source: io::Error,
    },
    #[error("{interface}")]
    Io {
        interface: InterfaceName,
        request: ControlRequest,
        source: io::Error,
    },
    #[error("{interface}")]
    Close {
        interface: InterfaceName,
        source: io::Error,
    },
}

/// Errors returned while reading a configuration source.
#[derive(Debug, Error)]
pub enum ConfigSourceError {
    #[error("{origin}")]
    Open { origin: String, source: io::Error },
    #[error("{origin}")]
    Read { origin: String, source: io::Error },
    #[error("{origin}:{line}")]
    Line {
        origin: String,
        line: usize,
        source: FieldError,
    },
}

/// Errors returned when parsing fake device fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("fixture entries must have the form `key=value`, got `{entry}`")]
    InvalidEntry { entry: String },
    #[error("unknown fixture key `{key}`")]
    UnknownKey { key: String },
    #[error("fixture value for `{key}` is not a number")]
    InvalidNumber {
        key: String,
        source: std::num::ParseIntError,
    },
    #[error("fixture value for `{key}` does not fit its field")]
    TextTooLong {
        key: String,
        source: Utf16OverflowError,
    },
    #[error("invalid fixture parameter")]
    Parameter(#[from] FieldError),
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level errors of one `umbctl` invocation.
#[derive(Debug, Error, From)]
pub enum UmbctlError {
    #[error(transparent)]
    Transport(TransportError),
    #[error(transparent)]
    Field(FieldError),
    #[error(transparent)]
    ConfigSource(ConfigSourceError),
}

impl UmbctlError {
    /// Process exit status for this error.
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::Transport(_error) => ExitStatus::Device,
            Self::Field(error) => ExitStatus::for_field_error(error),
            // A configuration source that is not fully consumed is a
            // configuration failure, whatever stopped it.
            Self::ConfigSource(_error) => ExitStatus::Device,
        }
    }
}

/// Process exit statuses reported by the `umbctl` binary.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    Usage = 1,
    Device = 2,
    CredentialTooLong = 3,
    LockCodeTooLong = 4,
}

impl ExitStatus {
    fn for_field_error(error: &FieldError) -> Self {
        match error {
            FieldError::TooLong { field } if field.is_lock_code() => Self::LockCodeTooLong,
            FieldError::TooLong { .. } => Self::CredentialTooLong,
            FieldError::UnknownOrIncomplete { .. } => Self::Usage,
        }
    }

    /// Finds the exit status for an application error by walking its cause chain.
    ///
    /// Errors without a known cause map to [`ExitStatus::Device`].
    #[must_use]
    pub fn for_error(error: &anyhow::Error) -> Self {
        error
            .chain()
            .find_map(|cause| {
                if let Some(error) = cause.downcast_ref::<UmbctlError>() {
                    return Some(error.exit_status());
                }
                if cause.is::<TransportError>() || cause.is::<ConfigSourceError>() {
                    return Some(Self::Device);
                }
                cause.downcast_ref::<FieldError>().map(Self::for_field_error)
            })
            .unwrap_or(Self::Device)
    }

    /// Numeric status code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.code())
    }
}
