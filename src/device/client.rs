use std::fmt;
use std::io;

use strum_macros::{Display, EnumIter};
use tracing::info;

use super::InterfaceName;
use super::fake_backend::{FakeDeviceClient, FakeDeviceConfig};
use crate::error::TransportError;
use crate::mbim::{InfoRecord, ParameterRecord};

/// Driver control requests understood by `umb(4)`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter)]
pub enum ControlRequest {
    /// Read the status snapshot.
    #[strum(to_string = "SIOCGUMBINFO")]
    GetInfo,
    /// Write connection parameters.
    #[strum(to_string = "SIOCSUMBPARAM")]
    SetParameters,
    /// Read connection parameters.
    #[strum(to_string = "SIOCGUMBPARAM")]
    GetParameters,
}

/// Opens control channels to MBIM interfaces.
pub trait DeviceClient {
    /// Opens a control channel addressed to `interface`.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying handle cannot be created.
    fn open(
        self: Box<Self>,
        interface: &InterfaceName,
    ) -> Result<Box<dyn DeviceChannel>, TransportError>;
}

/// One open control channel; each request exchanges one fixed-size record.
pub trait DeviceChannel: fmt::Debug {
    /// Interface the channel is addressed to.
    fn interface(&self) -> &InterfaceName;

    /// Reads the current connection parameters.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::DeviceAbsent`] when the interface is not an
    /// MBIM device and [`TransportError::Io`] for any other failure.
    fn fetch_parameters(&self) -> Result<ParameterRecord, TransportError>;

    /// Writes connection parameters.
    ///
    /// # Errors
    ///
    /// See [`DeviceChannel::fetch_parameters`].
    fn push_parameters(&self, record: &ParameterRecord) -> Result<(), TransportError>;

    /// Reads the status snapshot.
    ///
    /// # Errors
    ///
    /// See [`DeviceChannel::fetch_parameters`].
    fn fetch_info(&self) -> Result<InfoRecord, TransportError>;

    /// Releases the channel.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Close`] when releasing the handle fails.
    fn close(self: Box<Self>) -> Result<(), TransportError>;
}

/// Maps a failed request's errno onto the transport error kinds.
pub(crate) fn classify(
    interface: InterfaceName,
    request: ControlRequest,
    source: io::Error,
) -> TransportError {
    if source.raw_os_error() == Some(libc::ENXIO) {
        TransportError::DeviceAbsent {
            interface,
            request,
            source,
        }
    } else {
        TransportError::Io {
            interface,
            request,
            source,
        }
    }
}

/// Creates a device client backed by the kernel ioctl interface.
#[must_use]
pub fn real_device_client() -> Box<dyn DeviceClient> {
    #[cfg(unix)]
    {
        Box::new(super::ioctl_backend::IoctlDeviceClient)
    }
    #[cfg(not(unix))]
    {
        Box::new(UnsupportedDeviceClient)
    }
}

/// Creates a device client backed by in-memory fixtures.
#[must_use]
pub fn fake_device_client(config: FakeDeviceConfig) -> Box<dyn DeviceClient> {
    info!("using fake MBIM backend");
    Box::new(FakeDeviceClient::new(config))
}

#[cfg(not(unix))]
#[derive(Debug)]
struct UnsupportedDeviceClient;

#[cfg(not(unix))]
impl DeviceClient for UnsupportedDeviceClient {
    fn open(
        self: Box<Self>,
        _interface: &InterfaceName,
    ) -> Result<Box<dyn DeviceChannel>, TransportError> {
        Err(TransportError::Socket {
            source: io::Error::from(io::ErrorKind::Unsupported),
        })
    }
}
