use std::ffi::c_void;
use std::io;
use std::mem::size_of;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd};
use std::ptr;

use tracing::{debug, instrument};

use super::client::{ControlRequest, DeviceChannel, DeviceClient, classify};
use super::interface::{IFNAMSIZ, InterfaceName};
use crate::error::TransportError;
use crate::mbim::{InfoRecord, ParameterRecord};

// BSD `<sys/ioccom.h>` request encoding.
const IOCPARM_MASK: u64 = 0x1fff;
const IOC_OUT: u64 = 0x4000_0000;
const IOC_IN: u64 = 0x8000_0000;
const IOC_INOUT: u64 = IOC_IN | IOC_OUT;

const fn ioc(direction: u64, group: u8, number: u8, len: usize) -> u64 {
    direction | ((len as u64 & IOCPARM_MASK) << 16) | ((group as u64) << 8) | number as u64
}

pub(crate) const SIOCGUMBINFO: u64 = ioc(IOC_INOUT, b'i', 190, size_of::<IfReq>());
pub(crate) const SIOCSUMBPARAM: u64 = ioc(IOC_IN, b'i', 191, size_of::<IfReq>());
pub(crate) const SIOCGUMBPARAM: u64 = ioc(IOC_INOUT, b'i', 192, size_of::<IfReq>());

impl ControlRequest {
    pub(crate) const fn code(self) -> u64 {
        match self {
            Self::GetInfo => SIOCGUMBINFO,
            Self::SetParameters => SIOCSUMBPARAM,
            Self::GetParameters => SIOCGUMBPARAM,
        }
    }
}

const IFRU_LEN: usize = 16;

/// `struct ifreq` carrying a data pointer in its request union.
#[repr(C)]
struct IfReq {
    name: [libc::c_char; IFNAMSIZ],
    #[allow(dead_code)] // read by the kernel
    data: *mut c_void,
    _pad: [u8; IFRU_LEN - size_of::<*mut c_void>()],
}

impl IfReq {
    fn new(interface: &InterfaceName, data: *mut c_void) -> Self {
        let mut name = [0; IFNAMSIZ];
        for (slot, byte) in name.iter_mut().zip(interface.as_bytes()) {
            *slot = *byte as libc::c_char;
        }
        Self {
            name,
            data,
            _pad: [0; IFRU_LEN - size_of::<*mut c_void>()],
        }
    }
}

/// Device client issuing `umb(4)` ioctls on a datagram socket.
#[derive(Debug)]
pub(crate) struct IoctlDeviceClient;

impl DeviceClient for IoctlDeviceClient {
    #[instrument(skip(self), level = "debug", fields(%interface))]
    fn open(
        self: Box<Self>,
        interface: &InterfaceName,
    ) -> Result<Box<dyn DeviceChannel>, TransportError> {
        // SAFETY: plain socket(2) call; the result is checked below.
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
        if fd < 0 {
            return Err(TransportError::Socket {
                source: io::Error::last_os_error(),
            });
        }
        // SAFETY: `fd` is a freshly created descriptor owned by nobody else.
        let socket = unsafe { OwnedFd::from_raw_fd(fd) };
        debug!(fd, "opened control socket");

        Ok(Box::new(IoctlChannel {
            socket,
            interface: interface.clone(),
        }))
    }
}

#[derive(Debug)]
struct IoctlChannel {
    socket: OwnedFd,
    interface: InterfaceName,
}

impl IoctlChannel {
    fn request(&self, request: ControlRequest, data: *mut c_void) -> Result<(), TransportError> {
        let mut ifr = IfReq::new(&self.interface, data);
        // SAFETY: `ifr` and the record behind `data` outlive the call, and the
        // record type matches the layout the driver copies for `request`.
        let result = unsafe {
            libc::ioctl(
                self.socket.as_raw_fd(),
                request.code() as _,
                ptr::from_mut(&mut ifr),
            )
        };
        if result != 0 {
            return Err(classify(
                self.interface.clone(),
                request,
                io::Error::last_os_error(),
            ));
        }
        Ok(())
    }
}

impl DeviceChannel for IoctlChannel {
    fn interface(&self) -> &InterfaceName {
        &self.interface
    }

    #[instrument(skip(self), level = "debug", fields(interface = %self.interface))]
    fn fetch_parameters(&self) -> Result<ParameterRecord, TransportError> {
        let mut record = ParameterRecord::zeroed();
        self.request(
            ControlRequest::GetParameters,
            ptr::from_mut(&mut record).cast(),
        )?;
        Ok(record)
    }

    #[instrument(skip_all, level = "debug", fields(interface = %self.interface))]
    fn push_parameters(&self, record: &ParameterRecord) -> Result<(), TransportError> {
        let mut outgoing = *record;
        self.request(
            ControlRequest::SetParameters,
            ptr::from_mut(&mut outgoing).cast(),
        )
    }

    #[instrument(skip(self), level = "debug", fields(interface = %self.interface))]
    fn fetch_info(&self) -> Result<InfoRecord, TransportError> {
        let mut record = InfoRecord::zeroed();
        self.request(ControlRequest::GetInfo, ptr::from_mut(&mut record).cast())?;
        Ok(record)
    }

    fn close(self: Box<Self>) -> Result<(), TransportError> {
        let Self { socket, interface } = *self;
        let fd = socket.into_raw_fd();
        // SAFETY: `fd` was released from its `OwnedFd` and is closed exactly once.
        if unsafe { libc::close(fd) } != 0 {
            return Err(TransportError::Close {
                interface,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}
