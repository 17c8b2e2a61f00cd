//! Control channel to `umb(4)` interfaces.

mod client;
mod fake_backend;
mod interface;
#[cfg(unix)]
mod ioctl_backend;

pub use self::client::{
    ControlRequest, DeviceChannel, DeviceClient, fake_device_client, real_device_client,
};
pub use self::fake_backend::{
    FakeDeviceClient, FakeDeviceConfig, FakeDeviceHandle, FakeFailure, InfoFixture, ParamsFixture,
};
pub use self::interface::{InterfaceName, InterfaceNameError};
