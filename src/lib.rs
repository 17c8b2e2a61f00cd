mod app;
mod cli;
pub mod device;
mod error;
pub mod mbim;
pub mod sequencer;
mod telemetry;

pub use app::{fake_device_client, real_device_client, run, run_with_log_level};
pub use cli::{Args, Command, FakeArgs, LogLevel, OutputFormat};
pub use error::{ConfigSourceError, ExitStatus, FixtureError, TransportError, UmbctlError};
