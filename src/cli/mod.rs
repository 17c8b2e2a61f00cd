pub(crate) mod command;
pub(crate) mod report;

pub use self::command::{Args, Command, FakeArgs, LogLevel, OutputFormat};
