use std::fs::File;
use std::io::{self, BufReader};

use anyhow::Result;
use tracing::{debug, instrument};

use crate::cli::{Command, FakeArgs, LogLevel, OutputFormat, report};
use crate::device::{
    DeviceChannel, DeviceClient, InterfaceName, fake_device_client as build_fake_device_client,
    real_device_client as build_real_device_client,
};
use crate::error::{ConfigSourceError, UmbctlError};
use crate::mbim::FieldError;
use crate::sequencer::{CommandSequencer, SequenceOutcome};
use crate::telemetry;

/// Creates a device client backed by the `umb(4)` driver.
#[must_use]
pub fn real_device_client() -> Box<dyn DeviceClient> {
    build_real_device_client()
}

/// Creates a device client backed by fake fixtures.
#[must_use]
pub fn fake_device_client(fake_args: FakeArgs) -> Box<dyn DeviceClient> {
    build_fake_device_client(fake_args.into_device_config())
}

/// Runs one invocation with the default log level and the pretty report.
///
/// ```
/// use clap::Parser;
///
/// let args = umbctl::Args::try_parse_from(["umbctl", "--fake", "umb0"])?;
/// let (command, maybe_fake_args) = args.into_command_and_fake_args();
/// let device_client = match maybe_fake_args {
///     Some(fake_args) => umbctl::fake_device_client(fake_args),
///     None => umbctl::real_device_client(),
/// };
/// let mut out = Vec::new();
/// umbctl::run(command, &mut out, device_client)?;
/// assert!(String::from_utf8(out)?.starts_with("umb0: state up"));
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the configuration file
/// or a parameter is rejected, a device request fails, or output writing
/// fails.
pub fn run<W>(command: Command, out: &mut W, device_client: Box<dyn DeviceClient>) -> Result<()>
where
    W: io::Write,
{
    run_with_log_level(command, out, device_client, None, OutputFormat::Pretty)
}

/// Runs one invocation with explicit telemetry and output settings.
///
/// ```
/// use clap::Parser;
///
/// let args = umbctl::Args::try_parse_from([
///     "umbctl",
///     "--log-level",
///     "debug",
///     "--output-format",
///     "json",
///     "--fake",
///     "umb0",
/// ])?;
/// let log_level = args.log_level();
/// let output_format = args.output_format();
/// let (command, maybe_fake_args) = args.into_command_and_fake_args();
/// let device_client = match maybe_fake_args {
///     Some(fake_args) => umbctl::fake_device_client(fake_args),
///     None => umbctl::real_device_client(),
/// };
/// let mut out = Vec::new();
/// umbctl::run_with_log_level(command, &mut out, device_client, log_level, output_format)?;
/// let report: serde_json::Value = serde_json::from_slice(&out)?;
/// assert_eq!("umb0", report["interface"]);
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// # Errors
///
/// See [`run`].
#[instrument(
    skip(command, out, device_client),
    level = "info",
    fields(interface = %command.interface(), ?log_level, ?output_format)
)]
pub fn run_with_log_level<W>(
    command: Command,
    out: &mut W,
    device_client: Box<dyn DeviceClient>,
    log_level: Option<LogLevel>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing("umbctl", true, log_level.map(LogLevel::as_level_filter))?;

    let channel = device_client.open(command.interface())?;
    let outcome = sequence(&command, channel.as_ref());
    let closed = channel.close();
    let outcome = outcome.map_err(|error| name_interface(error, command.interface()))?;
    closed?;

    if let Some(pushed) = outcome.pushed() {
        debug!(?pushed, "parameters pushed");
    }
    if let Some(info) = outcome.info() {
        report::write(out, info, output_format)?;
    }
    Ok(())
}

fn sequence(command: &Command, channel: &dyn DeviceChannel) -> Result<SequenceOutcome, UmbctlError> {
    let mut sequencer = CommandSequencer::new(channel);
    let Some(path) = command.config_file() else {
        return sequencer.run(command.assignments(), command.verbose());
    };

    let origin = path.display().to_string();
    let file = File::open(path).map_err(|source| ConfigSourceError::Open {
        origin: origin.clone(),
        source,
    })?;
    sequencer.run_batch(
        BufReader::new(file),
        &origin,
        command.batch_policy(),
        command.assignments(),
        command.verbose(),
    )
}

/// Prefixes a rejected value with the interface it was meant for.
fn name_interface(error: UmbctlError, interface: &InterfaceName) -> anyhow::Error {
    match error {
        UmbctlError::Field(FieldError::TooLong { .. }) => {
            anyhow::Error::from(error).context(interface.to_string())
        }
        error => error.into(),
    }
}
