use std::path::{Path, PathBuf};

use bon::Builder;
use clap::{ArgAction, Parser, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use crate::device::{
    FakeDeviceConfig, FakeFailure, InfoFixture, InterfaceName, ParamsFixture,
};
use crate::error::FixtureError;
use crate::mbim::Assignment;
use crate::sequencer::BatchPolicy;

const USAGE: &str = "umbctl [-v] ifname [parameter [value]] [...]\n       umbctl -f config-file ifname [...]";

/// Command-line options for the MBIM modem control tool.
#[derive(Debug, Parser)]
#[command(
    name = "umbctl",
    version,
    about = "Configure and inspect MBIM cellular modems.",
    override_usage = USAGE
)]
pub struct Args {
    /// Prints the status report after setting parameters.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Reads `parameter value` lines from a configuration file.
    #[arg(short = 'f', long = "config-file", value_name = "CONFIG_FILE")]
    config_file: Option<PathBuf>,
    /// Applies the configuration file's parameters instead of only validating them.
    #[arg(long, requires = "config_file")]
    apply_config: bool,
    /// Report format.
    #[arg(long, value_enum)]
    output_format: Option<OutputFormat>,
    /// Log verbosity; overrides `RUST_LOG`.
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
    /// Uses the fake MBIM backend instead of the kernel driver.
    #[arg(long, hide = true)]
    fake: bool,
    /// Fake status fixture in the form `key=value;...`.
    #[arg(long, hide = true, requires = "fake")]
    fake_info: Option<InfoFixture>,
    /// Fake parameter fixture in the form `name=value;...`.
    #[arg(long, hide = true, requires = "fake")]
    fake_params: Option<ParamsFixture>,
    /// Failure injected by the fake backend.
    #[arg(long, hide = true, requires = "fake", value_enum)]
    fake_failure: Option<FakeFailure>,
    /// Interface to control, such as `umb0`.
    #[arg(value_name = "IFNAME")]
    interface: InterfaceName,
    /// Parameters as `name value` or `name=value`: apn, username, password, pin, puk.
    #[arg(value_name = "PARAMETER", trailing_var_arg = true, allow_hyphen_values = true)]
    parameters: Vec<String>,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// let interface = "umb0".parse()?;
    /// let args = umbctl::Args::new(interface);
    /// let (command, fake_args) = args.into_command_and_fake_args();
    /// assert!(command.assignments().is_empty());
    /// assert!(fake_args.is_none());
    /// # Ok::<(), umbctl::device::InterfaceNameError>(())
    /// ```
    #[must_use]
    pub fn new(interface: InterfaceName) -> Self {
        Self {
            verbose: 0,
            config_file: None,
            apply_config: false,
            output_format: None,
            log_level: None,
            fake: false,
            fake_info: None,
            fake_params: None,
            fake_failure: None,
            interface,
            parameters: Vec::new(),
        }
    }

    /// Enables fake backend mode with pre-parsed fake configuration.
    #[must_use]
    pub fn with_fake(mut self, fake: FakeArgs) -> Self {
        let FakeArgs {
            info,
            params,
            failure,
        } = fake;

        self.fake = true;
        self.fake_info = info;
        self.fake_params = params;
        self.fake_failure = Some(failure);
        self
    }

    /// Appends positional parameter tokens.
    #[must_use]
    pub fn with_parameters<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Requested log level, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Requested report format; pretty text unless overridden.
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.unwrap_or_default()
    }

    /// Splits parsed CLI arguments into the command and optional fake-client settings.
    #[must_use]
    pub fn into_command_and_fake_args(self) -> (Command, Option<FakeArgs>) {
        let Args {
            verbose,
            config_file,
            apply_config,
            output_format: _,
            log_level: _,
            fake,
            fake_info,
            fake_params,
            fake_failure,
            interface,
            parameters,
        } = self;

        let batch_policy = if apply_config {
            BatchPolicy::Apply
        } else {
            BatchPolicy::Discard
        };
        let command = Command::builder()
            .interface(interface)
            .verbose(verbose > 0)
            .maybe_config_file(config_file)
            .batch_policy(batch_policy)
            .assignments(Assignment::from_args(parameters))
            .build();

        let fake_args = fake.then(|| FakeArgs {
            info: fake_info,
            params: fake_params,
            failure: fake_failure.unwrap_or_default(),
        });

        (command, fake_args)
    }
}

/// One resolved `umbctl` invocation.
#[derive(Debug, Clone, Builder)]
pub struct Command {
    interface: InterfaceName,
    #[builder(default)]
    verbose: bool,
    config_file: Option<PathBuf>,
    #[builder(default)]
    batch_policy: BatchPolicy,
    #[builder(default)]
    assignments: Vec<Assignment>,
}

impl Command {
    /// Interface the command addresses.
    #[must_use]
    pub fn interface(&self) -> &InterfaceName {
        &self.interface
    }

    /// Whether the status report follows a parameter update.
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Configuration file to fold before the positional parameters.
    #[must_use]
    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// What happens to the folded configuration record.
    #[must_use]
    pub fn batch_policy(&self) -> BatchPolicy {
        self.batch_policy
    }

    /// Positional parameter assignments, in order.
    #[must_use]
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }
}

/// Fake backend arguments for programmatic runs.
#[derive(Debug, Default, Builder)]
pub struct FakeArgs {
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    info: Option<InfoFixture>,
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    params: Option<ParamsFixture>,
    #[builder(default)]
    failure: FakeFailure,
}

impl FakeArgs {
    pub(crate) fn into_device_config(self) -> FakeDeviceConfig {
        let Self {
            info,
            params,
            failure,
        } = self;

        FakeDeviceConfig::builder()
            .maybe_info(info)
            .maybe_params(params)
            .failure(failure)
            .build()
    }
}

/// Report output formats.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// The fixed multi-line text report.
    #[default]
    Pretty,
    /// The report as a JSON document with codes and labels.
    Json,
}

/// Log verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Equivalent `tracing` level filter.
    #[must_use]
    pub fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn bare_interface_requests_info() {
        let (command, fake_args) = parse(&["umbctl", "umb0"]).into_command_and_fake_args();

        assert_eq!("umb0", command.interface().as_str());
        assert!(command.assignments().is_empty());
        assert!(!command.verbose());
        assert_eq!(BatchPolicy::Discard, command.batch_policy());
        assert_matches!(fake_args, None);
    }

    #[rstest]
    #[case(&["umbctl", "umb0", "apn", "internet", "pin", "1234"])]
    #[case(&["umbctl", "umb0", "apn=internet", "pin=1234"])]
    #[case(&["umbctl", "umb0", "apn", "internet", "pin=1234"])]
    fn positional_parameters_pair_up(#[case] args: &[&str]) {
        let (command, _fake_args) = parse(args).into_command_and_fake_args();
        assert_eq!(
            vec![
                Assignment::new("apn", "internet"),
                Assignment::new("pin", "1234"),
            ],
            command.assignments()
        );
    }

    #[test]
    fn hyphenated_values_are_parameters() {
        let (command, _fake_args) =
            parse(&["umbctl", "umb0", "password", "-secret-"]).into_command_and_fake_args();
        assert_eq!(Some("-secret-"), command.assignments()[0].value());
    }

    #[test]
    fn repeated_verbose_flag_counts() {
        let (command, _fake_args) =
            parse(&["umbctl", "-vv", "umb0", "apn", "internet"]).into_command_and_fake_args();
        assert!(command.verbose());
    }

    #[test]
    fn config_file_with_apply_selects_apply_policy() {
        let (command, _fake_args) = parse(&[
            "umbctl",
            "-f",
            "/etc/umb0.conf",
            "--apply-config",
            "umb0",
        ])
        .into_command_and_fake_args();

        assert_eq!(Some(Path::new("/etc/umb0.conf")), command.config_file());
        assert_eq!(BatchPolicy::Apply, command.batch_policy());
    }

    #[test]
    fn apply_config_requires_config_file() {
        let error = Args::try_parse_from(["umbctl", "--apply-config", "umb0"])
            .expect_err("--apply-config should require -f");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn interface_is_required() {
        let error = Args::try_parse_from(["umbctl", "-v"]).expect_err("ifname should be required");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn overlong_interface_is_rejected() {
        let error = Args::try_parse_from(["umbctl", "umb0123456789abcdef"])
            .expect_err("interface name should be validated");
        assert_eq!(ErrorKind::ValueValidation, error.kind());
    }

    #[test]
    fn fake_fixture_flags_require_fake_mode() {
        let error = Args::try_parse_from(["umbctl", "--fake-info", "state=7", "umb0"])
            .expect_err("fake fixture flags should require --fake");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn invalid_fake_fixture_is_rejected() {
        let error = Args::try_parse_from(["umbctl", "--fake", "--fake-info", "colour=blue", "umb0"])
            .expect_err("unknown fixture keys should fail parsing");
        assert_eq!(ErrorKind::ValueValidation, error.kind());
    }

    #[test]
    fn fake_mode_builds_fake_settings() {
        let args = parse(&[
            "umbctl",
            "--fake",
            "--fake-failure",
            "absent",
            "--output-format",
            "json",
            "--log-level",
            "debug",
            "umb0",
        ]);
        assert_eq!(OutputFormat::Json, args.output_format());
        assert_eq!(Some(LogLevel::Debug), args.log_level());

        let (_command, fake_args) = args.into_command_and_fake_args();
        let fake_args = fake_args.expect("fake mode should produce fake settings");
        assert_eq!(FakeFailure::Absent, fake_args.failure);
    }

    #[test]
    fn fake_args_builder_parses_fixtures() {
        let fake_args = FakeArgs::builder()
            .info("provider=Acme")
            .expect("info fixture should parse")
            .params("apn=internet")
            .expect("params fixture should parse")
            .build();
        let args = Args::new("umb0".parse().expect("test interface name should be valid"))
            .with_fake(fake_args)
            .with_parameters(["apn", "other"]);

        let (command, fake_args) = args.into_command_and_fake_args();
        assert_eq!(1, command.assignments().len());
        assert_matches!(fake_args, Some(FakeArgs { info: Some(_), params: Some(_), .. }));
    }

    #[test]
    fn log_levels_map_to_filters() {
        assert_eq!(LevelFilter::OFF, LogLevel::Off.as_level_filter());
        assert_eq!(LevelFilter::TRACE, LogLevel::Trace.as_level_filter());
    }
}
