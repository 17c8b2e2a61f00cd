//! Read-modify-write cycle against one device channel, and the
//! configuration-file fold that feeds it.

use std::io::BufRead;

use strum_macros::Display;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::device::DeviceChannel;
use crate::error::{ConfigSourceError, UmbctlError};
use crate::mbim::{Assignment, FieldError, InfoReport, ParameterRecord, apply_sequence};

/// Progress of one [`CommandSequencer::run`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SequencerState {
    Idle,
    Fetching,
    Mutating,
    Pushing,
    FetchingInfo,
    Done,
    Failed,
}

/// What to do with the record folded from a configuration file.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum BatchPolicy {
    /// Validate the file, then drop the folded record.
    #[default]
    Discard,
    /// Apply the file's assignments before the positional ones.
    Apply,
}

/// Result of a completed sequence.
#[derive(Debug, Clone)]
pub struct SequenceOutcome {
    pushed: Option<ParameterRecord>,
    info: Option<InfoReport>,
}

impl SequenceOutcome {
    /// Record written to the device, if any assignment was given.
    #[must_use]
    pub fn pushed(&self) -> Option<&ParameterRecord> {
        self.pushed.as_ref()
    }

    /// Status report, when one was requested.
    #[must_use]
    pub fn info(&self) -> Option<&InfoReport> {
        self.info.as_ref()
    }
}

/// Drives the fetch, mutate, push and report steps over one channel.
#[derive(Debug)]
pub struct CommandSequencer<'c> {
    channel: &'c dyn DeviceChannel,
    state: SequencerState,
}

impl<'c> CommandSequencer<'c> {
    /// Creates an idle sequencer over `channel`.
    #[must_use]
    pub fn new(channel: &'c dyn DeviceChannel) -> Self {
        Self {
            channel,
            state: SequencerState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Runs one single-shot sequence.
    ///
    /// Parameters are fetched, mutated and pushed only when `assignments` is
    /// not empty. The status snapshot is read when there were no assignments
    /// or `verbose` is set. A failing assignment aborts before anything is
    /// pushed.
    ///
    /// # Errors
    ///
    /// Returns the first transport or field error; the sequencer is then
    /// [`SequencerState::Failed`].
    #[instrument(
        skip(self, assignments),
        fields(interface = %self.channel.interface(), count = assignments.len())
    )]
    pub fn run(
        &mut self,
        assignments: &[Assignment],
        verbose: bool,
    ) -> Result<SequenceOutcome, UmbctlError> {
        let result = self.run_steps(assignments, verbose);
        match &result {
            Ok(_) => self.transition(SequencerState::Done),
            Err(error) => {
                debug!(%error, "sequence failed");
                self.transition(SequencerState::Failed);
            }
        }
        result
    }

    /// Folds a configuration source, then runs the single-shot sequence
    /// according to `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`UmbctlError::ConfigSource`] when the source cannot be read
    /// or one of its lines fails; nothing is pushed in that case. Otherwise
    /// see [`CommandSequencer::run`].
    #[instrument(skip(self, source, positional), fields(count = positional.len()))]
    pub fn run_batch<R: BufRead>(
        &mut self,
        source: R,
        origin: &str,
        policy: BatchPolicy,
        positional: &[Assignment],
        verbose: bool,
    ) -> Result<SequenceOutcome, UmbctlError> {
        let batch = match fold_config(source, origin) {
            Ok(batch) => batch,
            Err(error) => {
                debug!(
                    folded = error.partial().assignments().len(),
                    "configuration rejected"
                );
                self.transition(SequencerState::Failed);
                return Err(error.into_error().into());
            }
        };

        match policy {
            BatchPolicy::Discard => {
                info!(
                    lines = batch.assignments().len(),
                    "configuration validated, folded record discarded"
                );
                self.run(positional, verbose)
            }
            BatchPolicy::Apply => {
                let mut assignments = batch.into_assignments();
                assignments.extend_from_slice(positional);
                self.run(&assignments, verbose)
            }
        }
    }

    fn run_steps(
        &mut self,
        assignments: &[Assignment],
        verbose: bool,
    ) -> Result<SequenceOutcome, UmbctlError> {
        let mut pushed = None;
        if !assignments.is_empty() {
            self.transition(SequencerState::Fetching);
            let mut record = self.channel.fetch_parameters()?;

            self.transition(SequencerState::Mutating);
            apply_sequence(&mut record, assignments)?;

            self.transition(SequencerState::Pushing);
            self.channel.push_parameters(&record)?;
            pushed = Some(record);
        }

        let mut info = None;
        if assignments.is_empty() || verbose {
            self.transition(SequencerState::FetchingInfo);
            let record = self.channel.fetch_info()?;
            info = Some(InfoReport::from_record(
                self.channel.interface().as_str(),
                &record,
            ));
        }

        Ok(SequenceOutcome { pushed, info })
    }

    fn transition(&mut self, next: SequencerState) {
        debug!(from = %self.state, to = %next, "sequencer transition");
        self.state = next;
    }
}

/// Assignments folded from a configuration source onto one record.
#[derive(Debug, Clone, Default)]
pub struct ConfigBatch {
    record: ParameterRecord,
    assignments: Vec<Assignment>,
}

impl ConfigBatch {
    /// Creates an empty batch over a zeroed record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record with every folded assignment applied.
    #[must_use]
    pub fn record(&self) -> &ParameterRecord {
        &self.record
    }

    /// Folded assignments, in source order.
    #[must_use]
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Consumes the batch and returns its assignments.
    #[must_use]
    pub fn into_assignments(self) -> Vec<Assignment> {
        self.assignments
    }

    /// Applies one assignment; on error the batch is unchanged.
    ///
    /// # Errors
    ///
    /// Returns the [`FieldError`] raised by the record.
    pub fn fold(&mut self, assignment: Assignment) -> Result<(), FieldError> {
        self.record.apply(&assignment)?;
        self.assignments.push(assignment);
        Ok(())
    }
}

/// A rejected configuration source, with everything folded before the failure.
#[derive(Debug, Error)]
#[error("configuration rejected")]
pub struct BatchError {
    #[source]
    error: ConfigSourceError,
    partial: ConfigBatch,
}

impl BatchError {
    /// The failure.
    #[must_use]
    pub fn error(&self) -> &ConfigSourceError {
        &self.error
    }

    /// Lines folded before the failure.
    #[must_use]
    pub fn partial(&self) -> &ConfigBatch {
        &self.partial
    }

    /// Discards the partial batch.
    #[must_use]
    pub fn into_error(self) -> ConfigSourceError {
        self.error
    }
}

/// Folds configuration lines onto one zeroed record.
///
/// Lines starting with `#` and blank lines are skipped. Each other line is
/// split on whitespace into a name, a value and an ignored third token.
/// The first failing line stops the fold.
///
/// ```
/// use umbctl::sequencer::fold_config;
///
/// let source = "# provider\napn internet\n\nusername bob\n";
/// let batch = fold_config(source.as_bytes(), "modem.conf")?;
/// assert_eq!(2, batch.assignments().len());
/// assert_eq!("internet", batch.record().apn());
/// # Ok::<(), umbctl::sequencer::BatchError>(())
/// ```
///
/// # Errors
///
/// Returns a [`BatchError`] carrying [`ConfigSourceError::Read`] or
/// [`ConfigSourceError::Line`] and the lines folded before it.
#[instrument(skip(source), level = "debug")]
pub fn fold_config<R: BufRead>(source: R, origin: &str) -> Result<ConfigBatch, BatchError> {
    let mut batch = ConfigBatch::new();

    for (index, line) in source.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(source) => {
                return Err(BatchError {
                    error: ConfigSourceError::Read {
                        origin: origin.to_owned(),
                        source,
                    },
                    partial: batch,
                });
            }
        };
        if line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            continue;
        };
        let assignment = Assignment::from_parts(name, tokens.next());

        if let Err(source) = batch.fold(assignment) {
            return Err(BatchError {
                error: ConfigSourceError::Line {
                    origin: origin.to_owned(),
                    line: index + 1,
                    source,
                },
                partial: batch,
            });
        }
    }

    debug!(count = batch.assignments.len(), "configuration folded");
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::device::{
        ControlRequest, DeviceClient, FakeDeviceClient, FakeDeviceConfig, FakeDeviceHandle,
        FakeFailure, InterfaceName,
    };
    use crate::error::TransportError;
    use crate::mbim::{FieldError, ParameterField};

    fn open(config: FakeDeviceConfig) -> (Box<dyn DeviceChannel>, FakeDeviceHandle) {
        let client = FakeDeviceClient::new(config);
        let handle = client.handle();
        let interface: InterfaceName = "umb0".parse().expect("test interface name should be valid");
        let channel = Box::new(client)
            .open(&interface)
            .expect("fake channel should open");
        (channel, handle)
    }

    #[test]
    fn no_assignments_only_reads_info() {
        let (channel, handle) = open(FakeDeviceConfig::default());
        let mut sequencer = CommandSequencer::new(channel.as_ref());

        let outcome = sequencer.run(&[], false).expect("sequence should succeed");

        assert_eq!(SequencerState::Done, sequencer.state());
        assert!(outcome.pushed().is_none());
        assert_eq!(Some("umb0"), outcome.info().map(InfoReport::interface));
        assert_eq!(vec![ControlRequest::GetInfo], handle.requests());
    }

    #[rstest]
    #[case(false, vec![ControlRequest::GetParameters, ControlRequest::SetParameters])]
    #[case(true, vec![
        ControlRequest::GetParameters,
        ControlRequest::SetParameters,
        ControlRequest::GetInfo,
    ])]
    fn assignments_fetch_mutate_and_push(
        #[case] verbose: bool,
        #[case] expected: Vec<ControlRequest>,
    ) {
        let (channel, handle) = open(FakeDeviceConfig::default());
        let mut sequencer = CommandSequencer::new(channel.as_ref());

        let outcome = sequencer
            .run(&[Assignment::new("apn", "internet.example")], verbose)
            .expect("sequence should succeed");

        assert_eq!(expected, handle.requests());
        assert_eq!(verbose, outcome.info().is_some());
        assert_eq!(
            Some("internet.example".to_owned()),
            outcome.pushed().map(ParameterRecord::apn)
        );
    }

    #[test]
    fn mutation_keeps_fetched_fields() {
        let params = "username=alice".parse().expect("fixture should parse");
        let (channel, handle) = open(FakeDeviceConfig::builder().params(params).build());
        let mut sequencer = CommandSequencer::new(channel.as_ref());

        sequencer
            .run(&[Assignment::new("apn", "internet")], false)
            .expect("sequence should succeed");

        let current = handle.current_parameters();
        assert_eq!("alice", current.username());
        assert_eq!("internet", current.apn());
    }

    #[test]
    fn failed_mutation_pushes_nothing() {
        let (channel, handle) = open(FakeDeviceConfig::default());
        let mut sequencer = CommandSequencer::new(channel.as_ref());

        let result = sequencer.run(
            &[
                Assignment::new("apn", "internet"),
                Assignment::new("pin", "1".repeat(17)),
            ],
            true,
        );

        assert_matches!(
            result,
            Err(UmbctlError::Field(FieldError::TooLong {
                field: ParameterField::Pin
            }))
        );
        assert_eq!(SequencerState::Failed, sequencer.state());
        assert_eq!(vec![ControlRequest::GetParameters], handle.requests());
        assert!(handle.pushed_parameters().is_empty());
    }

    #[test]
    fn absent_device_fails_sequence() {
        let (channel, _handle) = open(
            FakeDeviceConfig::builder()
                .failure(FakeFailure::Absent)
                .build(),
        );
        let mut sequencer = CommandSequencer::new(channel.as_ref());

        assert_matches!(
            sequencer.run(&[], false),
            Err(UmbctlError::Transport(TransportError::DeviceAbsent { .. }))
        );
        assert_eq!(SequencerState::Failed, sequencer.state());
    }

    #[test]
    fn fold_skips_comments_and_blank_lines() {
        let source = "# carrier settings\n\napn internet\n   \npassword s3cret extra\n";
        let batch = fold_config(source.as_bytes(), "modem.conf").expect("config should fold");

        assert_eq!(
            vec![
                Assignment::new("apn", "internet"),
                Assignment::new("password", "s3cret"),
            ],
            batch.assignments()
        );
        assert_eq!("s3cret", batch.record().password());
    }

    #[test]
    fn fold_reports_failing_line_with_partial_batch() {
        let source = "apn internet\n# comment\npin\nusername bob\n";
        let error = fold_config(source.as_bytes(), "modem.conf").expect_err("fold should fail");

        assert_matches!(
            error.error(),
            ConfigSourceError::Line {
                line: 3,
                source: FieldError::UnknownOrIncomplete { .. },
                ..
            }
        );
        assert_eq!(1, error.partial().assignments().len());
        assert_eq!("internet", error.partial().record().apn());
        assert_eq!(
            "modem.conf:3: pin: unknown or incomplete parameter",
            format!("{:#}", anyhow::Error::from(error.into_error()))
        );
    }

    #[test]
    fn fold_rejects_overlong_apn() {
        let source = format!("apn {}\n", "a".repeat(101));
        let error = fold_config(source.as_bytes(), "modem.conf").expect_err("fold should fail");

        assert_matches!(
            error.error(),
            ConfigSourceError::Line {
                line: 1,
                source: FieldError::TooLong {
                    field: ParameterField::Apn
                },
                ..
            }
        );
        assert_eq!(0, error.partial().record().encoded_len(ParameterField::Apn));
    }

    struct BrokenSource;

    impl Read for BrokenSource {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn fold_reports_read_failures() {
        let error = fold_config(io::BufReader::new(BrokenSource), "modem.conf")
            .expect_err("fold should fail");
        assert_matches!(error.error(), ConfigSourceError::Read { .. });
    }

    #[test]
    fn discard_policy_runs_positional_only() {
        let (channel, handle) = open(FakeDeviceConfig::default());
        let mut sequencer = CommandSequencer::new(channel.as_ref());

        let outcome = sequencer
            .run_batch(
                "apn from-file\n".as_bytes(),
                "modem.conf",
                BatchPolicy::Discard,
                &[],
                false,
            )
            .expect("batch should succeed");

        assert!(outcome.pushed().is_none());
        assert_eq!(vec![ControlRequest::GetInfo], handle.requests());
    }

    #[test]
    fn apply_policy_pushes_file_then_positional() {
        let (channel, handle) = open(FakeDeviceConfig::default());
        let mut sequencer = CommandSequencer::new(channel.as_ref());

        sequencer
            .run_batch(
                "apn from-file\nusername bob\n".as_bytes(),
                "modem.conf",
                BatchPolicy::Apply,
                &[Assignment::new("apn", "from-args")],
                false,
            )
            .expect("batch should succeed");

        let current = handle.current_parameters();
        assert_eq!("from-args", current.apn());
        assert_eq!("bob", current.username());
    }

    #[test]
    fn rejected_config_contacts_no_device() {
        let (channel, handle) = open(FakeDeviceConfig::default());
        let mut sequencer = CommandSequencer::new(channel.as_ref());

        let result = sequencer.run_batch(
            "bogus value\n".as_bytes(),
            "modem.conf",
            BatchPolicy::Apply,
            &[],
            false,
        );

        assert_matches!(
            result,
            Err(UmbctlError::ConfigSource(ConfigSourceError::Line { line: 1, .. }))
        );
        assert!(handle.requests().is_empty());
    }
}
