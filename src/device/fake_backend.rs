use std::io;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bon::Builder;
use tracing::debug;

use super::client::{ControlRequest, DeviceChannel, DeviceClient, classify};
use super::interface::InterfaceName;
use crate::error::{FixtureError, TransportError};
use crate::mbim::tables::{ber, dataclass, regmode, regstate, state};
use crate::mbim::{
    Assignment, InfoRecord, ParameterRecord, Utf16Field, Utf16Text, apply_sequence,
};

/// Failure injected by the fake backend.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum FakeFailure {
    /// Every request succeeds.
    #[default]
    None,
    /// Requests fail as if the interface were not an MBIM device.
    Absent,
    /// Requests fail with a generic I/O error.
    Io,
}

/// Parsed status fixture, `key=value` entries separated by `;`.
///
/// Entries override a connected default record. Recognised keys: `state`,
/// `regmode`, `regstate`, `cellclass`, `ber`, `enable_roaming`, `tx`, `rx`
/// (numbers, `0x` prefix allowed) and `provider`, `pn`, `roaming`, `apn`,
/// `fw`, `hw` (text).
#[derive(Debug, Clone, Copy, derive_more::Into)]
pub struct InfoFixture {
    record: InfoRecord,
}

impl Default for InfoFixture {
    fn default() -> Self {
        Self {
            record: default_info(),
        }
    }
}

impl FromStr for InfoFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut record = default_info();
        for (key, raw) in fixture_entries(value)? {
            apply_info_entry(&mut record, key, raw)?;
        }
        Ok(Self { record })
    }
}

/// Parsed parameter fixture, `name=value` entries separated by `;`.
#[derive(Debug, Clone, Copy, Default, derive_more::Into)]
pub struct ParamsFixture {
    record: ParameterRecord,
}

impl FromStr for ParamsFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let assignments: Vec<Assignment> = fixture_entries(value)?
            .into_iter()
            .map(|(name, raw)| Assignment::from_parts(name, Some(raw)))
            .collect();
        let mut record = ParameterRecord::zeroed();
        apply_sequence(&mut record, &assignments)?;
        Ok(Self { record })
    }
}

/// Settings for constructing a fake device backend.
#[derive(Debug, Default, Builder)]
pub struct FakeDeviceConfig {
    info: Option<InfoFixture>,
    params: Option<ParamsFixture>,
    #[builder(default)]
    failure: FakeFailure,
    /// Restricts the injected failure to one request kind.
    fail_on: Option<ControlRequest>,
}

#[derive(Debug)]
struct FakeDeviceState {
    info: InfoRecord,
    params: ParameterRecord,
    failure: FakeFailure,
    fail_on: Option<ControlRequest>,
    requests: Vec<ControlRequest>,
    pushed: Vec<ParameterRecord>,
    closed: bool,
}

type SharedState = Arc<Mutex<FakeDeviceState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, FakeDeviceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fake device client used in tests and hardware-free runs.
#[derive(Debug)]
pub struct FakeDeviceClient {
    state: SharedState,
}

impl FakeDeviceClient {
    /// Creates a fake client from explicit settings.
    #[must_use]
    pub fn new(config: FakeDeviceConfig) -> Self {
        let FakeDeviceConfig {
            info,
            params,
            failure,
            fail_on,
        } = config;
        let state = FakeDeviceState {
            info: info.unwrap_or_default().into(),
            params: params.unwrap_or_default().into(),
            failure,
            fail_on,
            requests: Vec::new(),
            pushed: Vec::new(),
            closed: false,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Returns a handle for inspecting the device after the client is consumed.
    #[must_use]
    pub fn handle(&self) -> FakeDeviceHandle {
        FakeDeviceHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl DeviceClient for FakeDeviceClient {
    fn open(
        self: Box<Self>,
        interface: &InterfaceName,
    ) -> Result<Box<dyn DeviceChannel>, TransportError> {
        debug!(%interface, "opened fake control channel");
        Ok(Box::new(FakeChannel {
            state: self.state,
            interface: interface.clone(),
        }))
    }
}

/// Read-only view of a fake device's recorded traffic.
#[derive(Debug, Clone)]
pub struct FakeDeviceHandle {
    state: SharedState,
}

impl FakeDeviceHandle {
    /// Requests issued so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ControlRequest> {
        lock(&self.state).requests.clone()
    }

    /// Parameter records pushed so far, in order.
    #[must_use]
    pub fn pushed_parameters(&self) -> Vec<ParameterRecord> {
        lock(&self.state).pushed.clone()
    }

    /// Parameters the device currently holds.
    #[must_use]
    pub fn current_parameters(&self) -> ParameterRecord {
        lock(&self.state).params
    }

    /// Returns whether the channel was closed explicitly.
    #[must_use]
    pub fn closed(&self) -> bool {
        lock(&self.state).closed
    }
}

#[derive(Debug)]
struct FakeChannel {
    state: SharedState,
    interface: InterfaceName,
}

impl FakeChannel {
    fn record_request(
        &self,
        request: ControlRequest,
    ) -> Result<MutexGuard<'_, FakeDeviceState>, TransportError> {
        let mut state = lock(&self.state);
        state.requests.push(request);

        let targeted = state.fail_on.is_none_or(|target| target == request);
        let failure = state.failure;
        let errno = match failure {
            FakeFailure::None => return Ok(state),
            _ if !targeted => return Ok(state),
            FakeFailure::Absent => libc::ENXIO,
            FakeFailure::Io => libc::EIO,
        };
        Err(classify(
            self.interface.clone(),
            request,
            io::Error::from_raw_os_error(errno),
        ))
    }
}

impl DeviceChannel for FakeChannel {
    fn interface(&self) -> &InterfaceName {
        &self.interface
    }

    fn fetch_parameters(&self) -> Result<ParameterRecord, TransportError> {
        let state = self.record_request(ControlRequest::GetParameters)?;
        Ok(state.params)
    }

    fn push_parameters(&self, record: &ParameterRecord) -> Result<(), TransportError> {
        let mut state = self.record_request(ControlRequest::SetParameters)?;
        state.pushed.push(*record);
        state.params = *record;
        state.info.apn = *record.apn_field();
        state.info.username = *record.username_field();
        state.info.password = *record.password_field();
        Ok(())
    }

    fn fetch_info(&self) -> Result<InfoRecord, TransportError> {
        let state = self.record_request(ControlRequest::GetInfo)?;
        Ok(state.info)
    }

    fn close(self: Box<Self>) -> Result<(), TransportError> {
        lock(&self.state).closed = true;
        debug!(interface = %self.interface, "closed fake control channel");
        Ok(())
    }
}

fn default_info() -> InfoRecord {
    let mut info = InfoRecord::zeroed();
    info.state = state::UP;
    info.regmode = regmode::AUTOMATIC;
    info.regstate = regstate::HOME;
    info.cell_class = dataclass::LTE;
    info.ber = ber::GOOD;
    info.enable_roaming = 0;
    info.uplink_speed = 50_000_000;
    info.downlink_speed = 150_000_000;
    info.provider = Utf16Text::from_text("Fake Mobile").unwrap_or_default();
    info.apn = Utf16Field::from_text("internet").unwrap_or_default();
    info.firmware_info = Utf16Text::from_text("FAKE-FW 1.0").unwrap_or_default();
    info.hardware_info = Utf16Text::from_text("FAKE-HW").unwrap_or_default();
    info
}

fn fixture_entries(raw: &str) -> Result<Vec<(&str, &str)>, FixtureError> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(key, value)| (key.trim(), value.trim()))
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| FixtureError::InvalidEntry {
                    entry: entry.to_owned(),
                })
        })
        .collect()
}

fn apply_info_entry(record: &mut InfoRecord, key: &str, raw: &str) -> Result<(), FixtureError> {
    match key {
        "state" => record.state = parse_number(key, raw)?,
        "regmode" => record.regmode = parse_number(key, raw)?,
        "regstate" => record.regstate = parse_number(key, raw)?,
        "cellclass" => record.cell_class = parse_number(key, raw)?,
        "ber" => record.ber = parse_number(key, raw)?,
        "enable_roaming" => record.enable_roaming = parse_number(key, raw)?,
        "tx" => record.uplink_speed = parse_number(key, raw)?,
        "rx" => record.downlink_speed = parse_number(key, raw)?,
        "provider" => record.provider = parse_text(key, raw)?,
        "pn" => record.phone_number = parse_text(key, raw)?,
        "roaming" => record.roaming_text = parse_text(key, raw)?,
        "fw" => record.firmware_info = parse_text(key, raw)?,
        "hw" => record.hardware_info = parse_text(key, raw)?,
        "apn" => record
            .apn
            .set(raw)
            .map_err(|source| FixtureError::TextTooLong {
                key: key.to_owned(),
                source,
            })?,
        _ => {
            return Err(FixtureError::UnknownKey {
                key: key.to_owned(),
            });
        }
    }
    Ok(())
}

trait FixtureNumber: Sized {
    fn from_str_radix(raw: &str, radix: u32) -> Result<Self, std::num::ParseIntError>;
}

macro_rules! fixture_number {
    ($($ty:ty),*) => {
        $(impl FixtureNumber for $ty {
            fn from_str_radix(raw: &str, radix: u32) -> Result<Self, std::num::ParseIntError> {
                <$ty>::from_str_radix(raw, radix)
            }
        })*
    };
}

fixture_number!(i32, u32, u64);

fn parse_number<T: FixtureNumber>(key: &str, raw: &str) -> Result<T, FixtureError> {
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => T::from_str_radix(hex, 16),
        None => T::from_str_radix(raw, 10),
    };
    parsed.map_err(|source| FixtureError::InvalidNumber {
        key: key.to_owned(),
        source,
    })
}

fn parse_text<const N: usize>(key: &str, raw: &str) -> Result<Utf16Text<N>, FixtureError> {
    Utf16Text::from_text(raw).map_err(|source| FixtureError::TextTooLong {
        key: key.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::mbim::{FieldError, InfoReport, ParameterField};

    fn interface() -> InterfaceName {
        "umb0".parse().expect("test interface name should be valid")
    }

    fn open(config: FakeDeviceConfig) -> (Box<dyn DeviceChannel>, FakeDeviceHandle) {
        let client = FakeDeviceClient::new(config);
        let handle = client.handle();
        let channel = Box::new(client)
            .open(&interface())
            .expect("fake channel should open");
        (channel, handle)
    }

    #[test]
    fn default_info_reports_connected_modem() {
        let (channel, _handle) = open(FakeDeviceConfig::default());
        let info = channel.fetch_info().expect("info should be readable");
        let report = InfoReport::from_record("umb0", &info);
        assert_eq!("up", report.state().label());
        assert_eq!("home network", report.registration_state().label());
        assert_eq!("Fake Mobile", report.provider());
        assert_eq!("internet", report.apn());
    }

    #[test]
    fn default_info_text_fields_are_filled() {
        let info = default_info();
        assert_eq!("FAKE-FW 1.0", info.firmware_info.decode());
        assert_eq!("FAKE-HW", info.hardware_info.decode());
        assert_eq!(16, info.apn.len_bytes());
    }

    #[test]
    fn info_fixture_overrides_defaults() {
        let fixture: InfoFixture = "state=0x1; regstate=99; provider=Acme; tx=1000"
            .parse()
            .expect("fixture should parse");
        let record: InfoRecord = fixture.into();
        assert_eq!(1, record.state());
        assert_eq!(99, record.registration_state());
        assert_eq!(1000, record.uplink_speed());
        assert_eq!("Acme", record.provider.decode());
    }

    #[rstest]
    #[case("state")]
    #[case("=7")]
    #[case("state=7;;provider")]
    fn info_fixture_rejects_entries_without_key_value(#[case] fixture: &str) {
        assert_matches!(
            fixture.parse::<InfoFixture>(),
            Err(FixtureError::InvalidEntry { .. })
        );
    }

    #[test]
    fn info_fixture_rejects_unknown_keys_and_bad_numbers() {
        assert_matches!(
            "colour=blue".parse::<InfoFixture>(),
            Err(FixtureError::UnknownKey { key }) if key == "colour"
        );
        assert_matches!(
            "ber=lots".parse::<InfoFixture>(),
            Err(FixtureError::InvalidNumber { key, .. }) if key == "ber"
        );
    }

    #[test]
    fn info_fixture_rejects_text_that_does_not_fit() {
        let fixture = format!("provider={}", "p".repeat(21));
        assert_matches!(
            fixture.parse::<InfoFixture>(),
            Err(FixtureError::TextTooLong { .. })
        );
    }

    #[test]
    fn params_fixture_builds_record() {
        let fixture: ParamsFixture = "apn=internet;username=bob"
            .parse()
            .expect("fixture should parse");
        let record: ParameterRecord = fixture.into();
        assert_eq!("internet", record.apn());
        assert_eq!("bob", record.username());
    }

    #[test]
    fn params_fixture_reports_field_errors() {
        let fixture = format!("pin={}", "1".repeat(17));
        assert_matches!(
            fixture.parse::<ParamsFixture>(),
            Err(FixtureError::Parameter(FieldError::TooLong {
                field: ParameterField::Pin
            }))
        );
    }

    #[test]
    fn push_is_recorded_and_reflected_in_info() {
        let (channel, handle) = open(FakeDeviceConfig::default());
        let mut record = channel
            .fetch_parameters()
            .expect("parameters should be readable");
        record.set(ParameterField::Apn, "telco").expect("APN should fit");
        channel
            .push_parameters(&record)
            .expect("parameters should be accepted");
        let info = channel.fetch_info().expect("info should be readable");
        channel.close().expect("channel should close");

        assert_eq!(
            vec![
                ControlRequest::GetParameters,
                ControlRequest::SetParameters,
                ControlRequest::GetInfo,
            ],
            handle.requests()
        );
        assert_eq!(vec![record], handle.pushed_parameters());
        assert_eq!("telco", handle.current_parameters().apn());
        assert_eq!("telco", InfoReport::from_record("umb0", &info).apn());
        assert!(handle.closed());
    }

    #[test]
    fn absent_failure_maps_to_device_absent() {
        let (channel, handle) = open(
            FakeDeviceConfig::builder()
                .failure(FakeFailure::Absent)
                .build(),
        );
        assert_matches!(
            channel.fetch_info(),
            Err(TransportError::DeviceAbsent {
                request: ControlRequest::GetInfo,
                ..
            })
        );
        assert_eq!(vec![ControlRequest::GetInfo], handle.requests());
    }

    #[test]
    fn targeted_failure_only_hits_matching_request() {
        let (channel, handle) = open(
            FakeDeviceConfig::builder()
                .failure(FakeFailure::Io)
                .fail_on(ControlRequest::SetParameters)
                .build(),
        );
        let record = channel
            .fetch_parameters()
            .expect("parameters should be readable");
        assert_matches!(
            channel.push_parameters(&record),
            Err(TransportError::Io {
                request: ControlRequest::SetParameters,
                ..
            })
        );
        assert!(handle.pushed_parameters().is_empty());
    }
}
