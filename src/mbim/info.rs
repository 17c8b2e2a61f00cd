use std::fmt;

use serde::Serialize;

use super::param::{UMB_APN_MAXLEN, UMB_PASSWORD_MAXLEN, UMB_USERNAME_MAXLEN, mask};
use super::tables::{
    BIT_ERROR_RATE, DATA_CLASS, DescriptionTable, INTERNAL_STATE, REGISTRATION_MODE,
    REGISTRATION_STATE, UNKNOWN_LABEL,
};
use super::text::{Utf16Field, Utf16Text};

pub const UMB_PROVIDERNAME_MAXLEN: usize = 20;
pub const UMB_PROVIDERID_MAXLEN: usize = 20;
pub const UMB_PHONENR_MAXLEN: usize = 22;
pub const UMB_SUBSCRIBERID_MAXLEN: usize = 15;
pub const UMB_ICCID_MAXLEN: usize = 20;
pub const UMB_ROAMINGTEXT_MAXLEN: usize = 63;
pub const UMB_DEVID_MAXLEN: usize = 18;
pub const UMB_FWINFO_MAXLEN: usize = 30;
pub const UMB_HWINFO_MAXLEN: usize = 30;
pub const UMB_MAX_DNSSRV: usize = 2;

/// Read-only modem status snapshot reported by the driver (`struct umb_info`).
#[derive(Clone, Copy, Eq, PartialEq)]
#[repr(C)]
pub struct InfoRecord {
    pub(crate) state: i32,
    pub(crate) enable_roaming: i32,
    pub(crate) pin_state: i32,
    pub(crate) pin_attempts_left: i32,
    pub(crate) activation: i32,
    pub(crate) sim_state: i32,
    pub(crate) regstate: i32,
    pub(crate) regmode: i32,
    pub(crate) nwerror: i32,
    pub(crate) packetstate: i32,
    pub(crate) supported_classes: u32,
    pub(crate) preferred_classes: u32,
    pub(crate) highest_class: u32,
    pub(crate) cell_class: u32,
    pub(crate) provider: Utf16Text<UMB_PROVIDERNAME_MAXLEN>,
    pub(crate) provider_id: Utf16Text<UMB_PROVIDERID_MAXLEN>,
    pub(crate) phone_number: Utf16Text<UMB_PHONENR_MAXLEN>,
    pub(crate) subscriber_id: Utf16Text<UMB_SUBSCRIBERID_MAXLEN>,
    pub(crate) iccid: Utf16Text<UMB_ICCID_MAXLEN>,
    pub(crate) roaming_text: Utf16Text<UMB_ROAMINGTEXT_MAXLEN>,
    pub(crate) device_id: Utf16Text<UMB_DEVID_MAXLEN>,
    pub(crate) firmware_info: Utf16Text<UMB_FWINFO_MAXLEN>,
    pub(crate) hardware_info: Utf16Text<UMB_HWINFO_MAXLEN>,
    pub(crate) apn: Utf16Field<UMB_APN_MAXLEN>,
    pub(crate) username: Utf16Field<UMB_USERNAME_MAXLEN>,
    pub(crate) password: Utf16Field<UMB_PASSWORD_MAXLEN>,
    pub(crate) rssi: i32,
    pub(crate) ber: i32,
    pub(crate) hw_radio_on: i32,
    pub(crate) sw_radio_on: i32,
    pub(crate) uplink_speed: u64,
    pub(crate) downlink_speed: u64,
    pub(crate) ipv4_dns: [u32; UMB_MAX_DNSSRV],
}

impl InfoRecord {
    /// Creates an all-zero record.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            state: 0,
            enable_roaming: 0,
            pin_state: 0,
            pin_attempts_left: 0,
            activation: 0,
            sim_state: 0,
            regstate: 0,
            regmode: 0,
            nwerror: 0,
            packetstate: 0,
            supported_classes: 0,
            preferred_classes: 0,
            highest_class: 0,
            cell_class: 0,
            provider: Utf16Text::zeroed(),
            provider_id: Utf16Text::zeroed(),
            phone_number: Utf16Text::zeroed(),
            subscriber_id: Utf16Text::zeroed(),
            iccid: Utf16Text::zeroed(),
            roaming_text: Utf16Text::zeroed(),
            device_id: Utf16Text::zeroed(),
            firmware_info: Utf16Text::zeroed(),
            hardware_info: Utf16Text::zeroed(),
            apn: Utf16Field::zeroed(),
            username: Utf16Field::zeroed(),
            password: Utf16Field::zeroed(),
            rssi: 0,
            ber: 0,
            hw_radio_on: 0,
            sw_radio_on: 0,
            uplink_speed: 0,
            downlink_speed: 0,
            ipv4_dns: [0; UMB_MAX_DNSSRV],
        }
    }

    /// Internal driver state code.
    #[must_use]
    pub fn state(&self) -> i32 {
        self.state
    }

    /// Registration state code.
    #[must_use]
    pub fn registration_state(&self) -> i32 {
        self.regstate
    }

    /// Whether the driver allows roaming.
    #[must_use]
    pub fn roaming_allowed(&self) -> bool {
        self.enable_roaming != 0
    }

    /// Current uplink rate in bits per second.
    #[must_use]
    pub fn uplink_speed(&self) -> u64 {
        self.uplink_speed
    }

    /// Current downlink rate in bits per second.
    #[must_use]
    pub fn downlink_speed(&self) -> u64 {
        self.downlink_speed
    }
}

impl Default for InfoRecord {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl fmt::Debug for InfoRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfoRecord")
            .field("state", &self.state)
            .field("enable_roaming", &self.enable_roaming)
            .field("pin_state", &self.pin_state)
            .field("pin_attempts_left", &self.pin_attempts_left)
            .field("activation", &self.activation)
            .field("sim_state", &self.sim_state)
            .field("regstate", &self.regstate)
            .field("regmode", &self.regmode)
            .field("nwerror", &self.nwerror)
            .field("packetstate", &self.packetstate)
            .field("supported_classes", &self.supported_classes)
            .field("preferred_classes", &self.preferred_classes)
            .field("highest_class", &self.highest_class)
            .field("cell_class", &self.cell_class)
            .field("provider", &self.provider)
            .field("provider_id", &self.provider_id)
            .field("phone_number", &self.phone_number)
            .field("subscriber_id", &self.subscriber_id)
            .field("iccid", &self.iccid)
            .field("roaming_text", &self.roaming_text)
            .field("device_id", &self.device_id)
            .field("firmware_info", &self.firmware_info)
            .field("hardware_info", &self.hardware_info)
            .field("apn", &self.apn)
            .field("username", &self.username)
            .field("password", &mask(&self.password.decode()))
            .field("rssi", &self.rssi)
            .field("ber", &self.ber)
            .field("hw_radio_on", &self.hw_radio_on)
            .field("sw_radio_on", &self.sw_radio_on)
            .field("uplink_speed", &self.uplink_speed)
            .field("downlink_speed", &self.downlink_speed)
            .field("ipv4_dns", &self.ipv4_dns)
            .finish()
    }
}

/// An enumerated code together with its resolved label.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct Labelled<T> {
    code: T,
    label: &'static str,
}

impl<T: Copy + PartialEq + fmt::Debug> Labelled<T> {
    fn resolve(table: &DescriptionTable<T>, code: T) -> Self {
        Self {
            code,
            label: table.describe(code, UNKNOWN_LABEL),
        }
    }
}

impl<T> Labelled<T> {
    /// Resolved label, or the fallback label for unknown codes.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl<T: Copy> Labelled<T> {
    /// Raw code as reported by the driver.
    #[must_use]
    pub fn code(&self) -> T {
        self.code
    }
}

/// Decoded, display-ready view of an [`InfoRecord`].
///
/// `Display` renders the fixed five-line status report.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct InfoReport {
    interface: String,
    state: Labelled<i32>,
    registration_mode: Labelled<i32>,
    registration_state: Labelled<i32>,
    provider: String,
    data_class: Labelled<u32>,
    signal: Labelled<i32>,
    phone_number: String,
    roaming_text: String,
    roaming_allowed: bool,
    apn: String,
    uplink_speed: u64,
    downlink_speed: u64,
    firmware: String,
    hardware: String,
}

impl InfoReport {
    /// Decodes every text field and resolves every enumerated code of `info`.
    ///
    /// ```
    /// use umbctl::mbim::{InfoRecord, InfoReport};
    ///
    /// let report = InfoReport::from_record("umb0", &InfoRecord::zeroed());
    /// assert_eq!("down", report.state().label());
    /// ```
    #[must_use]
    pub fn from_record(interface: impl Into<String>, info: &InfoRecord) -> Self {
        Self {
            interface: interface.into(),
            state: Labelled::resolve(&INTERNAL_STATE, info.state),
            registration_mode: Labelled::resolve(&REGISTRATION_MODE, info.regmode),
            registration_state: Labelled::resolve(&REGISTRATION_STATE, info.regstate),
            provider: info.provider.decode(),
            data_class: Labelled::resolve(&DATA_CLASS, info.cell_class),
            signal: Labelled::resolve(&BIT_ERROR_RATE, info.ber),
            phone_number: info.phone_number.decode(),
            roaming_text: info.roaming_text.decode(),
            roaming_allowed: info.roaming_allowed(),
            apn: info.apn.text().decode(),
            uplink_speed: info.uplink_speed,
            downlink_speed: info.downlink_speed,
            firmware: info.firmware_info.decode(),
            hardware: info.hardware_info.decode(),
        }
    }

    /// Interface the report was read from.
    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Internal driver state.
    #[must_use]
    pub fn state(&self) -> Labelled<i32> {
        self.state
    }

    /// Network registration state.
    #[must_use]
    pub fn registration_state(&self) -> Labelled<i32> {
        self.registration_state
    }

    /// Decoded provider name.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Decoded access point name.
    #[must_use]
    pub fn apn(&self) -> &str {
        &self.apn
    }
}

impl fmt::Display for InfoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: state {}, mode {}, registration {}",
            self.interface,
            self.state.label,
            self.registration_mode.label,
            self.registration_state.label
        )?;
        writeln!(
            f,
            "\tprovider \"{}\", dataclass {}, signal {}",
            self.provider, self.data_class.label, self.signal.label
        )?;
        writeln!(
            f,
            "\tphone number \"{}\", roaming \"{}\" ({})",
            self.phone_number,
            self.roaming_text,
            if self.roaming_allowed { "allowed" } else { "denied" }
        )?;
        writeln!(
            f,
            "\tAPN \"{}\", TX {}, RX {}",
            self.apn, self.uplink_speed, self.downlink_speed
        )?;
        write!(
            f,
            "\tfirmware \"{}\", hardware \"{}\"",
            self.firmware, self.hardware
        )
    }
}

/// Renders the status report for `info` as read from `interface`.
#[must_use]
pub fn render(interface: &str, info: &InfoRecord) -> String {
    InfoReport::from_record(interface, info).to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mbim::tables::{ber, dataclass, regmode, regstate, state};

    fn connected_info() -> InfoRecord {
        let mut info = InfoRecord::zeroed();
        info.state = state::UP;
        info.regmode = regmode::AUTOMATIC;
        info.regstate = regstate::HOME;
        info.cell_class = dataclass::LTE;
        info.ber = ber::GOOD;
        info.enable_roaming = 1;
        info.uplink_speed = 50_000_000;
        info.downlink_speed = 150_000_000;
        info.provider = Utf16Text::from_text("Example").expect("provider should fit");
        info.phone_number = Utf16Text::from_text("+15550100").expect("number should fit");
        info.roaming_text = Utf16Text::from_text("Welcome").expect("roaming text should fit");
        info.apn.set("internet").expect("APN should fit");
        info.firmware_info = Utf16Text::from_text("FW 1.2").expect("firmware should fit");
        info.hardware_info = Utf16Text::from_text("HW rev B").expect("hardware should fit");
        info
    }

    #[test]
    fn render_produces_fixed_report() {
        let expected = "umb0: state up, mode automatic, registration home network\n\
                        \tprovider \"Example\", dataclass LTE, signal good\n\
                        \tphone number \"+15550100\", roaming \"Welcome\" (allowed)\n\
                        \tAPN \"internet\", TX 50000000, RX 150000000\n\
                        \tfirmware \"FW 1.2\", hardware \"HW rev B\"";
        assert_eq!(expected, render("umb0", &connected_info()));
    }

    #[test]
    fn unknown_registration_state_renders_fallback_label() {
        let mut info = connected_info();
        info.regstate = 99;

        let rendered = render("umb0", &info);
        let first_line = rendered.lines().next().expect("report should have lines");
        assert_eq!(
            "umb0: state up, mode automatic, registration unknown",
            first_line
        );
        assert_eq!(99, InfoReport::from_record("umb0", &info).registration_state().code());
    }

    #[test]
    fn roaming_denied_when_disabled() {
        let mut info = connected_info();
        info.enable_roaming = 0;
        assert!(render("umb0", &info).contains("roaming \"Welcome\" (denied)"));
    }

    #[test]
    fn non_ascii_provider_renders_question_marks() {
        let mut info = connected_info();
        info.provider = Utf16Text::from_text("Télé2").expect("provider should fit");
        let report = InfoReport::from_record("umb0", &info);
        assert_eq!("T?l?2", report.provider());
    }

    #[test]
    fn text_fields_never_exceed_their_maximum() {
        let mut info = InfoRecord::zeroed();
        info.provider =
            Utf16Text::from_text(&"p".repeat(UMB_PROVIDERNAME_MAXLEN)).expect("exact fit");
        let report = InfoReport::from_record("umb0", &info);
        assert_eq!(UMB_PROVIDERNAME_MAXLEN, report.provider().len());
    }

    #[test]
    fn json_report_carries_codes_and_labels() {
        let report = InfoReport::from_record("umb0", &connected_info());
        let value = serde_json::to_value(&report).expect("report should serialise");

        assert_eq!(serde_json::json!({"code": 3, "label": "home network"}), value["registration_state"]);
        assert_eq!(serde_json::json!("internet"), value["apn"]);
    }

    #[test]
    fn debug_output_masks_password() {
        let mut info = connected_info();
        info.password.set("hunter2").expect("password should fit");
        let rendered = format!("{info:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("\"*******\""));
    }

    #[test]
    fn zeroed_record_renders_without_error() {
        insta::assert_snapshot!(
            render("umb1", &InfoRecord::zeroed()).lines().next().unwrap_or_default(),
            @"umb1: state down, mode unknown, registration unknown"
        );
    }
}
