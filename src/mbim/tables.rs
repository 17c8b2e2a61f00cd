//! Ordered code-to-label tables for the enumerated fields of the info record.

use std::fmt;

use tracing::debug;

/// Label used when a code has no table entry.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Internal driver states (`enum umb_state`).
pub mod state {
    pub const DOWN: i32 = 0;
    pub const OPEN: i32 = 1;
    pub const CID: i32 = 2;
    pub const RADIO: i32 = 3;
    pub const SIM_READY: i32 = 4;
    pub const ATTACHED: i32 = 5;
    pub const CONNECTED: i32 = 6;
    pub const UP: i32 = 7;
}

/// Network registration modes.
pub mod regmode {
    pub const UNKNOWN: i32 = 0;
    pub const AUTOMATIC: i32 = 1;
    pub const MANUAL: i32 = 2;
}

/// Network registration states.
pub mod regstate {
    pub const UNKNOWN: i32 = 0;
    pub const DEREGISTERED: i32 = 1;
    pub const SEARCHING: i32 = 2;
    pub const HOME: i32 = 3;
    pub const ROAMING: i32 = 4;
    pub const PARTNER: i32 = 5;
    pub const DENIED: i32 = 6;
}

/// Data class bits.
pub mod dataclass {
    pub const NONE: u32 = 0x0000_0000;
    pub const GPRS: u32 = 0x0000_0001;
    pub const EDGE: u32 = 0x0000_0002;
    pub const UMTS: u32 = 0x0000_0004;
    pub const HSDPA: u32 = 0x0000_0008;
    pub const HSUPA: u32 = 0x0000_0010;
    pub const LTE: u32 = 0x0000_0020;
    pub const CDMA_1XRTT: u32 = 0x0001_0000;
    pub const CDMA_1XEVDO: u32 = 0x0002_0000;
    pub const CDMA_1XEVDO_REV_A: u32 = 0x0004_0000;
    pub const CDMA_1XEVDV: u32 = 0x0008_0000;
    pub const CDMA_3XRTT: u32 = 0x0010_0000;
    pub const CDMA_1XEVDO_REV_B: u32 = 0x0020_0000;
    pub const UMB: u32 = 0x0040_0000;
    pub const CUSTOM: u32 = 0x8000_0000;
}

/// Bit-error-rate quality levels.
pub mod ber {
    pub const EXCELLENT: i32 = 0;
    pub const VERY_GOOD: i32 = 1;
    pub const GOOD: i32 = 2;
    pub const OK: i32 = 3;
    pub const MEDIUM: i32 = 4;
    pub const BAD: i32 = 5;
    pub const VERY_BAD: i32 = 6;
    pub const EXTREMELY_BAD: i32 = 7;
}

/// Immutable ordered list of `(code, label)` pairs.
///
/// Lookups scan in order and the first matching entry wins.
#[derive(Debug, Clone, Copy)]
pub struct DescriptionTable<T: 'static> {
    name: &'static str,
    entries: &'static [(T, &'static str)],
}

impl<T> DescriptionTable<T> {
    /// Creates a table over `entries`.
    #[must_use]
    pub const fn new(name: &'static str, entries: &'static [(T, &'static str)]) -> Self {
        Self { name, entries }
    }

    /// All entries in lookup order.
    #[must_use]
    pub const fn entries(&self) -> &'static [(T, &'static str)] {
        self.entries
    }
}

impl<T: Copy + PartialEq + fmt::Debug> DescriptionTable<T> {
    /// Returns the label of the first entry matching `code`.
    #[must_use]
    pub fn lookup(&self, code: T) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(candidate, _label)| *candidate == code)
            .map(|(_code, label)| *label)
    }

    /// Returns the label for `code`, or `fallback` when no entry matches.
    ///
    /// ```
    /// use umbctl::mbim::tables::{REGISTRATION_STATE, UNKNOWN_LABEL};
    ///
    /// assert_eq!("home network", REGISTRATION_STATE.describe(3, UNKNOWN_LABEL));
    /// assert_eq!("unknown", REGISTRATION_STATE.describe(42, UNKNOWN_LABEL));
    /// ```
    #[must_use]
    pub fn describe(&self, code: T, fallback: &'static str) -> &'static str {
        self.lookup(code).unwrap_or_else(|| {
            debug!(table = self.name, ?code, fallback, "no label for code");
            fallback
        })
    }
}

pub const INTERNAL_STATE: DescriptionTable<i32> = DescriptionTable::new(
    "state",
    &[
        (state::DOWN, "down"),
        (state::OPEN, "open"),
        (state::CID, "CID allocated"),
        (state::RADIO, "radio on"),
        (state::SIM_READY, "SIM is ready"),
        (state::ATTACHED, "attached"),
        (state::CONNECTED, "connected"),
        (state::UP, "up"),
    ],
);

pub const REGISTRATION_MODE: DescriptionTable<i32> = DescriptionTable::new(
    "registration mode",
    &[
        (regmode::UNKNOWN, "unknown"),
        (regmode::AUTOMATIC, "automatic"),
        (regmode::MANUAL, "manual"),
    ],
);

pub const REGISTRATION_STATE: DescriptionTable<i32> = DescriptionTable::new(
    "registration state",
    &[
        (regstate::UNKNOWN, "unknown"),
        (regstate::DEREGISTERED, "not registered"),
        (regstate::SEARCHING, "searching"),
        (regstate::HOME, "home network"),
        (regstate::ROAMING, "roaming network"),
        (regstate::PARTNER, "partner network"),
        (regstate::DENIED, "access denied"),
    ],
);

// Exact-value matches only; several CDMA bits share one label.
pub const DATA_CLASS: DescriptionTable<u32> = DescriptionTable::new(
    "data class",
    &[
        (dataclass::NONE, "none"),
        (dataclass::GPRS, "GPRS"),
        (dataclass::EDGE, "EDGE"),
        (dataclass::UMTS, "UMTS"),
        (dataclass::HSDPA, "HSDPA"),
        (dataclass::HSUPA, "HSUPA"),
        (dataclass::HSDPA | dataclass::HSUPA, "HSPA"),
        (dataclass::LTE, "LTE"),
        (dataclass::CDMA_1XRTT, "CDMA2000"),
        (dataclass::CDMA_1XEVDO, "CDMA2000"),
        (dataclass::CDMA_1XEVDO_REV_A, "CDMA2000"),
        (dataclass::CDMA_1XEVDV, "CDMA2000"),
        (dataclass::CDMA_3XRTT, "CDMA2000"),
        (dataclass::CDMA_1XEVDO_REV_B, "CDMA2000"),
        (dataclass::UMB, "CDMA2000"),
        (dataclass::CUSTOM, "custom"),
    ],
);

pub const BIT_ERROR_RATE: DescriptionTable<i32> = DescriptionTable::new(
    "signal",
    &[
        (ber::EXCELLENT, "excellent"),
        (ber::VERY_GOOD, "very good"),
        (ber::GOOD, "good"),
        (ber::OK, "ok"),
        (ber::MEDIUM, "medium"),
        (ber::BAD, "bad"),
        (ber::VERY_BAD, "very bad"),
        (ber::EXTREMELY_BAD, "extremely bad"),
    ],
);
