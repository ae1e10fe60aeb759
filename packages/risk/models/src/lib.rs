#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Risk level taxonomy and status indicator definitions.
//!
//! This crate defines the canonical risk levels used to color observation
//! markers, the fixed option sets of the four status indicator families,
//! and the hex color validation shared by the form and map layers.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Fill color used when no risk level, explicit color, or color column
/// resolves to a valid hex value.
pub const DEFAULT_COLOR: &str = "#3388ff";

/// Risk level assigned to an observation ("Level Resiko").
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum RiskLevel {
    /// Lowest tier, rendered dark grey.
    Lower,
    /// Rendered green.
    Low,
    /// Rendered yellow.
    Medium,
    /// Rendered orange.
    High,
    /// Rendered dark red.
    Emergency,
}

impl RiskLevel {
    /// Returns the display color for this level.
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Lower => "#3d3d3d",
            Self::Low => "#7db86a",
            Self::Medium => "#f2e804",
            Self::High => "#ffaa00",
            Self::Emergency => "#b10202",
        }
    }

    /// Returns all variants in ascending order of severity.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Lower,
            Self::Low,
            Self::Medium,
            Self::High,
            Self::Emergency,
        ]
    }

    /// Parses a free-form label, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        label.trim().parse().ok()
    }
}

/// Maps a risk-level label to its display color.
///
/// Lookup is case-insensitive and whitespace-trimmed. Empty or unrecognized
/// labels return `default`. This never fails.
#[must_use]
pub fn risk_to_color_hex<'a>(label: &str, default: &'a str) -> &'a str {
    RiskLevel::from_label(label).map_or(default, |level| level.hex())
}

/// Suggested level options, in the order they are offered to the user.
#[must_use]
pub fn level_options() -> Vec<String> {
    RiskLevel::all().iter().map(ToString::to_string).collect()
}

/// Returns `true` if `value` is `#` followed by exactly 3 or 6 hex digits
/// (surrounding whitespace is ignored).
#[must_use]
pub fn is_valid_hex(value: &str) -> bool {
    let Some(digits) = value.trim().strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// The four status indicator families recognized by column name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IndicatorFamily {
    /// Letter process status ("Indikator Surat"). Drives marker shape.
    Surat,
    /// Cable wrapping remediation status ("Indikator Bungkus"). Drives
    /// marker border color.
    Bungkus,
    /// PFK process status ("Indikator PFK").
    Pfk,
    /// Self-initiated construction change status.
    PerubahanKonstruksi,
}

impl IndicatorFamily {
    /// Returns all variants in column-matching order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Surat,
            Self::Bungkus,
            Self::Pfk,
            Self::PerubahanKonstruksi,
        ]
    }

    /// Lowercase keyword a column name must contain to belong to this
    /// family.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Surat => "indikator surat",
            Self::Bungkus => "indikator bungkus",
            Self::Pfk => "indikator pfk",
            Self::PerubahanKonstruksi => "perubahan konstruksi mandiri",
        }
    }

    /// The fixed, closed option set for this family.
    #[must_use]
    pub const fn default_options(self) -> &'static [&'static str] {
        match self {
            Self::Surat => &["Surat Himbauan", "Selesai Surat Ke Muspika"],
            Self::Bungkus => &[
                "Pengiriman Usulan Pembungkusan Kabel",
                "Realisasi pembungkusan",
                "Belum ada Tindak lanjut Bungkus",
            ],
            Self::Pfk => &[
                "Realisasi PFK",
                "Terima Permohonan PFK",
                "Kirim AMS PFK Up3",
                "Terbit Register PFK",
                "Tidak mau bayar PFK",
                "Belum ada Tindak Lanjut PFK",
            ],
            Self::PerubahanKonstruksi => &[
                "Usulan Rubah Konstruksi",
                "Belum Rubah Konstruksi",
                "Realisasi Rubah Kons",
            ],
        }
    }

    /// Finds the family whose keyword appears in `column_name`
    /// (case-insensitive), checking families in [`Self::all`] order.
    #[must_use]
    pub fn from_column_name(column_name: &str) -> Option<Self> {
        let lower = column_name.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|family| lower.contains(family.keyword()))
    }
}

/// Base options offered for feeder ("penyulang") columns.
pub const FEEDER_OPTIONS: &[&str] = &["Dinoyo", "Matos"];
