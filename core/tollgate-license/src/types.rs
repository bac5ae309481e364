//! License types and feature sets.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// The kind of license (wire code in the LicenseType field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseType {
    Personal,
    Professional,
    Enterprise,
    /// Free for open-source projects; usually namespace-restricted.
    OpenSource,
    Community,
    /// Self-issued, time-boxed trial.
    Evaluation,
    /// Granted automatically on build servers.
    Unattended,
    /// The key names no type, or one this build does not know. Display only.
    Unknown,
}

impl LicenseType {
    /// Maps a wire code to a license type.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Personal),
            2 => Some(Self::Professional),
            3 => Some(Self::Enterprise),
            4 => Some(Self::OpenSource),
            5 => Some(Self::Community),
            6 => Some(Self::Evaluation),
            7 => Some(Self::Unattended),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Personal => 1,
            Self::Professional => 2,
            Self::Enterprise => 3,
            Self::OpenSource => 4,
            Self::Community => 5,
            Self::Evaluation => 6,
            Self::Unattended => 7,
            Self::Unknown => 0,
        }
    }

    /// Features granted when the key carries no explicit feature set.
    #[must_use]
    pub const fn default_features(self) -> LicensedFeatures {
        match self {
            Self::Community => LicensedFeatures::CORE,
            Self::Personal | Self::OpenSource => {
                LicensedFeatures(LicensedFeatures::CORE.0 | LicensedFeatures::FRAMEWORK.0)
            }
            Self::Professional => LicensedFeatures(
                LicensedFeatures::CORE.0
                    | LicensedFeatures::FRAMEWORK.0
                    | LicensedFeatures::ANALYSIS.0
                    | LicensedFeatures::CODE_FIX.0,
            ),
            Self::Enterprise | Self::Evaluation | Self::Unattended => LicensedFeatures::ALL,
            Self::Unknown => LicensedFeatures::NONE,
        }
    }

    /// Human-readable name for listings.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Personal => "Personal",
            Self::Professional => "Professional",
            Self::Enterprise => "Enterprise",
            Self::OpenSource => "Open Source",
            Self::Community => "Community",
            Self::Evaluation => "Evaluation",
            Self::Unattended => "Unattended",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Set of product capabilities a license grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LicensedFeatures(pub u64);

impl LicensedFeatures {
    pub const NONE: Self = Self(0);
    pub const CORE: Self = Self(1);
    pub const FRAMEWORK: Self = Self(1 << 1);
    pub const ANALYSIS: Self = Self(1 << 2);
    pub const CODE_FIX: Self = Self(1 << 3);
    pub const DEBUGGER: Self = Self(1 << 4);
    pub const ALL: Self = Self(0x1F);

    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns true if every feature in `other` is also in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LicensedFeatures {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}
