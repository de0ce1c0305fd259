//! Startup-policy translation between the public three-valued enum and the
//! raw start-type constants the control manager stores.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

// Raw start-type values as recorded in the registry.

/// Started by the boot loader, before the kernel proper.
pub const BOOT_START: u32 = 0;

/// Started during kernel initialization.
pub const SYSTEM_START: u32 = 1;

/// Started automatically by the manager at boot.
pub const AUTO_START: u32 = 2;

/// Started only on an explicit request.
pub const DEMAND_START: u32 = 3;

/// Cannot be started.
pub const DISABLED: u32 = 4;

/// Startup policy of a registered service.
///
/// The registry distinguishes boot-start, system-start, and auto-start, but
/// all three mean "runs without an explicit request" to a client; they
/// collapse to [`StartupPolicy::Automatic`] on read.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum StartupPolicy {
    /// Started automatically at boot.
    Automatic,
    /// Started only on explicit request.
    Manual,
    /// Cannot be started until reconfigured.
    Disabled,
}

impl StartupPolicy {
    /// The raw start type to write when configuring this policy.
    pub fn to_raw(self) -> u32 {
        match self {
            Self::Automatic => AUTO_START,
            Self::Manual => DEMAND_START,
            Self::Disabled => DISABLED,
        }
    }

    /// Maps a raw start type read back from the registry.
    ///
    /// Returns `None` for values outside the documented domain; callers
    /// treat that as a data-corruption condition rather than defaulting.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            BOOT_START | SYSTEM_START | AUTO_START => Some(Self::Automatic),
            DEMAND_START => Some(Self::Manual),
            DISABLED => Some(Self::Disabled),
            _ => None,
        }
    }
}
