//SPDX-License-Identifier: MIT OR Apache-2.0

//! Locality identifiers and the placement hint handed to a pool.

use std::fmt;

/// Identifies a preferred NUMA domain or core.
///
/// Negative values mean "no placement preference"; [`LocalityId::NO_PREFERENCE`]
/// (`-1`) is the canonical form and is what pools receive by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalityId(i32);

impl LocalityId {
    /// No placement preference.
    pub const NO_PREFERENCE: LocalityId = LocalityId(-1);

    pub const fn new(id: i32) -> Self {
        LocalityId(id)
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    /// True if this id names an actual domain or core.
    pub const fn is_preference(self) -> bool {
        self.0 >= 0
    }

    /// The id as an index, if it is a preference.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl Default for LocalityId {
    fn default() -> Self {
        LocalityId::NO_PREFERENCE
    }
}

impl From<i32> for LocalityId {
    fn from(id: i32) -> Self {
        LocalityId(id)
    }
}

impl fmt::Display for LocalityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_preference() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("any")
        }
    }
}

/// What a [`ScheduleHint`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HintMode {
    /// No hint at all; the pool places the work wherever it likes.
    #[default]
    None,
    /// The locality names a NUMA domain.
    Numa,
    /// The locality names a core.
    Core,
}

/// A placement hint: a mode plus a locality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScheduleHint {
    mode: HintMode,
    locality: LocalityId,
}

impl ScheduleHint {
    /// The hint used for unguided submissions.
    pub const NONE: ScheduleHint = ScheduleHint {
        mode: HintMode::None,
        locality: LocalityId::NO_PREFERENCE,
    };

    pub const fn numa(locality: LocalityId) -> Self {
        ScheduleHint {
            mode: HintMode::Numa,
            locality,
        }
    }

    pub const fn core(locality: LocalityId) -> Self {
        ScheduleHint {
            mode: HintMode::Core,
            locality,
        }
    }

    pub const fn mode(&self) -> HintMode {
        self.mode
    }

    pub const fn locality(&self) -> LocalityId {
        self.locality
    }

    /// True if the pool should try to honour this hint.
    ///
    /// A NUMA or core hint carrying `-1` is accepted but expresses no
    /// preference.
    pub const fn has_preference(&self) -> bool {
        !matches!(self.mode, HintMode::None) && self.locality.is_preference()
    }
}

impl fmt::Display for ScheduleHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            HintMode::None => f.write_str("none"),
            HintMode::Numa => write!(f, "numa:{}", self.locality),
            HintMode::Core => write!(f, "core:{}", self.locality),
        }
    }
}
