//! Level comparison flag set.

use std::fmt::{self, Formatter};

/// A set of allowed orderings between an incoming level and a current level.
///
/// Used by effect stacking (level denial/override) and by repeat ability
/// grants (level override). Combine flags with `|`:
///
/// ```
/// use bevy_forge::core::LevelComparison;
///
/// let allowed = LevelComparison::EQUAL | LevelComparison::HIGHER;
/// assert!(allowed.allows(3, 2));
/// assert!(!allowed.allows(1, 2));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LevelComparison(u8);

impl LevelComparison {
    /// No comparison is allowed.
    pub const NONE: Self = Self(0);
    /// The incoming level is lower than the current one.
    pub const LOWER: Self = Self(1);
    /// The levels are equal.
    pub const EQUAL: Self = Self(1 << 1);
    /// The incoming level is higher than the current one.
    pub const HIGHER: Self = Self(1 << 2);
    /// Any ordering.
    pub const ANY: Self = Self(0b111);

    pub fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 == flag.0 && flag.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether the ordering of `incoming` relative to `current` is in the set.
    pub fn allows(self, incoming: i32, current: i32) -> bool {
        let flag = if incoming < current {
            Self::LOWER
        } else if incoming == current {
            Self::EQUAL
        } else {
            Self::HIGHER
        };
        self.contains(flag)
    }
}

impl std::ops::BitOr for LevelComparison {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for LevelComparison {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for LevelComparison {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(Self::LOWER) {
            parts.push("LOWER");
        }
        if self.contains(Self::EQUAL) {
            parts.push("EQUAL");
        }
        if self.contains(Self::HIGHER) {
            parts.push("HIGHER");
        }
        if parts.is_empty() {
            f.write_str("NONE")
        } else {
            f.write_str(&parts.join(" | "))
        }
    }
}
