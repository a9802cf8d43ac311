//! Completion percentage to visual intensity tier.
//!
//! # Invariants
//! - Inactive days are always `Empty`, whatever the percent.
//! - `33` and `66` close their own band; `100` is reached only at exact
//!   completion.
//! - Tier and today-emphasis are independent attributes.

use crate::engine::grid::DayCell;

/// Discrete intensity bucket for a day cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// No habit occurs that day.
    Empty,
    /// Habits occur but none is done.
    NotStarted,
    Low,
    Mid,
    High,
    /// Every occurring habit is done.
    Complete,
}

impl Tier {
    /// Stable label used by FFI and CLI consumers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::NotStarted => "not_started",
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
            Self::Complete => "complete",
        }
    }
}

struct Band {
    upper: f64,
    inclusive: bool,
    tier: Tier,
}

impl Band {
    fn admits(&self, percent: f64) -> bool {
        if self.inclusive {
            percent <= self.upper
        } else {
            percent < self.upper
        }
    }
}

// Ordered, first match wins.
const BANDS: &[Band] = &[
    Band {
        upper: 0.0,
        inclusive: true,
        tier: Tier::NotStarted,
    },
    Band {
        upper: 33.0,
        inclusive: true,
        tier: Tier::Low,
    },
    Band {
        upper: 66.0,
        inclusive: true,
        tier: Tier::Mid,
    },
    Band {
        upper: 100.0,
        inclusive: false,
        tier: Tier::High,
    },
];

/// Resolves the tier for a day.
///
/// `percent` is clamped to `[0, 100]`; NaN counts as 0.
pub fn tier_for(occurs: bool, percent: f64) -> Tier {
    if !occurs {
        return Tier::Empty;
    }
    let percent = if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    };
    BANDS
        .iter()
        .find(|band| band.admits(percent))
        .map_or(Tier::Complete, |band| band.tier)
}

/// Render attributes for one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellStyle {
    pub tier: Tier,
    /// Outline overlay for today's cell.
    pub emphasized: bool,
}

pub fn style_for(cell: &DayCell) -> CellStyle {
    CellStyle {
        tier: cell.tier(),
        emphasized: cell.emphasized(),
    }
}

#[cfg(test)]
mod tests {
    use super::{tier_for, Tier};

    #[test]
    fn boundaries_follow_band_table() {
        assert_eq!(tier_for(true, 0.0), Tier::NotStarted);
        assert_eq!(tier_for(true, 0.5), Tier::Low);
        assert_eq!(tier_for(true, 33.0), Tier::Low);
        assert_eq!(tier_for(true, 33.4), Tier::Mid);
        assert_eq!(tier_for(true, 34.0), Tier::Mid);
        assert_eq!(tier_for(true, 66.0), Tier::Mid);
        assert_eq!(tier_for(true, 67.0), Tier::High);
        assert_eq!(tier_for(true, 99.99), Tier::High);
        assert_eq!(tier_for(true, 100.0), Tier::Complete);
    }

    #[test]
    fn inactive_days_are_empty() {
        assert_eq!(tier_for(false, 0.0), Tier::Empty);
        assert_eq!(tier_for(false, 100.0), Tier::Empty);
    }

    #[test]
    fn thirds_land_on_open_side_of_boundaries() {
        assert_eq!(tier_for(true, 100.0 / 3.0), Tier::Mid);
        assert_eq!(tier_for(true, 200.0 / 3.0), Tier::High);
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        assert_eq!(tier_for(true, -5.0), Tier::NotStarted);
        assert_eq!(tier_for(true, 150.0), Tier::Complete);
        assert_eq!(tier_for(true, f64::NAN), Tier::NotStarted);
    }
}
