//! Helpers shared by the unit tests of the crate

use crate::FloatValue;

/// Expected direction of a sequence of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trend {
    /// Non-decreasing
    Increasing,
    /// Non-increasing
    Decreasing,
    /// Neither non-decreasing nor non-increasing
    NonMonotonic,
}

pub(crate) fn follows_trend(values: &[FloatValue], trend: Trend) -> bool {
    let increasing = values.windows(2).all(|w| w[0] <= w[1]);
    let decreasing = values.windows(2).all(|w| w[0] >= w[1]);
    match trend {
        Trend::Increasing => increasing,
        Trend::Decreasing => decreasing,
        Trend::NonMonotonic => !increasing && !decreasing,
    }
}

#[test]
fn test_follows_trend() {
    assert!(follows_trend(&[1.0, 1.0, 2.0], Trend::Increasing));
    assert!(follows_trend(&[3.0, 2.0, 2.0], Trend::Decreasing));
    assert!(follows_trend(&[1.0, 3.0, 2.0], Trend::NonMonotonic));
    assert!(!follows_trend(&[1.0, 2.0, 3.0], Trend::NonMonotonic));
}
