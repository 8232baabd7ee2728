//! Centralized duration formatting.
//!
//! Expiry placeholders render remaining time through this module so every
//! host shows the same text. Spans are broken into fixed-length calendar
//! units (not calendar-aware), largest first.

use std::time::Duration;

/// A unit a span can be broken down into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    /// All units, largest to smallest.
    pub const ALL: [TimeUnit; 7] = [
        TimeUnit::Years,
        TimeUnit::Months,
        TimeUnit::Weeks,
        TimeUnit::Days,
        TimeUnit::Hours,
        TimeUnit::Minutes,
        TimeUnit::Seconds,
    ];

    /// Fixed length of the unit in seconds.
    ///
    /// A year is 365.2425 days and a month is a twelfth of that.
    pub const fn seconds(self) -> u64 {
        match self {
            Self::Years => 31_556_952,
            Self::Months => 2_629_746,
            Self::Weeks => 604_800,
            Self::Days => 86_400,
            Self::Hours => 3_600,
            Self::Minutes => 60,
            Self::Seconds => 1,
        }
    }

    fn singular(self) -> &'static str {
        match self {
            Self::Years => "year",
            Self::Months => "month",
            Self::Weeks => "week",
            Self::Days => "day",
            Self::Hours => "hour",
            Self::Minutes => "minute",
            Self::Seconds => "second",
        }
    }

    fn plural(self) -> &'static str {
        match self {
            Self::Years => "years",
            Self::Months => "months",
            Self::Weeks => "weeks",
            Self::Days => "days",
            Self::Hours => "hours",
            Self::Minutes => "minutes",
            Self::Seconds => "seconds",
        }
    }

    fn short(self) -> &'static str {
        match self {
            Self::Years => "y",
            Self::Months => "mo",
            Self::Weeks => "w",
            Self::Days => "d",
            Self::Hours => "h",
            Self::Minutes => "m",
            Self::Seconds => "s",
        }
    }
}

/// Formats time spans as readable text.
///
/// `concise` selects abbreviated segments (`1d 2h`) over words
/// (`1 day 2 hours`). `accuracy` caps how many segments are emitted;
/// smaller units past the cap are dropped, not rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationFormatter {
    concise: bool,
    accuracy: usize,
}

impl DurationFormatter {
    /// Verbose words, every segment.
    pub const LONG: Self = Self::new(false);
    /// Abbreviations, every segment.
    pub const CONCISE: Self = Self::new(true);
    /// Abbreviations, at most three segments.
    pub const CONCISE_LOW_ACCURACY: Self = Self::with_accuracy(true, 3);

    pub const fn new(concise: bool) -> Self {
        Self::with_accuracy(concise, usize::MAX)
    }

    pub const fn with_accuracy(concise: bool, accuracy: usize) -> Self {
        Self { concise, accuracy }
    }

    pub fn is_concise(&self) -> bool {
        self.concise
    }

    pub fn accuracy(&self) -> usize {
        self.accuracy
    }

    /// Format a [`Duration`]. Sub-second precision is discarded.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use placard_types::formatting::DurationFormatter;
    /// assert_eq!(DurationFormatter::LONG.format(Duration::from_secs(3_661)), "1 hour 1 minute 1 second");
    /// assert_eq!(DurationFormatter::CONCISE.format(Duration::from_millis(500)), "0s");
    /// ```
    pub fn format(&self, duration: Duration) -> String {
        self.format_secs(duration.as_secs())
    }

    /// Format a span given in whole seconds.
    ///
    /// # Examples
    /// ```
    /// use placard_types::formatting::DurationFormatter;
    /// assert_eq!(DurationFormatter::LONG.format_secs(0), "0 seconds");
    /// assert_eq!(DurationFormatter::CONCISE.format_secs(0), "0s");
    /// assert_eq!(DurationFormatter::CONCISE.format_secs(90_061), "1d 1h 1m 1s");
    /// assert_eq!(DurationFormatter::CONCISE_LOW_ACCURACY.format_secs(90_061), "1d 1h 1m");
    /// ```
    pub fn format_secs(&self, secs: u64) -> String {
        let mut remaining = secs;
        let mut segments: Vec<String> = Vec::new();

        for unit in TimeUnit::ALL {
            let n = remaining / unit.seconds();
            if n > 0 {
                remaining -= unit.seconds() * n;
                segments.push(self.format_part(n, unit));
            }
            if remaining == 0 || segments.len() >= self.accuracy {
                break;
            }
        }

        if segments.is_empty() {
            return self.format_part(0, TimeUnit::Seconds);
        }
        segments.join(" ")
    }

    fn format_part(&self, amount: u64, unit: TimeUnit) -> String {
        if self.concise {
            format!("{}{}", amount, unit.short())
        } else if amount == 1 {
            format!("{} {}", amount, unit.singular())
        } else {
            format!("{} {}", amount, unit.plural())
        }
    }
}

impl Default for DurationFormatter {
    fn default() -> Self {
        Self::CONCISE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_span() {
        assert_eq!(DurationFormatter::LONG.format_secs(0), "0 seconds");
        assert_eq!(DurationFormatter::CONCISE.format_secs(0), "0s");
        assert_eq!(DurationFormatter::CONCISE_LOW_ACCURACY.format_secs(0), "0s");
    }

    #[test]
    fn test_low_accuracy_drops_trailing_segments() {
        assert_eq!(DurationFormatter::CONCISE_LOW_ACCURACY.format_secs(90_061), "1d 1h 1m");
        assert_eq!(DurationFormatter::CONCISE.format_secs(90_061), "1d 1h 1m 1s");
        assert_eq!(
            DurationFormatter::LONG.format_secs(90_061),
            "1 day 1 hour 1 minute 1 second"
        );
    }

    #[test]
    fn test_singular_and_plural() {
        for unit in TimeUnit::ALL {
            let one = DurationFormatter::LONG.format_part(1, unit);
            let two = DurationFormatter::LONG.format_part(2, unit);
            let zero = DurationFormatter::LONG.format_part(0, unit);
            assert_eq!(one, format!("1 {}", unit.singular()));
            assert_eq!(two, format!("2 {}", unit.plural()));
            assert_eq!(zero, format!("0 {}", unit.plural()));
        }
    }

    #[test]
    fn test_each_unit_boundary() {
        assert_eq!(DurationFormatter::CONCISE.format_secs(59), "59s");
        assert_eq!(DurationFormatter::CONCISE.format_secs(60), "1m");
        assert_eq!(DurationFormatter::CONCISE.format_secs(3_600), "1h");
        assert_eq!(DurationFormatter::CONCISE.format_secs(86_400), "1d");
        assert_eq!(DurationFormatter::CONCISE.format_secs(604_800), "1w");
        assert_eq!(DurationFormatter::CONCISE.format_secs(2_629_746), "1mo");
        assert_eq!(DurationFormatter::CONCISE.format_secs(31_556_952), "1y");
    }

    #[test]
    fn test_skips_empty_units() {
        // 2 weeks and 5 seconds: nothing in days, hours or minutes
        assert_eq!(DurationFormatter::CONCISE.format_secs(1_209_605), "2w 5s");
        assert_eq!(DurationFormatter::LONG.format_secs(1_209_605), "2 weeks 5 seconds");
    }

    #[test]
    fn test_accuracy_counts_emitted_segments_only() {
        // 1 year, then 3 seconds: the empty units in between don't use up the cap
        let secs = TimeUnit::Years.seconds() + 3;
        let formatter = DurationFormatter::with_accuracy(true, 2);
        assert_eq!(formatter.format_secs(secs), "1y 3s");
    }

    #[test]
    fn test_zero_accuracy_renders_zero() {
        let formatter = DurationFormatter::with_accuracy(false, 0);
        assert_eq!(formatter.format_secs(90_061), "0 seconds");
    }

    #[test]
    fn test_format_duration_truncates_subsecond() {
        assert_eq!(DurationFormatter::CONCISE.format(Duration::from_millis(61_999)), "1m 1s");
    }
}
