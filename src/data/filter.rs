//! Retention policies and the time-window filter.
use crate::error::DashError;
use crate::measurement::MeasurementSequence;
use chrono::{DateTime, Months, Offset, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named time window selecting which measurements are visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetentionPolicy {
    /// Since local midnight one calendar month ago
    LastMonth,
    /// Since local midnight three calendar months ago
    LastThreeMonths,
    /// Everything
    #[default]
    AllData,
}

impl RetentionPolicy {
    /// Every policy, narrowest first.
    pub const ALL: [RetentionPolicy; 3] = [
        RetentionPolicy::LastMonth,
        RetentionPolicy::LastThreeMonths,
        RetentionPolicy::AllData,
    ];

    /// Calendar months covered by the window, `None` for all data.
    pub fn months(self) -> Option<u32> {
        match self {
            RetentionPolicy::LastMonth => Some(1),
            RetentionPolicy::LastThreeMonths => Some(3),
            RetentionPolicy::AllData => None,
        }
    }

    /// Default render point budget for this window.
    ///
    /// Recent windows are dense enough to show near full resolution; the whole history
    /// gets a larger budget but is always grouped.
    pub fn target_points(self) -> usize {
        match self {
            RetentionPolicy::AllData => 600,
            RetentionPolicy::LastMonth | RetentionPolicy::LastThreeMonths => 300,
        }
    }

    /// Kebab-case name, as used in config files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            RetentionPolicy::LastMonth => "last-month",
            RetentionPolicy::LastThreeMonths => "last-three-months",
            RetentionPolicy::AllData => "all-data",
        }
    }

    /// Cutoff instant (UNIX seconds) relative to `now`.
    ///
    /// The cutoff is local midnight, in `now`'s zone, of the date one or three calendar
    /// months before `now`. Days past the end of the target month clamp to its last day.
    pub fn cutoff<Tz: TimeZone>(self, now: &DateTime<Tz>) -> Option<i64> {
        let months = self.months()?;
        let date = now.date_naive().checked_sub_months(Months::new(months))?;
        let midnight = date.and_hms_opt(0, 0, 0)?;

        let cutoff = match now.timezone().from_local_datetime(&midnight).earliest() {
            Some(local) => local.timestamp(),
            // Midnight skipped by a DST jump; fall back to the current offset.
            None => {
                midnight.and_utc().timestamp() - i64::from(now.offset().fix().local_minus_utc())
            }
        };
        Some(cutoff)
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetentionPolicy {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RetentionPolicy::ALL
            .into_iter()
            .find(|policy| policy.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DashError::UnknownPolicy(s.to_string()))
    }
}

/// Select the measurements visible under `policy`.
///
/// Always returns an independent copy. Measurements exactly at the cutoff are excluded.
pub fn filter<Tz: TimeZone>(
    sequence: &MeasurementSequence,
    policy: RetentionPolicy,
    now: &DateTime<Tz>,
) -> MeasurementSequence {
    match policy.cutoff(now) {
        Some(cutoff) => sequence.filtered(|m| m.timestamp > cutoff),
        None => sequence.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::Measurement;
    use chrono::{FixedOffset, Utc};

    fn at(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    #[test]
    fn cutoff_is_midnight_one_month_back() {
        let now = at(2024, 5, 15, 13);
        let cutoff = RetentionPolicy::LastMonth.cutoff(&now).unwrap();
        assert_eq!(cutoff, at(2024, 4, 15, 0).timestamp());
    }

    #[test]
    fn cutoff_three_months_clamps_to_month_end() {
        let now = at(2024, 5, 31, 8);
        let cutoff = RetentionPolicy::LastThreeMonths.cutoff(&now).unwrap();
        assert_eq!(cutoff, at(2024, 2, 29, 0).timestamp());
    }

    #[test]
    fn cutoff_uses_local_midnight() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 5, 15, 1, 0, 0).unwrap();
        let cutoff = RetentionPolicy::LastMonth.cutoff(&now).unwrap();
        // 2024-04-15T00:00+02:00
        assert_eq!(cutoff, at(2024, 4, 14, 22).timestamp());
    }

    #[test]
    fn all_data_has_no_cutoff() {
        assert_eq!(RetentionPolicy::AllData.cutoff(&at(2024, 5, 15, 0)), None);
    }

    #[test]
    fn measurement_at_cutoff_is_excluded() {
        let now = at(2024, 5, 15, 13);
        let cutoff = RetentionPolicy::LastMonth.cutoff(&now).unwrap();
        let seq: MeasurementSequence = vec![
            Measurement::new(cutoff - 1, 1.0),
            Measurement::new(cutoff, 2.0),
            Measurement::new(cutoff + 1, 3.0),
        ]
        .into();

        let visible = filter(&seq, RetentionPolicy::LastMonth, &now);
        assert_eq!(visible.timestamps().collect::<Vec<_>>(), vec![cutoff + 1]);
    }

    #[test]
    fn all_data_returns_equal_copy() {
        let seq: MeasurementSequence = vec![Measurement::new(1, 1.0)].into();
        let copy = filter(&seq, RetentionPolicy::AllData, &at(2024, 5, 15, 0));
        assert_eq!(copy, seq);
    }

    #[test]
    fn parses_and_displays_policies() {
        for policy in RetentionPolicy::ALL {
            assert_eq!(policy.to_string().parse::<RetentionPolicy>().unwrap(), policy);
        }
        assert!("last-year".parse::<RetentionPolicy>().is_err());
        assert_eq!(
            serde_json::to_string(&RetentionPolicy::LastThreeMonths).unwrap(),
            "\"last-three-months\""
        );
    }
}
