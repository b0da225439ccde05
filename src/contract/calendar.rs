// =============================================================================
// Contract calendar — expiry dates and front/next month selection
// =============================================================================
//
// Index futures in scope expire on the third Wednesday of the contract
// month. Trading rolls to the next month once `as_of` reaches the rollover
// window, which opens `window_days` before the third Wednesday and stays
// open through expiry:
//
//     roll  ⇔  as_of >= third_wednesday − window_days
//
// This single inclusive rule covers both "already past expiry" and "inside
// the window", including expiry day itself.
// =============================================================================

use chrono::{Datelike, Days, Duration, NaiveDate, Weekday};
use serde::Serialize;

/// A specific delivery month. Always derived from a date, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ContractMonth {
    pub year: i32,
    /// 1..=12
    pub month: u32,
}

impl ContractMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The following calendar month, wrapping December into January.
    pub fn next(self) -> Self {
        if self.month >= 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl std::fmt::Display for ContractMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Which contract month a resolution picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloverDecision {
    FrontMonth,
    NextMonth,
}

impl std::fmt::Display for RolloverDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrontMonth => write!(f, "front_month"),
            Self::NextMonth => write!(f, "next_month"),
        }
    }
}

/// Third Wednesday of the month containing `as_of`.
pub fn third_wednesday(as_of: NaiveDate) -> NaiveDate {
    let first = as_of - Duration::days(i64::from(as_of.day0()));
    let weekday = first.weekday().num_days_from_monday();
    let wednesday = Weekday::Wed.num_days_from_monday();
    let to_first_wednesday = (wednesday + 7 - weekday) % 7;
    first + Duration::days(i64::from(to_first_wednesday) + 14)
}

/// First day of the rollover window for the month containing `as_of`.
/// `None` when the window reaches before the earliest representable date.
pub fn rollover_window_start(as_of: NaiveDate, window_days: u32) -> Option<NaiveDate> {
    third_wednesday(as_of).checked_sub_days(Days::new(u64::from(window_days)))
}

pub fn rollover_decision(as_of: NaiveDate, window_days: u32) -> Option<RolloverDecision> {
    let start = rollover_window_start(as_of, window_days)?;
    Some(if as_of >= start {
        RolloverDecision::NextMonth
    } else {
        RolloverDecision::FrontMonth
    })
}

/// The contract month to trade on `as_of`.
pub fn target_month(as_of: NaiveDate, window_days: u32) -> Option<(ContractMonth, RolloverDecision)> {
    let current = ContractMonth::of(as_of);
    match rollover_decision(as_of, window_days)? {
        RolloverDecision::FrontMonth => Some((current, RolloverDecision::FrontMonth)),
        RolloverDecision::NextMonth => Some((current.next(), RolloverDecision::NextMonth)),
    }
}
