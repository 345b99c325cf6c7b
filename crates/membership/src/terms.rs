//! Billing term resolution.
//!
//! Answers the one question every subscription card asks: which date does the
//! member see next, and is it a renewal or an expiry? The store mixes
//! recurring rows with a billing anchor, fixed-term rows with an end date,
//! and canceled rows carrying both, so the order the fields are consulted in
//! matters.

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use regulars_shared::{BillingFrequency, MembershipError, MembershipResult, Subscription};

// =============================================================================
// Types
// =============================================================================

/// What the resolved date means to the member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermLabel {
    NextRenewal,
    ExpiresOn,
}

impl TermLabel {
    /// Display string, exactly as member-facing surfaces print it.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NextRenewal => "Next Renewal:",
            Self::ExpiresOn => "Expires on:",
        }
    }
}

impl std::fmt::Display for TermLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Resolved billing term for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermInfo {
    /// The next relevant date; `None` when the record carries no schedule
    pub date: Option<Date>,
    pub label: TermLabel,
}

impl TermInfo {
    /// The bottom of the decision chain: no schedule to show.
    pub fn none() -> Self {
        Self {
            date: None,
            label: TermLabel::ExpiresOn,
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve the next relevant billing date for a subscription.
///
/// Evaluation order, first match wins:
/// 1. Anchor day and end date together mean the subscription was canceled
///    mid-recurrence; the end date wins.
/// 2. Anchor day, monthly frequency: the anchor day in `today`'s month,
///    advanced one month when it has already passed.
/// 3. Anchor day, annual frequency, start date present: the start date's
///    anniversary this year, advanced one year when it has already passed.
/// 4. End date alone: a fixed term.
/// 5. Nothing: no schedule to show.
///
/// A date equal to `today` is not past: the term renews or expires today,
/// not last period. Anchor days with no real date in the target month (31 in
/// a 30-day month, February 29 outside leap years) come back as `Validation`
/// errors naming the impossible date rather than a guessed nearby one.
pub fn term_info(subscription: &Subscription, today: Date) -> MembershipResult<TermInfo> {
    // A canceled recurring subscription keeps its anchor day in the store;
    // the fixed end overrides the schedule.
    if subscription.anchor_day.is_some() && subscription.end_date.is_some() {
        return Ok(TermInfo {
            date: subscription.end_date,
            label: TermLabel::ExpiresOn,
        });
    }

    if let Some(anchor_day) = subscription.anchor_day {
        match subscription.frequency {
            BillingFrequency::Monthly => {
                let date = next_monthly_anchor(anchor_day, today)?;
                return Ok(TermInfo {
                    date: Some(date),
                    label: TermLabel::NextRenewal,
                });
            }
            BillingFrequency::Annually => {
                if let Some(start_date) = subscription.start_date {
                    let date = next_anniversary(start_date, today)?;
                    return Ok(TermInfo {
                        date: Some(date),
                        label: TermLabel::NextRenewal,
                    });
                }
                // Annual anchor with no start date has no anniversary to
                // compute; fall through to the end-date cases.
            }
        }
    }

    Ok(TermInfo {
        date: subscription.end_date,
        label: TermLabel::ExpiresOn,
    })
}

/// The anchor day in `today`'s month, or the same day one month on when the
/// anchor has already passed this month.
fn next_monthly_anchor(anchor_day: u8, today: Date) -> MembershipResult<Date> {
    let this_month = calendar_date(today.year(), today.month(), anchor_day)?;
    if this_month >= today {
        return Ok(this_month);
    }

    let (year, month) = if today.month() == Month::December {
        (today.year() + 1, Month::January)
    } else {
        (today.year(), today.month().next())
    };
    calendar_date(year, month, anchor_day)
}

/// The start date's month/day anniversary in `today`'s year, or next year
/// when it has already passed.
fn next_anniversary(start_date: Date, today: Date) -> MembershipResult<Date> {
    let this_year = calendar_date(today.year(), start_date.month(), start_date.day())?;
    if this_year >= today {
        return Ok(this_year);
    }
    calendar_date(today.year() + 1, start_date.month(), start_date.day())
}

/// Build a calendar date, surfacing impossible combinations instead of
/// clamping to a nearby real date.
fn calendar_date(year: i32, month: Month, day: u8) -> MembershipResult<Date> {
    Date::from_calendar_date(year, month, day).map_err(|_| {
        MembershipError::Validation(format!(
            "Billing anchor day {} does not exist in {} {}",
            day, month, year
        ))
    })
}

// =============================================================================
// Tests
// =============================================================================
