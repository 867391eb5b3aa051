use chrono::{Days, NaiveDate};
use thiserror::Error;

use crate::models::MergedFoodItem;

/// Days after the reference date still counted as "expiring soon".
pub const EXPIRY_WINDOW_DAYS: u64 = 3;

pub const EXPIRY_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid expiry date '{input}': expected YYYY-MM-DD")]
pub struct DateParseError {
    pub input: String,
}

pub fn parse_expiry_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    NaiveDate::parse_from_str(raw.trim(), EXPIRY_DATE_FORMAT).map_err(|_| DateParseError {
        input: raw.to_string(),
    })
}

/// Inclusive day range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ExpiryWindow {
    #[must_use]
    pub fn starting(reference: NaiveDate) -> Self {
        let end = reference
            .checked_add_days(Days::new(EXPIRY_WINDOW_DAYS))
            .unwrap_or(NaiveDate::MAX);
        Self {
            start: reference,
            end,
        }
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Items whose expiry date falls in the window starting at `reference`.
///
/// Undated items and dates that fail to parse are skipped. Input order is
/// preserved.
#[must_use]
pub fn classify(items: &[MergedFoodItem], reference: NaiveDate) -> Vec<MergedFoodItem> {
    let window = ExpiryWindow::starting(reference);

    let expiring: Vec<MergedFoodItem> = items
        .iter()
        .filter(|item| {
            let Some(raw) = item.expiry_date.as_deref() else {
                return false;
            };
            match parse_expiry_date(raw) {
                Ok(date) => window.contains(date),
                Err(e) => {
                    tracing::debug!(name = %item.name, "skipping item: {e}");
                    false
                }
            }
        })
        .cloned()
        .collect();

    tracing::debug!(
        start = %window.start,
        end = %window.end,
        checked = items.len(),
        expiring = expiring.len(),
        "expiry check"
    );

    expiring
}
