//! Date parsing and formatting for date-role columns.
//!
//! The sheet stores dates as `DD/MM/YYYY` text. Input arrives in whatever
//! format the client produced, so parsing tries a short list of layouts.

use chrono::NaiveDate;

/// Layout written to the sheet.
pub const SHEET_DATE_FORMAT: &str = "%d/%m/%Y";

/// Layouts accepted when reading a date, tried in order.
const INPUT_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// Formats a date for the sheet.
#[must_use]
pub fn format_for_sheet(date: NaiveDate) -> String {
    date.format(SHEET_DATE_FORMAT).to_string()
}

/// Parses a date in any accepted layout.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parses a date, falling back to `today` for blank or unparseable text.
#[must_use]
pub fn parse_date_or(s: &str, today: NaiveDate) -> NaiveDate {
    parse_date(s).unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn formats_day_first() {
        assert_eq!(format_for_sheet(ymd(2025, 3, 7)), "07/03/2025");
    }

    #[test]
    fn parses_accepted_layouts() {
        assert_eq!(parse_date("07/03/2025"), Some(ymd(2025, 3, 7)));
        assert_eq!(parse_date("2025-03-07"), Some(ymd(2025, 3, 7)));
        assert_eq!(parse_date("07-03-2025"), Some(ymd(2025, 3, 7)));
        assert_eq!(parse_date("2025/03/07"), Some(ymd(2025, 3, 7)));
    }

    #[test]
    fn day_first_wins_over_month_first() {
        assert_eq!(parse_date("03/07/2025"), Some(ymd(2025, 7, 3)));
        assert_eq!(parse_date("12/31/2025"), Some(ymd(2025, 12, 31)));
    }

    #[test]
    fn falls_back_to_today() {
        let today = ymd(2025, 1, 1);
        assert_eq!(parse_date_or("", today), today);
        assert_eq!(parse_date_or("kemarin", today), today);
    }
}
