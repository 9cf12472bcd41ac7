//! Date input helpers
//!
//! Date fields accept dual entry: a free-text `dd-mm-yyyy` string and a
//! calendar-picked value. These helpers convert between the two.

use chrono::NaiveDate;

/// Display/entry format for date text inputs
pub const DATE_INPUT_FORMAT: &str = "%d-%m-%Y";

/// Parse a `dd-mm-yyyy` text input into a date
///
/// Returns `None` for anything that is not a complete, valid date.
pub fn parse_date_input(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_INPUT_FORMAT).ok()
}

/// Format a date back into the `dd-mm-yyyy` text representation
pub fn format_date_input(date: NaiveDate) -> String {
    date.format(DATE_INPUT_FORMAT).to_string()
}
