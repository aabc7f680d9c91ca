//! Value conversion between model types and control text.
//!
//! Form bindings and cell renderers go through one [`ConversionService`] so
//! format patterns behave identically everywhere. Parsing is lenient -
//! malformed user input yields `None` and is reported through the
//! validation channel, never as an error from the binding itself.
//!
//! Numeric format patterns follow the `"0.00"` convention (digits after the
//! dot give the rendered precision); date patterns are `chrono` format
//! strings (`"%d.%m.%Y"`).

use chrono::NaiveDate;

const DEFAULT_DATE_PATTERN: &str = "%Y-%m-%d";

/// Conversion strategies shared by bindings, cells and validators.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConversionService;

impl ConversionService {
    /// Format an integer.
    pub fn format_i64(&self, value: i64) -> String {
        value.to_string()
    }

    /// Parse an integer, tolerating surrounding whitespace.
    pub fn parse_i64(&self, text: &str) -> Option<i64> {
        text.trim().parse().ok()
    }

    /// Format a float, honouring a `"0.00"`-style precision pattern.
    pub fn format_f64(&self, value: f64, pattern: Option<&str>) -> String {
        match pattern.and_then(decimal_places) {
            Some(places) => format!("{value:.places$}"),
            None => value.to_string(),
        }
    }

    /// Parse a float, tolerating surrounding whitespace and a decimal comma.
    pub fn parse_f64(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        text.parse().ok().or_else(|| text.replace(',', ".").parse().ok())
    }

    /// Format a boolean as `"true"` / `"false"`.
    pub fn format_bool(&self, value: bool) -> String {
        value.to_string()
    }

    /// Parse a boolean, accepting the usual textual spellings.
    pub fn parse_bool(&self, text: &str) -> Option<bool> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }

    /// Format a date with the given `chrono` pattern (ISO by default).
    pub fn format_date(&self, date: NaiveDate, pattern: Option<&str>) -> String {
        date.format(pattern.unwrap_or(DEFAULT_DATE_PATTERN)).to_string()
    }

    /// Parse a date with the given `chrono` pattern (ISO by default).
    pub fn parse_date(&self, text: &str, pattern: Option<&str>) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(text.trim(), pattern.unwrap_or(DEFAULT_DATE_PATTERN)).ok()
    }
}

fn decimal_places(pattern: &str) -> Option<usize> {
    pattern.split_once('.').map(|(_, frac)| frac.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_precision_pattern() {
        let service = ConversionService;
        assert_eq!(service.format_f64(1.5, Some("0.00")), "1.50");
        assert_eq!(service.format_f64(1.567, Some("0.0")), "1.6");
        assert_eq!(service.format_f64(2.0, None), "2");
    }

    #[test]
    fn test_float_parsing_accepts_comma() {
        let service = ConversionService;
        assert_eq!(service.parse_f64(" 1.5 "), Some(1.5));
        assert_eq!(service.parse_f64("1,5"), Some(1.5));
        assert_eq!(service.parse_f64("abc"), None);
    }

    #[test]
    fn test_bool_spellings() {
        let service = ConversionService;
        assert_eq!(service.parse_bool("Yes"), Some(true));
        assert_eq!(service.parse_bool("off"), Some(false));
        assert_eq!(service.parse_bool("maybe"), None);
    }

    #[test]
    fn test_date_round_trip_with_pattern() {
        let service = ConversionService;
        let date = NaiveDate::from_ymd_opt(2021, 3, 14).unwrap();
        let text = service.format_date(date, Some("%d.%m.%Y"));
        assert_eq!(text, "14.03.2021");
        assert_eq!(service.parse_date(&text, Some("%d.%m.%Y")), Some(date));
    }

    #[test]
    fn test_date_default_pattern_is_iso() {
        let service = ConversionService;
        let date = NaiveDate::from_ymd_opt(2021, 3, 14).unwrap();
        assert_eq!(service.format_date(date, None), "2021-03-14");
        assert_eq!(service.parse_date("2021-03-14", None), Some(date));
    }
}
