//! Raw spreadsheet cell values, before any normalization.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ISO_DATETIME;

/// A single raw cell as read from a workbook or a text dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    DateValue(NaiveDateTime),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Empty cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) | CellValue::DateValue(_) => false,
        }
    }

    /// Text rendering used for header labels and text fields.
    ///
    /// Integral numbers drop the fractional part so account numbers read
    /// back the way they were typed (`1700000000`, not `1700000000.0`).
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::DateValue(dt) => dt.format(ISO_DATETIME).to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateValue(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_blank_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::text("   ").is_blank());
        assert!(!CellValue::text("x").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[test]
    fn test_display_text_integral_numbers() {
        assert_eq!(CellValue::Number(1700000000.0).display_text(), "1700000000");
        assert_eq!(CellValue::Number(12.5).display_text(), "12.5");
    }

    #[test]
    fn test_display_text_dates_are_iso() {
        let dt = NaiveDate::from_ymd_opt(2023, 2, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(CellValue::DateValue(dt).display_text(), "2023-02-01T10:00:00");
    }

    #[test]
    fn test_from_empty_str_is_empty_cell() {
        assert_eq!(CellValue::from(""), CellValue::Empty);
        assert_eq!(CellValue::from("a"), CellValue::text("a"));
    }
}
