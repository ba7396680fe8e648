//! Cell normalizer: raw cells to typed field values.
//!
//! Every function is pure. A failed conversion leaves the field unset; it
//! never substitutes a default value.

use mfs_core::{CellValue, Direction, Timestamp};

use crate::datetime::{fold_bengali_digits, DateTimeParser};

const CURRENCY_WORDS: &[&str] = &["bdt", "tk.", "tk", "taka", "টাকা"];
const CURRENCY_SYMBOLS: &[char] = &['৳', '$', '€', '£', '₹', '¥'];

/// Blank cells and the literal `n/a` carry no value
fn is_absent(text: &str) -> bool {
    let t = text.trim();
    t.is_empty() || t.eq_ignore_ascii_case("n/a")
}

/// Trimmed text, or `None` for blank / `n/a`
pub fn normalize_text(cell: &CellValue) -> Option<String> {
    if cell.is_blank() {
        return None;
    }
    let text = cell.display_text();
    if is_absent(&text) {
        return None;
    }
    Some(text.trim().to_string())
}

/// Currency amount with symbols and thousands separators stripped.
pub fn normalize_amount(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) if !is_absent(s) => parse_amount_text(s),
        _ => None,
    }
}

fn parse_amount_text(raw: &str) -> Option<f64> {
    let mut cleaned = fold_bengali_digits(raw.trim()).to_lowercase();

    // Accounting style: (1,234.50) is negative
    let negative = cleaned.starts_with('(') && cleaned.ends_with(')');
    if negative {
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
    }

    for word in CURRENCY_WORDS {
        cleaned = cleaned.replace(word, "");
    }
    let cleaned: String = cleaned
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();
    if !is_plain_decimal(&cleaned) {
        return None;
    }

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Optional sign, digits, at most one '.'. Rejects what `f64::from_str`
/// would also take: exponents, `inf`, `nan`.
fn is_plain_decimal(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    let mut seen_digit = false;
    let mut seen_point = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_point => seen_point = true,
            _ => return false,
        }
    }
    seen_digit
}

/// Native dates pass through; text goes through `parser`, and text that does
/// not parse is kept verbatim rather than dropped.
pub fn normalize_timestamp(cell: &CellValue, parser: &dyn DateTimeParser) -> Option<Timestamp> {
    match cell {
        CellValue::DateValue(dt) => Some(Timestamp::Parsed(*dt)),
        CellValue::Empty => None,
        other => {
            let text = normalize_text(other)?;
            Some(match parser.parse(&text) {
                Some(dt) => Timestamp::Parsed(dt),
                None => Timestamp::Raw(text),
            })
        }
    }
}

/// `DR`/`DEBIT` and `CR`/`CREDIT` in any case; other tokens pass through uppercased
pub fn normalize_direction(cell: &CellValue) -> Option<Direction> {
    let text = normalize_text(cell)?;
    let upper = text.to_uppercase();
    Some(match upper.as_str() {
        "DR" | "DR." | "DEBIT" | "ডেবিট" => Direction::Debit,
        "CR" | "CR." | "CREDIT" | "ক্রেডিট" => Direction::Credit,
        _ => Direction::Other(upper),
    })
}
