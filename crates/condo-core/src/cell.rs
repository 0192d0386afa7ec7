//! # Sheet Cell Parsing
//!
//! The spreadsheet is typed loosely: a house number may arrive as `"7"` or
//! `"7.0"`, an amount as `"12.50"` or `"12,50"`. These helpers normalize a
//! single cell into a Rust value and return `None` for blanks and garbage.

/// Parse an integer cell. Accepts plain integers and decimal renderings
/// (`"7.0"`), truncating any fractional part.
pub fn parse_integer(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Some(n);
    }
    let f = parse_amount(cell)?;
    if f.is_finite() && f.abs() < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

/// Parse a monetary cell. A comma is read as the decimal separator.
pub fn parse_amount(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
}

/// Round to whole cents.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Treat blank cells as absent.
pub fn non_blank(cell: &str) -> Option<&str> {
    let cell = cell.trim();
    (!cell.is_empty()).then_some(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_accepts_decimal_rendering() {
        assert_eq!(parse_integer("7"), Some(7));
        assert_eq!(parse_integer(" 7.0 "), Some(7));
        assert_eq!(parse_integer("12,0"), Some(12));
        assert_eq!(parse_integer("-3"), Some(-3));
    }

    #[test]
    fn integer_rejects_blank_and_text() {
        assert_eq!(parse_integer(""), None);
        assert_eq!(parse_integer("   "), None);
        assert_eq!(parse_integer("casa"), None);
    }

    #[test]
    fn amount_accepts_comma_decimal() {
        assert_eq!(parse_amount("12,50"), Some(12.5));
        assert_eq!(parse_amount("-40"), Some(-40.0));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn cents_rounding() {
        assert_eq!(round_cents(10.005_1), 10.01);
        assert_eq!(round_cents(-0.004), -0.0);
        assert_eq!(round_cents(99.999), 100.0);
    }

    #[test]
    fn non_blank_trims() {
        assert_eq!(non_blank("  x "), Some("x"));
        assert_eq!(non_blank("   "), None);
    }
}
