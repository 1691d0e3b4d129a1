/// Render an amount with thousands separators and exactly two decimals,
/// e.g. `1234567.5` becomes `1,234,567.50`.
pub fn format_price(amount: f64) -> String {
    if !amount.is_finite() {
        return "0.00".to_string();
    }
    let fixed = format!("{:.2}", amount.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3 + 4);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && !fixed.trim_matches(['0', '.']).is_empty() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_price(1234567.5), "1,234,567.50");
        assert_eq!(format_price(999.0), "999.00");
        assert_eq!(format_price(1000.0), "1,000.00");
        assert_eq!(format_price(0.5), "0.50");
    }

    #[test]
    fn keeps_sign_for_nonzero_negatives() {
        assert_eq!(format_price(-2500.25), "-2,500.25");
        assert_eq!(format_price(-0.001), "0.00");
    }

    #[test]
    fn non_finite_collapses_to_zero() {
        assert_eq!(format_price(f64::NAN), "0.00");
        assert_eq!(format_price(f64::INFINITY), "0.00");
    }
}
