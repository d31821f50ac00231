/// Human-readable rendering of a resolved value, e.g. `$1,234.56` or `50,000 shares`.
pub fn format_fact_value(value: f64, unit: Option<&str>) -> String {
    let formatted = if value.fract() == 0.0 {
        format!("{:.0}", value.abs())
    } else {
        format!("{:.2}", value.abs())
    };

    let (int_part, dec_part) = match formatted.split_once('.') {
        Some((int_part, dec_part)) => (int_part, Some(dec_part)),
        None => (formatted.as_str(), None),
    };

    // Add thousands separators to integer part
    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.insert(0, ',');
        }
        grouped.insert(0, c);
    }

    let number = match dec_part {
        Some(dec_part) => format!("{}.{}", grouped, dec_part),
        None => grouped.clone(),
    };
    let sign = if value < 0.0 && number.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };

    match unit {
        Some(u) if u.to_uppercase().contains("USD") => format!("{}${}", sign, number),
        // Shares are reported without decimal places
        Some(u) if u.to_lowercase().contains("share") => format!("{}{} shares", sign, grouped),
        Some(u) => format!("{}{} {}", sign, number, u),
        None => format!("{}{}", sign, number),
    }
}
