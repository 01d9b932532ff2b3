// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Number formatting for human-readable metrics

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Fixed decimals with thousands separators: `1234.5` → `1,234.50`
pub fn format_fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut out = String::new();
    if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Up to three decimals, trailing zeros dropped: `12000` → `12,000`, `0.5` → `0.5`
pub fn format_number(value: f64) -> String {
    let fixed = format_fixed(value, 3);
    if fixed.contains('.') {
        fixed
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        fixed
    }
}

/// Milliseconds: three decimals below 1 ms, two above
pub fn format_ms(value: Option<f64>) -> Option<String> {
    let value = value.filter(|v| v.is_finite())?;
    let decimals = if value.abs() < 1.0 { 3 } else { 2 };
    Some(format_fixed(value, decimals))
}

/// A percentage already scaled to 0..=100, one decimal
pub fn format_percent(value: f64) -> Option<String> {
    value.is_finite().then(|| format!("{:.1}%", value))
}

/// "Times off" multiplier: rounded and grouped at 100× and above, else one decimal
pub fn format_multiplier(factor: f64) -> String {
    if factor >= 100.0 {
        format_number(factor.round())
    } else {
        let text = format!("{:.1}", factor);
        text.strip_suffix(".0").map(str::to_string).unwrap_or(text)
    }
}
