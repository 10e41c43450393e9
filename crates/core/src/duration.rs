// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duration string parsing for connection and polling settings

use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse a duration string like `"30s"`, `"250ms"`, `"1m30s"` or `"1.5h"`.
///
/// Terms are summed. A bare number with no unit is read as seconds, but only
/// when it is the whole string.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let mut total: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let num_end = rest
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let num_str = &rest[..num_end];
        if num_str.is_empty() {
            return Err(format!("expected a number in duration: {}", s));
        }
        rest = rest[num_end..].trim_start();

        let unit_end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.' || c.is_whitespace())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = rest[unit_end..].trim_start();

        if unit.is_empty() && (total > 0 || !rest.is_empty()) {
            return Err(format!("missing unit in duration: {}", s));
        }
        let scale =
            unit_nanos(unit).ok_or_else(|| format!("unknown duration suffix: {}", unit))?;

        let term = if num_str.contains('.') {
            let num: f64 = num_str
                .parse()
                .map_err(|_| format!("invalid number in duration: {}", s))?;
            (num * scale as f64).round() as u128
        } else {
            let num: u128 = num_str
                .parse()
                .map_err(|_| format!("invalid number in duration: {}", s))?;
            num.checked_mul(scale)
                .ok_or_else(|| format!("duration too large: {}", s))?
        };
        total = total
            .checked_add(term)
            .ok_or_else(|| format!("duration too large: {}", s))?;
    }

    let nanos = u64::try_from(total).map_err(|_| format!("duration too large: {}", s))?;
    Ok(Duration::from_nanos(nanos))
}

/// Render a duration in the largest whole unit that represents it exactly.
///
/// The output always parses back to the same value with [`parse_duration`].
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    for (unit, scale) in [
        ("h", 3_600 * NANOS_PER_SEC),
        ("m", 60 * NANOS_PER_SEC),
        ("s", NANOS_PER_SEC),
        ("ms", 1_000_000),
        ("us", 1_000),
    ] {
        if nanos % scale == 0 {
            return format!("{}{}", nanos / scale, unit);
        }
    }
    format!("{}ns", nanos)
}

fn unit_nanos(unit: &str) -> Option<u128> {
    let nanos = match unit {
        "ns" | "nanos" => 1,
        "us" | "µs" | "micros" => 1_000,
        "ms" | "millis" | "millisecond" | "milliseconds" => 1_000_000,
        "" | "s" | "sec" | "secs" | "second" | "seconds" => NANOS_PER_SEC,
        "m" | "min" | "mins" | "minute" | "minutes" => 60 * NANOS_PER_SEC,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600 * NANOS_PER_SEC,
        "d" | "day" | "days" => 86_400 * NANOS_PER_SEC,
        _ => return None,
    };
    Some(nanos)
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
