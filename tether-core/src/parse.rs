use crate::consume_while;
use std::time::Duration;

/// Accepts `1 t true 0 f false` in any case, any other non-empty value counts as enabled.
pub(crate) fn parse_bool(value: &str) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => true,
        "0" | "f" | "false" | "" => false,
        _ => true,
    }
}

/// Integer with an optional sign and `0x`, `0o`, `0b` prefixes. Garbage yields 0.
pub(crate) fn parse_int(value: &str) -> usize {
    let value = value.trim().replace('_', "");
    let (digits, radix) = match value.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => (&value[2..], 16),
        Some("0o") => (&value[2..], 8),
        Some("0b") => (&value[2..], 2),
        _ => (value.as_str(), 10),
    };
    usize::from_str_radix(digits.trim_start_matches('+'), radix).unwrap_or(0)
}

/// Duration written with `ns us µs ms s m h` units, possibly chained (`1h30m`, `1.5s`).
/// Anything unparsable yields zero.
pub(crate) fn parse_duration(value: &str) -> Duration {
    let mut input = value.trim();
    if input == "0" {
        return Duration::ZERO;
    }
    let mut nanos = 0.0_f64;
    while !input.is_empty() {
        let number = consume_while(&mut input, |c| c.is_ascii_digit() || *c == '.');
        let unit = consume_while(&mut input, |c| !c.is_ascii_digit() && *c != '.');
        let Ok(number) = number.parse::<f64>() else {
            return Duration::ZERO;
        };
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 6e10,
            "h" => 3.6e12,
            _ => return Duration::ZERO,
        };
        nanos += (number * scale).round();
    }
    Duration::from_nanos(nanos as u64)
}
