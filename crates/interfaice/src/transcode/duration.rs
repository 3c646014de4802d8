//! ISO-8601 duration text in the `PnDTnHnMn.nS` shape.
//!
//! Formatting never emits a day component: hours grow past 24 instead
//! (`PT49H`), and zero is `PT0S`. Parsing accepts days, signed components and
//! a leading sign on the whole duration.

use std::time::Duration;

use chrono::TimeDelta;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

pub(crate) fn format_std(duration: &Duration) -> String {
    format_parts(duration.as_secs(), duration.subsec_nanos())
}

pub(crate) fn format_delta(delta: &TimeDelta) -> String {
    let magnitude = delta.abs();
    let text = format_parts(
        magnitude.num_seconds().unsigned_abs(),
        magnitude.subsec_nanos().unsigned_abs(),
    );
    if *delta < TimeDelta::zero() {
        format!("-{text}")
    } else {
        text
    }
}

fn format_parts(seconds: u64, nanos: u32) -> String {
    if seconds == 0 && nanos == 0 {
        return "PT0S".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    let mut text = String::from("PT");
    if hours > 0 {
        text.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        text.push_str(&format!("{minutes}M"));
    }
    if seconds > 0 || nanos > 0 {
        text.push_str(&seconds.to_string());
        if nanos > 0 {
            let fraction = format!("{nanos:09}");
            text.push('.');
            text.push_str(fraction.trim_end_matches('0'));
        }
        text.push('S');
    }
    text
}

/// Parses duration text into a signed count of nanoseconds.
pub(crate) fn parse(text: &str) -> Result<i128, String> {
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let rest = rest
        .strip_prefix(['P', 'p'])
        .ok_or_else(|| "missing `P` designator".to_string())?;

    let (date_part, time_part) = match rest.find(['T', 't']) {
        Some(index) => (&rest[..index], Some(&rest[index + 1..])),
        None => (rest, None),
    };

    let mut total: i128 = 0;
    let mut seen_component = false;

    if !date_part.is_empty() {
        let days = date_part
            .strip_suffix(['D', 'd'])
            .ok_or_else(|| format!("unexpected date component `{date_part}`"))?;
        total += parse_whole(days)? * 86_400 * NANOS_PER_SECOND;
        seen_component = true;
    }

    if let Some(mut remaining) = time_part {
        if remaining.is_empty() {
            return Err("no time component after `T`".to_string());
        }
        let mut last_rank = 0;
        while !remaining.is_empty() {
            let end = remaining
                .find(|c: char| c.is_ascii_alphabetic())
                .ok_or_else(|| format!("component `{remaining}` has no unit"))?;
            let number = &remaining[..end];
            let unit = remaining.as_bytes()[end].to_ascii_uppercase();
            let rank = match unit {
                b'H' => 1,
                b'M' => 2,
                b'S' => 3,
                other => return Err(format!("unknown unit `{}`", other as char)),
            };
            if rank <= last_rank {
                return Err("time components are out of order".to_string());
            }
            last_rank = rank;

            total += match unit {
                b'H' => parse_whole(number)? * 3600 * NANOS_PER_SECOND,
                b'M' => parse_whole(number)? * 60 * NANOS_PER_SECOND,
                _ => parse_seconds(number)?,
            };
            remaining = &remaining[end + 1..];
            seen_component = true;
        }
    }

    if !seen_component {
        return Err("no duration components".to_string());
    }
    Ok(if negative { -total } else { total })
}

fn parse_whole(number: &str) -> Result<i128, String> {
    number
        .parse::<i64>()
        .map(i128::from)
        .map_err(|err| format!("`{number}`: {err}"))
}

fn parse_seconds(number: &str) -> Result<i128, String> {
    let (whole, fraction) = match number.split_once(['.', ',']) {
        Some((whole, fraction)) => (whole, fraction),
        None => return parse_whole(number).map(|seconds| seconds * NANOS_PER_SECOND),
    };
    if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid fractional seconds `{number}`"));
    }

    let negative = whole.starts_with('-');
    let seconds = parse_whole(whole.trim_start_matches(['-', '+']))?;
    let padded = format!("{fraction:0<9}");
    let nanos = padded
        .parse::<i128>()
        .map_err(|err| format!("`{number}`: {err}"))?;
    let total = seconds * NANOS_PER_SECOND + nanos;
    Ok(if negative { -total } else { total })
}

pub(crate) fn to_std(nanos: i128) -> Result<Duration, String> {
    if nanos < 0 {
        return Err("negative durations cannot be represented".to_string());
    }
    let seconds = u64::try_from(nanos / NANOS_PER_SECOND)
        .map_err(|_| "duration is out of range".to_string())?;
    Ok(Duration::new(seconds, (nanos % NANOS_PER_SECOND) as u32))
}

pub(crate) fn to_delta(nanos: i128) -> Result<TimeDelta, String> {
    let seconds = i64::try_from(nanos.div_euclid(NANOS_PER_SECOND))
        .map_err(|_| "duration is out of range".to_string())?;
    let subsec = nanos.rem_euclid(NANOS_PER_SECOND) as u32;
    TimeDelta::new(seconds, subsec).ok_or_else(|| "duration is out of range".to_string())
}
