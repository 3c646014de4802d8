use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

use super::duration;
use super::{Rule, Transcoder};
use crate::core::{DecodeError, ScalarKind, TranscodeError, Value};

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Milliseconds as described to the model, widened when that would drop digits.
fn format_instant(instant: &DateTime<Utc>) -> String {
    let precision = if instant.timestamp_subsec_nanos() % 1_000_000 == 0 {
        SecondsFormat::Millis
    } else {
        SecondsFormat::AutoSi
    };
    instant.to_rfc3339_opts(precision, true)
}

/// Built-in rule for one [`ScalarKind`].
#[derive(Debug, Clone, Copy)]
pub struct ScalarRule {
    kind: ScalarKind,
}

impl ScalarRule {
    pub fn new(kind: ScalarKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    fn description(&self) -> &'static str {
        match self.kind {
            ScalarKind::Bool => {
                "a boolean literal (choose exact value from true | false without capitalization)"
            }
            ScalarKind::I8 => "a number literal ranging from -128 to 127, inclusive.",
            ScalarKind::I16 => "a number literal ranging from -32768 to 32767, inclusive.",
            ScalarKind::I32 => {
                "a number literal ranging from -2147483648 to 2147483647, inclusive."
            }
            ScalarKind::I64 => {
                "a number literal ranging from -9223372036854775808 to 9223372036854775807, inclusive."
            }
            ScalarKind::U8 => "a number literal ranging from 0 to 255, inclusive.",
            ScalarKind::U16 => "a number literal ranging from 0 to 65535, inclusive.",
            ScalarKind::U32 => "a number literal ranging from 0 to 4294967295, inclusive.",
            ScalarKind::U64 => {
                "a number literal ranging from 0 to 18446744073709551615, inclusive."
            }
            ScalarKind::F32 => {
                "a number literal ranging from -3.4028235E38 to 3.4028235E38, inclusive."
            }
            ScalarKind::F64 => {
                "a number literal ranging from -1.7976931348623157E308 to 1.7976931348623157E308, inclusive."
            }
            ScalarKind::Char => "a single character literal, e.g. a",
            ScalarKind::String => "a string literal, e.g. hello world (without surrounding quotes)",
            ScalarKind::DateTime => "a datetime literal with format: yyyy-MM-dd HH:mm:ss",
            ScalarKind::Date => "a date literal with format: yyyy-MM-dd",
            ScalarKind::Time => "a time literal with format: HH:mm:ss",
            ScalarKind::Instant => "a datetime literal with format: yyyy-MM-dd'T'HH:mm:ss.SSS'Z'",
            ScalarKind::Duration | ScalarKind::TimeDelta => {
                "a duration literal with ISO-8601 duration format PnDTnHnMn.nS"
            }
        }
    }

    fn mismatch(&self, value: &Value) -> TranscodeError {
        TranscodeError::ValueMismatch {
            type_name: self.kind.type_name().to_string(),
            value: format!("{value:?}"),
        }
    }

    fn literal(&self, raw: &str, reason: impl ToString) -> TranscodeError {
        DecodeError::literal(self.kind.type_name(), raw, reason).into()
    }

    fn number<T>(&self, raw: &str, wrap: fn(T) -> Value) -> Result<Value, TranscodeError>
    where
        T: FromStr,
        T::Err: Display,
    {
        raw.parse::<T>()
            .map(wrap)
            .map_err(|err| self.literal(raw, err))
    }
}

impl Rule for ScalarRule {
    fn describe(&self, _transcoder: &Transcoder) -> Result<String, TranscodeError> {
        Ok(self.description().to_string())
    }

    fn encode(&self, _transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        let text = match (self.kind, value) {
            (ScalarKind::Bool, Value::Bool(inner)) => inner.to_string(),
            (ScalarKind::I8, Value::I8(inner)) => inner.to_string(),
            (ScalarKind::I16, Value::I16(inner)) => inner.to_string(),
            (ScalarKind::I32, Value::I32(inner)) => inner.to_string(),
            (ScalarKind::I64, Value::I64(inner)) => inner.to_string(),
            (ScalarKind::U8, Value::U8(inner)) => inner.to_string(),
            (ScalarKind::U16, Value::U16(inner)) => inner.to_string(),
            (ScalarKind::U32, Value::U32(inner)) => inner.to_string(),
            (ScalarKind::U64, Value::U64(inner)) => inner.to_string(),
            (ScalarKind::F32, Value::F32(inner)) => inner.to_string(),
            (ScalarKind::F64, Value::F64(inner)) => inner.to_string(),
            (ScalarKind::Char, Value::Char(inner)) => inner.to_string(),
            (ScalarKind::String, Value::String(inner)) => inner.clone(),
            (ScalarKind::DateTime, Value::DateTime(inner)) => {
                inner.format(DATE_TIME_FORMAT).to_string()
            }
            (ScalarKind::Date, Value::Date(inner)) => inner.format(DATE_FORMAT).to_string(),
            (ScalarKind::Time, Value::Time(inner)) => inner.format(TIME_FORMAT).to_string(),
            (ScalarKind::Instant, Value::Instant(inner)) => format_instant(inner),
            (ScalarKind::Duration, Value::Duration(inner)) => duration::format_std(inner),
            (ScalarKind::TimeDelta, Value::TimeDelta(inner)) => duration::format_delta(inner),
            (_, other) => return Err(self.mismatch(other)),
        };
        Ok(text)
    }

    fn decode(&self, _transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError> {
        if self.kind == ScalarKind::String {
            return Ok(Value::String(text.to_string()));
        }

        let raw = text.trim();
        match self.kind {
            ScalarKind::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(self.literal(raw, "expected true or false"))
                }
            }
            ScalarKind::I8 => self.number(raw, Value::I8),
            ScalarKind::I16 => self.number(raw, Value::I16),
            ScalarKind::I32 => self.number(raw, Value::I32),
            ScalarKind::I64 => self.number(raw, Value::I64),
            ScalarKind::U8 => self.number(raw, Value::U8),
            ScalarKind::U16 => self.number(raw, Value::U16),
            ScalarKind::U32 => self.number(raw, Value::U32),
            ScalarKind::U64 => self.number(raw, Value::U64),
            ScalarKind::F32 => self.number(raw, Value::F32),
            ScalarKind::F64 => self.number(raw, Value::F64),
            ScalarKind::Char => {
                // A lone whitespace character is a valid literal of its own.
                let candidate = if text.chars().count() == 1 { text } else { raw };
                let mut chars = candidate.chars();
                match (chars.next(), chars.next()) {
                    (Some(single), None) => Ok(Value::Char(single)),
                    _ => Err(self.literal(raw, "expected exactly one character")),
                }
            }
            ScalarKind::DateTime => NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT)
                .map(Value::DateTime)
                .map_err(|err| self.literal(raw, err)),
            ScalarKind::Date => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|err| self.literal(raw, err)),
            ScalarKind::Time => NaiveTime::parse_from_str(raw, TIME_FORMAT)
                .map(Value::Time)
                .map_err(|err| self.literal(raw, err)),
            ScalarKind::Instant => DateTime::parse_from_rfc3339(raw)
                .map(|instant| Value::Instant(instant.with_timezone(&Utc)))
                .map_err(|err| self.literal(raw, err)),
            ScalarKind::Duration => duration::parse(raw)
                .and_then(duration::to_std)
                .map(Value::Duration)
                .map_err(|err| self.literal(raw, err)),
            ScalarKind::TimeDelta => duration::parse(raw)
                .and_then(duration::to_delta)
                .map(Value::TimeDelta)
                .map_err(|err| self.literal(raw, err)),
            ScalarKind::String => Ok(Value::String(text.to_string())),
        }
    }
}
