//! Cadence expressions
//!
//! Accepted forms, all evaluated in UTC:
//! - 5-field cron (`min hour dom month dow`, Sunday = 0)
//! - 6/7-field cron with leading seconds and optional year (Sunday = 1)
//! - `@hourly`, `@daily`/`@midnight`, `@weekly`, `@monthly`, `@yearly`/`@annually`
//! - `@every <duration>` with Go-style durations (`90s`, `1h30m`, `1.5h`, `500ms`)

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::error::{SchedulerError, SchedulerResult};

/// A parsed trigger cadence
#[derive(Debug, Clone)]
pub enum Cadence {
    /// Calendar-based schedule
    Cron {
        expression: String,
        schedule: cron::Schedule,
    },
    /// Fixed interval, measured from the previous fire time
    Every(Duration),
}

impl Cadence {
    /// Parse a cadence expression
    pub fn parse(expression: &str) -> SchedulerResult<Self> {
        let expr = expression.trim();
        if expr.is_empty() {
            return Err(SchedulerError::invalid_cadence(expression, "expression is empty"));
        }

        if let Some(rest) = expr.strip_prefix("@every") {
            let interval = parse_go_duration(rest.trim())
                .map_err(|reason| SchedulerError::invalid_cadence(expression, reason))?;
            return Ok(Self::Every(interval));
        }

        let normalized = normalize_cron(expr)
            .map_err(|reason| SchedulerError::invalid_cadence(expression, reason))?;
        let schedule = cron::Schedule::from_str(&normalized)
            .map_err(|e| SchedulerError::invalid_cadence(expression, e.to_string()))?;

        Ok(Self::Cron {
            expression: expr.to_string(),
            schedule,
        })
    }

    /// Next fire time strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Cron { schedule, .. } => schedule.after(&now).next(),
            Self::Every(interval) => chrono::Duration::from_std(*interval)
                .ok()
                .and_then(|d| now.checked_add_signed(d)),
        }
    }

    /// Time to wait from `now` until the next fire time
    pub fn delay_from(&self, now: DateTime<Utc>) -> Option<Duration> {
        let next = self.next_after(now)?;
        Some((next - now).to_std().unwrap_or(Duration::ZERO))
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cron { expression, .. } => f.write_str(expression),
            Self::Every(interval) => write!(f, "@every {interval:?}"),
        }
    }
}

impl FromStr for Cadence {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Rewrite descriptors and 5-field expressions into the seconds-first form
fn normalize_cron(expr: &str) -> Result<String, String> {
    if let Some(descriptor) = expr.strip_prefix('@') {
        let expanded = match descriptor.to_ascii_lowercase().as_str() {
            "yearly" | "annually" => "0 0 0 1 1 *",
            "monthly" => "0 0 0 1 * *",
            "weekly" => "0 0 0 * * Sun",
            "daily" | "midnight" => "0 0 0 * * *",
            "hourly" => "0 0 * * * *",
            _ => return Err(format!("unknown descriptor '@{descriptor}'")),
        };
        return Ok(expanded.to_string());
    }

    let fields: Vec<&str> = expr.split_whitespace().collect();
    match fields.len() {
        5 => Ok(format!(
            "0 {} {} {} {} {}",
            fields[0],
            fields[1],
            fields[2],
            fields[3],
            shift_day_of_week(fields[4])?
        )),
        6 | 7 => Ok(fields.join(" ")),
        n => Err(format!("expected 5, 6 or 7 fields, got {n}")),
    }
}

/// Shift numeric days from Sunday = 0 (or 7) to Sunday = 1
fn shift_day_of_week(field: &str) -> Result<String, String> {
    let parse_day = |n: &str| -> Result<Option<u32>, String> {
        if n.chars().all(|c| c.is_ascii_alphabetic()) {
            return Ok(None);
        }
        let day: u32 = n
            .parse()
            .map_err(|_| format!("invalid day of week '{n}'"))?;
        if day > 7 {
            return Err(format!("day of week {day} out of range"));
        }
        Ok(Some(day))
    };
    let shift = |day: u32| (day % 7) + 1;

    field
        .split(',')
        .map(|part| {
            let (base, step) = match part.split_once('/') {
                Some((base, step)) => (base, Some(step)),
                None => (part, None),
            };
            let with_step = |base: String| match step {
                Some(step) => format!("{base}/{step}"),
                None => base,
            };

            match base {
                "*" | "?" => Ok(with_step(base.to_string())),
                range if range.contains('-') => {
                    let (from, to) = range.split_once('-').unwrap_or((range, range));
                    match (parse_day(from)?, parse_day(to)?) {
                        (Some(0), Some(7)) => Ok(with_step("1-7".to_string())),
                        (Some(7), Some(7)) => Ok(with_step("1".to_string())),
                        // `x-7` ends on Sunday, which shifts to 1 and would
                        // wrap the range; split it into `x..Sat` plus Sunday.
                        (Some(from), Some(7)) if step.is_none() => {
                            Ok(format!("{}-7,1", shift(from)))
                        }
                        (Some(_), Some(7)) => Err(format!(
                            "stepped range '{part}' ending on 7 is not supported"
                        )),
                        (Some(from), Some(to)) => {
                            Ok(with_step(format!("{}-{}", shift(from), shift(to))))
                        }
                        (None, None) => Ok(with_step(range.to_string())),
                        _ => Err(format!("mixed names and numbers in range '{range}'")),
                    }
                }
                single => Ok(with_step(match parse_day(single)? {
                    Some(day) => shift(day).to_string(),
                    None => single.to_string(),
                })),
            }
        })
        .collect::<Result<Vec<_>, String>>()
        .map(|parts| parts.join(","))
}

/// Parse Go-style durations such as `1h30m`, `90s`, `1.5h`, `250ms`
fn parse_go_duration(raw: &str) -> Result<Duration, String> {
    if raw.is_empty() {
        return Err("@every needs a duration".to_string());
    }

    let mut total = 0f64;
    let mut rest = raw;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("invalid duration '{raw}'"));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| format!("invalid number in duration '{raw}'"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "" => return Err(format!("missing unit in duration '{raw}'")),
            unit => return Err(format!("unknown unit '{unit}' in duration '{raw}'")),
        };
        rest = &rest[unit_len..];
        total += value * seconds_per_unit;
    }

    if total <= 0.0 {
        return Err(format!("duration '{raw}' must be positive"));
    }
    Duration::try_from_secs_f64(total)
        .map_err(|e| format!("duration '{raw}' is out of range: {e}"))
}
