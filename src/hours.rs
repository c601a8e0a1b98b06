use crate::error::ConfigurationError;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timezone label carried by a calendar. Purely informational: virtual time
/// is never converted between zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeZoneTag {
    #[default]
    #[serde(rename = "PST")]
    Pst,
    #[serde(rename = "EST")]
    Est,
    #[serde(rename = "UTC")]
    Utc,
    #[serde(rename = "LOCAL")]
    Local,
}

impl TimeZoneTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeZoneTag::Pst => "PST",
            TimeZoneTag::Est => "EST",
            TimeZoneTag::Utc => "UTC",
            TimeZoneTag::Local => "LOCAL",
        }
    }
}

impl fmt::Display for TimeZoneTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily operating window with a lunch break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub lunch_start: NaiveTime,
    pub lunch_end: NaiveTime,
    pub timezone: TimeZoneTag,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start: hm(9, 0),
            end: hm(17, 0),
            lunch_start: hm(12, 0),
            lunch_end: hm(13, 0),
            timezone: TimeZoneTag::Pst,
        }
    }
}

impl BusinessHours {
    pub fn new(
        start: NaiveTime,
        end: NaiveTime,
        lunch_start: NaiveTime,
        lunch_end: NaiveTime,
        timezone: TimeZoneTag,
    ) -> Result<Self, ConfigurationError> {
        let hours = Self {
            start,
            end,
            lunch_start,
            lunch_end,
            timezone,
        };
        hours.validate()?;
        Ok(hours)
    }

    /// Opening and closing times with the default 12:00-13:00 lunch.
    pub fn with_span(
        start: NaiveTime,
        end: NaiveTime,
        timezone: TimeZoneTag,
    ) -> Result<Self, ConfigurationError> {
        let defaults = Self::default();
        Self::new(start, end, defaults.lunch_start, defaults.lunch_end, timezone)
    }

    /// Checks start < lunch start < lunch end < end.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.start < self.lunch_start && self.lunch_start < self.lunch_end && self.lunch_end < self.end
        {
            return Ok(());
        }
        Err(ConfigurationError::InvalidHours {
            start: self.start.format("%H:%M").to_string(),
            end: self.end.format("%H:%M").to_string(),
            lunch_start: self.lunch_start.format("%H:%M").to_string(),
            lunch_end: self.lunch_end.format("%H:%M").to_string(),
        })
    }

    /// Inside the operating window and outside the lunch window (both bounds inclusive).
    pub fn is_business_hours(&self, time: NaiveTime) -> bool {
        if time < self.start || time > self.end {
            return false;
        }
        !(self.lunch_start <= time && time <= self.lunch_end)
    }

    /// Hours open per day, lunch excluded.
    pub fn total_business_hours(&self) -> f64 {
        let open = seconds_between(self.start, self.end);
        let lunch = seconds_between(self.lunch_start, self.lunch_end);
        (open - lunch) / 3600.0
    }

    pub fn lunch_hours(&self) -> f64 {
        seconds_between(self.lunch_start, self.lunch_end) / 3600.0
    }
}

fn seconds_between(from: NaiveTime, to: NaiveTime) -> f64 {
    (to - from).num_seconds() as f64
}

pub(crate) fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_time(input: &str) -> Result<NaiveTime, ConfigurationError> {
    let trimmed = input.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map(|t| t.with_nanosecond(0).unwrap_or(t))
        .map_err(|err| ConfigurationError::InvalidTime {
            input: input.to_string(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hours_total_seven() {
        let hours = BusinessHours::default();
        assert!((hours.total_business_hours() - 7.0).abs() < 1e-9);
        assert!((hours.lunch_hours() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn lunch_and_edges_are_excluded() {
        let hours = BusinessHours::default();
        assert!(hours.is_business_hours(hm(9, 0)));
        assert!(hours.is_business_hours(hm(11, 59)));
        assert!(!hours.is_business_hours(hm(12, 30)));
        assert!(!hours.is_business_hours(hm(13, 0)));
        assert!(hours.is_business_hours(hm(17, 0)));
        assert!(!hours.is_business_hours(hm(8, 59)));
        assert!(!hours.is_business_hours(hm(17, 1)));
    }

    #[test]
    fn misordered_hours_rejected() {
        let err = BusinessHours::new(hm(9, 0), hm(17, 0), hm(13, 0), hm(12, 0), TimeZoneTag::Utc)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidHours { .. }));
        assert!(BusinessHours::with_span(hm(12, 30), hm(18, 0), TimeZoneTag::Est).is_err());
    }

    #[test]
    fn parse_time_accepts_both_forms() {
        assert_eq!(parse_time("08:30").unwrap(), hm(8, 30));
        assert_eq!(parse_time("23:59:00").unwrap(), hm(23, 59));
        assert!(parse_time("25:00").is_err());
    }
}
