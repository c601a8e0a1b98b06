use crate::error::ConfigurationError;
use crate::hours::{BusinessHours, TimeZoneTag};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{error, info, warn};

/// How far `next_working_day` scans before giving up.
pub const WORKING_DAY_SEARCH_LIMIT: i64 = 365;

pub const DEFAULT_HOLIDAY_YEARS: (i32, i32) = (2024, 2030);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekday,
    Weekend,
    Holiday,
    Special,
}

impl DayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::Weekday => "weekday",
            DayType::Weekend => "weekend",
            DayType::Holiday => "holiday",
            DayType::Special => "special",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessDay {
    pub date: NaiveDate,
    pub day_type: DayType,
    pub is_working_day: bool,
    pub hours: BusinessHours,
    #[serde(default)]
    pub special_events: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl BusinessDay {
    /// Business hours available on this day, zero when it is not a working day.
    pub fn working_hours(&self) -> f64 {
        if !self.is_working_day {
            return 0.0;
        }
        self.hours.total_business_hours()
    }
}

/// Holiday table, per-date overrides and the weekly working pattern.
///
/// Classification precedence is fixed: holiday, then custom override, then
/// the weekday/weekend default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessCalendar {
    holidays: BTreeMap<NaiveDate, String>,
    special_days: BTreeMap<NaiveDate, Vec<String>>,
    custom_working_days: BTreeMap<NaiveDate, bool>,
    non_working_days: HashSet<Weekday>,
    hours: BusinessHours,
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self::with_year_range(DEFAULT_HOLIDAY_YEARS.0, DEFAULT_HOLIDAY_YEARS.1)
    }
}

impl BusinessCalendar {
    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Mon-Fri week, default hours and no holidays.
    pub fn empty(hours: BusinessHours) -> Self {
        Self {
            holidays: BTreeMap::new(),
            special_days: BTreeMap::new(),
            custom_working_days: BTreeMap::new(),
            non_working_days: HashSet::from([Weekday::Sat, Weekday::Sun]),
            hours,
        }
    }

    /// US federal holidays for every year in the (inclusive) range.
    pub fn with_year_range(start_year: i32, end_year: i32) -> Self {
        let (start, end) = if start_year <= end_year {
            (start_year, end_year)
        } else {
            (end_year, start_year)
        };

        let mut calendar = Self::empty(BusinessHours::default());
        for year in start..=end {
            calendar.add_us_holidays(year);
        }
        calendar
    }

    /// Replace the opening hours used for every working day.
    pub fn with_hours(mut self, hours: BusinessHours) -> Self {
        self.hours = hours;
        self
    }

    fn add_us_holidays(&mut self, year: i32) {
        let fixed = [
            (1, 1, "New Year's Day"),
            (7, 4, "Independence Day"),
            (11, 11, "Veterans Day"),
            (12, 25, "Christmas Day"),
        ];
        for (month, day, name) in fixed {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                self.holidays.insert(date, name.to_string());
            }
        }

        let floating = [
            (1, Weekday::Mon, 3, "Martin Luther King Jr. Day"),
            (2, Weekday::Mon, 3, "Presidents Day"),
            (9, Weekday::Mon, 1, "Labor Day"),
            (10, Weekday::Mon, 2, "Columbus Day"),
            (11, Weekday::Thu, 4, "Thanksgiving"),
        ];
        for (month, weekday, n, name) in floating {
            if let Some(date) = Self::nth_weekday(year, month, weekday, n) {
                self.holidays.insert(date, name.to_string());
            }
        }

        if let Some(date) = Self::last_weekday(year, 5, Weekday::Mon) {
            self.holidays.insert(date, "Memorial Day".to_string());
        }
    }

    /// nth occurrence of a weekday in a month
    fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
        let mut date = NaiveDate::from_ymd_opt(year, month, 1)?;
        let mut count = 0;

        while date.month() == month {
            if date.weekday() == weekday {
                count += 1;
                if count == n {
                    return Some(date);
                }
            }
            date = date + Duration::days(1);
        }
        None
    }

    fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
        let mut date = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        date = date - Duration::days(1);

        while date.weekday() != weekday {
            date = date - Duration::days(1);
        }
        Some(date)
    }

    pub fn hours(&self) -> &BusinessHours {
        &self.hours
    }

    pub fn timezone(&self) -> TimeZoneTag {
        self.hours.timezone
    }

    pub fn set_timezone(&mut self, timezone: TimeZoneTag) {
        self.hours.timezone = timezone;
    }

    /// Holidays by date, both the generated US table and added ones.
    pub fn holidays(&self) -> &BTreeMap<NaiveDate, String> {
        &self.holidays
    }

    /// Explicit working / non-working overrides by date.
    pub fn custom_working_days(&self) -> &BTreeMap<NaiveDate, bool> {
        &self.custom_working_days
    }

    /// Labels attached to `date`, empty when there are none.
    pub fn special_events(&self, date: NaiveDate) -> &[String] {
        self.special_days
            .get(&date)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Insert or rename a holiday.
    pub fn add_holiday(&mut self, date: NaiveDate, name: impl Into<String>) {
        let name = name.into();
        info!(%date, holiday = %name, "added holiday");
        self.holidays.insert(date, name);
    }

    /// Attach a label to `date`. Special events never change whether it is a working day.
    pub fn add_special_event(&mut self, date: NaiveDate, label: impl Into<String>) {
        let label = label.into();
        info!(%date, event = %label, "added special event");
        self.special_days.entry(date).or_default().push(label);
    }

    /// Force `date` to be a working or non-working day. Holidays still win.
    pub fn set_custom_working_day(&mut self, date: NaiveDate, is_working: bool) {
        if let Some(holiday) = self.holidays.get(&date) {
            warn!(%date, %holiday, is_working, "override is shadowed by a holiday");
        }
        info!(
            %date,
            "set as {} day",
            if is_working { "working" } else { "non-working" }
        );
        self.custom_working_days.insert(date, is_working);
    }

    /// Set the weekly working pattern (e.g. Mon-Sat for six-day weeks).
    pub fn set_working_days(&mut self, days: &[Weekday]) {
        self.non_working_days.clear();
        for day in Self::ALL_WEEKDAYS {
            if !days.contains(&day) {
                self.non_working_days.insert(day);
            }
        }
    }

    /// Classify `date`: holiday, then custom override, then weekday / weekend.
    pub fn business_day(&self, date: NaiveDate) -> BusinessDay {
        let special_events = self.special_events(date).to_vec();

        if let Some(name) = self.holidays.get(&date) {
            return BusinessDay {
                date,
                day_type: DayType::Holiday,
                is_working_day: false,
                hours: self.hours,
                special_events,
                notes: format!("Holiday: {name}"),
            };
        }

        let (day_type, is_working_day) = match self.custom_working_days.get(&date) {
            Some(true) => (DayType::Special, true),
            Some(false) => (DayType::Weekend, false),
            None if self.non_working_days.contains(&date.weekday()) => (DayType::Weekend, false),
            None => (DayType::Weekday, true),
        };

        BusinessDay {
            date,
            day_type,
            is_working_day,
            hours: self.hours,
            special_events,
            notes: String::new(),
        }
    }

    /// Shorthand for `business_day(date).is_working_day`.
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.business_day(date).is_working_day
    }

    /// First working day strictly after `from`, scanning at most
    /// [`WORKING_DAY_SEARCH_LIMIT`] days.
    pub fn try_next_working_day(&self, from: NaiveDate) -> Result<NaiveDate, ConfigurationError> {
        (1..=WORKING_DAY_SEARCH_LIMIT)
            .map(|offset| from + Duration::days(offset))
            .find(|date| self.is_working_day(*date))
            .ok_or(ConfigurationError::NoWorkingDay {
                from,
                limit_days: WORKING_DAY_SEARCH_LIMIT,
            })
    }

    /// Like [`Self::try_next_working_day`], degrading to `from + 1` when no
    /// working day exists inside the search window.
    pub fn next_working_day(&self, from: NaiveDate) -> NaiveDate {
        match self.try_next_working_day(from) {
            Ok(date) => date,
            Err(err) => {
                error!(%from, error = %err, "falling back to the following calendar day");
                from + Duration::days(1)
            }
        }
    }

    /// Working days in `[start, end]`, ascending.
    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut current = start;

        while current <= end {
            if self.is_working_day(current) {
                days.push(current);
            }
            current = current + Duration::days(1);
        }
        days
    }

    /// Upsert holidays and overrides restored from a clock snapshot.
    pub(crate) fn absorb_overrides(
        &mut self,
        holidays: &BTreeMap<NaiveDate, String>,
        custom_working_days: &BTreeMap<NaiveDate, bool>,
    ) {
        self.holidays
            .extend(holidays.iter().map(|(date, name)| (*date, name.clone())));
        self.custom_working_days
            .extend(custom_working_days.iter().map(|(date, working)| (*date, *working)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn generated_2024_table_matches_published_dates() {
        let cal = BusinessCalendar::with_year_range(2024, 2024);
        let expected = [
            d(2024, 1, 1),
            d(2024, 1, 15),
            d(2024, 2, 19),
            d(2024, 5, 27),
            d(2024, 7, 4),
            d(2024, 9, 2),
            d(2024, 10, 14),
            d(2024, 11, 11),
            d(2024, 11, 28),
            d(2024, 12, 25),
        ];
        let actual: Vec<NaiveDate> = cal.holidays().keys().copied().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn nth_weekday_out_of_range_is_none() {
        assert!(BusinessCalendar::nth_weekday(2024, 2, Weekday::Mon, 5).is_none());
        assert_eq!(
            BusinessCalendar::last_weekday(2024, 12, Weekday::Tue),
            Some(d(2024, 12, 31))
        );
    }
}
