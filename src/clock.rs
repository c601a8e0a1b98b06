use crate::calendar::{BusinessCalendar, BusinessDay, DayType};
use crate::event::{Event, RecurrenceRule};
use crate::hours::{BusinessHours, TimeZoneTag};
use crate::scheduler::{EventScheduler, ScheduledEvent, SchedulerState};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Serialized clock, embedded in every world snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockState {
    pub virtual_date: NaiveDate,
    pub virtual_time: NaiveTime,
    pub days_elapsed: u32,
    pub total_hours: f64,
    pub speed: f64,
    pub timezone: TimeZoneTag,
    #[serde(default)]
    pub daily_events: BTreeMap<NaiveDate, Vec<ScheduledEvent>>,
    #[serde(default)]
    pub recurring_events: Vec<ScheduledEvent>,
    #[serde(default)]
    pub custom_holidays: BTreeMap<NaiveDate, String>,
    #[serde(default)]
    pub custom_working_days: BTreeMap<NaiveDate, bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSummary {
    pub current_virtual_date: NaiveDate,
    pub current_virtual_time: NaiveTime,
    pub day_type: DayType,
    pub is_working_day: bool,
    pub is_business_hours: bool,
    pub remaining_business_hours_today: f64,
    pub simulation_days_elapsed: u32,
    pub total_business_hours_simulated: f64,
    pub timezone: TimeZoneTag,
    pub events_today: usize,
    pub special_events: Vec<String>,
}

/// Virtual clock for a simulated organization.
///
/// The clock never reads wall-clock time. It owns the business calendar and
/// the event scheduler, so calendar overrides and scheduled events travel
/// with [`ClockState`].
#[derive(Debug, Clone)]
pub struct BusinessTimeManager {
    date: NaiveDate,
    time: NaiveTime,
    days_elapsed: u32,
    total_hours: f64,
    speed: f64,
    calendar: BusinessCalendar,
    scheduler: EventScheduler,
}

impl BusinessTimeManager {
    /// Clock at business start on `start_date` with the default calendar.
    pub fn new(start_date: NaiveDate) -> Self {
        Self::with_calendar(start_date, BusinessCalendar::default())
    }

    /// Clock at business start on `start_date` using `calendar`.
    pub fn with_calendar(start_date: NaiveDate, calendar: BusinessCalendar) -> Self {
        let time = calendar.hours().start;
        info!(%start_date, timezone = %calendar.timezone(), "initialized business clock");
        Self {
            date: start_date,
            time,
            days_elapsed: 0,
            total_hours: 0.0,
            speed: 1.0,
            calendar,
            scheduler: EventScheduler::new(),
        }
    }

    /// Set the simulation speed multiplier.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn current_date(&self) -> NaiveDate {
        self.date
    }

    pub fn current_time(&self) -> NaiveTime {
        self.time
    }

    /// Virtual date and time combined.
    pub fn current_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Days advanced since the clock was created, carried across restores.
    pub fn days_elapsed(&self) -> u32 {
        self.days_elapsed
    }

    /// Business hours simulated so far.
    pub fn total_hours(&self) -> f64 {
        self.total_hours
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    pub fn calendar_mut(&mut self) -> &mut BusinessCalendar {
        &mut self.calendar
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut EventScheduler {
        &mut self.scheduler
    }

    fn hours(&self) -> &BusinessHours {
        self.calendar.hours()
    }

    /// Calendar classification of the current virtual date.
    pub fn current_business_day(&self) -> BusinessDay {
        self.calendar.business_day(self.date)
    }

    /// Jump to the next working day after the current date and reset to business start.
    pub fn advance_to_next_business_day(&mut self) -> BusinessDay {
        self.date = self.calendar.next_working_day(self.date);
        self.start_of_day()
    }

    /// Move exactly one calendar day, whatever kind of day it is.
    pub fn advance_to_next_day(&mut self) -> BusinessDay {
        self.date = self.date + Duration::days(1);
        self.start_of_day()
    }

    fn start_of_day(&mut self) -> BusinessDay {
        self.time = self.hours().start;
        self.days_elapsed += 1;
        let day = self.current_business_day();
        info!(date = %self.date, day_type = %day.day_type, "advanced clock");
        day
    }

    /// Advance virtual time. Returns whether the clock is still inside
    /// business hours; crossing midnight clamps to closing time and returns
    /// `false`. A step too large for the calendar counts as crossing midnight.
    pub fn advance_time(&mut self, hours: f64) -> bool {
        let step = if hours.is_finite() {
            TimeDelta::try_milliseconds((hours * 3_600_000.0).round() as i64)
        } else {
            Some(TimeDelta::zero())
        };
        let from = self.time;
        let target = step.and_then(|step| self.current_datetime().checked_add_signed(step));

        let business_day = self.current_business_day();
        let window = business_day.hours;
        let Some(target) = target.filter(|target| target.date() == self.date) else {
            let closing = window.end;
            if business_day.is_working_day && closing > from {
                self.total_hours += business_overlap(&window, from, closing);
            }
            self.time = closing;
            debug!(date = %self.date, "advance crossed midnight, clamped to closing time");
            return false;
        };

        self.time = target.time();
        if !business_day.is_working_day {
            return false;
        }
        let now = self.time;
        if now > from {
            self.total_hours += business_overlap(&window, from, now);
        }
        window.is_business_hours(now)
    }

    /// Jump straight to `date` without touching the time of day or counters.
    pub fn set_virtual_date(&mut self, date: NaiveDate) {
        let previous = self.date;
        self.date = date;
        info!(%previous, current = %date, "set virtual date");
    }

    /// Position the clock at the start of business on `date`.
    pub fn position_at(&mut self, date: NaiveDate) {
        self.set_virtual_date(date);
        self.time = self.hours().start;
    }

    /// Continue a restored clock on a later simulated day.
    pub fn resume_at(&mut self, date: NaiveDate) {
        if date != self.date {
            self.days_elapsed += 1;
        }
        self.position_at(date);
    }

    /// Whether the current virtual time falls inside working hours of a working day.
    pub fn is_business_hours(&self) -> bool {
        let day = self.current_business_day();
        day.is_working_day && day.hours.is_business_hours(self.time)
    }

    /// Business hours left today. Lunch is subtracted only while it is still ahead.
    pub fn remaining_business_hours_today(&self) -> f64 {
        let day = self.current_business_day();
        if !day.is_working_day {
            return 0.0;
        }

        let hours = day.hours;
        if self.time >= hours.end {
            return 0.0;
        }

        let mut remaining = (hours.end - self.time).num_seconds() as f64 / 3600.0;
        if self.time < hours.lunch_start {
            remaining -= hours.lunch_hours();
        }
        remaining.max(0.0)
    }

    /// Working days after today up to and including `target`.
    pub fn business_days_until(&self, target: NaiveDate) -> usize {
        if target <= self.date {
            return 0;
        }
        self.calendar
            .working_days_between(self.date + Duration::days(1), target)
            .len()
    }

    /// Add a one-off event on `date`. Scheduling the same event twice keeps both.
    pub fn schedule_event(&mut self, date: NaiveDate, event: Event) -> Uuid {
        self.scheduler.schedule_event(date, event)
    }

    /// Register a recurring template.
    pub fn schedule_recurring(&mut self, template: Event, rule: RecurrenceRule) -> Uuid {
        self.scheduler.schedule_recurring(template, rule)
    }

    /// One-off events on `date` followed by every matching recurring template.
    pub fn events_for_date(&self, date: NaiveDate) -> Vec<Event> {
        self.scheduler.events_for_date(date)
    }

    pub fn events_for_current_day(&self) -> Vec<Event> {
        self.events_for_date(self.date)
    }

    /// Snapshot of the clock position for reporting.
    pub fn time_summary(&self) -> TimeSummary {
        let day = self.current_business_day();
        TimeSummary {
            current_virtual_date: self.date,
            current_virtual_time: self.time,
            day_type: day.day_type,
            is_working_day: day.is_working_day,
            is_business_hours: self.is_business_hours(),
            remaining_business_hours_today: self.remaining_business_hours_today(),
            simulation_days_elapsed: self.days_elapsed,
            total_business_hours_simulated: self.total_hours,
            timezone: self.calendar.timezone(),
            events_today: self.events_for_current_day().len(),
            special_events: day.special_events,
        }
    }

    /// Serializable state including the event journal and calendar overrides.
    pub fn save_state(&self) -> ClockState {
        let SchedulerState {
            scheduled_events,
            recurring_events,
        } = self.scheduler.save_state();

        ClockState {
            virtual_date: self.date,
            virtual_time: self.time,
            days_elapsed: self.days_elapsed,
            total_hours: self.total_hours,
            speed: self.speed,
            timezone: self.calendar.timezone(),
            daily_events: scheduled_events,
            recurring_events,
            custom_holidays: self.calendar.holidays().clone(),
            custom_working_days: self.calendar.custom_working_days().clone(),
        }
    }

    /// Restore a saved clock. Position and counters are replaced; calendar
    /// overrides are upserted and the event journal is merged by entry id.
    pub fn load_state(&mut self, state: &ClockState) {
        self.date = state.virtual_date;
        self.time = state.virtual_time;
        self.days_elapsed = state.days_elapsed;
        self.total_hours = state.total_hours;
        self.speed = state.speed;
        self.calendar.set_timezone(state.timezone);
        self.calendar
            .absorb_overrides(&state.custom_holidays, &state.custom_working_days);
        self.scheduler.merge_state(SchedulerState {
            scheduled_events: state.daily_events.clone(),
            recurring_events: state.recurring_events.clone(),
        });
        info!(date = %self.date, "loaded clock state");
    }
}

/// Business hours elapsed between `from` and `to` on a working day.
fn business_overlap(hours: &BusinessHours, from: NaiveTime, to: NaiveTime) -> f64 {
    let segment = |start: NaiveTime, end: NaiveTime| {
        let lo = from.max(start);
        let hi = to.min(end);
        if hi > lo {
            (hi - lo).num_seconds() as f64 / 3600.0
        } else {
            0.0
        }
    };
    segment(hours.start, hours.lunch_start) + segment(hours.lunch_end, hours.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hours::hm;

    #[test]
    fn overlap_skips_lunch() {
        let hours = BusinessHours::default();
        let worked = business_overlap(&hours, hm(11, 0), hm(14, 0));
        assert!((worked - 2.0).abs() < 1e-9);
        assert_eq!(business_overlap(&hours, hm(18, 0), hm(20, 0)), 0.0);
    }
}
