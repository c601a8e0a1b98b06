use chrono::{Duration, NaiveDate, Weekday};
use persistent_world::event::{Event, EventKind, Priority, RecurrenceRule};
use persistent_world::scheduler::{EventScheduler, SchedulerState};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn titles(events: Vec<Event>) -> Vec<String> {
    events.into_iter().map(|event| event.title).collect()
}

#[test]
fn scheduling_the_same_event_twice_keeps_both() {
    let mut scheduler = EventScheduler::new();
    let event = Event::deadline("Budget due", Priority::High);
    let first = scheduler.schedule_event(d(2024, 7, 10), event.clone());
    let second = scheduler.schedule_event(d(2024, 7, 10), event);

    assert_ne!(first, second);
    assert_eq!(scheduler.one_off_count(), 2);
    assert_eq!(scheduler.events_for_date(d(2024, 7, 10)).len(), 2);
}

#[test]
fn weekly_template_matches_only_its_weekday() {
    let mut scheduler = EventScheduler::new();
    scheduler.schedule_recurring(
        Event::meeting("Weekly Review", 60),
        RecurrenceRule::Weekly {
            weekday: Weekday::Mon,
        },
    );

    let first_monday = d(2024, 7, 1);
    for week in 0..4 {
        let monday = first_monday + Duration::weeks(week);
        assert_eq!(titles(scheduler.events_for_date(monday)), vec!["Weekly Review"]);
        assert!(scheduler
            .events_for_date(monday + Duration::days(1))
            .is_empty());
    }
}

#[test]
fn monthly_and_daily_rules() {
    let mut scheduler = EventScheduler::new();
    scheduler.schedule_recurring(
        Event::new("Payroll", EventKind::Generic),
        RecurrenceRule::Monthly { day_of_month: 15 },
    );
    scheduler.schedule_recurring(Event::meeting("Standup", 15), RecurrenceRule::Daily);

    assert_eq!(
        titles(scheduler.events_for_date(d(2024, 8, 15))),
        vec!["Payroll", "Standup"]
    );
    assert_eq!(titles(scheduler.events_for_date(d(2024, 8, 16))), vec!["Standup"]);
}

#[test]
fn one_offs_come_before_recurring_templates() {
    let mut scheduler = EventScheduler::new();
    scheduler.schedule_recurring(Event::meeting("Standup", 15), RecurrenceRule::Daily);
    scheduler.schedule_event(d(2024, 7, 2), Event::announcement("Reorg"));
    scheduler.schedule_event(d(2024, 7, 2), Event::meeting("Kickoff", 60));

    let events = scheduler.events_for_date(d(2024, 7, 2));
    assert_eq!(titles(events.clone()), vec!["Reorg", "Kickoff", "Standup"]);
    assert_eq!(events[2].recurrence, Some(RecurrenceRule::Daily));
}

#[test]
fn state_survives_json_and_replaces_on_load() {
    let mut scheduler = EventScheduler::new();
    scheduler.schedule_event(
        d(2024, 7, 2),
        Event::meeting("Kickoff", 60).with_attendees(["emp-001", "emp-002"]),
    );
    scheduler.schedule_recurring(
        Event::meeting("Weekly Review", 60),
        RecurrenceRule::Weekly {
            weekday: Weekday::Fri,
        },
    );

    let json = serde_json::to_string(&scheduler.save_state()).unwrap();
    let state: SchedulerState = serde_json::from_str(&json).unwrap();

    let mut restored = EventScheduler::new();
    restored.schedule_event(d(2024, 7, 3), Event::announcement("Dropped on load"));
    restored.load_state(state);

    assert_eq!(restored, scheduler);
    assert!(restored.events_for_date(d(2024, 7, 3)).is_empty());
    assert_eq!(
        restored.events_for_date(d(2024, 7, 2))[0].attendees,
        vec!["emp-001", "emp-002"]
    );
}

#[test]
fn unknown_event_kind_reads_as_generic() {
    let json = r#"{"scheduled_events":{"2024-07-02":[{"event_id":"7d5b3c1e-8a51-4c4f-9a43-2f0cbbd2b0f1","title":"Fire drill","type":"drill"}]}}"#;
    let state: SchedulerState = serde_json::from_str(json).unwrap();

    let mut scheduler = EventScheduler::new();
    scheduler.load_state(state);
    let events = scheduler.events_for_date(d(2024, 7, 2));
    assert_eq!(events[0].kind, EventKind::Generic);
    assert_eq!(events[0].priority, Priority::Medium);
}

#[test]
fn merging_own_snapshot_is_a_no_op() {
    let mut scheduler = EventScheduler::new();
    scheduler.schedule_event(d(2024, 7, 2), Event::meeting("Kickoff", 60));
    scheduler.schedule_recurring(Event::meeting("Standup", 15), RecurrenceRule::Daily);
    let before = scheduler.clone();

    scheduler.merge_state(before.save_state());
    assert_eq!(scheduler, before);
}

#[test]
fn merging_drops_re_registered_standing_template() {
    let mut earlier = EventScheduler::new();
    earlier.schedule_recurring(Event::meeting("Standup", 15), RecurrenceRule::Daily);

    let mut fresh = EventScheduler::new();
    fresh.schedule_recurring(Event::meeting("Standup", 15), RecurrenceRule::Daily);
    fresh.schedule_recurring(Event::meeting("Retro", 45), RecurrenceRule::Weekly {
        weekday: Weekday::Fri,
    });
    fresh.merge_state(earlier.save_state());

    assert_eq!(fresh.recurring().count(), 2);
    assert_eq!(titles(fresh.events_for_date(d(2024, 7, 5))), vec!["Standup", "Retro"]);
}
