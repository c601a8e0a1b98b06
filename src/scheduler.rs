use crate::event::{Event, RecurrenceRule};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

/// An event as stored by the scheduler: the caller's event plus a generated
/// entry id. Two identical events scheduled twice are two entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    #[serde(rename = "event_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub event: Event,
}

impl ScheduledEvent {
    fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerState {
    #[serde(default)]
    pub scheduled_events: BTreeMap<NaiveDate, Vec<ScheduledEvent>>,
    #[serde(default)]
    pub recurring_events: Vec<ScheduledEvent>,
}

/// One-off events keyed by date plus recurring templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventScheduler {
    one_offs: BTreeMap<NaiveDate, Vec<ScheduledEvent>>,
    recurring: Vec<ScheduledEvent>,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event for `date`. Not idempotent.
    pub fn schedule_event(&mut self, date: NaiveDate, event: Event) -> Uuid {
        info!(%date, title = %event.title, kind = %event.kind, "scheduled event");
        let entry = ScheduledEvent::new(event);
        let id = entry.id;
        self.one_offs.entry(date).or_default().push(entry);
        id
    }

    /// Append a recurring template. Templates are never deduplicated here.
    pub fn schedule_recurring(&mut self, mut template: Event, rule: RecurrenceRule) -> Uuid {
        info!(title = %template.title, ?rule, "scheduled recurring event");
        template.recurrence = Some(rule);
        let entry = ScheduledEvent::new(template);
        let id = entry.id;
        self.recurring.push(entry);
        id
    }

    /// One-off events for `date` in scheduling order, followed by every
    /// recurring template whose rule matches.
    pub fn events_for_date(&self, date: NaiveDate) -> Vec<Event> {
        let one_offs = self
            .one_offs
            .get(&date)
            .into_iter()
            .flatten()
            .map(|entry| entry.event.clone());

        let recurring = self
            .recurring
            .iter()
            .filter(|entry| {
                entry
                    .event
                    .recurrence
                    .is_some_and(|rule| rule.matches(date))
            })
            .map(|entry| entry.event.clone());

        one_offs.chain(recurring).collect()
    }

    /// Number of one-off entries across all dates.
    pub fn one_off_count(&self) -> usize {
        self.one_offs.values().map(Vec::len).sum()
    }

    pub fn recurring(&self) -> impl Iterator<Item = &Event> {
        self.recurring.iter().map(|entry| &entry.event)
    }

    pub fn is_empty(&self) -> bool {
        self.one_offs.is_empty() && self.recurring.is_empty()
    }

    /// Copy of the one-off journal and recurring templates.
    pub fn save_state(&self) -> SchedulerState {
        SchedulerState {
            scheduled_events: self.one_offs.clone(),
            recurring_events: self.recurring.clone(),
        }
    }

    /// Replace everything with `state`.
    pub fn load_state(&mut self, state: SchedulerState) {
        self.one_offs = state.scheduled_events;
        self.recurring = state.recurring_events;
        debug!(
            one_offs = self.one_off_count(),
            recurring = self.recurring.len(),
            "loaded scheduler state"
        );
    }

    /// Restore `state` while keeping entries scheduled in this process that
    /// the snapshot does not know about. Entries are matched by id, so
    /// merging a snapshot of this very scheduler changes nothing. A live
    /// recurring template identical to a restored one is the same standing
    /// event registered again by a new process and is dropped.
    pub fn merge_state(&mut self, state: SchedulerState) {
        let live = std::mem::take(self);
        self.load_state(state);

        for (date, entries) in live.one_offs {
            let slot = self.one_offs.entry(date).or_default();
            let known: HashSet<Uuid> = slot.iter().map(|entry| entry.id).collect();
            slot.extend(entries.into_iter().filter(|entry| !known.contains(&entry.id)));
        }

        for entry in live.recurring {
            let restored = self
                .recurring
                .iter()
                .any(|known| known.id == entry.id || known.event == entry.event);
            if !restored {
                self.recurring.push(entry);
            }
        }
    }
}
