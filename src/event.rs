use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Meeting,
    Deadline,
    Announcement,
    Training,
    Review,
    /// Anything the injector has no dedicated bookkeeping for, including
    /// kinds this build does not know.
    #[default]
    #[serde(other)]
    Generic,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Meeting => "meeting",
            EventKind::Deadline => "deadline",
            EventKind::Announcement => "announcement",
            EventKind::Training => "training",
            EventKind::Review => "review",
            EventKind::Generic => "generic",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Which dates a recurring template applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecurrenceRule {
    Daily,
    Weekly { weekday: Weekday },
    Monthly { day_of_month: u32 },
}

impl RecurrenceRule {
    /// Whether a template with this rule occurs on `date`.
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            RecurrenceRule::Daily => true,
            RecurrenceRule::Weekly { weekday } => date.weekday() == *weekday,
            RecurrenceRule::Monthly { day_of_month } => date.day() == *day_of_month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: EventKind,
    #[serde(default)]
    pub attendees: Vec<String>,
    /// Minutes.
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Event {
    pub fn new(title: impl Into<String>, kind: EventKind) -> Self {
        Self {
            title: title.into(),
            kind,
            attendees: Vec::new(),
            duration: 0,
            priority: Priority::default(),
            recurrence: None,
            notes: None,
        }
    }

    /// Meeting lasting `duration` minutes.
    pub fn meeting(title: impl Into<String>, duration: u32) -> Self {
        Self::new(title, EventKind::Meeting).with_duration(duration)
    }

    pub fn deadline(title: impl Into<String>, priority: Priority) -> Self {
        Self::new(title, EventKind::Deadline).with_priority(priority)
    }

    pub fn announcement(title: impl Into<String>) -> Self {
        Self::new(title, EventKind::Announcement)
    }

    pub fn with_attendees<I, S>(mut self, attendees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attendees = attendees.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration = minutes;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Mark the event with its recurrence rule.
    pub fn recurring(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_reads_as_generic() {
        let event: Event =
            serde_json::from_str(r#"{"title":"Offsite","type":"party"}"#).unwrap();
        assert_eq!(event.kind, EventKind::Generic);
        assert_eq!(event.priority, Priority::Medium);
    }

    #[test]
    fn rule_serializes_with_kind_tag() {
        let rule = RecurrenceRule::Monthly { day_of_month: 15 };
        let json = serde_json::to_value(rule).unwrap();
        assert_eq!(json["kind"], "monthly");
        assert_eq!(json["day_of_month"], 15);
    }
}
