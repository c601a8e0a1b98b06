use crate::event::{Event, RecurrenceRule};
use crate::hours::{BusinessHours, TimeZoneTag, hm};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldType {
    #[default]
    Business,
    Research,
    Hospital,
    Education,
    Custom,
}

impl WorldType {
    pub const ALL: [WorldType; 5] = [
        WorldType::Business,
        WorldType::Research,
        WorldType::Hospital,
        WorldType::Education,
        WorldType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorldType::Business => "business",
            WorldType::Research => "research",
            WorldType::Hospital => "hospital",
            WorldType::Education => "education",
            WorldType::Custom => "custom",
        }
    }

    /// Default configuration for this kind of organization.
    pub fn profile(&self) -> WorldProfile {
        match self {
            WorldType::Business => WorldProfile {
                world_type: *self,
                name: "Corporate Business Simulation".into(),
                description: "Standard business environment with departments, projects, and corporate hierarchy".into(),
                hours: span(9, 0, 17, 0, TimeZoneTag::Pst),
                max_employee_workload: 40.0,
                meeting_cadence: MeetingCadence::Daily,
                department_structure: departments(&[
                    ("Executive", &["CEO", "VP Engineering", "VP Marketing"]),
                    ("Engineering", &["VP Engineering", "Project Manager", "Senior Engineer", "Junior Developer"]),
                    ("Marketing", &["VP Marketing", "Marketing Manager"]),
                    ("Sales", &["Sales Representative"]),
                ]),
                required_skills: strings(&["communication", "project_management", "technical_skills", "leadership"]),
                custom_settings: flags(&["quarterly_reviews", "sprint_planning", "product_development"]),
            },
            WorldType::Research => WorldProfile {
                world_type: *self,
                name: "Research Institution Simulation".into(),
                description: "Academic research environment with labs, publications, and scientific collaboration".into(),
                hours: span(8, 0, 18, 0, TimeZoneTag::Est),
                max_employee_workload: 40.0,
                meeting_cadence: MeetingCadence::Weekly,
                department_structure: departments(&[
                    ("Administration", &["Research Director", "Grant Coordinator"]),
                    ("Research", &["Principal Investigator", "Senior Researcher", "Research Scientist", "PhD Student"]),
                    ("Support", &["Lab Technician"]),
                ]),
                required_skills: strings(&["research_methodology", "data_analysis", "scientific_writing", "collaboration"]),
                custom_settings: flags(&["publication_cycles", "grant_applications", "peer_review", "conference_presentations"]),
            },
            WorldType::Hospital => WorldProfile {
                world_type: *self,
                name: "Hospital Operations Simulation".into(),
                description: "Healthcare facility with medical staff, patients, and clinical protocols".into(),
                hours: span(0, 0, 23, 59, TimeZoneTag::Pst),
                max_employee_workload: 60.0,
                meeting_cadence: MeetingCadence::Daily,
                department_structure: departments(&[
                    ("Administration", &["Chief of Medicine"]),
                    ("Clinical", &["Department Head", "Attending Physician", "Resident"]),
                    ("Nursing", &["Nurse Manager", "Registered Nurse"]),
                    ("Support", &["Medical Technician"]),
                ]),
                required_skills: strings(&["medical_knowledge", "patient_care", "emergency_response", "teamwork"]),
                custom_settings: flags(&["shift_schedules", "patient_rounds", "emergency_protocols", "quality_reviews"]),
            },
            WorldType::Education => WorldProfile {
                world_type: *self,
                name: "Educational Institution Simulation".into(),
                description: "School or university environment with faculty, students, and academic programs".into(),
                hours: span(8, 0, 16, 0, TimeZoneTag::Pst),
                max_employee_workload: 40.0,
                meeting_cadence: MeetingCadence::Weekly,
                department_structure: departments(&[
                    ("Administration", &["Principal/Dean", "Academic Coordinator"]),
                    ("Academic", &["Department Chair", "Professor", "Assistant Professor", "Teaching Assistant"]),
                    ("Support", &["Support Staff"]),
                ]),
                required_skills: strings(&["teaching", "curriculum_development", "student_assessment", "academic_research"]),
                custom_settings: flags(&["semester_planning", "curriculum_review", "student_assessments", "faculty_meetings"]),
            },
            WorldType::Custom => WorldProfile {
                world_type: *self,
                name: "Custom Simulation".into(),
                description: "User-defined organization".into(),
                hours: BusinessHours::default(),
                max_employee_workload: 40.0,
                meeting_cadence: MeetingCadence::None,
                department_structure: BTreeMap::new(),
                required_skills: Vec::new(),
                custom_settings: BTreeMap::new(),
            },
        }
    }
}

impl fmt::Display for WorldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingCadence {
    Daily,
    Weekly,
    Monthly,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldProfile {
    pub world_type: WorldType,
    pub name: String,
    pub description: String,
    pub hours: BusinessHours,
    pub max_employee_workload: f64,
    pub meeting_cadence: MeetingCadence,
    pub department_structure: BTreeMap<String, Vec<String>>,
    pub required_skills: Vec<String>,
    pub custom_settings: BTreeMap<String, bool>,
}

impl WorldProfile {
    pub fn timezone(&self) -> TimeZoneTag {
        self.hours.timezone
    }

    /// The standing meeting implied by the cadence, if any.
    pub fn recurring_meeting(&self) -> Option<(Event, RecurrenceRule)> {
        match self.meeting_cadence {
            MeetingCadence::Daily => Some((
                Event::meeting(format!("{} Daily Standup", self.name), 30),
                RecurrenceRule::Daily,
            )),
            MeetingCadence::Weekly => Some((
                Event::meeting(format!("{} Weekly Review", self.name), 60),
                RecurrenceRule::Weekly {
                    weekday: Weekday::Mon,
                },
            )),
            MeetingCadence::Monthly => Some((
                Event::meeting(format!("{} Monthly Review", self.name), 90),
                RecurrenceRule::Monthly { day_of_month: 1 },
            )),
            MeetingCadence::None => None,
        }
    }
}

fn span(start_h: u32, start_m: u32, end_h: u32, end_m: u32, timezone: TimeZoneTag) -> BusinessHours {
    BusinessHours {
        start: hm(start_h, start_m),
        end: hm(end_h, end_m),
        timezone,
        ..BusinessHours::default()
    }
}

fn departments(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(name, roles)| (name.to_string(), strings(roles)))
        .collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn flags(names: &[&str]) -> BTreeMap<String, bool> {
    names.iter().map(|name| (name.to_string(), true)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_profile_has_valid_hours() {
        for world_type in WorldType::ALL {
            let profile = world_type.profile();
            assert_eq!(profile.world_type, world_type);
            profile.hours.validate().unwrap();
        }
    }

    #[test]
    fn cadence_drives_standing_meeting() {
        let (event, rule) = WorldType::Research.profile().recurring_meeting().unwrap();
        assert_eq!(event.title, "Research Institution Simulation Weekly Review");
        assert_eq!(rule, RecurrenceRule::Weekly { weekday: Weekday::Mon });
        assert!(WorldType::Custom.profile().recurring_meeting().is_none());
    }
}
