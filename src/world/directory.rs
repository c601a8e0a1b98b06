use super::{Directory, Subsystem};
use crate::error::StateConsistencyError;
use crate::profile::WorldProfile;
use crate::snapshot::OpaqueState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

const ROSTER_STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub role: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
}

/// Default personnel directory: members keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    members: BTreeMap<String, Member>,
}

impl Roster {
    /// Insert or replace a member by id.
    pub fn add_member(&mut self, member: Member) {
        self.members.insert(member.id.clone(), member);
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn id_for_role(&self, role: &str) -> Option<String> {
        self.members
            .values()
            .find(|member| member.role == role)
            .map(|member| member.id.clone())
    }
}

impl Subsystem for Roster {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn extract_state(&self) -> Result<OpaqueState, StateConsistencyError> {
        OpaqueState::encode(ROSTER_STATE_VERSION, self).map_err(|err| {
            StateConsistencyError::Subsystem {
                subsystem: "directory",
                reason: err.to_string(),
            }
        })
    }

    fn restore_state(&mut self, state: &OpaqueState) -> Result<(), StateConsistencyError> {
        if state.is_empty() {
            self.members.clear();
            return Ok(());
        }
        if state.version > ROSTER_STATE_VERSION {
            return Err(StateConsistencyError::Subsystem {
                subsystem: "directory",
                reason: format!("unsupported state version {}", state.version),
            });
        }
        *self = state.decode().map_err(|err| StateConsistencyError::Subsystem {
            subsystem: "directory",
            reason: err.to_string(),
        })?;
        info!(members = self.members.len(), "restored directory");
        Ok(())
    }
}

impl Directory for Roster {
    fn departments(&self) -> Vec<String> {
        let mut departments: Vec<String> = self
            .members
            .values()
            .map(|member| member.department.clone())
            .collect();
        departments.sort();
        departments.dedup();
        departments
    }

    fn manager_of(&self, member_id: &str) -> Option<String> {
        self.members.get(member_id)?.manager_id.clone()
    }

    fn members_in(&self, department: &str) -> Vec<String> {
        self.members
            .values()
            .filter(|member| member.department == department)
            .map(|member| member.id.clone())
            .collect()
    }

    /// One member per role. The first role listed for a department heads it
    /// and manages everyone else listed there.
    fn seed(&mut self, profile: &WorldProfile) {
        for (department, roles) in &profile.department_structure {
            let Some(head_role) = roles.first() else {
                continue;
            };

            for role in roles {
                if role != head_role {
                    if let Some(existing) = self.id_for_role(role) {
                        let head_id = self.id_for_role(head_role);
                        if let Some(member) = self.members.get_mut(&existing) {
                            if member.manager_id.is_none() {
                                member.manager_id = head_id;
                            }
                        }
                        continue;
                    }
                } else if self.id_for_role(role).is_some() {
                    continue;
                }

                let id = format!("emp-{:03}", self.members.len() + 1);
                let manager_id = if role == head_role {
                    None
                } else {
                    self.id_for_role(head_role)
                };
                self.add_member(Member {
                    id,
                    name: role.clone(),
                    role: role.clone(),
                    department: department.clone(),
                    manager_id,
                });
            }
        }
        info!(members = self.members.len(), profile = %profile.name, "seeded directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::WorldType;

    #[test]
    fn seeding_business_profile_builds_hierarchy() {
        let mut roster = Roster::default();
        roster.seed(&WorldType::Business.profile());

        assert_eq!(roster.len(), 8);
        assert_eq!(
            roster.departments(),
            vec!["Engineering", "Executive", "Marketing", "Sales"]
        );

        let ceo = roster.id_for_role("CEO").unwrap();
        let vp_eng = roster.id_for_role("VP Engineering").unwrap();
        let junior = roster.id_for_role("Junior Developer").unwrap();
        assert_eq!(roster.manager_of(&ceo), None);
        assert_eq!(roster.manager_of(&vp_eng), Some(ceo));
        assert_eq!(roster.manager_of(&junior), Some(vp_eng));
    }

    #[test]
    fn state_round_trips_through_opaque_payload() {
        let mut roster = Roster::default();
        roster.seed(&WorldType::Hospital.profile());
        let state = roster.extract_state().unwrap();

        let mut restored = Roster::default();
        restored.restore_state(&state).unwrap();
        assert_eq!(restored, roster);

        restored.restore_state(&OpaqueState::empty()).unwrap();
        assert!(restored.is_empty());
    }
}
