use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::state::RawState;

/// Input policy: named capture expressions plus a desired-state template.
///
/// `desired_state` may be empty, in which case only the captures are
/// resolved and no desired state is generated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicySpec {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub capture: IndexMap<String, String>,
    #[serde(skip_serializing_if = "RawState::is_empty")]
    pub desired_state: RawState,
}

/// Already resolved captured states, keyed by capture name. Entries override
/// resolution for their names on the next run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CachedState {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub captured_states: IndexMap<String, CapturedState>,
}

impl CachedState {
    pub fn is_empty(&self) -> bool {
        self.captured_states.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapturedState {
    pub state: RawState,
    #[serde(skip_serializing_if = "MetaInfo::is_empty")]
    pub meta: MetaInfo,
}

impl CapturedState {
    pub(crate) fn from_state(state: RawState) -> Self {
        Self {
            state,
            meta: MetaInfo::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaInfo {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MetaInfo {
    pub fn is_empty(&self) -> bool {
        self.version.is_empty() && self.timestamp.is_none()
    }
}

/// The product of [`generate_state`]: the substituted desired state, the
/// superset of the input cache with newly resolved captures added, and the
/// run's meta info.
///
/// [`generate_state`]: crate::generate_state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratedState {
    #[serde(skip_serializing_if = "RawState::is_empty")]
    pub desired_state: RawState,
    #[serde(skip_serializing_if = "CachedState::is_empty")]
    pub cache: CachedState,
    pub meta: MetaInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn policy_spec_embeds_the_desired_state() {
        let policy: PolicySpec = serde_yaml::from_str(
            r#"
capture:
  default-gw: routes.running.destination=="0.0.0.0/0"
desiredState:
  interfaces:
  - name: br1
    type: linux-bridge
"#,
        )
        .unwrap();

        assert_eq!(
            policy.capture.get("default-gw").map(String::as_str),
            Some(r#"routes.running.destination=="0.0.0.0/0""#)
        );
        let desired = policy.desired_state.to_value().unwrap();
        assert_eq!(
            desired["interfaces"][0]["name"],
            serde_yaml::Value::from("br1")
        );
    }

    #[test]
    fn empty_policy_round_trips() {
        let policy = PolicySpec::default();
        let yaml = serde_yaml::to_string(&policy).unwrap();
        let parsed: PolicySpec = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, policy);
    }

    #[test]
    fn captured_state_keeps_meta() {
        let yaml = r#"
default-gw:
  state:
    routes:
      running: []
  meta:
    version: "0"
    timestamp: 2021-12-15T13:45:40Z
"#;
        let states: IndexMap<String, CapturedState> = serde_yaml::from_str(yaml).unwrap();
        let meta = &states["default-gw"].meta;
        assert_eq!(meta.version, "0");
        assert!(meta.timestamp.is_some());
    }
}
