//! Request and response payloads of the control-panel REST API.

use fuzzctl_core::{
    ImageId, PoolId, PoolResources, ProjectId, ResourceSelection, RevisionId, UserId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    #[serde(default)]
    pub display_name: String,
}

/// A logged-in user together with the project the session works in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedInUser {
    pub user_id: UserId,
    pub display_name: String,
    pub project: Option<Project>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    pub pool_id: PoolId,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    #[serde(default)]
    pub name: String,
    pub resources: PoolResources,
}

/// Body of the create-fuzzer call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFuzzer {
    pub name: String,
    pub description: String,
    pub lang: String,
    pub engine: String,
    pub ci_integration: bool,
}

impl NewFuzzer {
    /// A fuzzer created from the control panel, not from CI.
    pub fn new(
        name: impl Into<String>,
        lang: impl Into<String>,
        engine: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            lang: lang.into(),
            engine: engine.into(),
            ci_integration: false,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Body of the create-revision call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRevision {
    pub name: String,
    pub description: String,
    pub image_id: ImageId,
    #[serde(flatten)]
    pub resources: ResourceSelection,
}

/// Name and description change of an existing revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevisionInfoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RevisionInfoUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// Resource change of an existing revision. Unset values keep their
/// current setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourcesUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_usage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmpfs_size: Option<u32>,
}

impl ResourcesUpdate {
    /// Fields of `selected` that differ from `current`.
    #[must_use]
    pub fn diff(current: &ResourceSelection, selected: &ResourceSelection) -> Self {
        let changed = |old: u32, new: u32| (old != new).then_some(new);
        Self {
            cpu_usage: changed(current.cpu_usage, selected.cpu_usage),
            ram_usage: changed(current.ram_usage, selected.ram_usage),
            tmpfs_size: changed(current.tmpfs_size, selected.tmpfs_size),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cpu_usage.is_none() && self.ram_usage.is_none() && self.tmpfs_size.is_none()
    }
}

/// Changes to an existing revision. Halves left empty are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevisionUpdate {
    pub info: RevisionInfoUpdate,
    pub resources: ResourcesUpdate,
}

impl RevisionUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.info.is_empty() && self.resources.is_empty()
    }
}

/// A revision as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image_id: ImageId,
    #[serde(flatten)]
    pub resources: ResourceSelection,
}

/// Id of a freshly created entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Created<I> {
    pub id: I,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub engines: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_revision_flattens_resources() {
        let rev = NewRevision {
            name: "v1".to_owned(),
            description: String::new(),
            image_id: ImageId::new("img"),
            resources: ResourceSelection::default(),
        };
        let json = match serde_json::to_value(&rev) {
            Ok(v) => v,
            Err(e) => panic!("serialization failed: {e}"),
        };
        assert_eq!(
            json,
            serde_json::json!({
                "name": "v1",
                "description": "",
                "image_id": "img",
                "cpu_usage": 1000,
                "ram_usage": 1000,
                "tmpfs_size": 200,
            })
        );
    }

    #[test]
    fn info_update_omits_unset_fields() {
        let info = RevisionInfoUpdate { name: None, description: Some(String::new()) };
        let json = match serde_json::to_string(&info) {
            Ok(s) => s,
            Err(e) => panic!("serialization failed: {e}"),
        };
        assert_eq!(json, r#"{"description":""}"#);
        assert!(RevisionUpdate::default().is_empty());
    }

    #[test]
    fn resources_diff_keeps_only_changes() {
        let current = ResourceSelection::new(1000, 2000, 300);
        let diff = ResourcesUpdate::diff(&current, &ResourceSelection::new(1000, 2500, 300));
        assert_eq!(diff, ResourcesUpdate { ram_usage: Some(2500), ..Default::default() });
        assert!(ResourcesUpdate::diff(&current, &current).is_empty());
    }

    #[test]
    fn pool_decodes_partial_resources() {
        let pool: Pool = match serde_json::from_str(
            r#"{"id": "pool1",
                "resources": {"cpu_total": 8000, "ram_total": 16000, "fuzzer_max_ram": 4000}}"#,
        ) {
            Ok(p) => p,
            Err(e) => panic!("decode failed: {e}"),
        };
        assert_eq!(pool.resources.fuzzer_max_ram, Some(4000));
        assert_eq!(pool.resources.fuzzer_max_cpu, None);
        assert_eq!(pool.resources.nodes_total, 0);
    }
}
