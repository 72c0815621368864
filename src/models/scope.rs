use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one collaboratively viewed workflow version.
///
/// Every key holds two non-empty ids and a version above 0, whether it was
/// built with [`ScopeKey::new`] or deserialized.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "RawScopeKey")]
pub struct ScopeKey {
    project_id: String,
    workflow_id: String,
    version: u32,
}

const INCOMPLETE_SCOPE: &str = "scope needs a project id, a workflow id and a version above 0";

#[derive(Deserialize)]
struct RawScopeKey {
    project_id: String,
    workflow_id: String,
    version: u32,
}

impl TryFrom<RawScopeKey> for ScopeKey {
    type Error = String;

    fn try_from(raw: RawScopeKey) -> Result<Self, Self::Error> {
        ScopeKey::new(raw.project_id, raw.workflow_id, raw.version)
            .ok_or_else(|| INCOMPLETE_SCOPE.to_string())
    }
}

impl ScopeKey {
    /// Build a scope key. Empty ids and version 0 are rejected.
    pub fn new(
        project_id: impl Into<String>,
        workflow_id: impl Into<String>,
        version: u32,
    ) -> Option<Self> {
        let project_id = project_id.into();
        let workflow_id = workflow_id.into();
        if project_id.trim().is_empty() || workflow_id.trim().is_empty() || version == 0 {
            return None;
        }
        Some(Self {
            project_id,
            workflow_id,
            version,
        })
    }

    /// Build a scope key from route parameters that may be missing.
    pub fn from_parts(
        project_id: Option<&str>,
        workflow_id: Option<&str>,
        version: Option<u32>,
    ) -> Option<Self> {
        Self::new(project_id?, workflow_id?, version?)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Unencoded path segments of the editor snapshot endpoint
    pub fn editor_segments(&self) -> [String; 7] {
        [
            "projects".to_string(),
            self.project_id.clone(),
            "workflows".to_string(),
            self.workflow_id.clone(),
            "versions".to_string(),
            self.version.to_string(),
            "editor".to_string(),
        ]
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/v{}", self.project_id, self.workflow_id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_missing_or_empty_parts() {
        assert!(ScopeKey::new("", "w1", 1).is_none());
        assert!(ScopeKey::new("p1", "  ", 1).is_none());
        assert!(ScopeKey::new("p1", "w1", 0).is_none());
        assert!(ScopeKey::from_parts(Some("p1"), None, Some(1)).is_none());
        assert!(ScopeKey::from_parts(Some("p1"), Some("w1"), None).is_none());
        assert!(ScopeKey::from_parts(None, Some("w1"), Some(1)).is_none());
    }

    #[test]
    fn deserializing_validates_parts() {
        let scope: ScopeKey =
            serde_json::from_value(json!({ "project_id": "p1", "workflow_id": "w1", "version": 2 }))
                .unwrap();
        assert_eq!(scope, ScopeKey::new("p1", "w1", 2).unwrap());

        let empty = json!({ "project_id": "", "workflow_id": "", "version": 0 });
        assert!(serde_json::from_value::<ScopeKey>(empty).is_err());
        let zero = json!({ "project_id": "p1", "workflow_id": "w1", "version": 0 });
        assert!(serde_json::from_value::<ScopeKey>(zero).is_err());
    }

    #[test]
    fn exposes_parts() {
        let scope = ScopeKey::from_parts(Some("p1"), Some("w1"), Some(3)).unwrap();
        assert_eq!(scope.project_id(), "p1");
        assert_eq!(scope.workflow_id(), "w1");
        assert_eq!(scope.version(), 3);
        assert_eq!(scope.to_string(), "p1/w1/v3");
        assert_eq!(
            scope.editor_segments().join("/"),
            "projects/p1/workflows/w1/versions/3/editor"
        );
    }
}
