//! Organizational lookups consumed by the approval chain builder.
//!
//! The engine never reads ambient session state: every call names its actor
//! explicitly as an [`ActorId`], and reporting lines come from an
//! [`OrgDirectory`] supplied by the host application.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

/// Canonical identity of a person acting on the workflow.
///
/// Raw identifiers are trimmed and ASCII-lowercased on construction so that
/// `"Alice@Corp.com "` and `"alice@corp.com"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorId(String);

impl ActorId {
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let canonical = raw.as_ref().trim().to_ascii_lowercase();
        if canonical.is_empty() {
            return Err(WorkflowError::validation("identity must not be empty"));
        }
        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ActorId {
    type Error = WorkflowError;

    fn try_from(value: String) -> Result<Self> {
        ActorId::new(value)
    }
}

impl From<ActorId> for String {
    fn from(id: ActorId) -> Self {
        id.0
    }
}

/// Resolves reporting lines and project ownership.
pub trait OrgDirectory {
    /// The recorded supervisor of `actor`, if any.
    fn supervisor_of(&self, actor: &ActorId) -> Option<ActorId>;

    /// The creator of `project_id`, if the project is known.
    fn project_creator(&self, project_id: &str) -> Option<ActorId>;
}

/// Static org chart, typically loaded from TOML:
///
/// ```toml
/// [supervisors]
/// "dev@corp.com" = "lead@corp.com"
///
/// [projects]
/// "apollo" = "director@corp.com"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgChart {
    #[serde(default)]
    pub supervisors: HashMap<ActorId, ActorId>,
    #[serde(default)]
    pub projects: HashMap<String, ActorId>,
}

impl OrgChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_supervisor(mut self, actor: &ActorId, supervisor: &ActorId) -> Self {
        self.supervisors.insert(actor.clone(), supervisor.clone());
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>, creator: &ActorId) -> Self {
        self.projects.insert(project_id.into(), creator.clone());
        self
    }

    pub fn from_toml(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

impl OrgDirectory for OrgChart {
    fn supervisor_of(&self, actor: &ActorId) -> Option<ActorId> {
        self.supervisors.get(actor).cloned()
    }

    fn project_creator(&self, project_id: &str) -> Option<ActorId> {
        self.projects.get(project_id).cloned()
    }
}
