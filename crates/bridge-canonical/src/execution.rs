use crate::{CanonicalAttachment, CanonicalUser, Provenance, normalize_token};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Passed,
    Failed,
    Blocked,
    #[default]
    NotExecuted,
    InProgress,
    Skipped,
}

impl ExecutionStatus {
    pub const ALL: [Self; 6] = [
        Self::Passed,
        Self::Failed,
        Self::Blocked,
        Self::NotExecuted,
        Self::InProgress,
        Self::Skipped,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Blocked => "BLOCKED",
            Self::NotExecuted => "NOT_EXECUTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Skipped => "SKIPPED",
        }
    }

    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let token = normalize_token(raw);
        Self::ALL.into_iter().find(|status| status.as_str() == token)
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::NotExecuted | Self::InProgress)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalStepResult {
    pub step_id: String,
    #[serde(default)]
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<CanonicalAttachment>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTestExecution {
    pub id: String,
    pub test_case_id: String,
    #[serde(default)]
    pub status: ExecutionStatus,
    #[serde(default)]
    pub step_results: Vec<CanonicalStepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_by: Option<CanonicalUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Defect keys in the source tracker.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defects: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<CanonicalAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_cycle_id: Option<String>,
    #[serde(flatten)]
    pub provenance: Provenance,
}

impl CanonicalTestExecution {
    pub fn new(id: impl Into<String>, test_case_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            test_case_id: test_case_id.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lenient_accepts_spaced_labels() {
        assert_eq!(
            ExecutionStatus::parse_lenient("Not Executed"),
            Some(ExecutionStatus::NotExecuted)
        );
        assert_eq!(
            ExecutionStatus::parse_lenient("in_progress"),
            Some(ExecutionStatus::InProgress)
        );
        assert_eq!(ExecutionStatus::parse_lenient("Pass"), None);
    }

    #[test]
    fn default_status_is_not_executed() {
        let execution = CanonicalTestExecution::new("E-1", "TC-1");
        assert_eq!(execution.status, ExecutionStatus::NotExecuted);
        assert!(!execution.status.is_terminal());
    }
}
