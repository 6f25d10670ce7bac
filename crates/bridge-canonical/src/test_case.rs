use crate::{
    AutomationInfo, CanonicalAttachment, CanonicalCustomField, CanonicalLink, CanonicalTag,
    CanonicalUser, Provenance, normalize_token,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestCaseStatus {
    #[default]
    Draft,
    Ready,
    Approved,
    Deprecated,
    Archived,
}

impl TestCaseStatus {
    pub const ALL: [Self; 5] = [
        Self::Draft,
        Self::Ready,
        Self::Approved,
        Self::Deprecated,
        Self::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Ready => "READY",
            Self::Approved => "APPROVED",
            Self::Deprecated => "DEPRECATED",
            Self::Archived => "ARCHIVED",
        }
    }

    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let token = normalize_token(raw);
        Self::ALL.into_iter().find(|status| status.as_str() == token)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let token = normalize_token(raw);
        Self::ALL.into_iter().find(|priority| priority.as_str() == token)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTestStep {
    pub id: String,
    /// Execution position. Dense and ascending, not necessarily contiguous.
    pub order: i64,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<CanonicalAttachment>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTestCase {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precondition: Option<String>,
    #[serde(default)]
    pub status: TestCaseStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub test_steps: Vec<CanonicalTestStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<CanonicalAttachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<CanonicalTag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<CanonicalLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CanonicalCustomField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<CanonicalUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<CanonicalUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<CanonicalUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation: Option<AutomationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub provenance: Provenance,
}

impl CanonicalTestCase {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Stable sort by `order`; equal orders keep their input position.
    pub fn normalize_steps(&mut self) {
        self.test_steps.sort_by_key(|step| step.order);
    }

    pub fn custom_field(&self, name: &str) -> Option<&CanonicalCustomField> {
        self.custom_fields.iter().find(|field| field.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, order: i64) -> CanonicalTestStep {
        CanonicalTestStep {
            id: id.to_string(),
            order,
            action: format!("do {id}"),
            ..CanonicalTestStep::default()
        }
    }

    #[test]
    fn parse_lenient_is_case_insensitive() {
        assert_eq!(
            TestCaseStatus::parse_lenient("approved"),
            Some(TestCaseStatus::Approved)
        );
        assert_eq!(Priority::parse_lenient(" High "), Some(Priority::High));
        assert_eq!(TestCaseStatus::parse_lenient("Unknown"), None);
    }

    #[test]
    fn normalize_steps_keeps_input_order_for_ties() {
        let mut case = CanonicalTestCase::new("TC-1", "Login");
        case.test_steps = vec![step("c", 5), step("a", 1), step("b", 5), step("d", 3)];
        case.normalize_steps();
        let ids: Vec<&str> = case.test_steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d", "c", "b"]);
    }

    #[test]
    fn serializes_statuses_as_screaming_snake_case() {
        let mut case = CanonicalTestCase::new("TC-1", "Login");
        case.status = TestCaseStatus::Approved;
        case.priority = Priority::Critical;
        let value = serde_json::to_value(&case).expect("case should serialize");
        assert_eq!(value["status"], "APPROVED");
        assert_eq!(value["priority"], "CRITICAL");
        assert_eq!(value["testSteps"], serde_json::json!([]));
    }
}
