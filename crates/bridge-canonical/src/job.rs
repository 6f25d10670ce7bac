use crate::{CanonicalError, EntityType, SystemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// `source field name -> target field name`.
pub type FieldMappings = BTreeMap<String, String>;
/// `field name -> (source value -> target value)`.
pub type ValueMappings = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Created,
    Running,
    Completed,
    Failed,
    Paused,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Paused => "PAUSED",
        }
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Running)
                | (Self::Created, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Paused)
                | (Self::Paused, Self::Running)
                | (Self::Paused, Self::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one item, as counted on the job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemOutcome {
    Success,
    /// Converted with validation messages.
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationJob {
    pub id: String,
    pub name: String,
    pub source_system: SystemId,
    pub target_system: SystemId,
    #[serde(default)]
    pub source_config: Value,
    #[serde(default)]
    pub target_config: Value,
    pub entity_types: Vec<EntityType>,
    #[serde(default)]
    pub field_mappings: FieldMappings,
    #[serde(default)]
    pub value_mappings: ValueMappings,
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,
    pub total_items: u64,
    pub processed_items: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub warning_count: u64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl MigrationJob {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source_system: SystemId,
        target_system: SystemId,
        entity_types: Vec<EntityType>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            source_system,
            target_system,
            source_config: Value::Null,
            target_config: Value::Null,
            entity_types,
            field_mappings: FieldMappings::new(),
            value_mappings: ValueMappings::new(),
            filters: BTreeMap::new(),
            total_items: 0,
            processed_items: 0,
            success_count: 0,
            error_count: 0,
            warning_count: 0,
            status: JobStatus::Created,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn set_total(&mut self, total_items: u64) -> Result<(), CanonicalError> {
        if total_items < self.processed_items {
            return Err(self.overflow(format!(
                "total {} is below processed {}",
                total_items, self.processed_items
            )));
        }
        self.total_items = total_items;
        self.touch();
        Ok(())
    }

    /// Fails when another item would push `processed_items` past
    /// `total_items`.
    pub fn ensure_capacity(&self) -> Result<(), CanonicalError> {
        if self.processed_items >= self.total_items {
            return Err(self.overflow(format!(
                "processed {} already reached total {}",
                self.processed_items, self.total_items
            )));
        }
        Ok(())
    }

    /// Counts one processed item. Fails rather than letting `processed_items`
    /// pass `total_items`.
    pub fn record_outcome(&mut self, outcome: ItemOutcome) -> Result<(), CanonicalError> {
        self.ensure_capacity()?;
        self.processed_items += 1;
        match outcome {
            ItemOutcome::Success => self.success_count += 1,
            ItemOutcome::Warning => self.warning_count += 1,
            ItemOutcome::Error => self.error_count += 1,
        }
        self.touch();
        Ok(())
    }

    pub fn transition(&mut self, next: JobStatus) -> Result<(), CanonicalError> {
        if !self.status.can_transition_to(next) {
            return Err(CanonicalError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        let now = Utc::now();
        if next == JobStatus::Running && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn remaining_items(&self) -> u64 {
        self.total_items.saturating_sub(self.processed_items)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn overflow(&self, message: String) -> CanonicalError {
        CanonicalError::CounterOverflow {
            job_id: self.id.clone(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> MigrationJob {
        MigrationJob::new(
            "job-1",
            "zephyr to qtest",
            SystemId::new("zephyr"),
            SystemId::new("qtest"),
            vec![EntityType::TestCase],
        )
    }

    #[test]
    fn new_job_starts_created_with_zeroed_counters() {
        let job = job();
        assert_eq!(job.status, JobStatus::Created);
        assert_eq!(
            (
                job.total_items,
                job.processed_items,
                job.success_count,
                job.error_count,
                job.warning_count
            ),
            (0, 0, 0, 0, 0)
        );
    }

    #[test]
    fn record_outcome_never_exceeds_total() {
        let mut job = job();
        job.set_total(2).expect("set total");
        job.record_outcome(ItemOutcome::Success).expect("first item");
        job.record_outcome(ItemOutcome::Warning).expect("second item");
        let error = job
            .record_outcome(ItemOutcome::Error)
            .expect_err("third item should overflow");
        assert!(matches!(error, CanonicalError::CounterOverflow { .. }));
        assert!(job.ensure_capacity().is_err());
        assert_eq!(job.processed_items, 2);
        assert!(job.success_count + job.error_count + job.warning_count <= job.processed_items);
    }

    #[test]
    fn set_total_rejects_values_below_processed() {
        let mut job = job();
        job.set_total(3).expect("set total");
        job.record_outcome(ItemOutcome::Success).expect("item");
        job.record_outcome(ItemOutcome::Success).expect("item");
        assert!(job.set_total(1).is_err());
        assert_eq!(job.total_items, 3);
    }

    #[test]
    fn transitions_follow_lifecycle() {
        let mut job = job();
        assert!(job.transition(JobStatus::Completed).is_err());
        job.transition(JobStatus::Running).expect("start");
        assert!(job.started_at.is_some());
        job.transition(JobStatus::Paused).expect("pause");
        job.transition(JobStatus::Running).expect("resume");
        job.transition(JobStatus::Completed).expect("complete");
        assert!(job.completed_at.is_some());
        assert_eq!(
            job.transition(JobStatus::Running),
            Err(CanonicalError::InvalidTransition {
                from: JobStatus::Completed,
                to: JobStatus::Running,
            })
        );
    }
}
