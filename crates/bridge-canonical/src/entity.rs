use crate::{
    CanonicalDefect, CanonicalError, CanonicalRequirement, CanonicalTestCase,
    CanonicalTestCycle, CanonicalTestExecution, CanonicalTestSuite, Provenance,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    TestCase,
    TestExecution,
    TestSuite,
    TestCycle,
    Requirement,
    Defect,
    Attachment,
}

impl EntityType {
    pub const ALL: [Self; 7] = [
        Self::TestCase,
        Self::TestExecution,
        Self::TestSuite,
        Self::TestCycle,
        Self::Requirement,
        Self::Defect,
        Self::Attachment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TestCase => "test-case",
            Self::TestExecution => "test-execution",
            Self::TestSuite => "test-suite",
            Self::TestCycle => "test-cycle",
            Self::Requirement => "requirement",
            Self::Defect => "defect",
            Self::Attachment => "attachment",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CanonicalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|entity_type| entity_type.as_str() == needle)
            .ok_or_else(|| CanonicalError::UnknownEntityType(value.to_string()))
    }
}

/// Any canonical record that a mapper can produce.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType", content = "record", rename_all = "kebab-case")]
pub enum CanonicalEntity {
    TestCase(CanonicalTestCase),
    TestExecution(CanonicalTestExecution),
    TestSuite(CanonicalTestSuite),
    TestCycle(CanonicalTestCycle),
    Requirement(CanonicalRequirement),
    Defect(CanonicalDefect),
}

impl CanonicalEntity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::TestCase(_) => EntityType::TestCase,
            Self::TestExecution(_) => EntityType::TestExecution,
            Self::TestSuite(_) => EntityType::TestSuite,
            Self::TestCycle(_) => EntityType::TestCycle,
            Self::Requirement(_) => EntityType::Requirement,
            Self::Defect(_) => EntityType::Defect,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::TestCase(record) => &record.id,
            Self::TestExecution(record) => &record.id,
            Self::TestSuite(record) => &record.id,
            Self::TestCycle(record) => &record.id,
            Self::Requirement(record) => &record.id,
            Self::Defect(record) => &record.id,
        }
    }

    pub fn provenance(&self) -> &Provenance {
        match self {
            Self::TestCase(record) => &record.provenance,
            Self::TestExecution(record) => &record.provenance,
            Self::TestSuite(record) => &record.provenance,
            Self::TestCycle(record) => &record.provenance,
            Self::Requirement(record) => &record.provenance,
            Self::Defect(record) => &record.provenance,
        }
    }
}

/// Typed view over one `CanonicalEntity` variant.
pub trait CanonicalRecord: Clone + Send + Sync + 'static {
    const ENTITY_TYPE: EntityType;

    fn into_entity(self) -> CanonicalEntity;
    fn from_entity(entity: &CanonicalEntity) -> Result<&Self, CanonicalError>;
}

macro_rules! canonical_record {
    ($record:ty, $variant:ident) => {
        impl CanonicalRecord for $record {
            const ENTITY_TYPE: EntityType = EntityType::$variant;

            fn into_entity(self) -> CanonicalEntity {
                CanonicalEntity::$variant(self)
            }

            fn from_entity(entity: &CanonicalEntity) -> Result<&Self, CanonicalError> {
                match entity {
                    CanonicalEntity::$variant(record) => Ok(record),
                    other => Err(CanonicalError::EntityMismatch {
                        expected: EntityType::$variant,
                        found: other.entity_type(),
                    }),
                }
            }
        }

        impl From<$record> for CanonicalEntity {
            fn from(record: $record) -> Self {
                CanonicalEntity::$variant(record)
            }
        }
    };
}

canonical_record!(CanonicalTestCase, TestCase);
canonical_record!(CanonicalTestExecution, TestExecution);
canonical_record!(CanonicalTestSuite, TestSuite);
canonical_record!(CanonicalTestCycle, TestCycle);
canonical_record!(CanonicalRequirement, Requirement);
canonical_record!(CanonicalDefect, Defect);
