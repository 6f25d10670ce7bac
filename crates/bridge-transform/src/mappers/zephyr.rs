//! Zephyr Scale payloads: test cases keyed by `key` (`PROJ-T12`) with a
//! step-by-step `testScript`, and test executions carrying `scriptResults`.

use super::support::{
    LabelTable, fallback_message, format_timestamp, inbound_custom_field, label_for, non_empty,
    objects, outbound_custom_fields, parse_timestamp, require_string, resolve_label, strings,
    user_field, user_to_value,
};
use crate::{EntityMapper, MappingError, TransformationContext};
use bridge_canonical::{
    CanonicalAttachment, CanonicalLink, CanonicalStepResult, CanonicalTag, CanonicalTestCase,
    CanonicalTestExecution, CanonicalTestStep, ExecutionStatus, LinkType, Payload, PayloadExt,
    Priority, Provenance, TestCaseStatus,
};
use serde_json::{Value, json};

pub const SYSTEM: &str = "zephyr";

const TEST_CASE_STATUS: LabelTable<TestCaseStatus> = &[
    ("Draft", TestCaseStatus::Draft),
    ("Ready", TestCaseStatus::Ready),
    ("Approved", TestCaseStatus::Approved),
    ("Deprecated", TestCaseStatus::Deprecated),
    ("Archived", TestCaseStatus::Archived),
];

const PRIORITY: LabelTable<Priority> = &[
    ("Low", Priority::Low),
    ("Normal", Priority::Medium),
    ("Medium", Priority::Medium),
    ("High", Priority::High),
    ("Critical", Priority::Critical),
];

const EXECUTION_STATUS: LabelTable<ExecutionStatus> = &[
    ("Pass", ExecutionStatus::Passed),
    ("Fail", ExecutionStatus::Failed),
    ("Blocked", ExecutionStatus::Blocked),
    ("Not Executed", ExecutionStatus::NotExecuted),
    ("In Progress", ExecutionStatus::InProgress),
    ("Skipped", ExecutionStatus::Skipped),
    ("Passed", ExecutionStatus::Passed),
    ("Failed", ExecutionStatus::Failed),
    ("WIP", ExecutionStatus::InProgress),
];

fn provenance(context: &TransformationContext, key: &str, payload: &Payload) -> Provenance {
    Provenance::from_system(context.source_system.as_str())
        .with_external_id(Some(key.to_string()))
        .with_system_id(payload.get_string("id"))
}

fn read_attachment(raw: &Payload, context: &TransformationContext) -> Option<CanonicalAttachment> {
    let file_name = non_empty(raw.get_string("fileName").or_else(|| raw.get_string("name")))?;
    let id = raw.get_string("id").unwrap_or_else(|| file_name.clone());
    Some(CanonicalAttachment {
        id: id.clone(),
        file_name,
        mime_type: raw.get_string("mimeType"),
        size_bytes: raw.get_u64("fileSize"),
        storage_location: raw.get_string("url").or_else(|| raw.get_string("self")),
        uploaded_by: user_field(raw, "author"),
        uploaded_at: parse_timestamp(raw.get_str("createdOn")),
        provenance: Provenance::from_system(context.source_system.as_str())
            .with_system_id(Some(id)),
    })
}

fn write_attachment(attachment: &CanonicalAttachment) -> Value {
    let mut out = Payload::new();
    out.insert("fileName".to_string(), json!(attachment.file_name));
    out.insert_opt("mimeType", attachment.mime_type.as_ref().map(|v| json!(v)));
    out.insert_opt("fileSize", attachment.size_bytes.map(|v| json!(v)));
    out.insert_opt("url", attachment.storage_location.as_ref().map(|v| json!(v)));
    out.insert_opt("author", attachment.uploaded_by.as_ref().map(user_to_value));
    out.insert_opt("createdOn", attachment.uploaded_at.as_ref().map(format_timestamp));
    Value::Object(out)
}

fn read_links(payload: &Payload) -> Vec<CanonicalLink> {
    let Some(links) = payload.get_object("links") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for web in objects(links, "webLinks") {
        if let Some(url) = web.get_string("url") {
            out.push(CanonicalLink {
                link_type: LinkType::Web,
                target: url,
                title: web.get_string("description"),
            });
        }
    }
    for issue in objects(links, "issues") {
        if let Some(key) = issue.get_string("issueKey").or_else(|| issue.get_string("issueId")) {
            out.push(CanonicalLink {
                link_type: LinkType::Issue,
                target: key,
                title: None,
            });
        }
    }
    out
}

fn write_links(links: &[CanonicalLink]) -> Option<Value> {
    if links.is_empty() {
        return None;
    }
    let web: Vec<Value> = links
        .iter()
        .filter(|link| link.link_type == LinkType::Web)
        .map(|link| json!({ "url": link.target, "description": link.title }))
        .collect();
    let issues: Vec<Value> = links
        .iter()
        .filter(|link| link.link_type != LinkType::Web)
        .map(|link| json!({ "issueKey": link.target }))
        .collect();
    Some(json!({ "webLinks": web, "issues": issues }))
}

fn source_steps(payload: &Payload) -> Vec<&Payload> {
    payload
        .get_object("testScript")
        .map(|script| objects(script, "steps"))
        .unwrap_or_default()
}

pub struct ZephyrTestCaseMapper;

impl EntityMapper for ZephyrTestCaseMapper {
    type Entity = CanonicalTestCase;

    fn to_canonical(
        &self,
        source: &Payload,
        context: &TransformationContext,
    ) -> Result<CanonicalTestCase, MappingError> {
        let key = require_string(source, "key")?;
        let name = require_string(source, "name")?;

        let status = resolve_label(TEST_CASE_STATUS, source.get_str("status"), "status", context);
        let priority = resolve_label(PRIORITY, source.get_str("priority"), "priority", context);

        let mut test_steps = Vec::new();
        for (position, step) in source_steps(source).into_iter().enumerate() {
            let order = step.get_i64("index").unwrap_or(position as i64 + 1);
            test_steps.push(CanonicalTestStep {
                id: step
                    .get_string("id")
                    .unwrap_or_else(|| format!("{key}-step-{order}")),
                order,
                action: step.get_string("description").unwrap_or_default(),
                expected_result: non_empty(step.get_string("expectedResult")),
                data: non_empty(step.get_string("testData")).map(Value::String),
                attachments: objects(step, "attachments")
                    .into_iter()
                    .filter_map(|raw| read_attachment(raw, context))
                    .collect(),
            });
        }

        let custom_fields = source
            .get_object("customFields")
            .map(|fields| {
                fields
                    .iter()
                    .map(|(name, value)| inbound_custom_field(name, value, context))
                    .collect()
            })
            .unwrap_or_default();

        let mut case = CanonicalTestCase {
            id: key.clone(),
            name,
            objective: non_empty(source.get_string("objective")),
            precondition: non_empty(source.get_string("precondition")),
            status,
            priority,
            test_steps,
            attachments: objects(source, "attachments")
                .into_iter()
                .filter_map(|raw| read_attachment(raw, context))
                .collect(),
            tags: strings(source, "labels").into_iter().map(CanonicalTag::new).collect(),
            links: read_links(source),
            custom_fields,
            owner: user_field(source, "owner"),
            created_by: user_field(source, "createdBy"),
            updated_by: user_field(source, "updatedBy"),
            automation: None,
            folder: non_empty(source.get_string("folder")),
            version: source.get_string("majorVersion"),
            created_at: parse_timestamp(source.get_str("createdOn")),
            updated_at: parse_timestamp(source.get_str("updatedOn")),
            migration_id: context.migration_id.clone(),
            migrated_at: None,
            provenance: provenance(context, &key, source),
        };
        case.normalize_steps();
        Ok(case)
    }

    fn from_canonical(
        &self,
        entity: &CanonicalTestCase,
        context: &TransformationContext,
    ) -> Result<Payload, MappingError> {
        let mut out = Payload::new();
        out.insert("key".to_string(), json!(entity.id));
        out.insert("name".to_string(), json!(entity.name));
        out.insert_opt("objective", entity.objective.as_ref().map(|v| json!(v)));
        out.insert_opt("precondition", entity.precondition.as_ref().map(|v| json!(v)));
        out.insert(
            "status".to_string(),
            json!(label_for(TEST_CASE_STATUS, entity.status).unwrap_or("Draft")),
        );
        out.insert(
            "priority".to_string(),
            json!(label_for(PRIORITY, entity.priority).unwrap_or("Normal")),
        );
        out.insert(
            "labels".to_string(),
            json!(entity.tags.iter().map(|tag| tag.name.as_str()).collect::<Vec<_>>()),
        );
        out.insert_opt("owner", entity.owner.as_ref().map(user_to_value));
        out.insert_opt("createdBy", entity.created_by.as_ref().map(user_to_value));
        out.insert_opt("folder", entity.folder.as_ref().map(|v| json!(v)));
        out.insert_opt("createdOn", entity.created_at.as_ref().map(format_timestamp));
        out.insert_opt("updatedBy", entity.updated_by.as_ref().map(user_to_value));
        out.insert_opt("updatedOn", entity.updated_at.as_ref().map(format_timestamp));
        out.insert_opt("majorVersion", entity.version.as_deref().map(version_value));
        out.insert(
            "customFields".to_string(),
            Value::Object(outbound_custom_fields(&entity.custom_fields, context)),
        );

        let steps: Vec<Value> = entity
            .test_steps
            .iter()
            .map(|step| {
                let mut raw = Payload::new();
                raw.insert("index".to_string(), json!(step.order));
                raw.insert("description".to_string(), json!(step.action));
                raw.insert_opt(
                    "expectedResult",
                    step.expected_result.as_ref().map(|v| json!(v)),
                );
                raw.insert_opt("testData", step.data.as_ref().map(data_as_text));
                if !step.attachments.is_empty() {
                    raw.insert(
                        "attachments".to_string(),
                        Value::Array(step.attachments.iter().map(write_attachment).collect()),
                    );
                }
                Value::Object(raw)
            })
            .collect();
        out.insert(
            "testScript".to_string(),
            json!({ "type": "STEP_BY_STEP", "steps": steps }),
        );

        if !entity.attachments.is_empty() {
            out.insert(
                "attachments".to_string(),
                Value::Array(entity.attachments.iter().map(write_attachment).collect()),
            );
        }
        out.insert_opt("links", write_links(&entity.links));
        Ok(out)
    }

    fn validate_mapping(
        &self,
        source: &Payload,
        entity: &CanonicalTestCase,
        context: &TransformationContext,
    ) -> Vec<String> {
        let mut messages: Vec<String> = [
            fallback_message(
                TEST_CASE_STATUS,
                source.get_str("status"),
                "status",
                "status",
                context,
            ),
            fallback_message(
                PRIORITY,
                source.get_str("priority"),
                "priority",
                "priority",
                context,
            ),
        ]
        .into_iter()
        .flatten()
        .collect();
        let source_steps = source_steps(source).len();
        if source_steps != entity.test_steps.len() {
            messages.push(format!(
                "Step count mismatch: source has {}, canonical has {}",
                source_steps,
                entity.test_steps.len()
            ));
        }
        for step in &entity.test_steps {
            if step.action.trim().is_empty() {
                messages.push(format!("Step '{}' has no action", step.id));
            }
        }
        messages
    }

    fn validate_target(&self, entity: &CanonicalTestCase, target: &Payload) -> Vec<String> {
        let mut messages = Vec::new();
        for field in ["key", "name", "status", "priority"] {
            if target.get_string(field).is_none_or(|value| value.trim().is_empty()) {
                messages.push(format!("Missing required target field '{field}'"));
            }
        }
        let written = source_steps(target).len();
        if written != entity.test_steps.len() {
            messages.push(format!(
                "Target step count {} differs from canonical {}",
                written,
                entity.test_steps.len()
            ));
        }
        messages
    }

    fn payload_id(&self, payload: &Payload) -> Option<String> {
        payload.get_string("key").or_else(|| payload.get_string("id"))
    }
}

/// Zephyr versions are numeric; anything else is written back as text.
fn version_value(version: &str) -> Value {
    version
        .trim()
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| json!(version))
}

fn data_as_text(data: &Value) -> Value {
    match data {
        Value::String(_) => data.clone(),
        other => Value::String(other.to_string()),
    }
}

pub struct ZephyrTestExecutionMapper;

impl EntityMapper for ZephyrTestExecutionMapper {
    type Entity = CanonicalTestExecution;

    fn to_canonical(
        &self,
        source: &Payload,
        context: &TransformationContext,
    ) -> Result<CanonicalTestExecution, MappingError> {
        let key = require_string(source, "key")?;
        let test_case_id = require_string(source, "testCaseKey")?;

        let status = resolve_label(EXECUTION_STATUS, source.get_str("status"), "status", context);

        let step_results = objects(source, "scriptResults")
            .into_iter()
            .enumerate()
            .map(|(position, raw)| {
                let index = raw.get_i64("index").unwrap_or(position as i64 + 1);
                CanonicalStepResult {
                    step_id: raw
                        .get_string("stepId")
                        .unwrap_or_else(|| format!("{test_case_id}-step-{index}")),
                    status: resolve_label(EXECUTION_STATUS, raw.get_str("status"), "status", context),
                    actual_result: non_empty(raw.get_string("actualResult")),
                    notes: non_empty(raw.get_string("comment")),
                    attachments: Vec::new(),
                }
            })
            .collect();

        Ok(CanonicalTestExecution {
            id: key.clone(),
            test_case_id,
            status,
            step_results,
            executed_by: user_field(source, "executedBy"),
            environment: non_empty(source.get_string("environment")),
            build_version: non_empty(source.get_string("version")),
            started_at: parse_timestamp(source.get_str("actualStartDate")),
            completed_at: parse_timestamp(source.get_str("actualEndDate")),
            notes: non_empty(source.get_string("comment")),
            defects: strings(source, "issueKeys"),
            attachments: objects(source, "attachments")
                .into_iter()
                .filter_map(|raw| read_attachment(raw, context))
                .collect(),
            test_cycle_id: source.get_string("testCycleKey"),
            provenance: provenance(context, &key, source),
        })
    }

    fn from_canonical(
        &self,
        entity: &CanonicalTestExecution,
        _context: &TransformationContext,
    ) -> Result<Payload, MappingError> {
        let mut out = Payload::new();
        out.insert("key".to_string(), json!(entity.id));
        out.insert("testCaseKey".to_string(), json!(entity.test_case_id));
        out.insert(
            "status".to_string(),
            json!(label_for(EXECUTION_STATUS, entity.status).unwrap_or("Not Executed")),
        );
        out.insert_opt("executedBy", entity.executed_by.as_ref().map(user_to_value));
        out.insert_opt("environment", entity.environment.as_ref().map(|v| json!(v)));
        out.insert_opt("version", entity.build_version.as_ref().map(|v| json!(v)));
        out.insert_opt("actualStartDate", entity.started_at.as_ref().map(format_timestamp));
        out.insert_opt("actualEndDate", entity.completed_at.as_ref().map(format_timestamp));
        out.insert_opt("comment", entity.notes.as_ref().map(|v| json!(v)));
        out.insert_opt("testCycleKey", entity.test_cycle_id.as_ref().map(|v| json!(v)));
        out.insert("issueKeys".to_string(), json!(entity.defects));
        let results: Vec<Value> = entity
            .step_results
            .iter()
            .enumerate()
            .map(|(position, result)| {
                let mut raw = Payload::new();
                raw.insert("index".to_string(), json!(position + 1));
                raw.insert("stepId".to_string(), json!(result.step_id));
                raw.insert(
                    "status".to_string(),
                    json!(label_for(EXECUTION_STATUS, result.status).unwrap_or("Not Executed")),
                );
                raw.insert_opt("actualResult", result.actual_result.as_ref().map(|v| json!(v)));
                raw.insert_opt("comment", result.notes.as_ref().map(|v| json!(v)));
                Value::Object(raw)
            })
            .collect();
        out.insert("scriptResults".to_string(), Value::Array(results));
        if !entity.attachments.is_empty() {
            out.insert(
                "attachments".to_string(),
                Value::Array(entity.attachments.iter().map(write_attachment).collect()),
            );
        }
        Ok(out)
    }

    fn validate_mapping(
        &self,
        source: &Payload,
        entity: &CanonicalTestExecution,
        context: &TransformationContext,
    ) -> Vec<String> {
        let results = objects(source, "scriptResults");
        let mut messages: Vec<String> =
            fallback_message(EXECUTION_STATUS, source.get_str("status"), "status", "status", context)
                .into_iter()
                .collect();
        messages.extend(results.iter().filter_map(|raw| {
            fallback_message(
                EXECUTION_STATUS,
                raw.get_str("status"),
                "status",
                "step status",
                context,
            )
        }));
        let source_results = results.len();
        if source_results != entity.step_results.len() {
            messages.push(format!(
                "Step result count mismatch: source has {}, canonical has {}",
                source_results,
                entity.step_results.len()
            ));
        }
        messages
    }

    fn validate_target(&self, entity: &CanonicalTestExecution, target: &Payload) -> Vec<String> {
        let mut messages = Vec::new();
        for field in ["testCaseKey", "status"] {
            if target.get_string(field).is_none_or(|value| value.trim().is_empty()) {
                messages.push(format!("Missing required target field '{field}'"));
            }
        }
        let written = objects(target, "scriptResults").len();
        if written != entity.step_results.len() {
            messages.push(format!(
                "Target step result count {} differs from canonical {}",
                written,
                entity.step_results.len()
            ));
        }
        messages
    }

    fn payload_id(&self, payload: &Payload) -> Option<String> {
        payload.get_string("key").or_else(|| payload.get_string("id"))
    }
}
