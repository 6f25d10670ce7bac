//! qTest Manager payloads. Most descriptive fields live in a `properties`
//! list of `{field_name, field_value}` pairs; statuses on executions may be
//! given either as a bare label or as a `{name}` object.

use super::support::{
    LabelTable, fallback_message, format_timestamp, inbound_custom_field, label_for, non_empty,
    objects, parse_timestamp, require_string, resolve_label, user_field, user_to_value,
};
use crate::{EntityMapper, MappingError, TransformationContext};
use bridge_canonical::{
    AutomationInfo, CanonicalAttachment, CanonicalCustomField, CanonicalLink, CanonicalStepResult,
    CanonicalTag, CanonicalTestCase, CanonicalTestExecution, CanonicalTestStep, ExecutionStatus,
    LinkType, Payload, PayloadExt, Priority, Provenance, TestCaseStatus, normalize_token,
    value_to_string,
};
use serde_json::{Value, json};

pub const SYSTEM: &str = "qtest";

const STATUS_PROPERTY: &str = "Status";
const PRIORITY_PROPERTY: &str = "Priority";
const AUTOMATION_PROPERTY: &str = "Automation";
const AUTOMATION_CONTENT_PROPERTY: &str = "Automation Content";
const TAGS_PROPERTY: &str = "Tags";
const ENVIRONMENT_PROPERTY: &str = "Environment";

const RESERVED_PROPERTIES: [&str; 5] = [
    STATUS_PROPERTY,
    PRIORITY_PROPERTY,
    AUTOMATION_PROPERTY,
    AUTOMATION_CONTENT_PROPERTY,
    TAGS_PROPERTY,
];

const TEST_CASE_STATUS: LabelTable<TestCaseStatus> = &[
    ("New", TestCaseStatus::Draft),
    ("Ready for Review", TestCaseStatus::Ready),
    ("Approved", TestCaseStatus::Approved),
    ("Obsolete", TestCaseStatus::Deprecated),
    ("Archived", TestCaseStatus::Archived),
    ("Draft", TestCaseStatus::Draft),
    ("Ready", TestCaseStatus::Ready),
    ("Baselined", TestCaseStatus::Approved),
    ("Deprecated", TestCaseStatus::Deprecated),
];

const PRIORITY: LabelTable<Priority> = &[
    ("Low", Priority::Low),
    ("Medium", Priority::Medium),
    ("High", Priority::High),
    ("Urgent", Priority::Critical),
    ("Critical", Priority::Critical),
];

const EXECUTION_STATUS: LabelTable<ExecutionStatus> = &[
    ("Passed", ExecutionStatus::Passed),
    ("Failed", ExecutionStatus::Failed),
    ("Blocked", ExecutionStatus::Blocked),
    ("Unexecuted", ExecutionStatus::NotExecuted),
    ("Incomplete", ExecutionStatus::InProgress),
    ("Skipped", ExecutionStatus::Skipped),
    ("Not Run", ExecutionStatus::NotExecuted),
];

/// `properties` as `(field_name, field_value)` pairs in payload order.
fn properties(payload: &Payload) -> Vec<(String, Value)> {
    objects(payload, "properties")
        .into_iter()
        .filter_map(|property| {
            let name = property.get_string("field_name")?;
            let value = property.get("field_value").cloned().unwrap_or(Value::Null);
            Some((name, value))
        })
        .collect()
}

fn property<'a>(properties: &'a [(String, Value)], name: &str) -> Option<&'a str> {
    properties
        .iter()
        .find(|(field, _)| field.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.as_str())
}

fn property_value(name: &str, value: Value) -> Value {
    json!({ "field_name": name, "field_value": value })
}

/// Execution statuses arrive as `"Passed"` or `{"name": "Passed"}`.
fn status_label(payload: &Payload) -> Option<&str> {
    match payload.get("status")? {
        Value::String(label) => Some(label.as_str()),
        Value::Object(status) => status.get_str("name"),
        _ => None,
    }
}

fn link_type(raw: &str) -> LinkType {
    match normalize_token(raw).as_str() {
        "ISSUE" | "DEFECT" => LinkType::Issue,
        "REQUIREMENT" => LinkType::Requirement,
        "TEST_CASE" => LinkType::TestCase,
        _ => LinkType::Web,
    }
}

fn link_type_label(link_type: LinkType) -> &'static str {
    match link_type {
        LinkType::Web => "WEB",
        LinkType::Issue => "ISSUE",
        LinkType::Requirement => "REQUIREMENT",
        LinkType::TestCase => "TEST_CASE",
    }
}

fn read_attachment(raw: &Payload, context: &TransformationContext) -> Option<CanonicalAttachment> {
    let file_name = non_empty(raw.get_string("name"))?;
    let id = raw.get_string("id").unwrap_or_else(|| file_name.clone());
    Some(CanonicalAttachment {
        id: id.clone(),
        file_name,
        mime_type: raw.get_string("content_type"),
        size_bytes: raw.get_u64("size"),
        storage_location: raw.get_string("web_url"),
        uploaded_by: user_field(raw, "author"),
        uploaded_at: parse_timestamp(raw.get_str("created_date")),
        provenance: Provenance::from_system(context.source_system.as_str())
            .with_system_id(Some(id)),
    })
}

fn write_attachment(attachment: &CanonicalAttachment) -> Value {
    let mut out = Payload::new();
    out.insert("name".to_string(), json!(attachment.file_name));
    out.insert_opt("content_type", attachment.mime_type.as_ref().map(|v| json!(v)));
    out.insert_opt("size", attachment.size_bytes.map(|v| json!(v)));
    out.insert_opt("web_url", attachment.storage_location.as_ref().map(|v| json!(v)));
    out.insert_opt("author", attachment.uploaded_by.as_ref().map(user_to_value));
    out.insert_opt("created_date", attachment.uploaded_at.as_ref().map(format_timestamp));
    Value::Object(out)
}

fn attachments(payload: &Payload, context: &TransformationContext) -> Vec<CanonicalAttachment> {
    objects(payload, "attachments")
        .into_iter()
        .filter_map(|raw| read_attachment(raw, context))
        .collect()
}

fn written_from_qtest(provenance: &Provenance) -> bool {
    provenance.source_system.as_deref() == Some(SYSTEM)
}

pub struct QTestTestCaseMapper;

impl QTestTestCaseMapper {
    fn automation(properties: &[(String, Value)]) -> Option<AutomationInfo> {
        let flag = property(properties, AUTOMATION_PROPERTY);
        let content = non_empty(property(properties, AUTOMATION_CONTENT_PROPERTY).map(str::to_string));
        if flag.is_none() && content.is_none() {
            return None;
        }
        let automated = flag
            .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "yes" | "true" | "automated"))
            .unwrap_or(content.is_some());
        Some(AutomationInfo {
            automated,
            framework: None,
            script_path: content,
        })
    }
}

impl EntityMapper for QTestTestCaseMapper {
    type Entity = CanonicalTestCase;

    fn to_canonical(
        &self,
        source: &Payload,
        context: &TransformationContext,
    ) -> Result<CanonicalTestCase, MappingError> {
        let system_id = non_empty(source.get_string("id"));
        let pid = non_empty(source.get_string("pid"));
        let id = pid
            .clone()
            .or_else(|| system_id.clone())
            .ok_or_else(|| MappingError::missing("id"))?;
        let name = require_string(source, "name")?;

        let properties = properties(source);
        let status = resolve_label(
            TEST_CASE_STATUS,
            property(&properties, STATUS_PROPERTY),
            "status",
            context,
        );
        let priority = resolve_label(
            PRIORITY,
            property(&properties, PRIORITY_PROPERTY),
            "priority",
            context,
        );
        let tags = property(&properties, TAGS_PROPERTY)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(CanonicalTag::new)
                    .collect()
            })
            .unwrap_or_default();
        let custom_fields: Vec<CanonicalCustomField> = properties
            .iter()
            .filter(|(field, _)| {
                !RESERVED_PROPERTIES
                    .iter()
                    .any(|reserved| reserved.eq_ignore_ascii_case(field))
            })
            .map(|(field, value)| inbound_custom_field(field, value, context))
            .collect();

        let mut test_steps = Vec::new();
        for (position, step) in objects(source, "test_steps").into_iter().enumerate() {
            let order = step.get_i64("order").unwrap_or(position as i64 + 1);
            test_steps.push(CanonicalTestStep {
                id: step
                    .get_string("id")
                    .unwrap_or_else(|| format!("{id}-step-{order}")),
                order,
                action: step.get_string("description").unwrap_or_default(),
                expected_result: non_empty(step.get_string("expected")),
                data: non_empty(step.get_string("test_data")).map(Value::String),
                attachments: attachments(step, context),
            });
        }

        let links = objects(source, "links")
            .into_iter()
            .filter_map(|raw| {
                let target = non_empty(raw.get_string("target").or_else(|| raw.get_string("url")))?;
                Some(CanonicalLink {
                    link_type: raw.get_str("type").map(link_type).unwrap_or(LinkType::Web),
                    target,
                    title: non_empty(raw.get_string("title")),
                })
            })
            .collect();

        let mut case = CanonicalTestCase {
            id,
            name,
            objective: non_empty(source.get_string("description")),
            precondition: non_empty(source.get_string("precondition")),
            status,
            priority,
            test_steps,
            attachments: attachments(source, context),
            tags,
            links,
            custom_fields,
            owner: user_field(source, "creator_id"),
            created_by: user_field(source, "creator_id"),
            updated_by: user_field(source, "last_modified_user_id"),
            automation: Self::automation(&properties),
            folder: source.get_string("parent_id"),
            version: source.get_string("version"),
            created_at: parse_timestamp(source.get_str("created_date")),
            updated_at: parse_timestamp(source.get_str("last_modified_date")),
            migration_id: context.migration_id.clone(),
            migrated_at: None,
            provenance: Provenance::from_system(context.source_system.as_str())
                .with_external_id(pid)
                .with_system_id(system_id),
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
        if written_from_qtest(&entity.provenance) {
            out.insert_opt("id", entity.provenance.system_id.as_ref().map(|v| json!(v)));
        }
        out.insert("pid".to_string(), json!(entity.id));
        out.insert("name".to_string(), json!(entity.name));
        out.insert_opt("description", entity.objective.as_ref().map(|v| json!(v)));
        out.insert_opt("precondition", entity.precondition.as_ref().map(|v| json!(v)));
        out.insert_opt("parent_id", entity.folder.as_ref().map(|v| json!(v)));
        out.insert_opt("creator_id", entity.created_by.as_ref().map(user_to_value));
        out.insert_opt("created_date", entity.created_at.as_ref().map(format_timestamp));
        out.insert_opt(
            "last_modified_date",
            entity.updated_at.as_ref().map(format_timestamp),
        );

        let mut props = vec![
            property_value(
                STATUS_PROPERTY,
                json!(label_for(TEST_CASE_STATUS, entity.status).unwrap_or("New")),
            ),
            property_value(
                PRIORITY_PROPERTY,
                json!(label_for(PRIORITY, entity.priority).unwrap_or("Medium")),
            ),
        ];
        if let Some(automation) = &entity.automation {
            let flag = if automation.automated { "Yes" } else { "No" };
            props.push(property_value(AUTOMATION_PROPERTY, json!(flag)));
            if let Some(script) = &automation.script_path {
                props.push(property_value(AUTOMATION_CONTENT_PROPERTY, json!(script)));
            }
        }
        if !entity.tags.is_empty() {
            let joined = entity
                .tags
                .iter()
                .map(|tag| tag.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            props.push(property_value(TAGS_PROPERTY, json!(joined)));
        }
        for field in &entity.custom_fields {
            props.push(property_value(
                context.map_field_name(&field.name),
                field.value.clone(),
            ));
        }
        out.insert("properties".to_string(), Value::Array(props));

        let steps: Vec<Value> = entity
            .test_steps
            .iter()
            .map(|step| {
                let mut raw = Payload::new();
                raw.insert("order".to_string(), json!(step.order));
                raw.insert("description".to_string(), json!(step.action));
                raw.insert(
                    "expected".to_string(),
                    json!(step.expected_result.clone().unwrap_or_default()),
                );
                raw.insert_opt(
                    "test_data",
                    step.data
                        .as_ref()
                        .map(|data| json!(value_to_string(data).unwrap_or_else(|| data.to_string()))),
                );
                if !step.attachments.is_empty() {
                    raw.insert(
                        "attachments".to_string(),
                        Value::Array(step.attachments.iter().map(write_attachment).collect()),
                    );
                }
                Value::Object(raw)
            })
            .collect();
        out.insert("test_steps".to_string(), Value::Array(steps));

        if !entity.links.is_empty() {
            let links = entity
                .links
                .iter()
                .map(|link| {
                    json!({
                        "type": link_type_label(link.link_type),
                        "target": link.target,
                        "title": link.title,
                    })
                })
                .collect();
            out.insert("links".to_string(), Value::Array(links));
        }
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
        entity: &CanonicalTestCase,
        context: &TransformationContext,
    ) -> Vec<String> {
        let properties = properties(source);
        let mut messages: Vec<String> = [
            fallback_message(
                TEST_CASE_STATUS,
                property(&properties, STATUS_PROPERTY),
                "status",
                "status",
                context,
            ),
            fallback_message(
                PRIORITY,
                property(&properties, PRIORITY_PROPERTY),
                "priority",
                "priority",
                context,
            ),
        ]
        .into_iter()
        .flatten()
        .collect();
        let source_steps = objects(source, "test_steps").len();
        if source_steps != entity.test_steps.len() {
            messages.push(format!(
                "Step count mismatch: source has {}, canonical has {}",
                source_steps,
                entity.test_steps.len()
            ));
        }
        messages
    }

    fn validate_target(&self, entity: &CanonicalTestCase, target: &Payload) -> Vec<String> {
        let mut messages = Vec::new();
        if target.get_string("name").is_none_or(|name| name.trim().is_empty()) {
            messages.push("Missing required target field 'name'".to_string());
        }
        let properties = properties(target);
        for required in [STATUS_PROPERTY, PRIORITY_PROPERTY] {
            if property(&properties, required).is_none() {
                messages.push(format!("Missing required target property '{required}'"));
            }
        }
        let written = objects(target, "test_steps").len();
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
        non_empty(payload.get_string("pid")).or_else(|| payload.get_string("id"))
    }
}

pub struct QTestTestExecutionMapper;

fn defect_keys(payload: &Payload) -> Vec<String> {
    payload
        .get_array("defects")
        .map(|defects| {
            defects
                .iter()
                .filter_map(|defect| match defect {
                    Value::Object(object) => object
                        .get_string("pid")
                        .or_else(|| object.get_string("id")),
                    other => value_to_string(other),
                })
                .collect()
        })
        .unwrap_or_default()
}

impl EntityMapper for QTestTestExecutionMapper {
    type Entity = CanonicalTestExecution;

    fn to_canonical(
        &self,
        source: &Payload,
        context: &TransformationContext,
    ) -> Result<CanonicalTestExecution, MappingError> {
        let id = require_string(source, "id")?;
        let test_case_id = require_string(source, "test_case_id")?;
        let properties = properties(source);

        let step_results = objects(source, "test_step_logs")
            .into_iter()
            .enumerate()
            .map(|(position, log)| CanonicalStepResult {
                step_id: log
                    .get_string("test_step_id")
                    .unwrap_or_else(|| format!("{test_case_id}-step-{}", position + 1)),
                status: resolve_label(EXECUTION_STATUS, status_label(log), "status", context),
                actual_result: non_empty(log.get_string("actual_result")),
                notes: non_empty(log.get_string("note")),
                attachments: attachments(log, context),
            })
            .collect();

        Ok(CanonicalTestExecution {
            id: id.clone(),
            test_case_id,
            status: resolve_label(EXECUTION_STATUS, status_label(source), "status", context),
            step_results,
            executed_by: user_field(source, "executor"),
            environment: non_empty(property(&properties, ENVIRONMENT_PROPERTY).map(str::to_string)),
            build_version: non_empty(source.get_string("build_number")),
            started_at: parse_timestamp(source.get_str("exe_start_date")),
            completed_at: parse_timestamp(source.get_str("exe_end_date")),
            notes: non_empty(source.get_string("note")),
            defects: defect_keys(source),
            attachments: attachments(source, context),
            test_cycle_id: source.get_string("test_cycle"),
            provenance: Provenance::from_system(context.source_system.as_str())
                .with_external_id(non_empty(source.get_string("pid")))
                .with_system_id(Some(id)),
        })
    }

    fn from_canonical(
        &self,
        entity: &CanonicalTestExecution,
        _context: &TransformationContext,
    ) -> Result<Payload, MappingError> {
        let mut out = Payload::new();
        out.insert("id".to_string(), json!(entity.id));
        out.insert("test_case_id".to_string(), json!(entity.test_case_id));
        out.insert(
            "status".to_string(),
            json!({ "name": label_for(EXECUTION_STATUS, entity.status).unwrap_or("Unexecuted") }),
        );
        out.insert_opt("executor", entity.executed_by.as_ref().map(user_to_value));
        out.insert_opt("build_number", entity.build_version.as_ref().map(|v| json!(v)));
        out.insert_opt("exe_start_date", entity.started_at.as_ref().map(format_timestamp));
        out.insert_opt("exe_end_date", entity.completed_at.as_ref().map(format_timestamp));
        out.insert_opt("note", entity.notes.as_ref().map(|v| json!(v)));
        out.insert_opt("test_cycle", entity.test_cycle_id.as_ref().map(|v| json!(v)));
        if let Some(environment) = &entity.environment {
            out.insert(
                "properties".to_string(),
                json!([property_value(ENVIRONMENT_PROPERTY, json!(environment))]),
            );
        }
        out.insert("defects".to_string(), json!(entity.defects));
        let logs: Vec<Value> = entity
            .step_results
            .iter()
            .map(|result| {
                let mut raw = Payload::new();
                raw.insert("test_step_id".to_string(), json!(result.step_id));
                raw.insert(
                    "status".to_string(),
                    json!({ "name": label_for(EXECUTION_STATUS, result.status).unwrap_or("Unexecuted") }),
                );
                raw.insert_opt("actual_result", result.actual_result.as_ref().map(|v| json!(v)));
                raw.insert_opt("note", result.notes.as_ref().map(|v| json!(v)));
                Value::Object(raw)
            })
            .collect();
        out.insert("test_step_logs".to_string(), Value::Array(logs));
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
        let logs = objects(source, "test_step_logs");
        let mut messages: Vec<String> =
            fallback_message(EXECUTION_STATUS, status_label(source), "status", "status", context)
                .into_iter()
                .collect();
        messages.extend(logs.iter().filter_map(|log| {
            fallback_message(
                EXECUTION_STATUS,
                status_label(log),
                "status",
                "step status",
                context,
            )
        }));
        let source_logs = logs.len();
        if source_logs != entity.step_results.len() {
            messages.push(format!(
                "Step result count mismatch: source has {}, canonical has {}",
                source_logs,
                entity.step_results.len()
            ));
        }
        messages
    }

    fn validate_target(&self, entity: &CanonicalTestExecution, target: &Payload) -> Vec<String> {
        let mut messages = Vec::new();
        if target
            .get_string("test_case_id")
            .is_none_or(|id| id.trim().is_empty())
        {
            messages.push("Missing required target field 'test_case_id'".to_string());
        }
        if status_label(target).is_none() {
            messages.push("Missing required target field 'status'".to_string());
        }
        let written = objects(target, "test_step_logs").len();
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
        payload.get_string("id")
    }
}
