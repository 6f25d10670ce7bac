use bridge_canonical::{
    EntityType, ExecutionStatus, Payload, PayloadExt, SystemId, TestCaseStatus, payload_from_value,
};
use bridge_transform::{TransformationContext, Transformer, default_registry};
use serde_json::{Value, json};
use std::sync::Arc;

fn payload(value: Value) -> Payload {
    payload_from_value(value).expect("fixture should be an object")
}

fn zephyr_test_case() -> Payload {
    payload(json!({
        "id": 101,
        "key": "SHOP-T4",
        "name": "Apply discount code",
        "objective": "Discounts reduce the order total",
        "status": "Ready",
        "priority": "High",
        "labels": ["checkout"],
        "customFields": { "Component": "Cart" },
        "testScript": {
            "type": "STEP_BY_STEP",
            "steps": [
                { "index": 1, "description": "Add item", "expectedResult": "Cart has 1 item" },
                { "index": 2, "description": "Enter code SAVE10", "testData": "SAVE10" },
                { "index": 4, "description": "Check total", "expectedResult": "10% off" }
            ]
        }
    }))
}

fn zephyr_execution() -> Payload {
    payload(json!({
        "key": "SHOP-E9",
        "testCaseKey": "SHOP-T4",
        "status": "Fail",
        "environment": "staging",
        "actualEndDate": "2024-05-02T12:00:00Z",
        "scriptResults": [
            { "index": 1, "status": "Pass" },
            { "index": 2, "status": "Pass" },
            { "index": 3, "status": "Fail", "actualResult": "Total unchanged" }
        ],
        "issueKeys": ["SHOP-77"]
    }))
}

fn qtest_test_case() -> Payload {
    payload(json!({
        "id": 3301,
        "pid": "TC-12",
        "name": "Export report",
        "properties": [
            { "field_name": "Status", "field_value": "Approved" },
            { "field_name": "Priority", "field_value": "Low" }
        ],
        "test_steps": [
            { "id": 1, "order": 1, "description": "Open reports", "expected": "List shown" },
            { "id": 2, "order": 2, "description": "Click export", "expected": "CSV downloaded" }
        ]
    }))
}

fn qtest_execution() -> Payload {
    payload(json!({
        "id": 8801,
        "test_case_id": 3301,
        "status": { "name": "Passed" },
        "test_step_logs": [
            { "test_step_id": 1, "status": { "name": "Passed" } },
            { "test_step_id": 2, "status": { "name": "Passed" } }
        ]
    }))
}

fn there_and_back(
    transformer: &Transformer,
    from: &str,
    to: &str,
    entity_type: EntityType,
    source: &Payload,
) -> (Payload, Payload) {
    let from = SystemId::new(from);
    let to = SystemId::new(to);
    let outbound = transformer
        .transform(&from, &to, entity_type, source, None)
        .expect("outbound transform should succeed");
    let inbound = transformer
        .transform(&to, &from, entity_type, &outbound, None)
        .expect("inbound transform should succeed");
    (outbound, inbound)
}

#[test]
fn zephyr_test_case_survives_round_trip_through_qtest() {
    let transformer = Transformer::new(Arc::new(default_registry()));
    let source = zephyr_test_case();
    let (outbound, inbound) =
        there_and_back(&transformer, "zephyr", "qtest", EntityType::TestCase, &source);

    assert_eq!(outbound.get_array("test_steps").map(Vec::len), Some(3));
    assert_eq!(inbound.get_str("key"), Some("SHOP-T4"));
    assert_eq!(inbound.get_str("name"), Some("Apply discount code"));
    assert_eq!(inbound.get_str("status"), Some("Ready"));
    assert_eq!(inbound.get_str("priority"), Some("High"));

    let steps: Vec<String> = inbound
        .get_object("testScript")
        .and_then(|script| script.get_array("steps"))
        .expect("steps written")
        .iter()
        .filter_map(|step| step.get("description").and_then(Value::as_str).map(str::to_string))
        .collect();
    assert_eq!(steps, vec!["Add item", "Enter code SAVE10", "Check total"]);
}

#[test]
fn zephyr_execution_survives_round_trip_through_qtest() {
    let transformer = Transformer::new(Arc::new(default_registry()));
    let (outbound, inbound) = there_and_back(
        &transformer,
        "zephyr",
        "qtest",
        EntityType::TestExecution,
        &zephyr_execution(),
    );

    assert_eq!(outbound.get_object("status").and_then(|s| s.get_str("name")), Some("Failed"));
    assert_eq!(inbound.get_str("testCaseKey"), Some("SHOP-T4"));
    assert_eq!(inbound.get_str("status"), Some("Fail"));
    assert_eq!(inbound.get_array("scriptResults").map(Vec::len), Some(3));
    assert_eq!(inbound.get_array("issueKeys").map(Vec::len), Some(1));
}

#[test]
fn qtest_records_survive_round_trip_through_zephyr() {
    let transformer = Transformer::new(Arc::new(default_registry()));

    let (_, case) =
        there_and_back(&transformer, "qtest", "zephyr", EntityType::TestCase, &qtest_test_case());
    assert_eq!(case.get_str("pid"), Some("TC-12"));
    assert_eq!(case.get_str("name"), Some("Export report"));
    assert_eq!(case.get_array("test_steps").map(Vec::len), Some(2));

    let (_, execution) = there_and_back(
        &transformer,
        "qtest",
        "zephyr",
        EntityType::TestExecution,
        &qtest_execution(),
    );
    assert_eq!(execution.get_string("id").as_deref(), Some("8801"));
    assert_eq!(execution.get_string("test_case_id").as_deref(), Some("3301"));
    assert_eq!(execution.get_array("test_step_logs").map(Vec::len), Some(2));
}

#[test]
fn unrecognized_statuses_fall_back_to_lenient_defaults() {
    let transformer = Transformer::new(Arc::new(default_registry()));
    let context = TransformationContext::new(SystemId::new("zephyr"), SystemId::new("qtest"));

    for raw in ["", "Needs Work", "42", "passed-ish"] {
        let mut case = zephyr_test_case();
        case.insert("status".to_string(), json!(raw));
        let canonical = transformer
            .get_canonical_form(&SystemId::new("zephyr"), EntityType::TestCase, &case, &context)
            .expect("unknown status must not fail");
        let bridge_canonical::CanonicalEntity::TestCase(case) = canonical else {
            panic!("expected a test case");
        };
        assert_eq!(case.status, TestCaseStatus::Draft, "status {raw:?}");

        let mut execution = zephyr_execution();
        execution.insert("status".to_string(), json!(raw));
        let canonical = transformer
            .get_canonical_form(
                &SystemId::new("zephyr"),
                EntityType::TestExecution,
                &execution,
                &context,
            )
            .expect("unknown status must not fail");
        let bridge_canonical::CanonicalEntity::TestExecution(execution) = canonical else {
            panic!("expected an execution");
        };
        assert_eq!(execution.status, ExecutionStatus::NotExecuted, "status {raw:?}");
    }
}

#[test]
fn value_and_field_mappings_apply_once_per_conversion() {
    let transformer = Transformer::new(Arc::new(default_registry()));
    let mut source = zephyr_test_case();
    source.insert("status".to_string(), json!("Signed Off"));
    let context = TransformationContext::new(SystemId::new("zephyr"), SystemId::new("qtest"))
        .with_value_mapping("status", "Signed Off", "Approved")
        .with_field_mapping("Component", "Module");

    let target = transformer
        .transform(
            &SystemId::new("zephyr"),
            &SystemId::new("qtest"),
            EntityType::TestCase,
            &source,
            Some(&context),
        )
        .expect("transform should succeed");

    let properties = target.get_array("properties").expect("properties written");
    let lookup = |name: &str| {
        properties
            .iter()
            .filter_map(Value::as_object)
            .find(|property| property.get_str("field_name") == Some(name))
            .and_then(|property| property.get_str("field_value"))
    };
    assert_eq!(lookup("Status"), Some("Approved"));
    assert_eq!(lookup("Module"), Some("Cart"));
    assert_eq!(lookup("Component"), None);
}
