use bridge_canonical::{EntityType, Payload, SystemId, payload_from_value, translation_key};
use bridge_engine::{
    ExecutionContext, Operation, OperationDefinition, OperationError, OperationExecutor,
    OperationType, SharedOperation, build_dependency_graph, operation_registry, render_report,
    standard_migration_definitions,
};
use bridge_transform::{Transformer, default_registry};
use serde_json::{Value, json};
use std::sync::Arc;

/// Provider call stub returning a canned response.
struct CannedOperation {
    definition: OperationDefinition,
    response: Value,
}

#[async_trait::async_trait]
impl Operation for CannedOperation {
    fn definition(&self) -> &OperationDefinition {
        &self.definition
    }

    async fn execute(&self, _context: &ExecutionContext) -> Result<Value, OperationError> {
        Ok(self.response.clone())
    }
}

/// Converts the fetched source test case into the target shape.
struct CreateTestCase {
    definition: OperationDefinition,
    transformer: Arc<Transformer>,
}

#[async_trait::async_trait]
impl Operation for CreateTestCase {
    fn definition(&self) -> &OperationDefinition {
        &self.definition
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<Value, OperationError> {
        let fetched = context
            .result(&OperationType::GET_TEST_CASE)
            .map_err(|error| OperationError::new(error.to_string()))?
            .ok_or_else(|| OperationError::new("source test case was not fetched"))?;
        let source: Payload = payload_from_value(fetched)
            .ok_or_else(|| OperationError::new("source test case is not an object"))?;
        let target = self
            .transformer
            .transform(
                &SystemId::new("zephyr"),
                &SystemId::new("qtest"),
                EntityType::TestCase,
                &source,
                None,
            )
            .map_err(|error| OperationError::new(error.to_string()))?;
        Ok(Value::Object(target))
    }
}

fn definition(operation_type: &OperationType) -> OperationDefinition {
    standard_migration_definitions()
        .into_iter()
        .find(|definition| &definition.operation_type == operation_type)
        .expect("operation should be in the standard catalog")
}

fn canned(operation_type: OperationType, response: Value) -> SharedOperation {
    Arc::new(CannedOperation {
        definition: definition(&operation_type),
        response,
    })
}

#[tokio::test(flavor = "current_thread")]
async fn planned_run_fetches_and_transforms_test_case() {
    let transformer = Arc::new(Transformer::new(Arc::new(default_registry())));
    let registry = operation_registry([
        canned(OperationType::AUTHENTICATE, json!({ "token": "abc" })),
        canned(OperationType::GET_PROJECT, json!({ "id": "P-1" })),
        canned(OperationType::GET_MODULES, json!([{ "id": 10, "name": "Checkout" }])),
        canned(
            OperationType::GET_TEST_CASE,
            json!({
                "key": "SHOP-T7",
                "name": "Remove item from cart",
                "status": "Approved",
                "priority": "High",
                "testScript": {
                    "steps": [
                        { "index": 1, "description": "Add item", "expectedResult": "1 item" },
                        { "index": 2, "description": "Remove item", "expectedResult": "Cart empty" }
                    ]
                }
            }),
        ),
        Arc::new(CreateTestCase {
            definition: definition(&OperationType::CREATE_TEST_CASE),
            transformer: Arc::clone(&transformer),
        }) as SharedOperation,
    ]);
    let context = ExecutionContext::new()
        .with_param("baseUrl", json!("https://zephyr.example"))
        .with_param("apiToken", json!("secret"))
        .with_param("projectId", json!("P-1"))
        .with_param("testCaseId", json!("SHOP-T7"));

    let report = OperationExecutor::default()
        .plan_and_execute(
            &standard_migration_definitions(),
            &registry,
            &OperationType::CREATE_TEST_CASE,
            &context,
        )
        .await
        .expect("plan should resolve");

    assert!(report.is_complete());
    assert_eq!(report.plan.last(), Some(&OperationType::CREATE_TEST_CASE));

    let created = context
        .result(&OperationType::CREATE_TEST_CASE)
        .expect("results readable")
        .expect("target payload stored");
    assert_eq!(created["pid"], json!("SHOP-T7"));
    assert_eq!(created["name"], json!("Remove item from cart"));
    assert_eq!(
        created["test_steps"].as_array().map(Vec::len),
        Some(2)
    );

    let key = translation_key(
        &SystemId::new("zephyr"),
        &SystemId::new("qtest"),
        EntityType::TestCase,
        "SHOP-T7",
    );
    assert!(
        transformer
            .translation(&key)
            .expect("ledger readable")
            .is_some()
    );

    let graph = build_dependency_graph(&standard_migration_definitions());
    let report_text = render_report(&graph.subgraph(&report.plan), &report.results);
    assert!(report_text.contains("CREATE_TEST_CASE: succeeded (1 attempt(s)"));
}
