//! Operation definitions for migrating test assets between providers.

use crate::{OperationDefinition, OperationType};

/// Provider calls of a test-case migration and what each needs first.
///
/// Attachment upload is optional: a plan may skip it when no
/// implementation is registered.
pub fn standard_migration_definitions() -> Vec<OperationDefinition> {
    vec![
        OperationDefinition::new(OperationType::AUTHENTICATE)
            .requires_param("baseUrl")
            .requires_param("apiToken")
            .with_estimated_time_ms(500),
        OperationDefinition::new(OperationType::GET_PROJECTS)
            .depends_on(OperationType::AUTHENTICATE)
            .with_estimated_time_ms(1_000),
        OperationDefinition::new(OperationType::GET_PROJECT)
            .depends_on(OperationType::AUTHENTICATE)
            .requires_param("projectId")
            .with_estimated_time_ms(500),
        OperationDefinition::new(OperationType::GET_MODULES)
            .depends_on(OperationType::GET_PROJECT)
            .with_estimated_time_ms(1_000),
        OperationDefinition::new(OperationType::GET_TEST_CASES)
            .depends_on(OperationType::GET_PROJECT)
            .with_estimated_time_ms(2_000),
        OperationDefinition::new(OperationType::GET_TEST_CASE)
            .depends_on(OperationType::GET_PROJECT)
            .requires_param("testCaseId")
            .with_estimated_time_ms(500),
        OperationDefinition::new(OperationType::GET_TEST_EXECUTIONS)
            .depends_on(OperationType::GET_TEST_CASE)
            .with_estimated_time_ms(1_500),
        OperationDefinition::new(OperationType::CREATE_TEST_CASE)
            .depends_on(OperationType::GET_TEST_CASE)
            .depends_on(OperationType::GET_MODULES)
            .with_estimated_time_ms(1_000),
        OperationDefinition::new(OperationType::CREATE_TEST_EXECUTION)
            .depends_on(OperationType::CREATE_TEST_CASE)
            .depends_on(OperationType::GET_TEST_EXECUTIONS)
            .with_estimated_time_ms(1_000),
        OperationDefinition::new(OperationType::UPLOAD_ATTACHMENT)
            .depends_on(OperationType::CREATE_TEST_CASE)
            .optional()
            .with_estimated_time_ms(3_000),
    ]
}

/// Sum of the estimates of `operations` that appear in `definitions`.
pub fn estimated_duration_ms(definitions: &[OperationDefinition], operations: &[OperationType]) -> u64 {
    operations
        .iter()
        .filter_map(|operation_type| {
            definitions
                .iter()
                .find(|definition| &definition.operation_type == operation_type)
        })
        .map(|definition| definition.estimated_time_ms)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExecutionOrder, resolve_definitions, validate_definitions};

    #[test]
    fn standard_catalog_is_valid_and_resolvable() {
        let definitions = standard_migration_definitions();
        assert!(validate_definitions(&definitions).valid);

        let ExecutionOrder::Ordered(order) = resolve_definitions(&definitions) else {
            panic!("standard catalog should resolve");
        };
        assert_eq!(order.len(), definitions.len());
        assert_eq!(order.first(), Some(&OperationType::AUTHENTICATE));
    }

    #[test]
    fn estimate_sums_known_operations_only() {
        let definitions = standard_migration_definitions();
        let estimate = estimated_duration_ms(
            &definitions,
            &[
                OperationType::AUTHENTICATE,
                OperationType::GET_PROJECT,
                OperationType::new("UNKNOWN"),
            ],
        );
        assert_eq!(estimate, 1_000);
    }
}
