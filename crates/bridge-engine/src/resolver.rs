use crate::errors::join_cycle;
use crate::{
    DependencyGraph, DependencyIssue, DependencyValidation, EngineError, IssueKind,
    OperationDefinition, OperationType, ValidationError,
};
use indexmap::IndexSet;
use std::collections::HashSet;
use tracing::{error, warn};

/// Result of ordering a graph. A cyclic graph has no valid order, which is
/// kept distinct from the empty order of an empty graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionOrder {
    Ordered(Vec<OperationType>),
    Unresolvable { cycle: Vec<OperationType> },
}

impl ExecutionOrder {
    /// The order, or an empty slice when unresolvable.
    pub fn as_slice(&self) -> &[OperationType] {
        match self {
            Self::Ordered(order) => order,
            Self::Unresolvable { .. } => &[],
        }
    }

    pub fn is_resolvable(&self) -> bool {
        matches!(self, Self::Ordered(_))
    }

    pub fn cycle(&self) -> Option<&[OperationType]> {
        match self {
            Self::Ordered(_) => None,
            Self::Unresolvable { cycle } => Some(cycle),
        }
    }

    pub fn into_vec(self) -> Vec<OperationType> {
        match self {
            Self::Ordered(order) => order,
            Self::Unresolvable { .. } => Vec::new(),
        }
    }
}

/// Declares every operation first, so operations without dependencies still
/// appear, then adds each declared dependency edge.
pub fn build_dependency_graph(definitions: &[OperationDefinition]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for definition in definitions {
        graph.add_definition(definition.clone());
    }
    for definition in definitions {
        for dependency in &definition.dependencies {
            graph.add_dependency(definition.operation_type.clone(), dependency.clone());
        }
    }
    graph
}

impl From<&[OperationDefinition]> for DependencyGraph {
    fn from(definitions: &[OperationDefinition]) -> Self {
        build_dependency_graph(definitions)
    }
}

/// Depth-first postorder: every dependency is emitted before its dependents,
/// and ties follow node insertion order.
pub fn resolve_execution_order(graph: &DependencyGraph) -> ExecutionOrder {
    if let Some(cycle) = graph.find_cycle() {
        warn!(cycle = %join_cycle(&cycle), "operation graph has a cycle");
        return ExecutionOrder::Unresolvable { cycle };
    }

    let mut order = Vec::with_capacity(graph.len());
    let mut done = HashSet::new();
    let mut in_progress = IndexSet::new();
    for node in graph.nodes() {
        if let Err(cycle) = visit(graph, node, &mut done, &mut in_progress, &mut order) {
            error!(
                cycle = %join_cycle(&cycle),
                "cycle found during ordering after the acyclicity check passed"
            );
            return ExecutionOrder::Unresolvable { cycle };
        }
    }
    ExecutionOrder::Ordered(order)
}

pub fn resolve_definitions(definitions: &[OperationDefinition]) -> ExecutionOrder {
    resolve_execution_order(&build_dependency_graph(definitions))
}

fn visit<'g>(
    graph: &'g DependencyGraph,
    node: &'g OperationType,
    done: &mut HashSet<&'g OperationType>,
    in_progress: &mut IndexSet<&'g OperationType>,
    order: &mut Vec<OperationType>,
) -> Result<(), Vec<OperationType>> {
    if done.contains(node) {
        return Ok(());
    }
    if let Some(begin) = in_progress.get_index_of(node) {
        let mut cycle: Vec<OperationType> = in_progress
            .iter()
            .skip(begin)
            .map(|member| (*member).clone())
            .collect();
        cycle.push(node.clone());
        return Err(cycle);
    }

    in_progress.insert(node);
    for dependency in graph.dependencies_of(node) {
        visit(graph, dependency, done, in_progress, order)?;
    }
    in_progress.pop();
    done.insert(node);
    order.push(node.clone());
    Ok(())
}

/// Structural problems of a graph: cycles and dependencies on operations
/// that were never declared.
pub fn validate_dependencies(graph: &DependencyGraph) -> DependencyValidation {
    let mut issues = Vec::new();

    if let Some(cycle) = graph.find_cycle() {
        let mut issue = DependencyIssue::new(
            IssueKind::CircularDependency,
            format!("Circular dependency detected: {}", join_cycle(&cycle)),
        );
        if let Some(first) = cycle.first() {
            issue = issue.with_operation(first.clone());
        }
        issues.push(issue);
    }

    for (dependent, dependency) in graph.edges() {
        if !graph.is_declared(dependency) {
            issues.push(
                DependencyIssue::new(
                    IssueKind::MissingOperation,
                    format!("Operation {dependent} depends on missing operation {dependency}"),
                )
                .with_operation(dependent.clone())
                .with_dependency(dependency.clone()),
            );
        }
    }

    DependencyValidation::from_issues(issues)
}

pub fn validate_or_raise(graph: &DependencyGraph) -> Result<(), ValidationError> {
    validate_dependencies(graph).into_result()
}

pub fn validate_definitions(definitions: &[OperationDefinition]) -> DependencyValidation {
    validate_dependencies(&build_dependency_graph(definitions))
}

/// `goal` plus everything it transitively depends on, dependencies first.
/// Empty when `goal` is not in the graph.
pub fn calculate_minimal_operation_set(
    graph: &DependencyGraph,
    goal: &OperationType,
) -> Vec<OperationType> {
    if !graph.contains(goal) {
        return Vec::new();
    }
    let mut collected: IndexSet<OperationType> = IndexSet::new();
    let mut seen: HashSet<&OperationType> = HashSet::new();
    collect_closure(graph, goal, &mut seen, &mut collected);
    collected.into_iter().collect()
}

/// Ordered operations needed to reach `goal`: its dependency closure,
/// checked for cycles and undeclared operations.
pub fn plan_for_goal(
    graph: &DependencyGraph,
    goal: &OperationType,
) -> Result<Vec<OperationType>, EngineError> {
    if !graph.is_declared(goal) {
        return Err(EngineError::UnknownGoal(goal.clone()));
    }
    let closure = calculate_minimal_operation_set(graph, goal);
    let subgraph = graph.subgraph(&closure);
    let order = match resolve_execution_order(&subgraph) {
        ExecutionOrder::Ordered(order) => order,
        ExecutionOrder::Unresolvable { cycle } => return Err(EngineError::Unresolvable { cycle }),
    };
    validate_or_raise(&subgraph)?;
    Ok(order)
}

fn collect_closure<'g>(
    graph: &'g DependencyGraph,
    node: &'g OperationType,
    seen: &mut HashSet<&'g OperationType>,
    collected: &mut IndexSet<OperationType>,
) {
    if !seen.insert(node) {
        return;
    }
    for dependency in graph.dependencies_of(node) {
        collect_closure(graph, dependency, seen, collected);
    }
    collected.insert(node.clone());
}
