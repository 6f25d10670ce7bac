//! Read-only renderings of an operation graph and of a run over it.

use crate::errors::join_cycle;
use crate::{
    DependencyGraph, ExecutionOrder, OperationResult, OperationType, resolve_execution_order,
    validate_dependencies,
};
use graphviz_rust::dot_structures::{
    Attribute, Edge as DotEdge, EdgeTy, Graph as DotGraph, GraphAttributes, Id, Node as DotNode,
    NodeId, Stmt, Vertex,
};
use graphviz_rust::printer::{DotPrinter, PrinterContext};
use std::collections::HashMap;

const SUCCEEDED_FILL: &str = "palegreen";
const FAILED_FILL: &str = "salmon";

/// Graphviz DOT for `graph`. Edges point from a dependency to the
/// operations that need it; optional operations are dashed.
pub fn render_dot(graph: &DependencyGraph) -> String {
    render_dot_with_results(graph, &[])
}

/// Like [`render_dot`], with nodes filled by the outcome in `results`.
pub fn render_dot_with_results(graph: &DependencyGraph, results: &[OperationResult]) -> String {
    let outcomes = outcomes_by_type(results);
    let mut stmts = vec![
        Stmt::Attribute(Attribute(plain("rankdir"), plain("LR"))),
        Stmt::GAttribute(GraphAttributes::Node(vec![Attribute(
            plain("shape"),
            plain("box"),
        )])),
    ];

    for node in graph.nodes() {
        let mut attributes = vec![Attribute(plain("label"), quoted(&node_label(graph, node)))];
        let mut styles = Vec::new();
        if graph
            .definition(node)
            .is_some_and(|definition| !definition.required)
        {
            styles.push("dashed");
        }
        if !graph.is_declared(node) {
            attributes.push(Attribute(plain("color"), plain("red")));
        }
        if let Some(result) = outcomes.get(node) {
            let fill = if result.success { SUCCEEDED_FILL } else { FAILED_FILL };
            styles.push("filled");
            attributes.push(Attribute(plain("fillcolor"), plain(fill)));
        }
        if !styles.is_empty() {
            attributes.push(Attribute(plain("style"), quoted(&styles.join(","))));
        }
        stmts.push(Stmt::Node(DotNode {
            id: node_id(node),
            attributes,
        }));
    }

    for (dependent, dependency) in graph.edges() {
        stmts.push(Stmt::Edge(DotEdge {
            ty: EdgeTy::Pair(Vertex::N(node_id(dependency)), Vertex::N(node_id(dependent))),
            attributes: Vec::new(),
        }));
    }

    DotGraph::DiGraph {
        id: plain("operations"),
        strict: false,
        stmts,
    }
    .print(&mut PrinterContext::default())
}

/// Mermaid flowchart for `graph`, optionally styled by `results`.
pub fn render_mermaid(graph: &DependencyGraph, results: &[OperationResult]) -> String {
    let outcomes = outcomes_by_type(results);
    let ids = mermaid_ids(graph);
    let id = |node: &OperationType| ids.get(node).cloned().unwrap_or_default();
    let mut out = String::from("flowchart TD\n");
    for node in graph.nodes() {
        out.push_str(&format!(
            "    {}[\"{}\"]\n",
            id(node),
            node_label(graph, node).replace('"', "'")
        ));
    }
    for (dependent, dependency) in graph.edges() {
        out.push_str(&format!("    {} --> {}\n", id(dependency), id(dependent)));
    }
    for node in graph.nodes() {
        if let Some(result) = outcomes.get(node) {
            let fill = if result.success { "#98fb98" } else { "#fa8072" };
            out.push_str(&format!("    style {} fill:{fill}\n", id(node)));
        }
    }
    out
}

/// Plain-text summary: order (or the blocking cycle), structural issues and
/// the outcome of every operation.
pub fn render_report(graph: &DependencyGraph, results: &[OperationResult]) -> String {
    let mut out = format!(
        "Operations: {}, dependencies: {}\n",
        graph.len(),
        graph.edge_count()
    );

    let order = resolve_execution_order(graph);
    match &order {
        ExecutionOrder::Ordered(order) => {
            out.push_str(&format!("Execution order: {}\n", join_cycle(order)));
        }
        ExecutionOrder::Unresolvable { cycle } => {
            out.push_str(&format!(
                "Execution order: unresolvable (cycle: {})\n",
                join_cycle(cycle)
            ));
        }
    }

    let validation = validate_dependencies(graph);
    if validation.valid {
        out.push_str("Validation: ok\n");
    } else {
        out.push_str("Validation issues:\n");
        for issue in &validation.errors {
            out.push_str(&format!("  - [{}] {}\n", issue.kind.as_str(), issue.message));
        }
    }

    if results.is_empty() {
        return out;
    }
    let outcomes = outcomes_by_type(results);
    out.push_str("Results:\n");
    let listed: Vec<&OperationType> = if order.is_resolvable() {
        order.as_slice().iter().collect()
    } else {
        graph.nodes().collect()
    };
    for node in listed {
        let line = match outcomes.get(node) {
            Some(result) if result.success => format!(
                "  {node}: succeeded ({} attempt(s), {} ms)\n",
                result.attempts, result.duration_ms
            ),
            Some(result) => format!(
                "  {node}: failed after {} attempt(s): {}\n",
                result.attempts,
                result
                    .error
                    .as_ref()
                    .map(|failure| failure.message.as_str())
                    .unwrap_or("unknown error")
            ),
            None => format!("  {node}: not run\n"),
        };
        out.push_str(&line);
    }
    out
}

fn outcomes_by_type(results: &[OperationResult]) -> HashMap<&OperationType, &OperationResult> {
    results
        .iter()
        .map(|result| (&result.operation_type, result))
        .collect()
}

fn node_label(graph: &DependencyGraph, node: &OperationType) -> String {
    match graph.definition(node) {
        Some(definition) if definition.estimated_time_ms > 0 => {
            format!("{node}\\n~{} ms", definition.estimated_time_ms)
        }
        _ => node.to_string(),
    }
}

fn node_id(node: &OperationType) -> NodeId {
    NodeId(quoted(node.as_str()), None)
}

fn plain(value: &str) -> Id {
    Id::Plain(value.to_string())
}

fn quoted(value: &str) -> Id {
    Id::Escaped(format!("\"{}\"", value.replace('"', "\\\"")))
}

/// Mermaid ids only allow a narrow alphabet, so names are sanitized and
/// prefixed with the node position to keep `GET-X` and `GET_X` apart.
fn mermaid_ids(graph: &DependencyGraph) -> HashMap<&OperationType, String> {
    graph
        .nodes()
        .enumerate()
        .map(|(index, node)| {
            let sanitized: String = node
                .as_str()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            (node, format!("n{index}_{sanitized}"))
        })
        .collect()
}
