use crate::{OperationDefinition, OperationType};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

/// Directed graph over operation types. An edge `dependent -> dependency`
/// means the dependent cannot run before the dependency.
///
/// Adjacency is kept in both directions and in insertion order, so every
/// traversal is deterministic for a given build sequence.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    dependencies: IndexMap<OperationType, IndexSet<OperationType>>,
    dependents: IndexMap<OperationType, IndexSet<OperationType>>,
    declared: IndexSet<OperationType>,
    definitions: IndexMap<OperationType, OperationDefinition>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a node. Idempotent; returns `true` if the node was not yet
    /// part of the graph.
    pub fn add_node(&mut self, operation_type: OperationType) -> bool {
        let added = self.ensure_node(&operation_type);
        self.declared.insert(operation_type);
        added
    }

    /// Declares a node and keeps its definition for diagnostics and
    /// rendering. Edges are not added.
    pub fn add_definition(&mut self, definition: OperationDefinition) -> bool {
        let added = self.add_node(definition.operation_type.clone());
        self.definitions
            .insert(definition.operation_type.clone(), definition);
        added
    }

    /// Records that `dependent` requires `dependency`. Endpoints not yet in
    /// the graph are added without being declared.
    pub fn add_dependency(&mut self, dependent: OperationType, dependency: OperationType) {
        self.ensure_node(&dependent);
        self.ensure_node(&dependency);
        if let Some(forward) = self.dependencies.get_mut(&dependent) {
            forward.insert(dependency.clone());
        }
        if let Some(reverse) = self.dependents.get_mut(&dependency) {
            reverse.insert(dependent);
        }
    }

    pub fn contains(&self, operation_type: &OperationType) -> bool {
        self.dependencies.contains_key(operation_type)
    }

    /// Whether the node was added explicitly rather than only referenced by
    /// an edge.
    pub fn is_declared(&self, operation_type: &OperationType) -> bool {
        self.declared.contains(operation_type)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &OperationType> {
        self.dependencies.keys()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(IndexSet::len).sum()
    }

    /// Direct dependencies of `operation_type`, in insertion order.
    pub fn dependencies_of(&self, operation_type: &OperationType) -> impl Iterator<Item = &OperationType> {
        self.dependencies
            .get(operation_type)
            .into_iter()
            .flat_map(IndexSet::iter)
    }

    /// Operations that depend directly on `operation_type`.
    pub fn dependents_of(&self, operation_type: &OperationType) -> impl Iterator<Item = &OperationType> {
        self.dependents
            .get(operation_type)
            .into_iter()
            .flat_map(IndexSet::iter)
    }

    pub fn definition(&self, operation_type: &OperationType) -> Option<&OperationDefinition> {
        self.definitions.get(operation_type)
    }

    /// `(dependent, dependency)` pairs in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&OperationType, &OperationType)> {
        self.dependencies
            .iter()
            .flat_map(|(dependent, deps)| deps.iter().map(move |dependency| (dependent, dependency)))
    }

    pub fn has_cycles(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// Nodes of one directed cycle, first node repeated at the end, or `None`
    /// for an acyclic graph.
    ///
    /// Iterative depth-first search. A dependency met while still on the
    /// current path closes a cycle; a fully visited one is skipped, so
    /// shared sub-dependencies are walked once.
    pub fn find_cycle(&self) -> Option<Vec<OperationType>> {
        let mut visited: HashSet<&OperationType> = HashSet::new();

        for start in self.dependencies.keys() {
            if visited.contains(start) {
                continue;
            }
            let mut path: IndexSet<&OperationType> = IndexSet::new();
            let mut stack: Vec<(&OperationType, usize)> = vec![(start, 0)];
            path.insert(start);

            while let Some(&(node, next)) = stack.last() {
                let dependency = self
                    .dependencies
                    .get(node)
                    .and_then(|deps| deps.get_index(next));
                match dependency {
                    Some(dependency) => {
                        if let Some(top) = stack.last_mut() {
                            top.1 += 1;
                        }
                        if let Some(begin) = path.get_index_of(dependency) {
                            let mut cycle: Vec<OperationType> =
                                path.iter().skip(begin).map(|node| (*node).clone()).collect();
                            cycle.push(dependency.clone());
                            return Some(cycle);
                        }
                        if !visited.contains(dependency) {
                            path.insert(dependency);
                            stack.push((dependency, 0));
                        }
                    }
                    None => {
                        visited.insert(node);
                        path.pop();
                        stack.pop();
                    }
                }
            }
        }
        None
    }

    /// Graph restricted to `nodes`, keeping edges and definitions among them.
    pub fn subgraph<'a>(&self, nodes: impl IntoIterator<Item = &'a OperationType>) -> Self {
        let keep: IndexSet<&OperationType> = nodes.into_iter().filter(|node| self.contains(node)).collect();
        let mut graph = Self::new();
        for node in &keep {
            match self.definitions.get(*node) {
                Some(definition) => {
                    graph.add_definition(definition.clone());
                }
                None if self.is_declared(node) => {
                    graph.add_node((*node).clone());
                }
                None => {
                    graph.ensure_node(node);
                }
            }
        }
        for (dependent, dependency) in self.edges() {
            if keep.contains(dependent) && keep.contains(dependency) {
                graph.add_dependency(dependent.clone(), dependency.clone());
            }
        }
        graph
    }

    fn ensure_node(&mut self, operation_type: &OperationType) -> bool {
        if self.dependencies.contains_key(operation_type) {
            return false;
        }
        self.dependencies
            .insert(operation_type.clone(), IndexSet::new());
        self.dependents.insert(operation_type.clone(), IndexSet::new());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(name: &str) -> OperationType {
        OperationType::new(name)
    }

    #[test]
    fn add_node_is_idempotent() {
        let mut graph = DependencyGraph::new();
        assert!(graph.add_node(op("A")));
        assert!(!graph.add_node(op("A")));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn add_dependency_records_both_directions() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(op("A"), op("B"));
        graph.add_dependency(op("C"), op("B"));

        assert_eq!(graph.dependencies_of(&op("A")).collect::<Vec<_>>(), vec![&op("B")]);
        assert_eq!(
            graph.dependents_of(&op("B")).collect::<Vec<_>>(),
            vec![&op("A"), &op("C")]
        );
        assert!(graph.contains(&op("B")));
        assert!(!graph.is_declared(&op("B")));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(op("A"), op("C"));
        graph.add_dependency(op("B"), op("C"));
        graph.add_dependency(op("D"), op("A"));
        graph.add_dependency(op("D"), op("B"));
        assert!(!graph.has_cycles());
    }

    #[test]
    fn find_cycle_reports_the_loop() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(op("A"), op("B"));
        graph.add_dependency(op("B"), op("C"));
        graph.add_dependency(op("C"), op("A"));
        graph.add_dependency(op("D"), op("A"));

        let cycle = graph.find_cycle().expect("cycle should be found");
        assert_eq!(cycle, vec![op("A"), op("B"), op("C"), op("A")]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(op("A"), op("A"));
        assert_eq!(graph.find_cycle(), Some(vec![op("A"), op("A")]));
    }

    #[test]
    fn subgraph_keeps_internal_edges_only() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(op("A"), op("B"));
        graph.add_dependency(op("B"), op("C"));
        let sub = graph.subgraph([&op("A"), &op("B")]);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.edge_count(), 1);
        assert!(!sub.contains(&op("C")));
    }
}
