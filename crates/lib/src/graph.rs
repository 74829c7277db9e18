//! Dependency graph for a build request.
//!
//! A [`BuildGraph`] holds the transitive closure of a root target's
//! dependencies. Edges point from a dependency to its dependent, so a
//! topological order runs dependencies first. Construction rejects unknown
//! dependency names and cycles before any action runs.

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::scheduler::{BuildError, CyclePath};
use crate::target::{Target, TargetSet};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
  Visiting,
  Done,
}

/// The targets reachable from one root, with a deterministic execution order.
pub struct BuildGraph {
  graph: DiGraph<Arc<Target>, ()>,
  nodes: HashMap<String, NodeIndex>,
  /// Depth-first post-order from the root, following dependencies in
  /// declaration order.
  order: Vec<NodeIndex>,
  root: NodeIndex,
}

impl BuildGraph {
  /// Expand `root` and everything it depends on.
  ///
  /// # Errors
  ///
  /// `UnknownTarget` if the root or any dependency is not registered, and
  /// `Cycle` if a target transitively depends on itself.
  pub fn expand(targets: &TargetSet, root: &str) -> Result<Self, BuildError> {
    let root_target = targets.get(root).ok_or_else(|| BuildError::UnknownTarget {
      name: root.to_string(),
      required_by: None,
    })?;

    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();
    let root_idx = graph.add_node(Arc::clone(root_target));
    nodes.insert(root.to_string(), root_idx);

    // Add every reachable target before wiring edges.
    let mut pending = vec![root_idx];
    while let Some(idx) = pending.pop() {
      let target: Arc<Target> = Arc::clone(&graph[idx]);
      for dep in target.dependencies() {
        if nodes.contains_key(dep) {
          continue;
        }
        let dep_target = targets.get(dep).ok_or_else(|| BuildError::UnknownTarget {
          name: dep.clone(),
          required_by: Some(target.name().to_string()),
        })?;
        let dep_idx = graph.add_node(Arc::clone(dep_target));
        nodes.insert(dep.clone(), dep_idx);
        pending.push(dep_idx);
      }
    }

    for idx in graph.node_indices().collect::<Vec<_>>() {
      let target = Arc::clone(&graph[idx]);
      for dep in target.dependencies() {
        let dep_idx = nodes[dep.as_str()];
        graph.update_edge(dep_idx, idx, ());
      }
    }

    let mut build_graph = Self {
      graph,
      nodes,
      order: Vec::new(),
      root: root_idx,
    };
    build_graph.order = build_graph.post_order()?;

    debug!(root, targets = build_graph.len(), "expanded build graph");
    Ok(build_graph)
  }

  /// Depth-first traversal that records the finishing order and reports the
  /// first cycle found as the chain of targets that closes it.
  fn post_order(&self) -> Result<Vec<NodeIndex>, BuildError> {
    let mut marks: HashMap<NodeIndex, Mark> = HashMap::new();
    let mut stack = Vec::new();
    let mut order = Vec::with_capacity(self.graph.node_count());
    self.visit(self.root, &mut marks, &mut stack, &mut order)?;
    Ok(order)
  }

  fn visit(
    &self,
    idx: NodeIndex,
    marks: &mut HashMap<NodeIndex, Mark>,
    stack: &mut Vec<NodeIndex>,
    order: &mut Vec<NodeIndex>,
  ) -> Result<(), BuildError> {
    match marks.get(&idx) {
      Some(Mark::Done) => return Ok(()),
      Some(Mark::Visiting) => {
        let start = stack.iter().position(|&n| n == idx).unwrap_or(0);
        let path = stack[start..]
          .iter()
          .map(|&n| self.graph[n].name().to_string())
          .collect();
        return Err(BuildError::Cycle { path: CyclePath(path) });
      }
      None => {}
    }

    marks.insert(idx, Mark::Visiting);
    stack.push(idx);
    for dep in self.graph[idx].dependencies() {
      self.visit(self.nodes[dep.as_str()], marks, stack, order)?;
    }
    stack.pop();
    marks.insert(idx, Mark::Done);
    order.push(idx);
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  /// Every target in dependency-first order. The root is last.
  pub fn topological_order(&self) -> Vec<Arc<Target>> {
    self.order.iter().map(|&idx| Arc::clone(&self.graph[idx])).collect()
  }

  /// Group targets into waves that can execute concurrently.
  ///
  /// A target's wave is one past the deepest wave among its dependencies.
  /// Within a wave, targets keep their topological order.
  pub fn waves(&self) -> Vec<Vec<Arc<Target>>> {
    let mut level: HashMap<NodeIndex, usize> = HashMap::new();
    let mut waves: Vec<Vec<Arc<Target>>> = Vec::new();

    for &idx in &self.order {
      let wave = self
        .graph
        .neighbors_directed(idx, Direction::Incoming)
        .filter_map(|dep| level.get(&dep))
        .map(|&l| l + 1)
        .max()
        .unwrap_or(0);
      level.insert(idx, wave);
      if waves.len() <= wave {
        waves.resize_with(wave + 1, Vec::new);
      }
      waves[wave].push(Arc::clone(&self.graph[idx]));
    }

    waves
  }

}
