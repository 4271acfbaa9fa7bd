//! Directed dependency graph over vertex keys.
//!
//! Stored as an adjacency list keyed by vertex, so edges are plain key pairs
//! and nothing holds references into anything else. An edge `from -> to`
//! means `from` must be processed before `to`.
//!
//! Vertices are remembered in insertion order and every whole-graph walk
//! starts from them in that order, so traversal output is deterministic.
//! All depth-first walks use an explicit stack.

use std::{
  collections::{HashMap, HashSet, VecDeque},
  hash::Hash,
};

#[derive(Debug, Clone)]
pub struct DependencyGraph<V> {
  adjacency:  HashMap<V, Vec<V>>,
  order:      Vec<V>,
  edge_count: usize,
}

impl<V> Default for DependencyGraph<V> {
  fn default() -> Self {
    Self {
      adjacency:  HashMap::new(),
      order:      Vec::new(),
      edge_count: 0,
    }
  }
}

/// DFS colouring: absent from the map means unvisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
  OnStack,
  Done,
}

/// Result of a full depth-first walk.
struct Walk<'a, V> {
  /// Vertices in the order they finished.
  postorder: Vec<&'a V>,
  /// A back-edge to an on-stack vertex was seen.
  cyclic:    bool,
}

impl<V: Clone + Eq + Hash> DependencyGraph<V> {
  pub fn new() -> Self { Self::default() }

  /// Add a vertex if absent. Returns `true` if it was new.
  pub fn add_vertex(&mut self, vertex: V) -> bool {
    if self.adjacency.contains_key(&vertex) {
      return false;
    }
    self.order.push(vertex.clone());
    self.adjacency.insert(vertex, Vec::new());
    true
  }

  /// Append `from -> to`, adding either endpoint as needed.
  pub fn add_edge(&mut self, from: V, to: V) {
    self.add_vertex(from.clone());
    self.add_vertex(to.clone());
    if let Some(out) = self.adjacency.get_mut(&from) {
      out.push(to);
      self.edge_count += 1;
    }
  }

  /// Remove the first `from -> to` entry. Returns `true` if one was found.
  pub fn remove_edge(&mut self, from: &V, to: &V) -> bool {
    let Some(out) = self.adjacency.get_mut(from) else {
      return false;
    };
    match out.iter().position(|v| v == to) {
      Some(pos) => {
        out.remove(pos);
        self.edge_count -= 1;
        true
      }
      None => false,
    }
  }

  /// Cycle-safe insertion: add `from -> to`, keep it only if the graph stays
  /// acyclic. On rejection the edge and any endpoint it introduced are
  /// rolled back and `false` is returned.
  pub fn add_edge_checked(&mut self, from: V, to: V) -> bool {
    let new_from = !self.contains_vertex(&from);
    let new_to = !self.contains_vertex(&to);
    self.add_edge(from.clone(), to.clone());
    if !self.has_cycle() {
      return true;
    }
    self.remove_edge(&from, &to);
    if new_from {
      self.remove_isolated_vertex(&from);
    }
    if new_to {
      self.remove_isolated_vertex(&to);
    }
    false
  }

  /// Whether adding `from -> to` would close a cycle: true exactly when
  /// `from` is already reachable from `to`.
  pub fn would_create_cycle(&self, from: &V, to: &V) -> bool {
    from == to || self.bfs(to).contains(from)
  }

  pub fn contains_vertex(&self, vertex: &V) -> bool {
    self.adjacency.contains_key(vertex)
  }

  pub fn has_edge(&self, from: &V, to: &V) -> bool {
    self.adjacency.get(from).is_some_and(|out| out.contains(to))
  }

  /// A copy of the outgoing adjacency list; empty for unknown vertices.
  pub fn neighbors(&self, vertex: &V) -> Vec<V> {
    self.adjacency.get(vertex).cloned().unwrap_or_default()
  }

  /// All vertices in insertion order.
  pub fn vertices(&self) -> &[V] { &self.order }

  pub fn vertex_count(&self) -> usize { self.order.len() }

  pub fn edge_count(&self) -> usize { self.edge_count }

  /// Breadth-first traversal from `start`, in discovery order and including
  /// `start` itself. Empty if `start` is unknown.
  pub fn bfs(&self, start: &V) -> Vec<V> {
    if !self.contains_vertex(start) {
      return Vec::new();
    }
    let mut visited: HashSet<&V> = HashSet::from([start]);
    let mut queue: VecDeque<&V> = VecDeque::from([start]);
    let mut result = Vec::new();

    while let Some(vertex) = queue.pop_front() {
      result.push(vertex.clone());
      for next in self.out(vertex) {
        if visited.insert(next) {
          queue.push_back(next);
        }
      }
    }
    result
  }

  /// `true` if any directed cycle exists, including self-loops. O(V + E).
  pub fn has_cycle(&self) -> bool { self.walk(true).cyclic }

  /// Vertices ordered so every edge `a -> b` places `a` before `b`.
  ///
  /// On a cyclic graph the output still lists every vertex once but the
  /// order is meaningless; use [`Self::checked_topological_sort`] to detect
  /// that case.
  pub fn topological_sort(&self) -> Vec<V> {
    self.walk(false).postorder.into_iter().rev().cloned().collect()
  }

  /// Like [`Self::topological_sort`] but `None` if the graph has a cycle.
  pub fn checked_topological_sort(&self) -> Option<Vec<V>> {
    let walk = self.walk(false);
    if walk.cyclic {
      return None;
    }
    Some(walk.postorder.into_iter().rev().cloned().collect())
  }

  /// Partition of all vertices into weakly connected groups, treating every
  /// edge as undirected. Groups and their members are in discovery order.
  pub fn connected_components(&self) -> Vec<Vec<V>> {
    let mut undirected: HashMap<&V, Vec<&V>> = HashMap::new();
    for (from, out) in &self.adjacency {
      for to in out {
        undirected.entry(from).or_default().push(to);
        undirected.entry(to).or_default().push(from);
      }
    }

    let mut visited: HashSet<&V> = HashSet::new();
    let mut components = Vec::new();

    for root in &self.order {
      if !visited.insert(root) {
        continue;
      }
      let mut component = Vec::new();
      let mut stack = vec![root];
      while let Some(vertex) = stack.pop() {
        component.push(vertex.clone());
        for next in undirected.get(vertex).into_iter().flatten() {
          if visited.insert(*next) {
            stack.push(*next);
          }
        }
      }
      components.push(component);
    }
    components
  }

  pub fn clear(&mut self) {
    self.adjacency.clear();
    self.order.clear();
    self.edge_count = 0;
  }

  fn out(&self, vertex: &V) -> &[V] {
    self.adjacency.get(vertex).map_or(&[], Vec::as_slice)
  }

  fn remove_isolated_vertex(&mut self, vertex: &V) {
    let isolated = self.out(vertex).is_empty()
      && !self.adjacency.values().any(|out| out.contains(vertex));
    if isolated {
      self.adjacency.remove(vertex);
      self.order.retain(|v| v != vertex);
    }
  }

  /// Depth-first walk over every vertex. With `stop_on_cycle` the walk ends
  /// at the first back-edge; otherwise it finishes and only flags it.
  fn walk(&self, stop_on_cycle: bool) -> Walk<'_, V> {
    let mut marks: HashMap<&V, Mark> = HashMap::with_capacity(self.order.len());
    let mut postorder = Vec::with_capacity(self.order.len());
    let mut cyclic = false;

    for root in &self.order {
      if marks.contains_key(root) {
        continue;
      }
      marks.insert(root, Mark::OnStack);
      // (vertex, index of the next outgoing edge to explore)
      let mut stack: Vec<(&V, usize)> = vec![(root, 0)];

      while let Some(top) = stack.last_mut() {
        let (vertex, cursor) = (top.0, top.1);
        match self.out(vertex).get(cursor) {
          Some(next) => {
            top.1 += 1;
            match marks.get(next) {
              None => {
                marks.insert(next, Mark::OnStack);
                stack.push((next, 0));
              }
              Some(Mark::OnStack) => {
                cyclic = true;
                if stop_on_cycle {
                  return Walk { postorder, cyclic };
                }
              }
              Some(Mark::Done) => {}
            }
          }
          None => {
            marks.insert(vertex, Mark::Done);
            postorder.push(vertex);
            stack.pop();
          }
        }
      }
    }

    Walk { postorder, cyclic }
  }
}
