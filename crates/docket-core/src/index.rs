//! Height-balanced (AVL) ordered index.
//!
//! Each node is keyed by `K` and holds a bucket of values that share the key,
//! kept sorted by `V`. Equal keys therefore tie-break by value and every
//! distinct `(key, value)` pair stays retrievable; only an exact repeat of a
//! pair is rejected.
//!
//! Insertion rebalances with the classic four rotation cases. The case is
//! picked by comparing the inserted key with the unbalanced node's immediate
//! child, and heights are recomputed bottom-up on the way out of the
//! recursion.

use std::cmp::Ordering;

type Link<K, V> = Option<Box<Node<K, V>>>;

#[derive(Debug, Clone)]
struct Node<K, V> {
  key:    K,
  values: Vec<V>,
  height: usize,
  left:   Link<K, V>,
  right:  Link<K, V>,
}

impl<K, V> Node<K, V> {
  fn leaf(key: K, value: V) -> Box<Self> {
    Box::new(Self {
      key,
      values: vec![value],
      height: 1,
      left: None,
      right: None,
    })
  }
}

/// What an insert did to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
  /// A new node was linked in; ancestors may need rebalancing.
  NewNode,
  /// The value joined an existing node's bucket; shape is unchanged.
  Bucket,
  /// The exact pair was already present.
  Duplicate,
}

struct Inserted<K, V> {
  node:      Box<Node<K, V>>,
  placement: Placement,
  /// Inserted key compared with the returned node's key before any rotation.
  side:      Ordering,
}

fn height<K, V>(link: &Link<K, V>) -> usize {
  link.as_ref().map_or(0, |n| n.height)
}

fn balance_factor<K, V>(node: &Node<K, V>) -> isize {
  height(&node.left) as isize - height(&node.right) as isize
}

fn update_height<K, V>(node: &mut Node<K, V>) {
  node.height = 1 + height(&node.left).max(height(&node.right));
}

fn rotate_right<K, V>(mut y: Box<Node<K, V>>) -> Box<Node<K, V>> {
  let Some(mut x) = y.left.take() else {
    return y;
  };
  y.left = x.right.take();
  update_height(&mut y);
  x.right = Some(y);
  update_height(&mut x);
  x
}

fn rotate_left<K, V>(mut x: Box<Node<K, V>>) -> Box<Node<K, V>> {
  let Some(mut y) = x.right.take() else {
    return x;
  };
  x.right = y.left.take();
  update_height(&mut x);
  y.left = Some(x);
  update_height(&mut y);
  y
}

fn insert_node<K: Ord, V: Ord>(
  link: Link<K, V>,
  key: K,
  value: V,
) -> Inserted<K, V> {
  let Some(mut node) = link else {
    return Inserted {
      node:      Node::leaf(key, value),
      placement: Placement::NewNode,
      side:      Ordering::Equal,
    };
  };

  let side = key.cmp(&node.key);
  let (placement, child_side) = match side {
    Ordering::Less => {
      let child = insert_node(node.left.take(), key, value);
      node.left = Some(child.node);
      (child.placement, child.side)
    }
    Ordering::Greater => {
      let child = insert_node(node.right.take(), key, value);
      node.right = Some(child.node);
      (child.placement, child.side)
    }
    Ordering::Equal => {
      let placement = match node.values.binary_search(&value) {
        Ok(_) => Placement::Duplicate,
        Err(pos) => {
          node.values.insert(pos, value);
          Placement::Bucket
        }
      };
      return Inserted { node, placement, side };
    }
  };

  if placement != Placement::NewNode {
    return Inserted { node, placement, side };
  }

  update_height(&mut node);
  let balance = balance_factor(&node);

  let node = if balance > 1 {
    if child_side == Ordering::Less {
      // Left-Left
      rotate_right(node)
    } else {
      // Left-Right
      node.left = node.left.take().map(rotate_left);
      rotate_right(node)
    }
  } else if balance < -1 {
    if child_side == Ordering::Greater {
      // Right-Right
      rotate_left(node)
    } else {
      // Right-Left
      node.right = node.right.take().map(rotate_right);
      rotate_left(node)
    }
  } else {
    node
  };

  Inserted { node, placement, side }
}

fn collect_in_order<'a, K, V>(link: &'a Link<K, V>, out: &mut Vec<&'a V>) {
  if let Some(node) = link {
    collect_in_order(&node.left, out);
    out.extend(node.values.iter());
    collect_in_order(&node.right, out);
  }
}

fn collect_range<'a, K: Ord, V>(
  link: &'a Link<K, V>,
  min: &K,
  max: &K,
  out: &mut Vec<&'a V>,
) {
  let Some(node) = link else {
    return;
  };
  // Skip the left subtree when every key in it is below `min`, and the right
  // subtree when every key in it is above `max`.
  if node.key > *min {
    collect_range(&node.left, min, max, out);
  }
  if node.key >= *min && node.key <= *max {
    out.extend(node.values.iter());
  }
  if node.key < *max {
    collect_range(&node.right, min, max, out);
  }
}

/// Returns the true height of the subtree, or `None` if any node is out of
/// balance or carries a stale height.
fn checked_height<K, V>(link: &Link<K, V>) -> Option<usize> {
  let Some(node) = link else {
    return Some(0);
  };
  let left = checked_height(&node.left)?;
  let right = checked_height(&node.right)?;
  let actual = 1 + left.max(right);
  (left.abs_diff(right) <= 1 && node.height == actual).then_some(actual)
}

// ─── OrderedIndex ────────────────────────────────────────────────────────────

/// A self-balancing binary search tree mapping keys to sorted value buckets.
#[derive(Debug, Clone)]
pub struct OrderedIndex<K, V> {
  root:  Link<K, V>,
  len:   usize,
  nodes: usize,
}

impl<K, V> Default for OrderedIndex<K, V> {
  fn default() -> Self {
    Self {
      root:  None,
      len:   0,
      nodes: 0,
    }
  }
}

impl<K: Ord, V: Ord> OrderedIndex<K, V> {
  pub fn new() -> Self { Self::default() }

  /// Insert `value` under `key` in O(log n). Returns `false` if the exact
  /// pair was already present.
  pub fn insert(&mut self, key: K, value: V) -> bool {
    let inserted = insert_node(self.root.take(), key, value);
    self.root = Some(inserted.node);
    match inserted.placement {
      Placement::NewNode => {
        self.nodes += 1;
        self.len += 1;
        true
      }
      Placement::Bucket => {
        self.len += 1;
        true
      }
      Placement::Duplicate => false,
    }
  }

  /// Every value in ascending key order, O(n).
  pub fn in_order(&self) -> Vec<&V> {
    let mut out = Vec::with_capacity(self.len);
    collect_in_order(&self.root, &mut out);
    out
  }

  /// Values whose key lies in `[min, max]`, ascending, O(k + log n).
  pub fn range(&self, min: &K, max: &K) -> Vec<&V> {
    let mut out = Vec::new();
    if min <= max {
      collect_range(&self.root, min, max, &mut out);
    }
    out
  }

  /// Height of the tree; an empty tree has height 0.
  pub fn height(&self) -> usize { height(&self.root) }

  /// O(n) check that every node's subtrees differ in height by at most one
  /// and that the tracked heights are accurate.
  pub fn is_balanced(&self) -> bool { checked_height(&self.root).is_some() }

  /// Number of stored values.
  pub fn len(&self) -> usize { self.len }

  pub fn is_empty(&self) -> bool { self.len == 0 }

  /// Number of distinct keys.
  pub fn node_count(&self) -> usize { self.nodes }

  pub fn clear(&mut self) { *self = Self::default(); }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn keys(index: &OrderedIndex<u32, u32>) -> Vec<u32> {
    index.in_order().into_iter().copied().collect()
  }

  fn root_key(index: &OrderedIndex<u32, u32>) -> Option<u32> {
    index.root.as_ref().map(|n| n.key)
  }

  fn avl_bound(n: usize) -> f64 { 1.44 * ((n + 2) as f64).log2() - 0.328 }

  #[test]
  fn empty_index() {
    let index: OrderedIndex<u32, u32> = OrderedIndex::new();
    assert_eq!(index.height(), 0);
    assert!(index.is_balanced());
    assert!(index.in_order().is_empty());
    assert!(index.range(&0, &10).is_empty());
  }

  #[test]
  fn left_left_rotation() {
    let mut index = OrderedIndex::new();
    for k in [30, 20, 10] {
      index.insert(k, k);
    }
    assert_eq!(root_key(&index), Some(20));
    assert_eq!(index.height(), 2);
    assert_eq!(keys(&index), [10, 20, 30]);
  }

  #[test]
  fn right_right_rotation() {
    let mut index = OrderedIndex::new();
    for k in [10, 20, 30] {
      index.insert(k, k);
    }
    assert_eq!(root_key(&index), Some(20));
    assert_eq!(index.height(), 2);
  }

  #[test]
  fn left_right_rotation() {
    let mut index = OrderedIndex::new();
    for k in [30, 10, 20] {
      index.insert(k, k);
    }
    assert_eq!(root_key(&index), Some(20));
    assert_eq!(keys(&index), [10, 20, 30]);
  }

  #[test]
  fn right_left_rotation() {
    let mut index = OrderedIndex::new();
    for k in [10, 30, 20] {
      index.insert(k, k);
    }
    assert_eq!(root_key(&index), Some(20));
    assert_eq!(keys(&index), [10, 20, 30]);
  }

  #[test]
  fn stays_balanced_under_sorted_inserts() {
    let mut index = OrderedIndex::new();
    for k in 0..1024u32 {
      index.insert(k, k);
      assert!(index.is_balanced(), "unbalanced after inserting {k}");
      assert!(index.height() as f64 <= avl_bound(index.len()));
    }
    assert_eq!(index.height(), 11);
    assert_eq!(keys(&index), (0..1024).collect::<Vec<_>>());
  }

  #[test]
  fn stays_balanced_under_scattered_inserts() {
    let mut index = OrderedIndex::new();
    // 7919 is prime, so this visits every residue mod 1000 exactly once.
    for i in 0..1000u32 {
      let k = (i * 7919) % 1000;
      index.insert(k, k);
      assert!(index.is_balanced());
    }
    assert!(index.height() as f64 <= avl_bound(1000));
    let sorted = keys(&index);
    assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(sorted.len(), 1000);
  }

  #[test]
  fn equal_keys_tie_break_by_value() {
    let mut index = OrderedIndex::new();
    assert!(index.insert(5, "b"));
    assert!(index.insert(5, "a"));
    assert!(index.insert(1, "z"));
    assert!(!index.insert(5, "a"));
    assert_eq!(index.len(), 3);
    assert_eq!(index.node_count(), 2);
    let values: Vec<_> = index.in_order().into_iter().copied().collect();
    assert_eq!(values, ["z", "a", "b"]);
  }

  #[test]
  fn range_is_inclusive_and_ordered() {
    let mut index = OrderedIndex::new();
    for k in [50, 10, 40, 20, 30, 60] {
      index.insert(k, k);
    }
    let hits: Vec<u32> = index.range(&20, &40).into_iter().copied().collect();
    assert_eq!(hits, [20, 30, 40]);
    let none: Vec<u32> = index.range(&41, &49).into_iter().copied().collect();
    assert!(none.is_empty());
    assert!(index.range(&40, &20).is_empty());
  }

  #[test]
  fn range_matches_filtered_scan() {
    let mut index = OrderedIndex::new();
    for i in 0..300u32 {
      let k = (i * 37) % 300;
      index.insert(k, k);
    }
    for (lo, hi) in [(0, 0), (17, 93), (150, 299), (250, 400)] {
      let expected: Vec<u32> =
        keys(&index).into_iter().filter(|k| *k >= lo && *k <= hi).collect();
      let got: Vec<u32> = index.range(&lo, &hi).into_iter().copied().collect();
      assert_eq!(got, expected, "range [{lo}, {hi}]");
    }
  }

  #[test]
  fn clear_resets_everything() {
    let mut index = OrderedIndex::new();
    index.insert(1, 1);
    index.insert(2, 2);
    index.clear();
    assert!(index.is_empty());
    assert_eq!(index.height(), 0);
    assert_eq!(index.node_count(), 0);
  }
}
