//! Array-backed binary min-heap.
//!
//! The element with the smallest [`Ord`] value sits at index 0. Callers that
//! want "highest first" semantics encode that in their element's ordering;
//! see `PriorityKey` in [`crate::manager`].

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct PriorityHeap<T> {
  items: Vec<T>,
}

impl<T> Default for PriorityHeap<T> {
  fn default() -> Self { Self { items: Vec::new() } }
}

const fn parent(i: usize) -> usize { (i - 1) / 2 }
const fn left_child(i: usize) -> usize { 2 * i + 1 }

impl<T: Ord> PriorityHeap<T> {
  pub fn new() -> Self { Self::default() }

  /// Build a heap from arbitrary items in O(n).
  pub fn from_vec(items: Vec<T>) -> Self {
    let mut heap = Self { items };
    for i in (0..heap.items.len() / 2).rev() {
      heap.sift_down(i);
    }
    heap
  }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  /// Add an item, O(log n).
  pub fn insert(&mut self, item: T) {
    self.items.push(item);
    self.sift_up(self.items.len() - 1);
  }

  /// The smallest item without removing it, O(1).
  pub fn peek_min(&self) -> Result<&T> {
    self.items.first().ok_or(Error::EmptyStructure("priority heap"))
  }

  /// Remove and return the smallest item, O(log n).
  pub fn pop_min(&mut self) -> Result<T> {
    if self.items.is_empty() {
      return Err(Error::EmptyStructure("priority heap"));
    }
    let min = self.items.swap_remove(0);
    if !self.items.is_empty() {
      self.sift_down(0);
    }
    Ok(min)
  }

  /// Every item in ascending order, leaving the heap untouched.
  ///
  /// Drains a scratch copy one minimum at a time, so this is O(n log n) time
  /// and O(n) extra space.
  pub fn extract_all_sorted(&self) -> Vec<T>
  where
    T: Clone,
  {
    let mut scratch = self.clone();
    let mut sorted = Vec::with_capacity(scratch.len());
    while let Ok(min) = scratch.pop_min() {
      sorted.push(min);
    }
    sorted
  }

  /// Number of levels: `floor(log2(n)) + 1`, or 0 when empty.
  pub fn height(&self) -> usize {
    match self.items.len() {
      0 => 0,
      n => n.ilog2() as usize + 1,
    }
  }

  pub fn clear(&mut self) { self.items.clear(); }

  fn sift_up(&mut self, mut i: usize) {
    while i > 0 {
      let p = parent(i);
      if self.items[p] <= self.items[i] {
        break;
      }
      self.items.swap(i, p);
      i = p;
    }
  }

  fn sift_down(&mut self, mut i: usize) {
    let len = self.items.len();
    loop {
      let left = left_child(i);
      if left >= len {
        break;
      }
      // Swap with the smaller child so heap order holds on both sides.
      let right = left + 1;
      let smaller = if right < len && self.items[right] < self.items[left] {
        right
      } else {
        left
      };
      if self.items[i] <= self.items[smaller] {
        break;
      }
      self.items.swap(i, smaller);
      i = smaller;
    }
  }
}

impl<T: Ord> FromIterator<T> for PriorityHeap<T> {
  fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
    Self::from_vec(iter.into_iter().collect())
  }
}

#[cfg(test)]
mod tests {
  use std::cmp::Reverse;

  use super::*;

  fn holds_heap_order<T: Ord>(heap: &PriorityHeap<T>) -> bool {
    (1..heap.items.len()).all(|i| heap.items[parent(i)] <= heap.items[i])
  }

  #[test]
  fn empty_heap_reports_empty_structure() {
    let mut heap: PriorityHeap<u32> = PriorityHeap::new();
    assert!(matches!(heap.peek_min(), Err(Error::EmptyStructure(_))));
    assert!(matches!(heap.pop_min(), Err(Error::EmptyStructure(_))));
    assert_eq!(heap.height(), 0);
    assert!(heap.extract_all_sorted().is_empty());
  }

  #[test]
  fn peek_returns_minimum() {
    let mut heap = PriorityHeap::new();
    for v in [42, 7, 19, 3, 88, 3, 51] {
      heap.insert(v);
      assert!(holds_heap_order(&heap));
    }
    assert_eq!(*heap.peek_min().unwrap(), 3);
    assert_eq!(heap.len(), 7);
  }

  #[test]
  fn extract_all_sorted_is_non_destructive_and_idempotent() {
    let mut heap = PriorityHeap::new();
    for i in 0..100u32 {
      heap.insert((i * 53) % 100);
    }
    let first = heap.extract_all_sorted();
    let second = heap.extract_all_sorted();
    assert_eq!(first, second);
    assert_eq!(first, (0..100).collect::<Vec<_>>());
    assert_eq!(heap.len(), 100);
    assert_eq!(*heap.peek_min().unwrap(), 0);
  }

  #[test]
  fn sift_down_picks_the_smaller_child() {
    // After popping 1, the right child (2) must be promoted over the left (5).
    let mut heap = PriorityHeap::from_vec(vec![1, 5, 2, 6, 7, 3]);
    assert!(holds_heap_order(&heap));
    assert_eq!(heap.pop_min().unwrap(), 1);
    assert_eq!(*heap.peek_min().unwrap(), 2);
    assert!(holds_heap_order(&heap));
  }

  #[test]
  fn height_is_floor_log2_plus_one() {
    let mut heap = PriorityHeap::new();
    let expected = [1, 2, 2, 3, 3, 3, 3, 4];
    for (n, h) in expected.iter().enumerate() {
      heap.insert(n);
      assert_eq!(heap.height(), *h, "n = {}", n + 1);
    }
  }

  #[test]
  fn reversed_ordering_gives_max_first() {
    let heap: PriorityHeap<Reverse<u32>> =
      [4, 9, 1].into_iter().map(Reverse).collect();
    assert_eq!(heap.peek_min().unwrap().0, 9);
  }
}
