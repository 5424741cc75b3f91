//! Implicit binary tree of blocks.
//!
//! Nodes live in a flat arena indexed by position. The root sits at
//! position `1` and spans the whole region; the children of `p` are `2p` and
//! `2p + 1`. Slots that are not part of the live tree hold
//! [`Node::default()`], so only reachable nodes are ever leaves.

use tracing::trace;

use crate::node::Node;

/// Position of the root node.
pub const ROOT: usize = 1;

#[inline]
pub(crate) fn left(position: usize) -> usize {
  position * 2
}

#[inline]
pub(crate) fn right(position: usize) -> usize {
  left(position) + 1
}

#[inline]
pub(crate) fn parent(position: usize) -> usize {
  position / 2
}

#[inline]
pub(crate) fn buddy(position: usize) -> usize {
  position ^ 1
}

pub struct BlockTree {
  nodes: Box<[Node]>,
  max_order: usize,
}

impl BlockTree {
  /// Creates a tree whose root is a single free leaf of `max_order`.
  pub fn new(max_order: usize) -> Self {
    let mut nodes = vec![Node::default(); 2 << max_order].into_boxed_slice();
    nodes[ROOT] = Node::free_leaf(max_order);

    Self { nodes, max_order }
  }

  pub fn max_order(&self) -> usize {
    self.max_order
  }

  /// Returns the node stored at `position`.
  ///
  /// # Panics
  ///
  /// Panics if `position` is outside the arena.
  pub fn node(
    &self,
    position: usize,
  ) -> &Node {
    &self.nodes[position]
  }

  /// Whether the tree is back to a single free root leaf.
  pub fn is_pristine(&self) -> bool {
    self.nodes[ROOT] == Node::free_leaf(self.max_order)
  }

  /// Pre-order walk over every live node, yielding `(position, node)`.
  pub fn nodes(&self) -> impl Iterator<Item = (usize, &Node)> + '_ {
    let mut cursor = Some(ROOT);

    std::iter::from_fn(move || {
      let position = cursor?;
      cursor = self.next_in_preorder(position, true);
      Some((position, &self.nodes[position]))
    })
  }

  /// Live leaves, left to right. Pre-order visits them in address order.
  pub fn leaves(&self) -> impl Iterator<Item = (usize, &Node)> + '_ {
    self.nodes().filter(|(_, node)| node.is_leaf)
  }

  /// Finds the first free leaf, in pre-order, whose order is exactly `order`.
  pub fn exact_fit(
    &self,
    order: usize,
  ) -> Option<usize> {
    let mut cursor = Some(ROOT);

    while let Some(position) = cursor {
      let node = &self.nodes[position];

      if node.is_free_leaf() && node.order == order {
        return Some(position);
      }

      // Every leaf below a node is strictly smaller than it.
      cursor = self.next_in_preorder(position, node.order > order);
    }

    None
  }

  /// Finds the free leaf with the smallest order strictly above `order`.
  ///
  /// Ties go to the leftmost candidate. That is only a deterministic
  /// tie-break; callers should not rely on which block they get.
  pub fn closest_fit(
    &self,
    order: usize,
  ) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    let mut cursor = Some(ROOT);

    while let Some(position) = cursor {
      let node = &self.nodes[position];

      if node.is_free_leaf()
        && node.order > order
        && best.is_none_or(|(_, best_order)| node.order < best_order)
      {
        if node.order == order + 1 {
          return Some(position);
        }
        best = Some((position, node.order));
      }

      cursor = self.next_in_preorder(position, node.order > order + 1);
    }

    best.map(|(position, _)| position)
  }

  /// Turns the free leaf at `position` into an internal node with two free
  /// leaf children one order smaller.
  ///
  /// # Panics
  ///
  /// Panics if the node is not a free leaf or is already of order `0`.
  pub fn split(
    &mut self,
    position: usize,
  ) {
    assert!(
      position < self.nodes.len() / 2,
      "cannot split position {position}: order-0 or out of range"
    );

    let node = self.nodes[position];
    assert!(node.is_free_leaf(), "cannot split position {position}: not a free leaf");

    self.nodes[position].is_leaf = false;
    self.nodes[left(position)] = Node::free_leaf(node.order - 1);
    self.nodes[right(position)] = Node::free_leaf(node.order - 1);

    trace!(position, order = node.order, "split block");
  }

  /// Merges the two free leaf children of `position` back into it.
  ///
  /// # Panics
  ///
  /// Panics unless the node is internal and both children are free leaves.
  pub fn coalesce(
    &mut self,
    position: usize,
  ) {
    assert!(
      position < self.nodes.len() / 2,
      "cannot coalesce position {position}: out of range"
    );

    let node = self.nodes[position];
    assert!(!node.is_leaf, "cannot coalesce position {position}: already a leaf");
    assert!(
      self.nodes[left(position)].is_free_leaf() && self.nodes[right(position)].is_free_leaf(),
      "cannot coalesce position {position}: children are not free leaves"
    );

    self.nodes[position].is_leaf = true;
    self.nodes[left(position)] = Node::default();
    self.nodes[right(position)] = Node::default();

    trace!(position, order = node.order, "coalesced buddies");
  }

  /// Flags the leaf at `position` as allocated or free.
  ///
  /// # Panics
  ///
  /// Panics if the node is not a leaf.
  pub(crate) fn set_allocated(
    &mut self,
    position: usize,
    is_allocated: bool,
  ) {
    let node = &mut self.nodes[position];
    assert!(node.is_leaf, "position {position} is not a leaf");
    node.is_allocated = is_allocated;
  }

  /// Next position in pre-order after `position`, descending into its
  /// children only if `descend` is set and the node is internal.
  fn next_in_preorder(
    &self,
    mut position: usize,
    descend: bool,
  ) -> Option<usize> {
    if descend && !self.nodes[position].is_leaf {
      return Some(left(position));
    }

    while position != ROOT {
      if position % 2 == 0 {
        return Some(position + 1);
      }
      position = parent(position);
    }

    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_new_tree() {
    let tree = BlockTree::new(4);

    assert!(tree.is_pristine());
    assert_eq!(4, tree.max_order());
    assert_eq!(vec![ROOT], tree.nodes().map(|(p, _)| p).collect::<Vec<_>>());
  }

  #[test]
  fn test_split_creates_buddies() {
    let mut tree = BlockTree::new(3);
    tree.split(ROOT);

    assert!(!tree.node(ROOT).is_leaf);
    assert_eq!(&Node::free_leaf(2), tree.node(2));
    assert_eq!(&Node::free_leaf(2), tree.node(3));
    assert_eq!(vec![2, 3], tree.leaves().map(|(p, _)| p).collect::<Vec<_>>());
  }

  #[test]
  fn test_coalesce_restores_leaf() {
    let mut tree = BlockTree::new(3);
    tree.split(ROOT);
    tree.split(2);
    tree.coalesce(2);
    tree.coalesce(ROOT);

    assert!(tree.is_pristine());
    assert_eq!(&Node::default(), tree.node(2));
    assert_eq!(&Node::default(), tree.node(4));
  }

  #[test]
  fn test_preorder_walk() {
    let mut tree = BlockTree::new(3);
    tree.split(ROOT);
    tree.split(2);
    tree.split(5);

    let order: Vec<usize> = tree.nodes().map(|(p, _)| p).collect();
    assert_eq!(vec![1, 2, 4, 5, 10, 11, 3], order);

    let leaves: Vec<usize> = tree.leaves().map(|(p, _)| p).collect();
    assert_eq!(vec![4, 10, 11, 3], leaves);
  }

  #[test]
  fn test_exact_fit_prefers_left() {
    let mut tree = BlockTree::new(3);
    tree.split(ROOT);
    tree.split(2);
    tree.split(3);

    assert_eq!(Some(4), tree.exact_fit(1));

    tree.set_allocated(4, true);
    assert_eq!(Some(5), tree.exact_fit(1));

    assert_eq!(None, tree.exact_fit(0));
    assert_eq!(None, tree.exact_fit(2));
  }

  #[test]
  fn test_exact_fit_skips_allocated() {
    let mut tree = BlockTree::new(2);
    tree.set_allocated(ROOT, true);

    assert_eq!(None, tree.exact_fit(2));
  }

  #[test]
  fn test_closest_fit_smallest_larger() {
    let mut tree = BlockTree::new(4);
    tree.split(ROOT);
    tree.split(3);
    tree.split(6);

    // Leaves: 2 (order 3), 12 (order 1), 13 (order 1), 7 (order 2).
    assert_eq!(Some(12), tree.closest_fit(0));
    assert_eq!(Some(7), tree.closest_fit(1));
    assert_eq!(Some(2), tree.closest_fit(2));
    assert_eq!(None, tree.closest_fit(3));

    tree.set_allocated(12, true);
    tree.set_allocated(13, true);
    assert_eq!(Some(7), tree.closest_fit(0));
  }

  #[test]
  fn test_closest_fit_tie_goes_left() {
    let mut tree = BlockTree::new(3);
    tree.split(ROOT);
    tree.split(2);
    tree.split(3);
    tree.set_allocated(4, true);

    // Leaves 5, 6 and 7 are all order 1.
    assert_eq!(Some(5), tree.closest_fit(0));

    tree.set_allocated(5, true);
    assert_eq!(Some(6), tree.closest_fit(0));
  }

  #[test]
  fn test_closest_fit_never_returns_exact() {
    let mut tree = BlockTree::new(2);
    tree.split(ROOT);

    assert_eq!(None, tree.closest_fit(1));
    assert_eq!(Some(2), tree.closest_fit(0));
  }

  #[test]
  #[should_panic(expected = "not a free leaf")]
  fn test_split_allocated_leaf() {
    let mut tree = BlockTree::new(2);
    tree.set_allocated(ROOT, true);
    tree.split(ROOT);
  }

  #[test]
  #[should_panic(expected = "not a free leaf")]
  fn test_split_internal_node() {
    let mut tree = BlockTree::new(2);
    tree.split(ROOT);
    tree.split(ROOT);
  }

  #[test]
  #[should_panic(expected = "order-0")]
  fn test_split_smallest_block() {
    let mut tree = BlockTree::new(1);
    tree.split(ROOT);
    tree.split(2);
  }

  #[test]
  #[should_panic(expected = "already a leaf")]
  fn test_coalesce_leaf() {
    let mut tree = BlockTree::new(2);
    tree.coalesce(ROOT);
  }

  #[test]
  #[should_panic(expected = "children are not free leaves")]
  fn test_coalesce_with_allocated_child() {
    let mut tree = BlockTree::new(2);
    tree.split(ROOT);
    tree.set_allocated(3, true);
    tree.coalesce(ROOT);
  }

  #[test]
  #[should_panic(expected = "children are not free leaves")]
  fn test_coalesce_with_split_child() {
    let mut tree = BlockTree::new(2);
    tree.split(ROOT);
    tree.split(2);
    tree.coalesce(ROOT);
  }

  #[test]
  fn test_family_helpers() {
    assert_eq!(10, left(5));
    assert_eq!(11, right(5));
    assert_eq!(5, parent(10));
    assert_eq!(5, parent(11));
    assert_eq!(11, buddy(10));
    assert_eq!(10, buddy(11));
  }
}
