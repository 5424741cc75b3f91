use crate::{
  order::block_bytes,
  tree::{BlockTree, left, right},
};

/// Maps tree positions to byte offsets from the region base and back.
///
/// ```text
///   order 2   [            1            ]
///   order 1   [     2     ][     3      ]
///   order 0   [  4  ][  5 ][  6  ][  7  ]
///   offset    0     B     2B    3B    4B
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressMapper {
  block_size: usize,
  max_order: usize,
}

impl AddressMapper {
  pub const fn new(
    block_size: usize,
    max_order: usize,
  ) -> Self {
    Self { block_size, max_order }
  }

  /// Byte offset of the block at `position`.
  ///
  /// # Panics
  ///
  /// Panics if the order stored at `position` does not match its depth.
  pub fn position_to_offset(
    &self,
    tree: &BlockTree,
    position: usize,
  ) -> usize {
    let order = tree.node(position).order;
    let first_of_order = 1 << (self.max_order - order);

    assert!(
      (first_of_order..first_of_order * 2).contains(&position),
      "position {position} does not hold an order-{order} block"
    );

    (position - first_of_order) * block_bytes(order, self.block_size)
  }

  /// Descends from `start` to the leaf whose range contains `offset`.
  ///
  /// The leaf found is only guaranteed to *start* at `offset` when `offset`
  /// came from [`position_to_offset`](Self::position_to_offset) on a live
  /// leaf; callers check that themselves.
  ///
  /// # Panics
  ///
  /// Panics if the walk reaches a slot that is not part of the live tree.
  pub fn offset_to_position(
    &self,
    tree: &BlockTree,
    offset: usize,
    start: usize,
  ) -> usize {
    let mut position = start;
    let mut node_offset = self.position_to_offset(tree, start);

    loop {
      let node = tree.node(position);

      if node.is_leaf {
        return position;
      }

      assert!(node.order > 0, "position {position} is not part of the tree");

      let half = block_bytes(node.order - 1, self.block_size);

      if offset < node_offset + half {
        position = left(position);
      } else {
        position = right(position);
        node_offset += half;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tree::ROOT;

  const BLOCK: usize = 64;

  #[test]
  fn test_root_offset() {
    let tree = BlockTree::new(3);
    let mapper = AddressMapper::new(BLOCK, 3);

    assert_eq!(0, mapper.position_to_offset(&tree, ROOT));
    assert_eq!(ROOT, mapper.offset_to_position(&tree, 0, ROOT));
    assert_eq!(ROOT, mapper.offset_to_position(&tree, 7 * BLOCK, ROOT));
  }

  #[test]
  fn test_offsets_by_order() {
    let mut tree = BlockTree::new(2);
    let mapper = AddressMapper::new(BLOCK, 2);

    tree.split(ROOT);
    tree.split(3);

    assert_eq!(0, mapper.position_to_offset(&tree, 2));
    assert_eq!(2 * BLOCK, mapper.position_to_offset(&tree, 6));
    assert_eq!(3 * BLOCK, mapper.position_to_offset(&tree, 7));
  }

  #[test]
  fn test_descends_to_containing_leaf() {
    let mut tree = BlockTree::new(3);
    let mapper = AddressMapper::new(BLOCK, 3);

    tree.split(ROOT);
    tree.split(3);
    tree.split(7);

    // Leaves: 2 [0, 4B), 6 [4B, 6B), 14 [6B, 7B), 15 [7B, 8B).
    assert_eq!(2, mapper.offset_to_position(&tree, 0, ROOT));
    assert_eq!(2, mapper.offset_to_position(&tree, 3 * BLOCK + 5, ROOT));
    assert_eq!(6, mapper.offset_to_position(&tree, 4 * BLOCK, ROOT));
    assert_eq!(14, mapper.offset_to_position(&tree, 6 * BLOCK, ROOT));
    assert_eq!(15, mapper.offset_to_position(&tree, 7 * BLOCK, ROOT));
    assert_eq!(15, mapper.offset_to_position(&tree, 7 * BLOCK + 3, 7));
  }

  #[test]
  fn test_round_trip_every_leaf() {
    let mut tree = BlockTree::new(5);
    let mapper = AddressMapper::new(BLOCK, 5);

    for position in [ROOT, 3, 6, 13, 27, 2, 5, 10] {
      tree.split(position);
    }

    for (position, _) in tree.leaves() {
      let offset = mapper.position_to_offset(&tree, position);
      assert_eq!(position, mapper.offset_to_position(&tree, offset, ROOT));
    }
  }

  #[test]
  #[should_panic(expected = "does not hold an order-0 block")]
  fn test_descend_from_dead_slot() {
    let tree = BlockTree::new(2);
    let mapper = AddressMapper::new(BLOCK, 2);

    mapper.offset_to_position(&tree, 0, 3);
  }
}
