/// One slot of the block tree.
///
/// `is_allocated` only means something on leaves. Internal nodes are in use
/// through their descendants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Node {
  pub is_leaf: bool,
  pub is_allocated: bool,
  pub order: usize,
}

impl Node {
  pub fn new(
    is_leaf: bool,
    is_allocated: bool,
    order: usize,
  ) -> Self {
    Self { is_leaf, is_allocated, order }
  }

  /// A fresh, unallocated leaf.
  pub fn free_leaf(order: usize) -> Self {
    Self::new(true, false, order)
  }

  #[inline]
  pub fn is_free_leaf(&self) -> bool {
    self.is_leaf && !self.is_allocated
  }
}
