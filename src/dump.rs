use std::fmt;

use crate::{address::AddressMapper, tree::BlockTree};

/// Read-only textual view of a block tree.
///
/// Lists every live node in pre-order, one per line, indented by its order:
///
/// ```text
///    [1] order 3 split @0x0
///   [2] order 2 split @0x0
///  [4] order 1 allocated @0x0
///  [5] order 1 free @0x800
///   [3] order 2 free @0x1000
/// ```
pub struct TreeDump<'a> {
  tree: &'a BlockTree,
  mapper: AddressMapper,
}

impl<'a> TreeDump<'a> {
  pub fn new(
    tree: &'a BlockTree,
    mapper: AddressMapper,
  ) -> Self {
    Self { tree, mapper }
  }
}

impl fmt::Display for TreeDump<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    for (position, node) in self.tree.nodes() {
      let state = match (node.is_leaf, node.is_allocated) {
        (false, _) => "split",
        (true, true) => "allocated",
        (true, false) => "free",
      };

      writeln!(
        f,
        "{:indent$}[{position}] order {} {state} @{:#x}",
        "",
        node.order,
        self.mapper.position_to_offset(self.tree, position),
        indent = node.order,
      )?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tree::ROOT;

  #[test]
  fn test_dump_pristine() {
    let tree = BlockTree::new(2);
    let dump = TreeDump::new(&tree, AddressMapper::new(16, 2));

    assert_eq!("  [1] order 2 free @0x0\n", dump.to_string());
  }

  #[test]
  fn test_dump_split_tree() {
    let mut tree = BlockTree::new(3);
    tree.split(ROOT);
    tree.split(2);
    tree.set_allocated(4, true);

    let dump = TreeDump::new(&tree, AddressMapper::new(1024, 3)).to_string();
    let expected = concat!(
      "   [1] order 3 split @0x0\n",
      "  [2] order 2 split @0x0\n",
      " [4] order 1 allocated @0x0\n",
      " [5] order 1 free @0x800\n",
      "  [3] order 2 free @0x1000\n",
    );

    assert_eq!(expected, dump);
  }
}
