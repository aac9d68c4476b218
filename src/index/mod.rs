pub mod btree_index;
pub mod btree_iterator;
pub mod internal_node;
pub mod leaf_node;

pub use btree_index::{IndexCursor, LocateResult, TreeIndex, TreeMeta};
pub use btree_iterator::IndexIterator;
pub use internal_node::InternalNode;
pub use leaf_node::LeafNode;
