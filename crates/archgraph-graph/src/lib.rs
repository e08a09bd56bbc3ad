pub mod import_graph;
pub mod memory_store;
pub mod process_groups;
pub mod union_find;

pub use import_graph::*;
pub use memory_store::*;
pub use process_groups::*;
pub use union_find::*;
