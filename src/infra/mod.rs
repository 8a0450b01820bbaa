mod data_dir;
mod parts;
mod records;
mod repo;
mod search;
mod snapshots;
mod tree_store;

pub use data_dir::*;
pub use parts::*;
pub use records::*;
pub use repo::*;
pub use search::*;
pub use snapshots::*;
pub use tree_store::*;
