mod ids;
mod timefmt;
mod types;

pub use ids::*;
pub use timefmt::*;
pub use types::*;
