pub mod messages;
pub mod snapshot;

pub use messages::*;
pub use snapshot::*;
