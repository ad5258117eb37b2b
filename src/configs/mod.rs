pub mod base;
pub mod bgm;
pub mod features;
pub mod media;
pub mod room;
pub mod server;

pub use base::*;
pub use bgm::*;
pub use features::*;
pub use media::*;
pub use room::*;
pub use server::*;
