pub mod message;
pub mod summary;

pub use message::*;
pub use summary::*;
