pub mod decoder;
pub mod reader;
pub mod summary;

pub use decoder::*;
pub use reader::*;
pub use summary::*;
