pub mod expense;
pub mod message;
pub mod partner;
pub mod settlement;

pub use expense::*;
pub use message::*;
pub use partner::*;
pub use settlement::*;
