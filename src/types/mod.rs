// Type definitions shared across the verification pipeline

pub mod document;
pub mod finding;
pub mod stage;

pub use document::*;
pub use finding::*;
pub use stage::*;
