//! eh-core
//!
//! Domain models, the threaded discussion store and the port definitions
//! for the Equihealth community forum.

pub mod error;
pub mod history;
pub mod label;
pub mod models;
pub mod thread;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use history::*;
pub use label::*;
pub use models::*;
pub use thread::*;
pub use traits::*;
