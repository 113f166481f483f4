pub mod schema;
pub mod manifest;
pub mod error;
pub mod engine;
pub mod handle;

pub use schema::*;
pub use manifest::*;
pub use error::*;
pub use engine::*;
pub use handle::*;
