// Observer system: frame saves flow through a ring-ordered pipeline that
// keeps the three mapping tables in step with the frame

pub mod context;
pub mod error;
pub mod implementations;
pub mod pipeline;
pub mod reconcile;
pub mod traits;

// Re-export core types
pub use context::*;
pub use error::*;
pub use pipeline::*;
pub use reconcile::MappingOutcome;
pub use traits::*;
