//! Query-engine collaborator boundary.
//!
//! Concrete clients live in `querymix-plugins`; the pipeline only sees the
//! [`QueryEngine`] and [`RowCursor`] traits and the closed [`ExecutionError`]
//! type, which the client decides once when it turns a response into an error.

mod error;
mod traits;

pub use error::{ExecutionError, QueryErrorDesc, StructuredQueryError};
pub use traits::{NamedParams, QueryEngine, RowCursor, VecCursor};
