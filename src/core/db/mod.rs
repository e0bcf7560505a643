/// Database Module
///
/// This module provides the execution engine of the data access layer,
/// organized into focused submodules.
///
/// ## Architecture
///
/// - **Bind Variables** (`bind.rs`): tagged positional parameters
/// - **Values** (`value.rs`): generic rows, scalar values and column metadata
/// - **Cursor** (`cursor.rs`): forward-only access to a live statement
/// - **Connection** (`connection.rs`): connection acquisition and session state
/// - **Query Execution** (`query.rs`): turns SQL plus binds into rows, cursors or counts
///
/// ## Error Handling
///
/// All operations use the standardized `DaoError` type.
pub mod bind;
pub mod connection;
pub mod cursor;
pub mod query;
pub mod value;

pub use bind::*;
pub use connection::*;
pub use cursor::*;
pub use query::*;
pub use value::*;
