/// DAO Module
///
/// Two access patterns over the query executor:
/// - **Single call** (`single.rs`): every call acquires, executes, finishes the
///   transaction and releases its own connection
/// - **Multi call** (`multi.rs`): one connection and one transaction span many
///   calls; the caller commits, rolls back and closes explicitly
pub mod multi;
pub mod single;

pub use multi::MultiCallDao;
pub use single::{Completion, MutationOutcome, SingleCallDao};
