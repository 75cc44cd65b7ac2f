//! An identifier-addressed skip list with O(log n) positional queries.
//!
//! `Cord` keeps entries in a caller-controlled sequence. Each entry is named
//! by an opaque id and carries a payload whose [`Length`] contributes to the
//! positional axis, so the structure answers "where is this id", "which id
//! covers this position", and "which of these two ids comes first" in
//! logarithmic time. All mutation goes through a single anchored
//! [`Cord::splice`] covering insert, delete, and replace.
//!
//! Zero-length entries are fully supported and act as markers between their
//! neighbours. A detached [`Cursor`] allows mutating the cord between
//! iteration steps without invalidating the iteration.
//!
//! # Quick Start
//!
//! ```
//! use cord::Cord;
//!
//! // Entry 0 is the permanent root; new entries anchor after existing ones.
//! let mut rope: Cord<u64, String> = Cord::new();
//! rope.insert(&0, 1, "hello".into()).unwrap();
//! rope.insert(&1, 2, " there".into()).unwrap();
//!
//! assert_eq!(rope.len(), 11);
//! assert_eq!(rope.find(&2), 11);
//! assert_eq!(rope.by_position(5, false), (1, 0));
//!
//! let removed = rope.delete(&0, &1).unwrap();
//! assert_eq!(removed[0].data, "hello");
//! assert_eq!(rope.len(), 6);
//! ```

pub mod cord;
pub mod error;
pub mod iter;
pub mod length;
mod node;

pub use cord::{Cord, Info, Item, Removed};
pub use error::{CordError, Result};
pub use iter::{Cursor, Iter};
pub use length::Length;
