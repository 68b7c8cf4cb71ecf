//! Motions and edits.
//!
//! Everything here operates on a single `core_state::Buffer` and reads its
//! content only through the span table's scan cursor:
//! * [`motion`] resolves a [`Motion`] to a cursor target or text range.
//! * [`span_resolver`] widens a motion into the range an operator acts on.
//! * [`edit`] applies insert sessions, deletes and yanks.

pub mod edit;
pub mod motion;
pub mod span_resolver;
pub mod text_object;

pub use edit::{EditError, InsertAnchor, Inserter, Yank, delete, insert, move_cursor, yank};
pub use motion::{Motion, MotionKind, Target, clamp_normal, resolve};
pub use span_resolver::{OperatorSpan, resolve_operator};
pub use text_object::TextObject;
