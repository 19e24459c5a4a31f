//! Markdown source buffer.
//!
//! Stands in for the editing widget: a rope-backed text buffer with a
//! cursor and selection, driven by the TEA model.

mod buffer;

pub use buffer::{Cursor, EditorBuffer};
