//! Composition of condition and update expression fragments.
//!
//! Fragments are never parsed into a full AST. Conditions are joined
//! textually; update expressions are split into their `SET`/`ADD`/`DELETE`/
//! `REMOVE` sections by a delimiter-aware scanner, merged per section, and
//! re-rendered. [`Placeholders`] generates the `#name`/`:value` substitution
//! maps that accompany the fragments this crate produces.

pub mod condition;
pub mod placeholders;
pub mod update;

pub use condition::merge_condition;
pub use placeholders::Placeholders;
pub use update::{Section, UpdateClauses, merge_update};
