//! Note persistence layer.
//!
//! # Responsibility
//! - Keep the note collection and its JSON files consistent.
//! - Report storage failures separately from routine absence.
//!
//! # Invariants
//! - Every mutating call is followed by a full persist before it returns.
//! - Not-found is expressed as `Option`/`bool`, never as `StoreError`.

pub mod error;
pub mod note_store;
