//! Domain model for personal notes.
//!
//! # Responsibility
//! - Define the canonical `Note` value object shared by store and adapters.
//! - Own field-level lifecycle rules (timestamps, tag set semantics).
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId` that is never reassigned.
//! - `updated_at >= created_at` holds for every constructed or decoded note.

pub mod note;
