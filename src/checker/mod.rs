// src/checker/mod.rs
// =============================================================================
// This module decides which harvested emails are worth printing.
//
// Submodules:
// - noreply: is this a GitHub noreply address that belongs to this login?
//
// Rust concepts:
// - pub use: re-export so callers write `checker::is_noreply_for()`
// =============================================================================

mod noreply;

pub use noreply::is_noreply_for;
