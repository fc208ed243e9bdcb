//! Shared utilities and common types for the FocuSprint backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Identifier generation
//! - Offset pagination
//! - Common validation logic

pub mod ids;
pub mod pagination;
pub mod validation;
