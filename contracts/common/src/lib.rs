//! Shared utilities and error types for the medical records contract suite.
//!
//! This crate provides:
//! - [`CommonError`]: standardised error codes for shared helpers.
//! - [`scheduler`]: a storage-backed, cancellable deferred-task table used
//!   to expire time-bounded grants.
//!
//! Contract crates convert [`CommonError`] into their own error enum at the
//! call site instead of returning it directly.

#![no_std]

use soroban_sdk::contracterror;

// ── Modules ──────────────────────────────────────────────────────────────────

pub mod scheduler;

pub use scheduler::*;

// ── Shared error enum ────────────────────────────────────────────────────────

/// Standardised error codes shared by every contract in the workspace.
///
/// # Code ranges
/// | Range   | Purpose                       |
/// |---------|-------------------------------|
/// | 50 – 59 | Deferred task scheduling      |
#[contracterror]
#[derive(Clone, Debug, Eq, PartialEq, Copy)]
#[repr(u32)]
pub enum CommonError {
    // ── Scheduling (50–59) ───────────────────────────────────
    /// The requested delay pushes the due time past `u64::MAX`.
    DelayOverflow = 50,

    /// A task exists for the handle but its due time has not been reached.
    TaskNotDue = 51,
}
