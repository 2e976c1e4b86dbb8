//! Drift/existence resolution
//!
//! "Not found" is the only remote-store condition the engine interprets.
//! What it means depends on who owns the object and on what was being
//! attempted.

use super::Ownership;

/// The call that produced the not-found response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundContext {
    /// A get issued by read/import (or by adoption)
    Read,
    /// A delete
    Delete,
}

/// How the caller must react to a not-found response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundResolution {
    /// Deleted out of band: forget the instance; the next pass re-creates it
    DropFromState,
    /// Already gone, which is the state delete wanted
    AlreadyGone,
    /// Nothing to manage: surface as a fatal error
    Fatal,
}

/// Resolve a not-found response
///
/// | ownership | context | resolution      |
/// |-----------|---------|-----------------|
/// | Owned     | Read    | `DropFromState` |
/// | Owned     | Delete  | `AlreadyGone`   |
/// | Adopted   | Read    | `Fatal`         |
/// | Adopted   | Delete  | `AlreadyGone`   |
///
/// Adopted deletes never reach the remote, so the last row only matters
/// to callers driving the store directly.
pub fn resolve_not_found(ownership: Ownership, context: NotFoundContext) -> NotFoundResolution {
    match (ownership, context) {
        (_, NotFoundContext::Delete) => NotFoundResolution::AlreadyGone,
        (Ownership::Owned, NotFoundContext::Read) => NotFoundResolution::DropFromState,
        (Ownership::Adopted, NotFoundContext::Read) => NotFoundResolution::Fatal,
    }
}
