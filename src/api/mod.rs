//! Action layer over the virtual filesystem.
//!
//! Exposes the request-level operations (initiate, info, listing,
//! seek, folder creation, rename/copy/move, streaming reads) with the
//! validation order every mutation follows: structural path checks,
//! then permission and policy checks, then existence preconditions,
//! then the transport call, then a fresh snapshot of the result.

pub mod actions;
pub mod events;
pub mod types;
