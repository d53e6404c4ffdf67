//! Pure derivation logic: everything here is a deterministic transform over
//! in-memory snapshots of trip data. No I/O, no clock reads — callers pass
//! `now` explicitly where time matters.

pub mod engagement;
pub mod status;
pub mod timeline;
pub mod timezone;
pub mod token;
pub mod validation;
