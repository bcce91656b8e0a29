//! Implementation of devices attachable to the serial transfer (Link Cable).
//!
//! These devices are virtual, the [`buffer`] one is used mostly for
//! testing purposes while [`stdout`] allows test ROM output inspection.

pub mod buffer;
pub mod stdout;
