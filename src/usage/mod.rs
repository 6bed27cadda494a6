//! Session usage aggregation.
//!
//! # MEMORY INVARIANT
//! Every table here is sized at compile time. New names past capacity are
//! dropped; nothing grows.
//!
//! # PRIVACY INVARIANT
//! Process names are reduced to their file name before they are stored.
//! No directory, command line, or window text is ever recorded.

pub mod aggregator;
pub mod api;
pub mod event;
pub mod metrics;
pub mod packed;
pub mod registry;
