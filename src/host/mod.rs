//! Collaborators the aggregator talks to: process identity, the parser's
//! pending counters, telemetry sinks, settings, the clock, and the replay
//! driver that feeds host events in.

pub mod identity;
pub mod pending;
pub mod replay;
pub mod settings;
pub mod sink;
pub mod time;
