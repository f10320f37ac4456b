//! Renewal rules.

pub mod renewal;
