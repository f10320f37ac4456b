//! Device registration accounting.

pub mod devices;
