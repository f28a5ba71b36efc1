//! Utilities for testing components without a live platform.

pub mod transport;
