#![forbid(unsafe_code)]

//! playback — load and normalize agent playground session history.
//!
//! Library entry point exposing the normalization pipeline and the loader
//! that wires it to a playground service, a state store, and a notifier.
//! The binary (`main.rs`) is a thin CLI wrapper around this library.

pub mod client;
pub mod error;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod store;
