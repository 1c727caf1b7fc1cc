//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playlist sync core:
//! - Logging and tracing infrastructure
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other modules depend on. It
//! establishes the logging conventions and the event broadcasting mechanism
//! used throughout the system; the UI layer consumes the event bus to surface
//! notifications without the core knowing how they are delivered.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
