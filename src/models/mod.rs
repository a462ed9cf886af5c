//! Data models for the record layer.
//!
//! This module contains field values, record system metadata and the
//! JSON envelopes exchanged with the platform.

mod metadata;
mod value;
mod wire;

pub use metadata::*;
pub use value::*;
pub use wire::*;
