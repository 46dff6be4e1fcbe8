//! Service integrations for external capabilities.
//!
//! Currently this is the text classifier. The module defines a generic trait and
//! a concrete implementation, allowing for extensibility and easy testing.

pub mod classifier;
