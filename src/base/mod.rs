//! Core components, types, and utilities for the symptom predictor.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - The static lookup tables (specialties, follow-up questions, greetings).
//! - Common types, request/response payloads, and error handling.

pub mod config;
pub mod error;
pub mod follow_up;
pub mod greetings;
pub mod prompts;
pub mod specialty;
pub mod types;
