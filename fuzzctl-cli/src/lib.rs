//! Command-line driver for the fuzzing-platform control panel.
//!
//! Parses arguments, builds the client configuration from the environment
//! and flags, and runs one command against the API.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod cli;
pub mod commands;
pub mod error;
