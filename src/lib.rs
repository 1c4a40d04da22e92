//! Askai is a line-oriented terminal client for hosted LLM chat APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns conversation state, configuration, and provider
//!   resolution.
//! - [`models`] implements the provider adapters behind the single
//!   [`models::ChatModel`] capability and the pull-based reply stream.
//! - [`api`] defines the wire payloads the adapters exchange with the
//!   provider endpoints.
//! - [`cli`] parses arguments and runs the interactive conversation loop.
//! - [`i18n`] supplies the interface translator.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod i18n;
pub mod models;
pub mod utils;
