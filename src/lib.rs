//! Jiuding is a terminal chat client for private query backends and Gemini.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns conversations, their persistence, configuration, and
//!   streaming orchestration.
//! - [`commands`] implements slash-command parsing and execution for the
//!   interactive chat loop.
//! - [`api`] defines request and response payloads for both backends.
//! - [`cli`] parses arguments and runs the chat loop or one-shot
//!   subcommands.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod utils;
