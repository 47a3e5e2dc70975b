//! berrychat is a line-oriented client for streaming chat backends.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core::decoder`] turns a streamed HTTP body into ordered text deltas,
//!   whatever framing the backend uses.
//! - [`core::conversation`] is the reducer that owns the message list and
//!   folds stream events into the in-flight assistant reply.
//! - [`core::chat_stream`] runs requests in background tasks and reports
//!   their events over a channel; [`core::session`] drives one send at a time.
//! - [`api`] defines the request and response payloads for both backends.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
