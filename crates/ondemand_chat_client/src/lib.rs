//! Client library for the on-demand chat API: config, wire types, session and
//! query calls, and the SSE stream accumulator.

pub mod client;
pub mod config;
pub mod messages;
pub mod stream;

pub use client::{Client, ClientError, QueryResponse, Session};
pub use config::{default_config_path, Config, ConfigError, Settings};
pub use messages::{ContextField, ResponseMode, StreamEvent};
pub use stream::{accumulate, AccumulatedResult, LineOutcome, StreamAccumulator};
