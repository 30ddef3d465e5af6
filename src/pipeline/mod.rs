// src/pipeline/mod.rs
pub mod client;
pub mod retry;
pub mod sender;

pub use client::{ServerClient, SubmitError};
pub use retry::RetryConfig;
pub use sender::{RecordSink, SinkResponse};
