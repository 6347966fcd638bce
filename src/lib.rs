//! Autoscroll: scrolls a page at a configurable rate, driven by a background
//! orchestrator, with a page-local fallback driver that takes over whenever
//! the orchestrator is throttled.
//!
//! This library crate exposes all modules for use by the binaries and integration tests.

pub mod app;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod runtime;
pub mod services;
pub mod types;
