//! jsinspector-cli - demo host for the jsinspector runtime
//!
//! Registers one inspector page backed by [`demo::DemoApp`] and serves it to
//! a packager's debugger proxy over a WebSocket.

pub mod app;
pub mod cli;
pub mod demo;
pub mod error;
pub mod logging;
