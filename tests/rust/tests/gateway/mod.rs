//! Gateway integration tests
//!
//! MultiServerManager lifecycle and routing over mock transports, plus the
//! rmcp-backed transports' failure paths.

mod connection;
