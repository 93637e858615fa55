//! Command-line entry points.
//!
//! ```bash
//! resource-server serve --spec doc/openapi.yaml --addr 127.0.0.1:3000
//! resource-server serve --no-response-validation
//! resource-server routes --spec doc/openapi.yaml
//! ```
//!
//! Flags override the `RSRV_*` environment variables read by
//! [`RuntimeConfig`](crate::runtime_config::RuntimeConfig).

mod commands;


pub use commands::{run, run_cli, Cli, Commands};
