//! # resource_server
//!
//! A users and products CRUD API whose routes and payload rules come from an
//! [OpenAPI 3.1.0](https://spec.openapis.org/oas/v3.1.0) document, served on
//! `may` coroutines through `may_minihttp`.
//!
//! ## Architecture
//!
//! - **[`spec`]** - loads the schema and flattens operations into [`spec::RouteMeta`]
//! - **[`router`]** - regex matching of method and path to an operation
//! - **[`validator`]** - JSON Schema checks of parameters, bodies and responses
//! - **[`dispatcher`]** - one coroutine per handler, fed through channels
//! - **[`typed`]** - typed request extraction for handlers
//! - **[`resources`]** - the hello, users and products handlers
//! - **[`store`]** - mutex-guarded in-memory record stores
//! - **[`error`]** - [`error::ApiError`], the single mapping from failure to status and body
//! - **[`server`]** - HTTP parsing, the request pipeline and response writing
//! - **[`middleware`]** - request logging and metrics
//! - **[`docs`]** - Swagger UI page
//!
//! ## Request pipeline
//!
//! ```text
//! parse -> built-in endpoint? -> route -> validate request -> dispatch
//!       -> validate response -> write (or write_error on any ApiError)
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use resource_server::app::build_service;
//! use resource_server::resources::AppState;
//! use resource_server::runtime_config::RuntimeConfig;
//! use resource_server::server::HttpServer;
//! use resource_server::spec::load_spec;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = RuntimeConfig::from_env();
//!     let spec = load_spec(&config.spec_path)?;
//!     let service = build_service(&spec, &AppState::new(), &config)?;
//!     let handle = HttpServer(service).start(config.addr.as_str())?;
//!     handle.join().map_err(|e| anyhow::anyhow!("{e:?}"))
//! }
//! ```

pub mod app;
pub mod cli;
pub mod dispatcher;
pub mod docs;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod resources;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod spec;
pub mod store;
pub mod typed;
pub mod validator;

pub use error::{ApiError, ErrorEnvelope, Violation};
pub use ids::{RecordId, RequestId};
pub use spec::{load_spec, LoadedSpec, RouteMeta};
