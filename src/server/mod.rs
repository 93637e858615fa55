//! HTTP front end on `may_minihttp`: request parsing, the [`AppService`]
//! request pipeline and response writing.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_request, ParsedRequest};
pub use response::{write_error, write_handler_response};
pub use service::{health_endpoint, metrics_endpoint, AppService};
