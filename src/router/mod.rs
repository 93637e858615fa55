//! # Router Module
//!
//! Matches incoming `(method, path)` pairs to the operations of the API schema.
//!
//! ## Architecture
//!
//! 1. **Compilation**: at startup every path template (e.g. `/v1/users/{id}`)
//!    becomes an anchored regex, prefixed with the schema's base path.
//!
//! 2. **Matching**: each request path is tested against the compiled patterns
//!    in registration order; the first match wins and its path parameters are
//!    captured by name.
//!
//! ## Example
//!
//! ```rust,ignore
//! use http::Method;
//! use resource_server::router::Router;
//! use resource_server::spec::load_spec;
//!
//! let spec = load_spec("doc/openapi.yaml")?;
//! let router = Router::new(spec.routes)?;
//! if let Some(m) = router.route(Method::GET, "/v1/users/7") {
//!     assert_eq!(m.handler_name, "get_user");
//!     assert_eq!(m.get_path_param("id"), Some("7"));
//! }
//! ```

mod core;

pub use core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
