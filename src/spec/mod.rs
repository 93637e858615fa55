//! # API schema loading
//!
//! Reads the OpenAPI 3.1 document once at startup and flattens every operation
//! into a [`RouteMeta`]: method, path template, handler name, parameters and
//! fully `$ref`-expanded JSON Schemas for the request body and each declared
//! response status. Router and validator work from these values only.

mod build;
mod load;
mod types;

pub use build::{build_routes, ensure_no_issues, SpecIssue};
pub use load::{load_spec, load_spec_from_str, LoadedSpec};
pub use types::{
    ParameterLocation, ParameterMeta, ParameterStyle, ResponseSpec, Responses, RouteMeta,
};
