//! # Typed handlers
//!
//! Handlers that receive strongly typed request data instead of a raw
//! [`HandlerRequest`](crate::dispatcher::HandlerRequest). The request is
//! converted with `TryFrom` inside the handler coroutine; the response is a
//! [`TypedResponse`] carrying the status and a serializable body.
//!
//! Extractors cover the shapes used by the resource routes:
//!
//! - [`NoInput`] for collection reads and greetings
//! - [`PathId`] for item reads and deletes
//! - [`Json`] for creates
//! - [`PathIdJson`] for item replacements
//!
//! ```rust,ignore
//! struct GetUser(Arc<ResourceStore<User>>);
//!
//! impl Handler for GetUser {
//!     type Request = PathId;
//!     type Response = UserSummary;
//!
//!     fn handle(&self, req: TypedHandlerRequest<PathId>) -> Result<TypedResponse<UserSummary>, ApiError> {
//!         let user = self.0.get(&req.data.0).map_err(|_| ApiError::not_found("User not found"))?;
//!         Ok(TypedResponse::ok(UserSummary::from(user)))
//!     }
//! }
//! ```

mod core;

pub use core::{
    Handler, Json, NoInput, PathId, PathIdJson, TypedHandlerRequest, TypedResponse,
};
