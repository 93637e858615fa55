//! # Dispatcher
//!
//! Coroutine-based handler dispatch. Every operation of the API schema is
//! served by one handler coroutine fed through a `may` channel; the
//! dispatcher sends a validated request to it and waits on a per-request
//! reply channel.
//!
//! ## Request flow
//!
//! 1. The router resolves `(method, path)` to a handler name
//! 2. Middleware `before` hooks may answer early
//! 3. The request is sent to the handler coroutine
//! 4. The handler's `Result` comes back
//! 5. Middleware `after` hooks see the response (an error as its envelope) and latency
//! 6. Errors are returned as `ApiError` for the server's error writer
//!
//! A handler panic is caught inside the coroutine and becomes a 500;
//! the coroutine keeps serving. Stack size comes from `RSRV_STACK_SIZE`.

mod core;

pub use core::{
    Dispatcher, HandlerRequest, HandlerResponse, HandlerResult, HandlerSender, HeaderVec,
    DEFAULT_HANDLER_STACK_SIZE, MAX_INLINE_HEADERS,
};
