use crate::error::ApiError;
use crate::ids::RequestId;
use crate::middleware::Middleware;
use crate::router::{ParamVec, RouteMatch};
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage; names are lowercased.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Coroutine stack size used when none is configured.
pub const DEFAULT_HANDLER_STACK_SIZE: usize = 0x8000;

/// What a handler coroutine sends back.
pub type HandlerResult = Result<HandlerResponse, ApiError>;

/// Request data passed to a handler coroutine.
///
/// Path/query parameters and body have already passed schema validation.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// Concrete request path (`/v1/users/7`)
    pub path: String,
    pub handler_name: String,
    pub path_params: ParamVec,
    pub query_params: ParamVec,
    pub headers: HeaderVec,
    pub body: Option<Value>,
    /// Channel for sending the result back to the dispatcher
    pub reply_tx: mpsc::Sender<HandlerResult>,
}

impl HandlerRequest {
    /// Get a path parameter by name; the last occurrence wins.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name; the last occurrence wins.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[must_use]
    pub fn query_params_map(&self) -> HashMap<String, String> {
        self.query_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Response produced by a handler.
///
/// Always written as `application/json`; `Value::Null` with status 204 means no body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Serialize `body` into a JSON response.
    pub fn serialized<T: Serialize>(status: u16, body: &T) -> Result<Self, ApiError> {
        serde_json::to_value(body)
            .map(|v| Self::json(status, v))
            .map_err(|e| ApiError::unhandled(format!("failed to serialize response: {e}")))
    }

    /// `204 No Content`.
    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: Value::Null,
        }
    }

    #[must_use]
    pub fn has_body(&self) -> bool {
        self.status != 204 && self.status != 304
    }
}

pub type HandlerSender = mpsc::Sender<HandlerRequest>;

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Routes requests to registered handler coroutines.
///
/// Each handler runs in its own coroutine fed by a channel. Middleware runs
/// around every dispatch in the order it was added.
#[derive(Clone)]
pub struct Dispatcher {
    pub handlers: HashMap<String, HandlerSender>,
    pub middlewares: Vec<Arc<dyn Middleware>>,
    stack_size: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::with_stack_size(DEFAULT_HANDLER_STACK_SIZE)
    }

    /// Dispatcher whose handler coroutines get `stack_size` bytes of stack.
    #[must_use]
    pub fn with_stack_size(stack_size: usize) -> Self {
        Dispatcher {
            handlers: HashMap::new(),
            middlewares: Vec::new(),
            stack_size,
        }
    }

    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    /// Register `handler_fn` under `name`, running it in a dedicated coroutine.
    ///
    /// Registering a name twice replaces the old handler; its coroutine exits
    /// once the old channel is dropped. A panicking handler is answered with
    /// [`ApiError::Unhandled`] and keeps serving later requests.
    ///
    /// # Safety
    ///
    /// Spawns a coroutine with `may::coroutine::Builder::spawn`, which is
    /// unsafe in the `may` runtime. The runtime must be configured (stack
    /// size) before the first handler is registered, and `handler_fn` must not
    /// block the scheduler thread on non-`may` primitives for long.
    pub unsafe fn register_handler<F>(&mut self, name: &str, handler_fn: F)
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<HandlerRequest>();
        let name = name.to_string();
        let coroutine_name = name.clone();
        let stack_size = self.stack_size;

        // SAFETY: the caller upholds the runtime requirements documented above;
        // the closure owns everything it touches (`handler_fn`, `rx`).
        let spawn_result = unsafe {
            coroutine::Builder::new()
                .name(format!("handler:{name}"))
                .stack_size(stack_size)
                .spawn(move || {
                    debug!(handler_name = %coroutine_name, stack_size, "Handler coroutine start");
                    for req in rx.iter() {
                        let reply_tx = req.reply_tx.clone();
                        let request_id = req.request_id;
                        let started = Instant::now();

                        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                            handler_fn(req)
                        }))
                        .unwrap_or_else(|panic| {
                            let panic_message = panic_message(panic.as_ref());
                            error!(
                                request_id = %request_id,
                                handler_name = %coroutine_name,
                                panic_message = %panic_message,
                                "Handler panicked"
                            );
                            Err(ApiError::unhandled(format!("handler panicked: {panic_message}")))
                        });

                        debug!(
                            request_id = %request_id,
                            handler_name = %coroutine_name,
                            execution_time_us = started.elapsed().as_micros() as u64,
                            ok = result.is_ok(),
                            "Handler execution complete"
                        );
                        if reply_tx.send(result).is_err() {
                            warn!(request_id = %request_id, "Reply channel closed before handler answered");
                        }
                    }
                    debug!(handler_name = %coroutine_name, "Handler coroutine exit");
                })
        };

        if let Err(e) = spawn_result {
            error!(handler_name = %name, error = %e, stack_size, "Failed to spawn handler coroutine");
            return;
        }

        if self.handlers.insert(name.clone(), tx).is_some() {
            warn!(handler_name = %name, "Replaced existing handler");
        }
        info!(handler_name = %name, total_handlers = self.handlers.len(), "Handler registered");
    }

    /// Send a validated request to its handler and wait for the reply.
    ///
    /// `Err` is either the handler's own [`ApiError`] or a failure to reach
    /// the handler (not registered, coroutine gone). Middleware `after` hooks
    /// see handler errors as the envelope response they will be written as.
    pub fn dispatch(
        &self,
        route_match: RouteMatch,
        path: String,
        body: Option<Value>,
        headers: HeaderVec,
        request_id: RequestId,
    ) -> Result<HandlerResponse, ApiError> {
        let Some(tx) = self.handlers.get(&route_match.handler_name) else {
            error!(
                request_id = %request_id,
                handler_name = %route_match.handler_name,
                available_handlers = ?self.handlers.keys().collect::<Vec<_>>(),
                "Handler not registered"
            );
            return Err(ApiError::unhandled(format!(
                "no handler registered for `{}`",
                route_match.handler_name
            )));
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        let request = HandlerRequest {
            request_id,
            method: route_match.route.method.clone(),
            path,
            handler_name: route_match.handler_name,
            path_params: route_match.path_params,
            query_params: route_match.query_params,
            headers,
            body,
            reply_tx,
        };

        let early = self
            .middlewares
            .iter()
            .find_map(|mw| mw.before(&request));

        let (mut resp, failure, latency) = match early {
            Some(r) => {
                debug!(request_id = %request_id, status = r.status, "Middleware answered early");
                (r, None, Duration::ZERO)
            }
            None => {
                let start = Instant::now();
                if tx.send(request.clone()).is_err() {
                    error!(
                        request_id = %request_id,
                        handler_name = %request.handler_name,
                        "Handler coroutine is gone"
                    );
                    return Err(ApiError::unhandled(format!(
                        "handler `{}` is not running",
                        request.handler_name
                    )));
                }
                let result = reply_rx.recv().map_err(|e| {
                    error!(
                        request_id = %request_id,
                        handler_name = %request.handler_name,
                        error = %e,
                        "Handler dropped the reply channel"
                    );
                    ApiError::unhandled(format!("handler `{}` did not reply", request.handler_name))
                })?;
                match result {
                    Ok(resp) => (resp, None, start.elapsed()),
                    Err(err) => {
                        debug!(request_id = %request_id, error = %err, "Handler returned error");
                        let envelope = HandlerResponse::json(err.status(), err.body());
                        (envelope, Some(err), start.elapsed())
                    }
                }
            }
        };

        for mw in &self.middlewares {
            mw.after(&request, &mut resp, latency);
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(resp),
        }
    }
}
