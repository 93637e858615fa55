use std::time::Duration;

use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Hooks run by the [`Dispatcher`](crate::dispatcher::Dispatcher) around every handler call.
///
/// `before` may answer the request itself by returning a response; the
/// handler is then skipped. `after` always runs and may modify the response.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}
