use std::fmt::Display;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Prometheus-style counters for dispatched and built-in requests.
///
/// All counters are relaxed atomics; readers see eventually consistent values.
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    top_level_requests: AtomicUsize,
    client_errors: AtomicUsize,
    server_errors: AtomicUsize,
    validation_failures: AtomicUsize,
    stack_size: AtomicUsize,
}

impl MetricsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that reached a handler.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean handler latency; zero before the first request.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Count a request answered outside the dispatcher (`/health`, `/docs`, ...).
    pub fn inc_top_level_request(&self) {
        self.top_level_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn top_level_request_count(&self) -> usize {
        self.top_level_requests.load(Ordering::Relaxed)
    }

    /// Count a request or response rejected by schema validation.
    pub fn inc_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn validation_failures(&self) -> usize {
        self.validation_failures.load(Ordering::Relaxed)
    }

    pub fn client_errors(&self) -> usize {
        self.client_errors.load(Ordering::Relaxed)
    }

    pub fn server_errors(&self) -> usize {
        self.server_errors.load(Ordering::Relaxed)
    }

    /// Render all counters in the Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::with_capacity(1024);
        push_metric(
            &mut out,
            "rsrv_requests_total",
            "counter",
            "Requests dispatched to handlers",
            self.request_count(),
        );
        push_metric(
            &mut out,
            "rsrv_top_level_requests_total",
            "counter",
            "Requests answered by built-in endpoints",
            self.top_level_request_count(),
        );
        push_metric(
            &mut out,
            "rsrv_client_errors_total",
            "counter",
            "Handler responses with a 4xx status",
            self.client_errors(),
        );
        push_metric(
            &mut out,
            "rsrv_server_errors_total",
            "counter",
            "Handler responses with a 5xx status",
            self.server_errors(),
        );
        push_metric(
            &mut out,
            "rsrv_validation_failures_total",
            "counter",
            "Requests or responses rejected by schema validation",
            self.validation_failures(),
        );
        push_metric(
            &mut out,
            "rsrv_request_latency_seconds",
            "gauge",
            "Average handler latency",
            format!("{:.6}", self.average_latency().as_secs_f64()),
        );
        push_metric(
            &mut out,
            "rsrv_coroutine_stack_bytes",
            "gauge",
            "Handler coroutine stack size",
            self.stack_size.load(Ordering::Relaxed),
        );
        out
    }
}

fn push_metric(out: &mut String, name: &str, kind: &str, help: &str, value: impl Display) {
    out.push_str(&format!("# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n"));
}

impl Middleware for MetricsMiddleware {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn after(&self, _req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        match res.status {
            400..=499 => {
                self.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            500..=599 => {
                self.server_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        let size = if may::coroutine::is_coroutine() {
            may::coroutine::current().stack_size()
        } else {
            may::config().get_stack_size()
        };
        self.stack_size.store(size, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_latency_is_zero_without_requests() {
        let m = MetricsMiddleware::new();
        assert_eq!(m.average_latency(), Duration::ZERO);
        assert!(m.render_prometheus().contains("rsrv_requests_total 0"));
    }

    #[test]
    fn render_lists_every_counter() {
        let m = MetricsMiddleware::new();
        m.inc_top_level_request();
        m.inc_validation_failure();
        m.inc_validation_failure();
        let text = m.render_prometheus();
        assert!(text.contains("rsrv_top_level_requests_total 1"));
        assert!(text.contains("rsrv_validation_failures_total 2"));
        assert!(text.contains("# TYPE rsrv_request_latency_seconds gauge"));
    }
}
