use super::request::{parse_request, ParsedRequest};
use super::response::{
    write_error, write_handler_response, write_raw, CONTENT_TYPE_HTML, CONTENT_TYPE_PROMETHEUS,
    CONTENT_TYPE_YAML,
};
use crate::dispatcher::{Dispatcher, HandlerResponse};
use crate::docs::SwaggerUi;
use crate::error::ApiError;
use crate::middleware::MetricsMiddleware;
use crate::router::Router;
use crate::validator::{RequestParts, SchemaValidator};
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::debug;

/// The HTTP service: built-in endpoints, then route, validate, dispatch, validate.
///
/// Everything it holds is immutable after startup and shared by `Arc`, so the
/// per-connection clones made by `may_minihttp` are cheap.
#[derive(Clone)]
pub struct AppService {
    pub router: Arc<Router>,
    pub dispatcher: Arc<Dispatcher>,
    pub validator: Arc<SchemaValidator>,
    pub metrics: Arc<MetricsMiddleware>,
    spec_bytes: Arc<[u8]>,
    docs: Arc<SwaggerUi>,
}

impl AppService {
    pub fn new(
        router: Router,
        dispatcher: Dispatcher,
        validator: SchemaValidator,
        metrics: Arc<MetricsMiddleware>,
        spec_bytes: Vec<u8>,
        docs: SwaggerUi,
    ) -> Self {
        Self {
            router: Arc::new(router),
            dispatcher: Arc::new(dispatcher),
            validator: Arc::new(validator),
            metrics,
            spec_bytes: Arc::from(spec_bytes),
            docs: Arc::new(docs),
        }
    }

    /// Answer the endpoints that exist outside the API schema.
    ///
    /// Returns `false` when `method`/`path` is not one of them.
    fn builtin(&self, method: &str, path: &str, res: &mut Response) -> bool {
        if method != "GET" {
            return false;
        }
        match path {
            "/health" => health_endpoint(res),
            "/metrics" => metrics_endpoint(res, &self.metrics),
            "/openapi.yaml" => write_raw(res, 200, CONTENT_TYPE_YAML, self.spec_bytes.to_vec()),
            "/docs" | "/docs/" => write_raw(
                res,
                200,
                CONTENT_TYPE_HTML,
                self.docs.html().as_bytes().to_vec(),
            ),
            _ => return false,
        }
        self.metrics.inc_top_level_request();
        true
    }

    /// Route, validate and dispatch one API request.
    ///
    /// Every failure comes back as an [`ApiError`]; the caller writes it.
    pub fn handle(&self, req: ParsedRequest) -> Result<HandlerResponse, ApiError> {
        let ParsedRequest {
            request_id,
            method,
            path,
            headers,
            cookies,
            query_params,
            body,
        } = req;

        let route_not_found = || ApiError::RouteNotFound {
            method: method.clone(),
            path: path.clone(),
        };
        let http_method: Method = method.parse().map_err(|_| route_not_found())?;
        let mut route_match = self
            .router
            .route(http_method, &path)
            .ok_or_else(route_not_found)?;
        route_match.query_params = query_params;
        let route = Arc::clone(&route_match.route);

        let parts = RequestParts {
            path_params: &route_match.path_params,
            query_params: &route_match.query_params,
            headers: &headers,
            cookies: &cookies,
            body: &body,
        };
        if let Err(e) = self.validator.validate_request(&route, &parts) {
            self.metrics.inc_validation_failure();
            return Err(e);
        }
        debug!(request_id = %request_id, handler_name = %route.handler_name, "Request validated");

        let resp = self.dispatcher.dispatch(
            route_match,
            path,
            body.into_json(),
            headers,
            request_id,
        )?;

        if let Err(e) = self.validator.validate_response(&route, &resp) {
            self.metrics.inc_validation_failure();
            return Err(e);
        }
        Ok(resp)
    }
}

/// `{"status":"ok"}`
pub fn health_endpoint(res: &mut Response) {
    write_handler_response(res, &HandlerResponse::json(200, json!({ "status": "ok" })));
}

/// Prometheus text exposition of [`MetricsMiddleware`].
pub fn metrics_endpoint(res: &mut Response, metrics: &MetricsMiddleware) {
    write_raw(
        res,
        200,
        CONTENT_TYPE_PROMETHEUS,
        metrics.render_prometheus().into_bytes(),
    );
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);
        if self.builtin(&parsed.method, &parsed.path, res) {
            return Ok(());
        }
        match self.handle(parsed) {
            Ok(resp) => write_handler_response(res, &resp),
            Err(err) => write_error(res, &err),
        }
        Ok(())
    }
}
