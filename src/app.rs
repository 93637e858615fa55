//! Assembles the HTTP service from a loaded schema and application state.

use crate::dispatcher::Dispatcher;
use crate::docs::{SwaggerUi, SPEC_URL};
use crate::middleware::{Middleware, MetricsMiddleware, TracingMiddleware};
use crate::resources::{register_all, AppState};
use crate::router::Router;
use crate::runtime_config::RuntimeConfig;
use crate::server::AppService;
use crate::spec::LoadedSpec;
use crate::validator::SchemaValidator;
use std::sync::Arc;
use tracing::{info, warn};

/// Build the service with the standard handlers for every operation.
pub fn build_service(
    spec: &LoadedSpec,
    state: &AppState,
    config: &RuntimeConfig,
) -> anyhow::Result<AppService> {
    build_service_with(spec, state, config, |_| {})
}

/// Like [`build_service`], running `customize` after the standard handlers are
/// registered (to add or replace handlers).
pub fn build_service_with(
    spec: &LoadedSpec,
    state: &AppState,
    config: &RuntimeConfig,
    customize: impl FnOnce(&mut Dispatcher),
) -> anyhow::Result<AppService> {
    config.apply();

    let router = Router::new(spec.routes.clone())?;
    let validator = SchemaValidator::new(&spec.routes, config.validate_responses)?;
    let docs = SwaggerUi::render(&spec.title, SPEC_URL)?;
    let metrics = Arc::new(MetricsMiddleware::new());

    let mut dispatcher = Dispatcher::with_stack_size(config.stack_size);
    dispatcher.add_middleware(Arc::clone(&metrics) as Arc<dyn Middleware>);
    dispatcher.add_middleware(Arc::new(TracingMiddleware));
    // SAFETY: the may stack size was applied above, before any coroutine is spawned.
    unsafe {
        register_all(&mut dispatcher, state);
    }
    customize(&mut dispatcher);

    for route in router.routes() {
        if !dispatcher.handlers.contains_key(&route.handler_name) {
            warn!(
                handler_name = %route.handler_name,
                method = %route.method,
                path = %route.path_pattern,
                "Operation has no handler; requests will fail with 500"
            );
        }
    }
    info!(
        title = %spec.title,
        version = %spec.version,
        handlers = dispatcher.handlers.len(),
        validators = validator.cache().len(),
        validate_responses = validator.validates_responses(),
        "Service assembled"
    );

    Ok(AppService::new(
        router,
        dispatcher,
        validator,
        metrics,
        spec.raw.clone(),
        docs,
    ))
}
