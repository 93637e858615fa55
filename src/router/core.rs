use crate::spec::RouteMeta;
use anyhow::Context;
use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter storage for the request path; names are shared with the route table.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of successfully matching a request path to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteMeta>,
    /// Path parameters extracted from the URL (e.g., `{id}` → `("id", "123")`)
    pub path_params: ParamVec,
    pub handler_name: String,
    /// Query string parameters (populated by the server)
    pub query_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name; the last occurrence wins.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name; the last occurrence wins (`?a=1&a=2` → `2`).
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to a HashMap. Allocates.
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

#[derive(Clone)]
struct CompiledRoute {
    method: Method,
    regex: Regex,
    meta: Arc<RouteMeta>,
    param_names: Vec<Arc<str>>,
}

/// Percent-decode one captured path segment; invalid UTF-8 keeps the raw text.
fn decode_segment(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Matches `(method, path)` against the operations of the API schema.
///
/// Routes are tried in registration order and the first match wins.
#[derive(Clone)]
pub struct Router {
    routes: Vec<CompiledRoute>,
}

impl Router {
    /// Compile every route's path template (with its base path) into an anchored regex.
    ///
    /// # Errors
    ///
    /// Fails if a path template does not compile into a regex.
    pub fn new(routes: Vec<RouteMeta>) -> anyhow::Result<Self> {
        let mut compiled = Vec::with_capacity(routes.len());
        for route in routes {
            let full_path = format!("{}{}", route.base_path, route.path_pattern);
            let (regex, param_names) = Self::path_to_regex(&full_path)
                .with_context(|| format!("invalid path template {full_path}"))?;
            compiled.push(CompiledRoute {
                method: route.method.clone(),
                regex,
                meta: Arc::new(route),
                param_names,
            });
        }

        let routes_summary: Vec<String> = compiled
            .iter()
            .map(|r| format!("{} {}{} -> {}", r.method, r.meta.base_path, r.meta.path_pattern, r.meta.handler_name))
            .collect();
        info!(
            routes_count = compiled.len(),
            routes = ?routes_summary,
            "Routing table loaded"
        );

        Ok(Self { routes: compiled })
    }

    /// Route metadata in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteMeta> {
        self.routes.iter().map(|r| r.meta.as_ref())
    }

    /// Print all registered routes to stdout.
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.routes.len());
        for r in &self.routes {
            println!(
                "[route] {:<7} {}{} -> {}",
                r.method, r.meta.base_path, r.meta.path_pattern, r.meta.handler_name
            );
        }
    }

    /// Find the operation for `method` and `path`; `None` means 404.
    ///
    /// A single trailing slash is ignored (`/v1/products/` matches `/v1/products`).
    #[must_use]
    pub fn route(&self, method: Method, path: &str) -> Option<RouteMatch> {
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };

        for r in &self.routes {
            if r.method != method {
                continue;
            }
            let Some(caps) = r.regex.captures(path) else {
                continue;
            };
            let mut path_params = ParamVec::new();
            for (i, name) in r.param_names.iter().enumerate() {
                if let Some(m) = caps.get(i + 1) {
                    path_params.push((Arc::clone(name), decode_segment(m.as_str())));
                }
            }
            debug!(
                method = %method,
                path = %path,
                handler_name = %r.meta.handler_name,
                route_pattern = %r.meta.path_pattern,
                path_params = ?path_params,
                "Route matched"
            );
            return Some(RouteMatch {
                route: Arc::clone(&r.meta),
                path_params,
                handler_name: r.meta.handler_name.clone(),
                query_params: ParamVec::new(),
            });
        }

        debug!(method = %method, path = %path, "No route matched");
        None
    }

    /// Convert `/users/{id}` into `^/users/([^/]+)$` plus the ordered parameter names.
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<Arc<str>>), regex::Error> {
        if path == "/" || path.is_empty() {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut pattern = String::with_capacity(path.len() + 8);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());

        for segment in path.split('/') {
            if segment.starts_with('{') && segment.ends_with('}') {
                let name = segment.trim_start_matches('{').trim_end_matches('}');
                pattern.push_str("/([^/]+)");
                param_names.push(Arc::from(name));
            } else if !segment.is_empty() {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }

        pattern.push('$');
        Ok((Regex::new(&pattern)?, param_names))
    }
}
