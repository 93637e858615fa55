use crate::spec::{ParameterLocation, RouteMeta};
use anyhow::{anyhow, Context};
use jsonschema::Validator;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Compiled JSON Schema validators for every schema of every route.
///
/// Built once at startup and never mutated, so lookups need no locking.
/// Keys are `handler:request`, `handler:param:<location>:<name>` and
/// `handler:response:<status>`.
#[derive(Clone, Default)]
pub struct ValidatorCache {
    validators: HashMap<String, Arc<Validator>>,
}

impl std::fmt::Debug for ValidatorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorCache")
            .field("len", &self.validators.len())
            .finish()
    }
}

fn compile(schema: &Value) -> anyhow::Result<Validator> {
    jsonschema::validator_for(schema).map_err(|e| anyhow!("{e}"))
}

fn request_key(handler: &str) -> String {
    format!("{handler}:request")
}

fn param_key(handler: &str, location: ParameterLocation, name: &str) -> String {
    format!("{handler}:param:{location}:{name}")
}

fn response_key(handler: &str, status: u16) -> String {
    format!("{handler}:response:{status}")
}

impl ValidatorCache {
    /// Compile every request body, parameter and response schema of `routes`.
    ///
    /// # Errors
    ///
    /// Fails on the first schema that is not a valid JSON Schema, naming the
    /// operation and the part it belongs to.
    pub fn precompile(routes: &[RouteMeta]) -> anyhow::Result<Self> {
        let mut validators = HashMap::new();

        for route in routes {
            let handler = route.handler_name.as_str();

            if let Some(schema) = &route.request_schema {
                let v = compile(schema)
                    .with_context(|| format!("request body schema of `{handler}`"))?;
                validators.insert(request_key(handler), Arc::new(v));
            }

            for param in &route.parameters {
                if let Some(schema) = &param.schema {
                    let v = compile(schema).with_context(|| {
                        format!("{} parameter `{}` of `{handler}`", param.location, param.name)
                    })?;
                    validators.insert(param_key(handler, param.location, &param.name), Arc::new(v));
                }
            }

            for (status, spec) in &route.responses {
                if let Some(schema) = &spec.schema {
                    let v = compile(schema)
                        .with_context(|| format!("response {status} schema of `{handler}`"))?;
                    validators.insert(response_key(handler, *status), Arc::new(v));
                }
            }
            debug!(handler_name = %handler, "Schemas compiled");
        }

        info!(
            routes = routes.len(),
            validators = validators.len(),
            "Schema validators compiled"
        );
        Ok(Self { validators })
    }

    pub fn request_body(&self, handler: &str) -> Option<&Validator> {
        self.validators.get(&request_key(handler)).map(AsRef::as_ref)
    }

    pub fn parameter(
        &self,
        handler: &str,
        location: ParameterLocation,
        name: &str,
    ) -> Option<&Validator> {
        self.validators
            .get(&param_key(handler, location, name))
            .map(AsRef::as_ref)
    }

    pub fn response(&self, handler: &str, status: u16) -> Option<&Validator> {
        self.validators
            .get(&response_key(handler, status))
            .map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
