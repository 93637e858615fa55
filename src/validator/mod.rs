//! # Schema validation
//!
//! Checks requests before dispatch and responses after it against the JSON
//! Schemas of the matched operation. Validation is a pure function of the
//! compiled schemas and the payload; nothing here mutates state.
//!
//! Violations carry JSON pointers rooted at the part of the request they
//! concern: `/path/id`, `/query/limit`, `/header/x-trace`, `/body/email`.
//! Response violations are rooted at `/response`.

mod cache;
mod params;

pub use cache::ValidatorCache;
pub use params::decode_param_value;

use crate::dispatcher::{HandlerResponse, HeaderVec};
use crate::error::{ApiError, Violation};
use crate::router::ParamVec;
use crate::spec::{ParameterLocation, ParameterMeta, ParameterStyle, RouteMeta};
use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::{error, warn};

/// Body of an incoming request as read off the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Non-empty body that is not valid JSON; holds the parse error
    Invalid(String),
}

impl RequestBody {
    /// Parse raw bytes; whitespace-only bodies count as empty.
    pub fn from_bytes(raw: &[u8]) -> Self {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return RequestBody::Empty;
        }
        match serde_json::from_slice(raw) {
            Ok(v) => RequestBody::Json(v),
            Err(e) => RequestBody::Invalid(e.to_string()),
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            RequestBody::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// The parts of a request that parameters and body are validated against.
#[derive(Debug, Clone, Copy)]
pub struct RequestParts<'a> {
    pub path_params: &'a ParamVec,
    pub query_params: &'a ParamVec,
    pub headers: &'a HeaderVec,
    pub cookies: &'a HashMap<String, String>,
    pub body: &'a RequestBody,
}

impl RequestParts<'_> {
    fn raw_param(&self, param: &ParameterMeta) -> Option<Cow<'_, str>> {
        fn last<'p>(params: &'p ParamVec, name: &str) -> Option<Cow<'p, str>> {
            params
                .iter()
                .rfind(|(k, _)| k.as_ref() == name)
                .map(|(_, v)| Cow::Borrowed(v.as_str()))
        }

        match param.location {
            ParameterLocation::Path => last(self.path_params, &param.name),
            // `?tag=a&tag=b` carries one array value across repeated keys
            ParameterLocation::Query if is_exploded_array(param) => {
                let values: Vec<&str> = self
                    .query_params
                    .iter()
                    .filter(|(k, _)| k.as_ref() == param.name)
                    .map(|(_, v)| v.as_str())
                    .collect();
                match values.as_slice() {
                    [] => None,
                    [one] => Some(Cow::Borrowed(*one)),
                    many => Some(Cow::Owned(many.join(","))),
                }
            }
            ParameterLocation::Query => last(self.query_params, &param.name),
            ParameterLocation::Header => self
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(&param.name))
                .map(|(_, v)| Cow::Borrowed(v.as_str())),
            ParameterLocation::Cookie => self
                .cookies
                .get(&param.name)
                .map(|v| Cow::Borrowed(v.as_str())),
        }
    }
}

/// Form-style array with `explode` on (the default for form).
fn is_exploded_array(param: &ParameterMeta) -> bool {
    let form = matches!(param.style, None | Some(ParameterStyle::Form));
    form && param.explode.unwrap_or(true)
        && param
            .schema
            .as_ref()
            .and_then(|s| s.get("type"))
            .and_then(Value::as_str)
            == Some("array")
}

/// Escape one JSON pointer reference token.
fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Turn a jsonschema error into a violation rooted at `root`.
///
/// `required` errors point at the missing property rather than its parent.
fn to_violation(root: &str, err: &ValidationError<'_>) -> Violation {
    let mut path = format!("{root}{}", err.instance_path().as_str());
    if let ValidationErrorKind::Required { property } = err.kind() {
        match property {
            Value::String(name) => {
                path.push('/');
                path.push_str(&escape_token(name));
            }
            other => {
                path.push('/');
                path.push_str(&escape_token(&other.to_string()));
            }
        }
    }
    Violation::new(path, err.to_string())
}

fn collect(root: &str, validator: &Validator, instance: &Value, out: &mut Vec<Violation>) {
    out.extend(validator.iter_errors(instance).map(|e| to_violation(root, &e)));
}

/// Request and response validation for every operation of the schema.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    cache: ValidatorCache,
    validate_responses: bool,
}

impl SchemaValidator {
    /// Compile all schemas of `routes`.
    ///
    /// # Errors
    ///
    /// Fails when any schema does not compile.
    pub fn new(routes: &[RouteMeta], validate_responses: bool) -> anyhow::Result<Self> {
        Ok(Self {
            cache: ValidatorCache::precompile(routes)?,
            validate_responses,
        })
    }

    pub fn cache(&self) -> &ValidatorCache {
        &self.cache
    }

    pub fn validates_responses(&self) -> bool {
        self.validate_responses
    }

    /// Check parameters and body of a request against `route`.
    ///
    /// All violations are collected; the handler must not run unless this
    /// returns `Ok`.
    pub fn validate_request(
        &self,
        route: &RouteMeta,
        parts: &RequestParts<'_>,
    ) -> Result<(), ApiError> {
        let handler = route.handler_name.as_str();
        let mut errors = Vec::new();

        for param in &route.parameters {
            let root = format!("/{}/{}", param.location, escape_token(&param.name));
            let Some(raw) = parts.raw_param(param) else {
                if param.required {
                    errors.push(Violation::new(
                        root,
                        format!("missing required {} parameter `{}`", param.location, param.name),
                    ));
                }
                continue;
            };
            if let Some(validator) = self.cache.parameter(handler, param.location, &param.name) {
                let value = decode_param_value(&raw, param.schema.as_ref(), param.style);
                collect(&root, validator, &value, &mut errors);
            }
        }

        if route.request_schema.is_some() {
            match parts.body {
                RequestBody::Empty if route.request_body_required => {
                    errors.push(Violation::new("/body", "request body is required"));
                }
                RequestBody::Empty => {}
                RequestBody::Invalid(reason) => {
                    errors.push(Violation::new(
                        "/body",
                        format!("request body is not valid JSON: {reason}"),
                    ));
                }
                RequestBody::Json(body) => {
                    if let Some(validator) = self.cache.request_body(handler) {
                        collect("/body", validator, body, &mut errors);
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            warn!(
                handler_name = %handler,
                violations = errors.len(),
                first = %errors[0].path,
                "Request validation failed"
            );
            Err(ApiError::SchemaViolation { errors })
        }
    }

    /// Check a handler response against the schema declared for its status.
    ///
    /// Undeclared statuses, statuses declared without a JSON schema and
    /// bodiless responses pass. Disabled entirely when response validation
    /// is switched off.
    pub fn validate_response(
        &self,
        route: &RouteMeta,
        resp: &HandlerResponse,
    ) -> Result<(), ApiError> {
        if !self.validate_responses || !resp.has_body() {
            return Ok(());
        }
        let Some(validator) = self.cache.response(&route.handler_name, resp.status) else {
            return Ok(());
        };

        let mut errors = Vec::new();
        collect("/response", validator, &resp.body, &mut errors);
        if errors.is_empty() {
            return Ok(());
        }
        error!(
            handler_name = %route.handler_name,
            status = resp.status,
            violations = ?errors,
            "Handler response violates its declared schema"
        );
        Err(ApiError::ResponseContract { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ResponseSpec;
    use http::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn user_schema() -> Value {
        json!({
            "type": "object",
            "required": ["name", "age", "email"],
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "number"},
                "email": {"type": "string"}
            }
        })
    }

    fn update_route() -> RouteMeta {
        let mut responses = HashMap::new();
        responses.insert(
            200,
            ResponseSpec {
                schema: Some(user_schema()),
            },
        );
        responses.insert(204, ResponseSpec::default());
        RouteMeta {
            method: Method::PUT,
            path_pattern: "/v1/users/{id}".into(),
            handler_name: "update_user".into(),
            parameters: vec![
                ParameterMeta {
                    name: "id".into(),
                    location: ParameterLocation::Path,
                    required: true,
                    schema: Some(json!({"type": "string"})),
                    style: None,
                    explode: None,
                },
                ParameterMeta {
                    name: "limit".into(),
                    location: ParameterLocation::Query,
                    required: false,
                    schema: Some(json!({"type": "integer", "minimum": 1})),
                    style: Some(ParameterStyle::Form),
                    explode: None,
                },
            ],
            request_schema: Some(user_schema()),
            request_body_required: true,
            responses,
            base_path: String::new(),
        }
    }

    struct Parts {
        path: ParamVec,
        query: ParamVec,
        headers: HeaderVec,
        cookies: HashMap<String, String>,
        body: RequestBody,
    }

    impl Parts {
        fn new(body: RequestBody) -> Self {
            let mut path = ParamVec::new();
            path.push((Arc::from("id"), "1".to_string()));
            Self {
                path,
                query: ParamVec::new(),
                headers: HeaderVec::new(),
                cookies: HashMap::new(),
                body,
            }
        }

        fn as_parts(&self) -> RequestParts<'_> {
            RequestParts {
                path_params: &self.path,
                query_params: &self.query,
                headers: &self.headers,
                cookies: &self.cookies,
                body: &self.body,
            }
        }
    }

    fn violations(err: ApiError) -> Vec<Violation> {
        match err {
            ApiError::SchemaViolation { errors } | ApiError::ResponseContract { errors } => errors,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn valid_request_passes() {
        let v = SchemaValidator::new(&[update_route()], true).unwrap();
        let parts = Parts::new(RequestBody::Json(
            json!({"name": "Ann", "age": 30, "email": "ann@example.com"}),
        ));
        assert!(v.validate_request(&update_route(), &parts.as_parts()).is_ok());
    }

    #[test]
    fn missing_property_points_at_the_property() {
        let v = SchemaValidator::new(&[update_route()], true).unwrap();
        let parts = Parts::new(RequestBody::Json(json!({"name": "Ann", "age": 30})));
        let errors = violations(v.validate_request(&update_route(), &parts.as_parts()).unwrap_err());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "/body/email");
        assert!(errors[0].message.contains("email"));
    }

    #[test]
    fn wrong_type_points_at_the_field() {
        let v = SchemaValidator::new(&[update_route()], true).unwrap();
        let parts = Parts::new(RequestBody::Json(
            json!({"name": "Ann", "age": "old", "email": "a@b.c"}),
        ));
        let errors = violations(v.validate_request(&update_route(), &parts.as_parts()).unwrap_err());
        assert_eq!(errors[0].path, "/body/age");
    }

    #[test]
    fn absent_and_invalid_bodies_are_violations() {
        let v = SchemaValidator::new(&[update_route()], true).unwrap();
        for body in [RequestBody::Empty, RequestBody::from_bytes(b"{not json")] {
            let parts = Parts::new(body);
            let errors =
                violations(v.validate_request(&update_route(), &parts.as_parts()).unwrap_err());
            assert_eq!(errors[0].path, "/body");
        }
    }

    #[test]
    fn query_parameters_are_decoded_then_validated() {
        let v = SchemaValidator::new(&[update_route()], true).unwrap();
        let mut parts = Parts::new(RequestBody::Json(
            json!({"name": "Ann", "age": 30, "email": "a@b.c"}),
        ));
        parts.query.push((Arc::from("limit"), "5".to_string()));
        assert!(v.validate_request(&update_route(), &parts.as_parts()).is_ok());

        parts.query.clear();
        parts.query.push((Arc::from("limit"), "0".to_string()));
        let errors = violations(v.validate_request(&update_route(), &parts.as_parts()).unwrap_err());
        assert_eq!(errors[0].path, "/query/limit");
    }

    #[test]
    fn missing_required_path_parameter_is_reported() {
        let v = SchemaValidator::new(&[update_route()], true).unwrap();
        let mut parts = Parts::new(RequestBody::Json(
            json!({"name": "Ann", "age": 30, "email": "a@b.c"}),
        ));
        parts.path.clear();
        let errors = violations(v.validate_request(&update_route(), &parts.as_parts()).unwrap_err());
        assert_eq!(errors[0].path, "/path/id");
    }

    #[test]
    fn response_contract_violations_are_server_faults() {
        let v = SchemaValidator::new(&[update_route()], true).unwrap();
        let bad = HandlerResponse::json(200, json!({"name": "Ann"}));
        let err = v.validate_response(&update_route(), &bad).unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(violations(err).iter().any(|e| e.path == "/response/email"));
    }

    #[test]
    fn undeclared_or_bodiless_responses_pass() {
        let v = SchemaValidator::new(&[update_route()], true).unwrap();
        let teapot = HandlerResponse::json(418, json!("anything"));
        assert!(v.validate_response(&update_route(), &teapot).is_ok());
        assert!(v
            .validate_response(&update_route(), &HandlerResponse::no_content())
            .is_ok());
    }

    #[test]
    fn response_validation_can_be_disabled() {
        let v = SchemaValidator::new(&[update_route()], false).unwrap();
        let bad = HandlerResponse::json(200, json!({}));
        assert!(v.validate_response(&update_route(), &bad).is_ok());
    }

    #[test]
    fn repeated_query_keys_form_one_array() {
        let mut route = update_route();
        route.parameters.push(ParameterMeta {
            name: "tag".into(),
            location: ParameterLocation::Query,
            required: false,
            schema: Some(json!({"type": "array", "items": {"type": "integer"}, "maxItems": 2})),
            style: None,
            explode: None,
        });
        let v = SchemaValidator::new(std::slice::from_ref(&route), true).unwrap();

        let mut parts = Parts::new(RequestBody::Json(json!({"name": "A", "age": 1, "email": "a@x"})));
        parts.query.push((Arc::from("tag"), "1".to_string()));
        parts.query.push((Arc::from("tag"), "2".to_string()));
        assert!(v.validate_request(&route, &parts.as_parts()).is_ok());

        parts.query.push((Arc::from("tag"), "3".to_string()));
        let err = v.validate_request(&route, &parts.as_parts()).unwrap_err();
        assert_eq!(violations(err)[0].path, "/query/tag");
    }

    #[test]
    fn pointer_tokens_are_escaped() {
        assert_eq!(escape_token("a/b~c"), "a~1b~0c");
    }
}
