use super::types::{
    ParameterLocation, ParameterMeta, ParameterStyle, ResponseSpec, Responses, RouteMeta,
};
use oas3::spec::{ObjectOrReference, Operation, Parameter};
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::fmt;

/// Guards `$ref` expansion against self-referencing schemas.
const MAX_REF_DEPTH: usize = 32;

/// A problem found while turning the schema into routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecIssue {
    pub location: String,
    pub kind: &'static str,
    pub message: String,
}

impl SpecIssue {
    pub fn new(location: impl Into<String>, kind: &'static str, message: impl Into<String>) -> Self {
        SpecIssue {
            location: location.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SpecIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Collapse collected issues into a single error listing all of them.
pub fn ensure_no_issues(issues: &[SpecIssue]) -> anyhow::Result<()> {
    if issues.is_empty() {
        return Ok(());
    }
    let listing = issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n  ");
    anyhow::bail!(
        "OpenAPI schema is not usable, {} issue(s) found:\n  {listing}",
        issues.len()
    )
}

/// Resolve a `#/components/schemas/Name` reference.
pub fn resolve_schema_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a oas3::spec::ObjectSchema> {
    let name = ref_path.strip_prefix("#/components/schemas/")?;
    spec.components
        .as_ref()?
        .schemas
        .get(name)
        .and_then(|schema_ref| match schema_ref {
            ObjectOrReference::Object(schema) => Some(schema),
            _ => None,
        })
}

/// Recursively replace every `$ref` in `value` with the schema it points to.
///
/// Unresolvable references are recorded as issues and left in place.
pub fn expand_schema_refs(
    spec: &OpenApiV3Spec,
    value: &mut Value,
    location: &str,
    issues: &mut Vec<SpecIssue>,
) {
    expand_at_depth(spec, value, location, issues, 0);
}

fn expand_at_depth(
    spec: &OpenApiV3Spec,
    value: &mut Value,
    location: &str,
    issues: &mut Vec<SpecIssue>,
    depth: usize,
) {
    if depth > MAX_REF_DEPTH {
        issues.push(SpecIssue::new(
            location,
            "RefTooDeep",
            "schema references nest too deeply (recursive schema?)",
        ));
        return;
    }
    match value {
        Value::Object(obj) => {
            if let Some(ref_path) = obj.get("$ref").and_then(|v| v.as_str()) {
                match resolve_schema_ref(spec, ref_path).map(serde_json::to_value) {
                    Some(Ok(mut resolved)) => {
                        expand_at_depth(spec, &mut resolved, location, issues, depth + 1);
                        *value = resolved;
                    }
                    _ => issues.push(SpecIssue::new(
                        location,
                        "UnresolvedRef",
                        format!("cannot resolve {ref_path}"),
                    )),
                }
                return;
            }
            for v in obj.values_mut() {
                expand_at_depth(spec, v, location, issues, depth);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                expand_at_depth(spec, v, location, issues, depth);
            }
        }
        _ => {}
    }
}

fn schema_to_value(
    spec: &OpenApiV3Spec,
    schema: &ObjectOrReference<oas3::spec::ObjectSchema>,
    location: &str,
    issues: &mut Vec<SpecIssue>,
) -> Option<Value> {
    let mut value = match schema {
        ObjectOrReference::Object(obj) => serde_json::to_value(obj).ok(),
        ObjectOrReference::Ref { ref_path, .. } => {
            let resolved = resolve_schema_ref(spec, ref_path).and_then(|s| serde_json::to_value(s).ok());
            if resolved.is_none() {
                issues.push(SpecIssue::new(
                    location,
                    "UnresolvedRef",
                    format!("cannot resolve {ref_path}"),
                ));
            }
            resolved
        }
    }?;
    expand_schema_refs(spec, &mut value, location, issues);
    Some(value)
}

fn resolve_handler_name(
    operation: &Operation,
    location: &str,
    issues: &mut Vec<SpecIssue>,
) -> Option<String> {
    operation
        .extensions
        .iter()
        .find_map(|(key, val)| match val {
            Value::String(s) if key.starts_with("x-handler") => Some(s.clone()),
            _ => None,
        })
        .or_else(|| operation.operation_id.clone())
        .or_else(|| {
            issues.push(SpecIssue::new(
                location,
                "MissingHandler",
                "missing operationId or x-handler extension",
            ));
            None
        })
}

/// Extract the `application/json` request body schema and its required flag.
pub fn extract_request_schema(
    spec: &OpenApiV3Spec,
    operation: &Operation,
    location: &str,
    issues: &mut Vec<SpecIssue>,
) -> (Option<Value>, bool) {
    match operation.request_body.as_ref() {
        Some(ObjectOrReference::Object(body)) => {
            let schema = body
                .content
                .get("application/json")
                .and_then(|media| media.schema.as_ref())
                .and_then(|s| schema_to_value(spec, s, location, issues));
            (schema, body.required.unwrap_or(false))
        }
        Some(ObjectOrReference::Ref { ref_path, .. }) => {
            issues.push(SpecIssue::new(
                location,
                "UnsupportedRef",
                format!("requestBody references are not supported ({ref_path})"),
            ));
            (None, false)
        }
        None => (None, false),
    }
}

/// Collect declared responses keyed by numeric status.
///
/// Non-numeric keys (`default`, `2XX`) are ignored; responses for those
/// statuses pass through the response phase unchecked.
pub fn extract_responses(
    spec: &OpenApiV3Spec,
    operation: &Operation,
    location: &str,
    issues: &mut Vec<SpecIssue>,
) -> Responses {
    let mut out = Responses::new();
    let Some(responses) = operation.responses.as_ref() else {
        return out;
    };
    for (status_str, resp_ref) in responses {
        let Ok(status) = status_str.parse::<u16>() else {
            continue;
        };
        let ObjectOrReference::Object(resp) = resp_ref else {
            issues.push(SpecIssue::new(
                location,
                "UnsupportedRef",
                format!("response {status} uses a reference, inline it instead"),
            ));
            continue;
        };
        let schema = resp
            .content
            .get("application/json")
            .and_then(|media| media.schema.as_ref())
            .and_then(|s| schema_to_value(spec, s, location, issues));
        out.insert(status, ResponseSpec { schema });
    }
    out
}

fn resolve_parameter_ref<'a>(spec: &'a OpenApiV3Spec, ref_path: &str) -> Option<&'a Parameter> {
    let name = ref_path.strip_prefix("#/components/parameters/")?;
    spec.components
        .as_ref()?
        .parameters
        .get(name)
        .and_then(|param_ref| match param_ref {
            ObjectOrReference::Object(param) => Some(param),
            _ => None,
        })
}

/// Resolve parameter references and flatten them into [`ParameterMeta`].
///
/// Path parameters are always required.
pub fn extract_parameters(
    spec: &OpenApiV3Spec,
    params: &[ObjectOrReference<Parameter>],
    location: &str,
    issues: &mut Vec<SpecIssue>,
) -> Vec<ParameterMeta> {
    let mut out = Vec::new();
    for p in params {
        let param = match p {
            ObjectOrReference::Object(obj) => obj,
            ObjectOrReference::Ref { ref_path, .. } => match resolve_parameter_ref(spec, ref_path) {
                Some(param) => param,
                None => {
                    issues.push(SpecIssue::new(
                        location,
                        "UnresolvedRef",
                        format!("cannot resolve {ref_path}"),
                    ));
                    continue;
                }
            },
        };
        let param_location = ParameterLocation::from(param.location);
        let schema = param
            .schema
            .as_ref()
            .and_then(|s| schema_to_value(spec, s, location, issues));
        out.push(ParameterMeta {
            name: param.name.clone(),
            location: param_location,
            required: param_location == ParameterLocation::Path || param.required.unwrap_or(false),
            schema,
            style: param.style.map(ParameterStyle::from),
            explode: param.explode,
        });
    }
    out
}

/// Operation-level parameters override path-level ones with the same name and location.
fn merge_parameters(path_level: Vec<ParameterMeta>, op_level: Vec<ParameterMeta>) -> Vec<ParameterMeta> {
    let mut merged: Vec<ParameterMeta> = path_level
        .into_iter()
        .filter(|p| {
            !op_level
                .iter()
                .any(|o| o.name == p.name && o.location == p.location)
        })
        .collect();
    merged.extend(op_level);
    merged
}

fn base_path_of(spec: &OpenApiV3Spec) -> String {
    let Some(server) = spec.servers.first() else {
        return String::new();
    };
    let url_str = &server.url;
    url::Url::parse(url_str)
        .or_else(|_| url::Url::parse(&format!("http://placeholder{url_str}")))
        .map(|u| {
            let p = u.path().trim_end_matches('/');
            if p == "/" {
                String::new()
            } else {
                p.to_string()
            }
        })
        .unwrap_or_default()
}

/// Build route metadata for every operation of the schema.
///
/// # Errors
///
/// Returns one error listing every issue found (missing `operationId`,
/// unresolvable references, duplicate handler names).
pub fn build_routes(spec: &OpenApiV3Spec) -> anyhow::Result<Vec<RouteMeta>> {
    let mut routes: Vec<RouteMeta> = Vec::new();
    let mut issues = Vec::new();
    let base_path = base_path_of(spec);

    if let Some(paths_map) = spec.paths.as_ref() {
        for (path, item) in paths_map {
            let mut seen = Vec::new();
            for (method, operation) in item.methods() {
                // oas3 lists TRACE twice
                if seen.contains(&method) {
                    continue;
                }
                seen.push(method.clone());

                let location = format!("{method} {path}");
                let Some(handler_name) = resolve_handler_name(operation, &location, &mut issues)
                else {
                    continue;
                };
                if routes.iter().any(|r| r.handler_name == handler_name) {
                    issues.push(SpecIssue::new(
                        &location,
                        "DuplicateHandler",
                        format!("operationId `{handler_name}` is used more than once"),
                    ));
                    continue;
                }

                let (request_schema, request_body_required) =
                    extract_request_schema(spec, operation, &location, &mut issues);
                let responses = extract_responses(spec, operation, &location, &mut issues);
                let parameters = merge_parameters(
                    extract_parameters(spec, &item.parameters, &location, &mut issues),
                    extract_parameters(spec, &operation.parameters, &location, &mut issues),
                );

                routes.push(RouteMeta {
                    method,
                    path_pattern: path.clone(),
                    handler_name,
                    parameters,
                    request_schema,
                    request_body_required,
                    responses,
                    base_path: base_path.clone(),
                });
            }
        }
    }

    ensure_no_issues(&issues)?;
    Ok(routes)
}
