use super::build::build_routes;
use super::types::RouteMeta;
use anyhow::{anyhow, Context};
use oas3::OpenApiV3Spec;
use std::path::Path;
use tracing::info;

/// The API schema as loaded at startup.
///
/// Immutable for the lifetime of the process; the raw bytes are kept so the
/// docs endpoint serves exactly what the validator uses.
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub routes: Vec<RouteMeta>,
    /// `info.title`
    pub title: String,
    /// `info.version`
    pub version: String,
    pub raw: Vec<u8>,
}

fn strip_unknown_verbs(val: &mut serde_json::Value) {
    const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

    let Some(serde_json::Value::Object(paths_map)) = val.get_mut("paths") else {
        return;
    };
    for item in paths_map.values_mut() {
        if let serde_json::Value::Object(obj) = item {
            obj.retain(|k, _| {
                let lk = k.to_ascii_lowercase();
                match lk.as_str() {
                    "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                    m if METHODS.contains(&m) => true,
                    _ => k.starts_with("x-"),
                }
            });
        }
    }
}

/// Parse schema text (YAML or JSON) into routes.
pub fn load_spec_from_str(content: &str, yaml: bool) -> anyhow::Result<LoadedSpec> {
    let mut value: serde_json::Value = if yaml {
        serde_yaml::from_str(content).context("schema is not valid YAML")?
    } else {
        serde_json::from_str(content).context("schema is not valid JSON")?
    };

    strip_unknown_verbs(&mut value);
    let spec: OpenApiV3Spec =
        serde_json::from_value(value).context("document is not an OpenAPI 3.1 schema")?;
    spec.validate_version()
        .map_err(|e| anyhow!("unsupported OpenAPI version `{}`: {e}", spec.openapi))?;

    let routes = build_routes(&spec)?;
    info!(
        title = %spec.info.title,
        version = %spec.info.version,
        operations = routes.len(),
        "API schema loaded"
    );

    Ok(LoadedSpec {
        routes,
        title: spec.info.title.clone(),
        version: spec.info.version.clone(),
        raw: content.as_bytes().to_vec(),
    })
}

/// Load the schema file at `path`; `.json` files are parsed as JSON, everything else as YAML.
pub fn load_spec(path: impl AsRef<Path>) -> anyhow::Result<LoadedSpec> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read schema {}", path.display()))?;
    let yaml = !path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    load_spec_from_str(&content, yaml).with_context(|| format!("loading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_unknown_verbs() {
        let mut v = json!({
            "paths": {
                "/x": { "get": {}, "patch": {}, "unknown": {}, "x-note": 1 }
            }
        });
        strip_unknown_verbs(&mut v);
        assert!(v["paths"]["/x"].get("unknown").is_none());
        assert!(v["paths"]["/x"].get("x-note").is_some());
    }

    #[test]
    fn rejects_openapi_3_0_documents() {
        let err = load_spec_from_str(
            "openapi: 3.0.3\ninfo: { title: Old, version: '1' }\npaths: {}\n",
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unsupported OpenAPI version"), "{err}");
    }

    #[test]
    fn loads_json_documents() {
        let doc = json!({
            "openapi": "3.1.0",
            "info": { "title": "Json", "version": "2" },
            "paths": {
                "/ping": { "get": { "operationId": "ping", "responses": { "200": { "description": "ok" } } } }
            }
        });
        let loaded = load_spec_from_str(&doc.to_string(), false).unwrap();
        assert_eq!(loaded.title, "Json");
        assert_eq!(loaded.routes.len(), 1);
    }

    #[test]
    fn missing_file_names_path() {
        let err = load_spec("does/not/exist.yaml").unwrap_err();
        assert!(format!("{err:#}").contains("does/not/exist.yaml"));
    }
}
