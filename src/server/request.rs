use crate::dispatcher::HeaderVec;
use crate::ids::RequestId;
use crate::router::ParamVec;
use crate::validator::RequestBody;
use may_minihttp::Request;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Request data extracted from the wire, before routing.
#[derive(Debug, PartialEq)]
pub struct ParsedRequest {
    pub request_id: RequestId,
    pub method: String,
    /// Path without the query string
    pub path: String,
    /// Header names lowercased
    pub headers: HeaderVec,
    pub cookies: HashMap<String, String>,
    pub query_params: ParamVec,
    pub body: RequestBody,
}

/// Parse the `cookie` header into name/value pairs.
pub fn parse_cookies(headers: &HeaderVec) -> HashMap<String, String> {
    headers
        .iter()
        .find(|(k, _)| k.as_ref() == "cookie")
        .map(|(_, c)| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim();
                    if name.is_empty() {
                        return None;
                    }
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name.to_string(), value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// URL-decode the query string of `path` (everything after `?`), keeping order and repeats.
pub fn parse_query_params(path: &str) -> ParamVec {
    match path.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect(),
        None => ParamVec::new(),
    }
}

/// Extract method, path, headers, cookies, query and body from a raw request.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path
        .split_once('?')
        .map_or(raw_path.as_str(), |(p, _)| p)
        .to_string();

    let headers: HeaderVec = req
        .headers()
        .iter()
        .map(|h| {
            (
                Arc::from(h.name.to_ascii_lowercase()),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();
    let request_id = RequestId::from_header_or_new(
        headers
            .iter()
            .find(|(k, _)| k.as_ref() == "x-request-id")
            .map(|(_, v)| v.as_str()),
    );
    let cookies = parse_cookies(&headers);
    let query_params = parse_query_params(&raw_path);

    let mut raw_body = Vec::new();
    let body = match req.body().read_to_end(&mut raw_body) {
        Ok(_) => RequestBody::from_bytes(&raw_body),
        Err(e) => RequestBody::Invalid(format!("failed to read request body: {e}")),
    };

    debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        header_count = headers.len(),
        query_count = query_params.len(),
        body_bytes = raw_body.len(),
        "HTTP request parsed"
    );

    ParsedRequest {
        request_id,
        method,
        path,
        headers,
        cookies,
        query_params,
        body,
    }
}
