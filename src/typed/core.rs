use crate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
use crate::error::ApiError;
use crate::ids::{RecordId, RequestId};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::TryFrom;

/// Trait implemented by typed coroutine handlers.
///
/// The raw [`HandlerRequest`] is converted into [`Handler::Request`] before
/// `handle` runs; a failed conversion is answered with the conversion error
/// and the handler is not called.
pub trait Handler: Send + 'static {
    /// Request data extracted from the validated [`HandlerRequest`]
    type Request: TryFrom<HandlerRequest, Error = ApiError> + Send + 'static;
    /// Response body, serialized to JSON
    type Response: Serialize + Send + 'static;

    fn handle(
        &self,
        req: TypedHandlerRequest<Self::Request>,
    ) -> Result<TypedResponse<Self::Response>, ApiError>;
}

/// Status plus optional body returned by a typed handler.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedResponse<T> {
    pub status: u16,
    pub body: Option<T>,
}

impl<T: Serialize> TypedResponse<T> {
    /// `200 OK` with `body`.
    pub fn ok(body: T) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    /// `201 Created` with `body`.
    pub fn created(body: T) -> Self {
        Self {
            status: 201,
            body: Some(body),
        }
    }

    /// `204 No Content`.
    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }

    /// Serialize into the untyped response the dispatcher sends back.
    pub fn into_handler_response(self) -> Result<HandlerResponse, ApiError> {
        match self.body {
            Some(body) => HandlerResponse::serialized(self.status, &body),
            None if self.status == 204 => Ok(HandlerResponse::no_content()),
            None => Ok(HandlerResponse::json(self.status, serde_json::Value::Null)),
        }
    }
}

/// Typed request data passed to a [`Handler`].
#[derive(Debug, Clone)]
pub struct TypedHandlerRequest<T> {
    pub request_id: RequestId,
    pub method: Method,
    pub path: String,
    pub handler_name: String,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    pub data: T,
}

impl<T> TypedHandlerRequest<T>
where
    T: TryFrom<HandlerRequest, Error = ApiError>,
{
    /// Convert a raw request, extracting `data` with `T::try_from`.
    pub fn from_handler(req: HandlerRequest) -> Result<Self, ApiError> {
        let path_params = req.path_params_map();
        let query_params = req.query_params_map();
        let request_id = req.request_id;
        let method = req.method.clone();
        let path = req.path.clone();
        let handler_name = req.handler_name.clone();
        let data = T::try_from(req)?;

        Ok(TypedHandlerRequest {
            request_id,
            method,
            path,
            handler_name,
            path_params,
            query_params,
            data,
        })
    }
}

/// Request data for operations that take no input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoInput;

impl TryFrom<HandlerRequest> for NoInput {
    type Error = ApiError;

    fn try_from(_req: HandlerRequest) -> Result<Self, Self::Error> {
        Ok(NoInput)
    }
}

/// The `{id}` path parameter of item routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathId(pub RecordId);

fn path_id(req: &HandlerRequest) -> Result<RecordId, ApiError> {
    req.get_path_param("id")
        .map(RecordId::from)
        .ok_or_else(|| ApiError::MalformedRequest("missing path parameter `id`".to_string()))
}

fn json_body<T: DeserializeOwned>(req: &mut HandlerRequest) -> Result<T, ApiError> {
    let body = req
        .body
        .take()
        .ok_or_else(|| ApiError::MalformedRequest("request body is required".to_string()))?;
    serde_json::from_value(body)
        .map_err(|e| ApiError::MalformedRequest(format!("request body does not match: {e}")))
}

impl TryFrom<HandlerRequest> for PathId {
    type Error = ApiError;

    fn try_from(req: HandlerRequest) -> Result<Self, Self::Error> {
        path_id(&req).map(PathId)
    }
}

/// A JSON request body deserialized into `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T: DeserializeOwned> TryFrom<HandlerRequest> for Json<T> {
    type Error = ApiError;

    fn try_from(mut req: HandlerRequest) -> Result<Self, Self::Error> {
        json_body(&mut req).map(Json)
    }
}

/// `{id}` path parameter together with a JSON body, as used by `PUT` item routes.
#[derive(Debug, Clone, PartialEq)]
pub struct PathIdJson<T> {
    pub id: RecordId,
    pub body: T,
}

impl<T: DeserializeOwned> TryFrom<HandlerRequest> for PathIdJson<T> {
    type Error = ApiError;

    fn try_from(mut req: HandlerRequest) -> Result<Self, Self::Error> {
        let id = path_id(&req)?;
        let body = json_body(&mut req)?;
        Ok(PathIdJson { id, body })
    }
}

impl Dispatcher {
    /// Register a typed handler under `name`.
    ///
    /// # Safety
    ///
    /// Same requirements as [`Dispatcher::register_handler`].
    pub unsafe fn register_typed<H>(&mut self, name: &str, handler: H)
    where
        H: Handler,
    {
        // SAFETY: forwarded to the caller.
        unsafe {
            self.register_handler(name, move |req| {
                let typed = TypedHandlerRequest::<H::Request>::from_handler(req)?;
                handler.handle(typed)?.into_handler_response()
            });
        }
    }
}
