use crate::dispatcher::Dispatcher;
use crate::error::ApiError;
use crate::typed::{Handler, NoInput, TypedHandlerRequest, TypedResponse};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

pub const GREETING: &str = "Hello World";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Greeting {
    pub message: &'static str,
}

/// `/v2/hello` greeting with version and server time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionedGreeting {
    pub message: &'static str,
    pub version: &'static str,
    /// RFC 3339, UTC
    pub timestamp: String,
}

pub struct Hello;

impl Handler for Hello {
    type Request = NoInput;
    type Response = Greeting;

    fn handle(&self, _req: TypedHandlerRequest<NoInput>) -> Result<TypedResponse<Greeting>, ApiError> {
        Ok(TypedResponse::ok(Greeting { message: GREETING }))
    }
}

pub struct HelloV2;

impl Handler for HelloV2 {
    type Request = NoInput;
    type Response = VersionedGreeting;

    fn handle(
        &self,
        _req: TypedHandlerRequest<NoInput>,
    ) -> Result<TypedResponse<VersionedGreeting>, ApiError> {
        Ok(TypedResponse::ok(VersionedGreeting {
            message: GREETING,
            version: "v2",
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }))
    }
}

/// Register `hello`, `hello_v1` and `hello_v2`.
///
/// # Safety
///
/// Spawns handler coroutines; see [`Dispatcher::register_handler`].
pub unsafe fn register(dispatcher: &mut Dispatcher) {
    // SAFETY: forwarded to the caller.
    unsafe {
        dispatcher.register_typed("hello", Hello);
        dispatcher.register_typed("hello_v1", Hello);
        dispatcher.register_typed("hello_v2", HelloV2);
    }
}
