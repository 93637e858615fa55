//! Handlers for the API operations and the state they share.

pub mod hello;
pub mod products;
pub mod users;

use crate::dispatcher::Dispatcher;
use products::ProductStore;
use std::sync::Arc;
use users::UserStore;

/// Stores owned by one server instance, injected into handlers by `Arc`.
#[derive(Clone, Default)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub products: Arc<ProductStore>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Register every operation handler against `state`.
///
/// # Safety
///
/// Spawns handler coroutines; see [`Dispatcher::register_handler`].
pub unsafe fn register_all(dispatcher: &mut Dispatcher, state: &AppState) {
    // SAFETY: forwarded to the caller.
    unsafe {
        hello::register(dispatcher);
        users::register(dispatcher, &state.users);
        products::register(dispatcher, &state.products);
    }
}
