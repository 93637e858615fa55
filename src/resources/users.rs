use crate::dispatcher::Dispatcher;
use crate::error::ApiError;
use crate::ids::RecordId;
use crate::store::{Record, ResourceStore};
use crate::typed::{
    Handler, Json, NoInput, PathId, PathIdJson, TypedHandlerRequest, TypedResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::sync::Arc;

const NOT_FOUND: &str = "User not found";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub name: String,
    pub age: Number,
    pub email: String,
}

/// Fields of a user as sent by clients; a client `id` is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserInput {
    pub name: String,
    pub age: Number,
    pub email: String,
}

/// `GET /v1/users/{id}` answers with this projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: RecordId,
    pub name: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
        }
    }
}

impl Record for User {
    type Input = UserInput;

    fn with_id(id: RecordId, input: UserInput) -> Self {
        Self {
            id,
            name: input.name,
            age: input.age,
            email: input.email,
        }
    }

    fn id(&self) -> &RecordId {
        &self.id
    }
}

pub type UserStore = ResourceStore<User>;

pub struct ListUsers(pub Arc<UserStore>);

impl Handler for ListUsers {
    type Request = NoInput;
    type Response = Vec<User>;

    fn handle(&self, _req: TypedHandlerRequest<NoInput>) -> Result<TypedResponse<Vec<User>>, ApiError> {
        Ok(TypedResponse::ok(self.0.list()))
    }
}

pub struct CreateUser(pub Arc<UserStore>);

impl Handler for CreateUser {
    type Request = Json<UserInput>;
    type Response = User;

    fn handle(
        &self,
        req: TypedHandlerRequest<Json<UserInput>>,
    ) -> Result<TypedResponse<User>, ApiError> {
        let Json(input) = req.data;
        Ok(TypedResponse::created(self.0.create(input)))
    }
}

pub struct GetUser(pub Arc<UserStore>);

impl Handler for GetUser {
    type Request = PathId;
    type Response = UserSummary;

    fn handle(&self, req: TypedHandlerRequest<PathId>) -> Result<TypedResponse<UserSummary>, ApiError> {
        let user = self
            .0
            .get(&req.data.0)
            .map_err(|_| ApiError::not_found(NOT_FOUND))?;
        Ok(TypedResponse::ok(user.into()))
    }
}

pub struct UpdateUser(pub Arc<UserStore>);

impl Handler for UpdateUser {
    type Request = PathIdJson<UserInput>;
    type Response = User;

    fn handle(
        &self,
        req: TypedHandlerRequest<PathIdJson<UserInput>>,
    ) -> Result<TypedResponse<User>, ApiError> {
        let PathIdJson { id, body } = req.data;
        let user = self
            .0
            .update(&id, body)
            .map_err(|_| ApiError::not_found(NOT_FOUND))?;
        Ok(TypedResponse::ok(user))
    }
}

pub struct DeleteUser(pub Arc<UserStore>);

impl Handler for DeleteUser {
    type Request = PathId;
    type Response = ();

    fn handle(&self, req: TypedHandlerRequest<PathId>) -> Result<TypedResponse<()>, ApiError> {
        self.0
            .delete(&req.data.0)
            .map_err(|_| ApiError::not_found(NOT_FOUND))?;
        Ok(TypedResponse::no_content())
    }
}

/// Register the user handlers.
///
/// # Safety
///
/// Spawns handler coroutines; see [`Dispatcher::register_handler`].
pub unsafe fn register(dispatcher: &mut Dispatcher, store: &Arc<UserStore>) {
    // SAFETY: forwarded to the caller.
    unsafe {
        dispatcher.register_typed("list_users", ListUsers(Arc::clone(store)));
        dispatcher.register_typed("create_user", CreateUser(Arc::clone(store)));
        dispatcher.register_typed("get_user", GetUser(Arc::clone(store)));
        dispatcher.register_typed("update_user", UpdateUser(Arc::clone(store)));
        dispatcher.register_typed("delete_user", DeleteUser(Arc::clone(store)));
    }
}
