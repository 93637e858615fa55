use crate::dispatcher::Dispatcher;
use crate::error::ApiError;
use crate::ids::RecordId;
use crate::store::{Record, ResourceStore};
use crate::typed::{
    Handler, Json, NoInput, PathId, PathIdJson, TypedHandlerRequest, TypedResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::BTreeMap;
use std::sync::Arc;

const NOT_FOUND: &str = "Product not found";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub score: Number,
    pub comment: String,
}

/// Product fields shared by stored records and client input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Number,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifications: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<Vec<Rating>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: ProductInput,
}

impl Record for Product {
    type Input = ProductInput;

    fn with_id(id: RecordId, fields: ProductInput) -> Self {
        Self { id, fields }
    }

    fn id(&self) -> &RecordId {
        &self.id
    }
}

pub type ProductStore = ResourceStore<Product>;

pub struct ListProducts(pub Arc<ProductStore>);

impl Handler for ListProducts {
    type Request = NoInput;
    type Response = Vec<Product>;

    fn handle(
        &self,
        _req: TypedHandlerRequest<NoInput>,
    ) -> Result<TypedResponse<Vec<Product>>, ApiError> {
        Ok(TypedResponse::ok(self.0.list()))
    }
}

pub struct CreateProduct(pub Arc<ProductStore>);

impl Handler for CreateProduct {
    type Request = Json<ProductInput>;
    type Response = Product;

    fn handle(
        &self,
        req: TypedHandlerRequest<Json<ProductInput>>,
    ) -> Result<TypedResponse<Product>, ApiError> {
        let Json(input) = req.data;
        Ok(TypedResponse::created(self.0.create(input)))
    }
}

pub struct GetProduct(pub Arc<ProductStore>);

impl Handler for GetProduct {
    type Request = PathId;
    type Response = Product;

    fn handle(&self, req: TypedHandlerRequest<PathId>) -> Result<TypedResponse<Product>, ApiError> {
        self.0
            .get(&req.data.0)
            .map(TypedResponse::ok)
            .map_err(|_| ApiError::not_found(NOT_FOUND))
    }
}

pub struct UpdateProduct(pub Arc<ProductStore>);

impl Handler for UpdateProduct {
    type Request = PathIdJson<ProductInput>;
    type Response = Product;

    fn handle(
        &self,
        req: TypedHandlerRequest<PathIdJson<ProductInput>>,
    ) -> Result<TypedResponse<Product>, ApiError> {
        let PathIdJson { id, body } = req.data;
        self.0
            .update(&id, body)
            .map(TypedResponse::ok)
            .map_err(|_| ApiError::not_found(NOT_FOUND))
    }
}

pub struct DeleteProduct(pub Arc<ProductStore>);

impl Handler for DeleteProduct {
    type Request = PathId;
    type Response = ();

    fn handle(&self, req: TypedHandlerRequest<PathId>) -> Result<TypedResponse<()>, ApiError> {
        self.0
            .delete(&req.data.0)
            .map(|()| TypedResponse::no_content())
            .map_err(|_| ApiError::not_found(NOT_FOUND))
    }
}

/// Register the product handlers.
///
/// # Safety
///
/// Spawns handler coroutines; see [`Dispatcher::register_handler`].
pub unsafe fn register(dispatcher: &mut Dispatcher, store: &Arc<ProductStore>) {
    // SAFETY: forwarded to the caller.
    unsafe {
        dispatcher.register_typed("list_products", ListProducts(Arc::clone(store)));
        dispatcher.register_typed("create_product", CreateProduct(Arc::clone(store)));
        dispatcher.register_typed("get_product", GetProduct(Arc::clone(store)));
        dispatcher.register_typed("update_product", UpdateProduct(Arc::clone(store)));
        dispatcher.register_typed("delete_product", DeleteProduct(Arc::clone(store)));
    }
}
