/// Item endpoints
///
/// Symmetric to the tag endpoints: owner-scoped listing (with the
/// assigned-only filter, via `collection_items`) and creation.
///
/// # Endpoints
///
/// - `GET /v1/items?assigned_only={0|1}` - List own items, name descending
/// - `POST /v1/items` - Create an item

use crate::{
    app::{AppState, CurrentUser},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use curio_shared::{filter::parse_flag, models::item::Item};
use serde::{Deserialize, Serialize};

/// Item list query parameters
#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    /// `1` restricts to items assigned to at least one collection
    pub assigned_only: Option<String>,
}

/// Create item request
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    /// Item name
    pub name: String,
}

/// Item wire representation
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    /// Item ID
    pub id: i64,

    /// Item name
    pub name: String,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            name: item.name,
        }
    }
}

/// List the owner's items
///
/// # Errors
///
/// - `400 Bad Request`: `assigned_only` is not `0` or `1`
pub async fn list_items(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListItemsQuery>,
) -> ApiResult<Json<Vec<ItemResponse>>> {
    let assigned_only = parse_flag(query.assigned_only.as_deref())?;

    let items = Item::list_for_owner(&state.db, current.id, assigned_only).await?;

    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// Create an item owned by the authenticated user
///
/// # Errors
///
/// - `400 Bad Request`: Name is empty after trimming
pub async fn create_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateItemRequest>,
) -> ApiResult<(StatusCode, Json<ItemResponse>)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::field_error("name", "Name must not be empty"));
    }

    let item = Item::create(&state.db, current.id, name).await?;

    Ok((StatusCode::CREATED, Json(item.into())))
}
