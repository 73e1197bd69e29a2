/// Tag endpoints
///
/// # Endpoints
///
/// - `GET /v1/tags?assigned_only={0|1}` - List own tags, name descending
/// - `POST /v1/tags` - Create a tag
///
/// Both require a bearer access token; results and writes are scoped to
/// the authenticated owner.

use crate::{
    app::{AppState, CurrentUser},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use curio_shared::{filter::parse_flag, models::tag::Tag};
use serde::{Deserialize, Serialize};

/// Tag list query parameters
#[derive(Debug, Deserialize)]
pub struct ListTagsQuery {
    /// `1` restricts to tags assigned to at least one collection
    pub assigned_only: Option<String>,
}

/// Create tag request
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    /// Tag name
    pub name: String,
}

/// Tag wire representation
#[derive(Debug, Serialize)]
pub struct TagResponse {
    /// Tag ID
    pub id: i64,

    /// Tag name
    pub name: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

/// List the owner's tags
///
/// # Errors
///
/// - `400 Bad Request`: `assigned_only` is not `0` or `1`
pub async fn list_tags(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListTagsQuery>,
) -> ApiResult<Json<Vec<TagResponse>>> {
    let assigned_only = parse_flag(query.assigned_only.as_deref())?;

    let tags = Tag::list_for_owner(&state.db, current.id, assigned_only).await?;

    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

/// Create a tag owned by the authenticated user
///
/// The owner is bound from the credential; it is not accepted as
/// input.
///
/// # Errors
///
/// - `400 Bad Request`: Name is empty after trimming
pub async fn create_tag(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateTagRequest>,
) -> ApiResult<(StatusCode, Json<TagResponse>)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::field_error("name", "Name must not be empty"));
    }

    let tag = Tag::create(&state.db, current.id, name).await?;

    Ok((StatusCode::CREATED, Json(tag.into())))
}
