/// Collection endpoints
///
/// Collections carry two wire forms:
/// - **Reference form** (list endpoint): `tags`/`items` as bare id
///   arrays.
/// - **Detail form** (single-collection endpoints): `tags`/`items` as
///   nested `{id, name}` objects, plus the image reference.
///
/// The upload endpoint is decoupled from both and answers with only
/// `{id, image}`.
///
/// # Endpoints
///
/// - `GET /v1/collections?tags=<id,..>&items=<id,..>` - Filtered list
/// - `POST /v1/collections` - Create (201)
/// - `GET /v1/collections/:id` - Detail
/// - `PUT /v1/collections/:id` - Full update; omitted optional fields clear
/// - `PATCH /v1/collections/:id` - Partial update
/// - `DELETE /v1/collections/:id` - Delete (204), releases the image file
/// - `POST /v1/collections/:id/upload-image` - Attach an image

use crate::{
    app::{AppState, CurrentUser},
    error::{ApiError, ApiResult},
    routes::{items::ItemResponse, tags::TagResponse},
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use curio_shared::{
    filter::CollectionFilter,
    models::{
        collection::{Collection, CollectionUpdate, NewCollection},
        item::Item,
        tag::Tag,
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Upload payloads above this size are rejected before decoding
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Request body limit for the upload route; the slack over
/// `MAX_IMAGE_BYTES` covers multipart framing
pub const MAX_UPLOAD_BODY_BYTES: usize = MAX_IMAGE_BYTES + 4096;

/// Collection list query parameters
#[derive(Debug, Deserialize)]
pub struct ListCollectionsQuery {
    /// Comma-separated tag ids; matches collections containing any
    pub tags: Option<String>,

    /// Comma-separated item ids; matches collections containing any
    pub items: Option<String>,
}

/// Create / full-update request body
///
/// There is deliberately no owner field; the owner is always the
/// authenticated user. `tags` and `items` are id lists resolved against
/// the owner's existing tags/items.
#[derive(Debug, Deserialize)]
pub struct CollectionRequest {
    /// Collection title
    pub title: String,

    /// Number of items the collection comprises
    pub items_in_collection: i32,

    /// Floor price (at most 8 digits, exactly 2 fractional preserved)
    pub floor_price: Decimal,

    /// Optional external link
    pub link: Option<String>,

    /// Tag ids to associate
    pub tags: Option<Vec<i64>>,

    /// Item ids to associate
    pub items: Option<Vec<i64>>,
}

/// Partial-update request body
///
/// Absent fields stay untouched. For `link`, an explicit `null` clears
/// the stored value while absence leaves it alone.
#[derive(Debug, Default, Deserialize)]
pub struct PatchCollectionRequest {
    /// New title
    pub title: Option<String>,

    /// New item count
    pub items_in_collection: Option<i32>,

    /// New floor price
    pub floor_price: Option<Decimal>,

    /// New link; `null` clears, absent leaves unchanged
    #[serde(default, deserialize_with = "double_option")]
    pub link: Option<Option<String>>,

    /// Replacement tag associations
    pub tags: Option<Vec<i64>>,

    /// Replacement item associations
    pub items: Option<Vec<i64>>,
}

/// Distinguishes an absent field from an explicit `null`
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Reference form: many-to-many fields as bare id lists
#[derive(Debug, Serialize)]
pub struct CollectionRefResponse {
    /// Collection ID
    pub id: i64,

    /// Collection title
    pub title: String,

    /// Number of items
    pub items_in_collection: i32,

    /// Floor price as an exact decimal string
    pub floor_price: Decimal,

    /// Optional external link
    pub link: Option<String>,

    /// Associated tag ids
    pub tags: Vec<i64>,

    /// Associated item ids
    pub items: Vec<i64>,
}

/// Detail form: many-to-many fields as nested objects
#[derive(Debug, Serialize)]
pub struct CollectionDetailResponse {
    /// Collection ID
    pub id: i64,

    /// Collection title
    pub title: String,

    /// Number of items
    pub items_in_collection: i32,

    /// Floor price as an exact decimal string
    pub floor_price: Decimal,

    /// Optional external link
    pub link: Option<String>,

    /// Stored image reference
    pub image: Option<String>,

    /// Associated tags
    pub tags: Vec<TagResponse>,

    /// Associated items
    pub items: Vec<ItemResponse>,
}

/// Upload endpoint response
#[derive(Debug, Serialize)]
pub struct CollectionImageResponse {
    /// Collection ID
    pub id: i64,

    /// Stored image reference
    pub image: Option<String>,
}

/// List the owner's collections, filtered and newest first
///
/// # Errors
///
/// - `400 Bad Request`: A filter id list fails to parse
pub async fn list_collections(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListCollectionsQuery>,
) -> ApiResult<Json<Vec<CollectionRefResponse>>> {
    let filter = CollectionFilter::from_params(query.tags.as_deref(), query.items.as_deref())?;

    let collections = Collection::list_for_owner(&state.db, current.id, &filter).await?;

    let mut responses = Vec::with_capacity(collections.len());
    for collection in collections {
        responses.push(reference_form(&state, collection).await?);
    }

    Ok(Json(responses))
}

/// Create a collection owned by the authenticated user
///
/// # Errors
///
/// - `400 Bad Request`: Empty title, malformed floor price, or tag/item
///   ids that do not belong to the owner
pub async fn create_collection(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CollectionRequest>,
) -> ApiResult<(StatusCode, Json<CollectionDetailResponse>)> {
    let title = validate_title(&req.title)?;
    validate_floor_price(req.floor_price)?;

    let tag_ids = resolve_tag_ids(&state, current.id, req.tags.as_deref().unwrap_or(&[])).await?;
    let item_ids =
        resolve_item_ids(&state, current.id, req.items.as_deref().unwrap_or(&[])).await?;

    let collection = Collection::create(
        &state.db,
        current.id,
        NewCollection {
            title: title.to_string(),
            items_in_collection: req.items_in_collection,
            floor_price: req.floor_price,
            link: req.link,
            tag_ids,
            item_ids,
        },
    )
    .await?;

    let response = detail_form(&state, collection).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Retrieve one of the owner's collections in detail form
///
/// # Errors
///
/// - `404 Not Found`: Unknown id, or a collection owned by someone else
pub async fn get_collection(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CollectionDetailResponse>> {
    let collection = Collection::find_for_owner(&state.db, current.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    Ok(Json(detail_form(&state, collection).await?))
}

/// Fully replace one of the owner's collections (PUT)
///
/// Every field takes the supplied value; omitted `link`, `tags`, and
/// `items` clear the stored link and prior associations.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `404 Not Found`: Unknown id, or a collection owned by someone else
pub async fn replace_collection(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<CollectionRequest>,
) -> ApiResult<Json<CollectionDetailResponse>> {
    let title = validate_title(&req.title)?;
    validate_floor_price(req.floor_price)?;

    let tag_ids = resolve_tag_ids(&state, current.id, req.tags.as_deref().unwrap_or(&[])).await?;
    let item_ids =
        resolve_item_ids(&state, current.id, req.items.as_deref().unwrap_or(&[])).await?;

    let collection = Collection::update_for_owner(
        &state.db,
        current.id,
        id,
        CollectionUpdate {
            title: Some(title.to_string()),
            items_in_collection: Some(req.items_in_collection),
            floor_price: Some(req.floor_price),
            link: Some(req.link),
            tag_ids: Some(tag_ids),
            item_ids: Some(item_ids),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    Ok(Json(detail_form(&state, collection).await?))
}

/// Partially update one of the owner's collections (PATCH)
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `404 Not Found`: Unknown id, or a collection owned by someone else
pub async fn patch_collection(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<PatchCollectionRequest>,
) -> ApiResult<Json<CollectionDetailResponse>> {
    let title = match req.title {
        Some(ref title) => Some(validate_title(title)?.to_string()),
        None => None,
    };
    if let Some(floor_price) = req.floor_price {
        validate_floor_price(floor_price)?;
    }

    let tag_ids = match req.tags {
        Some(ref ids) => Some(resolve_tag_ids(&state, current.id, ids).await?),
        None => None,
    };
    let item_ids = match req.items {
        Some(ref ids) => Some(resolve_item_ids(&state, current.id, ids).await?),
        None => None,
    };

    let collection = Collection::update_for_owner(
        &state.db,
        current.id,
        id,
        CollectionUpdate {
            title,
            items_in_collection: req.items_in_collection,
            floor_price: req.floor_price,
            link: req.link,
            tag_ids,
            item_ids,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    Ok(Json(detail_form(&state, collection).await?))
}

/// Delete one of the owner's collections
///
/// On success the stored image file (if any) is released from storage.
///
/// # Errors
///
/// - `404 Not Found`: Unknown id, or a collection owned by someone else
pub async fn delete_collection(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let image = Collection::delete_for_owner(&state.db, current.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    if let Some(reference) = image {
        // The row is already gone; a failed file cleanup is logged, not
        // surfaced to the caller.
        if let Err(e) = state.images.delete(&reference) {
            warn!(reference = %reference, error = %e, "Failed to delete collection image file");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Attach an uploaded image to one of the owner's collections
///
/// The multipart `image` field must decode as an image; otherwise the
/// request fails with a validation error and neither the row nor the
/// filesystem is mutated. A previously stored file is deleted after the
/// replacement is persisted.
///
/// # Errors
///
/// - `400 Bad Request`: Missing, oversized, or undecodable payload
/// - `404 Not Found`: Unknown id, or a collection owned by someone else
pub async fn upload_collection_image(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<Json<CollectionImageResponse>> {
    // Existence check up front so a bad payload against a foreign
    // collection still reads as 404, not 400
    Collection::find_for_owner(&state.db, current.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    let mut payload: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart payload: {}", e)))?
    {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("invalid image field: {}", e)))?;

            if bytes.len() > MAX_IMAGE_BYTES {
                return Err(ApiError::field_error(
                    "image",
                    format!("image exceeds max size of {} bytes", MAX_IMAGE_BYTES),
                ));
            }

            payload = Some(bytes.to_vec());
        }
    }

    let payload = payload.ok_or_else(|| ApiError::field_error("image", "No image provided"))?;

    let collection = attach_image(&state.images, &state.db, current.id, id, &payload).await?;

    Ok(Json(CollectionImageResponse {
        id: collection.id,
        image: collection.image,
    }))
}

/// Stores a validated payload and persists its reference
///
/// The file write happens first, so every path that fails to persist
/// the reference (concurrent delete, store failure) must release the
/// freshly written file before returning.
async fn attach_image(
    images: &curio_shared::storage::ImageStore,
    db: &sqlx::PgPool,
    owner_id: i64,
    id: i64,
    payload: &[u8],
) -> Result<Collection, ApiError> {
    // Validates by decoding; rejects before anything is written
    let reference = images.save_collection_image(payload)?;

    let updated = match Collection::set_image(db, owner_id, id, &reference).await {
        Ok(updated) => updated,
        Err(e) => {
            discard_image(images, &reference);
            return Err(e.into());
        }
    };

    let Some((collection, previous)) = updated else {
        // Deleted concurrently after the existence check
        discard_image(images, &reference);
        return Err(ApiError::NotFound("Collection not found".to_string()));
    };

    if let Some(previous_reference) = previous {
        if let Err(e) = images.delete(&previous_reference) {
            warn!(
                reference = %previous_reference,
                error = %e,
                "Failed to delete replaced image file"
            );
        }
    }

    Ok(collection)
}

/// Releases a stored file whose reference never reached the database
fn discard_image(images: &curio_shared::storage::ImageStore, reference: &str) {
    if let Err(e) = images.delete(reference) {
        warn!(reference = %reference, error = %e, "Failed to delete orphaned image file");
    }
}

/// Rejects empty titles, returning the trimmed value
fn validate_title(title: &str) -> Result<&str, ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::field_error("title", "Title must not be empty"));
    }
    Ok(trimmed)
}

/// Enforces the NUMERIC(8,2) shape before the value reaches the store
///
/// More than two fractional digits would be silently rounded by the
/// database; that is a validation error here instead.
fn validate_floor_price(price: Decimal) -> Result<(), ApiError> {
    if price.round_dp(2) != price {
        return Err(ApiError::field_error(
            "floor_price",
            "Floor price must have at most two decimal places",
        ));
    }

    if price.abs() >= Decimal::from(1_000_000) {
        return Err(ApiError::field_error(
            "floor_price",
            "Floor price must have at most eight digits",
        ));
    }

    Ok(())
}

/// Resolves tag ids against the owner's tags only
///
/// Ids that do not exist, or belong to another owner, fail validation
/// for the `tags` field. Duplicate ids in the input are collapsed.
async fn resolve_tag_ids(
    state: &AppState,
    owner_id: i64,
    ids: &[i64],
) -> Result<Vec<i64>, ApiError> {
    let requested: HashSet<i64> = ids.iter().copied().collect();
    let found = Tag::find_by_ids_for_owner(&state.db, owner_id, ids).await?;

    if found.len() != requested.len() {
        return Err(ApiError::field_error(
            "tags",
            "One or more tag ids are invalid",
        ));
    }

    Ok(found.into_iter().map(|tag| tag.id).collect())
}

/// Resolves item ids against the owner's items only
async fn resolve_item_ids(
    state: &AppState,
    owner_id: i64,
    ids: &[i64],
) -> Result<Vec<i64>, ApiError> {
    let requested: HashSet<i64> = ids.iter().copied().collect();
    let found = Item::find_by_ids_for_owner(&state.db, owner_id, ids).await?;

    if found.len() != requested.len() {
        return Err(ApiError::field_error(
            "items",
            "One or more item ids are invalid",
        ));
    }

    Ok(found.into_iter().map(|item| item.id).collect())
}

/// Builds the reference form for a collection
async fn reference_form(
    state: &AppState,
    collection: Collection,
) -> Result<CollectionRefResponse, ApiError> {
    let tags = Collection::tag_ids(&state.db, collection.id).await?;
    let items = Collection::item_ids(&state.db, collection.id).await?;

    Ok(CollectionRefResponse {
        id: collection.id,
        title: collection.title,
        items_in_collection: collection.items_in_collection,
        floor_price: collection.floor_price,
        link: collection.link,
        tags,
        items,
    })
}

/// Builds the detail form for a collection
async fn detail_form(
    state: &AppState,
    collection: Collection,
) -> Result<CollectionDetailResponse, ApiError> {
    let tags = Tag::list_for_collection(&state.db, collection.id).await?;
    let items = Item::list_for_collection(&state.db, collection.id).await?;

    Ok(CollectionDetailResponse {
        id: collection.id,
        title: collection.title,
        items_in_collection: collection.items_in_collection,
        floor_price: collection.floor_price,
        link: collection.link,
        image: collection.image,
        tags: tags.into_iter().map(TagResponse::from).collect(),
        items: items.into_iter().map(ItemResponse::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title("  bayc  ").unwrap(), "bayc");
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
    }

    #[test]
    fn test_validate_floor_price_accepts_two_decimals() {
        assert!(validate_floor_price(Decimal::from_str("0.50").unwrap()).is_ok());
        assert!(validate_floor_price(Decimal::from_str("999999.99").unwrap()).is_ok());
        assert!(validate_floor_price(Decimal::from_str("10").unwrap()).is_ok());
    }

    #[test]
    fn test_validate_floor_price_rejects_overlong_fraction() {
        assert!(validate_floor_price(Decimal::from_str("0.505").unwrap()).is_err());
    }

    #[test]
    fn test_validate_floor_price_rejects_too_many_digits() {
        assert!(validate_floor_price(Decimal::from_str("1000000.00").unwrap()).is_err());
    }

    #[tokio::test]
    async fn test_failed_attach_releases_stored_file() {
        use curio_shared::storage::ImageStore;
        use std::time::Duration;

        let root = std::env::temp_dir().join(format!("curio-attach-test-{}", uuid::Uuid::new_v4()));
        let images = ImageStore::new(&root);

        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(100))
            .connect_lazy("postgresql://127.0.0.1:1/unreachable")
            .unwrap();

        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]));
        let mut cursor = std::io::Cursor::new(Vec::new());
        img.write_to(&mut cursor, image::ImageOutputFormat::Png)
            .unwrap();

        let err = attach_image(&images, &pool, 1, 1, &cursor.into_inner())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InternalError(_)));

        // The file written before the store failure must be gone
        let upload_dir = root.join("uploads/collection");
        let leftover = std::fs::read_dir(&upload_dir)
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftover, 0);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_patch_link_distinguishes_null_from_absent() {
        let absent: PatchCollectionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.link, None);

        let null: PatchCollectionRequest = serde_json::from_str(r#"{"link": null}"#).unwrap();
        assert_eq!(null.link, Some(None));

        let set: PatchCollectionRequest =
            serde_json::from_str(r#"{"link": "https://example.com"}"#).unwrap();
        assert_eq!(set.link, Some(Some("https://example.com".to_string())));
    }
}
