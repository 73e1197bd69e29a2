/// Collection model and owner-scoped operations
///
/// A collection is the aggregate entity: a titled set of items with
/// tags, an item count, a fixed-point floor price, an optional external
/// link, and an optional uploaded image. Tag and item membership is a
/// pure association (`collection_tags` / `collection_items`); the
/// associated rows keep their own single owner.
///
/// Writes that touch associations run in a transaction so a failed
/// insert never leaves a half-updated collection behind.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE collections (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     items_in_collection INTEGER NOT NULL,
///     floor_price NUMERIC(8, 2) NOT NULL,
///     link VARCHAR(255),
///     image VARCHAR(255)
/// );
/// ```

use crate::filter::{dedup_by_id, CollectionFilter};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

const COLLECTION_COLUMNS: &str =
    "id, user_id, title, items_in_collection, floor_price, link, image";

/// Collection record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Collection {
    /// Unique collection ID
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// Collection title
    pub title: String,

    /// Number of items the collection comprises
    pub items_in_collection: i32,

    /// Floor price, NUMERIC(8,2); two fractional digits are preserved
    /// exactly on read and write
    pub floor_price: Decimal,

    /// Optional external link
    pub link: Option<String>,

    /// Optional stored image reference (relative path)
    pub image: Option<String>,
}

/// Input for creating a collection
///
/// The owner is bound by the caller from the authenticated identity and
/// is never part of this input.
#[derive(Debug, Clone)]
pub struct NewCollection {
    /// Collection title
    pub title: String,

    /// Number of items
    pub items_in_collection: i32,

    /// Floor price
    pub floor_price: Decimal,

    /// Optional external link
    pub link: Option<String>,

    /// Tag ids to associate (already resolved against the owner)
    pub tag_ids: Vec<i64>,

    /// Item ids to associate (already resolved against the owner)
    pub item_ids: Vec<i64>,
}

/// Input for updating a collection
///
/// Only non-None fields are touched, which serves both partial (PATCH)
/// and full (PUT) updates: a PUT handler sets every field, using
/// `link: Some(None)` and empty id lists to clear prior state.
#[derive(Debug, Clone, Default)]
pub struct CollectionUpdate {
    /// New title
    pub title: Option<String>,

    /// New item count
    pub items_in_collection: Option<i32>,

    /// New floor price
    pub floor_price: Option<Decimal>,

    /// New link (Some(None) clears it)
    pub link: Option<Option<String>>,

    /// Replacement tag associations
    pub tag_ids: Option<Vec<i64>>,

    /// Replacement item associations
    pub item_ids: Option<Vec<i64>>,
}

impl Collection {
    /// Creates a collection with its tag/item associations
    ///
    /// Runs in a transaction: the collection row and every association
    /// row are committed together or not at all.
    pub async fn create(
        pool: &PgPool,
        owner_id: i64,
        data: NewCollection,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let collection = sqlx::query_as::<_, Collection>(&format!(
            r#"
            INSERT INTO collections (user_id, title, items_in_collection, floor_price, link)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLLECTION_COLUMNS}
            "#,
        ))
        .bind(owner_id)
        .bind(&data.title)
        .bind(data.items_in_collection)
        .bind(data.floor_price)
        .bind(&data.link)
        .fetch_one(&mut *tx)
        .await?;

        replace_tag_associations(&mut tx, collection.id, &data.tag_ids).await?;
        replace_item_associations(&mut tx, collection.id, &data.item_ids).await?;

        tx.commit().await?;

        Ok(collection)
    }

    /// Lists the owner's collections, newest id first, honoring filters
    ///
    /// Tag and item filters each join through their association table
    /// and match any of the listed ids (OR within a dimension); when
    /// both filters are present a collection must match both (AND
    /// between dimensions). Joins can duplicate rows, so the result is
    /// deduplicated by collection id afterwards.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: i64,
        filter: &CollectionFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        // Assemble the query based on which filter dimensions are set
        let mut sql = String::from(
            "SELECT c.id, c.user_id, c.title, c.items_in_collection, c.floor_price, \
             c.link, c.image FROM collections c",
        );

        if filter.tag_ids.is_some() {
            sql.push_str(" INNER JOIN collection_tags ct ON ct.collection_id = c.id");
        }
        if filter.item_ids.is_some() {
            sql.push_str(" INNER JOIN collection_items ci ON ci.collection_id = c.id");
        }

        sql.push_str(" WHERE c.user_id = $1");

        let mut bind_count = 1;
        if filter.tag_ids.is_some() {
            bind_count += 1;
            sql.push_str(&format!(" AND ct.tag_id = ANY(${})", bind_count));
        }
        if filter.item_ids.is_some() {
            bind_count += 1;
            sql.push_str(&format!(" AND ci.item_id = ANY(${})", bind_count));
        }

        sql.push_str(" ORDER BY c.id DESC");

        let mut query = sqlx::query_as::<_, Collection>(&sql).bind(owner_id);

        if let Some(ref tag_ids) = filter.tag_ids {
            query = query.bind(tag_ids.clone());
        }
        if let Some(ref item_ids) = filter.item_ids {
            query = query.bind(item_ids.clone());
        }

        let rows = query.fetch_all(pool).await?;

        Ok(dedup_by_id(rows, |c| c.id))
    }

    /// Finds one of the owner's collections by id
    ///
    /// Another owner's collection id yields `None`, indistinguishable
    /// from a nonexistent id.
    pub async fn find_for_owner(
        pool: &PgPool,
        owner_id: i64,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let collection = sqlx::query_as::<_, Collection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = $1 AND user_id = $2",
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(collection)
    }

    /// Updates one of the owner's collections
    ///
    /// Returns the updated record, or `None` when the id does not exist
    /// for this owner. Scalar fields and association replacements are
    /// committed in one transaction.
    pub async fn update_for_owner(
        pool: &PgPool,
        owner_id: i64,
        id: i64,
        data: CollectionUpdate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Build the update statement based on which fields are present
        let mut sql = String::from("UPDATE collections SET id = id");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", title = ${}", bind_count));
        }
        if data.items_in_collection.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", items_in_collection = ${}", bind_count));
        }
        if data.floor_price.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", floor_price = ${}", bind_count));
        }
        if data.link.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", link = ${}", bind_count));
        }

        sql.push_str(&format!(
            " WHERE id = $1 AND user_id = $2 RETURNING {COLLECTION_COLUMNS}",
        ));

        let mut query = sqlx::query_as::<_, Collection>(&sql).bind(id).bind(owner_id);

        if let Some(title) = data.title {
            query = query.bind(title);
        }
        if let Some(items_in_collection) = data.items_in_collection {
            query = query.bind(items_in_collection);
        }
        if let Some(floor_price) = data.floor_price {
            query = query.bind(floor_price);
        }
        if let Some(link) = data.link {
            query = query.bind(link);
        }

        let Some(collection) = query.fetch_optional(&mut *tx).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(ref tag_ids) = data.tag_ids {
            replace_tag_associations(&mut tx, collection.id, tag_ids).await?;
        }
        if let Some(ref item_ids) = data.item_ids {
            replace_item_associations(&mut tx, collection.id, item_ids).await?;
        }

        tx.commit().await?;

        Ok(Some(collection))
    }

    /// Deletes one of the owner's collections
    ///
    /// Association rows go with it via referential integrity. Returns
    /// the stored image reference (if any) so the caller can release
    /// the file, or `None` when the id does not exist for this owner.
    pub async fn delete_for_owner(
        pool: &PgPool,
        owner_id: i64,
        id: i64,
    ) -> Result<Option<Option<String>>, sqlx::Error> {
        let deleted: Option<(Option<String>,)> = sqlx::query_as(
            "DELETE FROM collections WHERE id = $1 AND user_id = $2 RETURNING image",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(deleted.map(|(image,)| image))
    }

    /// Replaces the stored image reference on one of the owner's collections
    ///
    /// Returns the updated record together with the previous reference
    /// so the caller can delete the superseded file.
    pub async fn set_image(
        pool: &PgPool,
        owner_id: i64,
        id: i64,
        reference: &str,
    ) -> Result<Option<(Self, Option<String>)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let previous: Option<(Option<String>,)> =
            sqlx::query_as("SELECT image FROM collections WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(owner_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((previous_image,)) = previous else {
            tx.rollback().await?;
            return Ok(None);
        };

        let collection = sqlx::query_as::<_, Collection>(&format!(
            "UPDATE collections SET image = $3 WHERE id = $1 AND user_id = $2 \
             RETURNING {COLLECTION_COLUMNS}",
        ))
        .bind(id)
        .bind(owner_id)
        .bind(reference)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some((collection, previous_image)))
    }

    /// Lists the associated tag ids, ascending
    pub async fn tag_ids(pool: &PgPool, collection_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT tag_id FROM collection_tags WHERE collection_id = $1 ORDER BY tag_id ASC",
        )
        .bind(collection_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Lists the associated item ids, ascending
    pub async fn item_ids(pool: &PgPool, collection_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT item_id FROM collection_items WHERE collection_id = $1 ORDER BY item_id ASC",
        )
        .bind(collection_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

/// Replaces a collection's tag associations inside a transaction
async fn replace_tag_associations(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    collection_id: i64,
    tag_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM collection_tags WHERE collection_id = $1")
        .bind(collection_id)
        .execute(&mut **tx)
        .await?;

    for tag_id in tag_ids {
        sqlx::query("INSERT INTO collection_tags (collection_id, tag_id) VALUES ($1, $2)")
            .bind(collection_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Replaces a collection's item associations inside a transaction
async fn replace_item_associations(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    collection_id: i64,
    item_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM collection_items WHERE collection_id = $1")
        .bind(collection_id)
        .execute(&mut **tx)
        .await?;

    for item_id in item_ids {
        sqlx::query("INSERT INTO collection_items (collection_id, item_id) VALUES ($1, $2)")
            .bind(collection_id)
            .bind(item_id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_floor_price_serializes_as_exact_decimal_string() {
        let collection = Collection {
            id: 1,
            user_id: 1,
            title: "Dead Avatar Project".to_string(),
            items_in_collection: 10000,
            floor_price: Decimal::from_str("0.50").unwrap(),
            link: None,
            image: None,
        };

        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["floor_price"], "0.50");
    }

    #[test]
    fn test_floor_price_roundtrip_preserves_two_decimals() {
        let price = Decimal::from_str("123456.78").unwrap();
        let encoded = serde_json::to_string(&price).unwrap();
        let decoded: Decimal = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, price);
        assert_eq!(decoded.scale(), 2);
    }

    #[test]
    fn test_collection_update_default_touches_nothing() {
        let update = CollectionUpdate::default();
        assert!(update.title.is_none());
        assert!(update.link.is_none());
        assert!(update.tag_ids.is_none());
        assert!(update.item_ids.is_none());
    }

    // Database-backed tests live in curio-api/tests/integration_test.rs
}
