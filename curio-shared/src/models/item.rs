/// Item model and owner-scoped operations
///
/// Items are the things listed inside collections; like tags they
/// belong to exactly one user and associate with collections through
/// `collection_items`.

use crate::filter::dedup_by_id;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Item record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    /// Unique item ID
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// Item name
    pub name: String,
}

impl Item {
    /// Creates a new item owned by `owner_id`
    pub async fn create(pool: &PgPool, owner_id: i64, name: &str) -> Result<Self, sqlx::Error> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (user_id, name)
            VALUES ($1, $2)
            RETURNING id, user_id, name
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .fetch_one(pool)
        .await?;

        Ok(item)
    }

    /// Lists the owner's items, name descending
    ///
    /// With `assigned_only`, restricts to items referenced by at least
    /// one collection and deduplicates by item id after the join.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: i64,
        assigned_only: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let items = if assigned_only {
            let rows = sqlx::query_as::<_, Item>(
                r#"
                SELECT i.id, i.user_id, i.name
                FROM items i
                INNER JOIN collection_items ci ON ci.item_id = i.id
                WHERE i.user_id = $1
                ORDER BY i.name DESC
                "#,
            )
            .bind(owner_id)
            .fetch_all(pool)
            .await?;

            dedup_by_id(rows, |item| item.id)
        } else {
            sqlx::query_as::<_, Item>(
                r#"
                SELECT id, user_id, name
                FROM items
                WHERE user_id = $1
                ORDER BY name DESC
                "#,
            )
            .bind(owner_id)
            .fetch_all(pool)
            .await?
        };

        Ok(items)
    }

    /// Resolves a set of item ids against the owner's items only
    pub async fn find_by_ids_for_owner(
        pool: &PgPool,
        owner_id: i64,
        ids: &[i64],
    ) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, user_id, name
            FROM items
            WHERE user_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(owner_id)
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(items)
    }

    /// Lists the items associated with a collection, name ascending
    pub async fn list_for_collection(
        pool: &PgPool,
        collection_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT i.id, i.user_id, i.name
            FROM items i
            INNER JOIN collection_items ci ON ci.item_id = i.id
            WHERE ci.collection_id = $1
            ORDER BY i.name ASC
            "#,
        )
        .bind(collection_id)
        .fetch_all(pool)
        .await?;

        Ok(items)
    }
}
