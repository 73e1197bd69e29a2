/// Tag model and owner-scoped operations
///
/// Tags label collections and belong to exactly one user. The
/// collection association is many-to-many through `collection_tags`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tags (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL
/// );
/// ```

use crate::filter::dedup_by_id;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Tag record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    /// Unique tag ID
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// Tag name
    pub name: String,
}

impl Tag {
    /// Creates a new tag owned by `owner_id`
    pub async fn create(pool: &PgPool, owner_id: i64, name: &str) -> Result<Self, sqlx::Error> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (user_id, name)
            VALUES ($1, $2)
            RETURNING id, user_id, name
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .fetch_one(pool)
        .await?;

        Ok(tag)
    }

    /// Lists the owner's tags, name descending
    ///
    /// With `assigned_only`, restricts to tags that are a member of at
    /// least one collection. Membership in *any* collection qualifies,
    /// regardless of that collection's owner; the tag itself is still
    /// owner-scoped. The join yields one row per association, so the
    /// result is deduplicated by tag id afterwards.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: i64,
        assigned_only: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tags = if assigned_only {
            let rows = sqlx::query_as::<_, Tag>(
                r#"
                SELECT t.id, t.user_id, t.name
                FROM tags t
                INNER JOIN collection_tags ct ON ct.tag_id = t.id
                WHERE t.user_id = $1
                ORDER BY t.name DESC
                "#,
            )
            .bind(owner_id)
            .fetch_all(pool)
            .await?;

            dedup_by_id(rows, |tag| tag.id)
        } else {
            sqlx::query_as::<_, Tag>(
                r#"
                SELECT id, user_id, name
                FROM tags
                WHERE user_id = $1
                ORDER BY name DESC
                "#,
            )
            .bind(owner_id)
            .fetch_all(pool)
            .await?
        };

        Ok(tags)
    }

    /// Resolves a set of tag ids against the owner's tags only
    ///
    /// Returns the matching tags; ids that do not exist or belong to
    /// another owner are simply absent from the result. Callers compare
    /// the result against the requested set to reject foreign ids.
    pub async fn find_by_ids_for_owner(
        pool: &PgPool,
        owner_id: i64,
        ids: &[i64],
    ) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT id, user_id, name
            FROM tags
            WHERE user_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(owner_id)
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    /// Lists the tags associated with a collection, name ascending
    pub async fn list_for_collection(
        pool: &PgPool,
        collection_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.user_id, t.name
            FROM tags t
            INNER JOIN collection_tags ct ON ct.tag_id = t.id
            WHERE ct.collection_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(collection_id)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_serializes_without_surprises() {
        let tag = Tag {
            id: 7,
            user_id: 1,
            name: "Pins".to_string(),
        };

        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["name"], "Pins");
    }

    // Database-backed tests live in curio-api/tests/integration_test.rs
}
