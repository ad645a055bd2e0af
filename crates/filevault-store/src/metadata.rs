//! SQLite implementation of IMetadataStore
//!
//! ## Type Mapping
//!
//! | Domain Type          | SQL Type | Strategy                                  |
//! |----------------------|----------|-------------------------------------------|
//! | ItemId, StorageKey   | TEXT     | `.as_str()` / `::new()`                   |
//! | UserId               | TEXT     | `.as_str()`                               |
//! | ItemKind             | TEXT     | `"file"` / `"folder"`                     |
//! | SyncPath             | TEXT     | `.to_string()` / `SyncPath::from_str()`   |
//! | DateTime<Utc>        | TEXT     | `to_rfc3339()` / `parse_from_rfc3339()`   |
//! | u64 size             | INTEGER  | cast through `i64`                        |

use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument, trace};

use filevault_core::domain::{ItemId, ItemKind, NewItem, RemoteItem, StorageKey, SyncPath};
use filevault_core::ports::IMetadataStore;

use crate::{parse_optional_datetime, StoreError};

const ITEM_COLUMNS: &str =
    "id, parent_id, kind, name, storage_key, local_path, size, last_modified";

/// SQLite-backed remote item tree
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn remote_item_from_row(row: &SqliteRow) -> Result<RemoteItem, StoreError> {
    let id: String = row.get("id");
    let parent_id: Option<String> = row.get("parent_id");
    let kind: String = row.get("kind");
    let name: String = row.get("name");
    let storage_key: Option<String> = row.get("storage_key");
    let local_path: Option<String> = row.get("local_path");
    let size: Option<i64> = row.get("size");
    let last_modified: Option<String> = row.get("last_modified");

    let kind = ItemKind::from_str(&kind)?;
    let local_path = match local_path {
        Some(p) if !p.is_empty() => Some(SyncPath::from_str(&p)?),
        _ => None,
    };

    Ok(RemoteItem {
        id: ItemId::new(id)?,
        parent_id: parent_id.map(ItemId::new).transpose()?,
        kind,
        name,
        storage_key: storage_key.map(StorageKey::new).transpose()?,
        local_path,
        size: size.map(|s| s as u64),
        last_modified: parse_optional_datetime(last_modified)?,
    })
}

#[async_trait::async_trait]
impl IMetadataStore for SqliteMetadataStore {
    #[instrument(skip(self, item), fields(name = %item.name, kind = %item.kind))]
    async fn create_item(&self, item: NewItem) -> anyhow::Result<ItemId> {
        sqlx::query(
            "INSERT INTO items \
             (id, parent_id, owner, kind, name, storage_key, local_path, size, \
              last_modified, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(item.id.as_str())
        .bind(item.parent_id.as_ref().map(|p| p.as_str()))
        .bind(item.owner.as_str())
        .bind(item.kind.as_str())
        .bind(&item.name)
        .bind(item.storage_key.as_ref().map(|k| k.as_str()))
        .bind(item.local_path.as_ref().map(|p| p.to_string()))
        .bind(item.size.map(|s| s as i64))
        .bind(item.last_modified.map(|dt| dt.to_rfc3339()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        trace!(item_id = %item.id, "Created item");
        Ok(item.id)
    }

    async fn get_item(&self, id: &ItemId) -> anyhow::Result<Option<RemoteItem>> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        match row {
            Some(ref r) => Ok(Some(remote_item_from_row(r)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(parent = %parent))]
    async fn list_items(
        &self,
        parent: &ItemId,
        recursive: bool,
    ) -> anyhow::Result<Vec<RemoteItem>> {
        let sql = if recursive {
            format!(
                "WITH RECURSIVE tree(id) AS ( \
                     SELECT id FROM items WHERE parent_id = ? \
                     UNION ALL \
                     SELECT i.id FROM items i JOIN tree t ON i.parent_id = t.id \
                 ) \
                 SELECT {ITEM_COLUMNS} FROM items WHERE id IN (SELECT id FROM tree) \
                 ORDER BY local_path, name"
            )
        } else {
            format!(
                "SELECT {ITEM_COLUMNS} FROM items WHERE parent_id = ? ORDER BY local_path, name"
            )
        };

        let rows = sqlx::query(&sql)
            .bind(parent.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;

        let items = rows
            .iter()
            .map(remote_item_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = items.len(), recursive, "Listed items");
        Ok(items)
    }

    async fn delete_item(&self, id: &ItemId) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

        trace!(item_id = %id, deleted = result.rows_affected(), "Deleted item");
        Ok(())
    }
}
