//! Storage resource queries

use std::collections::BTreeMap;

use appcatalog_core::{
    ensure_id, now_millis, DataMovementInterface, Error, Result, StorageResourceDescription,
};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use super::DbResultExt;
use crate::models::{DataMovementInterfaceRow, StorageResourceRow};

async fn save_storage_resource(
    conn: &mut SqliteConnection,
    id: &str,
    desc: &StorageResourceDescription,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO storage_resources (
            storage_resource_id, host_name, storage_resource_description, enabled,
            creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(storage_resource_id) DO UPDATE SET
            host_name = excluded.host_name,
            storage_resource_description = excluded.storage_resource_description,
            enabled = excluded.enabled,
            update_time = excluded.update_time
        "#,
    )
    .bind(id)
    .bind(&desc.host_name)
    .bind(&desc.storage_resource_description)
    .bind(desc.enabled)
    .bind(desc.creation_time.unwrap_or(now))
    .bind(now)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save storage resource")?;

    sqlx::query("DELETE FROM storage_interfaces WHERE storage_resource_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .db_context("Failed to clear storage interfaces")?;

    for dmi in &desc.data_movement_interfaces {
        insert_storage_interface(&mut *conn, id, dmi, now).await?;
    }
    Ok(())
}

async fn insert_storage_interface(
    conn: &mut SqliteConnection,
    storage_id: &str,
    dmi: &DataMovementInterface,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO storage_interfaces (
            storage_resource_id, data_movement_interface_id, data_movement_protocol,
            priority_order, creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(storage_id)
    .bind(&dmi.data_movement_interface_id)
    .bind(dmi.data_movement_protocol.as_str())
    .bind(dmi.priority_order)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save storage interface")?;
    Ok(())
}

#[instrument(skip(pool, desc), fields(host = %desc.host_name))]
pub async fn add_storage_resource(pool: &Pool<Sqlite>, desc: &StorageResourceDescription) -> Result<String> {
    if desc.host_name.trim().is_empty() {
        return Err(Error::ValidationError(
            "Storage resource host name cannot be empty".to_string(),
        ));
    }
    let id = ensure_id(&desc.storage_resource_id, &desc.host_name);

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_storage_resource(&mut tx, &id, desc, now_millis()).await?;
    tx.commit().await.db_context("Failed to commit storage resource")?;

    info!(storage_resource_id = %id, "Storage resource added");
    Ok(id)
}

#[instrument(skip(pool, desc))]
pub async fn update_storage_resource(
    pool: &Pool<Sqlite>,
    id: &str,
    desc: &StorageResourceDescription,
) -> Result<()> {
    if !is_storage_resource_exists(pool, id).await? {
        return Err(Error::not_found("Storage resource", id));
    }
    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_storage_resource(&mut tx, id, desc, now_millis()).await?;
    tx.commit().await.db_context("Failed to commit storage resource")?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_storage_resource(pool: &Pool<Sqlite>, id: &str) -> Result<StorageResourceDescription> {
    let row = sqlx::query_as::<_, StorageResourceRow>(
        r#"
        SELECT storage_resource_id, host_name, storage_resource_description, enabled,
               creation_time, update_time
        FROM storage_resources
        WHERE storage_resource_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get storage resource")?
    .ok_or_else(|| Error::not_found("Storage resource", id))?;

    let mut desc = row.into_description();
    desc.data_movement_interfaces = sqlx::query_as::<_, DataMovementInterfaceRow>(
        r#"
        SELECT data_movement_interface_id, data_movement_protocol, priority_order
        FROM storage_interfaces
        WHERE storage_resource_id = ?
        ORDER BY priority_order, data_movement_interface_id
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get storage interfaces")?
    .into_iter()
    .map(DataMovementInterfaceRow::into_interface)
    .collect::<Result<Vec<_>>>()?;

    Ok(desc)
}

#[instrument(skip(pool))]
pub async fn list_storage_resources(pool: &Pool<Sqlite>) -> Result<Vec<StorageResourceDescription>> {
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT storage_resource_id FROM storage_resources ORDER BY host_name")
            .fetch_all(pool)
            .await
            .db_context("Failed to list storage resources")?;

    let mut resources = Vec::with_capacity(ids.len());
    for id in ids {
        resources.push(get_storage_resource(pool, &id).await?);
    }
    Ok(resources)
}

/// Map of storage resource id to host name
#[instrument(skip(pool))]
pub async fn get_all_storage_resource_id_names(pool: &Pool<Sqlite>) -> Result<BTreeMap<String, String>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT storage_resource_id, host_name FROM storage_resources")
            .fetch_all(pool)
            .await
            .db_context("Failed to list storage resource names")?;
    Ok(rows.into_iter().collect())
}

#[instrument(skip(pool))]
pub async fn is_storage_resource_exists(pool: &Pool<Sqlite>, id: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM storage_resources WHERE storage_resource_id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .db_context("Failed to check storage resource")?;
    Ok(count > 0)
}

#[instrument(skip(pool))]
pub async fn remove_storage_resource(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM storage_resources WHERE storage_resource_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .db_context("Failed to delete storage resource")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Storage resource", id));
    }
    info!(storage_resource_id = %id, "Storage resource removed");
    Ok(())
}

/// Attach a data movement interface to a storage resource
#[instrument(skip(pool, dmi))]
pub async fn add_storage_data_movement_interface(
    pool: &Pool<Sqlite>,
    storage_id: &str,
    dmi: &DataMovementInterface,
) -> Result<String> {
    if !is_storage_resource_exists(pool, storage_id).await? {
        return Err(Error::not_found("Storage resource", storage_id));
    }
    let mut conn = pool.acquire().await.db_context("Failed to acquire connection")?;
    insert_storage_interface(&mut conn, storage_id, dmi, now_millis()).await?;
    Ok(dmi.data_movement_interface_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use appcatalog_core::DataMovementProtocol;

    #[tokio::test]
    async fn test_storage_lifecycle() {
        let pool = test_pool().await;
        let mut desc = StorageResourceDescription::new("data.seagrid.org");
        desc.data_movement_interfaces.push(DataMovementInterface {
            data_movement_interface_id: "scp-storage".to_string(),
            data_movement_protocol: DataMovementProtocol::Scp,
            priority_order: 0,
        });

        let id = add_storage_resource(&pool, &desc).await.unwrap();
        let stored = get_storage_resource(&pool, &id).await.unwrap();
        assert_eq!(stored.host_name, "data.seagrid.org");
        assert_eq!(stored.data_movement_interfaces, desc.data_movement_interfaces);

        add_storage_data_movement_interface(
            &pool,
            &id,
            &DataMovementInterface {
                data_movement_interface_id: "gridftp-storage".to_string(),
                data_movement_protocol: DataMovementProtocol::GridFtp,
                priority_order: 1,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            get_storage_resource(&pool, &id).await.unwrap().data_movement_interfaces.len(),
            2
        );

        let mut changed = stored.clone();
        changed.enabled = false;
        changed.data_movement_interfaces.clear();
        update_storage_resource(&pool, &id, &changed).await.unwrap();
        let stored = get_storage_resource(&pool, &id).await.unwrap();
        assert!(!stored.enabled);
        assert!(stored.data_movement_interfaces.is_empty());

        let names = get_all_storage_resource_id_names(&pool).await.unwrap();
        assert_eq!(names.len(), 1);

        remove_storage_resource(&pool, &id).await.unwrap();
        assert!(!is_storage_resource_exists(&pool, &id).await.unwrap());
    }

    fn interface(id: &str, protocol: DataMovementProtocol, priority_order: i32) -> DataMovementInterface {
        DataMovementInterface {
            data_movement_interface_id: id.to_string(),
            data_movement_protocol: protocol,
            priority_order,
        }
    }

    #[tokio::test]
    async fn test_update_replaces_interfaces() {
        let pool = test_pool().await;
        let mut desc = StorageResourceDescription::new("data.seagrid.org");
        desc.data_movement_interfaces = vec![
            interface("scp-1", DataMovementProtocol::Scp, 0),
            interface("gridftp-1", DataMovementProtocol::GridFtp, 1),
        ];
        let id = add_storage_resource(&pool, &desc).await.unwrap();

        let mut changed = get_storage_resource(&pool, &id).await.unwrap();
        changed.storage_resource_description = Some("moved to new array".to_string());
        changed.data_movement_interfaces = vec![interface("local-1", DataMovementProtocol::Local, 0)];
        update_storage_resource(&pool, &id, &changed).await.unwrap();

        let stored = get_storage_resource(&pool, &id).await.unwrap();
        assert_eq!(stored.storage_resource_description.as_deref(), Some("moved to new array"));
        assert_eq!(stored.data_movement_interfaces, changed.data_movement_interfaces);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM storage_interfaces WHERE storage_resource_id = ?")
            .bind(&id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_attach_interface_to_existing_resource() {
        let pool = test_pool().await;
        let id = add_storage_resource(&pool, &StorageResourceDescription::new("archive.iu.edu"))
            .await
            .unwrap();
        assert!(get_storage_resource(&pool, &id)
            .await
            .unwrap()
            .data_movement_interfaces
            .is_empty());

        let dmi = interface("sftp-archive", DataMovementProtocol::Sftp, 2);
        let dmi_id = add_storage_data_movement_interface(&pool, &id, &dmi).await.unwrap();
        assert_eq!(dmi_id, "sftp-archive");

        let stored = get_storage_resource(&pool, &id).await.unwrap();
        assert_eq!(stored.data_movement_interfaces, vec![dmi]);
    }

    #[tokio::test]
    async fn test_missing_storage_resource() {
        let pool = test_pool().await;
        let desc = StorageResourceDescription::new("ghost.example.org");

        let err = get_storage_resource(&pool, "ghost").await.unwrap_err();
        assert!(err.is_not_found());
        let err = update_storage_resource(&pool, "ghost", &desc).await.unwrap_err();
        assert!(err.is_not_found());
        let err = remove_storage_resource(&pool, "ghost").await.unwrap_err();
        assert!(err.is_not_found());
        let err = add_storage_data_movement_interface(
            &pool,
            "ghost",
            &interface("scp-ghost", DataMovementProtocol::Scp, 0),
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());

        assert!(list_storage_resources(&pool).await.unwrap().is_empty());
    }
}
