use anyhow::Result;
use serde_json::json;

use super::temp_db_path;
use crate::{db, errors::ModelError, service};

#[tokio::test]
async fn test_service_row_crud() -> Result<()> {
    let path = temp_db_path();
    let conn = db::connect_and_migrate(&path).await?;

    service::insert(&conn, "svc-1", "alice", json!({"title": "NDVI"})).await?;
    service::insert(&conn, "svc-2", "bob", json!({"title": "EVI"})).await?;

    let found = service::find(&conn, "svc-1").await?.expect("row present");
    assert_eq!(found.owner_id, "alice");
    assert_eq!(found.payload, json!({"title": "NDVI"}));

    let all = service::list(&conn, None).await?;
    assert_eq!(all.iter().map(|m| m.service_id.as_str()).collect::<Vec<_>>(), ["svc-1", "svc-2"]);
    let bobs = service::list(&conn, Some("bob")).await?;
    assert_eq!(bobs.len(), 1);

    service::update_payload(&conn, "svc-2", json!({"title": "EVI2"})).await?;
    let updated = service::find(&conn, "svc-2").await?.expect("row present");
    assert_eq!(updated.payload, json!({"title": "EVI2"}));
    assert_eq!(updated.owner_id, "bob");

    service::delete(&conn, "svc-1").await?;
    assert!(service::find(&conn, "svc-1").await?.is_none());

    conn.close().await?;
    let _ = std::fs::remove_file(&path);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_and_missing_rows() -> Result<()> {
    let path = temp_db_path();
    let conn = db::connect_and_migrate(&path).await?;

    service::insert(&conn, "dup", "alice", json!({})).await?;
    let err = service::insert(&conn, "dup", "bob", json!({})).await.unwrap_err();
    assert!(matches!(err, ModelError::Duplicate(id) if id == "dup"));

    let err = service::update_payload(&conn, "missing", json!({})).await.unwrap_err();
    assert!(matches!(err, ModelError::NotFound(_)));
    let err = service::delete(&conn, "missing").await.unwrap_err();
    assert!(matches!(err, ModelError::NotFound(_)));

    let err = service::insert(&conn, " ", "alice", json!({})).await.unwrap_err();
    assert!(matches!(err, ModelError::Validation(_)));

    conn.close().await?;
    let _ = std::fs::remove_file(&path);
    Ok(())
}

#[tokio::test]
async fn test_schema_survives_reconnect() -> Result<()> {
    let path = temp_db_path();
    let conn = db::connect_and_migrate(&path).await?;
    service::insert(&conn, "keep", "alice", json!({"a": 1})).await?;
    conn.close().await?;

    // second open re-runs migrations against an existing schema
    let conn = db::connect_and_migrate(&path).await?;
    assert!(service::find(&conn, "keep").await?.is_some());
    conn.close().await?;
    let _ = std::fs::remove_file(&path);
    Ok(())
}

#[tokio::test]
async fn test_path_with_url_characters() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("models_{}_a?b#c%20d", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("services.db");

    let conn = db::connect_and_migrate(&path).await?;
    service::insert(&conn, "svc-1", "alice", json!({})).await?;
    conn.close().await?;

    // 文件必须落在字面路径上，而不是被截断在 `?` 之前
    assert!(path.is_file());
    let reopened = db::connect(&path).await?;
    assert_eq!(service::list(&reopened, None).await?.len(), 1);
    reopened.close().await?;

    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}
