use sea_orm::{entity::prelude::*, sea_query::Expr, DatabaseConnection, QueryFilter, QueryOrder, Set, SqlErr};
use serde::{Deserialize, Serialize};

use crate::errors;

/// Row of the `services` table. `payload` is stored as JSON text.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub service_id: String,
    pub owner_id: String,
    pub payload: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_id(field: &str, value: &str) -> Result<(), errors::ModelError> {
    if value.trim().is_empty() {
        return Err(errors::ModelError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Insert a new row. A primary-key collision is reported as `Duplicate`.
pub async fn insert(
    db: &DatabaseConnection,
    service_id: &str,
    owner_id: &str,
    payload: Json,
) -> Result<(), errors::ModelError> {
    validate_id("service_id", service_id)?;
    let am = ActiveModel {
        service_id: Set(service_id.to_string()),
        owner_id: Set(owner_id.to_string()),
        payload: Set(payload),
    };
    match Entity::insert(am).exec_without_returning(db).await {
        Ok(_) => Ok(()),
        Err(e) => match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                Err(errors::ModelError::Duplicate(service_id.to_string()))
            }
            _ => Err(errors::ModelError::Db(e.to_string())),
        },
    }
}

pub async fn find(db: &DatabaseConnection, service_id: &str) -> Result<Option<Model>, errors::ModelError> {
    Ok(Entity::find_by_id(service_id.to_string()).one(db).await?)
}

/// All rows ordered by `service_id`, optionally restricted to one owner.
pub async fn list(db: &DatabaseConnection, owner_id: Option<&str>) -> Result<Vec<Model>, errors::ModelError> {
    let mut query = Entity::find().order_by_asc(Column::ServiceId);
    if let Some(owner) = owner_id {
        query = query.filter(Column::OwnerId.eq(owner.to_string()));
    }
    Ok(query.all(db).await?)
}

/// Overwrite the payload of an existing row; `NotFound` when no row matched.
pub async fn update_payload(
    db: &DatabaseConnection,
    service_id: &str,
    payload: Json,
) -> Result<(), errors::ModelError> {
    let res = Entity::update_many()
        .col_expr(Column::Payload, Expr::value(payload))
        .filter(Column::ServiceId.eq(service_id.to_string()))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(errors::ModelError::NotFound(service_id.to_string()));
    }
    Ok(())
}

/// Delete a row; `NotFound` when no row matched.
pub async fn delete(db: &DatabaseConnection, service_id: &str) -> Result<(), errors::ModelError> {
    let res = Entity::delete_by_id(service_id.to_string()).exec(db).await?;
    if res.rows_affected == 0 {
        return Err(errors::ModelError::NotFound(service_id.to_string()));
    }
    Ok(())
}
