//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `CitizenStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citizen_registry_core::domain::{
    Citizen, CitizenPatch, CitizenQuery, NewCitizen, Photo, UpdatedCitizen, Visit,
};
use citizen_registry_core::ports::{CitizenStore, PortError, PortResult};
use citizen_registry_core::validation;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Column list shared by every query that materialises a full `CitizenRecord`.
macro_rules! citizen_columns {
    () => {
        "id, name, phone_number, father_name, age, address, national_id_number, purpose, \
         state, photo_stored_file_name, photo_original_file_name, photo_captured_at, \
         created_at, updated_at"
    };
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `CitizenStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CitizenRecord {
    id: Uuid,
    name: String,
    phone_number: String,
    father_name: String,
    age: i32,
    address: String,
    national_id_number: String,
    purpose: String,
    state: String,
    photo_stored_file_name: Option<String>,
    photo_original_file_name: Option<String>,
    photo_captured_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl CitizenRecord {
    fn to_domain(self) -> Citizen {
        // A photo only exists when its stored file name does.
        let photo = self.photo_stored_file_name.map(|stored_file_name| Photo {
            original_file_name: self
                .photo_original_file_name
                .unwrap_or_else(|| stored_file_name.clone()),
            captured_at: self.photo_captured_at.unwrap_or(self.created_at),
            stored_file_name,
        });
        Citizen {
            id: self.id,
            name: self.name,
            phone_number: self.phone_number,
            father_name: self.father_name,
            age: self.age,
            address: self.address,
            national_id_number: self.national_id_number,
            purpose: self.purpose,
            state: self.state,
            photo,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct VisitRecord {
    id: Uuid,
    name: String,
    purpose: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl VisitRecord {
    fn to_domain(self) -> Visit {
        Visit {
            id: self.id,
            name: self.name,
            purpose: self.purpose,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Maps a sqlx error onto the port error space.
///
/// CHECK violations (SQLSTATE 23514) mean a row slipped past the core rules and are
/// reported as validation failures; everything else is unexpected.
fn port_error(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23514") {
            return PortError::Validation(db_err.message().to_string());
        }
    }
    PortError::Unexpected(e.to_string())
}

fn not_found(id: Uuid) -> PortError {
    PortError::NotFound(format!("Citizen {} not found", id))
}

//=========================================================================================
// `CitizenStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CitizenStore for DbAdapter {
    async fn insert(&self, new: NewCitizen) -> PortResult<Citizen> {
        let citizen = Citizen::register(new, Utc::now())?;
        let photo = citizen.photo.as_ref();

        let record = sqlx::query_as::<_, CitizenRecord>(concat!(
            "INSERT INTO citizens (",
            citizen_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) RETURNING ",
            citizen_columns!()
        ))
        .bind(citizen.id)
        .bind(&citizen.name)
        .bind(&citizen.phone_number)
        .bind(&citizen.father_name)
        .bind(citizen.age)
        .bind(&citizen.address)
        .bind(&citizen.national_id_number)
        .bind(&citizen.purpose)
        .bind(&citizen.state)
        .bind(photo.map(|p| p.stored_file_name.clone()))
        .bind(photo.map(|p| p.original_file_name.clone()))
        .bind(photo.map(|p| p.captured_at))
        .bind(citizen.created_at)
        .bind(citizen.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;

        Ok(record.to_domain())
    }

    async fn find_all(&self) -> PortResult<Vec<Citizen>> {
        let records = sqlx::query_as::<_, CitizenRecord>(concat!(
            "SELECT ",
            citizen_columns!(),
            " FROM citizens ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> PortResult<Citizen> {
        let record = sqlx::query_as::<_, CitizenRecord>(concat!(
            "SELECT ",
            citizen_columns!(),
            " FROM citizens WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .ok_or_else(|| not_found(id))?;

        Ok(record.to_domain())
    }

    async fn find_by_query(&self, query: CitizenQuery) -> PortResult<Vec<Citizen>> {
        let query = query.normalized();

        // strpos keeps user input literal: no pattern characters to escape.
        let records = sqlx::query_as::<_, CitizenRecord>(concat!(
            "SELECT ",
            citizen_columns!(),
            " FROM citizens \
             WHERE ($1::text IS NULL OR strpos(lower(name), lower($1)) > 0) \
               AND ($2::text IS NULL OR national_id_number = $2) \
               AND ($3::text IS NULL OR phone_number = $3) \
               AND ($4::text IS NULL OR strpos(lower(state), lower($4)) > 0) \
             ORDER BY created_at DESC"
        ))
        .bind(query.name)
        .bind(query.national_id_number)
        .bind(query.phone_number)
        .bind(query.state)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_by_national_id(&self, national_id: &str) -> PortResult<Vec<Citizen>> {
        validation::require_national_id(national_id)?;

        let records = sqlx::query_as::<_, CitizenRecord>(concat!(
            "SELECT ",
            citizen_columns!(),
            " FROM citizens WHERE national_id_number = $1 ORDER BY created_at DESC"
        ))
        .bind(national_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_visit_history(&self, national_id: &str) -> PortResult<Vec<Visit>> {
        validation::require_national_id(national_id)?;

        let records = sqlx::query_as::<_, VisitRecord>(
            "SELECT id, name, purpose, created_at, updated_at FROM citizens \
             WHERE national_id_number = $1 ORDER BY created_at DESC",
        )
        .bind(national_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_by_id(&self, id: Uuid, patch: CitizenPatch) -> PortResult<UpdatedCitizen> {
        let mut tx = self.pool.begin().await.map_err(port_error)?;

        let record = sqlx::query_as::<_, CitizenRecord>(concat!(
            "SELECT ",
            citizen_columns!(),
            " FROM citizens WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(port_error)?
        .ok_or_else(|| not_found(id))?;

        let mut citizen = record.to_domain();
        let replaced_photo = citizen.apply_patch(patch, Utc::now())?;
        let photo = citizen.photo.as_ref();

        let updated = sqlx::query_as::<_, CitizenRecord>(concat!(
            "UPDATE citizens SET name = $2, phone_number = $3, father_name = $4, age = $5, \
             address = $6, national_id_number = $7, purpose = $8, state = $9, \
             photo_stored_file_name = $10, photo_original_file_name = $11, \
             photo_captured_at = $12, updated_at = $13 \
             WHERE id = $1 RETURNING ",
            citizen_columns!()
        ))
        .bind(citizen.id)
        .bind(&citizen.name)
        .bind(&citizen.phone_number)
        .bind(&citizen.father_name)
        .bind(citizen.age)
        .bind(&citizen.address)
        .bind(&citizen.national_id_number)
        .bind(&citizen.purpose)
        .bind(&citizen.state)
        .bind(photo.map(|p| p.stored_file_name.clone()))
        .bind(photo.map(|p| p.original_file_name.clone()))
        .bind(photo.map(|p| p.captured_at))
        .bind(citizen.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(port_error)?;

        tx.commit().await.map_err(port_error)?;
        Ok(UpdatedCitizen {
            citizen: updated.to_domain(),
            replaced_photo,
        })
    }

    async fn delete_by_id(&self, id: Uuid) -> PortResult<Citizen> {
        let record = sqlx::query_as::<_, CitizenRecord>(concat!(
            "DELETE FROM citizens WHERE id = $1 RETURNING ",
            citizen_columns!()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .ok_or_else(|| not_found(id))?;

        Ok(record.to_domain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    async fn check_violation_maps_to_validation(pool: PgPool) {
        let err = sqlx::query(
            "INSERT INTO citizens (id, name, phone_number, father_name, age, address, \
             national_id_number, purpose, state) \
             VALUES ($1, 'Asha', '9999999999', 'Ram', 0, 'X', '123456789012', 'visit', 'UP')",
        )
        .bind(Uuid::new_v4())
        .execute(&pool)
        .await
        .unwrap_err();
        assert!(matches!(port_error(err), PortError::Validation(_)));

        let err = sqlx::query(
            "INSERT INTO citizens (id, name, phone_number, father_name, age, address, \
             national_id_number, purpose, state) \
             VALUES ($1, 'Asha', '9999999999', 'Ram', 30, 'X', '12345abc9012', 'visit', 'UP')",
        )
        .bind(Uuid::new_v4())
        .execute(&pool)
        .await
        .unwrap_err();
        assert!(matches!(port_error(err), PortError::Validation(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn other_database_errors_are_unexpected(pool: PgPool) {
        let err = sqlx::query("SELECT * FROM no_such_table")
            .execute(&pool)
            .await
            .unwrap_err();
        assert!(matches!(port_error(err), PortError::Unexpected(_)));
    }
}
