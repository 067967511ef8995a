//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `CitizenStore` port. It applies the same
//! core rules as the PostgreSQL adapter and backs the HTTP integration tests.

use async_trait::async_trait;
use chrono::Utc;
use citizen_registry_core::domain::{
    Citizen, CitizenPatch, CitizenQuery, NewCitizen, UpdatedCitizen, Visit,
};
use citizen_registry_core::ports::{CitizenStore, PortError, PortResult};
use citizen_registry_core::validation;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Records kept in insertion order; reads sort newest first.
#[derive(Default)]
pub struct MemoryStore {
    citizens: RwLock<Vec<Citizen>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select<F>(&self, keep: F) -> Vec<Citizen>
    where
        F: Fn(&Citizen) -> bool,
    {
        let citizens = self.citizens.read().await;
        let mut selected: Vec<Citizen> = citizens.iter().filter(|&c| keep(c)).cloned().collect();
        // Stable sort: records created in the same instant keep newest-inserted first.
        selected.reverse();
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        selected
    }
}

fn not_found(id: Uuid) -> PortError {
    PortError::NotFound(format!("Citizen {} not found", id))
}

#[async_trait]
impl CitizenStore for MemoryStore {
    async fn insert(&self, new: NewCitizen) -> PortResult<Citizen> {
        let citizen = Citizen::register(new, Utc::now())?;
        self.citizens.write().await.push(citizen.clone());
        Ok(citizen)
    }

    async fn find_all(&self) -> PortResult<Vec<Citizen>> {
        Ok(self.select(|_| true).await)
    }

    async fn find_by_id(&self, id: Uuid) -> PortResult<Citizen> {
        self.citizens
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn find_by_query(&self, query: CitizenQuery) -> PortResult<Vec<Citizen>> {
        let query = query.normalized();
        Ok(self.select(|c| query.matches(c)).await)
    }

    async fn find_by_national_id(&self, national_id: &str) -> PortResult<Vec<Citizen>> {
        validation::require_national_id(national_id)?;
        Ok(self
            .select(|c| c.national_id_number == national_id)
            .await)
    }

    async fn find_visit_history(&self, national_id: &str) -> PortResult<Vec<Visit>> {
        let citizens = self.find_by_national_id(national_id).await?;
        Ok(citizens.iter().map(Citizen::to_visit).collect())
    }

    async fn update_by_id(&self, id: Uuid, patch: CitizenPatch) -> PortResult<UpdatedCitizen> {
        let mut citizens = self.citizens.write().await;
        let citizen = citizens
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(id))?;
        let replaced_photo = citizen.apply_patch(patch, Utc::now())?;
        Ok(UpdatedCitizen {
            citizen: citizen.clone(),
            replaced_photo,
        })
    }

    async fn delete_by_id(&self, id: Uuid) -> PortResult<Citizen> {
        let mut citizens = self.citizens.write().await;
        let index = citizens
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| not_found(id))?;
        Ok(citizens.remove(index))
    }
}
