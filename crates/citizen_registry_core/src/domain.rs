//! crates/citizen_registry_core/src/domain.rs
//!
//! Defines the pure, core data structures for the registration desk.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::ports::PortResult;
use crate::validation;

/// Metadata of an uploaded photograph. The file itself lives in photo storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub stored_file_name: String,
    pub original_file_name: String,
    pub captured_at: DateTime<Utc>,
}

/// A single registration entry as persisted by a `CitizenStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citizen {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub father_name: String,
    pub age: i32,
    pub address: String,
    /// 12-digit national identifier. Not unique: repeat visits share it.
    pub national_id_number: String,
    pub purpose: String,
    pub state: String,
    pub photo: Option<Photo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields a client supplies when registering a citizen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCitizen {
    pub name: String,
    pub phone_number: String,
    pub father_name: String,
    pub age: i32,
    pub address: String,
    pub national_id_number: String,
    pub purpose: String,
    pub state: String,
    pub photo: Option<Photo>,
}

/// A partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitizenPatch {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub father_name: Option<String>,
    pub age: Option<i32>,
    pub address: Option<String>,
    pub national_id_number: Option<String>,
    pub purpose: Option<String>,
    pub state: Option<String>,
    pub photo: Option<Photo>,
}

/// Result of an update: the new state plus the photo it displaced, if any.
///
/// `replaced_photo` is set only when the update carried a new photo and the
/// record already had a different one; its file is now unreferenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedCitizen {
    pub citizen: Citizen,
    pub replaced_photo: Option<Photo>,
}

/// Search filters. Absent (or empty) filters impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitizenQuery {
    /// Case-insensitive substring match.
    pub name: Option<String>,
    /// Exact match.
    pub national_id_number: Option<String>,
    /// Exact match.
    pub phone_number: Option<String>,
    /// Case-insensitive substring match.
    pub state: Option<String>,
}

/// Projection of a registration used for the visit history of one national ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub id: Uuid,
    pub name: String,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A file found in photo storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl Citizen {
    /// Builds a fresh record from client input, assigning the id and both timestamps.
    ///
    /// Text fields are trimmed and every field rule is checked before anything
    /// is returned, so a store can persist the result as-is.
    pub fn register(new: NewCitizen, now: DateTime<Utc>) -> PortResult<Self> {
        let mut citizen = Self {
            id: Uuid::new_v4(),
            name: new.name,
            phone_number: new.phone_number,
            father_name: new.father_name,
            age: new.age,
            address: new.address,
            national_id_number: new.national_id_number,
            purpose: new.purpose,
            state: new.state,
            photo: new.photo,
            created_at: now,
            updated_at: now,
        };
        validation::normalize(&mut citizen)?;
        Ok(citizen)
    }

    /// Merges `patch` over this record, re-validates and refreshes `updated_at`.
    ///
    /// Returns the photo that the patch displaced. On error `self` is left unchanged.
    pub fn apply_patch(
        &mut self,
        patch: CitizenPatch,
        now: DateTime<Utc>,
    ) -> PortResult<Option<Photo>> {
        let mut merged = self.clone();
        if let Some(name) = patch.name {
            merged.name = name;
        }
        if let Some(phone_number) = patch.phone_number {
            merged.phone_number = phone_number;
        }
        if let Some(father_name) = patch.father_name {
            merged.father_name = father_name;
        }
        if let Some(age) = patch.age {
            merged.age = age;
        }
        if let Some(address) = patch.address {
            merged.address = address;
        }
        if let Some(national_id_number) = patch.national_id_number {
            merged.national_id_number = national_id_number;
        }
        if let Some(purpose) = patch.purpose {
            merged.purpose = purpose;
        }
        if let Some(state) = patch.state {
            merged.state = state;
        }
        let mut replaced_photo = None;
        if let Some(photo) = patch.photo {
            replaced_photo = merged
                .photo
                .replace(photo)
                .filter(|old| merged.photo.as_ref() != Some(old));
        }
        validation::normalize(&mut merged)?;
        merged.touch(now);
        *self = merged;
        Ok(replaced_photo)
    }

    /// `updated_at` must move strictly forward on every update, even when the
    /// clock has not advanced past the stored value.
    fn touch(&mut self, now: DateTime<Utc>) {
        let floor = self.updated_at + Duration::microseconds(1);
        self.updated_at = now.max(floor);
    }

    pub fn to_visit(&self) -> Visit {
        Visit {
            id: self.id,
            name: self.name.clone(),
            purpose: self.purpose.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl CitizenQuery {
    /// Drops empty filters so that `?name=` behaves like an absent parameter.
    pub fn normalized(self) -> Self {
        fn keep(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            name: keep(self.name),
            national_id_number: keep(self.national_id_number),
            phone_number: keep(self.phone_number),
            state: keep(self.state),
        }
    }

    /// Evaluates the filters against one record. All present filters must hold.
    pub fn matches(&self, citizen: &Citizen) -> bool {
        fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }

        self.name
            .as_deref()
            .map_or(true, |n| contains_ignore_case(&citizen.name, n))
            && self
                .national_id_number
                .as_deref()
                .map_or(true, |id| citizen.national_id_number == id)
            && self
                .phone_number
                .as_deref()
                .map_or(true, |p| citizen.phone_number == p)
            && self
                .state
                .as_deref()
                .map_or(true, |s| contains_ignore_case(&citizen.state, s))
    }
}
