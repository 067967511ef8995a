//! `DbAdapter` against a real PostgreSQL database.
//!
//! Each test gets a fresh database with the service migrations applied; set
//! `DATABASE_URL` to a server the test user may create databases on.

use api_lib::adapters::DbAdapter;
use chrono::Utc;
use citizen_registry_core::domain::{CitizenPatch, CitizenQuery, NewCitizen, Photo};
use citizen_registry_core::ports::{CitizenStore, PortError};
use sqlx::PgPool;
use uuid::Uuid;

fn registration(name: &str, national_id: &str) -> NewCitizen {
    NewCitizen {
        name: name.to_string(),
        phone_number: "9999999999".to_string(),
        father_name: "Ram".to_string(),
        age: 30,
        address: "X".to_string(),
        national_id_number: national_id.to_string(),
        purpose: "visit".to_string(),
        state: "Uttar Pradesh".to_string(),
        photo: None,
    }
}

fn photo(stored_file_name: &str) -> Photo {
    Photo {
        stored_file_name: stored_file_name.to_string(),
        original_file_name: "me.jpg".to_string(),
        captured_at: Utc::now(),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn insert_then_find_by_id(pool: PgPool) {
    let store = DbAdapter::new(pool);
    let mut new = registration("  Asha  ", "123456789012");
    new.photo = Some(photo("photo-1-000000001.jpg"));

    let created = store.insert(new).await.unwrap();
    assert_eq!(created.name, "Asha");
    assert_eq!(created.created_at, created.updated_at);

    let found = store.find_by_id(created.id).await.unwrap();
    assert_eq!(found, created);
    assert_eq!(
        found.photo.map(|p| p.stored_file_name),
        Some("photo-1-000000001.jpg".to_string())
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn insert_rejects_invalid_record(pool: PgPool) {
    let store = DbAdapter::new(pool);
    let mut new = registration("Asha", "12345678901");
    new.age = 0;
    assert!(matches!(
        store.insert(new).await,
        Err(PortError::Validation(_))
    ));
    assert!(store.find_all().await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn find_all_returns_newest_first(pool: PgPool) {
    let store = DbAdapter::new(pool);
    let first = store.insert(registration("First", "123456789012")).await.unwrap();
    let second = store.insert(registration("Second", "123456789012")).await.unwrap();

    let all = store.find_all().await.unwrap();
    let ids: Vec<Uuid> = all.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[sqlx::test(migrations = "./migrations")]
async fn search_matches_partial_case_insensitive_and_literal(pool: PgPool) {
    let store = DbAdapter::new(pool);
    store.insert(registration("Ravi Kumar", "123456789012")).await.unwrap();
    let mut asha = registration("Asha", "210987654321");
    asha.phone_number = "8888888888".to_string();
    asha.state = "Kerala".to_string();
    store.insert(asha).await.unwrap();

    let found = store
        .find_by_query(CitizenQuery {
            name: Some("ravi".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Ravi Kumar");

    // Pattern characters are matched literally.
    let found = store
        .find_by_query(CitizenQuery {
            name: Some("%".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(found.is_empty());

    let found = store
        .find_by_query(CitizenQuery {
            state: Some("KER".to_string()),
            phone_number: Some("8888888888".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Asha");

    let found = store
        .find_by_query(CitizenQuery {
            name: Some("ravi".to_string()),
            phone_number: Some("8888888888".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(found.is_empty());

    let found = store
        .find_by_query(CitizenQuery {
            name: Some("  ".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_national_ids_and_visit_history(pool: PgPool) {
    let store = DbAdapter::new(pool);
    let first = store.insert(registration("Asha", "123456789012")).await.unwrap();
    let mut again = registration("Asha", "123456789012");
    again.purpose = "renewal".to_string();
    let second = store.insert(again).await.unwrap();
    store.insert(registration("Ravi", "999999999999")).await.unwrap();

    let matches = store.find_by_national_id("123456789012").await.unwrap();
    let ids: Vec<Uuid> = matches.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let visits = store.find_visit_history("123456789012").await.unwrap();
    assert_eq!(visits.len(), 2);
    assert_eq!(visits[0].id, second.id);
    assert_eq!(visits[0].purpose, "renewal");
    assert_eq!(visits[1].purpose, "visit");

    assert!(matches!(
        store.find_by_national_id("abc").await,
        Err(PortError::InvalidInput(_))
    ));
    assert!(matches!(
        store.find_visit_history("12345678901").await,
        Err(PortError::InvalidInput(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn update_merges_and_reports_replaced_photo(pool: PgPool) {
    let store = DbAdapter::new(pool);
    let mut new = registration("Asha", "123456789012");
    new.photo = Some(photo("photo-1-000000001.jpg"));
    let created = store.insert(new).await.unwrap();

    let updated = store
        .update_by_id(
            created.id,
            CitizenPatch {
                age: Some(31),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.citizen.age, 31);
    assert_eq!(updated.citizen.name, created.name);
    assert_eq!(updated.citizen.created_at, created.created_at);
    assert!(updated.citizen.updated_at > created.updated_at);
    assert!(updated.replaced_photo.is_none());

    let replaced = store
        .update_by_id(
            created.id,
            CitizenPatch {
                photo: Some(photo("photo-2-000000002.png")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(replaced.citizen.updated_at > updated.citizen.updated_at);
    assert_eq!(
        replaced.replaced_photo.map(|p| p.stored_file_name),
        Some("photo-1-000000001.jpg".to_string())
    );

    let found = store.find_by_id(created.id).await.unwrap();
    assert_eq!(found, replaced.citizen);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_reports_validation_and_not_found(pool: PgPool) {
    let store = DbAdapter::new(pool);
    let created = store.insert(registration("Asha", "123456789012")).await.unwrap();

    let result = store
        .update_by_id(
            created.id,
            CitizenPatch {
                age: Some(121),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(PortError::Validation(_))));
    assert_eq!(store.find_by_id(created.id).await.unwrap(), created);

    let result = store
        .update_by_id(Uuid::new_v4(), CitizenPatch::default())
        .await;
    assert!(matches!(result, Err(PortError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_returns_prior_state_then_not_found(pool: PgPool) {
    let store = DbAdapter::new(pool);
    let created = store.insert(registration("Asha", "123456789012")).await.unwrap();

    let deleted = store.delete_by_id(created.id).await.unwrap();
    assert_eq!(deleted, created);

    assert!(matches!(
        store.find_by_id(created.id).await,
        Err(PortError::NotFound(_))
    ));
    assert!(matches!(
        store.delete_by_id(created.id).await,
        Err(PortError::NotFound(_))
    ));
}
