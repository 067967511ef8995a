//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the citizen REST endpoints and the master
//! definition for the OpenAPI specification.
//!
//! Every handler is an error boundary: failures leave as a `success: false`
//! envelope via `HandlerError`, never as a panic or a bare status.

use crate::web::{
    response::{CitizenView, Envelope, HandlerError, PhotoView, VisitView},
    state::AppState,
    upload::{CitizenForm, UploadedPhoto},
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use citizen_registry_core::domain::{CitizenQuery, Photo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_citizen_handler,
        list_citizens_handler,
        search_citizens_handler,
        get_citizen_handler,
        update_citizen_handler,
        delete_citizen_handler,
        citizens_by_national_id_handler,
        visit_history_handler,
        test_route_handler,
        list_upload_files_handler,
        check_file_handler,
    ),
    components(
        schemas(CitizenView, PhotoView, VisitView, UploadFileView, UploadsListing, FileCheck)
    ),
    tags(
        (name = "Citizen Registry API", description = "Registration desk records and visitor photos.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Query parameters of `GET /api/citizen/search`. Every filter is optional.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Case-insensitive partial match.
    pub name: Option<String>,
    /// Exact match.
    pub national_id_number: Option<String>,
    /// Exact match.
    pub phone_number: Option<String>,
    /// Case-insensitive partial match.
    pub state: Option<String>,
}

impl From<SearchParams> for CitizenQuery {
    fn from(params: SearchParams) -> Self {
        CitizenQuery {
            name: params.name,
            national_id_number: params.national_id_number,
            phone_number: params.phone_number,
            state: params.state,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileView {
    name: String,
    size: u64,
    modified: DateTime<Utc>,
    url: String,
}

/// Contents of the uploads directory.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadsListing {
    success: bool,
    message: String,
    directory: String,
    file_count: usize,
    files: Vec<UploadFileView>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileCheck {
    success: bool,
    filename: String,
    exists: bool,
    url: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn parse_id(raw: &str) -> Result<Uuid, HandlerError> {
    Uuid::parse_str(raw).map_err(|_| HandlerError::bad_request("Invalid citizen id"))
}

/// Writes the uploaded photo to storage, if the request carried one.
async fn stage_photo(
    state: &AppState,
    upload: Option<UploadedPhoto>,
    context: &'static str,
) -> Result<Option<Photo>, HandlerError> {
    let Some(upload) = upload else {
        return Ok(None);
    };
    debug!(
        "Staging photo {} ({}, {} bytes)",
        upload.original_file_name,
        upload.content_type,
        upload.data.len()
    );
    state
        .photos
        .stage(&upload.original_file_name, &upload.data)
        .await
        .map(Some)
        .map_err(HandlerError::from_port(context))
}

/// Removes a staged photo after the record write failed.
///
/// A failure here orphans the file; it is logged and otherwise ignored so the
/// original error reaches the client.
async fn discard_staged(state: &AppState, staged: Option<&Photo>) {
    if let Some(photo) = staged {
        match state.photos.remove(&photo.stored_file_name).await {
            Ok(()) => warn!("Deleted staged photo {} after failed write", photo.stored_file_name),
            Err(e) => warn!(
                "Could not delete staged photo {}, file is orphaned: {}",
                photo.stored_file_name, e
            ),
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Register a citizen.
///
/// Accepts a multipart/form-data request with the record fields and an optional
/// `photo` file part (image, at most 5 MiB).
#[utoipa::path(
    post,
    path = "/api/citizen",
    request_body(content_type = "multipart/form-data", description = "Record fields plus an optional `photo` file."),
    responses(
        (status = 201, description = "Citizen registered; `data` holds the record", body = Envelope<CitizenView>),
        (status = 400, description = "Validation failed or the photo was rejected; `success: false` envelope with `message`"),
        (status = 500, description = "Internal server error; `success: false` envelope with `message`")
    )
)]
pub async fn create_citizen_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    const CONTEXT: &str = "Error registering citizen";

    let form = CitizenForm::read(multipart).await?;
    let mut new = form.new_citizen().map_err(HandlerError::from_port(CONTEXT))?;

    let staged = stage_photo(&state, form.photo, CONTEXT).await?;
    new.photo = staged.clone();

    match state.store.insert(new).await {
        Ok(citizen) => {
            info!("Citizen registered: {}", citizen.id);
            let body = Envelope::data(CitizenView::present(citizen, &state))
                .with_message("Citizen registered successfully");
            Ok((StatusCode::CREATED, Json(body)))
        }
        Err(e) => {
            discard_staged(&state, staged.as_ref()).await;
            Err(HandlerError::from_port(CONTEXT)(e))
        }
    }
}

/// List every citizen, newest first.
#[utoipa::path(
    get,
    path = "/api/citizen",
    responses(
        (status = 200, description = "All records; `data` is a list of citizens", body = Envelope<Vec<CitizenView>>),
        (status = 500, description = "Internal server error; `success: false` envelope with `message`")
    )
)]
pub async fn list_citizens_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let citizens = state
        .store
        .find_all()
        .await
        .map_err(HandlerError::from_port("Error fetching citizens"))?;
    debug!("Found {} citizens", citizens.len());
    Ok(Json(Envelope::list(CitizenView::present_all(citizens, &state))))
}

/// Search citizens by name, national ID, phone number or state.
#[utoipa::path(
    get,
    path = "/api/citizen/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching records, newest first", body = Envelope<Vec<CitizenView>>),
        (status = 500, description = "Internal server error; `success: false` envelope with `message`")
    )
)]
pub async fn search_citizens_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, HandlerError> {
    debug!("Searching citizens with {:?}", params);
    let citizens = state
        .store
        .find_by_query(params.into())
        .await
        .map_err(HandlerError::from_port("Error searching citizens"))?;
    Ok(Json(Envelope::list(CitizenView::present_all(citizens, &state))))
}

/// Fetch one citizen.
#[utoipa::path(
    get,
    path = "/api/citizen/{id}",
    params(("id" = Uuid, Path, description = "Citizen id")),
    responses(
        (status = 200, description = "The record", body = Envelope<CitizenView>),
        (status = 400, description = "Malformed id; `success: false` envelope with `message`"),
        (status = 404, description = "Citizen not found; `success: false` envelope with `message`"),
        (status = 500, description = "Internal server error; `success: false` envelope with `message`")
    )
)]
pub async fn get_citizen_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_id(&id)?;
    let citizen = state
        .store
        .find_by_id(id)
        .await
        .map_err(HandlerError::from_port("Error fetching citizen"))?;
    Ok(Json(Envelope::data(CitizenView::present(citizen, &state))))
}

/// Update any subset of a citizen's fields, optionally replacing the photo.
///
/// A new photo is staged first, the record is persisted, and only then is the
/// previous photo file deleted.
#[utoipa::path(
    put,
    path = "/api/citizen/{id}",
    params(("id" = Uuid, Path, description = "Citizen id")),
    request_body(content_type = "multipart/form-data", description = "Any subset of the record fields plus an optional `photo` file."),
    responses(
        (status = 200, description = "Citizen updated; `data` holds the record", body = Envelope<CitizenView>),
        (status = 400, description = "Validation failed or the photo was rejected; `success: false` envelope with `message`"),
        (status = 404, description = "Citizen not found; `success: false` envelope with `message`"),
        (status = 500, description = "Internal server error; `success: false` envelope with `message`")
    )
)]
pub async fn update_citizen_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    const CONTEXT: &str = "Error updating citizen";

    let id = parse_id(&id)?;
    let form = CitizenForm::read(multipart).await?;
    let mut patch = form.patch().map_err(HandlerError::from_port(CONTEXT))?;

    let staged = stage_photo(&state, form.photo, CONTEXT).await?;
    patch.photo = staged.clone();

    let updated = match state.store.update_by_id(id, patch).await {
        Ok(updated) => updated,
        Err(e) => {
            discard_staged(&state, staged.as_ref()).await;
            return Err(HandlerError::from_port(CONTEXT)(e));
        }
    };

    if let Some(old) = &updated.replaced_photo {
        state
            .photos
            .remove(&old.stored_file_name)
            .await
            .map_err(HandlerError::from_port(CONTEXT))?;
    }

    info!("Citizen updated: {}", id);
    let body = Envelope::data(CitizenView::present(updated.citizen, &state))
        .with_message("Citizen updated successfully");
    Ok(Json(body))
}

/// Delete a citizen together with its photo file.
#[utoipa::path(
    delete,
    path = "/api/citizen/{id}",
    params(("id" = Uuid, Path, description = "Citizen id")),
    responses(
        (status = 200, description = "Citizen deleted; envelope with `message` only"),
        (status = 400, description = "Malformed id; `success: false` envelope with `message`"),
        (status = 404, description = "Citizen not found; `success: false` envelope with `message`"),
        (status = 500, description = "Internal server error; `success: false` envelope with `message`")
    )
)]
pub async fn delete_citizen_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    const CONTEXT: &str = "Error deleting citizen";

    let id = parse_id(&id)?;
    let deleted = state
        .store
        .delete_by_id(id)
        .await
        .map_err(HandlerError::from_port(CONTEXT))?;

    if let Some(photo) = &deleted.photo {
        state
            .photos
            .remove(&photo.stored_file_name)
            .await
            .map_err(HandlerError::from_port(CONTEXT))?;
    }

    info!("Citizen deleted: {}", id);
    Ok(Json(Envelope::message("Citizen deleted successfully")))
}

/// All registrations sharing a national ID (repeat visits), newest first.
#[utoipa::path(
    get,
    path = "/api/citizen/by-national-id/{national_id}",
    params(("national_id" = String, Path, description = "12-digit national ID number")),
    responses(
        (status = 200, description = "Matching records", body = Envelope<Vec<CitizenView>>),
        (status = 400, description = "Not a 12-digit national ID; `success: false` envelope with `message`"),
        (status = 500, description = "Internal server error; `success: false` envelope with `message`")
    )
)]
pub async fn citizens_by_national_id_handler(
    State(state): State<Arc<AppState>>,
    Path(national_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let citizens = state
        .store
        .find_by_national_id(&national_id)
        .await
        .map_err(HandlerError::from_port("Error fetching citizens by national ID"))?;
    Ok(Json(
        Envelope::list(CitizenView::present_all(citizens, &state)).with_national_id(national_id),
    ))
}

/// Visit history for a national ID: name, purpose and timestamps only.
#[utoipa::path(
    get,
    path = "/api/citizen/visit-history/{national_id}",
    params(("national_id" = String, Path, description = "12-digit national ID number")),
    responses(
        (status = 200, description = "Visits, newest first", body = Envelope<Vec<VisitView>>),
        (status = 400, description = "Not a 12-digit national ID; `success: false` envelope with `message`"),
        (status = 500, description = "Internal server error; `success: false` envelope with `message`")
    )
)]
pub async fn visit_history_handler(
    State(state): State<Arc<AppState>>,
    Path(national_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let visits = state
        .store
        .find_visit_history(&national_id)
        .await
        .map_err(HandlerError::from_port("Error fetching visit history"))?;
    let visits: Vec<VisitView> = visits.into_iter().map(VisitView::from).collect();
    Ok(Json(Envelope::list(visits).with_national_id(national_id)))
}

/// Liveness check for the citizen routes.
#[utoipa::path(
    get,
    path = "/api/citizen/test",
    responses((status = 200, description = "Routes are mounted; envelope with `message` only"))
)]
pub async fn test_route_handler() -> impl IntoResponse {
    Json(Envelope::message("Test route working!"))
}

/// List the files currently in the uploads directory.
#[utoipa::path(
    get,
    path = "/api/citizen/test-files",
    responses(
        (status = 200, description = "Directory contents", body = UploadsListing),
        (status = 500, description = "Uploads directory unreadable; `success: false` envelope with `message`")
    )
)]
pub async fn list_upload_files_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let files = state
        .photos
        .list()
        .await
        .map_err(HandlerError::from_port("Cannot read uploads directory"))?;
    let files: Vec<UploadFileView> = files
        .into_iter()
        .map(|f| UploadFileView {
            url: state.photo_url(&f.name),
            name: f.name,
            size: f.size,
            modified: f.modified,
        })
        .collect();
    Ok(Json(UploadsListing {
        success: true,
        message: "Uploads directory contents".to_string(),
        directory: state.config.uploads_dir.display().to_string(),
        file_count: files.len(),
        files,
    }))
}

/// Check whether a stored file exists.
#[utoipa::path(
    get,
    path = "/api/citizen/check-file/{filename}",
    params(("filename" = String, Path, description = "Stored file name")),
    responses(
        (status = 200, description = "Existence flag", body = FileCheck),
        (status = 400, description = "File name with path components; `success: false` envelope with `message`"),
        (status = 500, description = "Internal server error; `success: false` envelope with `message`")
    )
)]
pub async fn check_file_handler(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let exists = state
        .photos
        .exists(&filename)
        .await
        .map_err(HandlerError::from_port("Error checking file"))?;
    Ok(Json(FileCheck {
        success: true,
        url: state.photo_url(&filename),
        filename,
        exists,
    }))
}
