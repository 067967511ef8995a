//! services/api/src/web/response.rs
//!
//! The JSON envelope shared by every citizen endpoint, the presentation mapping
//! from domain records to response bodies, and the handler-boundary error type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use citizen_registry_core::domain::{Citizen, Visit};
use citizen_registry_core::ports::PortError;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::AppState;
use crate::web::upload::UploadError;

//=========================================================================================
// Response Envelope
//=========================================================================================

/// `{success, message?, data?, error?, count?, nationalIdNumber?}`
///
/// Failures use the same shape with `success: false`, `message` and `error`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_id_number: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
            count: None,
            national_id_number: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_national_id(mut self, national_id_number: impl Into<String>) -> Self {
        self.national_id_number = Some(national_id_number.into());
        self
    }
}

impl<T: Serialize> Envelope<Vec<T>> {
    /// A list body; `count` always mirrors the number of items.
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len();
        Self {
            count: Some(count),
            ..Self::data(items)
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
            count: None,
            national_id_number: None,
        }
    }

    fn failure(message: String, error: Option<String>) -> Self {
        Self {
            success: false,
            message: Some(message),
            data: None,
            error,
            count: None,
            national_id_number: None,
        }
    }
}

//=========================================================================================
// Presentation Mapping
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhotoView {
    pub stored_file_name: String,
    pub original_file_name: String,
    pub captured_at: DateTime<Utc>,
    /// Computed per response, never stored.
    pub url: String,
}

/// A citizen record as it leaves the API.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CitizenView {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub father_name: String,
    pub age: i32,
    pub address: String,
    pub national_id_number: String,
    pub purpose: String,
    pub state: String,
    pub photo: Option<PhotoView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CitizenView {
    /// The single place where a record is shaped for output; attaches `photo.url`.
    pub fn present(citizen: Citizen, state: &AppState) -> Self {
        let photo = citizen.photo.map(|photo| PhotoView {
            url: state.photo_url(&photo.stored_file_name),
            stored_file_name: photo.stored_file_name,
            original_file_name: photo.original_file_name,
            captured_at: photo.captured_at,
        });
        Self {
            id: citizen.id,
            name: citizen.name,
            phone_number: citizen.phone_number,
            father_name: citizen.father_name,
            age: citizen.age,
            address: citizen.address,
            national_id_number: citizen.national_id_number,
            purpose: citizen.purpose,
            state: citizen.state,
            photo,
            created_at: citizen.created_at,
            updated_at: citizen.updated_at,
        }
    }

    pub fn present_all(citizens: Vec<Citizen>, state: &AppState) -> Vec<Self> {
        citizens
            .into_iter()
            .map(|c| Self::present(c, state))
            .collect()
    }
}

/// One entry of a visit history.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitView {
    pub id: Uuid,
    pub name: String,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Visit> for VisitView {
    fn from(visit: Visit) -> Self {
        Self {
            id: visit.id,
            name: visit.name,
            purpose: visit.purpose,
            created_at: visit.created_at,
            updated_at: visit.updated_at,
        }
    }
}

//=========================================================================================
// Handler Boundary Error
//=========================================================================================

/// Every failure inside a handler ends up here and is rendered as a
/// `success: false` envelope.
#[derive(Debug)]
pub struct HandlerError {
    status: StatusCode,
    message: String,
    error: Option<String>,
}

impl HandlerError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            error: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Citizen not found".to_string(),
            error: None,
        }
    }

    /// A 500 carrying the endpoint's own message plus the underlying error text.
    pub fn internal(context: &str, error: impl ToString) -> Self {
        let error = error.to_string();
        error!("{}: {}", context, error);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: context.to_string(),
            error: Some(error),
        }
    }

    /// Converts a port error, using `context` as the message for 500 responses.
    pub fn from_port(context: &'static str) -> impl Fn(PortError) -> Self {
        move |e| match e {
            PortError::Validation(msg) | PortError::InvalidInput(msg) => Self::bad_request(msg),
            PortError::NotFound(_) => Self::not_found(),
            other => Self::internal(context, other),
        }
    }
}

impl From<UploadError> for HandlerError {
    fn from(e: UploadError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(Envelope::failure(self.message, self.error)),
        )
            .into_response()
    }
}
