//! Bulk import endpoints. Rows come from an uploaded spreadsheet (`file`
//! multipart part) or directly as JSON.

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{BookImportOptions, ImportReport, RowMap},
    normalize::parse_boolean_flag,
    AppState,
};

use super::AuthenticatedUser;

/// JSON import body
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    /// Header -> cell value, one object per row
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<RowMap>,
    /// Book imports only
    pub enrich: Option<bool>,
    /// Book imports only
    pub folder_id: Option<String>,
}

/// Rows plus book options, from either body format
pub struct ImportUpload {
    pub rows: Vec<RowMap>,
    pub options: BookImportOptions,
}

impl ImportUpload {
    async fn from_multipart(mut multipart: Multipart, state: &AppState) -> AppResult<Self> {
        let mut rows = None;
        let mut options = BookImportOptions::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().map(str::to_string);
                    let content = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    rows = Some(state.services.spreadsheets.parse(&content, file_name.as_deref())?);
                }
                "enrich" => {
                    let text = field.text().await.map_err(|e| AppError::BadRequest(e.body_text()))?;
                    options.enrich = Some(parse_boolean_flag(&Value::String(text)));
                }
                "folderId" => {
                    let text = field.text().await.map_err(|e| AppError::BadRequest(e.body_text()))?;
                    options.folder_id = Some(text.trim().to_string()).filter(|f| !f.is_empty());
                }
                other => tracing::debug!("Ignoring multipart field {:?}", other),
            }
        }

        let rows = rows.ok_or_else(|| AppError::BadRequest("Missing file part".to_string()))?;
        Ok(Self { rows, options })
    }
}

#[async_trait]
impl FromRequest<AppState> for ImportUpload {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or(false, |value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Self::from_multipart(multipart, state).await;
        }

        let Json(body) = Json::<ImportRequest>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(Self {
            rows: body.rows,
            options: BookImportOptions {
                enrich: body.enrich,
                folder_id: body.folder_id,
            },
        })
    }
}

/// Import books, matching on barcode
#[utoipa::path(
    post,
    path = "/imports/books",
    tag = "imports",
    security(("bearer_auth" = [])),
    request_body(content = ImportRequest, description = "JSON rows, or a multipart form with `file`, `enrich` and `folderId`"),
    responses(
        (status = 200, description = "Import report", body = ImportReport),
        (status = 400, description = "Unreadable file or no rows")
    )
)]
pub async fn import_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    upload: ImportUpload,
) -> AppResult<Json<ImportReport>> {
    claims.require_staff()?;

    let report = state
        .services
        .imports
        .import_books(upload.rows, upload.options)
        .await?;
    Ok(Json(report))
}

/// Import students, matching on username
#[utoipa::path(
    post,
    path = "/imports/students",
    tag = "imports",
    security(("bearer_auth" = [])),
    request_body(content = ImportRequest, description = "JSON rows, or a multipart form with `file`"),
    responses(
        (status = 200, description = "Import report with generated passwords", body = ImportReport),
        (status = 400, description = "Unreadable file or no rows")
    )
)]
pub async fn import_students(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    upload: ImportUpload,
) -> AppResult<Json<ImportReport>> {
    claims.require_staff()?;

    Ok(Json(state.services.imports.import_students(upload.rows).await?))
}

/// Import teachers, matching on username
#[utoipa::path(
    post,
    path = "/imports/teachers",
    tag = "imports",
    security(("bearer_auth" = [])),
    request_body(content = ImportRequest, description = "JSON rows, or a multipart form with `file`"),
    responses(
        (status = 200, description = "Import report with generated passwords", body = ImportReport),
        (status = 400, description = "Unreadable file or no rows")
    )
)]
pub async fn import_teachers(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    upload: ImportUpload,
) -> AppResult<Json<ImportReport>> {
    claims.require_admin()?;

    Ok(Json(state.services.imports.import_teachers(upload.rows).await?))
}
