//! Spreadsheet import and report downloads.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{ImportSummary, ReportKind};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::NavView;
use crate::state::AppState;

/// Largest spreadsheet accepted by the upload form.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Multipart field carrying the spreadsheet.
const FILE_FIELD: &str = "file";

/// Import page template, before and after an upload.
#[derive(Template, WebTemplate)]
#[template(path = "admin/import.html")]
pub struct ImportTemplate {
    pub nav: NavView,
    pub summary: Option<ImportSummary>,
    pub error: Option<String>,
}

/// Show the upload form.
#[instrument(skip(session, auth))]
pub async fn import_page(session: Session, RequireAdmin(auth): RequireAdmin) -> ImportTemplate {
    ImportTemplate {
        nav: NavView::load(&session, Some(&auth.user)).await,
        summary: None,
        error: None,
    }
}

/// Problem with the uploaded file itself, reported on the form.
fn check_upload(file_name: &str, bytes: &[u8]) -> std::result::Result<(), &'static str> {
    if file_name.is_empty() || bytes.is_empty() {
        return Err("Choose a spreadsheet to upload.");
    }
    let is_xlsx = std::path::Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if !is_xlsx {
        return Err("The file must be an Excel spreadsheet (.xlsx).");
    }
    Ok(())
}

/// Forward an uploaded spreadsheet to the API and show what it did.
#[instrument(skip(state, session, auth, multipart))]
pub async fn import_upload(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(auth): RequireAdmin,
    mut multipart: Multipart,
) -> Result<ImportTemplate> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some((file_name, bytes));
    }

    let nav = NavView::load(&session, Some(&auth.user)).await;
    let (file_name, bytes) = upload.unwrap_or_default();
    if let Err(message) = check_upload(&file_name, &bytes) {
        return Ok(ImportTemplate {
            nav,
            summary: None,
            error: Some(message.to_string()),
        });
    }

    let size = bytes.len();
    let summary = state
        .api()
        .import_products(&auth.token, &file_name, bytes.to_vec())
        .await?;
    tracing::info!(
        file = %file_name,
        size,
        success = summary.success,
        created = summary.created,
        updated = summary.updated,
        "Product spreadsheet imported"
    );

    Ok(ImportTemplate {
        nav,
        summary: Some(summary),
        error: None,
    })
}

/// One downloadable report.
#[derive(Clone)]
pub struct ReportLink {
    pub href: String,
    pub label: &'static str,
    pub file_name: &'static str,
}

/// Report list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/reports.html")]
pub struct ReportsTemplate {
    pub nav: NavView,
    pub reports: Vec<ReportLink>,
}

fn report_links() -> Vec<ReportLink> {
    [
        (ReportKind::Products, "Products and stock"),
        (ReportKind::Orders, "Orders"),
    ]
    .into_iter()
    .map(|(kind, label)| ReportLink {
        href: format!("/admin/reports/{}", kind.as_str()),
        label,
        file_name: kind.file_name(),
    })
    .collect()
}

/// List the available reports.
#[instrument(skip(session, auth))]
pub async fn reports(session: Session, RequireAdmin(auth): RequireAdmin) -> ReportsTemplate {
    ReportsTemplate {
        nav: NavView::load(&session, Some(&auth.user)).await,
        reports: report_links(),
    }
}

/// Stream a report spreadsheet from the API as an attachment.
#[instrument(skip(state, auth))]
pub async fn download_report(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(kind): Path<String>,
) -> Result<Response> {
    let kind = ReportKind::from_str(&kind).map_err(AppError::BadRequest)?;
    let download = state.api().export_report(&auth.token, kind).await?;
    tracing::info!(report = kind.as_str(), size = download.bytes.len(), "Report downloaded");

    let disposition = format!("attachment; filename=\"{}\"", kind.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, download.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    )
        .into_response())
}
