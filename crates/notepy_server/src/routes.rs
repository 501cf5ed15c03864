//! Route handlers.
//!
//! Every handler touches the store through one [`AppState::with_store`]
//! call, so each request observes and persists a consistent collection.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use log::info;
use notepy_core::export::{markdown_file_name, render_markdown, render_note_markdown};
use notepy_core::markdown::normalize_editor_content;
use notepy_core::{ExportEnvelope, ExportFormat, Note, NoteFilter, NoteUpdate};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const INDEX_HTML: &str = include_str!("../assets/index.html");
const BULK_MARKDOWN_FILE_NAME: &str = "notepy_export.md";

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Comma-separated tag list.
    pub tags: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn status(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let uptime_secs = state.started_at.elapsed().as_secs();
    let note_count = state.with_store(|store| store.count()).await?;
    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "note_count": note_count,
        "uptime_secs": uptime_secs,
    })))
}

pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Value>> {
    let filter = NoteFilter {
        tags: params
            .tags
            .as_deref()
            .map(split_tags)
            .unwrap_or_default(),
        query: params.search.filter(|query| !query.trim().is_empty()),
    };
    let notes = state
        .with_store(move |store| owned(store.list(&filter)))
        .await?;
    Ok(Json(json!({ "notes": notes })))
}

pub async fn create_note(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let Json(request) = body?;
    let title = match request.title {
        Some(title) if !title.trim().is_empty() => title.trim().to_string(),
        _ => return Err(ApiError::bad_request("Title is required")),
    };
    state.check_title(&title)?;
    let content = normalize_editor_content(&request.content.unwrap_or_default());
    state.check_content(&content)?;
    let tags = request.tags.unwrap_or_default();

    let note = state
        .with_store(move |store| store.create(title, content, tags))
        .await??;
    info!(
        "event=note_create module=server status=ok note_id={}",
        note.id()
    );
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<String>,
) -> ApiResult<Json<Note>> {
    state
        .with_store(move |store| store.get(&note_id).cloned())
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<String>,
    body: Result<Json<NoteUpdate>, JsonRejection>,
) -> ApiResult<Json<Note>> {
    let Json(mut changes) = body?;
    if let Some(title) = changes.title.as_mut() {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("Title cannot be empty"));
        }
        *title = title.trim().to_string();
        state.check_title(title)?;
    }
    if let Some(content) = changes.content.as_mut() {
        *content = normalize_editor_content(content);
        state.check_content(content)?;
    }

    state
        .with_store(move |store| store.update(&note_id, changes))
        .await??
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = note_id.clone();
    if !state.with_store(move |store| store.delete(&id)).await?? {
        return Err(ApiError::NotFound);
    }
    info!("event=note_delete module=server status=ok note_id={note_id}");
    Ok(Json(json!({ "message": "Note deleted successfully" })))
}

pub async fn list_tags(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let tags = state.with_store(|store| store.all_tags()).await?;
    Ok(Json(json!({ "tags": tags })))
}

pub async fn add_tag(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<String>,
    body: Result<Json<TagRequest>, JsonRejection>,
) -> ApiResult<Json<Note>> {
    let Json(request) = body?;
    let tag = match request.tag {
        Some(tag) if !tag.trim().is_empty() => tag.trim().to_string(),
        _ => return Err(ApiError::bad_request("Tag is required")),
    };
    state
        .with_store(move |store| store.add_tag(&note_id, &tag))
        .await??
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn remove_tag(
    State(state): State<Arc<AppState>>,
    Path((note_id, tag)): Path<(String, String)>,
) -> ApiResult<Json<Note>> {
    state
        .with_store(move |store| store.remove_tag(&note_id, &tag))
        .await??
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn export_notes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportParams>,
) -> ApiResult<Response> {
    let format = parse_format(params.format.as_deref())?;
    let notes = state
        .with_store(|store| owned(store.list(&NoteFilter::default())))
        .await?;
    info!(
        "event=notes_export module=server status=ok count={} format={:?}",
        notes.len(),
        format
    );
    Ok(match format {
        ExportFormat::Json => Json(ExportEnvelope::new(&notes)).into_response(),
        ExportFormat::Markdown => {
            markdown_attachment(render_markdown(&notes), BULK_MARKDOWN_FILE_NAME)
        }
    })
}

pub async fn export_note(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<String>,
    Query(params): Query<ExportParams>,
) -> ApiResult<Response> {
    let format = parse_format(params.format.as_deref())?;
    let note = state
        .with_store(move |store| store.get(&note_id).cloned())
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(match format {
        ExportFormat::Json => Json(note).into_response(),
        ExportFormat::Markdown => {
            markdown_attachment(render_note_markdown(&note), &markdown_file_name(&note))
        }
    })
}

pub async fn import_notes(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(document) = body?;
    let items = match document {
        Value::Object(mut map) => match map.remove("notes") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(ApiError::bad_request("`notes` must be an array")),
            None => return Err(ApiError::bad_request("Invalid import data format")),
        },
        _ => return Err(ApiError::bad_request("Invalid import data format")),
    };

    let report = state
        .with_store(move |store| store.import_drafts(items))
        .await??;
    Ok(Json(json!({
        "message": format!("Successfully imported {} notes", report.imported),
        "imported_count": report.imported,
        "errors": report.errors,
    })))
}

fn owned(notes: Vec<&Note>) -> Vec<Note> {
    notes.into_iter().cloned().collect()
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_format(raw: Option<&str>) -> ApiResult<ExportFormat> {
    let raw = raw.unwrap_or("json");
    ExportFormat::parse(raw)
        .ok_or_else(|| ApiError::bad_request(format!("Unsupported export format: {raw}")))
}

fn markdown_attachment(body: String, file_name: &str) -> Response {
    (
        [
            (
                header::CONTENT_TYPE,
                "text/markdown; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::{parse_format, split_tags};
    use notepy_core::ExportFormat;

    #[test]
    fn split_tags_drops_blank_segments() {
        assert_eq!(split_tags("work, ideas,,  "), vec!["work", "ideas"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn parse_format_defaults_to_json() {
        assert_eq!(parse_format(None).unwrap(), ExportFormat::Json);
        assert_eq!(parse_format(Some("markdown")).unwrap(), ExportFormat::Markdown);
        assert!(parse_format(Some("pdf")).is_err());
    }
}
