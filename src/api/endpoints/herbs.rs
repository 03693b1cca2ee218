//! Herb library endpoints.
//!
//! - `GET /api/herbs?search=` list or search
//! - `POST /api/herbs` create
//! - `GET|PUT|DELETE /api/herbs/:id`

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::endpoints::SearchQuery;
use crate::api::error::ApiError;
use crate::api::types::{parse_body, ApiContext};
use crate::db;
use crate::models::Herb;
use crate::normalize::herb_from_value;

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Herb>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let herbs = match query.term() {
        Some(term) => db::search_herbs(&conn, term)?,
        None => db::list_herbs(&conn)?,
    };
    Ok(Json(herbs))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<Herb>), ApiError> {
    let mut herb = herb_from_value(&parse_body(&body)?);
    herb.validate()?;

    let conn = ctx.core.open_db()?;
    herb.id = Some(db::insert_herb(&conn, &herb)?);
    tracing::info!(id = ?herb.id, name = %herb.pinyin_name, "Herb created");
    Ok((StatusCode::CREATED, Json(herb)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Herb>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::get_herb(&conn, id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("herb {id} not found")))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Herb>, ApiError> {
    let mut herb = herb_from_value(&parse_body(&body)?);
    herb.validate()?;

    let conn = ctx.core.open_db()?;
    db::update_herb(&conn, id, &herb)?;
    herb.id = Some(id);
    Ok(Json(herb))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    db::delete_herb(&conn, id)?;
    Ok(StatusCode::NO_CONTENT)
}
