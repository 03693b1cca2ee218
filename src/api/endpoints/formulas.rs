//! Formula library endpoints.
//!
//! - `GET /api/formulas?search=` list or search
//! - `POST /api/formulas` create
//! - `POST /api/formulas/import` bulk import (formula object or array)
//! - `GET|PUT|DELETE /api/formulas/:id`
//! - `GET /api/formulas/:id/composition?total_grams=` resolved preview

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::endpoints::SearchQuery;
use crate::api::error::ApiError;
use crate::api::types::{parse_body, ApiContext};
use crate::db;
use crate::import::{import_formulas_from_bytes, ImportSummary};
use crate::models::Formula;
use crate::normalize::formula_from_value;
use crate::prescription::{preview_formula, FormulaView};

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Formula>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let formulas = match query.term() {
        Some(term) => db::search_formulas(&conn, term)?,
        None => db::list_formulas(&conn)?,
    };
    Ok(Json(formulas))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<Formula>), ApiError> {
    let mut formula = formula_from_value(&parse_body(&body)?);
    formula.validate()?;

    let conn = ctx.core.open_db()?;
    formula.id = Some(db::insert_formula(&conn, &formula)?);
    tracing::info!(id = ?formula.id, components = formula.composition.len(), "Formula created");
    Ok((StatusCode::CREATED, Json(formula)))
}

pub async fn import(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<ImportSummary>), ApiError> {
    let conn = ctx.core.open_db()?;
    let summary = import_formulas_from_bytes(&conn, &body)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Formula>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::get_formula(&conn, id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("formula {id} not found")))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Formula>, ApiError> {
    let mut formula = formula_from_value(&parse_body(&body)?);
    formula.validate()?;

    let conn = ctx.core.open_db()?;
    db::update_formula(&conn, id, &formula)?;
    formula.id = Some(id);
    Ok(Json(formula))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    db::delete_formula(&conn, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CompositionQuery {
    pub total_grams: Option<f64>,
}

/// Composition resolved against `total_grams` (default from clinic settings).
pub async fn composition(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Query(query): Query<CompositionQuery>,
) -> Result<Json<FormulaView>, ApiError> {
    let conn = ctx.core.open_db()?;
    let settings = crate::settings::ClinicSettings::load(&conn)?;
    let formula = db::get_formula(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("formula {id} not found")))?;

    let total = query.total_grams.unwrap_or(settings.default_total_grams);
    if !total.is_finite() {
        return Err(ApiError::BadRequest("total_grams must be a number".into()));
    }
    Ok(Json(preview_formula(&formula, total, &settings)))
}
