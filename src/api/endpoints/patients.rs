//! Patient endpoints.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::endpoints::SearchQuery;
use crate::api::error::ApiError;
use crate::api::types::{parse_body, ApiContext};
use crate::db;
use crate::models::{Patient, Prescription};
use crate::normalize::patient_from_value;

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patients = match query.term() {
        Some(term) => db::search_patients(&conn, term)?,
        None => db::list_patients(&conn)?,
    };
    Ok(Json(patients))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let mut patient = patient_from_value(&parse_body(&body)?);
    patient.validate()?;

    let conn = ctx.core.open_db()?;
    patient.id = Some(db::insert_patient(&conn, &patient)?);
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::get_patient(&conn, id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("patient {id} not found")))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Patient>, ApiError> {
    let mut patient = patient_from_value(&parse_body(&body)?);
    patient.validate()?;

    let conn = ctx.core.open_db()?;
    db::update_patient(&conn, id, &patient)?;
    patient.id = Some(id);
    Ok(Json(patient))
}

/// Also removes the patient's prescriptions.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    db::delete_patient(&conn, id)?;
    tracing::info!(id, "Patient deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/patients/:id/prescriptions`
pub async fn prescriptions(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Prescription>>, ApiError> {
    let conn = ctx.core.open_db()?;
    if db::get_patient(&conn, id)?.is_none() {
        return Err(ApiError::NotFound(format!("patient {id} not found")));
    }
    Ok(Json(db::list_prescriptions_for_patient(&conn, id)?))
}
