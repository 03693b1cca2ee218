//! Prescription endpoints.
//!
//! - `GET /api/prescriptions?patient_id=` newest first
//! - `POST /api/prescriptions` create (patient must exist)
//! - `POST /api/prescriptions/draft` resolve builder lines into a custom blob
//! - `GET|DELETE /api/prescriptions/:id`
//! - `PATCH /api/prescriptions/:id/status`
//! - `GET /api/prescriptions/:id/view` printable view plus interaction flags
//! - `GET /api/prescriptions/:id/pdf`

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::types::{parse_body, ApiContext};
use crate::db;
use crate::interactions::{flag_view, InteractionFlags};
use crate::models::enums::{ItemKind, PrescriptionStatus};
use crate::models::Prescription;
use crate::normalize::{field, number, prescription_from_value, text};
use crate::prescription::{build_stored_view, PrescriptionData, PrescriptionDraft, PrescriptionItem};
use crate::print::render_prescription_pdf;
use crate::settings::ClinicSettings;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub patient_id: Option<i64>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Prescription>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let prescriptions = match query.patient_id {
        Some(patient_id) => db::list_prescriptions_for_patient(&conn, patient_id)?,
        None => db::list_prescriptions(&conn)?,
    };
    Ok(Json(prescriptions))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<Prescription>), ApiError> {
    let now = chrono::Local::now().naive_local();
    let rx = prescription_from_value(&parse_body(&body)?, now);
    rx.validate()?;

    let conn = ctx.core.open_db()?;
    if db::get_patient(&conn, rx.patient_id)?.is_none() {
        return Err(ApiError::BadRequest(format!(
            "patient {} does not exist",
            rx.patient_id
        )));
    }
    if let Some(formula_id) = rx.formula_id {
        if db::get_formula(&conn, formula_id)?.is_none() {
            return Err(ApiError::BadRequest(format!(
                "formula {formula_id} does not exist"
            )));
        }
    }

    let id = db::insert_prescription(&conn, &rx)?;
    tracing::info!(
        id,
        patient_id = rx.patient_id,
        formula_id = ?rx.formula_id,
        custom = rx.custom_formula.is_some(),
        "Prescription created"
    );
    let stored = db::get_prescription(&conn, id)?
        .ok_or_else(|| ApiError::Internal(format!("prescription {id} vanished after insert")))?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Prescription>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(load(&conn, id)?))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    db::delete_prescription(&conn, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_status(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Prescription>, ApiError> {
    let value = parse_body(&body)?;
    let raw = value
        .as_object()
        .and_then(|obj| text(obj, "status"))
        .ok_or_else(|| ApiError::Validation("status is required".into()))?;
    let status: PrescriptionStatus = raw.to_lowercase().parse()?;

    let conn = ctx.core.open_db()?;
    db::update_prescription_status(&conn, id, status)?;
    Ok(Json(load(&conn, id)?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub prescription: PrescriptionData,
    /// Matched to `prescription.items` by position.
    pub flags: Vec<InteractionFlags>,
}

pub async fn view(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<ViewResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let (prescription, _) = build_view_for(&conn, id)?;
    let flags = flag_view(&prescription);
    Ok(Json(ViewResponse {
        prescription,
        flags,
    }))
}

pub async fn pdf(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conn = ctx.core.open_db()?;
    let (data, settings) = build_view_for(&conn, id)?;
    let flags = flag_view(&data);
    let bytes = render_prescription_pdf(&data, &settings, &flags)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.pdf\"", data.number),
            ),
        ],
        bytes,
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub items: Vec<PrescriptionItem>,
    pub total_grams: f64,
    /// Blob to send back as `customFormula` when saving.
    pub custom_formula: Value,
}

/// Body: `{ "items": [{ "type": "herb"|"formula", "id": 3, "grams": 12 }] }`.
pub async fn draft(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<Json<DraftResponse>, ApiError> {
    let value = parse_body(&body)?;
    let lines = value
        .as_object()
        .and_then(|obj| field(obj, "items"))
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Validation("items must be an array".into()))?;

    let conn = ctx.core.open_db()?;
    let settings = ClinicSettings::load(&conn)?;
    let mut draft = PrescriptionDraft::new();

    for (index, line) in lines.iter().enumerate() {
        let obj = line
            .as_object()
            .ok_or_else(|| ApiError::Validation(format!("items[{index}] must be an object")))?;
        let kind: ItemKind = text(obj, "type")
            .unwrap_or_default()
            .to_lowercase()
            .parse()?;
        let id = number(obj, "id")
            .map(|n| n as i64)
            .ok_or_else(|| ApiError::Validation(format!("items[{index}].id is required")))?;
        let grams = number(obj, "grams").unwrap_or(settings.default_total_grams);
        if grams < 0.0 {
            return Err(ApiError::Validation(format!(
                "items[{index}].grams must not be negative"
            )));
        }

        match kind {
            ItemKind::Herb => {
                let herb = db::get_herb(&conn, id)?
                    .ok_or_else(|| ApiError::NotFound(format!("herb {id} not found")))?;
                draft.add_herb(herb, grams);
            }
            ItemKind::Formula => {
                let formula = db::get_formula(&conn, id)?
                    .ok_or_else(|| ApiError::NotFound(format!("formula {id} not found")))?;
                draft.add_formula(formula, grams);
            }
        }
    }

    Ok(Json(DraftResponse {
        items: draft.items(&settings),
        total_grams: draft.total_grams(),
        custom_formula: draft.to_custom_formula(&settings),
    }))
}

fn load(conn: &Connection, id: i64) -> Result<Prescription, ApiError> {
    db::get_prescription(conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("prescription {id} not found")))
}

fn build_view_for(
    conn: &Connection,
    id: i64,
) -> Result<(PrescriptionData, ClinicSettings), ApiError> {
    let rx = load(conn, id)?;
    let patient = db::get_patient(conn, rx.patient_id)?
        .ok_or_else(|| ApiError::NotFound(format!("patient {} not found", rx.patient_id)))?;
    let formula = match rx.formula_id {
        Some(formula_id) => db::get_formula(conn, formula_id)?,
        None => None,
    };
    let settings = ClinicSettings::load(conn)?;
    let data = build_stored_view(&rx, &patient, formula.as_ref(), &settings);
    Ok((data, settings))
}
