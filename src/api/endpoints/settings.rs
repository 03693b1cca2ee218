//! Clinic settings endpoints: `GET /api/settings`, `PUT /api/settings`.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{parse_body, ApiContext};
use crate::settings::ClinicSettings;

pub async fn get(State(ctx): State<ApiContext>) -> Result<Json<ClinicSettings>, ApiError> {
    Ok(Json(ctx.core.settings()?))
}

/// Replace all settings. Omitted fields reset to their defaults.
pub async fn put(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<Json<ClinicSettings>, ApiError> {
    let settings: ClinicSettings = serde_json::from_value(parse_body(&body)?)
        .map_err(|e| ApiError::BadRequest(format!("Invalid settings: {e}")))?;
    if !settings.default_total_grams.is_finite() || settings.default_total_grams <= 0.0 {
        return Err(ApiError::Validation(
            "defaultTotalGrams must be greater than zero".into(),
        ));
    }

    let conn = ctx.core.open_db()?;
    settings.save(&conn)?;
    tracing::info!("Clinic settings updated");
    Ok(Json(ClinicSettings::load(&conn)?))
}
