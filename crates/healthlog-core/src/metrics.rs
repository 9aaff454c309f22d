//! Derived metrics and input validation.
//!
//! Every write path computes BMI through [`compute_bmi`] and validates through
//! [`validate_measurement_input`] / [`validate_patient`] before touching the
//! store.

use thiserror::Error;

use crate::models::Patient;

/// Validation errors, raised before anything is written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be between 0 and 100, got {value}")]
    PercentOutOfRange { field: &'static str, value: f64 },

    #[error("Invalid id: {0}")]
    InvalidId(i64),

    #[error("Patient {0} does not exist")]
    UnknownPatient(i64),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("BMI out of range for weight {weight_kg} kg and height {height_cm} cm")]
    BmiOutOfRange { weight_kg: f64, height_cm: f64 },

    #[error("Unknown {field}: {value}")]
    UnknownCategory { field: &'static str, value: String },
}

/// Body-mass index from weight (kg) and height (cm).
///
/// Returns 0 unless both inputs are strictly positive.
pub fn compute_bmi(weight_kg: f64, height_cm: f64) -> f64 {
    if weight_kg > 0.0 && height_cm > 0.0 {
        let height_m = height_cm / 100.0;
        weight_kg / (height_m * height_m)
    } else {
        0.0
    }
}

/// Check measurement values before they reach a repository.
///
/// Out-of-range values are rejected, never clamped. Weight and height must
/// also yield a finite, positive BMI.
pub fn validate_measurement_input(
    weight_kg: f64,
    height_cm: f64,
    body_fat_pct: Option<f64>,
    muscle_mass_pct: Option<f64>,
) -> Result<(), ValidationError> {
    require_positive("weight", weight_kg)?;
    require_positive("height", height_cm)?;
    let bmi = compute_bmi(weight_kg, height_cm);
    if !(bmi.is_finite() && bmi > 0.0) {
        return Err(ValidationError::BmiOutOfRange { weight_kg, height_cm });
    }
    if let Some(value) = body_fat_pct {
        require_percent("body fat", value)?;
    }
    if let Some(value) = muscle_mass_pct {
        require_percent("muscle mass", value)?;
    }
    Ok(())
}

/// Check that a patient carries every required field.
pub fn validate_patient(patient: &Patient) -> Result<(), ValidationError> {
    if patient.first_name.trim().is_empty() {
        return Err(ValidationError::MissingField("first name"));
    }
    if patient.last_name1.trim().is_empty() {
        return Err(ValidationError::MissingField("first surname"));
    }
    if patient.gender.trim().is_empty() {
        return Err(ValidationError::MissingField("gender"));
    }
    Ok(())
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    // NaN fails the comparison too
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositive { field, value })
    }
}

fn require_percent(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::PercentOutOfRange { field, value })
    }
}
