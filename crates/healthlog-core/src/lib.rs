//! HealthLog Core Library
//!
//! Local-first personal health record keeper: patients, their dated body
//! measurements, and chart-ready weight / BMI series.
//!
//! # Architecture
//!
//! ```text
//!        UI forms (validated input)               UI charts
//!                  │                                  ▲
//!                  ▼                                  │
//!        metrics::validate_* / compute_bmi     chart::project
//!                  │                                  ▲
//!                  ▼                                  │
//!   PatientRepository ── MeasurementRepository ───────┘
//!                  │            │        (date, created_at) order
//!                  └─────┬──────┘
//!                        ▼
//!               Database (SQLite file)
//! ```
//!
//! # Core Principle
//!
//! **BMI is never entered, only derived.** Every write recomputes it through
//! [`metrics::compute_bmi`], so stored values cannot drift from weight and
//! height.
//!
//! # Modules
//!
//! - [`db`]: SQLite persistence and the patient / measurement repositories
//! - [`models`]: Domain types (Patient, Measurement, categories)
//! - [`metrics`]: BMI computation and input validation
//! - [`chart`]: Time-series projection for weight and BMI charts
//! - [`config`]: Environment-driven store configuration
//! - [`logging`]: Tracing subscriber setup

pub mod chart;
pub mod config;
pub mod db;
pub mod logging;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use chart::{ChartProjection, ChartSample, ChartSeries, RawSample};
pub use config::StoreConfig;
pub use db::{Database, DbError, ErrorKind, MeasurementRepository, PatientRepository};
pub use metrics::ValidationError;
pub use models::{ActivityLevel, Goal, Measurement, Patient, UNSAVED_ID};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum HealthLogError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for HealthLogError {
    fn from(e: db::DbError) -> Self {
        match e.kind() {
            ErrorKind::Validation => HealthLogError::InvalidInput(e.to_string()),
            ErrorKind::NotFound => HealthLogError::NotFound(e.to_string()),
            ErrorKind::Persistence => HealthLogError::DatabaseError(e.to_string()),
        }
    }
}

impl From<ValidationError> for HealthLogError {
    fn from(e: ValidationError) -> Self {
        HealthLogError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for HealthLogError {
    fn from(e: serde_json::Error) -> Self {
        HealthLogError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for HealthLogError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        HealthLogError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<HealthLogCore>, HealthLogError> {
    let db = Database::open(&path)?;
    Ok(HealthLogCore::wrap(db))
}

/// Open the database named by `HEALTHLOG_DB_PATH` (or the default file).
#[uniffi::export]
pub fn open_database_from_env() -> Result<Arc<HealthLogCore>, HealthLogError> {
    let config = StoreConfig::from_env();
    let db = Database::open_with_config(&config)?;
    Ok(HealthLogCore::wrap(db))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<HealthLogCore>, HealthLogError> {
    let db = Database::open_in_memory()?;
    Ok(HealthLogCore::wrap(db))
}

/// Install the log subscriber. Safe to call more than once.
#[uniffi::export]
pub fn enable_logging() -> bool {
    let config = StoreConfig::from_env();
    logging::init_logging(&config.log_filter)
}

/// BMI for a weight (kg) and height (cm), 0 unless both are positive.
#[uniffi::export]
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> f64 {
    metrics::compute_bmi(weight_kg, height_cm)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct HealthLogCore {
    db: Arc<Mutex<Database>>,
}

impl HealthLogCore {
    fn wrap(db: Database) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }
}

#[uniffi::export]
impl HealthLogCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Create a new patient. The returned record carries the generated id.
    pub fn create_patient(&self, patient: FfiPatient) -> Result<FfiPatient, HealthLogError> {
        let db = self.db.lock()?;
        let mut patient = Patient::try_from(patient)?;
        db.patients().create(&mut patient)?;
        Ok(patient.into())
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> Result<Option<FfiPatient>, HealthLogError> {
        let db = self.db.lock()?;
        let patient = db.patients().get_by_id(id)?;
        Ok(patient.map(|p| p.into()))
    }

    /// List all patients by first name.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, HealthLogError> {
        let db = self.db.lock()?;
        let patients = db.patients().list_all()?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Search patients by first name or surnames.
    pub fn search_patients(&self, term: String) -> Result<Vec<FfiPatient>, HealthLogError> {
        let db = self.db.lock()?;
        let patients = db.patients().search(&term)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Overwrite a patient's demographic fields.
    pub fn update_patient(&self, patient: FfiPatient) -> Result<(), HealthLogError> {
        let db = self.db.lock()?;
        let patient = Patient::try_from(patient)?;
        db.patients().update(&patient)?;
        Ok(())
    }

    /// Delete a patient and all of their measurements.
    pub fn delete_patient(&self, id: i64) -> Result<(), HealthLogError> {
        let db = self.db.lock()?;
        db.patients().delete(id)?;
        Ok(())
    }

    // =========================================================================
    // Measurement Operations
    // =========================================================================

    /// Record a measurement. The returned record carries id and BMI.
    pub fn add_measurement(
        &self,
        measurement: FfiMeasurement,
    ) -> Result<FfiMeasurement, HealthLogError> {
        let db = self.db.lock()?;
        let mut measurement = Measurement::try_from(measurement)?;
        db.measurements().create(&mut measurement)?;
        Ok(measurement.into())
    }

    /// Get a measurement by id.
    pub fn get_measurement(&self, id: i64) -> Result<Option<FfiMeasurement>, HealthLogError> {
        let db = self.db.lock()?;
        let measurement = db.measurements().get_by_id(id)?;
        Ok(measurement.map(|m| m.into()))
    }

    /// List a patient's measurements, oldest first.
    pub fn list_measurements(
        &self,
        patient_id: i64,
    ) -> Result<Vec<FfiMeasurement>, HealthLogError> {
        let db = self.db.lock()?;
        let measurements = db.measurements().list_by_patient(patient_id)?;
        Ok(measurements.into_iter().map(|m| m.into()).collect())
    }

    /// Most recent measurement of a patient.
    pub fn latest_measurement(
        &self,
        patient_id: i64,
    ) -> Result<Option<FfiMeasurement>, HealthLogError> {
        let db = self.db.lock()?;
        let measurement = db.measurements().latest_for_patient(patient_id)?;
        Ok(measurement.map(|m| m.into()))
    }

    /// Overwrite a measurement. The returned record carries the new BMI.
    pub fn update_measurement(
        &self,
        measurement: FfiMeasurement,
    ) -> Result<FfiMeasurement, HealthLogError> {
        let db = self.db.lock()?;
        let mut measurement = Measurement::try_from(measurement)?;
        let repo = db.measurements();
        repo.update(&mut measurement)?;
        let stored = repo
            .get_by_id(measurement.id)?
            .ok_or_else(|| HealthLogError::NotFound(format!("measurement {}", measurement.id)))?;
        Ok(stored.into())
    }

    /// Delete a measurement.
    pub fn delete_measurement(&self, id: i64) -> Result<(), HealthLogError> {
        let db = self.db.lock()?;
        db.measurements().delete(id)?;
        Ok(())
    }

    // =========================================================================
    // Chart Operations
    // =========================================================================

    /// Weight and BMI chart series for a patient.
    pub fn patient_charts(&self, patient_id: i64) -> Result<FfiChartProjection, HealthLogError> {
        Ok(self.load_projection(patient_id)?.into())
    }

    /// Weight and BMI chart series for a patient, as JSON.
    pub fn patient_charts_json(&self, patient_id: i64) -> Result<String, HealthLogError> {
        Ok(self.load_projection(patient_id)?.to_json()?)
    }
}

impl HealthLogCore {
    fn load_projection(&self, patient_id: i64) -> Result<ChartProjection, HealthLogError> {
        let db = self.db.lock()?;
        if !db.patients().exists(patient_id)? {
            return Err(HealthLogError::NotFound(format!("patient {}", patient_id)));
        }
        let measurements = db.measurements().list_by_patient(patient_id)?;
        Ok(chart::project(&measurements))
    }
}

// =========================================================================
// FFI Types
// =========================================================================

fn parse_ffi_date(field: &'static str, value: &str) -> Result<chrono::NaiveDate, HealthLogError> {
    models::parse_date(value)
        .ok_or_else(|| ValidationError::InvalidDate(format!("{}: {:?}", field, value)).into())
}

fn format_ffi_timestamp(ts: Option<chrono::NaiveDateTime>) -> Option<String> {
    ts.map(|ts| ts.format(models::TIMESTAMP_FORMAT).to_string())
}

/// FFI-safe patient. Dates are `YYYY-MM-DD`, categories their snake_case names.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: i64,
    pub first_name: String,
    pub last_name1: String,
    pub last_name2: Option<String>,
    pub gender: String,
    pub birth_date: String,
    pub activity_level: String,
    pub goal: String,
    pub created_at: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            first_name: patient.first_name,
            last_name1: patient.last_name1,
            last_name2: patient.last_name2,
            gender: patient.gender,
            birth_date: patient.birth_date.format(models::DATE_FORMAT).to_string(),
            activity_level: patient.activity_level.as_str().to_string(),
            goal: patient.goal.as_str().to_string(),
            created_at: format_ffi_timestamp(patient.created_at),
        }
    }
}

impl TryFrom<FfiPatient> for Patient {
    type Error = HealthLogError;

    fn try_from(patient: FfiPatient) -> Result<Self, Self::Error> {
        let birth_date = parse_ffi_date("birth date", &patient.birth_date)?;
        let activity_level = ActivityLevel::parse(&patient.activity_level).ok_or_else(|| {
            ValidationError::UnknownCategory {
                field: "activity level",
                value: patient.activity_level.clone(),
            }
        })?;
        let goal = Goal::parse(&patient.goal).ok_or_else(|| ValidationError::UnknownCategory {
            field: "goal",
            value: patient.goal.clone(),
        })?;

        Ok(Patient {
            id: patient.id,
            first_name: patient.first_name,
            last_name1: patient.last_name1,
            last_name2: patient.last_name2,
            gender: patient.gender,
            birth_date,
            activity_level,
            goal,
            // Store-owned
            created_at: None,
        })
    }
}

/// FFI-safe measurement. `bmi` is ignored on input and always recomputed.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMeasurement {
    pub id: i64,
    pub patient_id: i64,
    pub date: String,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub bmi: f64,
    pub body_fat_pct: Option<f64>,
    pub muscle_mass_pct: Option<f64>,
    pub notes: Option<String>,
    pub created_at: Option<String>,
}

impl From<Measurement> for FfiMeasurement {
    fn from(measurement: Measurement) -> Self {
        Self {
            id: measurement.id,
            patient_id: measurement.patient_id,
            date: measurement.date.format(models::DATE_FORMAT).to_string(),
            weight_kg: measurement.weight_kg,
            height_cm: measurement.height_cm,
            bmi: measurement.bmi,
            body_fat_pct: measurement.body_fat_pct,
            muscle_mass_pct: measurement.muscle_mass_pct,
            notes: measurement.notes,
            created_at: format_ffi_timestamp(measurement.created_at),
        }
    }
}

impl TryFrom<FfiMeasurement> for Measurement {
    type Error = HealthLogError;

    fn try_from(measurement: FfiMeasurement) -> Result<Self, Self::Error> {
        let date = parse_ffi_date("date", &measurement.date)?;

        let mut converted = Measurement::new(
            measurement.patient_id,
            date,
            measurement.weight_kg,
            measurement.height_cm,
        );
        converted.id = measurement.id;
        converted.body_fat_pct = measurement.body_fat_pct;
        converted.muscle_mass_pct = measurement.muscle_mass_pct;
        converted.notes = measurement.notes;
        Ok(converted)
    }
}

/// FFI-safe chart point.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChartPoint {
    pub timestamp_ms: i64,
    pub value: f64,
}

/// FFI-safe chart series with its axis window.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChartSeries {
    pub points: Vec<FfiChartPoint>,
    pub time_min_ms: i64,
    pub time_max_ms: i64,
    pub value_min: f64,
    pub value_max: f64,
    /// Smallest plotted value, if any
    pub data_min: Option<f64>,
    /// Largest plotted value, if any
    pub data_max: Option<f64>,
}

impl From<ChartSeries> for FfiChartSeries {
    fn from(series: ChartSeries) -> Self {
        Self {
            points: series
                .points
                .iter()
                .map(|p| FfiChartPoint {
                    timestamp_ms: p.timestamp_ms,
                    value: p.value,
                })
                .collect(),
            time_min_ms: series.range.time_min_ms,
            time_max_ms: series.range.time_max_ms,
            value_min: series.range.value_min,
            value_max: series.range.value_max,
            data_min: series.extent.map(|e| e.value_min),
            data_max: series.extent.map(|e| e.value_max),
        }
    }
}

/// FFI-safe weight and BMI series.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChartProjection {
    pub weight: FfiChartSeries,
    pub bmi: FfiChartSeries,
}

impl From<ChartProjection> for FfiChartProjection {
    fn from(projection: ChartProjection) -> Self {
        Self {
            weight: projection.weight.into(),
            bmi: projection.bmi.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ffi_patient() -> FfiPatient {
        FfiPatient {
            id: UNSAVED_ID,
            first_name: "Ana".into(),
            last_name1: "García".into(),
            last_name2: None,
            gender: "female".into(),
            birth_date: "1990-04-02".into(),
            activity_level: "moderate".into(),
            goal: "lose_weight".into(),
            created_at: None,
        }
    }

    fn ffi_measurement(patient_id: i64, date: &str, weight_kg: f64) -> FfiMeasurement {
        FfiMeasurement {
            id: UNSAVED_ID,
            patient_id,
            date: date.into(),
            weight_kg,
            height_cm: 165.0,
            bmi: 0.0,
            body_fat_pct: Some(28.0),
            muscle_mass_pct: None,
            notes: None,
            created_at: None,
        }
    }

    #[test]
    fn test_patient_lifecycle() {
        let core = open_database_in_memory().unwrap();

        let created = core.create_patient(ffi_patient()).unwrap();
        assert!(created.id > 0);
        assert!(created.created_at.is_some());

        let mut edited = created.clone();
        edited.goal = "improve_health".into();
        core.update_patient(edited).unwrap();

        let fetched = core.get_patient(created.id).unwrap().unwrap();
        assert_eq!(fetched.goal, "improve_health");
        assert_eq!(core.search_patients("garc".into()).unwrap().len(), 1);

        core.delete_patient(created.id).unwrap();
        assert!(core.list_patients().unwrap().is_empty());
        assert!(matches!(
            core.delete_patient(created.id),
            Err(HealthLogError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_ffi_input() {
        let core = open_database_in_memory().unwrap();

        let mut patient = ffi_patient();
        patient.birth_date = "02/04/1990".into();
        assert!(matches!(
            core.create_patient(patient),
            Err(HealthLogError::InvalidInput(_))
        ));

        let mut patient = ffi_patient();
        patient.activity_level = "couch".into();
        assert!(matches!(
            core.create_patient(patient),
            Err(HealthLogError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_measurement_lifecycle() {
        let core = open_database_in_memory().unwrap();
        let patient = core.create_patient(ffi_patient()).unwrap();

        let mut input = ffi_measurement(patient.id, "2024-01-15", 60.0);
        // Ignored on input
        input.bmi = 99.0;
        let created = core.add_measurement(input).unwrap();
        assert!(created.id > 0);
        assert_eq!(created.bmi, calculate_bmi(60.0, 165.0));

        let mut edited = created.clone();
        edited.weight_kg = 58.0;
        let updated = core.update_measurement(edited).unwrap();
        assert_eq!(updated.bmi, calculate_bmi(58.0, 165.0));
        assert_eq!(updated.created_at, created.created_at);

        let latest = core.latest_measurement(patient.id).unwrap().unwrap();
        assert_eq!(latest.id, created.id);

        core.delete_measurement(created.id).unwrap();
        assert!(core.get_measurement(created.id).unwrap().is_none());
        assert!(core.list_measurements(patient.id).unwrap().is_empty());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let core = open_database_in_memory().unwrap();
        let patient = core.create_patient(ffi_patient()).unwrap();

        let result = core.add_measurement(ffi_measurement(patient.id, "2024-01-15", -1.0));
        assert!(matches!(result, Err(HealthLogError::InvalidInput(_))));
        assert!(core.list_measurements(patient.id).unwrap().is_empty());
    }

    #[test]
    fn test_patient_charts() {
        let core = open_database_in_memory().unwrap();
        let patient = core.create_patient(ffi_patient()).unwrap();

        core.add_measurement(ffi_measurement(patient.id, "2024-01-20", 61.0))
            .unwrap();
        core.add_measurement(ffi_measurement(patient.id, "2024-01-10", 62.0))
            .unwrap();

        let charts = core.patient_charts(patient.id).unwrap();
        assert_eq!(charts.weight.points.len(), 2);
        assert!(charts.weight.points[0].timestamp_ms < charts.weight.points[1].timestamp_ms);
        assert_eq!(charts.weight.data_min, Some(61.0));
        assert_eq!(charts.weight.data_max, Some(62.0));

        let json = core.patient_charts_json(patient.id).unwrap();
        assert!(json.contains("\"bmi\""));

        assert!(matches!(
            core.patient_charts(patient.id + 1),
            Err(HealthLogError::NotFound(_))
        ));
    }

    #[test]
    fn test_free_functions() {
        assert!((calculate_bmi(70.0, 175.0) - 22.857).abs() < 0.001);
        assert_eq!(calculate_bmi(70.0, 0.0), 0.0);

        enable_logging();
        assert!(!enable_logging());
    }
}
