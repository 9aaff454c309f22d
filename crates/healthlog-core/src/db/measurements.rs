//! Measurement database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult, PatientRepository};
use crate::metrics::ValidationError;
use crate::models::{self, Measurement, DATE_FORMAT};

const MEASUREMENT_COLUMNS: &str = "id, patient_id, date, weight, height, bmi, body_fat_pct, \
                                   muscle_mass_pct, notes, created_at";

/// CRUD over measurement records.
///
/// Listings come back ordered by `(date, created_at)` with the row id as a
/// final tie-breaker.
pub struct MeasurementRepository<'a> {
    db: &'a Database,
}

impl<'a> MeasurementRepository<'a> {
    /// Create a repository over the given database.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new measurement.
    ///
    /// BMI is recomputed before writing; the generated id, creation timestamp
    /// and BMI are written back into `measurement`.
    pub fn create(&self, measurement: &mut Measurement) -> DbResult<i64> {
        self.check_writable(measurement)?;
        measurement.recompute_bmi();

        self.db.conn.execute(
            r#"
            INSERT INTO measurements (
                patient_id, date, weight, height, bmi,
                body_fat_pct, muscle_mass_pct, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                measurement.patient_id,
                measurement.date.format(DATE_FORMAT).to_string(),
                measurement.weight_kg,
                measurement.height_cm,
                measurement.bmi,
                measurement.body_fat_pct,
                measurement.muscle_mass_pct,
                measurement.notes,
            ],
        )?;
        let id = self.db.conn.last_insert_rowid();

        let stored = self
            .get_by_id(id)?
            .ok_or(DbError::NotFound { entity: "measurement", id })?;
        measurement.id = stored.id;
        measurement.created_at = stored.created_at;

        tracing::info!(
            measurement_id = id,
            patient_id = measurement.patient_id,
            "measurement created"
        );
        Ok(id)
    }

    /// Get a measurement by id.
    pub fn get_by_id(&self, id: i64) -> DbResult<Option<Measurement>> {
        if id <= 0 {
            return Ok(None);
        }
        self.db
            .conn
            .query_row(
                &format!("SELECT {MEASUREMENT_COLUMNS} FROM measurements WHERE id = ?"),
                [id],
                MeasurementRow::from_row,
            )
            .optional()?
            .map(Measurement::try_from)
            .transpose()
    }

    /// List a patient's measurements, oldest first.
    pub fn list_by_patient(&self, patient_id: i64) -> DbResult<Vec<Measurement>> {
        let mut stmt = self.db.conn.prepare(&format!(
            r#"
            SELECT {MEASUREMENT_COLUMNS}
            FROM measurements
            WHERE patient_id = ?
            ORDER BY date ASC, created_at ASC, id ASC
            "#
        ))?;

        let rows = stmt.query_map([patient_id], MeasurementRow::from_row)?;

        let mut measurements: Vec<Measurement> = Vec::new();
        for row in rows {
            measurements.push(row?.try_into()?);
        }
        tracing::debug!(patient_id, count = measurements.len(), "listed measurements");
        Ok(measurements)
    }

    /// Most recent measurement of a patient, by the same ordering as
    /// [`list_by_patient`](Self::list_by_patient).
    pub fn latest_for_patient(&self, patient_id: i64) -> DbResult<Option<Measurement>> {
        self.db
            .conn
            .query_row(
                &format!(
                    r#"
                    SELECT {MEASUREMENT_COLUMNS}
                    FROM measurements
                    WHERE patient_id = ?
                    ORDER BY date DESC, created_at DESC, id DESC
                    LIMIT 1
                    "#
                ),
                [patient_id],
                MeasurementRow::from_row,
            )
            .optional()?
            .map(Measurement::try_from)
            .transpose()
    }

    /// Overwrite every field of an existing measurement.
    ///
    /// BMI is recomputed from the new weight and height and written back
    /// into `measurement`. The creation timestamp is left untouched.
    pub fn update(&self, measurement: &mut Measurement) -> DbResult<()> {
        if measurement.id <= 0 {
            tracing::warn!(measurement_id = measurement.id, "cannot update unsaved measurement");
            return Err(ValidationError::InvalidId(measurement.id).into());
        }
        self.check_writable(measurement)?;
        measurement.recompute_bmi();

        let rows_affected = self.db.conn.execute(
            r#"
            UPDATE measurements SET
                patient_id = ?2,
                date = ?3,
                weight = ?4,
                height = ?5,
                bmi = ?6,
                body_fat_pct = ?7,
                muscle_mass_pct = ?8,
                notes = ?9
            WHERE id = ?1
            "#,
            params![
                measurement.id,
                measurement.patient_id,
                measurement.date.format(DATE_FORMAT).to_string(),
                measurement.weight_kg,
                measurement.height_cm,
                measurement.bmi,
                measurement.body_fat_pct,
                measurement.muscle_mass_pct,
                measurement.notes,
            ],
        )?;

        if rows_affected == 0 {
            tracing::warn!(measurement_id = measurement.id, "measurement not found for update");
            return Err(DbError::NotFound { entity: "measurement", id: measurement.id });
        }
        tracing::info!(measurement_id = measurement.id, "measurement updated");
        Ok(())
    }

    /// Delete a measurement.
    pub fn delete(&self, id: i64) -> DbResult<()> {
        if id <= 0 {
            return Err(ValidationError::InvalidId(id).into());
        }

        let rows_affected = self
            .db
            .conn
            .execute("DELETE FROM measurements WHERE id = ?", [id])?;
        if rows_affected == 0 {
            tracing::warn!(measurement_id = id, "measurement not found for delete");
            return Err(DbError::NotFound { entity: "measurement", id });
        }
        tracing::info!(measurement_id = id, "measurement deleted");
        Ok(())
    }

    /// Delete every measurement of a patient, returning how many went.
    pub fn delete_for_patient(&self, patient_id: i64) -> DbResult<usize> {
        let removed = self
            .db
            .conn
            .execute("DELETE FROM measurements WHERE patient_id = ?", [patient_id])?;
        tracing::info!(patient_id, removed, "measurements deleted for patient");
        Ok(removed)
    }

    /// Input validation and referential integrity, checked before any write.
    fn check_writable(&self, measurement: &Measurement) -> DbResult<()> {
        if let Err(e) = measurement.validate() {
            tracing::warn!(error = %e, "rejected measurement");
            return Err(e.into());
        }
        if !PatientRepository::new(self.db).exists(measurement.patient_id)? {
            tracing::warn!(patient_id = measurement.patient_id, "measurement for unknown patient");
            return Err(ValidationError::UnknownPatient(measurement.patient_id).into());
        }
        Ok(())
    }
}

/// Intermediate row struct for database mapping.
struct MeasurementRow {
    id: i64,
    patient_id: i64,
    date: String,
    weight_kg: f64,
    height_cm: f64,
    bmi: f64,
    body_fat_pct: Option<f64>,
    muscle_mass_pct: Option<f64>,
    notes: Option<String>,
    created_at: String,
}

impl MeasurementRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            date: row.get(2)?,
            weight_kg: row.get(3)?,
            height_cm: row.get(4)?,
            bmi: row.get(5)?,
            body_fat_pct: row.get(6)?,
            muscle_mass_pct: row.get(7)?,
            notes: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

impl TryFrom<MeasurementRow> for Measurement {
    type Error = DbError;

    fn try_from(row: MeasurementRow) -> Result<Self, Self::Error> {
        let date = models::parse_date(&row.date).ok_or_else(|| {
            DbError::Corrupt(format!("measurement {}: date {:?}", row.id, row.date))
        })?;
        let created_at = models::parse_timestamp(&row.created_at).ok_or_else(|| {
            DbError::Corrupt(format!("measurement {}: created_at {:?}", row.id, row.created_at))
        })?;

        Ok(Measurement {
            id: row.id,
            patient_id: row.patient_id,
            date,
            weight_kg: row.weight_kg,
            height_cm: row.height_cm,
            bmi: row.bmi,
            body_fat_pct: row.body_fat_pct,
            muscle_mass_pct: row.muscle_mass_pct,
            notes: row.notes,
            created_at: Some(created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ErrorKind;
    use crate::metrics::compute_bmi;
    use crate::models::{ActivityLevel, Goal, Patient, UNSAVED_ID};
    use chrono::NaiveDate;

    fn setup_db() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let mut patient = Patient::new(
            "Ana".into(),
            "García".into(),
            "female".into(),
            NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
            ActivityLevel::Active,
            Goal::LoseWeight,
        );
        let id = db.patients().create(&mut patient).unwrap();
        (db, id)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let (db, patient_id) = setup_db();
        let repo = db.measurements();

        let mut measurement = Measurement::new(patient_id, day(15), 70.0, 175.0);
        measurement.body_fat_pct = Some(21.5);
        measurement.muscle_mass_pct = Some(38.0);
        measurement.notes = Some("after holidays".into());

        let id = repo.create(&mut measurement).unwrap();
        assert_eq!(measurement.id, id);
        assert!(measurement.created_at.is_some());

        let retrieved = repo.get_by_id(id).unwrap().unwrap();
        assert_eq!(retrieved, measurement);
        assert_eq!(retrieved.bmi, compute_bmi(70.0, 175.0));
    }

    #[test]
    fn test_create_computes_bmi() {
        let (db, patient_id) = setup_db();
        let repo = db.measurements();

        let mut measurement = Measurement::new(patient_id, day(15), 70.0, 175.0);
        measurement.bmi = 0.0;
        repo.create(&mut measurement).unwrap();

        let retrieved = repo.get_by_id(measurement.id).unwrap().unwrap();
        assert!((retrieved.bmi - 22.857).abs() < 0.001);
    }

    #[test]
    fn test_create_rejects_invalid_input() {
        let (db, patient_id) = setup_db();
        let repo = db.measurements();

        let mut measurement = Measurement::new(patient_id, day(15), -1.0, 175.0);
        let err = repo.create(&mut measurement).unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::NonPositive { field: "weight", .. })
        ));
        assert_eq!(measurement.id, UNSAVED_ID);
        assert!(repo.list_by_patient(patient_id).unwrap().is_empty());

        let mut extreme = Measurement::new(patient_id, day(15), 1e308, 1.0);
        let err = repo.create(&mut extreme).unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::BmiOutOfRange { .. })
        ));
        assert!(repo.list_by_patient(patient_id).unwrap().is_empty());
    }

    #[test]
    fn test_create_rejects_unknown_patient() {
        let (db, patient_id) = setup_db();
        let repo = db.measurements();

        let mut measurement = Measurement::new(patient_id + 100, day(15), 70.0, 175.0);
        let err = repo.create(&mut measurement).unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::UnknownPatient(_))
        ));
    }

    #[test]
    fn test_list_by_patient_ordering() {
        let (db, patient_id) = setup_db();
        let repo = db.measurements();

        let mut ids = Vec::new();
        for (d, weight) in [(20, 71.0), (10, 73.0), (15, 72.0), (10, 72.5)] {
            let mut m = Measurement::new(patient_id, day(d), weight, 175.0);
            ids.push(repo.create(&mut m).unwrap());
        }

        let listed = repo.list_by_patient(patient_id).unwrap();
        let weights: Vec<f64> = listed.iter().map(|m| m.weight_kg).collect();
        // Same date keeps insertion order
        assert_eq!(weights, vec![73.0, 72.5, 72.0, 71.0]);
        assert_eq!(listed[0].id, ids[1]);
        assert_eq!(listed[1].id, ids[3]);
    }

    #[test]
    fn test_list_by_patient_isolated() {
        let (db, patient_id) = setup_db();
        let repo = db.measurements();

        repo.create(&mut Measurement::new(patient_id, day(1), 70.0, 175.0))
            .unwrap();

        assert!(repo.list_by_patient(patient_id + 1).unwrap().is_empty());
    }

    #[test]
    fn test_latest_for_patient() {
        let (db, patient_id) = setup_db();
        let repo = db.measurements();

        assert!(repo.latest_for_patient(patient_id).unwrap().is_none());

        repo.create(&mut Measurement::new(patient_id, day(20), 71.0, 175.0))
            .unwrap();
        repo.create(&mut Measurement::new(patient_id, day(5), 74.0, 175.0))
            .unwrap();
        let mut last = Measurement::new(patient_id, day(20), 70.5, 175.0);
        repo.create(&mut last).unwrap();

        let latest = repo.latest_for_patient(patient_id).unwrap().unwrap();
        assert_eq!(latest.id, last.id);
    }

    #[test]
    fn test_update_recomputes_bmi() {
        let (db, patient_id) = setup_db();
        let repo = db.measurements();

        let mut measurement = Measurement::new(patient_id, day(15), 70.0, 175.0);
        repo.create(&mut measurement).unwrap();
        let created_at = measurement.created_at;

        measurement.weight_kg = 80.0;
        measurement.height_cm = 180.0;
        measurement.notes = Some("edited".into());
        repo.update(&mut measurement).unwrap();
        assert_eq!(measurement.bmi, compute_bmi(80.0, 180.0));

        let retrieved = repo.get_by_id(measurement.id).unwrap().unwrap();
        assert_eq!(retrieved.bmi, compute_bmi(80.0, 180.0));
        assert_eq!(retrieved.notes, Some("edited".into()));
        assert_eq!(retrieved.created_at, created_at);
    }

    #[test]
    fn test_update_errors() {
        let (db, patient_id) = setup_db();
        let repo = db.measurements();

        let mut unsaved = Measurement::new(patient_id, day(15), 70.0, 175.0);
        assert_eq!(repo.update(&mut unsaved).unwrap_err().kind(), ErrorKind::Validation);

        let mut ghost = Measurement::new(patient_id, day(15), 70.0, 175.0);
        ghost.id = 999;
        assert_eq!(repo.update(&mut ghost).unwrap_err().kind(), ErrorKind::NotFound);

        let mut stored = Measurement::new(patient_id, day(15), 70.0, 175.0);
        repo.create(&mut stored).unwrap();
        stored.muscle_mass_pct = Some(140.0);
        assert_eq!(repo.update(&mut stored).unwrap_err().kind(), ErrorKind::Validation);

        stored.muscle_mass_pct = None;
        stored.patient_id = patient_id + 50;
        assert!(matches!(
            repo.update(&mut stored).unwrap_err(),
            DbError::Validation(ValidationError::UnknownPatient(_))
        ));
    }

    #[test]
    fn test_delete() {
        let (db, patient_id) = setup_db();
        let repo = db.measurements();

        let mut measurement = Measurement::new(patient_id, day(15), 70.0, 175.0);
        let id = repo.create(&mut measurement).unwrap();

        repo.delete(id).unwrap();
        assert!(repo.get_by_id(id).unwrap().is_none());

        assert_eq!(repo.delete(id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(repo.delete(-1).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_delete_for_patient() {
        let (db, patient_id) = setup_db();
        let repo = db.measurements();

        for d in 1..=4 {
            repo.create(&mut Measurement::new(patient_id, day(d), 70.0, 175.0))
                .unwrap();
        }

        assert_eq!(repo.delete_for_patient(patient_id).unwrap(), 4);
        assert_eq!(repo.delete_for_patient(patient_id).unwrap(), 0);
        assert!(db.patients().get_by_id(patient_id).unwrap().is_some());
    }
}
