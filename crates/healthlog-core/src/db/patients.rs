//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::metrics::{self, ValidationError};
use crate::models::{self, ActivityLevel, Goal, Patient, DATE_FORMAT};

const PATIENT_COLUMNS: &str = "id, first_name, last_name1, last_name2, gender, birth_date, \
                               activity_level, goal, created_at";

/// CRUD over patient records.
pub struct PatientRepository<'a> {
    db: &'a Database,
}

impl<'a> PatientRepository<'a> {
    /// Create a repository over the given database.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new patient.
    ///
    /// On success the generated id and creation timestamp are written back
    /// into `patient`. A blank second surname is stored as absent.
    pub fn create(&self, patient: &mut Patient) -> DbResult<i64> {
        if let Err(e) = metrics::validate_patient(patient) {
            tracing::warn!(error = %e, "rejected patient");
            return Err(e.into());
        }

        self.db.conn.execute(
            r#"
            INSERT INTO patients (
                first_name, last_name1, last_name2, gender,
                birth_date, activity_level, goal
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                patient.first_name,
                patient.last_name1,
                present(&patient.last_name2),
                patient.gender,
                patient.birth_date.format(DATE_FORMAT).to_string(),
                patient.activity_level.as_str(),
                patient.goal.as_str(),
            ],
        )?;
        let id = self.db.conn.last_insert_rowid();

        let stored = self
            .get_by_id(id)?
            .ok_or(DbError::NotFound { entity: "patient", id })?;
        patient.id = stored.id;
        patient.last_name2 = stored.last_name2;
        patient.created_at = stored.created_at;

        tracing::info!(patient_id = id, "patient created");
        Ok(id)
    }

    /// Get a patient by id.
    pub fn get_by_id(&self, id: i64) -> DbResult<Option<Patient>> {
        if id <= 0 {
            return Ok(None);
        }
        self.db
            .conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?"),
                [id],
                PatientRow::from_row,
            )
            .optional()?
            .map(Patient::try_from)
            .transpose()
    }

    /// List all patients, ordered by first name.
    pub fn list_all(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.db.conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY first_name ASC, id ASC"
        ))?;

        let rows = stmt.query_map([], PatientRow::from_row)?;

        let mut patients: Vec<Patient> = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        tracing::debug!(count = patients.len(), "listed patients");
        Ok(patients)
    }

    /// Search patients by first name or surnames (case-insensitive substring).
    ///
    /// A blank term returns every patient.
    pub fn search(&self, term: &str) -> DbResult<Vec<Patient>> {
        let patients = self.list_all()?;
        if term.trim().is_empty() {
            return Ok(patients);
        }
        Ok(patients
            .into_iter()
            .filter(|p| p.matches_name(term))
            .collect())
    }

    /// Overwrite the demographic fields of an existing patient.
    pub fn update(&self, patient: &Patient) -> DbResult<()> {
        if patient.id <= 0 {
            tracing::warn!(patient_id = patient.id, "cannot update unsaved patient");
            return Err(ValidationError::InvalidId(patient.id).into());
        }
        metrics::validate_patient(patient)?;

        let rows_affected = self.db.conn.execute(
            r#"
            UPDATE patients SET
                first_name = ?2,
                last_name1 = ?3,
                last_name2 = ?4,
                gender = ?5,
                birth_date = ?6,
                activity_level = ?7,
                goal = ?8
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.first_name,
                patient.last_name1,
                present(&patient.last_name2),
                patient.gender,
                patient.birth_date.format(DATE_FORMAT).to_string(),
                patient.activity_level.as_str(),
                patient.goal.as_str(),
            ],
        )?;

        if rows_affected == 0 {
            tracing::warn!(patient_id = patient.id, "patient not found for update");
            return Err(DbError::NotFound { entity: "patient", id: patient.id });
        }
        tracing::info!(patient_id = patient.id, "patient updated");
        Ok(())
    }

    /// Delete a patient together with all of its measurements.
    ///
    /// The measurements are removed explicitly in the same transaction, so
    /// no orphan survives even when the connection has foreign keys off.
    pub fn delete(&self, id: i64) -> DbResult<()> {
        if id <= 0 {
            return Err(ValidationError::InvalidId(id).into());
        }

        let tx = self.db.conn.unchecked_transaction()?;
        // Same connection, so this runs inside `tx`
        let removed = self.db.measurements().delete_for_patient(id)?;
        let rows_affected = tx.execute("DELETE FROM patients WHERE id = ?", [id])?;
        if rows_affected == 0 {
            // Dropping the transaction rolls back
            tracing::warn!(patient_id = id, "patient not found for delete");
            return Err(DbError::NotFound { entity: "patient", id });
        }
        tx.commit()?;

        tracing::info!(patient_id = id, measurements = removed, "patient deleted");
        Ok(())
    }

    /// Check whether a patient id refers to a stored record.
    pub fn exists(&self, id: i64) -> DbResult<bool> {
        if id <= 0 {
            return Ok(false);
        }
        let found: Option<i64> = self
            .db
            .conn
            .query_row("SELECT 1 FROM patients WHERE id = ?", [id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }
}

/// Optional name part, with a blank value stored as NULL.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: i64,
    first_name: String,
    last_name1: String,
    last_name2: Option<String>,
    gender: String,
    birth_date: String,
    activity_level: String,
    goal: String,
    created_at: String,
}

impl PatientRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name1: row.get(2)?,
            last_name2: row.get(3)?,
            gender: row.get(4)?,
            birth_date: row.get(5)?,
            activity_level: row.get(6)?,
            goal: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let birth_date = models::parse_date(&row.birth_date).ok_or_else(|| {
            DbError::Corrupt(format!("patient {}: birth date {:?}", row.id, row.birth_date))
        })?;
        let activity_level = ActivityLevel::parse(&row.activity_level).ok_or_else(|| {
            DbError::Corrupt(format!("patient {}: activity level {:?}", row.id, row.activity_level))
        })?;
        let goal = Goal::parse(&row.goal).ok_or_else(|| {
            DbError::Corrupt(format!("patient {}: goal {:?}", row.id, row.goal))
        })?;
        let created_at = models::parse_timestamp(&row.created_at).ok_or_else(|| {
            DbError::Corrupt(format!("patient {}: created_at {:?}", row.id, row.created_at))
        })?;

        Ok(Patient {
            id: row.id,
            first_name: row.first_name,
            last_name1: row.last_name1,
            last_name2: row.last_name2,
            gender: row.gender,
            birth_date,
            activity_level,
            goal,
            created_at: Some(created_at),
        })
    }
}
