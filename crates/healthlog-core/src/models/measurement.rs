//! Measurement models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::UNSAVED_ID;
use crate::metrics;

/// One dated body measurement belonging to a patient.
///
/// `bmi` is derived from `weight_kg` and `height_cm` and is kept in step by
/// [`Measurement::recompute_bmi`]; repositories call it on every write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    /// Storage-assigned id, [`UNSAVED_ID`] until persisted
    pub id: i64,
    /// Owning patient
    pub patient_id: i64,
    /// Observation date (no time of day)
    pub date: NaiveDate,
    /// Weight in kg
    pub weight_kg: f64,
    /// Height in cm
    pub height_cm: f64,
    /// Body-mass index, 0 until computed
    pub bmi: f64,
    /// Body fat, percent of body weight
    pub body_fat_pct: Option<f64>,
    /// Muscle mass, percent of body weight
    pub muscle_mass_pct: Option<f64>,
    pub notes: Option<String>,
    /// Storage-assigned creation timestamp, `None` until persisted
    pub created_at: Option<NaiveDateTime>,
}

impl Measurement {
    /// Create an unsaved measurement with BMI already computed.
    pub fn new(patient_id: i64, date: NaiveDate, weight_kg: f64, height_cm: f64) -> Self {
        let mut measurement = Self {
            id: UNSAVED_ID,
            patient_id,
            date,
            weight_kg,
            height_cm,
            bmi: 0.0,
            body_fat_pct: None,
            muscle_mass_pct: None,
            notes: None,
            created_at: None,
        };
        measurement.recompute_bmi();
        measurement
    }

    /// Bring `bmi` back in line with weight and height.
    pub fn recompute_bmi(&mut self) {
        self.bmi = metrics::compute_bmi(self.weight_kg, self.height_cm);
    }

    /// Check if this measurement has been persisted.
    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    /// Validate the user-entered values.
    pub fn validate(&self) -> Result<(), metrics::ValidationError> {
        metrics::validate_measurement_input(
            self.weight_kg,
            self.height_cm,
            self.body_fat_pct,
            self.muscle_mass_pct,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_measurement_computes_bmi() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let measurement = Measurement::new(1, date, 70.0, 175.0);

        assert_eq!(measurement.id, UNSAVED_ID);
        assert!(!measurement.is_persisted());
        assert!((measurement.bmi - 22.857).abs() < 0.001);
    }

    #[test]
    fn test_recompute_after_edit() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut measurement = Measurement::new(1, date, 70.0, 175.0);

        measurement.weight_kg = 80.0;
        measurement.recompute_bmi();
        assert_eq!(measurement.bmi, metrics::compute_bmi(80.0, 175.0));

        measurement.height_cm = 0.0;
        measurement.recompute_bmi();
        assert_eq!(measurement.bmi, 0.0);
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let measurement = Measurement::new(1, date, -1.0, 175.0);
        assert!(measurement.validate().is_err());
    }
}
