//! SQLite schema definition.

/// Complete database schema for the health log.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name1 TEXT NOT NULL,
    last_name2 TEXT,
    gender TEXT NOT NULL,
    birth_date TEXT NOT NULL,                    -- YYYY-MM-DD
    activity_level TEXT NOT NULL,                -- sedentary, light, moderate, active, very_active
    goal TEXT NOT NULL,                          -- lose_weight, maintain_weight, gain_muscle, improve_health, other
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%f', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_first_name ON patients(first_name);

-- ============================================================================
-- Measurements
-- ============================================================================

CREATE TABLE IF NOT EXISTS measurements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    date TEXT NOT NULL,                          -- YYYY-MM-DD
    weight REAL NOT NULL CHECK (weight > 0),
    height REAL NOT NULL CHECK (height > 0),
    bmi REAL NOT NULL DEFAULT 0 CHECK (bmi >= 0),
    body_fat_pct REAL CHECK (body_fat_pct IS NULL OR (body_fat_pct >= 0 AND body_fat_pct <= 100)),
    muscle_mass_pct REAL CHECK (muscle_mass_pct IS NULL OR (muscle_mass_pct >= 0 AND muscle_mass_pct <= 100)),
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%f', 'now'))
);

-- Serves listByPatient ordering
CREATE INDEX IF NOT EXISTS idx_measurements_patient_date
    ON measurements(patient_id, date, created_at);
"#;
