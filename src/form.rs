//! Evaluation form state: fifteen text inputs and their coercion.
//!
//! Values are kept as the user typed them. Conversion to numbers happens
//! only in `EvaluationForm::to_observation`, at submit time.

use thiserror::Error;

use crate::models::{ChestPainType, PatientObservation, Sex, YesNo};

// ═══════════════════════════════════════════
// Field catalogue
// ═══════════════════════════════════════════

pub const SEX_OPTIONS: &[(u8, &str)] = &[(1, "Male"), (0, "Female")];
pub const YES_NO_OPTIONS: &[(u8, &str)] = &[(1, "Yes"), (0, "No")];
pub const SMOKER_OPTIONS: &[(u8, &str)] = &[(1, "Yes (current)"), (0, "No (never)")];
pub const ALCOHOL_OPTIONS: &[(u8, &str)] = &[(1, "Frequent / heavy"), (0, "Occasional / none")];
pub const CHEST_PAIN_OPTIONS: &[(u8, &str)] = &[
    (0, "Typical angina"),
    (1, "Atypical angina"),
    (2, "Non-anginal pain"),
    (3, "Asymptomatic"),
];

/// How a field's text is coerced and checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Whole number, inclusive bounds.
    Integer { min: i64, max: Option<i64> },
    /// Any finite number above (or at, when `inclusive`) `min`.
    Number { min: f64, inclusive: bool },
    /// One of a fixed set of codes.
    Choice(&'static [(u8, &'static str)]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Age,
    Sex,
    SerumCholesterol,
    RestingBloodPressure,
    MaxHeartRate,
    CurrentSmoker,
    HeavyAlcoholUse,
    WeeklyExerciseHours,
    FamilyHistory,
    HasDiabetes,
    HasObesity,
    StressLevel,
    FastingSugarLevel,
    ExerciseInducedAngina,
    ChestPainType,
}

impl FieldId {
    pub const COUNT: usize = 15;

    pub const ALL: [FieldId; Self::COUNT] = [
        FieldId::Age,
        FieldId::Sex,
        FieldId::SerumCholesterol,
        FieldId::RestingBloodPressure,
        FieldId::MaxHeartRate,
        FieldId::CurrentSmoker,
        FieldId::HeavyAlcoholUse,
        FieldId::WeeklyExerciseHours,
        FieldId::FamilyHistory,
        FieldId::HasDiabetes,
        FieldId::HasObesity,
        FieldId::StressLevel,
        FieldId::FastingSugarLevel,
        FieldId::ExerciseInducedAngina,
        FieldId::ChestPainType,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Form key (HTML `name`) of the field.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Sex => "sex",
            Self::SerumCholesterol => "serum_cholesterol",
            Self::RestingBloodPressure => "resting_blood_pressure",
            Self::MaxHeartRate => "max_heart_rate",
            Self::CurrentSmoker => "current_smoker",
            Self::HeavyAlcoholUse => "heavy_alcohol_use",
            Self::WeeklyExerciseHours => "weekly_exercise_hours",
            Self::FamilyHistory => "family_history",
            Self::HasDiabetes => "has_diabetes",
            Self::HasObesity => "has_obesity",
            Self::StressLevel => "stress_level",
            Self::FastingSugarLevel => "fasting_sugar_level",
            Self::ExerciseInducedAngina => "exercise_induced_angina",
            Self::ChestPainType => "chest_pain_type",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::Sex => "Sex",
            Self::SerumCholesterol => "Serum cholesterol (mg/dl)",
            Self::RestingBloodPressure => "Resting blood pressure",
            Self::MaxHeartRate => "Max heart rate",
            Self::CurrentSmoker => "Smoker",
            Self::HeavyAlcoholUse => "Alcohol intake",
            Self::WeeklyExerciseHours => "Exercise hours (weekly)",
            Self::FamilyHistory => "Family history",
            Self::HasDiabetes => "Diabetes",
            Self::HasObesity => "Obesity",
            Self::StressLevel => "Stress level (1-10)",
            Self::FastingSugarLevel => "Blood sugar (fasting)",
            Self::ExerciseInducedAngina => "Exercise-induced angina",
            Self::ChestPainType => "Chest pain type",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Age => FieldKind::Integer { min: 1, max: Some(i64::from(u32::MAX)) },
            Self::StressLevel => FieldKind::Integer { min: 1, max: Some(10) },
            Self::SerumCholesterol
            | Self::RestingBloodPressure
            | Self::MaxHeartRate
            | Self::FastingSugarLevel => FieldKind::Number { min: 0.0, inclusive: false },
            Self::WeeklyExerciseHours => FieldKind::Number { min: 0.0, inclusive: true },
            Self::Sex => FieldKind::Choice(SEX_OPTIONS),
            Self::CurrentSmoker => FieldKind::Choice(SMOKER_OPTIONS),
            Self::HeavyAlcoholUse => FieldKind::Choice(ALCOHOL_OPTIONS),
            Self::ChestPainType => FieldKind::Choice(CHEST_PAIN_OPTIONS),
            Self::FamilyHistory
            | Self::HasDiabetes
            | Self::HasObesity
            | Self::ExerciseInducedAngina => FieldKind::Choice(YES_NO_OPTIONS),
        }
    }

    /// Initial text of the field in a fresh form.
    ///
    /// Binary risk factors start at "no"; measurements start empty.
    pub fn default_value(&self) -> &'static str {
        match self {
            Self::Sex => "1",
            Self::ChestPainType => "1",
            Self::CurrentSmoker
            | Self::HeavyAlcoholUse
            | Self::FamilyHistory
            | Self::HasDiabetes
            | Self::HasObesity
            | Self::ExerciseInducedAngina => "0",
            _ => "",
        }
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ═══════════════════════════════════════════
// Validation errors
// ═══════════════════════════════════════════

/// Input that cannot become a `PatientObservation`.
///
/// Messages only restate the user's own input and are safe to display.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: FieldId },

    #[error("{field} must be a number (got \"{value}\")")]
    NotANumber { field: FieldId, value: String },

    #[error("{field} must be a whole number (got \"{value}\")")]
    NotAnInteger { field: FieldId, value: String },

    #[error("{field} must be {bound}")]
    OutOfRange { field: FieldId, bound: String },

    #[error("{field} has no option \"{value}\"")]
    UnknownOption { field: FieldId, value: String },
}

impl ValidationError {
    pub fn field(&self) -> FieldId {
        match self {
            Self::Missing { field }
            | Self::NotANumber { field, .. }
            | Self::NotAnInteger { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::UnknownOption { field, .. } => *field,
        }
    }
}

// ═══════════════════════════════════════════
// EvaluationForm
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationForm {
    values: [String; FieldId::COUNT],
}

impl Default for EvaluationForm {
    fn default() -> Self {
        Self {
            values: FieldId::ALL.map(|f| f.default_value().to_string()),
        }
    }
}

impl EvaluationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: FieldId) -> &str {
        &self.values[field.index()]
    }

    /// Store raw text. No parsing happens here.
    pub fn set(&mut self, field: FieldId, value: impl Into<String>) {
        self.values[field.index()] = value.into();
    }

    /// Set by form key. Returns false for keys that name no field.
    pub fn set_by_key(&mut self, key: &str, value: &str) -> bool {
        match FieldId::from_key(key) {
            Some(field) => {
                self.set(field, value);
                true
            }
            None => false,
        }
    }

    /// Back to the initial values.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &str)> {
        FieldId::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    /// Coerce every field and build the request payload.
    ///
    /// Fails on the first field (in catalogue order) that is blank,
    /// unparsable, or outside its domain.
    pub fn to_observation(&self) -> Result<PatientObservation, ValidationError> {
        Ok(PatientObservation {
            age: u32::try_from(self.integer(FieldId::Age)?)
                .map_err(|_| out_of_range(FieldId::Age))?,
            sex: self.code(FieldId::Sex, Sex::from_code)?,
            serum_cholesterol: self.number(FieldId::SerumCholesterol)?,
            resting_blood_pressure: self.number(FieldId::RestingBloodPressure)?,
            max_heart_rate: self.number(FieldId::MaxHeartRate)?,
            current_smoker: self.code(FieldId::CurrentSmoker, YesNo::from_code)?,
            heavy_alcohol_use: self.code(FieldId::HeavyAlcoholUse, YesNo::from_code)?,
            weekly_exercise_hours: self.number(FieldId::WeeklyExerciseHours)?,
            family_history: self.code(FieldId::FamilyHistory, YesNo::from_code)?,
            has_diabetes: self.code(FieldId::HasDiabetes, YesNo::from_code)?,
            has_obesity: self.code(FieldId::HasObesity, YesNo::from_code)?,
            stress_level: u8::try_from(self.integer(FieldId::StressLevel)?)
                .map_err(|_| out_of_range(FieldId::StressLevel))?,
            fasting_sugar_level: self.number(FieldId::FastingSugarLevel)?,
            exercise_induced_angina: self.code(FieldId::ExerciseInducedAngina, YesNo::from_code)?,
            chest_pain_type: self.code(FieldId::ChestPainType, ChestPainType::from_code)?,
        })
    }

    // ── Coercion helpers ─────────────────────────────

    fn numeric(&self, field: FieldId) -> Result<f64, ValidationError> {
        let raw = self.get(field).trim();
        if raw.is_empty() {
            return Err(ValidationError::Missing { field });
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(ValidationError::NotANumber {
                field,
                value: raw.to_string(),
            }),
        }
    }

    fn number(&self, field: FieldId) -> Result<f64, ValidationError> {
        let value = self.numeric(field)?;
        if let FieldKind::Number { min, inclusive } = field.kind() {
            let ok = if inclusive { value >= min } else { value > min };
            if !ok {
                return Err(out_of_range(field));
            }
        }
        Ok(value)
    }

    fn integer(&self, field: FieldId) -> Result<i64, ValidationError> {
        let value = self.numeric(field)?;
        if value.fract() != 0.0 {
            return Err(ValidationError::NotAnInteger {
                field,
                value: self.get(field).trim().to_string(),
            });
        }
        if let FieldKind::Integer { min, max } = field.kind() {
            if value < min as f64 || max.is_some_and(|max| value > max as f64) {
                return Err(out_of_range(field));
            }
        }
        Ok(value as i64)
    }

    fn code<T, E>(&self, field: FieldId, decode: fn(u8) -> Result<T, E>) -> Result<T, ValidationError> {
        let raw = self.get(field).trim();
        if raw.is_empty() {
            return Err(ValidationError::Missing { field });
        }
        raw.parse::<u8>()
            .ok()
            .and_then(|code| decode(code).ok())
            .ok_or_else(|| ValidationError::UnknownOption {
                field,
                value: raw.to_string(),
            })
    }
}

fn out_of_range(field: FieldId) -> ValidationError {
    let bound = match field.kind() {
        FieldKind::Integer { min, max: Some(max) } if max <= 1000 => {
            format!("between {min} and {max}")
        }
        FieldKind::Integer { min, .. } => format!("at least {min}"),
        FieldKind::Number { min, inclusive: true } => format!("at least {min}"),
        FieldKind::Number { min, inclusive: false } => format!("greater than {min}"),
        FieldKind::Choice(_) => "one of the listed options".to_string(),
    };
    ValidationError::OutOfRange { field, bound }
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
pub(crate) fn filled_form() -> EvaluationForm {
    let mut form = EvaluationForm::new();
    form.set(FieldId::Age, "45");
    form.set(FieldId::SerumCholesterol, "240");
    form.set(FieldId::RestingBloodPressure, "130");
    form.set(FieldId::MaxHeartRate, "150");
    form.set(FieldId::WeeklyExerciseHours, "3.5");
    form.set(FieldId::FamilyHistory, "1");
    form.set(FieldId::StressLevel, "6");
    form.set(FieldId::FastingSugarLevel, "98");
    form
}
