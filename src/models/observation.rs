//! Request payload sent to the prediction service.
//!
//! Field names on the wire are the ones the service was trained against
//! (`edad`, `sexo`, ...). Exactly fifteen keys are produced and accepted.

use serde::{Deserialize, Serialize, Serializer};

use super::enums::{ChestPainType, Sex, YesNo};

/// One patient's clinical snapshot at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientObservation {
    #[serde(rename = "edad")]
    pub age: u32,
    #[serde(rename = "sexo")]
    pub sex: Sex,
    /// mg/dl
    #[serde(rename = "colesterol", serialize_with = "serialize_number")]
    pub serum_cholesterol: f64,
    #[serde(rename = "presion_arterial", serialize_with = "serialize_number")]
    pub resting_blood_pressure: f64,
    #[serde(rename = "frecuencia_cardiaca", serialize_with = "serialize_number")]
    pub max_heart_rate: f64,
    #[serde(rename = "fumador")]
    pub current_smoker: YesNo,
    #[serde(rename = "consumo_alcohol")]
    pub heavy_alcohol_use: YesNo,
    #[serde(rename = "horas_ejercicio", serialize_with = "serialize_number")]
    pub weekly_exercise_hours: f64,
    #[serde(rename = "historial_familiar")]
    pub family_history: YesNo,
    #[serde(rename = "diabetes")]
    pub has_diabetes: YesNo,
    #[serde(rename = "obesidad")]
    pub has_obesity: YesNo,
    /// 1 (low) to 10 (high)
    #[serde(rename = "nivel_estres")]
    pub stress_level: u8,
    #[serde(rename = "nivel_azucar", serialize_with = "serialize_number")]
    pub fasting_sugar_level: f64,
    #[serde(rename = "angina_inducida_ejercicio")]
    pub exercise_induced_angina: YesNo,
    #[serde(rename = "tipo_dolor_pecho")]
    pub chest_pain_type: ChestPainType,
}

/// Number of fields in the wire payload.
pub const OBSERVATION_FIELD_COUNT: usize = 15;

impl PatientObservation {
    /// Name of the first measurement that is NaN or infinite, if any.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        [
            ("colesterol", self.serum_cholesterol),
            ("presion_arterial", self.resting_blood_pressure),
            ("frecuencia_cardiaca", self.max_heart_rate),
            ("horas_ejercicio", self.weekly_exercise_hours),
            ("nivel_azucar", self.fasting_sugar_level),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
        .map(|(name, _)| name)
    }

    /// Reject payloads that JSON cannot carry faithfully.
    ///
    /// serde_json writes NaN as `null`, which the service would read as a
    /// missing field, so the transport refuses to encode such a payload.
    pub fn ensure_finite(&self) -> Result<(), String> {
        match self.non_finite_field() {
            Some(name) => Err(format!("field {name} is not a finite number")),
            None => Ok(()),
        }
    }
}

/// Whole-valued floats go out as integers, matching numeric coercion of
/// the typed text ("240" -> 240).
fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[cfg(test)]
pub(crate) fn sample_observation() -> PatientObservation {
    PatientObservation {
        age: 45,
        sex: Sex::Male,
        serum_cholesterol: 240.0,
        resting_blood_pressure: 130.0,
        max_heart_rate: 150.0,
        current_smoker: YesNo::No,
        heavy_alcohol_use: YesNo::No,
        weekly_exercise_hours: 3.5,
        family_history: YesNo::Yes,
        has_diabetes: YesNo::No,
        has_obesity: YesNo::No,
        stress_level: 6,
        fasting_sugar_level: 98.0,
        exercise_induced_angina: YesNo::No,
        chest_pain_type: ChestPainType::AtypicalAngina,
    }
}
