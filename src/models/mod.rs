pub mod enums;
pub mod observation;
pub mod result;

pub use enums::{ChestPainType, InvalidCode, Sex, YesNo};
pub use observation::{PatientObservation, OBSERVATION_FIELD_COUNT};
pub use result::{EvaluationResult, RiskAssessment, RiskBand};
