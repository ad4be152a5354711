//! Patient feature record submitted for risk prediction

use crate::features::{FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

/// Twelve clinical measurements describing one patient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Sex (1 = male, 0 = female)
    pub male: i32,

    /// Age in years
    pub age: i32,

    /// Current smoker (1 = yes, 0 = no)
    #[serde(rename = "currentSmoker")]
    pub current_smoker: i32,

    /// Cigarettes smoked per day
    #[serde(rename = "cigsPerDay")]
    pub cigs_per_day: f64,

    /// On blood pressure medication (1.0 = yes, 0.0 = no)
    #[serde(rename = "BPMeds")]
    pub bp_meds: f64,

    /// Diabetic (1 = yes, 0 = no)
    pub diabetes: i32,

    /// Total cholesterol (mg/dL)
    #[serde(rename = "totChol")]
    pub tot_chol: f64,

    /// Systolic blood pressure (mmHg)
    #[serde(rename = "sysBP")]
    pub sys_bp: f64,

    /// Diastolic blood pressure (mmHg)
    #[serde(rename = "diaBP")]
    pub dia_bp: f64,

    /// Body mass index
    #[serde(rename = "BMI")]
    pub bmi: f64,

    /// Resting heart rate (bpm)
    #[serde(rename = "heartRate")]
    pub heart_rate: f64,

    /// Fasting glucose (mg/dL)
    pub glucose: f64,
}

impl FeatureRecord {
    /// Model input in training column order.
    pub fn to_vector(&self) -> FeatureVector {
        [
            f64::from(self.male),
            f64::from(self.age),
            f64::from(self.current_smoker),
            self.cigs_per_day,
            self.bp_meds,
            f64::from(self.diabetes),
            self.tot_chol,
            self.sys_bp,
            self.dia_bp,
            self.bmi,
            self.heart_rate,
            self.glucose,
        ]
    }

    /// Inverse of [`to_vector`](Self::to_vector). Integer columns must
    /// already hold integral values; the extractor guarantees this.
    pub(crate) fn from_vector(v: &[f64; FEATURE_COUNT]) -> Self {
        Self {
            male: v[0] as i32,
            age: v[1] as i32,
            current_smoker: v[2] as i32,
            cigs_per_day: v[3],
            bp_meds: v[4],
            diabetes: v[5] as i32,
            tot_chol: v[6],
            sys_bp: v[7],
            dia_bp: v[8],
            bmi: v[9],
            heart_rate: v[10],
            glucose: v[11],
        }
    }
}
