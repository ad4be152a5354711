//! Prediction response data structures

use serde::{Deserialize, Serialize};

/// Response returned for one prediction request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Display name of the model that produced the prediction
    pub model: String,

    /// Binary risk label (1 = at risk)
    pub prediction: u8,

    /// Held-out accuracy of the model, e.g. `"87.35%"`
    pub accuracy: String,
}
