//! Model variants served by the API

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six classifier families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variant {
    #[serde(rename = "svm")]
    Svm,
    #[serde(rename = "random_forest")]
    RandomForest,
    #[serde(rename = "logistic")]
    Logistic,
    #[serde(rename = "decision_tree")]
    DecisionTree,
    #[serde(rename = "xgboost")]
    XgBoost,
    #[serde(rename = "lightgbm")]
    LightGbm,
}

impl Variant {
    /// All variants in route-table order.
    pub const ALL: [Variant; 6] = [
        Variant::Svm,
        Variant::RandomForest,
        Variant::Logistic,
        Variant::DecisionTree,
        Variant::XgBoost,
        Variant::LightGbm,
    ];

    /// Name reported in prediction responses.
    pub fn display_name(self) -> &'static str {
        match self {
            Variant::Svm => "SVM",
            Variant::RandomForest => "Random Forest",
            Variant::Logistic => "Logistic Regression",
            Variant::DecisionTree => "Decision Tree",
            Variant::XgBoost => "XGBoost",
            Variant::LightGbm => "LightGBM",
        }
    }

    /// Last path segment of the prediction route.
    pub fn route_segment(self) -> &'static str {
        match self {
            Variant::Svm => "svm",
            Variant::RandomForest => "rf",
            Variant::Logistic => "logistic",
            Variant::DecisionTree => "tree",
            Variant::XgBoost => "xgb",
            Variant::LightGbm => "lgb",
        }
    }

    /// Full prediction route, e.g. `/predict/rf`.
    pub fn route_path(self) -> String {
        format!("/predict/{}", self.route_segment())
    }

    /// Key used in configuration files.
    pub fn config_key(self) -> &'static str {
        match self {
            Variant::Svm => "svm",
            Variant::RandomForest => "random_forest",
            Variant::Logistic => "logistic",
            Variant::DecisionTree => "decision_tree",
            Variant::XgBoost => "xgboost",
            Variant::LightGbm => "lightgbm",
        }
    }

    /// Whether a deployment may run without this variant.
    pub fn is_optional(self) -> bool {
        self == Variant::LightGbm
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

impl FromStr for Variant {
    type Err = String;

    /// Accepts either the route segment (`rf`) or the config key (`random_forest`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.route_segment() == s || v.config_key() == s)
            .ok_or_else(|| s.to_string())
    }
}
