use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Selectable algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelFamily {
    RandomForest,
    GradientBoosting,
    XGBoost,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::RandomForest,
        ModelFamily::GradientBoosting,
        ModelFamily::XGBoost,
    ];

    /// Canonical display name, as written in reports.
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "RandomForest",
            ModelFamily::GradientBoosting => "GradientBoosting",
            ModelFamily::XGBoost => "XGBoost",
        }
    }

    /// Lower-cased name used for the artifact directory and file names.
    pub fn dir_name(&self) -> String {
        self.name().to_lowercase()
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelFamily {
    type Err = ModelError;

    /// Case-insensitive; `_`, `-` and spaces are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        ModelFamily::ALL
            .into_iter()
            .find(|f| f.dir_name() == key)
            .ok_or_else(|| ModelError::UnknownFamily {
                name: s.to_string(),
                valid: ModelFamily::ALL.map(|f| f.name()).join(", "),
            })
    }
}

/// Prediction task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Task {
    Classification,
    Regression,
}

impl Task {
    pub const ALL: [Task; 2] = [Task::Classification, Task::Regression];

    pub fn name(&self) -> &'static str {
        match self {
            Task::Classification => "classification",
            Task::Regression => "regression",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Task {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classification" => Ok(Task::Classification),
            "regression" => Ok(Task::Regression),
            _ => Err(ModelError::UnknownTask(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_family_spellings() {
        for s in ["RandomForest", "randomforest", "random_forest", "Random-Forest"] {
            assert_eq!(s.parse::<ModelFamily>().unwrap(), ModelFamily::RandomForest);
        }
        assert_eq!("XGBOOST".parse::<ModelFamily>().unwrap(), ModelFamily::XGBoost);
        assert_eq!(
            "gradient_boosting".parse::<ModelFamily>().unwrap(),
            ModelFamily::GradientBoosting
        );
    }

    #[test]
    fn test_unknown_family_lists_valid_names() {
        let err = "LightGBM".parse::<ModelFamily>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("LightGBM"));
        assert!(msg.contains("RandomForest, GradientBoosting, XGBoost"));
    }

    #[test]
    fn test_dir_names() {
        assert_eq!(ModelFamily::RandomForest.dir_name(), "randomforest");
        assert_eq!(ModelFamily::GradientBoosting.dir_name(), "gradientboosting");
        assert_eq!(ModelFamily::XGBoost.dir_name(), "xgboost");
    }

    #[test]
    fn test_parse_task() {
        assert_eq!("Classification".parse::<Task>().unwrap(), Task::Classification);
        assert_eq!("regression".parse::<Task>().unwrap(), Task::Regression);
        assert!(matches!("clustering".parse::<Task>(), Err(ModelError::UnknownTask(_))));
    }
}
