use std::ops::Range;
use std::path::{Path, PathBuf};

use bandgap_model_selection::RandomizedSearch;
use bandgap_models::{default_search_space, HyperparameterSpace, ModelFamily, Task};

/// Fixed column layout of one task's CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSchema {
    pub label_column: usize,
    pub feature_columns: Range<usize>,
    /// Seed of the train/test shuffle.
    pub split_seed: u64,
}

impl TaskSchema {
    /// `formula, ..., is_semiconductor, <136 features>`.
    pub fn classification() -> Self {
        TaskSchema {
            label_column: 2,
            feature_columns: 3..139,
            split_seed: 15,
        }
    }

    /// `formula, band_gap, <136 features>`.
    pub fn regression() -> Self {
        TaskSchema {
            label_column: 1,
            feature_columns: 2..138,
            split_seed: 101,
        }
    }

    pub fn n_features(&self) -> usize {
        self.feature_columns.len()
    }

    /// Smallest row width that holds the label and every feature.
    pub fn min_width(&self) -> usize {
        self.feature_columns.end.max(self.label_column + 1)
    }
}

/// Settings of one training run. Built once and passed by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub family: ModelFamily,
    pub classification_data: PathBuf,
    pub regression_data: PathBuf,
    pub classification_schema: TaskSchema,
    pub regression_schema: TaskSchema,
    /// `None` uses the family's default space.
    pub classification_space: Option<HyperparameterSpace>,
    pub regression_space: Option<HyperparameterSpace>,
    pub use_search: bool,
    pub models_dir: PathBuf,
    pub test_ratio: f64,
    pub cv_folds: usize,
    pub search_seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            family: ModelFamily::RandomForest,
            classification_data: PathBuf::from("data/train_classification.csv"),
            regression_data: PathBuf::from("data/train_regression.csv"),
            classification_schema: TaskSchema::classification(),
            regression_schema: TaskSchema::regression(),
            classification_space: None,
            regression_space: None,
            use_search: true,
            models_dir: PathBuf::from("models"),
            test_ratio: 0.2,
            cv_folds: 5,
            search_seed: 42,
        }
    }
}

impl PipelineConfig {
    pub fn schema(&self, task: Task) -> &TaskSchema {
        match task {
            Task::Classification => &self.classification_schema,
            Task::Regression => &self.regression_schema,
        }
    }

    pub fn data_path(&self, task: Task) -> &Path {
        match task {
            Task::Classification => &self.classification_data,
            Task::Regression => &self.regression_data,
        }
    }

    /// The caller's override, or the family default.
    pub fn search_space(&self, task: Task) -> HyperparameterSpace {
        let custom = match task {
            Task::Classification => &self.classification_space,
            Task::Regression => &self.regression_space,
        };
        custom
            .clone()
            .unwrap_or_else(|| default_search_space(self.family, task))
    }

    pub fn search(&self, task: Task) -> RandomizedSearch {
        RandomizedSearch {
            cv: self.cv_folds,
            random_state: self.search_seed,
            ..RandomizedSearch::new(task)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schemas() {
        let c = TaskSchema::classification();
        assert_eq!(c.n_features(), 136);
        assert_eq!(c.min_width(), 139);
        let r = TaskSchema::regression();
        assert_eq!(r.n_features(), 136);
        assert_eq!(r.min_width(), 138);
    }

    #[test]
    fn test_search_settings_per_task() {
        let config = PipelineConfig::default();
        assert_eq!(config.search(Task::Classification).n_iter, 20);
        assert_eq!(config.search(Task::Regression).n_iter, 50);
        assert_eq!(config.search(Task::Regression).random_state, 42);
    }

    #[test]
    fn test_space_override() {
        let custom = HyperparameterSpace::from_json_str(r#"{"max_depth": [5]}"#).unwrap();
        let config = PipelineConfig {
            regression_space: Some(custom.clone()),
            ..PipelineConfig::default()
        };
        assert_eq!(config.search_space(Task::Regression), custom);
        assert_eq!(
            config.search_space(Task::Classification),
            default_search_space(ModelFamily::RandomForest, Task::Classification)
        );
    }
}
