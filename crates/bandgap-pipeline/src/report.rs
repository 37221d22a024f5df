use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use bandgap_io::IoError;
use bandgap_metrics::{ClassificationMetrics, RegressionMetrics};
use bandgap_model_selection::ParamsProvenance;
use bandgap_models::ModelFamily;

use crate::error::{PipelineError, PipelineResult};

pub fn classification_section(provenance: &ParamsProvenance, m: &ClassificationMetrics) -> String {
    format!(
        "Classification Metrics:\n\
         Best Parameters: {}\n\
         Accuracy: {:.4}\n\
         Precision: {:.4}\n\
         Recall: {:.4}\n\
         F1 Score: {:.4}\n\n",
        provenance, m.accuracy, m.precision, m.recall, m.f1
    )
}

pub fn regression_section(provenance: &ParamsProvenance, m: &RegressionMetrics) -> String {
    format!(
        "Regression Metrics:\n\
         Best Parameters: {}\n\
         R2 Score: {:.4}\n\
         MAE: {:.4}\n\
         MSE: {:.4}\n\
         RMSE: {:.4}\n\
         Explained Variance Score: {:.4}\n",
        provenance, m.r2, m.mae, m.mse, m.rmse, m.explained_variance
    )
}

/// The human-readable `metrics.txt` of one artifact set. Created (and
/// truncated) with its header, then grows by one section per task.
#[derive(Debug)]
pub struct MetricsReport {
    path: PathBuf,
}

impl MetricsReport {
    pub fn create(path: impl Into<PathBuf>, family: ModelFamily) -> PipelineResult<Self> {
        let report = MetricsReport { path: path.into() };
        let mut file = File::create(&report.path).map_err(|e| report.error(e))?;
        write!(file, "Metrics for {} models\n\n", family).map_err(|e| report.error(e))?;
        Ok(report)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, e: std::io::Error) -> PipelineError {
        PipelineError::Persistence {
            path: self.path.clone(),
            source: IoError::Io {
                path: self.path.clone(),
                source: e,
            },
        }
    }

    fn append(&self, section: &str) -> PipelineResult<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.error(e))?;
        file.write_all(section.as_bytes()).map_err(|e| self.error(e))?;
        file.flush().map_err(|e| self.error(e))
    }

    pub fn append_classification(&self, provenance: &ParamsProvenance, m: &ClassificationMetrics) -> PipelineResult<()> {
        self.append(&classification_section(provenance, m))
    }

    pub fn append_regression(&self, provenance: &ParamsProvenance, m: &RegressionMetrics) -> PipelineResult<()> {
        self.append(&regression_section(provenance, m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandgap_models::ParamSet;

    #[test]
    fn test_report_layout() {
        let dir = tempfile::tempdir().unwrap();
        let report = MetricsReport::create(dir.path().join("metrics.txt"), ModelFamily::RandomForest).unwrap();

        let cm = ClassificationMetrics {
            accuracy: 0.95,
            precision: 0.9,
            recall: 1.0,
            f1: 0.947368,
        };
        report.append_classification(&ParamsProvenance::Default, &cm).unwrap();

        let mut params = ParamSet::new();
        params.insert("max_depth", 20usize);
        let rm = RegressionMetrics {
            r2: 0.81234,
            mae: 0.3,
            mse: 0.25,
            rmse: 0.5,
            explained_variance: 0.82,
        };
        report.append_regression(&ParamsProvenance::Searched(params), &rm).unwrap();

        let text = std::fs::read_to_string(report.path()).unwrap();
        assert_eq!(
            text,
            "Metrics for RandomForest models\n\n\
             Classification Metrics:\n\
             Best Parameters: Default parameters\n\
             Accuracy: 0.9500\n\
             Precision: 0.9000\n\
             Recall: 1.0000\n\
             F1 Score: 0.9474\n\n\
             Regression Metrics:\n\
             Best Parameters: {'max_depth': 20}\n\
             R2 Score: 0.8123\n\
             MAE: 0.3000\n\
             MSE: 0.2500\n\
             RMSE: 0.5000\n\
             Explained Variance Score: 0.8200\n"
        );
    }

    #[test]
    fn test_create_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.txt");
        std::fs::write(&path, "stale contents").unwrap();
        MetricsReport::create(&path, ModelFamily::XGBoost).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Metrics for XGBoost models\n\n");
    }
}
