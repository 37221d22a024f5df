use std::fs;
use std::path::{Path, PathBuf};

use bandgap_io::{load_json, save_json, IoError};
use bandgap_models::{Estimator, Model, ModelFamily, Task};
use bandgap_preprocessing::StandardScaler;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, PipelineResult};

/// Locations of one family's artifact set.
///
/// Files keep the historical `.pkl` names but hold JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub classification_model: PathBuf,
    pub classification_scaler: PathBuf,
    pub regression_model: PathBuf,
    pub regression_scaler: PathBuf,
    pub metrics: PathBuf,
}

impl ArtifactPaths {
    pub fn new(root: &Path, family: ModelFamily) -> Self {
        let name = family.dir_name();
        let dir = root.join(&name);
        ArtifactPaths {
            classification_model: dir.join(format!("classification_{}.pkl", name)),
            classification_scaler: dir.join(format!("classification_{}_scaler.pkl", name)),
            regression_model: dir.join(format!("regression_{}.pkl", name)),
            regression_scaler: dir.join(format!("regression_{}_scaler.pkl", name)),
            metrics: dir.join("metrics.txt"),
            dir,
        }
    }

    pub fn model(&self, task: Task) -> &Path {
        match task {
            Task::Classification => &self.classification_model,
            Task::Regression => &self.regression_model,
        }
    }

    pub fn scaler(&self, task: Task) -> &Path {
        match task {
            Task::Classification => &self.classification_scaler,
            Task::Regression => &self.regression_scaler,
        }
    }

    /// The five files of a complete set.
    pub fn files(&self) -> [&Path; 5] {
        [
            &self.classification_model,
            &self.classification_scaler,
            &self.regression_model,
            &self.regression_scaler,
            &self.metrics,
        ]
    }
}

/// Where trained models, scalers and reports live.
pub trait ArtifactStore {
    fn paths(&self, family: ModelFamily) -> ArtifactPaths;

    /// Create the family directory if needed. Idempotent.
    fn prepare(&self, family: ModelFamily) -> PipelineResult<ArtifactPaths>;

    fn save_model(&self, family: ModelFamily, task: Task, model: &Model) -> PipelineResult<PathBuf>;

    fn save_scaler(&self, family: ModelFamily, task: Task, scaler: &StandardScaler<f64>) -> PipelineResult<PathBuf>;

    fn load_model(&self, family: ModelFamily, task: Task) -> PipelineResult<Model>;

    fn load_scaler(&self, family: ModelFamily, task: Task) -> PipelineResult<StandardScaler<f64>>;

    fn report_path(&self, family: ModelFamily) -> PathBuf {
        self.paths(family).metrics
    }
}

/// Filesystem store rooted at the models directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

fn persistence(path: &Path) -> impl FnOnce(IoError) -> PipelineError + '_ {
    move |source| PipelineError::Persistence {
        path: path.to_path_buf(),
        source,
    }
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsArtifactStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write<V: Serialize>(&self, path: &Path, value: &V) -> PipelineResult<PathBuf> {
        save_json(value, path).map_err(persistence(path))?;
        info!(path = %path.display(), "saved artifact");
        Ok(path.to_path_buf())
    }

    fn read<V: DeserializeOwned>(&self, path: &Path) -> PipelineResult<V> {
        load_json(path).map_err(persistence(path))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn paths(&self, family: ModelFamily) -> ArtifactPaths {
        ArtifactPaths::new(&self.root, family)
    }

    fn prepare(&self, family: ModelFamily) -> PipelineResult<ArtifactPaths> {
        let paths = self.paths(family);
        fs::create_dir_all(&paths.dir).map_err(|e| PipelineError::Persistence {
            path: paths.dir.clone(),
            source: IoError::Io {
                path: paths.dir.clone(),
                source: e,
            },
        })?;
        info!(dir = %paths.dir.display(), "artifact directory ready");
        Ok(paths)
    }

    fn save_model(&self, family: ModelFamily, task: Task, model: &Model) -> PipelineResult<PathBuf> {
        self.write(self.paths(family).model(task), model)
    }

    fn save_scaler(&self, family: ModelFamily, task: Task, scaler: &StandardScaler<f64>) -> PipelineResult<PathBuf> {
        self.write(self.paths(family).scaler(task), scaler)
    }

    fn load_model(&self, family: ModelFamily, task: Task) -> PipelineResult<Model> {
        let paths = self.paths(family);
        let path = paths.model(task);
        let model: Model = self.read(path)?;
        if model.family() != family || model.task() != task {
            return Err(PipelineError::ArtifactMismatch {
                path: path.to_path_buf(),
                reason: format!(
                    "holds a {} {} model, expected {} {}",
                    model.family(),
                    model.task(),
                    family,
                    task
                ),
            });
        }
        Ok(model)
    }

    fn load_scaler(&self, family: ModelFamily, task: Task) -> PipelineResult<StandardScaler<f64>> {
        let paths = self.paths(family);
        let path = paths.scaler(task);
        let scaler: StandardScaler<f64> = self.read(path)?;
        if !scaler.is_fitted() {
            return Err(PipelineError::ArtifactMismatch {
                path: path.to_path_buf(),
                reason: "scaler was never fitted".into(),
            });
        }
        Ok(scaler)
    }
}
