//! Model artifact loading

use crate::lexicon::{LexiconArtifact, LexiconScorer};
use crate::model::ClassifierModel;
use std::path::Path;
use std::sync::Arc;
use toxiguard_core::{Error, Result};
use tracing::info;

/// Load a lexicon artifact from a YAML file
pub fn load_model(path: impl AsRef<Path>) -> Result<ClassifierModel> {
    let path = path.as_ref();
    info!("Loading model artifact from: {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("Failed to read model {}: {}", path.display(), e))
    })?;
    let artifact: LexiconArtifact = serde_yaml::from_str(&content).map_err(|e| {
        Error::config(format!("Failed to parse model {}: {}", path.display(), e))
    })?;

    from_artifact(&artifact)
}

/// Build a model from an already-parsed artifact
pub fn from_artifact(artifact: &LexiconArtifact) -> Result<ClassifierModel> {
    let scorer = LexiconScorer::new(artifact)?;
    let labels = artifact.labels.iter().map(|l| l.name.clone()).collect();
    let model = ClassifierModel::new(Arc::new(scorer), labels)?;

    info!(
        "Loaded model '{}' with labels {:?}",
        model.name(),
        model.labels()
    );
    Ok(model)
}
