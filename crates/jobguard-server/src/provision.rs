//! Model provisioning from the Hugging Face Hub
//!
//! Runs before the model is loaded. A populated model directory is never
//! touched, so repeated runs are no-ops.

use crate::config::ModelConfig;
use hf_hub::{api::sync::Api, Repo, RepoType};
use jobguard_classifier::model_config::{
    CONFIG_FILE, TOKENIZER_CONFIG_FILE, TOKENIZER_FILE, WEIGHTS_FILE,
};
use std::path::{Path, PathBuf};

const REQUIRED_FILES: [&str; 3] = [CONFIG_FILE, TOKENIZER_FILE, WEIGHTS_FILE];
const OPTIONAL_FILES: [&str; 1] = [TOKENIZER_CONFIG_FILE];

/// What provisioning did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The directory already had content
    AlreadyPresent,
    /// Nothing to fetch from: no repository configured
    NotConfigured,
    /// Files copied into the directory
    Downloaded(Vec<String>),
}

/// Whether `dir` exists and has at least one entry
pub fn is_populated(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Make sure the model directory is populated
pub fn provision(config: &ModelConfig) -> anyhow::Result<ProvisionOutcome> {
    if is_populated(&config.dir) {
        tracing::debug!("Model directory {} already populated", config.dir.display());
        return Ok(ProvisionOutcome::AlreadyPresent);
    }

    let Some(repo_id) = &config.hf_repo else {
        tracing::warn!(
            "Model directory {} is empty and no model.hf_repo is configured",
            config.dir.display()
        );
        return Ok(ProvisionOutcome::NotConfigured);
    };

    tracing::info!(
        "Downloading model {}@{} into {}",
        repo_id,
        config.hf_revision,
        config.dir.display()
    );

    let api = Api::new().map_err(|e| anyhow::anyhow!("Failed to initialize HF API: {}", e))?;
    let repo = api.repo(Repo::with_revision(
        repo_id.clone(),
        RepoType::Model,
        config.hf_revision.clone(),
    ));

    // Everything lands in the hub cache before the model directory is touched
    let mut fetched: Vec<(&str, PathBuf)> = Vec::new();
    for filename in REQUIRED_FILES {
        let path = repo.get(filename).map_err(|e| {
            anyhow::anyhow!("Failed to download {} from {}: {}", filename, repo_id, e)
        })?;
        fetched.push((filename, path));
    }
    for filename in OPTIONAL_FILES {
        match repo.get(filename) {
            Ok(path) => fetched.push((filename, path)),
            Err(e) => tracing::debug!("Optional {} not available: {}", filename, e),
        }
    }

    let copied = install(&config.dir, &fetched)?;
    tracing::info!("Model provisioned: {}", copied.join(", "));

    Ok(ProvisionOutcome::Downloaded(copied))
}

/// Copy fetched files into a staging directory next to `dir`, then move it
/// into place. A failed copy leaves `dir` as it was.
fn install(dir: &Path, files: &[(&str, PathBuf)]) -> anyhow::Result<Vec<String>> {
    let parent = match dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".jobguard-model-")
        .tempdir_in(parent)
        .map_err(|e| anyhow::anyhow!("Failed to stage download in {}: {}", parent.display(), e))?;

    let mut copied = Vec::with_capacity(files.len());
    for (filename, source) in files {
        std::fs::copy(source, staging.path().join(filename)).map_err(|e| {
            anyhow::anyhow!(
                "Failed to copy {} into {}: {}",
                filename,
                staging.path().display(),
                e
            )
        })?;
        copied.push(filename.to_string());
    }

    // Only reached for a missing or empty directory
    if dir.exists() {
        std::fs::remove_dir(dir)?;
    }
    std::fs::rename(staging.path(), dir).map_err(|e| {
        anyhow::anyhow!("Failed to move model into {}: {}", dir.display(), e)
    })?;

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_config(dir: &Path, hf_repo: Option<&str>) -> ModelConfig {
        ModelConfig {
            dir: dir.to_path_buf(),
            hf_repo: hf_repo.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_populated_directory_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();

        let outcome = provision(&model_config(dir.path(), Some("acme/model"))).unwrap();
        assert_eq!(outcome, ProvisionOutcome::AlreadyPresent);
        assert_eq!(std::fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap(), "{}");
    }

    #[test]
    fn test_empty_directory_without_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_populated(dir.path()));

        let outcome = provision(&model_config(dir.path(), None)).unwrap();
        assert_eq!(outcome, ProvisionOutcome::NotConfigured);
    }

    #[test]
    fn test_missing_directory_is_not_populated() {
        assert!(!is_populated(Path::new("/definitely/not/here")));
    }

    #[test]
    fn test_install_copies_into_new_directory() {
        let cache = tempfile::tempdir().unwrap();
        let source = cache.path().join("blob");
        std::fs::write(&source, "weights").unwrap();

        let target = cache.path().join("model");
        let copied = install(&target, &[(WEIGHTS_FILE, source)]).unwrap();

        assert_eq!(copied, vec![WEIGHTS_FILE.to_string()]);
        assert_eq!(
            std::fs::read_to_string(target.join(WEIGHTS_FILE)).unwrap(),
            "weights"
        );
    }

    #[test]
    fn test_install_replaces_empty_directory() {
        let cache = tempfile::tempdir().unwrap();
        let source = cache.path().join("blob");
        std::fs::write(&source, "{}").unwrap();

        let target = cache.path().join("model");
        std::fs::create_dir(&target).unwrap();
        install(&target, &[(CONFIG_FILE, source)]).unwrap();

        assert!(is_populated(&target));
        assert_eq!(std::fs::read_to_string(target.join(CONFIG_FILE)).unwrap(), "{}");
    }

    #[test]
    fn test_failed_install_leaves_directory_unpopulated() {
        let cache = tempfile::tempdir().unwrap();
        let config = cache.path().join("config-blob");
        std::fs::write(&config, "{}").unwrap();

        let target = cache.path().join("model");
        let files = [
            (CONFIG_FILE, config),
            (WEIGHTS_FILE, cache.path().join("truncated-blob")),
        ];

        assert!(install(&target, &files).is_err());
        assert!(!is_populated(&target));

        // No staging directory is left behind
        let leftovers: Vec<_> = std::fs::read_dir(cache.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".jobguard-model-"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
