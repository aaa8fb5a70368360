//! Model loader
//!
//! Loads the type model (and optional compiler settings) from YAML.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{EnumType, ModelType, TypeModel};
use crate::compiler::CompilerConfig;

/// One YAML model file. Split model directories merge several of these.
#[derive(Debug, Default, Deserialize)]
struct ModelFile {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    compiler: Option<CompilerConfig>,
    #[serde(default)]
    types: Vec<ModelType>,
    #[serde(default)]
    enums: Vec<EnumType>,
}

/// Result of loading a model directory
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub version: String,
    pub model: TypeModel,
    pub compiler: CompilerConfig,
}

pub struct ModelLoader {
    model_dir: PathBuf,
}

impl ModelLoader {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    /// Create loader from FL_MODEL_DIR env var or default to "model"
    ///
    /// Path resolution order:
    /// 1. FL_MODEL_DIR environment variable (explicit override)
    /// 2. Relative "model" path
    /// 3. CARGO_MANIFEST_DIR/model
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var("FL_MODEL_DIR") {
            return Self::new(dir);
        }

        if Path::new("model").exists() {
            return Self::new("model");
        }

        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let model_path = Path::new(&manifest_dir).join("model");
            if model_path.exists() {
                return Self::new(model_path);
            }
        }

        // Last resort - let load() fail with a clear error
        Self::new("model")
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Load and validate the model
    ///
    /// Supports two layouts:
    /// 1. Single file: `<dir>/model.yaml`
    /// 2. Split directory: `<dir>/model/*.yaml` (searched recursively)
    ///
    /// Files whose name starts with `_` are not model files; `_meta.yaml`
    /// may carry the model version.
    pub fn load(&self) -> Result<LoadedModel> {
        let split_dir = self.model_dir.join("model");

        let files = if split_dir.is_dir() {
            info!("Loading type model from directory {}", split_dir.display());
            self.read_directory(&split_dir)?
        } else {
            let path = self.model_dir.join("model.yaml");
            info!("Loading type model from {}", path.display());
            vec![(path.clone(), Self::read_file(&path)?)]
        };

        let mut version = "1.0".to_string();
        let mut compiler = None;
        let mut model = TypeModel::new();

        for (path, file) in files {
            if let Some(v) = file.version {
                version = v;
            }
            if let Some(c) = file.compiler {
                compiler = Some(c);
            }
            for model_type in file.types {
                model
                    .add_type(model_type)
                    .with_context(|| format!("Failed to merge {}", path.display()))?;
            }
            for enum_type in file.enums {
                model
                    .add_enum(enum_type)
                    .with_context(|| format!("Failed to merge {}", path.display()))?;
            }
        }

        model
            .validate()
            .with_context(|| format!("Invalid type model in {}", self.model_dir.display()))?;

        info!(
            "Loaded {} types and {} enum types (model version {})",
            model.types().count(),
            model.enums().count(),
            version
        );

        Ok(LoadedModel {
            version,
            model,
            compiler: compiler.unwrap_or_default(),
        })
    }

    fn read_file(path: &Path) -> Result<ModelFile> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Read every model file below `dir`, sorted by path so merging is deterministic
    fn read_directory(&self, dir: &Path) -> Result<Vec<(PathBuf, ModelFile)>> {
        let mut paths = Vec::new();
        Self::find_yaml_files(dir, &mut paths)?;
        paths.sort();

        let mut files = Vec::new();
        for path in paths {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();

            if file_name.starts_with('_') {
                if file_name == "_meta.yaml" {
                    let meta: serde_yaml::Value = serde_yaml::from_str(
                        &std::fs::read_to_string(&path)
                            .with_context(|| format!("Failed to read {}", path.display()))?,
                    )
                    .with_context(|| format!("Failed to parse {}", path.display()))?;
                    if let Some(version) = meta.get("version").and_then(|v| v.as_str()) {
                        files.push((
                            path.clone(),
                            ModelFile {
                                version: Some(version.to_string()),
                                ..ModelFile::default()
                            },
                        ));
                    }
                }
                debug!("Skipping {}", path.display());
                continue;
            }

            let file = Self::read_file(&path)?;
            files.push((path, file));
        }
        Ok(files)
    }

    fn find_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        let entries =
            std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                Self::find_yaml_files(&path, out)?;
            } else if path
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
            {
                out.push(path);
            }
        }
        Ok(())
    }
}
