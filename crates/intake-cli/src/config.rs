use std::env;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use intake_spec::Questionnaire;
use intake_store::FsStore;
use serde::Deserialize;

pub const CONFIG_ENV: &str = "INTAKE_CONFIG";
const CONFIG_FILE: &str = "intake.toml";
const SAMPLE_DEFINITION: &str = include_str!("../assets/questionnaire.json");

/// Contents of `intake.toml`. Relative paths resolve against the file's directory.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntakeConfig {
    pub definition: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub locale: Option<String>,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "intake", "intake")
}

impl IntakeConfig {
    /// Reads the explicit path, then `INTAKE_CONFIG`, then the per-user config
    /// file. Only the per-user file may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let requested = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));
        let (path, required) = match requested {
            Some(path) => (path, true),
            None => match project_dirs() {
                Some(dirs) => (dirs.config_dir().join(CONFIG_FILE), false),
                None => return Ok(Self::default()),
            },
        };

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound && !required => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()));
            }
        };
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config.relative_to(path.parent()))
    }

    fn relative_to(mut self, base: Option<&Path>) -> Self {
        if let Some(base) = base {
            let anchor = |path: PathBuf| {
                if path.is_relative() {
                    base.join(path)
                } else {
                    path
                }
            };
            self.definition = self.definition.map(anchor);
            self.data_dir = self.data_dir.map(anchor);
        }
        self
    }
}

/// Effective settings after command-line overrides.
#[derive(Debug, Clone)]
pub struct Settings {
    pub definition: Option<PathBuf>,
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn resolve(
        config: IntakeConfig,
        definition: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let data_dir = match data_dir.or(config.data_dir) {
            Some(dir) => dir,
            None => project_dirs()
                .map(|dirs| dirs.data_dir().join("sessions"))
                .ok_or_else(|| anyhow!("no home directory found; pass --data-dir"))?,
        };
        Ok(Self {
            definition: definition.or(config.definition),
            data_dir,
        })
    }

    pub fn load_definition(&self) -> Result<Arc<Questionnaire>> {
        let definition = match &self.definition {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading definition {}", path.display()))?;
                Questionnaire::from_json(&raw)
                    .with_context(|| format!("loading definition {}", path.display()))?
            }
            None => Questionnaire::from_json(SAMPLE_DEFINITION)
                .context("loading the bundled sample definition")?,
        };
        Ok(Arc::new(definition))
    }

    pub fn store(&self) -> FsStore {
        FsStore::new(&self.data_dir)
    }
}
