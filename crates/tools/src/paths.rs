//! Project directory layout and ABI export locations.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directories shared with the contract toolchain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub deploy: PathBuf,
    pub sources: PathBuf,
    pub tests: PathBuf,
    pub cache: PathBuf,
    pub artifacts: PathBuf,
    pub imports: PathBuf,
    pub deployments: PathBuf,
}

impl Default for ProjectPaths {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            deploy: PathBuf::from("deploy"),
            sources: PathBuf::from("./src"),
            tests: PathBuf::from("./integration_test"),
            cache: PathBuf::from("./build/cache"),
            artifacts: PathBuf::from("./build/artifacts"),
            imports: PathBuf::from("imports"),
            deployments: PathBuf::from("deployments"),
        }
    }
}

/// Per-field overrides from the project file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathOverrides {
    pub deploy: Option<PathBuf>,
    pub sources: Option<PathBuf>,
    pub tests: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub artifacts: Option<PathBuf>,
    pub imports: Option<PathBuf>,
    pub deployments: Option<PathBuf>,
}

impl ProjectPaths {
    /// Apply overrides, then anchor every relative entry at `root`.
    pub fn resolve(root: &Path, overrides: &PathOverrides) -> Self {
        let defaults = Self::default();
        let pick = |value: &Option<PathBuf>, fallback: PathBuf| {
            join(root, value.clone().unwrap_or(fallback))
        };
        Self {
            root: root.to_path_buf(),
            deploy: pick(&overrides.deploy, defaults.deploy),
            sources: pick(&overrides.sources, defaults.sources),
            tests: pick(&overrides.tests, defaults.tests),
            cache: pick(&overrides.cache, defaults.cache),
            artifacts: pick(&overrides.artifacts, defaults.artifacts),
            imports: pick(&overrides.imports, defaults.imports),
            deployments: pick(&overrides.deployments, defaults.deployments),
        }
    }
}

/// Where exported ABIs are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbiExporter {
    pub path: PathBuf,
    pub flat: bool,
}

impl Default for AbiExporter {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./build/abi"),
            flat: true,
        }
    }
}

impl AbiExporter {
    pub fn anchored(&self, root: &Path) -> Self {
        Self {
            path: join(root, self.path.clone()),
            flat: self.flat,
        }
    }

    /// File an ABI for `contract`, declared in `source` (relative to the
    /// sources directory), is exported to.
    pub fn output_path(&self, source: &Path, contract: &str) -> PathBuf {
        let file = format!("{contract}.json");
        if self.flat {
            return self.path.join(file);
        }
        match source.parent() {
            Some(dir) => self.path.join(dir).join(file),
            None => self.path.join(file),
        }
    }
}

fn join(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    let stripped = path.strip_prefix(".").map(Path::to_path_buf).unwrap_or(path);
    root.join(stripped)
}
