//! Load options and project configuration
//!
//! [`LoadOptions`] controls how a document is checked when loaded.
//! [`ProjectConfig`] is the optional TOML file next to a project:
//!
//! ```toml
//! [load]
//! reference_check = "report"
//! resolve_paths = true
//!
//! [source_trees]
//! BUILT_PRODUCTS_DIR = "/tmp/build"
//! SDKROOT = "/Applications/Xcode.app/Contents/Developer/Platforms/MacOSX.platform/Developer/SDKs/MacOSX.sdk"
//! ```

use crate::error::ProjectError;
use pbx_graph::SourceTreeFolder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What to do with reference violations found while loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceCheck {
    /// Fail the load with every violation in one error
    #[default]
    Strict,
    /// Load, keep the report and refuse to encode
    Report,
    /// Skip validation
    Ignore,
}

/// Options for loading a project document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Handling of dangling references and orphans
    pub reference_check: ReferenceCheck,
    /// Resolve element paths after loading
    pub resolve_paths: bool,
}

impl LoadOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With reference check mode
    #[inline]
    #[must_use]
    pub fn with_reference_check(mut self, check: ReferenceCheck) -> Self {
        self.reference_check = check;
        self
    }

    /// With path resolution on or off
    #[inline]
    #[must_use]
    pub fn with_resolve_paths(mut self, resolve: bool) -> Self {
        self.resolve_paths = resolve;
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            reference_check: ReferenceCheck::Strict,
            resolve_paths: true,
        }
    }
}

/// Project configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Load options
    pub load: LoadOptions,
    /// Base directory per source tree folder name
    pub source_trees: BTreeMap<String, PathBuf>,
}

impl ProjectConfig {
    /// Create empty configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text; `origin` names the source in errors
    ///
    /// # Errors
    /// `Config` for malformed TOML or an unknown source tree folder.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ProjectError> {
        let config: Self =
            toml::from_str(text).map_err(|e| ProjectError::config_error(origin, e.to_string()))?;
        for name in config.source_trees.keys() {
            name.parse::<SourceTreeFolder>()
                .map_err(|e| ProjectError::config_error(origin, e.to_string()))?;
        }
        Ok(config)
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// `Io` if the file cannot be read, `Config` if it is invalid.
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        tracing::debug!(path = %path.display(), "reading project configuration");
        let text = std::fs::read_to_string(path).map_err(|e| ProjectError::io_error(path, e))?;
        Self::from_toml_str(&text, path)
    }

    /// TOML text of this configuration
    ///
    /// # Errors
    /// `Config` if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ProjectError> {
        toml::to_string(self).map_err(|e| ProjectError::config_error("<memory>", e.to_string()))
    }

    /// With load options
    #[inline]
    #[must_use]
    pub fn with_load(mut self, load: LoadOptions) -> Self {
        self.load = load;
        self
    }

    /// With base directory for a folder
    #[must_use]
    pub fn with_source_tree(mut self, folder: SourceTreeFolder, base: impl Into<PathBuf>) -> Self {
        self.source_trees.insert(folder.as_str().to_string(), base.into());
        self
    }

    /// Base directory for `folder`; unconfigured folders map to `project_dir`
    #[must_use]
    pub fn base_for(&self, folder: SourceTreeFolder, project_dir: &Path) -> PathBuf {
        self.source_trees
            .get(folder.as_str())
            .cloned()
            .unwrap_or_else(|| project_dir.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_strict_with_paths() {
        let options = LoadOptions::new();
        assert_eq!(options.reference_check, ReferenceCheck::Strict);
        assert!(options.resolve_paths);
    }

    #[test]
    fn parses_toml_sections() {
        let text = r#"
            [load]
            reference_check = "report"

            [source_trees]
            BUILT_PRODUCTS_DIR = "/tmp/build"
        "#;
        let config = ProjectConfig::from_toml_str(text, Path::new("pbx.toml")).unwrap();
        assert_eq!(config.load.reference_check, ReferenceCheck::Report);
        assert!(config.load.resolve_paths);
        assert_eq!(
            config.base_for(SourceTreeFolder::BuildProductsDir, Path::new("/p")),
            PathBuf::from("/tmp/build")
        );
        assert_eq!(
            config.base_for(SourceTreeFolder::SdkRoot, Path::new("/p")),
            PathBuf::from("/p")
        );
    }

    #[test]
    fn rejects_unknown_folder() {
        let text = "[source_trees]\nNOT_A_FOLDER = \"/x\"\n";
        let err = ProjectConfig::from_toml_str(text, Path::new("pbx.toml")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration in pbx.toml: unknown source tree: NOT_A_FOLDER"
        );
    }

    #[test]
    fn builder_output_parses_back() {
        let config = ProjectConfig::new()
            .with_load(LoadOptions::new().with_reference_check(ReferenceCheck::Ignore))
            .with_source_tree(SourceTreeFolder::SdkRoot, "/sdk");
        let text = config.to_toml_string().unwrap();
        assert_eq!(ProjectConfig::from_toml_str(&text, Path::new("x")).unwrap(), config);
    }
}
