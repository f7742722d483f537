//! Source trees and element paths
//!
//! A file element's `path` is interpreted relative to its [`SourceTree`]:
//! absolute, relative to the enclosing group, or relative to one of the
//! well-known build folders ([`SourceTreeFolder`]). Resolving the group tree
//! produces an [`ElementPath`] per element.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::str::FromStr;

/// Well-known build folders a path can be relative to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceTreeFolder {
    /// Directory containing the `.xcodeproj`
    #[serde(rename = "SOURCE_ROOT")]
    SourceRoot,
    /// Build products directory
    #[serde(rename = "BUILT_PRODUCTS_DIR")]
    BuildProductsDir,
    /// Developer directory of the active toolchain
    #[serde(rename = "DEVELOPER_DIR")]
    DeveloperDir,
    /// Root of the active SDK
    #[serde(rename = "SDKROOT")]
    SdkRoot,
    /// Platform directory
    #[serde(rename = "PLATFORM_DIR")]
    PlatformDir,
}

impl SourceTreeFolder {
    /// All folders, in declaration order
    pub const ALL: [Self; 5] = [
        Self::SourceRoot,
        Self::BuildProductsDir,
        Self::DeveloperDir,
        Self::SdkRoot,
        Self::PlatformDir,
    ];

    /// Raw name as written in project files
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SourceRoot => "SOURCE_ROOT",
            Self::BuildProductsDir => "BUILT_PRODUCTS_DIR",
            Self::DeveloperDir => "DEVELOPER_DIR",
            Self::SdkRoot => "SDKROOT",
            Self::PlatformDir => "PLATFORM_DIR",
        }
    }
}

impl Display for SourceTreeFolder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTreeFolder {
    type Err = SourceTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|folder| folder.as_str() == s)
            .ok_or_else(|| SourceTreeError::Unknown(s.to_string()))
    }
}

/// Frame of reference for an element's `path`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceTree {
    /// `<absolute>`
    Absolute,
    /// `<group>`: relative to the enclosing group
    #[default]
    Group,
    /// Relative to a well-known folder
    RelativeTo(SourceTreeFolder),
}

impl SourceTree {
    /// Raw value as written in project files
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Absolute => "<absolute>",
            Self::Group => "<group>",
            Self::RelativeTo(folder) => folder.as_str(),
        }
    }
}

impl Display for SourceTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTree {
    type Err = SourceTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<absolute>" => Ok(Self::Absolute),
            "<group>" => Ok(Self::Group),
            other => other.parse().map(Self::RelativeTo),
        }
    }
}

/// Errors for source tree parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceTreeError {
    /// Not a marker and not a known folder name
    #[error("unknown source tree: {0}")]
    Unknown(String),
}

/// Derived location of a file element
///
/// Equality compares the normalized location: `.` and `..` segments and
/// repeated separators are folded, and the leading separator of a relative
/// path is insignificant.
#[derive(Debug, Clone)]
pub enum ElementPath {
    /// Absolute filesystem path
    Absolute(String),
    /// Path below a well-known folder
    RelativeTo(SourceTreeFolder, String),
}

impl ElementPath {
    /// Absolute path
    #[inline]
    #[must_use]
    pub fn absolute(path: impl Into<String>) -> Self {
        Self::Absolute(path.into())
    }

    /// Path relative to a folder
    #[inline]
    #[must_use]
    pub fn relative(folder: SourceTreeFolder, path: impl Into<String>) -> Self {
        Self::RelativeTo(folder, path.into())
    }

    /// Raw path component, without the folder
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Absolute(path) | Self::RelativeTo(_, path) => path,
        }
    }

    /// Folder the path is relative to, if any
    #[inline]
    #[must_use]
    pub fn folder(&self) -> Option<SourceTreeFolder> {
        match self {
            Self::Absolute(_) => None,
            Self::RelativeTo(folder, _) => Some(*folder),
        }
    }

    /// Last path component
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.raw().rsplit('/').find(|segment| !segment.is_empty())
    }

    /// Resolve to a concrete filesystem path
    ///
    /// `base` maps each well-known folder to a directory. The result is
    /// normalized lexically; the filesystem is not consulted.
    pub fn resolve<F>(&self, base: F) -> PathBuf
    where
        F: Fn(SourceTreeFolder) -> PathBuf,
    {
        match self {
            Self::Absolute(path) => PathBuf::from(normalize(path, true)),
            Self::RelativeTo(folder, path) => {
                let relative = normalize(path, false);
                let root = base(*folder);
                if relative.is_empty() {
                    root
                } else {
                    root.join(relative)
                }
            }
        }
    }

    fn comparison_key(&self) -> (Option<SourceTreeFolder>, String) {
        match self {
            Self::Absolute(path) => (None, normalize(path, true)),
            Self::RelativeTo(folder, path) => (Some(*folder), normalize(path, false)),
        }
    }
}

impl PartialEq for ElementPath {
    fn eq(&self, other: &Self) -> bool {
        self.comparison_key() == other.comparison_key()
    }
}

impl Eq for ElementPath {}

impl Hash for ElementPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.comparison_key().hash(state);
    }
}

impl Display for ElementPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(path) => f.write_str(path),
            Self::RelativeTo(folder, path) => {
                write!(f, "$({folder})/{}", path.trim_start_matches('/'))
            }
        }
    }
}

/// Fold `.`/`..` segments and repeated separators
///
/// `..` never climbs above the start of the path.
fn normalize(path: &str, absolute: bool) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute && path.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn source_tree_raw_values_round_trip() {
        for raw in ["<absolute>", "<group>", "SOURCE_ROOT", "SDKROOT", "PLATFORM_DIR"] {
            let tree: SourceTree = raw.parse().unwrap();
            assert_eq!(tree.as_str(), raw);
        }
        assert_eq!(
            "BUILT_PRODUCTS_DIR".parse::<SourceTree>(),
            Ok(SourceTree::RelativeTo(SourceTreeFolder::BuildProductsDir))
        );
    }

    #[test]
    fn source_tree_rejects_unknown() {
        assert_eq!(
            "<weird>".parse::<SourceTree>(),
            Err(SourceTreeError::Unknown("<weird>".into()))
        );
    }

    #[test]
    fn element_path_equality_normalizes() {
        let a = ElementPath::relative(SourceTreeFolder::SourceRoot, "/Sources/./main.c");
        let b = ElementPath::relative(SourceTreeFolder::SourceRoot, "Sources/lib/../main.c");
        let c = ElementPath::relative(SourceTreeFolder::SdkRoot, "Sources/main.c");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, ElementPath::absolute("/Sources/main.c"));
        assert_eq!(
            ElementPath::absolute("/opt//vendor/lib.a"),
            ElementPath::absolute("/opt/vendor/lib.a")
        );
    }

    #[test]
    fn element_path_resolves_against_folder_base() {
        let path = ElementPath::relative(SourceTreeFolder::SourceRoot, "/Sources/main.c");
        let resolved = path.resolve(|_| PathBuf::from("/work/app"));
        assert_eq!(resolved, Path::new("/work/app/Sources/main.c"));

        let absolute = ElementPath::absolute("/opt/vendor/../lib/lib.a");
        assert_eq!(absolute.resolve(|_| PathBuf::new()), Path::new("/opt/lib/lib.a"));
    }

    #[test]
    fn element_path_display_and_file_name() {
        let path = ElementPath::relative(SourceTreeFolder::SourceRoot, "/Sources/main.c");
        assert_eq!(path.to_string(), "$(SOURCE_ROOT)/Sources/main.c");
        assert_eq!(path.file_name(), Some("main.c"));
        assert_eq!(path.folder(), Some(SourceTreeFolder::SourceRoot));
    }
}
