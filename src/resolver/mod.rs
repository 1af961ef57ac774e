//! Module resolution helpers
//!
//! Specifier classification, virtual path resolution and
//! package specifier parsing shared by the resolver plugins.

use crate::utils::{clean_path, parent_dir};

/// Prefix of every identifier served by the virtual file system
pub const VIRTUAL_PREFIX: &str = "virtual:file/";

/// `./x` or `../x`
pub fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

/// Fully qualified `http(s)://` URL
pub fn is_remote_url(specifier: &str) -> bool {
    specifier.starts_with("https://") || specifier.starts_with("http://")
}

/// Stylesheet imports are stubbed rather than resolved
pub fn is_stylesheet(specifier: &str) -> bool {
    specifier.ends_with(".css") || specifier.ends_with(".scss")
}

/// ASCII JavaScript identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Registry path of a virtual identifier
pub fn virtual_path(id: &str) -> Option<&str> {
    id.strip_prefix(VIRTUAL_PREFIX)
}

/// Virtual identifier of a registry path
pub fn to_virtual_id(path: &str) -> String {
    format!("{}{}", VIRTUAL_PREFIX, path)
}

/// Resolve `relative` against the directory of the virtual file at
/// `importer_path`
///
/// Returns `None` when the result would climb above the registry root.
pub fn resolve_virtual_path(importer_path: &str, relative: &str) -> Option<String> {
    let dir = parent_dir(importer_path);
    clean_path(&format!("{}/{}", dir, relative))
}

/// A bare package import, e.g. `lodash-es@4/debounce.js`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpecifier {
    /// Package name, including the scope for scoped packages
    pub name: String,

    /// Requested version or tag
    pub version: String,

    /// Path inside the package
    pub subpath: Option<String>,
}

impl PackageSpecifier {
    /// Parse a bare specifier; the version defaults to `latest`
    pub fn parse(specifier: &str) -> Option<Self> {
        let (scope, rest) = match specifier.strip_prefix('@') {
            Some(stripped) => {
                let (scope, rest) = stripped.split_once('/')?;
                (Some(scope), rest)
            }
            None => (None, specifier),
        };

        let (name_version, subpath) = match rest.split_once('/') {
            Some((name_version, subpath)) => (name_version, Some(subpath)),
            None => (rest, None),
        };

        let (name, version) = name_version.split_once('@').unwrap_or((name_version, ""));
        if name.is_empty() || scope.is_some_and(str::is_empty) {
            return None;
        }

        Some(Self {
            name: match scope {
                Some(scope) => format!("@{}/{}", scope, name),
                None => name.to_string(),
            },
            version: if version.is_empty() { "latest" } else { version }.to_string(),
            subpath: subpath.filter(|s| !s.is_empty()).map(str::to_string),
        })
    }

    /// `name@version`, the entry-point cache key
    pub fn cache_key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Package root URL on the CDN
    pub fn base_url(&self, cdn: &str) -> String {
        format!("{}/{}", cdn, self.cache_key())
    }
}
