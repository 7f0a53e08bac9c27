use serde::{Deserialize, Serialize};
use std::fmt;

/// The extension manifest shipped as `extensions.manifest.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub entries: Vec<ExtensionEntry>,
}

/// One extension, builtin module or schema bundled in the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionEntry {
    pub name: String,
    pub kind: ExtensionKind,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeSpec>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
}

const fn enabled_by_default() -> bool {
    true
}

impl ExtensionEntry {
    /// Whether the entry must be listed in `shared_preload_libraries`.
    #[must_use]
    pub fn needs_preload(&self) -> bool {
        self.runtime.as_ref().is_some_and(|r| r.shared_preload)
    }

    /// Whether the entry is activated with `CREATE EXTENSION`.
    ///
    /// Builtin modules and hook-based libraries are not.
    #[must_use]
    pub fn needs_create(&self) -> bool {
        self.kind != ExtensionKind::Builtin
            && self.runtime.as_ref().is_none_or(|r| r.create_extension)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    Extension,
    Builtin,
    Schema,
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Extension => "extension",
            Self::Builtin => "builtin",
            Self::Schema => "schema",
        })
    }
}

/// Provenance of an entry. Git sources are pinned to a full commit hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Source {
    Builtin,
    Git {
        repository: String,
        tag: String,
        commit: String,
    },
    GitRef {
        repository: String,
        #[serde(rename = "ref")]
        git_ref: String,
        commit: String,
    },
}

impl Source {
    /// Short human readable pin, e.g. `v0.8.0@1a2b3c4`.
    #[must_use]
    pub fn pin(&self) -> String {
        match self {
            Self::Builtin => "builtin".to_owned(),
            Self::Git { tag, commit, .. } => format!("{tag}@{}", short(commit)),
            Self::GitRef { git_ref, commit, .. } => format!("{git_ref}@{}", short(commit)),
        }
    }
}

fn short(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}

/// How the server activates an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSpec {
    #[serde(default)]
    pub shared_preload: bool,
    #[serde(default = "enabled_by_default")]
    pub create_extension: bool,
}

impl Default for RuntimeSpec {
    fn default() -> Self {
        Self { shared_preload: false, create_extension: true }
    }
}
