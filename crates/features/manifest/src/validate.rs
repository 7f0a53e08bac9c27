use crate::error::ManifestError;
use fxhash::FxHashSet;
use pgpack_domain::manifest::{Manifest, Source};

const COMMIT_LEN: usize = 40;

/// Checks names, provenance pins and self-references, collecting every problem.
pub(crate) fn validate(manifest: &Manifest) -> Result<(), ManifestError> {
    let mut problems = Vec::new();
    let mut seen = FxHashSet::default();

    for (index, entry) in manifest.entries.iter().enumerate() {
        let name = entry.name.as_str();
        let label = if name.is_empty() { format!("entry #{index}") } else { format!("'{name}'") };

        if name.is_empty() {
            problems.push(format!("{label}: name is empty"));
        } else if !is_valid_name(name) {
            problems.push(format!("{label}: name must match [a-z0-9_]+"));
        } else if !seen.insert(name) {
            problems.push(format!("{label}: duplicate name"));
        }

        match &entry.source {
            Source::Builtin => {},
            Source::Git { repository, commit, .. } | Source::GitRef { repository, commit, .. } => {
                if repository.trim().is_empty() {
                    problems.push(format!("{label}: git source without repository"));
                }
                if !is_full_commit(commit) {
                    problems.push(format!(
                        "{label}: commit '{commit}' is not a {COMMIT_LEN}-character hex hash"
                    ));
                }
            },
        }

        if entry.dependencies.iter().any(|dep| dep == name) {
            problems.push(format!("{label}: depends on itself"));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ManifestError::Invalid { problems, context: None })
    }
}

fn is_valid_name(name: &str) -> bool {
    name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

fn is_full_commit(commit: &str) -> bool {
    commit.len() == COMMIT_LEN && commit.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_charset() {
        assert!(is_valid_name("pg_stat_statements"));
        assert!(is_valid_name("postgis3"));
        assert!(!is_valid_name("PostGIS"));
        assert!(!is_valid_name("pg-cron"));
    }

    #[test]
    fn commit_must_be_full_hex() {
        assert!(is_full_commit("2627c5ff775ae6d7aef0c430121ccf857842d2f2"));
        assert!(!is_full_commit("2627c5f"));
        assert!(!is_full_commit("zz27c5ff775ae6d7aef0c430121ccf857842d2f2"));
    }
}
