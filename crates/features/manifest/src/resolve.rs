use crate::error::ManifestError;
use fxhash::FxHashMap;
use pgpack_domain::manifest::{ExtensionEntry, Manifest};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Orders the enabled entries so every dependency precedes its dependents.
///
/// # Algorithm
/// Kahn's algorithm over `dependency -> dependent` edges. Ready entries wait in a
/// min-heap keyed by name, so independent entries come out alphabetically and the
/// order is stable across runs.
pub(crate) fn resolve_order(manifest: &Manifest) -> Result<Vec<&ExtensionEntry>, ManifestError> {
    let mut all: FxHashMap<&str, &ExtensionEntry> = FxHashMap::default();
    for entry in &manifest.entries {
        if all.insert(entry.name.as_str(), entry).is_some() {
            return Err(ManifestError::Duplicate { name: entry.name.clone(), context: None });
        }
    }
    let enabled: FxHashMap<&str, &ExtensionEntry> =
        all.iter().filter(|(_, e)| e.enabled).map(|(k, e)| (*k, *e)).collect();

    let mut dependents: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    let mut in_degree: FxHashMap<&str, usize> = enabled.keys().map(|k| (*k, 0)).collect();

    for entry in enabled.values() {
        for dep in &entry.dependencies {
            match all.get(dep.as_str()) {
                None => {
                    return Err(ManifestError::UnknownDependency {
                        entry: entry.name.clone(),
                        dependency: dep.clone(),
                        context: None,
                    });
                },
                Some(target) if !target.enabled => {
                    return Err(ManifestError::DisabledDependency {
                        entry: entry.name.clone(),
                        dependency: dep.clone(),
                        context: None,
                    });
                },
                Some(_) => {},
            }
            dependents.entry(dep.as_str()).or_default().push(entry.name.as_str());
            if let Some(degree) = in_degree.get_mut(entry.name.as_str()) {
                *degree += 1;
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<&str>> =
        in_degree.iter().filter(|(_, d)| **d == 0).map(|(k, _)| Reverse(*k)).collect();

    let mut sorted = Vec::with_capacity(enabled.len());
    while let Some(Reverse(name)) = ready.pop() {
        sorted.push(enabled[name]);

        for dependent in dependents.get(name).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(*dependent));
                }
            }
        }
    }

    if sorted.len() != enabled.len() {
        let mut entries: Vec<String> = in_degree
            .into_iter()
            .filter(|(_, d)| *d > 0)
            .map(|(k, _)| k.to_owned())
            .collect();
        entries.sort_unstable();
        return Err(ManifestError::Cycle { entries, context: None });
    }

    Ok(sorted)
}
