// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Task catalogue loading
//!
//! The task file maps each domain to a list of task names. Every task's
//! configuration lives at `<base>/examples/<domain>/<task>.json`.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use vmr_domain_types::TaskSpec;

pub fn task_config_path(base_dir: &Path, domain: &str, task: &str) -> PathBuf {
    base_dir
        .join("examples")
        .join(domain)
        .join(format!("{}.json", task))
}

/// Task names listed per domain, sorted by domain.
pub fn read_task_file(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read task file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse task file {}", path.display()))
}

/// Load every task listed in `task_file`, optionally restricted to one
/// domain. Tasks whose configuration is missing are skipped with a warning.
pub fn load_tasks(task_file: &Path, base_dir: &Path, domain: Option<&str>) -> Result<Vec<TaskSpec>> {
    let catalogue = read_task_file(task_file)?;

    let mut tasks = Vec::new();
    for (name_domain, names) in &catalogue {
        if domain.is_some_and(|d| d != name_domain.as_str()) {
            continue;
        }
        for name in names {
            let name = name.strip_suffix(".json").unwrap_or(name);
            let path = task_config_path(base_dir, name_domain, name);
            if !path.exists() {
                warn!(path = %path.display(), "Task config not found, skipping");
                continue;
            }
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read task config {}", path.display()))?;
            let config: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse task config {}", path.display()))?;
            debug!(domain = %name_domain, task = name, "Loaded task");
            tasks.push(TaskSpec::from_config(name_domain, name, config));
        }
    }

    if tasks.is_empty() {
        match domain {
            Some(d) => bail!("No tasks found for domain {} in {}", d, task_file.display()),
            None => bail!("No tasks found in {}", task_file.display()),
        }
    }
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn catalogue() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("evaluation_examples");
        for (domain, task, instruction) in [
            ("chrome", "a1", "Open a new tab"),
            ("gimp", "g1", "Crop the image"),
        ] {
            let path = task_config_path(&base, domain, task);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(
                &path,
                format!(r#"{{"id": "{}", "instruction": "{}"}}"#, task, instruction),
            )
            .unwrap();
        }
        let task_file = base.join("test_all.json");
        fs::write(
            &task_file,
            r#"{"gimp": ["g1"], "chrome": ["a1.json", "missing"]}"#,
        )
        .unwrap();
        (dir, task_file)
    }

    #[test]
    fn loads_all_domains_and_skips_missing_configs() {
        let (dir, task_file) = catalogue();
        let base = dir.path().join("evaluation_examples");

        let tasks = load_tasks(&task_file, &base, None).unwrap();
        let names: Vec<_> = tasks.iter().map(|t| (t.domain.as_str(), t.name.as_str())).collect();
        assert_eq!(names, vec![("chrome", "a1"), ("gimp", "g1")]);
        assert_eq!(tasks[0].instruction, "Open a new tab");
    }

    #[test]
    fn domain_filter_and_empty_result() {
        let (dir, task_file) = catalogue();
        let base = dir.path().join("evaluation_examples");

        let tasks = load_tasks(&task_file, &base, Some("gimp")).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id(), "g1");

        let err = load_tasks(&task_file, &base, Some("vlc")).unwrap_err();
        assert!(err.to_string().contains("No tasks found for domain vlc"));
    }

    #[test]
    fn unreadable_task_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_tasks(&dir.path().join("nope.json"), dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("Failed to read task file"));
    }
}
