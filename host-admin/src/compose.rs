//! Pull updated images for every docker compose project under a root directory.

use crate::error::{AdminError, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{error, info, warn};
use walkdir::WalkDir;

const COMPOSE_FILE_NAMES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

#[derive(Debug, Default)]
pub struct PullSummary {
    pub updated: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl PullSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Project directories holding a compose file, sorted, one entry per directory
pub fn find_compose_projects(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut projects: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            COMPOSE_FILE_NAMES
                .iter()
                .any(|name| entry.file_name() == std::ffi::OsStr::new(name))
        })
        .filter_map(|entry| entry.path().parent().map(Path::to_path_buf))
        .collect();

    projects.sort();
    projects.dedup();
    projects
}

/// `docker-compose pull` -> `docker-compose up -d`
pub fn up_command(pull_command: &[String]) -> Vec<String> {
    let mut command: Vec<String> = pull_command.to_vec();
    if command.last().map(String::as_str) == Some("pull") {
        command.pop();
    }
    command.push("up".to_string());
    command.push("-d".to_string());
    command
}

async fn run_in(dir: &Path, command: &[String]) -> Result<()> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| AdminError::InvalidInput("empty compose command".into()))?;

    let status = Command::new(program).args(args).current_dir(dir).status().await?;
    if status.success() {
        Ok(())
    } else {
        Err(AdminError::CommandFailed {
            command: command.join(" "),
            status: status.to_string(),
        })
    }
}

/// Run the pull command in each project; one failing project does not stop the rest
pub async fn pull_images(root: &Path, pull_command: &[String], recreate: bool) -> Result<PullSummary> {
    let projects = {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || find_compose_projects(&root)).await?
    };

    let mut summary = PullSummary::default();
    if projects.is_empty() {
        println!("No compose files found in {}.", root.display());
        return Ok(summary);
    }

    let recreate_command = up_command(pull_command);
    for dir in projects {
        println!("{}", "=".repeat(60));
        println!("Updating Docker images in: {}", dir.display());
        println!("{}", "=".repeat(60));

        let mut result = run_in(&dir, pull_command).await;
        if result.is_ok() && recreate {
            result = run_in(&dir, &recreate_command).await;
        }

        match result {
            Ok(()) => {
                info!("Updated images in {}", dir.display());
                summary.updated.push(dir);
            }
            Err(e) => {
                error!("Failed to update images in {}: {}", dir.display(), e);
                summary.failed.push((dir, e.to_string()));
            }
        }
    }

    if summary.is_success() {
        println!("All Docker images updated!");
    } else {
        println!(
            "Updated {} project(s), {} failed.",
            summary.updated.len(),
            summary.failed.len()
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn strings(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_compose_projects() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        for (dir, file) in [
            ("media/jellyfin", "docker-compose.yml"),
            ("apps/gitea", "compose.yaml"),
            ("apps/gitea", "docker-compose.yaml"),
            ("notes", "README.md"),
        ] {
            fs::create_dir_all(root.join(dir))?;
            fs::write(root.join(dir).join(file), "services: {}\n")?;
        }

        let projects = find_compose_projects(root);
        assert_eq!(projects, vec![root.join("apps/gitea"), root.join("media/jellyfin")]);
        Ok(())
    }

    #[test]
    fn test_missing_root_has_no_projects() {
        assert!(find_compose_projects(Path::new("/nonexistent/docker")).is_empty());
    }

    #[test]
    fn test_up_command() {
        assert_eq!(up_command(&strings(&["docker-compose", "pull"])), strings(&["docker-compose", "up", "-d"]));
        assert_eq!(
            up_command(&strings(&["docker", "compose", "pull"])),
            strings(&["docker", "compose", "up", "-d"])
        );
    }

    #[tokio::test]
    async fn test_pull_continues_after_failure() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        for dir in ["a-broken", "b-ok"] {
            fs::create_dir_all(root.join(dir))?;
            fs::write(root.join(dir).join("compose.yml"), "services: {}\n")?;
        }
        fs::write(root.join("a-broken/fail"), "")?;

        // Fails only in directories holding a `fail` marker
        let command = strings(&["sh", "-c", "test ! -e fail"]);
        let summary = pull_images(root, &command, false).await.unwrap();

        assert!(!summary.is_success());
        assert_eq!(summary.updated, vec![root.join("b-ok")]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, root.join("a-broken"));
        Ok(())
    }
}
