use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Searched recursively for compose files
    pub compose_root: PathBuf,
    /// Program and arguments run in each compose project directory
    pub compose_command: Vec<String>,
    pub wg_dir: PathBuf,
    pub log_level: String,
}

impl AdminConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let compose_root = lookup("COMPOSE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("/root"))
                    .join("docker")
            });

        let compose_command: Vec<String> = lookup("COMPOSE_COMMAND")
            .unwrap_or_else(|| "docker-compose pull".into())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Self {
            compose_root,
            compose_command: if compose_command.is_empty() {
                vec!["docker-compose".into(), "pull".into()]
            } else {
                compose_command
            },
            wg_dir: PathBuf::from(lookup("WG_DIR").unwrap_or_else(|| "/etc/wireguard".into())),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AdminConfig::from_lookup(|_| None);
        assert!(config.compose_root.ends_with("docker"));
        assert_eq!(config.compose_command, vec!["docker-compose", "pull"]);
        assert_eq!(config.wg_dir, PathBuf::from("/etc/wireguard"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("COMPOSE_ROOT", "/srv/stacks"),
            ("COMPOSE_COMMAND", "docker compose pull"),
            ("WG_DIR", "/tmp/wg"),
            ("LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();
        let config = AdminConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.compose_root, PathBuf::from("/srv/stacks"));
        assert_eq!(config.compose_command, vec!["docker", "compose", "pull"]);
        assert_eq!(config.wg_dir, PathBuf::from("/tmp/wg"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_blank_command_falls_back() {
        let config = AdminConfig::from_lookup(|key| (key == "COMPOSE_COMMAND").then(|| "  ".to_string()));
        assert_eq!(config.compose_command, vec!["docker-compose", "pull"]);
    }
}
