//! Environment composition for the sandbox container.
//!
//! Image defaults < project config < identity variables. The identity
//! variables always win: they point at the home and cache mounts.

use std::collections::BTreeMap;

use crate::paths::{container_path, join_container};

/// Compose the container environment.
pub(crate) fn compose_env(
    image_env: &[(String, String)],
    config_env: &BTreeMap<String, String>,
    home: &str,
    work_dir: &str,
) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = image_env.iter().cloned().collect();
    env.extend(config_env.iter().map(|(k, v)| (k.clone(), v.clone())));

    let identity = [
        ("HOME", container_path(home)),
        ("XDG_CACHE_HOME", join_container(home, ".cache")),
        ("XDG_CONFIG_HOME", join_container(home, ".config")),
        ("XDG_DATA_HOME", join_container(home, ".local/share")),
        ("WORKDIR", work_dir.to_string()),
    ];
    env.extend(identity.into_iter().map(|(k, v)| (k.to_string(), v)));
    env
}

/// Turn host variable names into `-e` values for `exec`.
///
/// Names are looked up when the command runs. Unset names are skipped;
/// `NAME=value` entries pass through untouched.
pub(crate) fn forward_env<L>(names: &[String], lookup: L) -> Vec<String>
where
    L: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| {
            if name.contains('=') {
                return Some(name.clone());
            }
            match lookup(name) {
                Some(value) => Some(format!("{name}={value}")),
                None => {
                    tracing::warn!("Not forwarding {}: not set in the host environment", name);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_precedence() {
        let image = pairs(&[("PATH", "/usr/bin"), ("LANG", "C"), ("EDITOR", "nano")]);
        let config: BTreeMap<_, _> = pairs(&[("EDITOR", "vim"), ("TOKEN", "abc")])
            .into_iter()
            .collect();

        let env = compose_env(&image, &config, "/home/dev", "/workspace");
        assert_eq!(env["PATH"], "/usr/bin");
        assert_eq!(env["LANG"], "C");
        assert_eq!(env["EDITOR"], "vim");
        assert_eq!(env["TOKEN"], "abc");
        assert_eq!(env["WORKDIR"], "/workspace");
    }

    #[test]
    fn test_identity_variables_cannot_be_overridden() {
        let image = pairs(&[("HOME", "/image-home"), ("XDG_DATA_HOME", "/image-data")]);
        let config: BTreeMap<_, _> = pairs(&[
            ("HOME", "/config-home"),
            ("XDG_CACHE_HOME", "/tmp/cache"),
            ("XDG_CONFIG_HOME", "/tmp/config"),
            ("WORKDIR", "/elsewhere"),
        ])
        .into_iter()
        .collect();

        let env = compose_env(&image, &config, "/home/dev/", "/src");
        assert_eq!(env["HOME"], "/home/dev");
        assert_eq!(env["XDG_CACHE_HOME"], "/home/dev/.cache");
        assert_eq!(env["XDG_CONFIG_HOME"], "/home/dev/.config");
        assert_eq!(env["XDG_DATA_HOME"], "/home/dev/.local/share");
        assert_eq!(env["WORKDIR"], "/src");
    }

    #[test]
    fn test_root_home_stays_root() {
        let env = compose_env(&[], &BTreeMap::new(), "/", "/workspace");
        assert_eq!(env["HOME"], "/");
        assert_eq!(env["XDG_CACHE_HOME"], "/.cache");
        assert_eq!(env["XDG_CONFIG_HOME"], "/.config");
        assert_eq!(env["XDG_DATA_HOME"], "/.local/share");
    }

    #[test]
    fn test_forward_env_reads_current_values() {
        let names = vec![
            "ANTHROPIC_API_KEY".to_string(),
            "MISSING".to_string(),
            "LITERAL=1".to_string(),
        ];
        let forwarded = forward_env(&names, |name| {
            (name == "ANTHROPIC_API_KEY").then(|| "sk-test".to_string())
        });
        assert_eq!(forwarded, vec!["ANTHROPIC_API_KEY=sk-test", "LITERAL=1"]);
    }
}
