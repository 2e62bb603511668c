//! Bind mount planning.
//!
//! Order is fixed: workdir, home, cache, explicit mounts, then the
//! anonymous volume masking `.airlock` inside the workdir. The mask goes
//! last so no explicit mount can shadow it.

use std::path::PathBuf;

use crate::config::{MountMode, ProjectConfig, STATE_DIR};
use crate::paths::{container_path, join_container};

use super::image::SandboxUser;

/// One `-v` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MountArg {
    /// Implicit bind mount (workdir, home, cache).
    Bind { source: PathBuf, target: String },
    /// Mount declared in the configuration.
    Explicit {
        source: PathBuf,
        target: String,
        mode: MountMode,
    },
    /// Anonymous volume hiding a host path from the sandbox.
    Mask { target: String },
}

impl MountArg {
    /// Value of the `-v` flag. Bind mounts are relabeled (`Z`) for SELinux
    /// hosts.
    pub fn volume_spec(&self) -> String {
        match self {
            Self::Bind { source, target } => format!("{}:{target}:Z", source.display()),
            Self::Explicit {
                source,
                target,
                mode,
            } => format!("{}:{target}:{mode},Z", source.display()),
            Self::Mask { target } => target.clone(),
        }
    }

    /// Path the mount occupies inside the sandbox.
    #[cfg(test)]
    pub fn target(&self) -> &str {
        match self {
            Self::Bind { target, .. } | Self::Explicit { target, .. } | Self::Mask { target } => {
                target
            }
        }
    }
}

/// Compute every mount for the sandbox container.
pub(crate) fn plan_mounts(config: &ProjectConfig, user: &SandboxUser, work_dir: &str) -> Vec<MountArg> {
    let work_dir = container_path(work_dir);
    let home = container_path(&user.home);
    let mut mounts = Vec::with_capacity(config.mounts.len() + 4);

    let workdir_claimed = config
        .mounts
        .iter()
        .any(|m| container_path(&m.target) == work_dir);
    if !workdir_claimed {
        mounts.push(MountArg::Bind {
            source: config.project_dir.clone(),
            target: work_dir.clone(),
        });
    }

    mounts.push(MountArg::Bind {
        source: config.home_dir.clone(),
        target: home.clone(),
    });
    mounts.push(MountArg::Bind {
        source: config.cache_dir.clone(),
        target: join_container(&home, ".cache"),
    });

    mounts.extend(config.mounts.iter().map(|m| MountArg::Explicit {
        source: PathBuf::from(&m.source),
        target: m.target.clone(),
        mode: m.mode,
    }));

    mounts.push(MountArg::Mask {
        target: join_container(&work_dir, STATE_DIR),
    });
    mounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, ConfigLayer};
    use std::path::Path;

    fn config(yaml: &str) -> ProjectConfig {
        resolve(
            ConfigLayer::from_yaml(yaml).unwrap(),
            Path::new("/srv/demo"),
            |_| false,
        )
        .unwrap()
    }

    fn user(home: &str) -> SandboxUser {
        SandboxUser {
            name: "dev".to_string(),
            uid: None,
            gid: None,
            home: home.to_string(),
        }
    }

    fn specs(mounts: &[MountArg]) -> Vec<String> {
        mounts.iter().map(MountArg::volume_spec).collect()
    }

    #[test]
    fn test_default_plan() {
        let mounts = plan_mounts(&config("image: x\n"), &user("/home/dev"), "/workspace");
        assert_eq!(
            specs(&mounts),
            vec![
                "/srv/demo:/workspace:Z",
                "/srv/demo/.airlock/home:/home/dev:Z",
                "/srv/demo/.airlock/cache:/home/dev/.cache:Z",
                "/workspace/.airlock",
            ]
        );
    }

    #[test]
    fn test_explicit_mounts_between_cache_and_mask() {
        let cfg = config(
            "image: x\nmounts:\n  - {source: ./data, target: /mnt/data, mode: ro}\n  - {source: /opt/tools, target: /opt/tools}\n",
        );
        let mounts = plan_mounts(&cfg, &user("/home/dev"), "/workspace");
        assert_eq!(mounts.len(), 6);
        assert_eq!(mounts[3].volume_spec(), "/srv/demo/data:/mnt/data:ro,Z");
        assert_eq!(mounts[4].volume_spec(), "/opt/tools:/opt/tools:rw,Z");
        assert_eq!(
            mounts.last(),
            Some(&MountArg::Mask {
                target: "/workspace/.airlock".to_string()
            })
        );
    }

    #[test]
    fn test_explicit_workdir_mount_suppresses_default() {
        let cfg = config(
            "image: x\nmounts:\n  - {source: ./src, target: /workspace/}\n  - {source: ./data, target: /data}\n",
        );
        let mounts = plan_mounts(&cfg, &user("/home/dev"), "/workspace");

        let workspace_mounts: Vec<_> = mounts
            .iter()
            .filter(|m| container_path(m.target()) == "/workspace")
            .collect();
        assert_eq!(workspace_mounts.len(), 1);
        assert_eq!(
            workspace_mounts[0].volume_spec(),
            "/srv/demo/src:/workspace/:rw,Z"
        );
        assert!(matches!(mounts[0], MountArg::Bind { ref target, .. } if target == "/home/dev"));
    }

    #[test]
    fn test_mask_stays_last_even_when_explicit_mount_overlaps() {
        let cfg = config(
            "image: x\nmounts:\n  - {source: ./elsewhere, target: /workspace/.airlock}\n",
        );
        let mounts = plan_mounts(&cfg, &user("/home/dev"), "/workspace");
        assert!(matches!(mounts.last(), Some(MountArg::Mask { .. })));
        assert_eq!(
            mounts.last().unwrap().target(),
            "/workspace/.airlock"
        );
    }

    #[test]
    fn test_root_home_and_root_workdir() {
        let mounts = plan_mounts(&config("image: x\n"), &user("/root"), "/");
        assert_eq!(
            specs(&mounts),
            vec![
                "/srv/demo:/:Z",
                "/srv/demo/.airlock/home:/root:Z",
                "/srv/demo/.airlock/cache:/root/.cache:Z",
                "/.airlock",
            ]
        );
    }

    #[test]
    fn test_custom_home_and_cache_dirs() {
        let cfg = config("image: x\nhome: /var/lib/airlock/home\ncache: ../shared-cache\n");
        let mounts = plan_mounts(&cfg, &user("/home/dev/"), "/src");
        assert_eq!(mounts[1].volume_spec(), "/var/lib/airlock/home:/home/dev:Z");
        assert_eq!(mounts[2].volume_spec(), "/srv/shared-cache:/home/dev/.cache:Z");
        assert_eq!(mounts[3].volume_spec(), "/src/.airlock");
    }
}
