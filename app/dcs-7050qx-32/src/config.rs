// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::board;

/// Where and how to bring the board up.  Every field has a default, so an
/// empty file (or no file at all) describes a stock system.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
    #[serde(default = "default_modprobe")]
    pub modprobe: PathBuf,
    #[serde(default)]
    pub scd: Scd,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Scd {
    #[serde(default = "default_pci_address")]
    pub pci_address: String,
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys")
}

fn default_modprobe() -> PathBuf {
    PathBuf::from("modprobe")
}

fn default_pci_address() -> String {
    board::SCD_PCI_ADDRESS.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sysfs_root: default_sysfs_root(),
            modprobe: default_modprobe(),
            scd: Scd::default(),
        }
    }
}

impl Default for Scd {
    fn default() -> Self {
        Self {
            pci_address: default_pci_address(),
        }
    }
}

impl Config {
    /// Loads `cfg` if given, falling back to defaults, then applies a
    /// command-line `sysfs_root`, which wins over the file.
    pub fn load(
        cfg: Option<&Path>,
        sysfs_root: Option<PathBuf>,
    ) -> Result<Self> {
        let mut config = match cfg {
            Some(cfg) => Self::from_file(cfg)?,
            None => Self::default(),
        };

        if let Some(root) = sysfs_root {
            config.sysfs_root = root;
        }

        Ok(config)
    }

    pub fn from_file(cfg: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(cfg)
            .with_context(|| format!("could not read {}", cfg.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("could not load {}", cfg.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        check_pci_address(&config.scd.pci_address)?;
        Ok(config)
    }

    /// The `scd` driver's directory for our device, relative to the sysfs
    /// root.
    pub fn scd_dir(&self) -> PathBuf {
        Path::new("bus/pci/drivers")
            .join(board::SCD_DRIVER)
            .join(&self.scd.pci_address)
    }
}

/// Checks for `domain:bus:device.function`, all hex, e.g. `0000:04:00.0`.
/// The address becomes a path component, so anything else is refused.
fn check_pci_address(addr: &str) -> Result<()> {
    let well_formed = (|| {
        let (rest, function) = addr.rsplit_once('.')?;
        let mut parts = rest.split(':');
        let lengths = [4, 2, 2];
        for len in lengths {
            let part = parts.next()?;
            if part.len() != len || !part.chars().all(|c| c.is_ascii_hexdigit())
            {
                return None;
            }
        }
        if parts.next().is_some() {
            return None;
        }
        if function.len() != 1 || !function.chars().all(|c| c.is_digit(8)) {
            return None;
        }
        Some(())
    })();

    if well_formed.is_none() {
        bail!("\"{}\" is not a PCI address (expected e.g. 0000:04:00.0)", addr);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn empty_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.sysfs_root, PathBuf::from("/sys"));
        assert_eq!(config.modprobe, PathBuf::from("modprobe"));
        assert_eq!(config.scd.pci_address, "0000:04:00.0");
        assert_eq!(
            config.scd_dir(),
            PathBuf::from("bus/pci/drivers/scd/0000:04:00.0")
        );
    }

    #[test]
    fn overrides() {
        let config = Config::from_toml(indoc! {r#"
            sysfs-root = "/tmp/sys"
            modprobe = "/sbin/modprobe"

            [scd]
            pci-address = "0000:05:00.1"
        "#})
        .unwrap();

        assert_eq!(config.sysfs_root, PathBuf::from("/tmp/sys"));
        assert_eq!(config.modprobe, PathBuf::from("/sbin/modprobe"));
        assert_eq!(
            config.scd_dir(),
            PathBuf::from("bus/pci/drivers/scd/0000:05:00.1")
        );
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(Config::from_toml("sysfs = \"/sys\"").is_err());
        assert!(Config::from_toml(indoc! {r#"
            [scd]
            address = "0000:04:00.0"
        "#})
        .is_err());
    }

    #[test]
    fn bad_pci_address() {
        for addr in ["", "04:00.0", "0000:04:00", "../../..", "0000:04:00.8"] {
            let toml = format!("[scd]\npci-address = \"{addr}\"\n");
            assert!(Config::from_toml(&toml).is_err(), "accepted {addr:?}");
        }
        check_pci_address("0000:af:1f.7").unwrap();
    }

    #[test]
    fn command_line_root_wins() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("app.toml");
        std::fs::write(&cfg, "sysfs-root = \"/a\"\nmodprobe = \"/m\"\n")
            .unwrap();

        let config =
            Config::load(Some(&cfg), Some(PathBuf::from("/b"))).unwrap();
        assert_eq!(config.sysfs_root, PathBuf::from("/b"));
        assert_eq!(config.modprobe, PathBuf::from("/m"));

        let config = Config::load(Some(&cfg), None).unwrap();
        assert_eq!(config.sysfs_root, PathBuf::from("/a"));

        let config = Config::load(None, Some(PathBuf::from("/b"))).unwrap();
        assert_eq!(config.sysfs_root, PathBuf::from("/b"));
        assert_eq!(config.scd, Scd::default());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml")), None)
            .unwrap_err();
        assert!(err.to_string().contains("nope.toml"), "{err:#}");
    }

    #[test]
    fn shipped_config_is_default() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("app.toml");
        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
    }
}
