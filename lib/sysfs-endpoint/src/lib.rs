// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Writes to kernel-exposed configuration endpoints.
//!
//! Everything a bring-up sequence does to the system is either a kernel
//! module load or a single write of a string to a sysfs attribute.  The
//! [`Backend`] trait captures exactly those two operations.  [`Sysfs`]
//! performs them for real; [`Journal`] only records them, which is what dry
//! runs and tests use.
//!
//! Paths handed to a backend are relative to the sysfs mount point (e.g.
//! `bus/i2c/devices/i2c-3/new_device`).  Each write opens the endpoint,
//! writes the whole value and closes it before returning, so a sequence of
//! writes reaches the kernel in the order it was issued.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};

pub mod gpio;
pub mod i2c;

pub trait Backend {
    /// Loads a kernel module by name.
    fn load_module(&mut self, name: &str) -> Result<()>;

    /// Writes `value` to the endpoint at `path`.
    fn write(&mut self, path: &Path, value: &str) -> Result<()>;
}

/// The real system: writes land under `root`, and modules are loaded by
/// running `modprobe`.
#[derive(Clone, Debug)]
pub struct Sysfs {
    root: PathBuf,
    modprobe: PathBuf,
}

impl Sysfs {
    pub fn new(root: impl Into<PathBuf>, modprobe: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            modprobe: modprobe.into(),
        }
    }
}

impl Backend for Sysfs {
    fn load_module(&mut self, name: &str) -> Result<()> {
        log::debug!("{} {}", self.modprobe.display(), name);

        let status = Command::new(&self.modprobe)
            .arg(name)
            .status()
            .with_context(|| {
                format!("failed to run {}", self.modprobe.display())
            })?;

        if !status.success() {
            bail!("loading module {} failed: {}", name, status);
        }

        Ok(())
    }

    fn write(&mut self, path: &Path, value: &str) -> Result<()> {
        let full = self.root.join(path);
        log::debug!("{} <- {}", full.display(), value);

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&full)
            .with_context(|| format!("failed to open {}", full.display()))?;

        file.write_all(value.as_bytes())
            .with_context(|| format!("failed to write {}", full.display()))?;

        Ok(())
    }
}

/// An operation recorded by a [`Journal`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    LoadModule(String),
    Write { path: PathBuf, value: String },
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::LoadModule(name) => write!(f, "modprobe {}", name),
            Op::Write { path, value } => {
                write!(f, "{} <- {}", path.display(), value)
            }
        }
    }
}

/// Records operations without touching the system.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    ops: Vec<Op>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }
}

impl Backend for Journal {
    fn load_module(&mut self, name: &str) -> Result<()> {
        self.ops.push(Op::LoadModule(name.to_string()));
        Ok(())
    }

    fn write(&mut self, path: &Path, value: &str) -> Result<()> {
        self.ops.push(Op::Write {
            path: path.to_owned(),
            value: value.to_string(),
        });
        Ok(())
    }
}

/// Writes each `(endpoint, value)` pair into `dir`, strictly in order.  The
/// first failure stops the sequence; nothing after it is written.
pub fn write_endpoints<S>(
    backend: &mut dyn Backend,
    dir: &Path,
    endpoints: &[(S, String)],
) -> Result<()>
where
    S: AsRef<str>,
{
    for (name, value) in endpoints {
        let name = name.as_ref();
        backend
            .write(&dir.join(name), value)
            .with_context(|| format!("failed to set {}", name))?;
    }

    Ok(())
}
