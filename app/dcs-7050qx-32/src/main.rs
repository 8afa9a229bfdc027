// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sysfs_endpoint::{Journal, Sysfs};

mod board;
mod config;
mod sequence;

use crate::config::Config;

#[derive(Debug, Parser)]
#[clap(
    max_term_width = 80,
    about = "SCD table programming and device bring-up for the DCS-7050QX-32"
)]
struct Args {
    /// Path to the configuration file, in TOML.
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Where sysfs is mounted.  Overrides the configuration file.
    #[clap(long, global = true)]
    sysfs_root: Option<PathBuf>,

    #[clap(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Loads the scd driver, programs its tables, registers the board's
    /// I2C devices and releases the QSFPs from reset.
    Init {
        /// Print every operation instead of performing it.
        #[clap(long)]
        dry_run: bool,
    },

    /// Prints the scd attributes as `name=value`, in write order.
    Tables,
}

fn main() -> Result<()> {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "info");

    env_logger::init_from_env(env);

    let args = Args::parse();
    let config = Config::load(args.config.as_deref(), args.sysfs_root)?;

    match args.cmd {
        Cmd::Init { dry_run: true } => {
            for line in dry_run(&config)? {
                println!("{}", line);
            }
        }
        Cmd::Init { dry_run: false } => {
            log::info!(
                "bringing up scd {} under {}",
                config.scd.pci_address,
                config.sysfs_root.display()
            );

            let mut sysfs = Sysfs::new(&config.sysfs_root, &config.modprobe);
            sequence::run(&mut sysfs, &config)?;
        }
        Cmd::Tables => {
            for line in table_lines() {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

/// Every operation `init` would perform, one per line, with paths relative
/// to the sysfs root.
fn dry_run(config: &Config) -> Result<Vec<String>> {
    let mut journal = Journal::new();
    sequence::run(&mut journal, config)?;

    Ok(journal.ops().iter().map(ToString::to_string).collect())
}

fn table_lines() -> Vec<String> {
    board::tables()
        .endpoints()
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect()
}
