// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bring-up sequence.  Every step depends on the ones before it having
//! completed, so the first failure ends the run.

use std::path::Path;

use anyhow::{Context, Result};
use sysfs_endpoint::gpio::GpioLine;
use sysfs_endpoint::{write_endpoints, Backend};

use crate::board;
use crate::config::Config;

pub fn run(backend: &mut dyn Backend, config: &Config) -> Result<()> {
    let scd_dir = config.scd_dir();

    init_scd(backend, &scd_dir)?;
    register_devices(backend)?;
    init_qsfps(backend, &scd_dir)?;

    log::info!("bring-up complete");
    Ok(())
}

/// Loads the `scd` driver and hands it the board's tables.  The driver acts
/// on `init_trigger`, which is the final write.
fn init_scd(backend: &mut dyn Backend, scd_dir: &Path) -> Result<()> {
    log::info!("loading {} driver", board::SCD_DRIVER);
    load(backend, board::SCD_DRIVER)?;

    let endpoints = board::tables().endpoints();
    log::info!(
        "writing {} scd attributes to {}",
        endpoints.len(),
        scd_dir.display()
    );
    write_endpoints(backend, scd_dir, &endpoints)
        .context("failed to initialize scd")?;

    Ok(())
}

fn register_devices(backend: &mut dyn Backend) -> Result<()> {
    log::info!("loading temperature sensor drivers");
    for driver in board::TEMP_SENSOR_DRIVERS {
        load(backend, driver)?;
    }

    log::info!("registering {} PMBus devices", board::PMBUS_DEVICES.len());
    for dev in &board::PMBUS_DEVICES {
        dev.register(backend)?;
    }

    load(backend, board::EEPROM_DRIVER)?;

    let qsfps = board::qsfp_devices();
    log::info!("registering {} QSFP EEPROMs", qsfps.len());
    for dev in &qsfps {
        dev.register(backend)?;
    }

    Ok(())
}

/// Takes every QSFP out of reset and asserts its module select.
fn init_qsfps(backend: &mut dyn Backend, scd_dir: &Path) -> Result<()> {
    log::info!("releasing {} QSFPs from reset", board::NUM_QSFPS);

    for (name, high) in board::qsfp_outputs() {
        GpioLine::new(scd_dir.join(name)).set_output(backend, high)?;
    }

    Ok(())
}

fn load(backend: &mut dyn Backend, module: &str) -> Result<()> {
    backend
        .load_module(module)
        .with_context(|| format!("failed to load {}", module))
}
