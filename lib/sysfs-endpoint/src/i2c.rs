// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binding I2C devices to drivers through the bus's `new_device` attribute.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::Backend;

/// A device at a fixed address on a numbered I2C bus, handled by the named
/// kernel driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct I2cDevice {
    pub bus: u32,
    pub driver: &'static str,
    pub address: u8,
}

impl I2cDevice {
    pub const fn new(bus: u32, driver: &'static str, address: u8) -> Self {
        Self {
            bus,
            driver,
            address,
        }
    }

    pub fn new_device_path(&self) -> PathBuf {
        PathBuf::from(format!("bus/i2c/devices/i2c-{}/new_device", self.bus))
    }

    /// The line the kernel expects: driver name, then address in hex.
    pub fn new_device_line(&self) -> String {
        format!("{} 0x{:02x}", self.driver, self.address)
    }

    pub fn register(&self, backend: &mut dyn Backend) -> Result<()> {
        backend
            .write(&self.new_device_path(), &self.new_device_line())
            .with_context(|| {
                format!(
                    "failed to register {} at 0x{:02x} on i2c-{}",
                    self.driver, self.address, self.bus
                )
            })
    }
}
