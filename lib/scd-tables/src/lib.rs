// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hardware tables for the Arista `scd` (switch card device) driver.
//!
//! The driver learns where the board's reset lines, LEDs, GPIOs and SMBus
//! masters live by reading comma-separated lists from a set of sysfs
//! attributes.  This crate holds the in-memory form of those tables and
//! renders them into the exact text the driver parses.  Tables are built
//! once from constants and never mutated; malformed constants (a bit that
//! appears twice in a group, a group address that appears twice) are
//! programming errors and panic at construction.
//!
//! [`ScdTables::endpoints`] yields the attribute writes in the order the
//! driver requires, ending with [`INIT_TRIGGER`].

use std::collections::BTreeMap;
use std::fmt::Display;

use itertools::Itertools;

/// Name of the attribute that tells the driver its tables are complete.
/// This must be the last attribute written.
pub const INIT_TRIGGER: &str = "init_trigger";

/// A line that occupies one bit of a register in a [`Groups`] table.
pub trait Line {
    fn bit(&self) -> u8;
    fn name(&self) -> &str;
}

/// A reset line: one bit of a reset register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResetLine {
    pub bit: u8,
    pub name: String,
}

impl ResetLine {
    pub fn new(bit: u8, name: impl Into<String>) -> Self {
        Self {
            bit,
            name: name.into(),
        }
    }
}

impl Line for ResetLine {
    fn bit(&self) -> u8 {
        self.bit
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// A GPIO line in the SCD address space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gpio {
    pub bit: u8,
    pub name: String,
    pub read_only: bool,
    pub active_low: bool,
}

impl Gpio {
    pub fn new(
        bit: u8,
        name: impl Into<String>,
        read_only: bool,
        active_low: bool,
    ) -> Self {
        Self {
            bit,
            name: name.into(),
            read_only,
            active_low,
        }
    }
}

impl Line for Gpio {
    fn bit(&self) -> u8 {
        self.bit
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// An LED register in the SCD address space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Led {
    pub addr: u32,
    pub name: String,
}

impl Led {
    pub fn new(addr: u32, name: impl Into<String>) -> Self {
        Self {
            addr,
            name: name.into(),
        }
    }
}

/// A southbridge GPIO, identified by GPIO number rather than register and
/// bit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SbGpio {
    pub number: u32,
    pub name: String,
    pub read_only: bool,
    pub active_low: bool,
}

impl SbGpio {
    pub fn new(
        number: u32,
        name: impl Into<String>,
        read_only: bool,
        active_low: bool,
    ) -> Self {
        Self {
            number,
            name: name.into(),
            read_only,
            active_low,
        }
    }
}

/// A southbridge LED, driven through a southbridge GPIO number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SbLed {
    pub number: u32,
    pub name: String,
}

impl SbLed {
    pub fn new(number: u32, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
        }
    }
}

/// Lines grouped by register address, kept sorted by address.  Within a
/// group, lines keep their declaration order, so the flattened name list
/// lines up with the per-group address and mask lists group by group.
#[derive(Clone, Debug)]
pub struct Groups<L> {
    groups: BTreeMap<u32, Vec<L>>,
}

impl<L: Line> Groups<L> {
    pub fn new<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = (u32, Vec<L>)>,
    {
        let mut map = BTreeMap::new();

        for (addr, lines) in groups {
            let mut seen = 0u32;

            for line in &lines {
                let bit = line.bit();

                if bit >= 32 {
                    panic!(
                        "{} at 0x{:x} uses bit {}, which does not fit \
                        in a 32-bit mask",
                        line.name(),
                        addr,
                        bit
                    );
                }

                if seen & (1u32 << bit) != 0 {
                    panic!("bit {} appears twice at 0x{:x}", bit, addr);
                }

                seen |= 1u32 << bit;
            }

            if map.insert(addr, lines).is_some() {
                panic!("group at 0x{:x} appears twice", addr);
            }
        }

        Self { groups: map }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, addr: u32) -> Option<&[L]> {
        self.groups.get(&addr).map(Vec::as_slice)
    }

    /// Group addresses, ascending.
    pub fn addrs(&self) -> impl Iterator<Item = u32> + '_ {
        self.groups.keys().copied()
    }

    /// Every line's name, group by group in address order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups.values().flatten().map(Line::name)
    }

    /// One mask per group, with a bit set for each line that `select`
    /// accepts.  A group with no selected lines yields 0.
    pub fn masks<F>(&self, select: F) -> Vec<u32>
    where
        F: Fn(&L) -> bool,
    {
        self.groups
            .values()
            .map(|lines| {
                lines
                    .iter()
                    .filter(|l| select(*l))
                    .fold(0u32, |mask, l| mask | (1u32 << l.bit()))
            })
            .collect()
    }
}

impl Groups<ResetLine> {
    pub fn reset_masks(&self) -> Vec<u32> {
        self.masks(|_| true)
    }
}

impl Groups<Gpio> {
    /// Which bits of each register are GPIOs at all.
    pub fn presence_masks(&self) -> Vec<u32> {
        self.masks(|_| true)
    }

    pub fn read_only_masks(&self) -> Vec<u32> {
        self.masks(|g| g.read_only)
    }

    pub fn active_low_masks(&self) -> Vec<u32> {
        self.masks(|g| g.active_low)
    }
}

/// Formats an address or mask the way the driver expects it.
pub fn hex(value: u32) -> String {
    format!("0x{:08x}", value)
}

pub fn hex_list<I>(values: I) -> String
where
    I: IntoIterator<Item = u32>,
{
    values.into_iter().map(hex).join(",")
}

pub fn dec_list<I, T>(values: I) -> String
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    values.into_iter().join(",")
}

pub fn flag_list<I>(values: I) -> String
where
    I: IntoIterator<Item = bool>,
{
    values.into_iter().map(u8::from).join(",")
}

pub fn name_list<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().join(",")
}

/// Everything the `scd` driver needs to know about a board.
#[derive(Clone, Debug)]
pub struct ScdTables {
    pub resets: Groups<ResetLine>,
    pub smbus_masters: Vec<u32>,
    pub leds: Vec<Led>,
    pub sb_gpios: Vec<SbGpio>,
    pub sb_leds: Vec<SbLed>,
    pub num_sb_fans: u32,
    pub gpios: Groups<Gpio>,
}

impl ScdTables {
    /// The attribute writes that load these tables into the driver, in the
    /// order they must be issued.  [`INIT_TRIGGER`] is always last.
    pub fn endpoints(&self) -> Vec<(&'static str, String)> {
        let resets = &self.resets;
        let gpios = &self.gpios;
        let sb_gpios = &self.sb_gpios;
        let sb_leds = &self.sb_leds;

        vec![
            ("reset_addrs", hex_list(resets.addrs())),
            ("reset_names", name_list(resets.names())),
            ("reset_masks", hex_list(resets.reset_masks())),
            ("master_addrs", hex_list(self.smbus_masters.iter().copied())),
            ("led_addrs", hex_list(self.leds.iter().map(|l| l.addr))),
            ("led_names", name_list(self.leds.iter().map(|l| &*l.name))),
            ("sb_gpios", dec_list(sb_gpios.iter().map(|g| g.number))),
            ("sb_gpio_names", name_list(sb_gpios.iter().map(|g| &*g.name))),
            ("sb_gpios_ro", flag_list(sb_gpios.iter().map(|g| g.read_only))),
            (
                "sb_gpios_active_low",
                flag_list(sb_gpios.iter().map(|g| g.active_low)),
            ),
            ("gpio_addrs", hex_list(gpios.addrs())),
            ("gpio_masks", hex_list(gpios.presence_masks())),
            ("gpio_names", name_list(gpios.names())),
            ("gpio_ro", hex_list(gpios.read_only_masks())),
            ("gpio_active_low", hex_list(gpios.active_low_masks())),
            ("num_sb_fans", self.num_sb_fans.to_string()),
            ("sb_leds", dec_list(sb_leds.iter().map(|l| l.number))),
            ("sb_led_names", name_list(sb_leds.iter().map(|l| &*l.name))),
            (INIT_TRIGGER, "1".to_string()),
        ]
    }
}
