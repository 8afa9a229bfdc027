// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hardware description of the DCS-7050QX-32.

use scd_tables::{Gpio, Groups, Led, ResetLine, SbGpio, SbLed, ScdTables};
use sysfs_endpoint::i2c::I2cDevice;

pub const SCD_PCI_ADDRESS: &str = "0000:04:00.0";

pub const SCD_DRIVER: &str = "scd";
pub const TEMP_SENSOR_DRIVERS: [&str; 2] = ["lm73", "lm90"];
pub const EEPROM_DRIVER: &str = "eeprom";

pub const NUM_QSFPS: u32 = 32;
pub const NUM_SB_FANS: u32 = 4;

pub const PMBUS_DEVICES: [I2cDevice; 4] = [
    I2cDevice::new(3, "pmbus", 0x4e),
    I2cDevice::new(5, "pmbus", 0x58),
    I2cDevice::new(6, "pmbus", 0x58),
    I2cDevice::new(7, "pmbus", 0x4e),
];

/// QSFP N (1-based) sits on bus `QSFP_FIRST_BUS + N - 1`.
pub const QSFP_FIRST_BUS: u32 = 10;
pub const QSFP_EEPROM_ADDRESS: u8 = 0x50;

pub fn resets() -> Groups<ResetLine> {
    Groups::new([(
        0x4000,
        vec![
            ResetLine::new(0, "t2_reset"),
            ResetLine::new(2, "phy1_reset"),
            ResetLine::new(3, "phy2_reset"),
            ResetLine::new(4, "phy3_reset"),
            ResetLine::new(5, "phy4_reset"),
        ],
    )])
}

pub fn smbus_masters() -> Vec<u32> {
    (0x8000..=0x8400).step_by(0x100).collect()
}

pub fn leds() -> Vec<Led> {
    let mut leds = vec![
        Led::new(0x6050, "status"),
        Led::new(0x6060, "fan_status"),
        Led::new(0x6070, "psu1"),
        Led::new(0x6080, "psu2"),
        Led::new(0x6090, "beacon"),
    ];

    // Ports 1-24 break out into four lanes, one LED each.
    let mut addr = 0x6100;
    for port in 1..=24 {
        for lane in 1..=4 {
            leds.push(Led::new(addr, format!("qsfp{}_{}", port, lane)));
            addr += 0x10;
        }
    }

    // Ports 25-32 have a single LED.  The spacing follows the board layout:
    // 0x30 after an odd port, 0x50 after an even one.
    let mut addr = 0x6720;
    for port in 25..=NUM_QSFPS {
        leds.push(Led::new(addr, format!("qsfp{}", port)));
        addr += if port % 2 == 1 { 0x30 } else { 0x50 };
    }

    leds
}

pub fn sb_gpios() -> Vec<SbGpio> {
    let mut gpios = vec![];

    for i in 0..NUM_SB_FANS {
        let fan = i + 1;
        let base = 203 + 6 * i;
        for id in 0..3 {
            gpios.push(SbGpio::new(
                base + id,
                format!("fan{}_id{}", fan, id),
                true,
                false,
            ));
        }
        gpios.push(SbGpio::new(
            base + 3,
            format!("fan{}_present", fan),
            true,
            true,
        ));
    }

    gpios
}

pub fn sb_leds() -> Vec<SbLed> {
    (0..NUM_SB_FANS)
        .map(|i| SbLed::new(207 + 6 * i, format!("fan{}_led", i + 1)))
        .collect()
}

pub fn gpios() -> Groups<Gpio> {
    let psus = (
        0x5000,
        vec![
            Gpio::new(0, "psu1_present", true, false),
            Gpio::new(1, "psu2_present", true, false),
        ],
    );

    let qsfps = (1..=NUM_QSFPS).map(|port| {
        let addr = 0x5010 + 0x10 * (port - 1);
        let name = |what: &str| format!("qsfp{}_{}", port, what);
        (
            addr,
            vec![
                Gpio::new(0, name("interrupt"), true, true),
                Gpio::new(2, name("present"), true, true),
                Gpio::new(3, name("interrupt_changed"), true, false),
                Gpio::new(5, name("present_changed"), true, false),
                Gpio::new(6, name("lp_mode"), false, false),
                Gpio::new(7, name("reset"), false, false),
                Gpio::new(8, name("modsel"), false, true),
            ],
        )
    });

    Groups::new(std::iter::once(psus).chain(qsfps))
}

pub fn tables() -> ScdTables {
    ScdTables {
        resets: resets(),
        smbus_masters: smbus_masters(),
        leds: leds(),
        sb_gpios: sb_gpios(),
        sb_leds: sb_leds(),
        num_sb_fans: NUM_SB_FANS,
        gpios: gpios(),
    }
}

/// The QSFP control lines driven at bring-up, taken from the GPIO table in
/// address order: each port's reset is released (low) and its module select
/// asserted (high).
pub fn qsfp_outputs() -> Vec<(String, bool)> {
    gpios()
        .names()
        .filter(|name| name.starts_with("qsfp"))
        .filter_map(|name| {
            if name.ends_with("_reset") {
                Some((name.to_string(), false))
            } else if name.ends_with("_modsel") {
                Some((name.to_string(), true))
            } else {
                None
            }
        })
        .collect()
}

/// EEPROM bindings for the QSFP cages, port 1 first.
pub fn qsfp_devices() -> Vec<I2cDevice> {
    (0..NUM_QSFPS)
        .map(|i| {
            I2cDevice::new(QSFP_FIRST_BUS + i, "sff8436", QSFP_EEPROM_ADDRESS)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(name: &str) -> String {
        tables()
            .endpoints()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .unwrap()
    }

    #[test]
    fn lane_leds() {
        let lanes: Vec<_> = leds()
            .into_iter()
            .filter(|l| l.name.starts_with("qsfp") && l.name.contains('_'))
            .collect();

        assert_eq!(lanes.len(), 96);
        assert_eq!(lanes[0].addr, 0x6100);
        assert_eq!(lanes[0].name, "qsfp1_1");
        assert_eq!(lanes[95].name, "qsfp24_4");
        assert!(lanes.windows(2).all(|w| w[1].addr == w[0].addr + 0x10));
    }

    #[test]
    fn single_leds_alternate_stride() {
        let singles: Vec<_> = leds()
            .into_iter()
            .filter(|l| l.name.starts_with("qsfp") && !l.name.contains('_'))
            .collect();

        assert_eq!(singles.len(), 8);
        assert_eq!(
            singles.iter().map(|l| l.addr).collect::<Vec<_>>(),
            vec![
                0x6720, 0x6750, 0x67a0, 0x67d0, 0x6820, 0x6850, 0x68a0, 0x68d0
            ]
        );
        assert_eq!(singles[0].name, "qsfp25");
        assert_eq!(singles[7].name, "qsfp32");
    }

    #[test]
    fn led_count() {
        assert_eq!(leds().len(), 5 + 96 + 8);
    }

    #[test]
    fn qsfp_gpio_groups() {
        let gpios = gpios();
        assert_eq!(gpios.len(), 33);

        let addrs: Vec<_> = gpios.addrs().collect();
        assert_eq!(addrs[0], 0x5000);
        assert_eq!(addrs[1], 0x5010);
        assert_eq!(addrs[32], 0x5200);

        let q = gpios.get(0x5200).unwrap();
        assert_eq!(q[0].name, "qsfp32_interrupt");
        assert_eq!(q[6].name, "qsfp32_modsel");

        let presence = gpios.presence_masks();
        let ro = gpios.read_only_masks();
        let active_low = gpios.active_low_masks();
        assert_eq!((presence[0], ro[0], active_low[0]), (0x3, 0x3, 0x0));
        for i in 1..=32 {
            assert_eq!(
                (presence[i], ro[i], active_low[i]),
                (0x1ed, 0x2d, 0x105)
            );
        }
    }

    #[test]
    fn southbridge() {
        assert_eq!(
            endpoint("sb_gpios"),
            "203,204,205,206,209,210,211,212,215,216,217,218,221,222,223,224"
        );
        assert_eq!(endpoint("sb_gpios_ro"), vec!["1"; 16].join(","));
        assert_eq!(
            endpoint("sb_gpios_active_low"),
            "0,0,0,1,0,0,0,1,0,0,0,1,0,0,0,1"
        );
        assert_eq!(endpoint("sb_leds"), "207,213,219,225");
        assert_eq!(
            endpoint("sb_led_names"),
            "fan1_led,fan2_led,fan3_led,fan4_led"
        );
        assert_eq!(endpoint("num_sb_fans"), "4");
    }

    #[test]
    fn encoded_tables() {
        assert_eq!(endpoint("reset_addrs"), "0x00004000");
        assert_eq!(
            endpoint("reset_names"),
            "t2_reset,phy1_reset,phy2_reset,phy3_reset,phy4_reset"
        );
        assert_eq!(endpoint("reset_masks"), "0x0000003d");
        assert_eq!(
            endpoint("master_addrs"),
            "0x00008000,0x00008100,0x00008200,0x00008300,0x00008400"
        );
        assert!(endpoint("led_addrs").starts_with(
            "0x00006050,0x00006060,0x00006070,0x00006080,0x00006090,0x00006100"
        ));
        assert!(endpoint("led_addrs").ends_with("0x000068a0,0x000068d0"));
        assert!(endpoint("gpio_names").starts_with(
            "psu1_present,psu2_present,qsfp1_interrupt,qsfp1_present,"
        ));
        assert!(endpoint("gpio_masks").starts_with("0x00000003,0x000001ed,"));
        assert_eq!(endpoint("init_trigger"), "1");
    }

    #[test]
    fn qsfp_outputs_per_port() {
        let outputs = qsfp_outputs();
        assert_eq!(outputs.len(), 2 * NUM_QSFPS as usize);
        assert_eq!(outputs[0], ("qsfp1_reset".to_string(), false));
        assert_eq!(outputs[1], ("qsfp1_modsel".to_string(), true));
        assert_eq!(outputs[63], ("qsfp32_modsel".to_string(), true));
    }

    #[test]
    fn qsfp_bindings() {
        let devices = qsfp_devices();
        assert_eq!(devices.len(), 32);
        assert_eq!(devices[0].bus, 10);
        assert_eq!(devices[0].new_device_line(), "sff8436 0x50");
        assert_eq!(devices[31].bus, 41);
        assert_eq!(devices[31].new_device_line(), "sff8436 0x50");
    }
}
