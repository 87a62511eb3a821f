//! Compiled-in subset of WMO Tables B and D covering the TEMP / TEMP SHIP
//! sequence `3-09-052` and everything it expands to.
//!
//! Full master tables can be loaded from the WMO CSV distribution instead;
//! this subset only exists so radiosonde messages decode without any files
//! on disk.

use crate::FXY;
use crate::prelude::{BUFRTableB, BUFRTableD};
use crate::tables::{BTableEntry, DTableEntry};
use crate::wmo::{btable::RawBTableEntry, dtable::RawDTableEntry};
use anyhow::Context;
use std::path::{Path, PathBuf};

const NUMERIC: &str = "Numeric";
const CODE: &str = "Code table";
const FLAG: &str = "Flag table";
const CHARS: &str = "CCITT IA5";

/// (descriptor, class, element name, unit, scale, reference, width)
type ElementRow = (FXY, &'static str, &'static str, &'static str, i32, i32, u32);

const fn b(x: i32, y: i32) -> FXY {
    FXY::new(0, x, y)
}

const fn d(x: i32, y: i32) -> FXY {
    FXY::new(3, x, y)
}

const fn r(x: i32, y: i32) -> FXY {
    FXY::new(1, x, y)
}

#[rustfmt::skip]
const TABLE_B: &[ElementRow] = &[
    (b(1, 1),   "Identification", "WMO block number", NUMERIC, 0, 0, 7),
    (b(1, 2),   "Identification", "WMO station number", NUMERIC, 0, 0, 10),
    (b(1, 11),  "Identification", "Ship or mobile land station identifier", CHARS, 0, 0, 72),
    (b(1, 81),  "Identification", "Radiosonde serial number", CHARS, 0, 0, 160),
    (b(1, 82),  "Identification", "Radiosonde ascension number", NUMERIC, 0, 0, 14),
    (b(1, 83),  "Identification", "Radiosonde release number", NUMERIC, 0, 0, 3),
    (b(1, 95),  "Identification", "Observer identification", CHARS, 0, 0, 32),
    (b(2, 3),   "Instrumentation", "Type of measuring equipment used", CODE, 0, 0, 4),
    (b(2, 11),  "Instrumentation", "Radiosonde type", CODE, 0, 0, 8),
    (b(2, 13),  "Instrumentation", "Solar and infrared radiation correction", CODE, 0, 0, 4),
    (b(2, 14),  "Instrumentation", "Tracking technique/status of system used", CODE, 0, 0, 7),
    (b(2, 15),  "Instrumentation", "Radiosonde completeness", CODE, 0, 0, 4),
    (b(2, 16),  "Instrumentation", "Radiosonde configuration", FLAG, 0, 0, 5),
    (b(2, 17),  "Instrumentation", "Correction algorithms for humidity measurements", CODE, 0, 0, 5),
    (b(2, 66),  "Instrumentation", "Radiosonde ground receiving system", CODE, 0, 0, 6),
    (b(2, 67),  "Instrumentation", "Radiosonde operating frequency", "Hz", -5, 0, 15),
    (b(2, 80),  "Instrumentation", "Balloon manufacturer", CODE, 0, 0, 6),
    (b(2, 81),  "Instrumentation", "Type of balloon", CODE, 0, 0, 5),
    (b(2, 82),  "Instrumentation", "Weight of balloon", "kg", 3, 0, 12),
    (b(2, 84),  "Instrumentation", "Type of gas used in balloon", CODE, 0, 0, 4),
    (b(2, 85),  "Instrumentation", "Amount of gas used in balloon", "kg", 3, 0, 13),
    (b(2, 86),  "Instrumentation", "Balloon flight train length", "m", 1, 0, 10),
    (b(2, 95),  "Instrumentation", "Type of pressure sensor", CODE, 0, 0, 5),
    (b(2, 96),  "Instrumentation", "Type of temperature sensor", CODE, 0, 0, 5),
    (b(2, 97),  "Instrumentation", "Type of humidity sensor", CODE, 0, 0, 5),
    (b(2, 103), "Instrumentation", "Radome", FLAG, 0, 0, 2),
    (b(2, 191), "Instrumentation", "Geopotential height calculation", CODE, 0, 0, 4),
    (b(4, 1),   "Location (time)", "Year", "a", 0, 0, 12),
    (b(4, 2),   "Location (time)", "Month", "mon", 0, 0, 4),
    (b(4, 3),   "Location (time)", "Day", "d", 0, 0, 6),
    (b(4, 4),   "Location (time)", "Hour", "h", 0, 0, 5),
    (b(4, 5),   "Location (time)", "Minute", "min", 0, 0, 6),
    (b(4, 6),   "Location (time)", "Second", "s", 0, 0, 6),
    (b(4, 86),  "Location (time)", "Long time period or displacement", "s", 0, -8192, 15),
    (b(5, 1),   "Location (horizontal - 1)", "Latitude (high accuracy)", "deg", 5, -9000000, 25),
    (b(5, 15),  "Location (horizontal - 1)", "Latitude displacement (high accuracy)", "deg", 5, -9000000, 25),
    (b(6, 1),   "Location (horizontal - 2)", "Longitude (high accuracy)", "deg", 5, -18000000, 26),
    (b(6, 15),  "Location (horizontal - 2)", "Longitude displacement (high accuracy)", "deg", 5, -18000000, 26),
    (b(7, 4),   "Location (vertical)", "Pressure", "Pa", -1, 0, 14),
    (b(7, 7),   "Location (vertical)", "Height", "m", 0, -1000, 17),
    (b(7, 30),  "Location (vertical)", "Height of station ground above mean sea level", "m", 1, -4000, 17),
    (b(7, 31),  "Location (vertical)", "Height of barometer above mean sea level", "m", 1, -4000, 17),
    (b(8, 2),   "Significance qualifiers", "Vertical significance (surface observations)", CODE, 0, 0, 6),
    (b(8, 21),  "Significance qualifiers", "Time significance", CODE, 0, 0, 5),
    (b(8, 42),  "Significance qualifiers", "Extended vertical sounding significance", FLAG, 0, 0, 18),
    (b(10, 9),  "Non-coordinate location (vertical)", "Geopotential height", "gpm", 0, -1000, 17),
    (b(11, 1),  "Wind and turbulence", "Wind direction", "deg", 0, 0, 9),
    (b(11, 2),  "Wind and turbulence", "Wind speed", "m s-1", 1, 0, 12),
    (b(11, 61), "Wind and turbulence", "Absolute wind shear in 1 km layer below", "m s-1", 1, 0, 12),
    (b(11, 62), "Wind and turbulence", "Absolute wind shear in 1 km layer above", "m s-1", 1, 0, 12),
    (b(12, 101), "Temperature", "Temperature/air temperature", "K", 2, 0, 16),
    (b(12, 103), "Temperature", "Dewpoint temperature", "K", 2, 0, 16),
    (b(20, 11), "Observed phenomena", "Cloud amount", CODE, 0, 0, 4),
    (b(20, 12), "Observed phenomena", "Cloud type", CODE, 0, 0, 6),
    (b(20, 13), "Observed phenomena", "Height of base of cloud", "m", -1, -40, 11),
    (b(22, 43), "Oceanographic elements", "Sea/water temperature", "K", 2, 0, 15),
    (b(25, 61), "Processing information", "Software identification and version number", CHARS, 0, 0, 96),
    (b(25, 65), "Processing information", "Orientation correction for azimuth", "deg", 2, -1000, 11),
    (b(25, 66), "Processing information", "Orientation correction for elevation", "deg", 2, -1000, 11),
    (b(31, 0),  "Data description operator qualifiers", "Short delayed descriptor replication factor", NUMERIC, 0, 0, 1),
    (b(31, 1),  "Data description operator qualifiers", "Delayed descriptor replication factor", NUMERIC, 0, 0, 8),
    (b(31, 2),  "Data description operator qualifiers", "Extended delayed descriptor replication factor", NUMERIC, 0, 0, 16),
    (b(31, 11), "Data description operator qualifiers", "Delayed descriptor and data repetition factor", NUMERIC, 0, 0, 8),
    (b(31, 12), "Data description operator qualifiers", "Extended delayed descriptor and data repetition factor", NUMERIC, 0, 0, 16),
    (b(31, 21), "Data description operator qualifiers", "Associated field significance", CODE, 0, 0, 6),
    (b(33, 24), "Quality information", "Station elevation quality mark (for mobile stations)", CODE, 0, 0, 4),
];

#[rustfmt::skip]
const TABLE_D: &[(FXY, &str, &[FXY])] = &[
    (d(1, 1),   "WMO block and station numbers", &[b(1, 1), b(1, 2)]),
    (d(1, 11),  "Year, month, day", &[b(4, 1), b(4, 2), b(4, 3)]),
    (d(1, 13),  "Hour, minute, second", &[b(4, 4), b(4, 5), b(4, 6)]),
    (d(1, 21),  "Latitude/longitude (high accuracy)", &[b(5, 1), b(6, 1)]),
    (d(1, 111), "Identification of launch site and instrumentation for P, T, U and wind measurements",
        &[d(1, 1), b(1, 11), b(2, 11), b(2, 13), b(2, 14), b(2, 3)]),
    (d(1, 113), "Date/time of launch", &[b(8, 21), d(1, 11), d(1, 13)]),
    (d(1, 114), "Horizontal and vertical coordinates of launch site",
        &[d(1, 21), b(7, 30), b(7, 31), b(7, 7), b(33, 24)]),
    (d(1, 128), "Additional information on radiosonde ascent",
        &[b(1, 81), b(1, 82), b(1, 83), b(1, 95), b(2, 15), b(2, 16), b(2, 17), b(2, 66),
          b(2, 67), b(2, 80), b(2, 81), b(2, 82), b(2, 84), b(2, 85), b(2, 86), b(2, 95),
          b(2, 96), b(2, 97), b(2, 103), b(2, 191), b(25, 61), b(25, 65), b(25, 66)]),
    (d(2, 49),  "Cloud information reported with vertical soundings",
        &[b(8, 2), b(20, 11), b(20, 13), b(20, 12), b(20, 12), b(20, 12), b(8, 2)]),
    (d(3, 51),  "Wind shear data at a pressure level with radiosonde position",
        &[b(4, 86), b(8, 42), b(7, 4), b(5, 15), b(6, 15), b(11, 61), b(11, 62)]),
    (d(3, 54),  "Temperature, dewpoint and wind data at a pressure level with radiosonde position",
        &[b(4, 86), b(8, 42), b(7, 4), b(10, 9), b(5, 15), b(6, 15), b(12, 101), b(12, 103),
          b(11, 1), b(11, 2)]),
    (d(9, 52),  "Sequence for representation of TEMP, TEMP SHIP and TEMP MOBIL observation type data",
        &[d(1, 111), d(1, 128), d(1, 113), d(1, 114), d(2, 49), b(22, 43),
          r(1, 0), b(31, 2), d(3, 54), r(1, 0), b(31, 1), d(3, 51)]),
];

pub fn table_b() -> BUFRTableB {
    BUFRTableB::from_entries(TABLE_B.iter().map(
        |&(fxy, class, name, unit, scale, reference, bits)| BTableEntry {
            class_name_en: class.to_string(),
            status: Some("Operational".to_string()),
            ..BTableEntry::new(fxy, name, unit, scale, reference, bits)
        },
    ))
}

pub fn table_d() -> BUFRTableD {
    BUFRTableD::from_entries(TABLE_D.iter().map(|&(fxy, title, chain)| DTableEntry {
        category: Some(format!("{:02}", fxy.x)),
        title_en: Some(title.to_string()),
        status: Some("Operational".to_string()),
        ..DTableEntry::new(fxy, chain.to_vec())
    }))
}

/// Write the subset as `BUFR_TableB_<v>.csv` / `BUFR_TableD_<v>.csv` in WMO layout.
pub fn export_csv(output: &Path, version: u8) -> anyhow::Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(output).context("Failed to create output directory")?;

    let b_path = output.join(format!("BUFR_TableB_{}.csv", version));
    let mut writer = csv::Writer::from_path(&b_path)
        .with_context(|| format!("Failed to create {}", b_path.display()))?;
    for entry in table_b().get_all_entries() {
        writer.serialize(RawBTableEntry::from(entry))?;
    }
    writer.flush()?;

    let d_path = output.join(format!("BUFR_TableD_{}.csv", version));
    let mut writer = csv::Writer::from_path(&d_path)
        .with_context(|| format!("Failed to create {}", d_path.display()))?;
    for entry in table_d().get_all_entries() {
        for row in RawDTableEntry::rows(entry) {
            writer.serialize(row)?;
        }
    }
    writer.flush()?;

    Ok((b_path, d_path))
}
