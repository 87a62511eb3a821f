pub mod builtin;
pub mod prelude;
pub mod tables;
pub mod wmo;

use anyhow::Context;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;
use std::str::FromStr;

use crate::tables::{BTable, DTable, TableEntry, TableTypeTrait};

pub trait TableConverter {
    type OutputEntry: TableEntry;
    type TableType: TableTypeTrait<EntryType = Self::OutputEntry>;
    fn convert<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<Vec<Self::OutputEntry>>;

    fn table_type(&self) -> crate::TableType {
        Self::TableType::TABLE_TYPE
    }
}

/// A BUFR descriptor. Ordering is lexicographic on `(f, x, y)`.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, std::hash::Hash,
)]
pub struct FXY {
    pub f: i32,
    pub x: i32,
    pub y: i32,
}

impl FXY {
    pub const fn new(f: i32, x: i32, y: i32) -> Self {
        FXY { f, x, y }
    }

    /// Decode the 16-bit wire form: F (2 bits) | X (6 bits) | Y (8 bits).
    pub const fn from_u16(value: u16) -> Self {
        FXY {
            f: (value >> 14) as i32,
            x: ((value >> 8) & 0x3f) as i32,
            y: (value & 0xff) as i32,
        }
    }

    /// The 16-bit section 3 wire form: F (2 bits) | X (6 bits) | Y (8 bits).
    /// Inverse of `from_u16`.
    pub fn to_u32(&self) -> u32 {
        ((self.f as u32) << 14) | ((self.x as u32) << 8) | (self.y as u32)
    }

    /// `0-31-000/001/002/011/012`, the elements carrying a delayed replication count.
    pub fn is_delayed_replication_factor(&self) -> bool {
        self.f == 0 && self.x == 31 && matches!(self.y, 0 | 1 | 2 | 11 | 12)
    }

    pub fn is_delayed_replication(&self) -> bool {
        self.f == 1 && self.y == 0
    }
}

impl std::fmt::Display for FXY {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:02}{:03}", self.f, self.x, self.y)
    }
}

impl FromStr for FXY {
    type Err = anyhow::Error;

    /// Parses the six-digit WMO form, e.g. `001001` or `309052`.
    fn from_str(fxy_str: &str) -> anyhow::Result<Self> {
        let fxy_str = fxy_str.trim();
        if fxy_str.len() != 6 || !fxy_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(anyhow::anyhow!("Invalid FXY string: {:?}", fxy_str));
        }

        let f = fxy_str[0..1]
            .parse::<i32>()
            .with_context(|| format!("Failed to parse F from FXY: {}", fxy_str))?;
        let x = fxy_str[1..3]
            .parse::<i32>()
            .with_context(|| format!("Failed to parse X from FXY: {}", fxy_str))?;
        let y = fxy_str[3..6]
            .parse::<i32>()
            .with_context(|| format!("Failed to parse Y from FXY: {}", fxy_str))?;

        if f > 3 || x > 63 || y > 255 {
            return Err(anyhow::anyhow!("FXY out of range: {}", fxy_str));
        }

        Ok(FXY { f, x, y })
    }
}

/// Immutable in-memory lookup table keyed by descriptor.
pub struct BUFRTable<T: TableTypeTrait> {
    entries: FxHashMap<FXY, T::EntryType>,
}

impl<T: TableTypeTrait> Clone for BUFRTable<T> {
    fn clone(&self) -> Self {
        BUFRTable {
            entries: self.entries.clone(),
        }
    }
}

impl<T: TableTypeTrait> Debug for BUFRTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BUFRTable")
            .field("type", &T::TABLE_TYPE)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<T: TableTypeTrait> BUFRTable<T> {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = T::EntryType>,
    {
        let mut map = FxHashMap::default();
        for entry in entries {
            if let Some(previous) = map.insert(entry.fxy(), entry) {
                tracing::warn!(
                    "Duplicate {:?} table entry {} - keeping the later one",
                    T::TABLE_TYPE,
                    previous.fxy()
                );
            }
        }
        BUFRTable { entries: map }
    }

    pub fn build_from_csv<P: AsRef<Path>, L>(loader: L, path: P) -> anyhow::Result<Self>
    where
        L: TableConverter<TableType = T, OutputEntry = T::EntryType>,
    {
        let entries = loader
            .convert(path.as_ref())
            .with_context(|| format!("Failed to convert {}", path.as_ref().display()))?;
        tracing::debug!(
            "Loaded {} {:?} entries from {}",
            entries.len(),
            T::TABLE_TYPE,
            path.as_ref().display()
        );
        Ok(Self::from_entries(entries))
    }

    pub fn lookup(&self, fxy: &FXY) -> Option<&T::EntryType> {
        self.entries.get(fxy)
    }

    /// All entries, sorted by descriptor.
    pub fn get_all_entries(&self) -> Vec<&T::EntryType> {
        let mut result: Vec<_> = self.entries.values().collect();
        result.sort_by_key(|e| e.fxy());
        result
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BUFRTable<BTable> {
    /// Load a WMO-format Table B CSV (`BUFRCREX_TableB_en_XX.csv` layout).
    pub fn load_from_disk<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::build_from_csv(wmo::TableLoader::<wmo::WMOBTableLoader>::default(), path)
    }
}

impl BUFRTable<DTable> {
    /// Load a WMO-format Table D CSV (`BUFR_TableD_en_XX.csv` layout).
    pub fn load_from_disk<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::build_from_csv(wmo::TableLoader::<wmo::WMODTableLoader>::default(), path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableType {
    B,
    D,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fxy_parses_wmo_six_digit_form() {
        let fxy: FXY = "001001".parse().unwrap();
        assert_eq!(fxy, FXY::new(0, 1, 1));

        let fxy: FXY = "309052".parse().unwrap();
        assert_eq!(fxy, FXY::new(3, 9, 52));
        assert_eq!(fxy.to_string(), "309052");
    }

    #[test]
    fn fxy_rejects_garbage() {
        assert!("00101".parse::<FXY>().is_err());
        assert!("0a1001".parse::<FXY>().is_err());
        assert!("464001".parse::<FXY>().is_err());
    }

    #[test]
    fn fxy_wire_form() {
        // 3-09-052 => 11 001001 00110100
        let fxy = FXY::from_u16(0b1100_1001_0011_0100);
        assert_eq!(fxy, FXY::new(3, 9, 52));
        assert_eq!(fxy.to_u32(), 0b1100_1001_0011_0100);
    }

    #[test]
    fn fxy_ordering_is_lexicographic() {
        let mut v = vec![
            FXY::new(3, 1, 1),
            FXY::new(0, 12, 101),
            FXY::new(0, 7, 4),
            FXY::new(1, 1, 0),
            FXY::new(0, 7, 2),
        ];
        v.sort();
        assert_eq!(
            v,
            vec![
                FXY::new(0, 7, 2),
                FXY::new(0, 7, 4),
                FXY::new(0, 12, 101),
                FXY::new(1, 1, 0),
                FXY::new(3, 1, 1),
            ]
        );
    }

    #[test]
    fn delayed_factor_family() {
        for y in [0, 1, 2, 11, 12] {
            assert!(FXY::new(0, 31, y).is_delayed_replication_factor());
        }
        assert!(!FXY::new(0, 31, 21).is_delayed_replication_factor());
        assert!(FXY::new(1, 1, 0).is_delayed_replication());
        assert!(!FXY::new(1, 1, 4).is_delayed_replication());
    }
}
