use crate::errors::{Error, Result};
use crate::structs::TableInfo;
use genlib::{
    FXY, TableType, builtin,
    prelude::{BUFRTableB, BUFRTableD},
    tables::{BTableEntry, DTableEntry},
};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static BUILTIN: OnceLock<Tables> = OnceLock::new();

/// Master Tables B and D with optional local overlays. Local entries shadow
/// master ones.
#[derive(Debug, Clone)]
pub struct Tables {
    master_b: BUFRTableB,
    master_d: BUFRTableD,
    local_b: Option<BUFRTableB>,
    local_d: Option<BUFRTableD>,
}

impl Tables {
    pub fn new(master_b: BUFRTableB, master_d: BUFRTableD) -> Self {
        Tables {
            master_b,
            master_d,
            local_b: None,
            local_d: None,
        }
    }

    pub fn with_local(mut self, local_b: Option<BUFRTableB>, local_d: Option<BUFRTableD>) -> Self {
        self.local_b = local_b;
        self.local_d = local_d;
        self
    }

    /// The compiled-in TEMP subset, built once per process.
    pub fn builtin() -> &'static Tables {
        BUILTIN.get_or_init(|| Tables::new(builtin::table_b(), builtin::table_d()))
    }

    #[inline]
    pub fn lookup_b(&self, fxy: &FXY) -> Option<&BTableEntry> {
        self.local_b
            .as_ref()
            .and_then(|t| t.lookup(fxy))
            .or_else(|| self.master_b.lookup(fxy))
    }

    #[inline]
    pub fn lookup_d(&self, fxy: &FXY) -> Option<&DTableEntry> {
        self.local_d
            .as_ref()
            .and_then(|t| t.lookup(fxy))
            .or_else(|| self.master_d.lookup(fxy))
    }
}

pub trait TableTrait {
    /// Location relative to the tables base directory.
    fn file_name(&self, table_type: TableType) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct MasterTable {
    version: u8,
}

impl MasterTable {
    pub fn new(version: u8) -> Self {
        MasterTable { version }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LocalTable {
    centre_key: u32,
    version: u8,
}

impl LocalTable {
    /// Local tables are keyed by `subcentre * 256 + centre`.
    pub fn new(centre: u16, subcentre: u16, version: u8) -> Self {
        LocalTable {
            centre_key: subcentre as u32 * 256 + centre as u32,
            version,
        }
    }
}

impl TableTrait for MasterTable {
    fn file_name(&self, table_type: TableType) -> String {
        match table_type {
            TableType::B => format!("master/BUFR_TableB_{}.csv", self.version),
            TableType::D => format!("master/BUFR_TableD_{}.csv", self.version),
        }
    }
}

impl TableTrait for LocalTable {
    fn file_name(&self, table_type: TableType) -> String {
        match table_type {
            TableType::B => format!("local/BUFR_TableB_{}_{}.csv", self.centre_key, self.version),
            TableType::D => format!("local/BUFR_TableD_{}_{}.csv", self.centre_key, self.version),
        }
    }
}

/// Loads WMO CSV tables from a base directory.
#[derive(Debug, Clone)]
pub struct TableLoader {
    base: PathBuf,
}

impl TableLoader {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        TableLoader {
            base: base.as_ref().to_path_buf(),
        }
    }

    fn existing(&self, table: &impl TableTrait, table_type: TableType) -> Result<PathBuf> {
        let path = self.base.join(table.file_name(table_type));
        if !path.exists() {
            return Err(Error::TableNotFound(anyhow::anyhow!(
                "{} does not exist",
                path.display()
            )));
        }
        Ok(path)
    }

    pub fn load_b(&self, table: impl TableTrait) -> Result<BUFRTableB> {
        let path = self.existing(&table, TableType::B)?;
        Ok(BUFRTableB::load_from_disk(path)?)
    }

    pub fn load_d(&self, table: impl TableTrait) -> Result<BUFRTableD> {
        let path = self.existing(&table, TableType::D)?;
        Ok(BUFRTableD::load_from_disk(path)?)
    }

    /// Master tables for `version`, falling back through lower versions and
    /// finally to the built-in subset.
    pub fn load_master(&self, version: u8) -> Tables {
        let found = (0..=version).rev().find_map(|v| {
            let b = self.load_b(MasterTable::new(v)).ok()?;
            let d = self.load_d(MasterTable::new(v)).ok()?;
            if v != version {
                tracing::warn!("Falling back to Master Table version {}", v);
            }
            Some(Tables::new(b, d))
        });

        found.unwrap_or_else(|| {
            tracing::warn!(
                "No master tables found for version {}; using built-in TEMP tables",
                version
            );
            Tables::builtin().clone()
        })
    }

    /// Master tables plus the local overlays a message asks for, when present.
    pub fn load_for(&self, info: &TableInfo) -> Tables {
        let tables = self.load_master(info.master_table_version);
        if info.local_table_version == 0 {
            return tables;
        }

        let local = LocalTable::new(info.center_id, info.subcenter_id, info.local_table_version);
        let local_b = self
            .load_b(local)
            .inspect_err(|e| tracing::warn!("Local Table B unavailable: {}", e))
            .ok();
        let local_d = self
            .load_d(local)
            .inspect_err(|e| tracing::warn!("Local Table D unavailable: {}", e))
            .ok();
        tables.with_local(local_b, local_d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(fxy: FXY, scale: i32) -> BTableEntry {
        let mut entry = builtin::table_b()
            .lookup(&FXY::new(0, 7, 4))
            .cloned()
            .unwrap();
        entry.fxy = fxy;
        entry.bufr_scale = scale;
        entry
    }

    #[test]
    fn builtin_is_shared() {
        let a = Tables::builtin() as *const Tables;
        let b = Tables::builtin() as *const Tables;
        assert_eq!(a, b);
        assert!(Tables::builtin().lookup_d(&FXY::new(3, 9, 52)).is_some());
    }

    #[test]
    fn local_entries_shadow_master() {
        let pressure = FXY::new(0, 7, 4);
        let local = BUFRTableB::from_entries(vec![element(pressure, 3)]);
        let tables = Tables::new(builtin::table_b(), builtin::table_d()).with_local(Some(local), None);

        assert_eq!(tables.lookup_b(&pressure).unwrap().bufr_scale, 3);
        assert_eq!(
            tables.lookup_b(&FXY::new(0, 12, 101)).unwrap().bufr_scale,
            2
        );
    }

    #[test]
    fn local_key_combines_centre_and_subcentre() {
        let local = LocalTable::new(98, 1, 3);
        assert_eq!(local.centre_key, 354);
        assert_eq!(local.file_name(TableType::D), "local/BUFR_TableD_354_3.csv");
    }

    #[test]
    fn master_falls_back_to_lower_versions() {
        let dir = tempfile::tempdir().unwrap();
        builtin::export_csv(&dir.path().join("master"), 13).unwrap();

        let loader = TableLoader::new(dir.path());
        assert!(loader.load_b(MasterTable::new(36)).is_err());

        let tables = loader.load_master(36);
        assert!(tables.lookup_b(&FXY::new(0, 12, 101)).is_some());
        assert!(tables.lookup_d(&FXY::new(3, 1, 11)).is_some());
    }

    #[test]
    fn missing_directory_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let loader = TableLoader::new(dir.path().join("nothing-here"));
        let info = TableInfo {
            master_table_version: 36,
            local_table_version: 1,
            center_id: 98,
            subcenter_id: 0,
        };
        let tables = loader.load_for(&info);
        assert!(tables.lookup_d(&FXY::new(3, 9, 52)).is_some());
    }
}
