pub mod btable;
pub mod dtable;
use crate::{
    TableConverter,
    tables::{TableEntry, TableTypeTrait},
};
pub use btable::BTableCsvLoader as WMOBTableLoader;
use csv::ReaderBuilder;
pub use dtable::DTableCsvLoader as WMODTableLoader;
use std::fmt::Debug;

#[derive(Default)]
pub struct TableLoader<C: EntryLoader> {
    _marker: std::marker::PhantomData<C>,
}

impl<C: EntryLoader> TableLoader<C> {
    pub fn load_table<P: AsRef<std::path::Path>>(
        &self,
        path: P,
        loader: &mut C,
    ) -> anyhow::Result<Vec<C::Output>> {
        let rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b',')
            .flexible(true) // Allow variable number of fields
            .from_path(path.as_ref())?;

        self.load_records(rdr, &path.as_ref().display().to_string(), loader)
    }

    /// Same as [`TableLoader::load_table`] over an in-memory CSV document.
    pub fn load_str(&self, csv: &str, loader: &mut C) -> anyhow::Result<Vec<C::Output>> {
        let rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b',')
            .flexible(true)
            .from_reader(csv.as_bytes());

        self.load_records(rdr, "<memory>", loader)
    }

    fn load_records<R: std::io::Read>(
        &self,
        mut rdr: csv::Reader<R>,
        source: &str,
        loader: &mut C,
    ) -> anyhow::Result<Vec<C::Output>> {
        let mut entries = vec![];
        let mut line_num = 1; // Start at 1 for header
        for result in rdr.deserialize() {
            line_num += 1;
            let record: C::RawEntry = match result {
                Ok(record) => record,
                Err(e) => {
                    // Log the error but continue processing
                    tracing::warn!("Skipping line {} in {}: {}", line_num, source, e);
                    continue;
                }
            };
            match loader.process_entry(record) {
                Ok(Some(processed_entry)) => entries.push(processed_entry),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping line {} in {}: {}", line_num, source, e),
            }
        }

        if let Some(processed_entry) = loader.finish()? {
            entries.push(processed_entry);
        }
        Ok(entries)
    }
}

pub trait EntryLoader: Default {
    type Output: TableEntry;
    type RawEntry: for<'de> serde::Deserialize<'de> + Debug;
    type TableType: TableTypeTrait<EntryType = Self::Output>;

    fn process_entry(&mut self, raw: Self::RawEntry) -> anyhow::Result<Option<Self::Output>>;

    fn finish(&mut self) -> anyhow::Result<Option<Self::Output>> {
        Ok(None)
    }
}

impl<T: EntryLoader> TableConverter for TableLoader<T> {
    type OutputEntry = T::Output;
    type TableType = T::TableType;

    fn convert<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> anyhow::Result<Vec<Self::OutputEntry>> {
        let mut loader = T::default();
        self.load_table(path, &mut loader)
    }
}
