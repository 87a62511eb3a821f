use crate::decoder::{Decoder, ExtractedData};
use crate::errors::{Error, Result};
use crate::expander::expand;
use crate::structs::{MessageHeader, read_section};
use crate::tables::Tables;
use chrono::{DateTime, Utc};
use genlib::FXY;
use std::io::{Cursor, Read};

const END_MARKER: &[u8; 4] = b"7777";

/// Decodes one BUFR message against a borrowed set of tables.
#[derive(Debug)]
pub struct Bufr<'t> {
    tables: &'t Tables,
    header: Option<MessageHeader>,
    data: Vec<ExtractedData>,
}

impl Bufr<'static> {
    pub fn with_builtin_tables() -> Self {
        Bufr::new(Tables::builtin())
    }
}

impl<'t> Bufr<'t> {
    pub fn new(tables: &'t Tables) -> Self {
        Bufr {
            tables,
            header: None,
            data: Vec::new(),
        }
    }

    /// Parse sections 0 to 3 only.
    pub fn read_header<R: Read>(&mut self, reader: &mut R) -> Result<&MessageHeader> {
        self.clear();
        let header = MessageHeader::read(reader)?;
        Ok(self.header.insert(header))
    }

    /// Decode a whole message. On error nothing decoded is kept.
    pub fn read<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        self.read_inner(reader).inspect_err(|_| self.clear())
    }

    pub fn from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.read(&mut Cursor::new(bytes))
    }

    fn read_inner<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        self.read_header(reader)?;
        let section4 = read_section(reader, 4)?;

        let mut marker = [0u8; 4];
        reader.read_exact(&mut marker)?;
        if &marker != END_MARKER {
            return Err(Error::MissingEndMarker);
        }

        let header = self
            .header
            .as_ref()
            .ok_or_else(|| Error::ParseError("Header was not read".to_string()))?;
        if header.is_compressed() {
            return Err(Error::UnsupportedCompression);
        }
        if header.subsets_count() > 1 {
            tracing::warn!(
                "Message declares {} subsets; only the first is decoded",
                header.subsets_count()
            );
        }

        let expanded = expand(header.descriptors(), self.tables)?;
        tracing::debug!(
            "Section 4: {} bytes for {} expanded descriptors",
            section4.len(),
            expanded.len()
        );

        // Skip the length and the reserved byte
        self.data = Decoder::new(self.tables).decode(&expanded, &section4[4..])?;
        Ok(())
    }

    fn clear(&mut self) {
        self.header = None;
        self.data.clear();
    }

    pub fn header(&self) -> Option<&MessageHeader> {
        self.header.as_ref()
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.header.as_ref().map(MessageHeader::time)
    }

    pub fn descriptors(&self) -> &[FXY] {
        self.header
            .as_ref()
            .map(MessageHeader::descriptors)
            .unwrap_or_default()
    }

    pub fn data(&self) -> &[ExtractedData] {
        &self.data
    }

    pub fn into_parts(self) -> Option<(MessageHeader, Vec<ExtractedData>)> {
        let header = self.header?;
        Some((header, self.data))
    }
}

impl std::fmt::Display for Bufr<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some(header) = &self.header else {
            return write!(f, "<empty>");
        };
        writeln!(f, "{}", header)?;
        writeln!(f)?;
        writeln!(f, "Data ({} records):", self.data.len())?;

        let width = self
            .data
            .iter()
            .filter_map(|d| self.tables.lookup_b(&d.descriptor))
            .map(|e| e.element_name_en.chars().count())
            .max()
            .unwrap_or(6)
            .min(48);
        for record in &self.data {
            let entry = self.tables.lookup_b(&record.descriptor);
            writeln!(f, "  {:>6} {:width$}", record.descriptor, record.display_with(entry), width = width)?;
        }
        Ok(())
    }
}
