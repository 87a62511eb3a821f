use crate::errors::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt};
use chrono::{DateTime, Utc};
use genlib::FXY;
use nom::{IResult, bytes::complete::take};
use std::io::Read;

pub(super) mod tools;
pub mod versions;

use versions::{Section0, Section1, Section2, Section3};

#[inline]
pub fn skip(n: usize) -> impl Fn(&[u8]) -> IResult<&[u8], ()> {
    move |input: &[u8]| {
        let (input, _) = take(n)(input)?;
        Ok((input, ()))
    }
}

#[inline]
pub fn skip1(input: &[u8]) -> IResult<&[u8], ()> {
    skip(1)(input)
}

/// Read one length-prefixed section (sections 1 to 4) including its 3-byte
/// length, so the nom parsers see the section exactly as it sits on the wire.
pub(crate) fn read_section<R: Read>(reader: &mut R, min_len: usize) -> Result<Vec<u8>> {
    let length = reader.read_u24::<BigEndian>()? as usize;
    if length < min_len {
        return Err(Error::ParseError(format!(
            "Section length {} is shorter than its fixed part ({})",
            length, min_len
        )));
    }

    let mut section = Vec::with_capacity(length);
    section.extend_from_slice(&(length as u32).to_be_bytes()[1..]);
    section.resize(length, 0);
    reader.read_exact(&mut section[3..])?;
    Ok(section)
}

/// Master table identity a message was encoded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableInfo {
    pub master_table_version: u8,
    pub local_table_version: u8,
    pub center_id: u16,
    pub subcenter_id: u16,
}

/// Sections 0 to 3 of one message.
#[derive(Debug, Clone)]
pub struct MessageHeader {
    pub section0: Section0,
    pub section1: Section1,
    pub section2: Option<Section2>,
    pub section3: Section3,
    timestamp: DateTime<Utc>,
}

impl MessageHeader {
    /// Reads sections 0 to 3 and leaves `reader` at the start of section 4.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let section0 = versions::read_section0(reader)?;
        tracing::debug!(
            "BUFR edition {}, total length {}",
            section0.version,
            section0.total_length
        );

        let fixed = versions::section1_fixed_len(section0.version)?;
        let raw = read_section(reader, fixed)?;
        let section1 = versions::parse_section1(section0.version, &raw)?;
        let timestamp = section1.timestamp()?;

        let section2 = if section1.optional_section_present {
            let raw = read_section(reader, 4)?;
            Some(versions::parse_section2(&raw)?)
        } else {
            None
        };

        let raw = read_section(reader, 7)?;
        let section3 = versions::parse_section3(&raw)?;
        tracing::debug!(
            "Section 3: {} subsets, {} descriptors",
            section3.number_of_subsets,
            section3.descriptors.len()
        );

        Ok(MessageHeader {
            section0,
            section1,
            section2,
            section3,
            timestamp,
        })
    }

    pub fn edition(&self) -> u8 {
        self.section0.version
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn descriptors(&self) -> &[FXY] {
        &self.section3.descriptors
    }

    pub fn subsets_count(&self) -> u16 {
        self.section3.number_of_subsets
    }

    pub fn is_compressed(&self) -> bool {
        self.section3.is_compressed
    }

    pub fn table_info(&self) -> TableInfo {
        TableInfo {
            master_table_version: self.section1.master_table_version,
            local_table_version: self.section1.local_table_version,
            center_id: self.section1.centre,
            subcenter_id: self.section1.subcentre,
        }
    }
}

impl std::fmt::Display for MessageHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "BUFR Message V{}:", self.edition())?;
        writeln!(f, "{}", self.section1)?;
        writeln!(f)?;
        writeln!(f, "Section 3:")?;
        writeln!(f, "  Subsets:             {}", self.section3.number_of_subsets)?;
        writeln!(f, "  Observed:            {}", self.section3.is_observation)?;
        writeln!(f, "  Compressed:          {}", self.section3.is_compressed)?;
        let rendered: Vec<String> = self
            .section3
            .descriptors
            .iter()
            .map(|d| d.to_string())
            .collect();
        write!(f, "  Descriptors:         {}", rendered.join(" "))
    }
}
