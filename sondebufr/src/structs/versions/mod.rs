pub mod v2;
pub mod v4;

use super::{skip1, tools::parse_descriptors};
use crate::errors::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt};
use chrono::{DateTime, NaiveDate, Utc};
use genlib::FXY;
use nom::{
    IResult,
    bytes::complete::take,
    number::complete::{be_u8, be_u16, be_u24},
};
use std::io::Read;

#[derive(Clone, Debug)]
pub struct Section0 {
    pub total_length: u32,
    pub version: u8,
}

pub(crate) fn read_section0<R: Read>(reader: &mut R) -> Result<Section0> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != b"BUFR" {
        return Err(Error::NotBufr);
    }
    let total_length = reader.read_u24::<BigEndian>()?;
    let version = reader.read_u8()?;
    Ok(Section0 {
        total_length,
        version,
    })
}

pub(crate) fn section1_fixed_len(edition: u8) -> Result<usize> {
    match edition {
        2 | 3 => Ok(v2::FIXED_LEN),
        4 => Ok(v4::FIXED_LEN),
        _ => Err(Error::UnsupportedVersion(edition)),
    }
}

pub(crate) fn parse_section1(edition: u8, input: &[u8]) -> Result<Section1> {
    let (_, section1) = match edition {
        2 | 3 => v2::parse_section1(input)?,
        4 => v4::parse_section1(input)?,
        _ => return Err(Error::UnsupportedVersion(edition)),
    };
    Ok(section1)
}

/// Identification section, normalised across editions.
#[derive(Clone, Debug)]
pub struct Section1 {
    pub length: usize,
    pub master_table: u8,
    pub centre: u16,
    pub subcentre: u16,
    pub update_sequence_number: u8,
    pub optional_section_present: bool,
    pub data_category: u8,
    pub international_data_subcategory: u8,
    /// Edition 4 only.
    pub local_subcategory: Option<u8>,
    pub master_table_version: u8,
    pub local_table_version: u8,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub local_use: Vec<u8>,
}

impl Section1 {
    pub fn timestamp(&self) -> Result<DateTime<Utc>> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
            .and_then(|d| d.and_hms_opt(self.hour as u32, self.minute as u32, self.second as u32))
            .map(|t| t.and_utc())
            .ok_or_else(|| {
                Error::InvalidTimestamp(format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    self.year, self.month, self.day, self.hour, self.minute, self.second
                ))
            })
    }
}

impl std::fmt::Display for Section1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Section 1:")?;
        writeln!(f, "  Length: {} bytes", self.length)?;
        writeln!(f)?;
        writeln!(f, "  Organization:")?;
        writeln!(
            f,
            "    Centre:              {:<5} (0x{:04X})",
            self.centre, self.centre
        )?;
        writeln!(
            f,
            "    Sub-centre:          {:<5} (0x{:04X})",
            self.subcentre, self.subcentre
        )?;
        writeln!(
            f,
            "    Update Sequence:     {}",
            self.update_sequence_number
        )?;
        writeln!(f)?;
        writeln!(f, "  Data Classification:")?;
        writeln!(f, "    Category:            {}", self.data_category)?;
        writeln!(
            f,
            "    International Sub:   {}",
            self.international_data_subcategory
        )?;
        if let Some(local) = self.local_subcategory {
            writeln!(f, "    Local Sub:           {}", local)?;
        }
        writeln!(f)?;
        writeln!(f, "  Table Versions:")?;
        writeln!(
            f,
            "    Master Table:        {} (v{})",
            self.master_table, self.master_table_version
        )?;
        writeln!(f, "    Local Table:         v{}", self.local_table_version)?;
        writeln!(f)?;
        writeln!(f, "  Observation Time:")?;
        writeln!(
            f,
            "    DateTime:            {:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        writeln!(f)?;
        writeln!(f, "  Optional Data:")?;
        writeln!(
            f,
            "    Section 2 Present:   {}",
            if self.optional_section_present {
                "Yes"
            } else {
                "No"
            }
        )?;
        write!(f, "    Local Use Data:      {} bytes", self.local_use.len())
    }
}

#[derive(Clone, Debug)]
pub struct Section2 {
    pub length: usize,
    pub data: Vec<u8>,
}

pub(crate) fn parse_section2(input: &[u8]) -> Result<Section2> {
    let (_, section2) = section2(input)?;
    Ok(section2)
}

fn section2(input: &[u8]) -> IResult<&[u8], Section2> {
    let (input, length) = be_u24(input)?;
    let (input, _) = skip1(input)?;
    let (input, data) = take(length as usize - 4)(input)?;
    Ok((
        input,
        Section2 {
            length: length as usize,
            data: data.to_vec(),
        },
    ))
}

#[derive(Clone, Debug)]
pub struct Section3 {
    pub length: usize,
    pub number_of_subsets: u16,
    pub is_observation: bool,
    pub is_compressed: bool,
    pub descriptors: Vec<FXY>,
}

pub(crate) fn parse_section3(input: &[u8]) -> Result<Section3> {
    let (_, (length, number_of_subsets, flags, data)) = section3(input)?;
    Ok(Section3 {
        length,
        number_of_subsets,
        is_observation: (flags & 0b1000_0000) != 0,
        is_compressed: (flags & 0b0100_0000) != 0,
        descriptors: parse_descriptors(data)?,
    })
}

fn section3(input: &[u8]) -> IResult<&[u8], (usize, u16, u8, &[u8])> {
    let (input, length) = be_u24(input)?;
    let (input, _) = skip1(input)?;
    let (input, number_of_subsets) = be_u16(input)?;
    let (input, flags) = be_u8(input)?;
    let (input, data) = take(length as usize - 7)(input)?;
    Ok((input, (length as usize, number_of_subsets, flags, data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section0_rejects_other_magic() {
        let mut raw: &[u8] = b"GRIB\x00\x00\x20\x04";
        assert!(matches!(read_section0(&mut raw), Err(Error::NotBufr)));

        let mut raw: &[u8] = b"BUFR\x00\x01\x20\x04";
        let s0 = read_section0(&mut raw).unwrap();
        assert_eq!(s0.total_length, 0x120);
        assert_eq!(s0.version, 4);
    }

    #[test]
    fn section3_flags_and_descriptors() {
        let raw = [0, 0, 10, 0, 0, 1, 0b1000_0000, 0x07, 0x04, 0];
        let s3 = parse_section3(&raw).unwrap();
        assert_eq!(s3.number_of_subsets, 1);
        assert!(s3.is_observation);
        assert!(!s3.is_compressed);
        assert_eq!(s3.descriptors, vec![FXY::new(0, 7, 4)]);
    }

    #[test]
    fn impossible_dates_are_rejected() {
        let raw = v4::tests::section1_bytes(2021, 2, 30);
        let s1 = parse_section1(4, &raw).unwrap();
        assert!(matches!(s1.timestamp(), Err(Error::InvalidTimestamp(_))));
    }

    #[test]
    fn unknown_editions_are_refused() {
        assert!(matches!(
            section1_fixed_len(1),
            Err(Error::UnsupportedVersion(1))
        ));
        assert!(matches!(
            section1_fixed_len(5),
            Err(Error::UnsupportedVersion(5))
        ));
    }
}
