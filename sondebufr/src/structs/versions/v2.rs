use super::Section1;
use nom::{
    IResult,
    number::complete::{be_u8, be_u24},
};

pub(crate) const FIXED_LEN: usize = 17;

/// Editions 2 and 3 only carry the year of the century.
fn full_year(year_of_century: u8) -> u16 {
    match year_of_century {
        100 => 2000,
        y if y >= 50 => 1900 + y as u16,
        y => 2000 + y as u16,
    }
}

pub(super) fn parse_section1(input: &[u8]) -> IResult<&[u8], Section1> {
    let (input, length) = be_u24(input)?;
    let length = length as usize;

    if length < FIXED_LEN {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::LengthValue,
        )));
    }

    let (input, master_table) = be_u8(input)?; // octet 4
    let (input, subcentre) = be_u8(input)?; // octet 5
    let (input, centre) = be_u8(input)?; // octet 6
    let (input, update_sequence_number) = be_u8(input)?; // octet 7
    let (input, optional_section_flag) = be_u8(input)?; // octet 8 bit1 (MSB)
    let optional_section_present = (optional_section_flag & 0x80) != 0;

    let (input, data_category) = be_u8(input)?;
    let (input, data_subcategory) = be_u8(input)?;
    let (input, master_table_version) = be_u8(input)?;
    let (input, local_table_version) = be_u8(input)?;
    let (input, year) = be_u8(input)?; // octet 13 (year of century)
    let (input, month) = be_u8(input)?;
    let (input, day) = be_u8(input)?;
    let (input, hour) = be_u8(input)?;
    let (input, minute) = be_u8(input)?;

    let (input, local_bytes) = nom::bytes::complete::take(length - FIXED_LEN)(input)?;

    Ok((
        input,
        Section1 {
            length,
            master_table,
            centre: centre as u16,
            subcentre: subcentre as u16,
            update_sequence_number,
            optional_section_present,
            data_category,
            international_data_subcategory: data_subcategory,
            local_subcategory: None,
            master_table_version,
            local_table_version,
            year: full_year(year),
            month,
            day,
            hour,
            minute,
            second: 0,
            local_use: local_bytes.to_vec(),
        },
    ))
}
