use super::Section1;
use nom::{
    IResult,
    bytes::complete::take,
    error::{Error, ErrorKind},
    number::complete::{be_u8, be_u16, be_u24},
};

pub(crate) const FIXED_LEN: usize = 22;

pub(super) fn parse_section1(input: &[u8]) -> IResult<&[u8], Section1> {
    let (input, length_u24) = be_u24(input)?;
    let length = length_u24 as usize;

    if length < FIXED_LEN {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::LengthValue)));
    }

    let (input, master_table) = be_u8(input)?; // octet 4
    let (input, centre) = be_u16(input)?; // octet 5-6
    let (input, subcentre) = be_u16(input)?; // octet 7-8
    let (input, update_sequence_number) = be_u8(input)?;

    let (input, flags) = be_u8(input)?; // octet 10 bit1
    let optional_section_present = (flags & 0x80) != 0;

    let (input, data_category) = be_u8(input)?;
    let (input, international_data_subcategory) = be_u8(input)?;
    let (input, local_subcategory) = be_u8(input)?;
    let (input, master_table_version) = be_u8(input)?;
    let (input, local_table_version) = be_u8(input)?;

    let (input, year) = be_u16(input)?; // octet 16-17 (4 digits)
    let (input, month) = be_u8(input)?;
    let (input, day) = be_u8(input)?;
    let (input, hour) = be_u8(input)?;
    let (input, minute) = be_u8(input)?;
    let (input, second) = be_u8(input)?;

    let (input, local_bytes) = take(length - FIXED_LEN)(input)?;

    Ok((
        input,
        Section1 {
            length,
            master_table,
            centre,
            subcentre,
            update_sequence_number,
            optional_section_present,
            data_category,
            international_data_subcategory,
            local_subcategory: Some(local_subcategory),
            master_table_version,
            local_table_version,
            year,
            month,
            day,
            hour,
            minute,
            second,
            local_use: local_bytes.to_vec(),
        },
    ))
}
