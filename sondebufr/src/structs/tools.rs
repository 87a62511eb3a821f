use crate::errors::{Error, Result};
use genlib::FXY;
use nom::IResult;
use nom::bits::complete::take;

type BitSlice<'a> = (&'a [u8], usize);

/// Two bytes per descriptor; a trailing odd pad byte is ignored.
pub(super) fn parse_descriptors(input: &[u8]) -> Result<Vec<FXY>> {
    parse_descriptors_inner(input)
        .map(|(_, v)| v)
        .map_err(|_| Error::ParseError("Can't parse descriptors from section 3".to_string()))
}

fn parse_descriptors_inner(mut input: &[u8]) -> IResult<BitSlice<'_>, Vec<FXY>> {
    let mut results = Vec::with_capacity(input.len() / 2);
    while input.len() > 1 {
        let ((rest, _), fxy) = take_fxy((input, 0))?;
        results.push(fxy);
        input = rest;
    }

    Ok(((input, 0), results))
}

fn take_fxy(bit_input: BitSlice) -> IResult<BitSlice, FXY> {
    let (bit_input, f): (_, i32) = take(2usize)(bit_input)?;
    let (bit_input, x): (_, i32) = take(6usize)(bit_input)?;
    let (bit_input, y): (_, i32) = take(8usize)(bit_input)?;

    Ok((bit_input, FXY::new(f, x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_descriptor_words() {
        // 3-09-052, 0-07-004, odd pad byte
        let raw = [0xC9, 0x34, 0x07, 0x04, 0x00];
        let descs = parse_descriptors(&raw).unwrap();
        assert_eq!(descs, vec![FXY::new(3, 9, 52), FXY::new(0, 7, 4)]);
    }
}
