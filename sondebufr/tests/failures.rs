mod common;

use common::{BitWriter, MessageBuilder, pressure_message};
use libsondebufr::{Bufr, Error, FXY};
use std::io::Cursor;

#[test]
fn truncated_before_end_marker() {
    let bytes = pressure_message();
    let cut = &bytes[..bytes.len() - 4];
    let mut bufr = Bufr::with_builtin_tables();
    assert!(matches!(
        bufr.read(&mut Cursor::new(cut)),
        Err(Error::Truncated)
    ));
    assert!(bufr.data().is_empty());
    assert!(bufr.header().is_none());
}

#[test]
fn truncated_inside_data_section() {
    let bytes = pressure_message();
    // Drop the two data bytes and the end marker
    let cut = &bytes[..bytes.len() - 6];
    let mut bufr = Bufr::with_builtin_tables();
    assert!(matches!(bufr.from_bytes(cut), Err(Error::Truncated)));
}

#[test]
fn wrong_end_marker() {
    let mut bytes = pressure_message();
    let n = bytes.len();
    bytes[n - 1] = b'8';
    let mut bufr = Bufr::with_builtin_tables();
    assert!(matches!(bufr.from_bytes(&bytes), Err(Error::MissingEndMarker)));
}

#[test]
fn corrupt_magic() {
    let mut bytes = pressure_message();
    bytes[0] = b'G';
    let mut bufr = Bufr::with_builtin_tables();
    assert!(matches!(bufr.from_bytes(&bytes), Err(Error::NotBufr)));
}

#[test]
fn unknown_element_leaves_no_data() {
    let mut bufr = Bufr::with_builtin_tables();
    bufr.from_bytes(&pressure_message()).unwrap();
    assert_eq!(bufr.data().len(), 1);

    // A known element first, so a partial result would be visible
    let data = BitWriter::new().write_bits(10000, 14).write_bits(0, 16).finish();
    let bytes = MessageBuilder::new(vec![FXY::new(0, 7, 4), FXY::new(0, 63, 250)], data).build();
    assert!(matches!(
        bufr.from_bytes(&bytes),
        Err(Error::UnknownElementDescriptor(d)) if d == FXY::new(0, 63, 250)
    ));
    assert!(bufr.data().is_empty());
    assert!(bufr.time().is_none());
}

#[test]
fn unknown_sequence() {
    let bytes = MessageBuilder::new(vec![FXY::new(3, 60, 1)], vec![0]).build();
    let mut bufr = Bufr::with_builtin_tables();
    assert!(matches!(
        bufr.from_bytes(&bytes),
        Err(Error::UnknownSequenceDescriptor(_))
    ));
}

#[test]
fn compressed_messages_are_refused() {
    let data = BitWriter::new().write_bits(10000, 14).finish();
    let bytes = MessageBuilder::new(vec![FXY::new(0, 7, 4)], data)
        .compressed()
        .build();
    let mut bufr = Bufr::with_builtin_tables();
    assert!(matches!(
        bufr.from_bytes(&bytes),
        Err(Error::UnsupportedCompression)
    ));
}

#[test]
fn unsupported_edition() {
    let mut bytes = pressure_message();
    bytes[7] = 5;
    let mut bufr = Bufr::with_builtin_tables();
    assert!(matches!(
        bufr.from_bytes(&bytes),
        Err(Error::UnsupportedVersion(5))
    ));
}

#[test]
fn impossible_timestamp() {
    let data = BitWriter::new().write_bits(10000, 14).finish();
    let bytes = MessageBuilder::new(vec![FXY::new(0, 7, 4)], data)
        .time((2021, 13, 1, 0, 0, 0))
        .build();
    let mut bufr = Bufr::with_builtin_tables();
    assert!(matches!(
        bufr.from_bytes(&bytes),
        Err(Error::InvalidTimestamp(_))
    ));
}

#[test]
fn stack_underflow_aborts_the_message() {
    let bytes = MessageBuilder::new(vec![FXY::new(2, 3, 255)], vec![0]).build();
    let mut bufr = Bufr::with_builtin_tables();
    assert!(matches!(
        bufr.from_bytes(&bytes),
        Err(Error::OperatorStackUnderflow)
    ));
}
