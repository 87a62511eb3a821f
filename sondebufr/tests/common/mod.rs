#![allow(dead_code)]

use byteorder::{BigEndian, WriteBytesExt};
use genlib::builtin::{export_csv, table_b, table_d};
use genlib::tables::{BTableEntry, DTableEntry};
use genlib::wmo::{btable::RawBTableEntry, dtable::RawDTableEntry};
use libsondebufr::FXY;
use std::path::Path;

/// MSB-first bit packer for section 4 payloads.
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bits_written(&self) -> usize {
        self.bits
    }

    pub fn write_bits(&mut self, value: u64, width: usize) -> &mut Self {
        for i in (0..width).rev() {
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 == 1 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 0x80 >> (self.bits % 8);
            }
            self.bits += 1;
        }
        self
    }

    pub fn write_str(&mut self, s: &str, nbytes: usize) -> &mut Self {
        let mut raw = s.as_bytes().to_vec();
        raw.resize(nbytes, b' ');
        for b in raw {
            self.write_bits(b as u64, 8);
        }
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// Builds a single-message BUFR buffer section by section.
pub struct MessageBuilder {
    pub edition: u8,
    pub time: (u16, u8, u8, u8, u8, u8),
    pub master_version: u8,
    pub local_version: u8,
    pub subsets: u16,
    pub compressed: bool,
    pub optional: Option<Vec<u8>>,
    pub descriptors: Vec<FXY>,
    pub data: Vec<u8>,
}

impl MessageBuilder {
    pub fn new(descriptors: Vec<FXY>, data: Vec<u8>) -> Self {
        MessageBuilder {
            edition: 4,
            time: (2021, 6, 15, 12, 0, 0),
            master_version: 36,
            local_version: 0,
            subsets: 1,
            compressed: false,
            optional: None,
            descriptors,
            data,
        }
    }

    pub fn edition(mut self, edition: u8) -> Self {
        self.edition = edition;
        self
    }

    pub fn time(mut self, time: (u16, u8, u8, u8, u8, u8)) -> Self {
        self.time = time;
        self
    }

    pub fn subsets(mut self, subsets: u16) -> Self {
        self.subsets = subsets;
        self
    }

    pub fn compressed(mut self) -> Self {
        self.compressed = true;
        self
    }

    pub fn master_version(mut self, version: u8) -> Self {
        self.master_version = version;
        self
    }

    pub fn optional(mut self, blob: &[u8]) -> Self {
        self.optional = Some(blob.to_vec());
        self
    }

    fn section1(&self) -> Vec<u8> {
        let (year, month, day, hour, minute, second) = self.time;
        let flags = if self.optional.is_some() { 0x80 } else { 0 };
        let mut s = vec![];
        match self.edition {
            4 => {
                s.write_u24::<BigEndian>(22).unwrap();
                s.write_u8(0).unwrap();
                s.write_u16::<BigEndian>(78).unwrap();
                s.write_u16::<BigEndian>(0).unwrap();
                s.write_u8(0).unwrap();
                s.write_u8(flags).unwrap();
                s.write_u8(2).unwrap();
                s.write_u8(4).unwrap();
                s.write_u8(0).unwrap();
                s.write_u8(self.master_version).unwrap();
                s.write_u8(self.local_version).unwrap();
                s.write_u16::<BigEndian>(year).unwrap();
                s.extend_from_slice(&[month, day, hour, minute, second]);
            }
            _ => {
                s.write_u24::<BigEndian>(18).unwrap();
                s.write_u8(0).unwrap();
                s.write_u8(0).unwrap();
                s.write_u8(78).unwrap();
                s.write_u8(0).unwrap();
                s.write_u8(flags).unwrap();
                s.write_u8(2).unwrap();
                s.write_u8(4).unwrap();
                s.write_u8(self.master_version).unwrap();
                s.write_u8(self.local_version).unwrap();
                s.write_u8((year % 100) as u8).unwrap();
                s.extend_from_slice(&[month, day, hour, minute]);
                // Pad to an even length
                s.write_u8(0).unwrap();
            }
        }
        s
    }

    fn section2(&self) -> Option<Vec<u8>> {
        let blob = self.optional.as_ref()?;
        let mut s = vec![];
        s.write_u24::<BigEndian>(4 + blob.len() as u32).unwrap();
        s.write_u8(0).unwrap();
        s.extend_from_slice(blob);
        Some(s)
    }

    fn section3(&self) -> Vec<u8> {
        let mut s = vec![];
        s.write_u24::<BigEndian>(7 + 2 * self.descriptors.len() as u32).unwrap();
        s.write_u8(0).unwrap();
        s.write_u16::<BigEndian>(self.subsets).unwrap();
        s.write_u8(0x80 | if self.compressed { 0x40 } else { 0 }).unwrap();
        for d in &self.descriptors {
            s.write_u16::<BigEndian>(d.to_u32() as u16).unwrap();
        }
        s
    }

    fn section4(&self) -> Vec<u8> {
        let mut s = vec![];
        s.write_u24::<BigEndian>(4 + self.data.len() as u32).unwrap();
        s.write_u8(0).unwrap();
        s.extend_from_slice(&self.data);
        s
    }

    pub fn build(&self) -> Vec<u8> {
        let mut body = self.section1();
        if let Some(s2) = self.section2() {
            body.extend(s2);
        }
        body.extend(self.section3());
        body.extend(self.section4());
        body.extend_from_slice(b"7777");

        let mut message = b"BUFR".to_vec();
        message.write_u24::<BigEndian>(8 + body.len() as u32).unwrap();
        message.write_u8(self.edition).unwrap();
        message.extend(body);
        message
    }
}

/// The 14-bit pressure message: raw 10000 for 0-07-004.
pub fn pressure_message() -> Vec<u8> {
    let data = BitWriter::new().write_bits(10000, 14).finish();
    MessageBuilder::new(vec![FXY::new(0, 7, 4)], data).build()
}

/// Built-in tables written to `<base>/master/` as version `version`, with
/// `tweak` applied to every Table B entry and `extra` appended to Table D.
pub fn write_master_tables(
    base: &Path,
    version: u8,
    tweak: impl Fn(&mut BTableEntry),
    extra: &[DTableEntry],
) {
    let (b_path, d_path) = export_csv(&base.join("master"), version).unwrap();

    let mut writer = csv::Writer::from_path(&b_path).unwrap();
    for entry in table_b().get_all_entries() {
        let mut entry = entry.clone();
        tweak(&mut entry);
        writer.serialize(RawBTableEntry::from(&entry)).unwrap();
    }
    writer.flush().unwrap();

    let mut writer = csv::Writer::from_path(&d_path).unwrap();
    for entry in table_d().get_all_entries().into_iter().chain(extra) {
        for row in RawDTableEntry::rows(entry) {
            writer.serialize(row).unwrap();
        }
    }
    writer.flush().unwrap();
}
