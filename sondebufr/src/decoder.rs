use crate::{
    bits::{BitInput, bytes_to_value},
    errors::{Error, Result},
    tables::Tables,
};
use genlib::{FXY, tables::BTableEntry};
use rustc_hash::FxHashMap;
use std::fmt::Display;

/// Mutable decode state, reset for every message.
#[derive(Debug, Clone, Default)]
pub struct DecoderState {
    /// 2-01: added to the width of numeric elements.
    pub extra_bits: i32,
    /// 2-02: added to the scale of numeric elements.
    pub extra_scale: i32,
    /// 2-03: reference overrides, innermost last.
    pub reference_stack: Vec<i64>,
    /// References an element kept after its 2-03 block was closed.
    pub redefined_references: FxHashMap<FXY, i64>,
    /// 2-06: width for the next element only.
    pub one_shot_width: Option<u32>,
    /// 2-04: associated field bits read before every element.
    pub prefix_bits: u32,
    /// Last 0-31-021 value.
    pub prefix_meaning: u8,
    /// 2-07
    pub increase: i32,
    /// 2-08: character element width in bytes.
    pub char_width: Option<usize>,
}

impl DecoderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Character elements and class 31 keep their table encoding.
    #[inline(always)]
    fn no_change(&self, e: &BTableEntry) -> bool {
        !e.is_numeric() || e.fxy.x == 31
    }

    #[inline(always)]
    fn datawidth(&self, e: &BTableEntry) -> Result<usize> {
        let bits = e.bufr_datawidth_bits as i64;
        if !e.is_numeric() {
            return Ok(self.char_width.map(|c| c * 8).unwrap_or(bits as usize));
        }
        if self.no_change(e) {
            return Ok(bits as usize);
        }

        let increase = if self.increase != 0 {
            ((10 * self.increase + 2) / 3) as i64
        } else {
            0
        };
        let width = bits + self.extra_bits as i64 + increase;
        if !(0..=64).contains(&width) {
            return Err(Error::ParseError(format!(
                "Effective width {} of {} is out of range",
                width, e.fxy
            )));
        }
        Ok(width as usize)
    }

    #[inline(always)]
    fn scale(&self, e: &BTableEntry) -> i32 {
        if self.no_change(e) {
            return e.bufr_scale;
        }
        e.bufr_scale + self.extra_scale + self.increase
    }

    #[inline(always)]
    fn reference_value(&self, e: &BTableEntry) -> i64 {
        if self.no_change(e) {
            return e.bufr_reference_value as i64;
        }

        let base = self
            .reference_stack
            .last()
            .or_else(|| self.redefined_references.get(&e.fxy))
            .copied()
            .unwrap_or(e.bufr_reference_value as i64);

        base.saturating_mul(10i64.saturating_pow(self.increase.max(0) as u32))
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Value {
    Number(f64),
    Missing,
    String(String),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Missing => write!(f, "MISSING"),
        }
    }
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Missing => None,
            Value::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            Value::Number(_) => None,
            Value::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

/// Every value decoded for one descriptor occurrence. Replicated
/// descriptors collect one entry per repetition.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ExtractedData {
    pub descriptor: FXY,
    /// Empty for character payloads.
    pub numeric_data: Vec<f64>,
    /// Raw left-justified bits of every decode, numeric or not.
    pub non_numeric_data: Vec<Vec<u8>>,
    pub missing: Vec<bool>,
    pub prefix_data_meaning: u8,
    pub prefix_data: Vec<Vec<u8>>,
}

impl ExtractedData {
    pub fn new(descriptor: FXY) -> Self {
        Self::with_capacity(descriptor, 1)
    }

    pub fn with_capacity(descriptor: FXY, n: usize) -> Self {
        ExtractedData {
            descriptor,
            numeric_data: Vec::with_capacity(n),
            non_numeric_data: Vec::with_capacity(n),
            missing: Vec::with_capacity(n),
            prefix_data_meaning: 0,
            prefix_data: vec![],
        }
    }

    /// Number of decodes collected.
    pub fn len(&self) -> usize {
        self.non_numeric_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.non_numeric_data.is_empty()
    }

    pub fn is_numeric(&self) -> bool {
        !self.numeric_data.is_empty()
    }

    pub fn values(&self) -> Vec<Value> {
        if self.is_numeric() {
            self.numeric_data
                .iter()
                .zip(&self.missing)
                .map(|(&v, &missing)| if missing { Value::Missing } else { Value::Number(v) })
                .collect()
        } else {
            self.non_numeric_data
                .iter()
                .map(|raw| Value::String(decode_chars(raw)))
                .collect()
        }
    }

    /// First non-missing numeric value.
    pub fn first_number(&self) -> Option<f64> {
        self.values().iter().find_map(Value::as_f64)
    }

    pub fn display_with<'a>(&'a self, entry: Option<&'a BTableEntry>) -> RecordDisplay<'a> {
        RecordDisplay { data: self, entry }
    }
}

/// Character payloads are space or NUL padded.
fn decode_chars(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches([' ', '\0'])
        .to_string()
}

/// Walks an expanded descriptor list over the packed data section.
pub struct Decoder<'t> {
    tables: &'t Tables,
}

impl<'t> Decoder<'t> {
    pub fn new(tables: &'t Tables) -> Self {
        Decoder { tables }
    }

    pub fn decode(&self, descriptors: &[FXY], data: &[u8]) -> Result<Vec<ExtractedData>> {
        let mut state = DecoderState::new();
        self.decode_with(descriptors, data, &mut state)
    }

    /// Same as [`Decoder::decode`], leaving the final state in `state`.
    pub fn decode_with(
        &self,
        descriptors: &[FXY],
        data: &[u8],
        state: &mut DecoderState,
    ) -> Result<Vec<ExtractedData>> {
        let mut input = BitInput::new(data);
        let mut records = Vec::with_capacity(descriptors.len());

        let mut idx = 0;
        while idx < descriptors.len() {
            idx = self.step(descriptors, idx, state, &mut input, &mut records)?;
        }

        tracing::debug!(
            "Decoded {} records from {} bits, {} bits left",
            records.len(),
            input.pointer(),
            input.remaining_bits()
        );
        Ok(records)
    }

    /// Dispatch the descriptor at `idx`; returns the index to continue at.
    fn step(
        &self,
        descs: &[FXY],
        idx: usize,
        state: &mut DecoderState,
        data: &mut BitInput,
        records: &mut Vec<ExtractedData>,
    ) -> Result<usize> {
        let des = descs[idx];
        match des.f {
            0 => {
                let mut record = ExtractedData::new(des);
                self.read_element(des, state, data, &mut record)?;
                records.push(record);
                Ok(idx + 1)
            }
            1 => self.replicate(descs, idx, state, data, records),
            2 => {
                if let Some(mut record) = self.deal_with_operator(des, state, data)? {
                    record.prefix_data_meaning = state.prefix_meaning;
                    records.push(record);
                }
                Ok(idx + 1)
            }
            3 => Err(Error::ParseError(format!(
                "Sequence descriptor {} reached the decoder unexpanded",
                des
            ))),
            _ => Err(Error::ParseError(format!(
                "Invalid descriptor F value: {}",
                des.f
            ))),
        }
    }

    fn replicate(
        &self,
        descs: &[FXY],
        idx: usize,
        state: &mut DecoderState,
        data: &mut BitInput,
        records: &mut Vec<ExtractedData>,
    ) -> Result<usize> {
        let des = descs[idx];
        let x = des.x as usize;

        let (times, body_start) = if des.is_delayed_replication() {
            let count_des = match descs.get(idx + 1) {
                Some(d) if d.is_delayed_replication_factor() => *d,
                _ => {
                    return Err(Error::ParseError(format!(
                        "Delayed replicator {} is not followed by a replication factor",
                        des
                    )));
                }
            };
            let mut factor = ExtractedData::new(count_des);
            self.read_element(count_des, state, data, &mut factor)?;
            let times = factor
                .first_number()
                .filter(|n| *n >= 0.0)
                .map(|n| n as usize)
                .ok_or_else(|| {
                    Error::ParseError(format!("Replication factor {} has no count", count_des))
                })?;
            records.push(factor);
            (times, idx + 2)
        } else {
            (des.y as usize, idx + 1)
        };

        let body_end = body_start + x;
        if body_end > descs.len() {
            return Err(Error::ParseError(format!(
                "Not enough descriptors to repeat: requested {}, available {}",
                x,
                descs.len() - body_start
            )));
        }
        let body = &descs[body_start..body_end];
        if let Some(nested) = body.iter().find(|d| d.f == 1) {
            return Err(Error::UnsupportedNestedReplication(*nested));
        }
        tracing::trace!("{}: {} x {} descriptors", des, times, x);

        // One stream per value-producing body descriptor, in body order
        let mut streams: Vec<Option<ExtractedData>> = body
            .iter()
            .map(|d| match (d.f, d.x) {
                (0, _) | (2, 5) => Some(ExtractedData::with_capacity(*d, times)),
                _ => None,
            })
            .collect();

        for _ in 0..times {
            for (d, stream) in body.iter().zip(streams.iter_mut()) {
                match (d.f, stream) {
                    (0, Some(stream)) => self.read_element(*d, state, data, stream)?,
                    (2, stream) => {
                        if let Some(record) = self.deal_with_operator(*d, state, data)? {
                            if let Some(stream) = stream {
                                stream.non_numeric_data.extend(record.non_numeric_data);
                                stream.prefix_data_meaning = state.prefix_meaning;
                            }
                        }
                    }
                    _ => {
                        return Err(Error::ParseError(format!(
                            "Descriptor {} cannot be replicated",
                            d
                        )));
                    }
                }
            }
        }

        records.extend(streams.into_iter().flatten());
        Ok(body_end)
    }

    /// Decode one occurrence of an element and append it to `target`.
    fn read_element(
        &self,
        des: FXY,
        state: &mut DecoderState,
        data: &mut BitInput,
        target: &mut ExtractedData,
    ) -> Result<()> {
        let e = self
            .tables
            .lookup_b(&des)
            .ok_or(Error::UnknownElementDescriptor(des))?;

        if des.x == 31 {
            let width = e.bufr_datawidth_bits as usize;
            let raw = data.read_bits(width)?;
            let value = self.evaluate(e, &raw, width, e.bufr_scale, e.bufr_reference_value as i64)?;
            if des.y == 21 {
                state.prefix_meaning = value as u8;
            }
            target.numeric_data.push(value);
            target.missing.push(false);
            target.non_numeric_data.push(raw);
            target.prefix_data_meaning = state.prefix_meaning;
            tracing::trace!("{} = {}", des, value);
            return Ok(());
        }

        if state.prefix_bits > 0 {
            let prefix = data.read_bits(state.prefix_bits as usize)?;
            target.prefix_data.push(prefix);
        }

        let width = match state.one_shot_width.take() {
            Some(w) => w as usize,
            None => state.datawidth(e)?,
        };
        let raw = data.read_bits(width)?;

        if e.is_numeric() {
            let scale = state.scale(e);
            let reference = state.reference_value(e);
            if let Some(&redefined) = state.reference_stack.last() {
                if !state.no_change(e) {
                    state.redefined_references.insert(des, redefined);
                }
            }
            let value = self.evaluate(e, &raw, width, scale, reference)?;
            let all_ones = width > 1 && bytes_to_value(&raw, width) == (u64::MAX >> (64 - width));
            target.numeric_data.push(value);
            target.missing.push(all_ones);
            tracing::trace!("{} = {}{}", des, value, if all_ones { " (missing)" } else { "" });
        } else {
            tracing::trace!("{} = {:?}", des, decode_chars(&raw));
        }
        target.non_numeric_data.push(raw);
        target.prefix_data_meaning = state.prefix_meaning;
        Ok(())
    }

    #[inline(always)]
    fn evaluate(
        &self,
        e: &BTableEntry,
        raw: &[u8],
        width: usize,
        scale: i32,
        reference: i64,
    ) -> Result<f64> {
        if width > 64 {
            return Err(Error::ParseError(format!(
                "Numeric element {} is {} bits wide",
                e.fxy, width
            )));
        }
        let value = bytes_to_value(raw, width);
        Ok((value as f64 + reference as f64) * 10.0f64.powi(-scale))
    }

    /// Apply an F=2 operator. Only 2-05 produces a record.
    fn deal_with_operator(
        &self,
        operator: FXY,
        state: &mut DecoderState,
        data: &mut BitInput,
    ) -> Result<Option<ExtractedData>> {
        let y = operator.y;

        match operator.x {
            1 => {
                state.extra_bits = if y == 0 { 0 } else { y - 128 };
            }
            2 => {
                state.extra_scale = if y == 0 { 0 } else { y - 128 };
            }
            3 => match y {
                255 => {
                    state
                        .reference_stack
                        .pop()
                        .ok_or(Error::OperatorStackUnderflow)?;
                }
                0 => {
                    state.reference_stack.clear();
                    state.redefined_references.clear();
                }
                _ => {
                    let negative = data.get_arbitary_bits(1)? == 1;
                    let magnitude = data.get_arbitary_bits(y as usize - 1)? as i64;
                    state
                        .reference_stack
                        .push(if negative { -magnitude } else { magnitude });
                }
            },
            4 => {
                state.prefix_bits = y as u32;
                state.prefix_meaning = 0;
            }
            5 => {
                let raw = data.read_bits(y as usize * 8)?;
                let mut record = ExtractedData::new(operator);
                tracing::trace!("{} = {:?}", operator, decode_chars(&raw));
                record.non_numeric_data.push(raw);
                return Ok(Some(record));
            }
            6 => {
                state.one_shot_width = Some(y as u32);
            }
            7 => {
                state.increase = y;
            }
            8 => {
                state.char_width = if y == 0 { None } else { Some(y as usize) };
            }
            _ => return Err(Error::UnsupportedOperator(operator)),
        }

        Ok(None)
    }
}

pub struct RecordDisplay<'a> {
    data: &'a ExtractedData,
    entry: Option<&'a BTableEntry>,
}

impl Display for RecordDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let descriptor = self.data.descriptor.to_string();
        let name = self
            .entry
            .map(|e| e.element_name_en.as_str())
            .unwrap_or(descriptor.as_str());
        let unit = self
            .entry
            .filter(|e| e.is_numeric() && !e.is_flag_or_code())
            .map(|e| e.bufr_unit.as_str());
        let width = f.width().unwrap_or(0);

        if width > 0 {
            write!(f, "{:<width$} : ", name, width = width)?;
        } else {
            write!(f, "{} : ", name)?;
        }

        let values = self.data.values();
        if let [single] = values.as_slice() {
            format_value(f, single)?;
            if let (Some(unit), Value::Number(_)) = (unit, single) {
                write!(f, " {}", unit)?;
            }
            return Ok(());
        }

        let missing_count = values.iter().filter(|v| v.is_missing()).count();
        write!(f, "[len={}", values.len())?;
        if missing_count > 0 {
            write!(f, ", missing={}", missing_count)?;
        }
        write!(f, "] ")?;

        let show_limit = 6;
        write!(f, "[")?;
        if values.len() <= show_limit {
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                format_value(f, v)?;
            }
        } else {
            for (i, v) in values.iter().take(3).enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                format_value(f, v)?;
            }
            write!(f, " ... ")?;
            for (i, v) in values.iter().skip(values.len() - 2).enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                format_value(f, v)?;
            }
        }
        write!(f, "]")?;

        if let Some(unit) = unit {
            write!(f, " {}", unit)?;
        }
        Ok(())
    }
}

fn format_value(f: &mut std::fmt::Formatter<'_>, value: &Value) -> std::fmt::Result {
    match value {
        Value::Missing => write!(f, "MISSING"),
        Value::String(s) => write!(f, "\"{}\"", s),
        Value::Number(n) => write!(f, "{}", n),
    }
}

impl Display for ExtractedData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.display_with(None), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn b(x: i32, y: i32) -> FXY {
        FXY::new(0, x, y)
    }

    const fn op(x: i32, y: i32) -> FXY {
        FXY::new(2, x, y)
    }

    /// MSB-first packing of `(value, width)` fields.
    fn pack(fields: &[(u64, usize)]) -> Vec<u8> {
        let mut out = vec![];
        let (mut acc, mut n) = (0u8, 0);
        for &(value, width) in fields {
            for i in (0..width).rev() {
                acc = (acc << 1) | ((value >> i) & 1) as u8;
                n += 1;
                if n == 8 {
                    out.push(acc);
                    acc = 0;
                    n = 0;
                }
            }
        }
        if n > 0 {
            out.push(acc << (8 - n));
        }
        out
    }

    fn chars(s: &str) -> Vec<(u64, usize)> {
        s.bytes().map(|c| (c as u64, 8)).collect()
    }

    fn run(descs: &[FXY], fields: &[(u64, usize)]) -> Result<(Vec<ExtractedData>, DecoderState)> {
        let mut state = DecoderState::new();
        let data = pack(fields);
        let records = Decoder::new(Tables::builtin()).decode_with(descs, &data, &mut state)?;
        Ok((records, state))
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn affine_decode_law() {
        let (records, _) = run(
            &[b(7, 4), b(12, 101), b(4, 86)],
            &[(10000, 14), (29315, 16), (8192 + 60, 15)],
        )
        .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].numeric_data, vec![100000.0]);
        assert!(approx(records[1].numeric_data[0], 293.15));
        assert_eq!(records[2].numeric_data, vec![60.0]);
        // The raw bits are kept for every decode
        assert_eq!(records[0].non_numeric_data, vec![vec![0x9C, 0x40]]);
    }

    #[test]
    fn all_ones_is_missing() {
        let (records, _) = run(&[b(12, 101)], &[(0xFFFF, 16)]).unwrap();
        assert_eq!(records[0].missing, vec![true]);
        assert!(records[0].values()[0].is_missing());
        assert_eq!(records[0].first_number(), None);
    }

    #[test]
    fn character_elements_are_not_numeric() {
        let mut fields = chars("ABC");
        fields.extend(std::iter::repeat_n((b' ' as u64, 8), 17));
        let (records, _) = run(&[b(1, 81)], &fields).unwrap();
        assert!(records[0].numeric_data.is_empty());
        assert_eq!(records[0].non_numeric_data[0].len(), 20);
        assert_eq!(records[0].values()[0].as_str(), Some("ABC"));
    }

    #[test]
    fn extra_bits_apply_until_cancelled() {
        let (records, state) = run(
            &[op(1, 130), b(12, 101), op(1, 0), b(12, 101)],
            &[(29315, 18), (29315, 16)],
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert!(approx(records[0].numeric_data[0], 293.15));
        assert!(approx(records[1].numeric_data[0], 293.15));
        assert_eq!(state.extra_bits, 0);
    }

    #[test]
    fn cancel_resets_to_zero_not_previous() {
        // 2-01-000 after two changes goes back to the table width
        let (records, state) = run(
            &[op(1, 130), op(1, 129), op(1, 0), b(7, 4)],
            &[(10000, 14)],
        )
        .unwrap();
        assert_eq!(records[0].numeric_data, vec![100000.0]);
        assert_eq!(state.extra_bits, 0);

        let (_, state) = run(&[op(2, 131), op(2, 129), op(2, 0)], &[]).unwrap();
        assert_eq!(state.extra_scale, 0);
    }

    #[test]
    fn bias_128_means_no_extra_bits() {
        let (records, state) = run(
            &[op(1, 130), b(7, 4), op(1, 128), b(7, 4)],
            &[(10000, 16), (10000, 14)],
        )
        .unwrap();
        assert_eq!(records[0].numeric_data, vec![100000.0]);
        assert_eq!(records[1].numeric_data, vec![100000.0]);
        assert_eq!(state.extra_bits, 0);
    }

    #[test]
    fn extra_scale_shifts_decimal_point() {
        let (records, _) = run(&[op(2, 129), b(7, 4)], &[(1000, 14)]).unwrap();
        assert_eq!(records[0].numeric_data, vec![1000.0]);
    }

    #[test]
    fn class_31_ignores_operators() {
        let (records, _) = run(
            &[op(1, 130), FXY::new(1, 1, 0), b(31, 1), b(7, 4)],
            &[(1, 8), (10000, 16)],
        )
        .unwrap();
        assert_eq!(records[0].descriptor, b(31, 1));
        assert_eq!(records[0].numeric_data, vec![1.0]);
        assert_eq!(records[1].numeric_data, vec![100000.0]);
    }

    #[test]
    fn reference_stack_and_redefinition() {
        let (records, state) = run(
            &[
                op(3, 12),
                b(7, 4),
                op(3, 255),
                b(7, 4),
                op(3, 0),
                b(7, 4),
            ],
            // sign bit set, magnitude 100
            &[(1, 1), (100, 11), (200, 14), (200, 14), (200, 14)],
        )
        .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].numeric_data, vec![1000.0]);
        // Still redefined after the pop
        assert_eq!(records[1].numeric_data, vec![1000.0]);
        // Until 2-03-000
        assert_eq!(records[2].numeric_data, vec![2000.0]);
        assert!(state.reference_stack.is_empty());
        assert!(state.redefined_references.is_empty());
    }

    #[test]
    fn popping_empty_stack_fails() {
        assert!(matches!(
            run(&[op(3, 255)], &[]),
            Err(Error::OperatorStackUnderflow)
        ));
    }

    #[test]
    fn associated_field_prefixes_elements() {
        let (records, state) = run(
            &[op(4, 4), b(31, 21), b(7, 4), op(4, 0), b(7, 4)],
            &[(1, 6), (0b1010, 4), (10000, 14), (10000, 14)],
        )
        .unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[0].prefix_data.is_empty());
        assert_eq!(records[1].prefix_data, vec![vec![0xA0]]);
        assert_eq!(records[1].prefix_data_meaning, 1);
        assert_eq!(records[1].numeric_data, vec![100000.0]);
        assert!(records[2].prefix_data.is_empty());
        assert_eq!(records[2].prefix_data_meaning, 0);
        assert_eq!(state.prefix_bits, 0);
    }

    #[test]
    fn inline_characters_become_a_record() {
        let (records, _) = run(&[op(5, 3), b(7, 4)], &[chars("ABC"), vec![(10000, 14)]].concat())
            .unwrap();
        assert_eq!(records[0].descriptor, op(5, 3));
        assert!(records[0].numeric_data.is_empty());
        assert_eq!(records[0].non_numeric_data, vec![b"ABC".to_vec()]);
        assert_eq!(records[1].numeric_data, vec![100000.0]);
    }

    #[test]
    fn one_shot_width_is_used_once() {
        let (records, state) = run(
            &[op(6, 20), b(7, 4), b(7, 4)],
            &[(10000, 20), (10000, 14)],
        )
        .unwrap();
        assert_eq!(records[0].numeric_data, vec![100000.0]);
        assert_eq!(records[1].numeric_data, vec![100000.0]);
        assert_eq!(state.one_shot_width, None);
    }

    #[test]
    fn increase_scale_reference_and_width() {
        // 14 + (10 + 2) / 3 bits, scale -1 + 1
        let (records, _) = run(&[op(7, 1), b(7, 4)], &[(100000, 18)]).unwrap();
        assert_eq!(records[0].numeric_data, vec![100000.0]);

        let (records, _) = run(&[op(7, 1), b(4, 86), op(7, 0), b(4, 86)], &[
            (81920 + 600, 19),
            (8192 + 60, 15),
        ])
        .unwrap();
        assert!(approx(records[0].numeric_data[0], 60.0));
        assert_eq!(records[1].numeric_data, vec![60.0]);
    }

    #[test]
    fn character_width_override() {
        let (records, state) = run(&[op(8, 3), b(1, 81), op(8, 0)], &chars("A12")).unwrap();
        assert_eq!(records[0].values()[0].as_str(), Some("A12"));
        assert_eq!(state.char_width, None);
    }

    #[test]
    fn unknown_operators_are_refused() {
        assert!(matches!(
            run(&[op(22, 0)], &[]),
            Err(Error::UnsupportedOperator(d)) if d == op(22, 0)
        ));
    }

    #[test]
    fn fixed_replication_collects_streams() {
        let (records, _) = run(
            &[FXY::new(1, 2, 3), b(7, 4), b(12, 101)],
            &[
                (10000, 14),
                (29315, 16),
                (8500, 14),
                (28000, 16),
                (5000, 14),
                (25000, 16),
            ],
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].descriptor, b(7, 4));
        assert_eq!(records[0].numeric_data, vec![100000.0, 85000.0, 50000.0]);
        assert_eq!(records[1].len(), 3);
    }

    #[test]
    fn delayed_replication_emits_factor_and_streams() {
        let (records, _) = run(
            &[FXY::new(1, 1, 0), b(31, 1), b(7, 4), b(12, 101)],
            &[(2, 8), (10000, 14), (5000, 14), (29315, 16)],
        )
        .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].descriptor, b(31, 1));
        assert_eq!(records[0].numeric_data, vec![2.0]);
        assert_eq!(records[1].numeric_data, vec![100000.0, 50000.0]);
        // Past the body
        assert_eq!(records[2].len(), 1);
    }

    #[test]
    fn zero_repetitions_still_emit_streams() {
        let (records, _) = run(&[FXY::new(1, 2, 0), b(31, 1), b(7, 4), b(12, 101)], &[(0, 8)])
            .unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[1].is_empty());
        assert!(records[2].is_empty());
    }

    #[test]
    fn nested_replication_in_body() {
        assert!(matches!(
            run(&[FXY::new(1, 2, 2), FXY::new(1, 1, 1), b(7, 4)], &[]),
            Err(Error::UnsupportedNestedReplication(_))
        ));
    }

    #[test]
    fn unknown_element_and_truncation() {
        assert!(matches!(
            run(&[b(63, 255)], &[(0, 8)]),
            Err(Error::UnknownElementDescriptor(d)) if d == b(63, 255)
        ));
        assert!(matches!(run(&[b(7, 4)], &[(1, 8)]), Err(Error::Truncated)));
    }

    #[test]
    fn display_names_and_units() {
        let (records, _) = run(&[FXY::new(1, 1, 8), b(7, 4)], &[(10000, 14); 8]).unwrap();
        let entry = Tables::builtin().lookup_b(&b(7, 4));
        let line = format!("{}", records[0].display_with(entry));
        assert!(line.starts_with("Pressure : [len=8] ["));
        assert!(line.contains(" ... "));
        assert!(line.ends_with("] Pa"));
        assert_eq!(format!("{}", records[0]).split(' ').next(), Some("007004"));
    }

    #[test]
    fn records_survive_json() {
        let mut fields = vec![(10000, 14), (0xFFFF, 16)];
        fields.extend(chars("SONDE"));
        fields.extend(std::iter::repeat_n((b' ' as u64, 8), 15));
        let (records, _) = run(&[b(7, 4), b(12, 101), b(1, 81)], &fields).unwrap();

        let json = serde_json::to_string(&records).unwrap();
        let back: Vec<ExtractedData> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, records);
        assert!(back[1].values()[0].is_missing());

        let values: Vec<Value> = back.iter().flat_map(|r| r.values()).collect();
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(serde_json::from_str::<Vec<Value>>(&json).unwrap(), values);
        assert_eq!(values[2], Value::String("SONDE".to_string()));
    }
}
