use crate::FXY;
use serde::Serialize as SerdeSerialize;
use serde::de::DeserializeOwned;
use std::fmt::{Debug, Display};

pub struct BTable;
pub struct DTable;

pub trait TableTypeTrait {
    type EntryType: TableEntry;
    const TABLE_TYPE: crate::TableType;
}

impl TableTypeTrait for BTable {
    type EntryType = crate::tables::BTableEntry;
    const TABLE_TYPE: crate::TableType = crate::TableType::B;
}
impl TableTypeTrait for DTable {
    type EntryType = crate::tables::DTableEntry;
    const TABLE_TYPE: crate::TableType = crate::TableType::D;
}

pub trait TableEntry: SerdeSerialize + DeserializeOwned + Display + Debug + Clone + Sized {
    fn fxy(&self) -> FXY;
}

const CCITT_IA5: &str = "CCITT IA5";

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct BTableEntry {
    pub fxy: FXY,
    pub class_name_en: String,
    pub element_name_en: String,
    pub bufr_unit: String,
    pub bufr_scale: i32,
    pub bufr_reference_value: i32,
    pub bufr_datawidth_bits: u32,
    pub note_en: Option<String>,
    pub note_ids: Option<String>,
    pub status: Option<String>,
}

impl BTableEntry {
    pub fn new(fxy: FXY, name: &str, unit: &str, scale: i32, reference: i32, bits: u32) -> Self {
        BTableEntry {
            fxy,
            class_name_en: String::new(),
            element_name_en: name.to_string(),
            bufr_unit: unit.to_string(),
            bufr_scale: scale,
            bufr_reference_value: reference,
            bufr_datawidth_bits: bits,
            note_en: None,
            note_ids: None,
            status: None,
        }
    }

    pub fn element_name_en(&self) -> &str {
        &self.element_name_en
    }

    pub fn bufr_unit(&self) -> &str {
        &self.bufr_unit
    }

    pub fn bufr_scale(&self) -> i32 {
        self.bufr_scale
    }

    pub fn bufr_reference_value(&self) -> i32 {
        self.bufr_reference_value
    }

    pub fn bufr_datawidth_bits(&self) -> u32 {
        self.bufr_datawidth_bits
    }

    /// False for character payloads, which are kept as opaque bytes.
    pub fn is_numeric(&self) -> bool {
        !self.bufr_unit.trim().eq_ignore_ascii_case(CCITT_IA5)
    }

    pub fn is_flag_or_code(&self) -> bool {
        matches!(
            self.bufr_unit.trim().to_ascii_lowercase().as_str(),
            "flag table" | "flag-table" | "code table" | "code-table"
        )
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

impl Display for BTableEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let element_name = if self.element_name_en.chars().count() > 40 {
            format!(
                "{}...",
                self.element_name_en.chars().take(37).collect::<String>()
            )
        } else {
            self.element_name_en.clone()
        };

        let unit = if self.bufr_unit.chars().count() > 15 {
            format!("{}...", self.bufr_unit.chars().take(12).collect::<String>())
        } else {
            self.bufr_unit.clone()
        };

        write!(
            f,
            "{} | {:<40} | {:<15} | {:>5} | {:>10} | {:>5} | {}",
            self.fxy,
            element_name,
            unit,
            self.bufr_scale,
            self.bufr_reference_value,
            self.bufr_datawidth_bits,
            self.status().unwrap_or("N/A")
        )
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct DTableEntry {
    pub fxy: FXY,
    pub fxy_chain: Vec<FXY>,
    pub category: Option<String>,
    pub category_of_sequences_en: Option<String>,
    pub title_en: Option<String>,
    pub subtitle_en: Option<String>,
    pub note_en: Option<String>,
    pub note_ids: Option<String>,
    pub status: Option<String>,
}

impl DTableEntry {
    pub fn new(fxy: FXY, fxy_chain: Vec<FXY>) -> Self {
        DTableEntry {
            fxy,
            fxy_chain,
            category: None,
            category_of_sequences_en: None,
            title_en: None,
            subtitle_en: None,
            note_en: None,
            note_ids: None,
            status: None,
        }
    }

    pub fn fxy_chain(&self) -> &[FXY] {
        &self.fxy_chain
    }

    pub fn title_en(&self) -> Option<&str> {
        self.title_en.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

impl std::fmt::Display for DTableEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fxy_chain_str: String = self
            .fxy_chain
            .iter()
            .map(|fxy| fxy.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let title = self.title_en.as_deref().unwrap_or("N/A");
        let truncated_title = if title.chars().count() > 50 {
            format!("{}...", title.chars().take(47).collect::<String>())
        } else {
            title.to_string()
        };

        write!(
            f,
            "{} | {:<50} | {:<12} | [{}]",
            self.fxy,
            truncated_title,
            self.status().unwrap_or("N/A"),
            fxy_chain_str
        )
    }
}

impl TableEntry for DTableEntry {
    fn fxy(&self) -> FXY {
        self.fxy
    }
}

impl TableEntry for BTableEntry {
    fn fxy(&self) -> FXY {
        self.fxy
    }
}
