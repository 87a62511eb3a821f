use super::EntryLoader;
use crate::{
    FXY,
    tables::{DTable, DTableEntry},
};

/// Groups consecutive rows sharing `FXY1` into one sequence.
#[derive(Debug, Clone, Default)]
pub struct DTableCsvLoader {
    current_chain: Option<DTableEntry>,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct RawDTableEntry {
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "CategoryOfSequences_en")]
    pub category_of_sequences_en: Option<String>,
    #[serde(rename = "FXY1")]
    pub fxy1: String,
    #[serde(rename = "Title_en")]
    pub title_en: Option<String>,
    #[serde(rename = "SubTitle_en")]
    pub subtitle_en: Option<String>,
    #[serde(rename = "FXY2")]
    pub fxy2: String,
    #[serde(rename = "ElementName_en")]
    pub element_name_en: Option<String>,
    #[serde(rename = "ElementDescription_en")]
    pub element_description_en: Option<String>,
    #[serde(rename = "Note_en")]
    pub note_en: Option<String>,
    #[serde(rename = "noteIDs")]
    pub note_ids: Option<String>,
    #[serde(rename = "Status")]
    pub status: Option<String>,
}

impl RawDTableEntry {
    /// One CSV row per chain member, the inverse of [`DTableCsvLoader`].
    pub fn rows(entry: &DTableEntry) -> Vec<RawDTableEntry> {
        entry
            .fxy_chain
            .iter()
            .map(|member| RawDTableEntry {
                category: entry.category.clone(),
                category_of_sequences_en: entry.category_of_sequences_en.clone(),
                fxy1: entry.fxy.to_string(),
                title_en: entry.title_en.clone(),
                subtitle_en: entry.subtitle_en.clone(),
                fxy2: member.to_string(),
                element_name_en: None,
                element_description_en: None,
                note_en: entry.note_en.clone(),
                note_ids: entry.note_ids.clone(),
                status: entry.status.clone(),
            })
            .collect()
    }
}

impl EntryLoader for DTableCsvLoader {
    type RawEntry = RawDTableEntry;
    type Output = DTableEntry;
    type TableType = DTable;

    fn process_entry(&mut self, raw: Self::RawEntry) -> anyhow::Result<Option<Self::Output>> {
        let fxy: FXY = raw.fxy1.parse()?;
        let member: FXY = raw.fxy2.parse()?;

        if let Some(current) = self.current_chain.as_mut() {
            if current.fxy == fxy {
                current.fxy_chain.push(member);
                return Ok(None);
            }
        }

        // A new sequence starts: hand back the finished one
        let finished = self.current_chain.replace(DTableEntry {
            fxy,
            fxy_chain: vec![member],
            category: raw.category,
            category_of_sequences_en: raw.category_of_sequences_en,
            title_en: raw.title_en,
            subtitle_en: raw.subtitle_en,
            note_en: raw.note_en,
            note_ids: raw.note_ids,
            status: raw.status,
        });

        Ok(finished)
    }

    fn finish(&mut self) -> anyhow::Result<Option<Self::Output>> {
        Ok(self.current_chain.take())
    }
}
