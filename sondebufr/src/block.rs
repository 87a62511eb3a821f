use std::ops::Deref;

use crate::decoder::ExtractedData;
use crate::structs::MessageHeader;
use crate::tables::Tables;
use genlib::FXY;

/// One decoded message of a file.
#[derive(Debug, Clone)]
pub struct MessageBlock {
    header: MessageHeader,
    data: Vec<ExtractedData>,
}

impl std::fmt::Display for MessageBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.header)
    }
}

impl Deref for MessageBlock {
    type Target = MessageHeader;

    fn deref(&self) -> &Self::Target {
        &self.header
    }
}

impl MessageBlock {
    pub fn new(header: MessageHeader, data: Vec<ExtractedData>) -> Self {
        MessageBlock { header, data }
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    pub fn data(&self) -> &[ExtractedData] {
        &self.data
    }

    /// Every occurrence of `descriptor`, in message order.
    pub fn find(&self, descriptor: FXY) -> impl Iterator<Item = &ExtractedData> {
        self.data.iter().filter(move |d| d.descriptor == descriptor)
    }

    /// The occurrence of `descriptor` holding the most values; the last one
    /// wins a tie.
    pub fn longest(&self, descriptor: FXY) -> Option<&ExtractedData> {
        self.find(descriptor).max_by_key(|d| d.len())
    }

    pub fn records(&self, tables: &Tables) -> String {
        let mut out = String::new();
        for record in &self.data {
            let entry = tables.lookup_b(&record.descriptor);
            out.push_str(&format!("{} {}\n", record.descriptor, record.display_with(entry)));
        }
        out
    }
}

#[derive(Debug, Default)]
pub struct BUFRFile {
    messages: Vec<MessageBlock>,
}

impl BUFRFile {
    pub fn new() -> Self {
        BUFRFile {
            messages: Vec::new(),
        }
    }

    pub(crate) fn push_message(&mut self, message: MessageBlock) {
        self.messages.push(message);
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn message_at(&self, index: usize) -> Option<&MessageBlock> {
        self.messages.get(index)
    }

    pub fn messages(&self) -> &[MessageBlock] {
        &self.messages
    }
}
