pub mod bits;
pub mod block;
pub mod bufr;
pub mod config;
pub mod decoder;
pub mod errors;
pub mod expander;
pub mod parser;
pub mod structs;
pub mod table_path;
pub mod tables;

pub use crate::bufr::Bufr;
pub use crate::decoder::{Decoder, DecoderState, ExtractedData, Value};
pub use crate::errors::{Error, Result};
pub use crate::parser::*;
pub use crate::table_path::{
    configured_tables_base_path, discover_tables_base_path, set_tables_base_path,
};
pub use crate::tables::{TableLoader, Tables};
pub use genlib::FXY;
