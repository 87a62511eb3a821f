use crate::tables::BTable;
use crate::tables::DTable;
pub use crate::wmo;
pub type BUFRTableD = crate::BUFRTable<DTable>;
pub type BUFRTableB = crate::BUFRTable<BTable>;
pub use crate::BUFRTable;
pub use crate::FXY;
pub use crate::TableType;
pub use crate::tables::{BTableEntry, DTableEntry};
