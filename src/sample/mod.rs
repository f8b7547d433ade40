//! Sample module: turning raw channel arrays into typed records
//!
//! - `ColumnMapper`: binds a channel header and labels positional samples
//! - `FacialSample` / `CommandSample`: typed views over labeled samples

mod mapper;
mod records;

pub use mapper::{ColumnMapper, LabeledSample};
pub use records::{CommandSample, FacialSample, COMMAND_COLUMNS, FACIAL_COLUMNS};
