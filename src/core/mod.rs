pub mod assistant;
pub mod dashboard;
pub mod dates;
pub mod detector;
pub mod importer;
pub mod normalizer;
pub mod records;
pub mod users;
pub mod workbook;

pub use crate::domain::model::{Category, Operator, RawRow, Record, SelectQuery, Table};
pub use crate::domain::ports::{ChatClient, ConfigProvider, RecordStore, SessionProvider, Storage};
pub use crate::utils::error::Result;
