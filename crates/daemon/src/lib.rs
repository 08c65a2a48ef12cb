mod domains;
mod error;
mod http;
mod page_cache;
pub mod records;
mod session;
mod utils;
mod zone;

pub use domains::*;
pub use error::*;
pub use http::*;
pub use page_cache::*;
pub use records::{extract_records, table_records, Record, TITLE_ROWS};
pub use session::*;
pub use utils::*;
pub use zone::*;
