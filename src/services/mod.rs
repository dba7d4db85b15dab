//! Service layer separating payload conversion from image logic

pub mod io;

pub use io::{ImageIOService, PNG_DATA_URI_PREFIX, PRINT_DPI};
