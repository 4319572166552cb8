pub mod import;
pub mod plot;
pub mod raw;
pub mod weather;

pub use raw::{RawIndex, RawTable};
