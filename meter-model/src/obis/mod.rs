pub mod catalog;
pub mod units;
