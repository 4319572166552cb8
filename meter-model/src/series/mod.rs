pub mod axis;
pub mod column;
pub mod index;
