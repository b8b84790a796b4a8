pub mod common;
pub mod filter;
pub mod selection;
