pub mod filter;
pub mod selection;
