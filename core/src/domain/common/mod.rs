pub mod entities;

pub use entities::ListFilterError;
