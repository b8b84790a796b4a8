pub mod memory;
pub mod paired;

pub use memory::MemorySelectionStore;
pub use paired::PairedSelectionStore;
