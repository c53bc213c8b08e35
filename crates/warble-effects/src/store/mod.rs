//! Document store handlers

pub mod memory;

pub use memory::MemoryDocumentStore;
