pub mod document_store;
pub mod history;
pub mod page_range;

pub use document_store::DocumentStore;
pub use history::{HistoryAvailability, HistoryEntry, UndoRedoEngine};
pub use page_range::PageRangeParser;
