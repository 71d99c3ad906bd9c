pub mod backend_client;
pub mod memory_backend;
pub mod slicer_client;

pub use backend_client::{DocumentBackend, HttpDocumentBackend};
pub use memory_backend::InMemoryBackend;
pub use slicer_client::{HttpPdfSlicer, PdfSlicer};
