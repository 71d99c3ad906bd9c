pub mod document;
pub mod event;

pub use document::{
    ContentPatch, Criterion, Document, DocumentContent, DocumentMeta, DocumentView, ExportArtifact,
    ExtractedContent, ProcessingStatus, Question, Snapshot, SourceFile, UploadType,
    CURRENT_SCHEMA_VERSION,
};
pub use event::{Event, EventKind, Intent, Notice, NoticeLevel};
