pub mod cancel;
pub mod classify; // Medical vs non-medical gate
pub mod extraction;
pub mod import;
pub mod processor; // Batch orchestration: extract → classify → interpret → act → score

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use processor::{DocumentProcessor, FileReport, HealthAnalysis};
