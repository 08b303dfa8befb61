//! Application state shared by the HTTP handlers.
//!
//! Every client is built once in `main` and handed in here; handlers never construct
//! their own. Tests assemble the same struct from the in-memory fakes.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::Settings;
use crate::grading::Grader;
use crate::jobs::JobQueue;
use crate::ports::{AttachmentSink, BlobStore, Judge, RecordStore};

pub struct AppState {
    pub settings: Settings,
    pub catalog: Catalog,
    pub grader: Grader,
    pub attachments: Arc<dyn AttachmentSink>,
    pub jobs: JobQueue,
}

impl AppState {
    pub fn new(
        settings: Settings,
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
        judge: Arc<dyn Judge>,
        attachments: Arc<dyn AttachmentSink>,
        jobs: JobQueue,
    ) -> Self {
        let grader = Grader {
            judge,
            blobs: blobs.clone(),
            records: records.clone(),
            test_case_count: settings.test_case_count,
        };
        Self { catalog: Catalog { blobs, records }, grader, attachments, jobs, settings }
    }
}
