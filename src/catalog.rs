//! Read models for browsing: listings, question detail, random audio.

use std::sync::Arc;

use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::domain::QuestionRecord;
use crate::error::AppResult;
use crate::layout;
use crate::ports::{BlobStore, RecordStore};

const RELATED_AUDIOS: usize = 5;

#[derive(Debug, Serialize)]
pub struct UploaderListing {
  pub problems: Vec<QuestionRecord>,
  /// Subset of `problems` whose HTML document is not stored yet.
  pub processing_problems: Vec<QuestionRecord>,
}

#[derive(Debug, Serialize)]
pub struct QuestionDetail {
  /// Empty record when the id is unknown to the metadata table.
  pub problem: QuestionRecord,
  pub html_content: Option<String>,
  pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AudioEntry {
  pub title: String,
  pub audio_url: String,
}

#[derive(Debug, Serialize)]
pub struct RelatedAudio {
  pub title: String,
  pub question_id: String,
}

#[derive(Debug, Serialize)]
pub struct AudioPage {
  pub audio: Option<AudioEntry>,
  pub html_content: Option<String>,
  pub related_audios: Vec<RelatedAudio>,
  pub error: Option<String>,
}

pub struct Catalog {
  pub blobs: Arc<dyn BlobStore>,
  pub records: Arc<dyn RecordStore>,
}

impl Catalog {
  pub async fn list_all(&self) -> AppResult<Vec<QuestionRecord>> {
    self.records.scan().await
  }

  #[instrument(level = "info", skip(self))]
  pub async fn list_uploaded_by(&self, uploader: &str) -> AppResult<UploaderListing> {
    let problems: Vec<QuestionRecord> = self
      .records
      .scan()
      .await?
      .into_iter()
      .filter(|r| r.uploaded_by == uploader)
      .collect();

    let mut processing_problems = Vec::new();
    for p in &problems {
      let stored = match self.blobs.exists(&layout::document_key(&p.question_id)).await {
        Ok(found) => found,
        Err(e) => {
          warn!(target: "storage", question_id = %p.question_id, error = %e, "Document check failed; treating as processing");
          false
        }
      };
      if !stored {
        processing_problems.push(p.clone());
      }
    }
    Ok(UploaderListing { problems, processing_problems })
  }

  #[instrument(level = "info", skip(self))]
  pub async fn detail(&self, question_id: &str) -> AppResult<QuestionDetail> {
    let problem = self.records.get(question_id).await?.unwrap_or_default();
    let html_content = self.blobs.fetch_text(&layout::document_key(question_id)).await;
    let error = html_content
      .is_none()
      .then(|| "Error: Unable to fetch the HTML file from S3.".to_string());
    Ok(QuestionDetail { problem, html_content, error })
  }

  #[instrument(level = "info", skip(self))]
  pub async fn random_audio(&self) -> AppResult<AudioPage> {
    let items = self.records.scan().await?;
    let (chosen, related) = {
      let mut rng = rand::thread_rng();
      let Some(chosen) = items.choose(&mut rng).cloned() else {
        return Ok(AudioPage {
          audio: None,
          html_content: None,
          related_audios: Vec::new(),
          error: Some("No audio books found".into()),
        });
      };
      let others: Vec<&QuestionRecord> = items.iter().filter(|r| r.question_id != chosen.question_id).collect();
      let related: Vec<RelatedAudio> = others
        .choose_multiple(&mut rng, RELATED_AUDIOS)
        .map(|r| RelatedAudio { title: r.title.clone(), question_id: r.question_id.clone() })
        .collect();
      (chosen, related)
    };

    let html_content = self.blobs.fetch_text(&layout::document_key(&chosen.question_id)).await;
    Ok(AudioPage {
      audio: Some(AudioEntry {
        title: chosen.title.clone(),
        audio_url: self.blobs.public_url(&layout::audio_key(&chosen.question_id)),
      }),
      html_content,
      related_audios: related,
      error: None,
    })
  }
}
