//! Analysis client — the two remote passes of an analysis run.
//!
//! `cleanup` turns extracted (or raw PDF) content into clean resume text.
//! `score` asks for the structured analysis and returns the raw reply; decoding
//! is the parser's job. Neither pass retries or keeps state between calls.

use std::sync::Arc;

use tracing::debug;

use crate::analysis::prompts::{
    JOB_DESCRIPTION_LABEL, OCR_CLEANUP_INSTRUCTION, PDF_TEXT_LAYER_HINT, SCORING_INSTRUCTION,
};
use crate::errors::AnalysisError;
use crate::extraction::ExtractedResume;
use crate::llm_client::prompts::{JSON_ONLY_INSTRUCTION, PLAIN_TEXT_ONLY_INSTRUCTION};
use crate::llm_client::{GenerateRequest, GenerativeModel, Part};

#[derive(Clone)]
pub struct AnalysisClient {
    model: Arc<dyn GenerativeModel>,
}

impl AnalysisClient {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// OCR/cleanup pass. PDFs travel as inline bytes, with the local text layer
    /// as a hint when one was recovered.
    pub async fn cleanup(&self, resume: &ExtractedResume) -> Result<String, AnalysisError> {
        let mut parts = Vec::with_capacity(3);

        match &resume.pdf {
            Some(bytes) => {
                parts.push(Part::InlineData {
                    mime_type: resume.media_type.mime().to_string(),
                    data: bytes.clone(),
                });
                if !resume.text.is_empty() {
                    parts.push(Part::Text(format!(
                        "{PDF_TEXT_LAYER_HINT}\n{}",
                        resume.text
                    )));
                }
            }
            None => parts.push(Part::Text(resume.text.clone())),
        }
        parts.push(Part::Text(format!(
            "{OCR_CLEANUP_INSTRUCTION}\n{PLAIN_TEXT_ONLY_INSTRUCTION}"
        )));

        let text = self
            .model
            .generate(&GenerateRequest::single_turn(parts))
            .await?;
        debug!("Cleanup pass returned {} chars", text.len());
        Ok(text.trim().to_string())
    }

    /// Structured-analysis pass. Returns the model's reply verbatim.
    pub async fn score(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<String, AnalysisError> {
        let parts = vec![
            Part::Text(resume_text.to_string()),
            Part::Text(format!("{JOB_DESCRIPTION_LABEL}\n{job_description}")),
            Part::Text(format!("{SCORING_INSTRUCTION}\n{JSON_ONLY_INSTRUCTION}")),
        ];

        let raw = self
            .model
            .generate(&GenerateRequest::single_turn(parts))
            .await?;
        debug!("Scoring pass returned {} chars", raw.len());
        Ok(raw)
    }
}
