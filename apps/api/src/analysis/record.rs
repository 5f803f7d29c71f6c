use serde::{Deserialize, Serialize};

use crate::errors::AnalysisError;

/// Upper bound of every score and rating.
pub const MAX_SCORE: u32 = 100;

/// Structured feedback for one resume against one job description.
///
/// Field names are the wire names the scoring prompt asks for; do not rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(rename = "ATS_score")]
    pub ats_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues_count: Option<u32>,
    pub issues: Vec<String>,
    pub content_rating: u32,
    pub content_feedback: Vec<String>,
    pub formatting_rating: u32,
    pub formatting_feedback: Vec<String>,
    pub grammar_rating: u32,
    pub grammar_feedback: Vec<String>,
    pub skills_rating: u32,
    pub skills_feedback: Vec<String>,
    pub style_rating: u32,
    pub style_feedback: Vec<String>,
    pub matching_percentage: u32,
    pub job_description_analysis: JobDescriptionAnalysis,
    pub missing_keywords: MissingKeywords,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptionAnalysis {
    pub key_strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub suggestions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingKeywords {
    pub hard_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub certifications: Vec<String>,
    pub tools_technologies: Vec<String>,
    pub total_missing_keywords: u32,
}

impl MissingKeywords {
    /// Sum of the four keyword groups.
    pub fn counted_total(&self) -> u32 {
        (self.hard_skills.len()
            + self.soft_skills.len()
            + self.certifications.len()
            + self.tools_technologies.len()) as u32
    }
}

/// A recoverable inconsistency in an otherwise valid record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaWarning {
    /// `total_missing_keywords` disagreed with the group sizes; the record now carries `actual`.
    KeywordTotalMismatch { reported: u32, actual: u32 },
    /// `issues_count` disagrees with the length of `issues`. Left as reported.
    IssuesCountMismatch { reported: u32, actual: u32 },
}

impl AnalysisRecord {
    pub fn ratings(&self) -> [(&'static str, u32); 7] {
        [
            ("ATS_score", self.ats_score),
            ("content_rating", self.content_rating),
            ("formatting_rating", self.formatting_rating),
            ("grammar_rating", self.grammar_rating),
            ("skills_rating", self.skills_rating),
            ("style_rating", self.style_rating),
            ("matching_percentage", self.matching_percentage),
        ]
    }

    /// Enforces the record contract.
    ///
    /// Out-of-range ratings are a hard `SchemaViolation`. Count inconsistencies are
    /// reported as warnings; the keyword total is corrected so that it always equals
    /// the sum of its groups.
    pub fn validate(&mut self) -> Result<Vec<SchemaWarning>, AnalysisError> {
        let out_of_range: Vec<String> = self
            .ratings()
            .iter()
            .filter(|(_, value)| *value > MAX_SCORE)
            .map(|(name, value)| format!("{name}={value}"))
            .collect();

        if !out_of_range.is_empty() {
            return Err(AnalysisError::SchemaViolation(format!(
                "values outside 0-{MAX_SCORE}: {}",
                out_of_range.join(", ")
            )));
        }

        let mut warnings = Vec::new();

        let actual = self.missing_keywords.counted_total();
        let reported = self.missing_keywords.total_missing_keywords;
        if reported != actual {
            warnings.push(SchemaWarning::KeywordTotalMismatch { reported, actual });
            self.missing_keywords.total_missing_keywords = actual;
        }

        if let Some(reported) = self.issues_count {
            let actual = self.issues.len() as u32;
            if reported != actual {
                warnings.push(SchemaWarning::IssuesCountMismatch { reported, actual });
            }
        }

        Ok(warnings)
    }
}
