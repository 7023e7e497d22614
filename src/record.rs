//! Case record schema and the combined document fed to the record extractor.
//!
//! A [`CaseRecord`] is one row of the output table: free-text fields a model
//! fills from the combined markdown, plus identifier fields this crate
//! resolves afterwards (see [`crate::enrich`]).

use crate::error::ExtractError;
use crate::tables::{tables_appendix, ExtractedTable};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder a model may leave in fields it could not fill.
pub const PLACEHOLDER: &str = "…";

/// Marker prefixed to documents that passed the case-report check.
pub const CASE_REPORT_BANNER: &str = "**[This document is a CASE REPORT]**";

/// Notice placed between the main text and the full-table appendix.
pub const TABLES_NOTICE: &str = "---\n\
**NOTE to the language-model:**  \n\
Some tables in the text above may be incomplete; the full versions\n\
extracted directly from the PDF are reproduced in a more complete manner below.\n\
---";

/// One extracted case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(rename = "Case_description", default, deserialize_with = "text")]
    pub case_description: String,
    #[serde(rename = "Genetic_validation", default, deserialize_with = "text")]
    pub genetic_validation: String,
    #[serde(rename = "Responsible_gene", default, deserialize_with = "text")]
    pub responsible_gene: String,
    #[serde(rename = "Underlying_disease", default, deserialize_with = "text")]
    pub underlying_disease: String,
    #[serde(rename = "OMIM", default, deserialize_with = "text")]
    pub omim: String,
    #[serde(rename = "OrphaNet", default, deserialize_with = "text")]
    pub orphanet: String,
    #[serde(rename = "Reference_title", default, deserialize_with = "text")]
    pub reference_title: String,
    #[serde(rename = "PubMed_ID", default, deserialize_with = "text")]
    pub pubmed_id: String,
    #[serde(rename = "Single-patient case report", default, deserialize_with = "text")]
    pub single_patient: String,
    #[serde(rename = "Source_file", default, deserialize_with = "text")]
    pub source_file: String,
}

impl CaseRecord {
    /// Output column order.
    pub const COLUMNS: [&'static str; 10] = [
        "Case_description",
        "Genetic_validation",
        "Responsible_gene",
        "Underlying_disease",
        "OMIM",
        "OrphaNet",
        "Reference_title",
        "PubMed_ID",
        "Single-patient case report",
        "Source_file",
    ];

    /// `(column, guidance)` pairs describing what each field holds.
    pub fn descriptors() -> [(&'static str, &'static str); 10] {
        [
            (
                "Case_description",
                "Patient/case description without figures/tables, no genetics, no disease name.",
            ),
            ("Genetic_validation", "Does the paper report genetic validation? (yes/no)."),
            ("Responsible_gene", "Gene symbol as written in the paper."),
            ("Underlying_disease", "Disease name as written in the paper."),
            ("OMIM", "Leave blank; resolved from the underlying disease."),
            ("OrphaNet", "Leave blank; resolved from the underlying disease."),
            ("Reference_title", "Paper title."),
            ("PubMed_ID", "Leave blank; resolved from the title via PubMed."),
            ("Single-patient case report", "Is it a single-patient report? (yes/no)."),
            ("Source_file", "Original PDF filename (set by the pipeline, not the model)."),
        ]
    }

    /// Values in [`Self::COLUMNS`] order.
    pub fn values(&self) -> [&str; 10] {
        [
            self.case_description.as_str(),
            self.genetic_validation.as_str(),
            self.responsible_gene.as_str(),
            self.underlying_disease.as_str(),
            self.omim.as_str(),
            self.orphanet.as_str(),
            self.reference_title.as_str(),
            self.pubmed_id.as_str(),
            self.single_patient.as_str(),
            self.source_file.as_str(),
        ]
    }

    /// Trim every field and blank any left-over placeholder.
    pub fn sanitize(&mut self) {
        for field in self.fields_mut() {
            let trimmed = field.trim();
            *field = if trimmed == PLACEHOLDER {
                String::new()
            } else {
                trimmed.to_string()
            };
        }
    }

    fn fields_mut(&mut self) -> [&mut String; 10] {
        [
            &mut self.case_description,
            &mut self.genetic_validation,
            &mut self.responsible_gene,
            &mut self.underlying_disease,
            &mut self.omim,
            &mut self.orphanet,
            &mut self.reference_title,
            &mut self.pubmed_id,
            &mut self.single_patient,
            &mut self.source_file,
        ]
    }
}

/// Strings pass through; `null` becomes `""`; numbers and booleans are
/// rendered as text (models sometimes emit `"PubMed_ID": 12345`).
fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => (if b { "yes" } else { "no" }).to_string(),
        other => other.to_string(),
    })
}

/// Whether the converted main text mentions a case report.
pub fn is_case_report(main_markdown: &str) -> bool {
    main_markdown.to_lowercase().contains("case report")
}

/// Assemble the document handed to the record extractor.
///
/// Layout: banner, main text, notice, then one `**Full Table i**` block per
/// table. Fails with [`ExtractError::NotACaseReport`] when the main text
/// never mentions a case report.
pub fn combined_markdown(
    main_markdown: &str,
    tables: &[ExtractedTable],
) -> Result<String, ExtractError> {
    if !is_case_report(main_markdown) {
        return Err(ExtractError::NotACaseReport);
    }
    Ok(format!(
        "{CASE_REPORT_BANNER}\n\n{main_markdown}\n\n{TABLES_NOTICE}{}",
        tables_appendix(tables)
    ))
}
