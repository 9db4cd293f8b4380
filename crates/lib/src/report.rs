//! The per-run report returned by the generator.

use crate::{context::ContextStrategy, filler::FillStrategy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a single prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PromptOutcome {
    /// The answer was written into the template.
    Filled { replacements: usize },
    /// An answer was received but the template has no such placeholder.
    NotInTemplate,
    /// A later section answered the same placeholder.
    Superseded { by_section: String },
    /// The assistant replied without any text.
    NoAnswer,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptReport {
    pub placeholder: String,
    #[serde(flatten)]
    pub outcome: PromptOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionStatus {
    Processed,
    Skipped { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionReport {
    pub name: String,
    #[serde(flatten)]
    pub status: SectionStatus,
    pub prompts: Vec<PromptReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub context_strategy: ContextStrategy,
    pub fill_strategy: FillStrategy,
    pub sections: Vec<SectionReport>,
}

impl GenerationReport {
    fn outcomes(&self) -> impl Iterator<Item = &PromptOutcome> {
        self.sections
            .iter()
            .flat_map(|s| s.prompts.iter().map(|p| &p.outcome))
    }

    /// Number of prompts whose answer ended up in the document.
    pub fn filled_count(&self) -> usize {
        self.outcomes()
            .filter(|o| matches!(o, PromptOutcome::Filled { .. }))
            .count()
    }

    /// Number of prompts that failed or came back without an answer.
    pub fn failed_count(&self) -> usize {
        self.outcomes()
            .filter(|o| matches!(o, PromptOutcome::Failed { .. } | PromptOutcome::NoAnswer))
            .count()
    }

    pub fn skipped_sections(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| matches!(s.status, SectionStatus::Skipped { .. }))
            .count()
    }

    /// A one-line human readable summary.
    pub fn summary(&self) -> String {
        let prompts: usize = self.sections.iter().map(|s| s.prompts.len()).sum();
        format!(
            "{} section(s), {} skipped; {} prompt(s): {} filled, {} without answer; took {}s",
            self.sections.len(),
            self.skipped_sections(),
            prompts,
            self.filled_count(),
            self.failed_count(),
            (self.finished_at - self.started_at).num_seconds()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> GenerationReport {
        let now = Utc::now();
        GenerationReport {
            started_at: now,
            finished_at: now,
            context_strategy: ContextStrategy::None,
            fill_strategy: FillStrategy::Run,
            sections: vec![
                SectionReport {
                    name: "A".into(),
                    status: SectionStatus::Processed,
                    prompts: vec![
                        PromptReport {
                            placeholder: "P1".into(),
                            outcome: PromptOutcome::Filled { replacements: 2 },
                        },
                        PromptReport {
                            placeholder: "P2".into(),
                            outcome: PromptOutcome::Failed {
                                error: "boom".into(),
                            },
                        },
                    ],
                },
                SectionReport {
                    name: "B".into(),
                    status: SectionStatus::Skipped {
                        error: "Sheet 'X' was not found".into(),
                    },
                    prompts: vec![],
                },
            ],
        }
    }

    #[test]
    fn test_counts() {
        let report = report();
        assert_eq!(report.filled_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_sections(), 1);
        assert!(report.summary().starts_with("2 section(s), 1 skipped; 2 prompt(s)"));
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(report()).unwrap();
        assert_eq!(
            value["sections"][0]["prompts"][0],
            json!({"placeholder": "P1", "outcome": "filled", "replacements": 2})
        );
        assert_eq!(value["sections"][1]["status"], "skipped");
        assert_eq!(value["context_strategy"], "none");
    }
}
