//! # Report Generator
//!
//! The driver loop: prepare the context once, walk sections and prompts in
//! order, collect cleaned answers, then write them into the template.
//!
//! Answers are gathered into an answer sheet keyed by placeholder before the
//! template is touched. A placeholder answered by several sections keeps the
//! last answer, so the document always reflects the last write.

use crate::{
    catalog::CatalogSource,
    cleaner::remove_citations,
    context::{ContextSettings, PreparedContext, SourceDocument},
    errors::{AssistantError, GenerateError},
    filler::{fill_placeholder, FillStrategy},
    orchestrator::AnswerOrchestrator,
    poll::{CancelSignal, PollPolicy, Poller},
    providers::ai::AssistantApi,
    report::{GenerationReport, PromptOutcome, PromptReport, SectionReport, SectionStatus},
    types::Section,
};
use chrono::Utc;
use docx_rs::Docx;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Position of a prompt in the report: (section index, prompt index).
type Slot = (usize, usize);

struct Answer {
    text: String,
    slot: Slot,
}

/// Cleaned answers keyed by placeholder, remembering first-seen order.
#[derive(Default)]
struct AnswerSheet {
    order: Vec<String>,
    answers: HashMap<String, Answer>,
}

impl AnswerSheet {
    /// Records an answer, returning the slot of the answer it replaced.
    fn record(&mut self, placeholder: &str, text: String, slot: Slot) -> Option<Slot> {
        match self.answers.get_mut(placeholder) {
            Some(existing) => {
                let replaced = existing.slot;
                *existing = Answer { text, slot };
                Some(replaced)
            }
            None => {
                self.order.push(placeholder.to_string());
                self.answers
                    .insert(placeholder.to_string(), Answer { text, slot });
                None
            }
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &Answer)> {
        self.order
            .iter()
            .filter_map(|p| self.answers.get(p).map(|a| (p.as_str(), a)))
    }
}

/// Runs one generation over a set of sections.
#[derive(Clone)]
pub struct ReportGenerator {
    catalog: Arc<dyn CatalogSource>,
    api: Box<dyn AssistantApi>,
    sections: Vec<Section>,
    context: ContextSettings,
    fill_strategy: FillStrategy,
    poll_policy: PollPolicy,
}

impl ReportGenerator {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        api: Box<dyn AssistantApi>,
        sections: Vec<Section>,
    ) -> Self {
        Self {
            catalog,
            api,
            sections,
            context: ContextSettings::default(),
            fill_strategy: FillStrategy::default(),
            poll_policy: PollPolicy::default(),
        }
    }

    pub fn with_context(mut self, context: ContextSettings) -> Self {
        self.context = context;
        self
    }

    pub fn with_fill_strategy(mut self, fill_strategy: FillStrategy) -> Self {
        self.fill_strategy = fill_strategy;
        self
    }

    pub fn with_poll_policy(mut self, poll_policy: PollPolicy) -> Self {
        self.poll_policy = poll_policy;
        self
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Fills `template` with the answers to every configured prompt.
    ///
    /// Catalog failures skip their section and prompt failures skip their
    /// prompt; both are recorded in the returned report. Only a failure to
    /// prepare the context aborts the run, before any section is processed.
    #[instrument(skip_all, fields(catalog = %self.catalog.describe(), sections = self.sections.len()))]
    pub async fn generate(
        &self,
        template: &mut Docx,
        source: Option<&SourceDocument>,
        cancel: CancelSignal,
    ) -> Result<GenerationReport, GenerateError> {
        let started_at = Utc::now();
        let poller = Poller::new(self.poll_policy.clone(), cancel.clone());
        let context =
            PreparedContext::prepare(&self.context, source, self.api.as_ref(), &poller).await?;
        let orchestrator = AnswerOrchestrator::new(self.api.clone(), poller);

        let mut sheet = AnswerSheet::default();
        let mut sections = Vec::with_capacity(self.sections.len());

        for (section_index, section) in self.sections.iter().enumerate() {
            info!("Processing section: {}", section.name);
            let catalog = match self.catalog.load(section.sheets()) {
                Ok(catalog) => catalog,
                Err(e) => {
                    error!("Error processing prompts for {}: {e}", section.name);
                    sections.push(SectionReport {
                        name: section.name.clone(),
                        status: SectionStatus::Skipped {
                            error: e.to_string(),
                        },
                        prompts: Vec::new(),
                    });
                    continue;
                }
            };

            let mut prompts = Vec::with_capacity(catalog.entries.len());
            for (prompt_index, (placeholder, composed)) in catalog.composed().enumerate() {
                let outcome = if cancel.is_cancelled() {
                    PromptOutcome::Failed {
                        error: "Generation was cancelled".to_string(),
                    }
                } else {
                    info!("Processing prompt: {}", placeholder);
                    match orchestrator
                        .ask(&composed, &section.assistant_id, &context)
                        .await
                    {
                        Ok(Some(answer)) => {
                            let slot = (section_index, prompt_index);
                            let cleaned = remove_citations(&answer);
                            if let Some(replaced) = sheet.record(placeholder, cleaned, slot) {
                                supersede(
                                    &mut sections,
                                    &mut prompts,
                                    replaced,
                                    section_index,
                                    &section.name,
                                );
                            }
                            // Replaced by the fill outcome once the template is written.
                            PromptOutcome::NotInTemplate
                        }
                        Ok(None) => {
                            warn!("No textual answer for {}.", placeholder);
                            PromptOutcome::NoAnswer
                        }
                        Err(e) => {
                            report_prompt_error(placeholder, &e);
                            PromptOutcome::Failed {
                                error: e.to_string(),
                            }
                        }
                    }
                };
                prompts.push(PromptReport {
                    placeholder: placeholder.to_string(),
                    outcome,
                });
            }

            sections.push(SectionReport {
                name: section.name.clone(),
                status: SectionStatus::Processed,
                prompts,
            });
        }

        for (placeholder, answer) in sheet.iter() {
            let replacements =
                fill_placeholder(template, placeholder, &answer.text, self.fill_strategy);
            let (s, p) = answer.slot;
            let outcome = if replacements > 0 {
                PromptOutcome::Filled { replacements }
            } else {
                warn!("Placeholder {placeholder} does not occur in the template.");
                PromptOutcome::NotInTemplate
            };
            if let Some(prompt) = sections.get_mut(s).and_then(|sec| sec.prompts.get_mut(p)) {
                prompt.outcome = outcome;
            }
        }

        let report = GenerationReport {
            started_at,
            finished_at: Utc::now(),
            context_strategy: self.context.strategy,
            fill_strategy: self.fill_strategy,
            sections,
        };
        info!("Generation finished: {}", report.summary());
        Ok(report)
    }
}

/// Marks the prompt at `slot` as replaced by the current section. The slot may
/// belong to a finished section or to the one still being collected.
fn supersede(
    sections: &mut [SectionReport],
    current: &mut [PromptReport],
    (s, p): Slot,
    current_index: usize,
    by_section: &str,
) {
    let prompt = if s == current_index {
        current.get_mut(p)
    } else {
        sections.get_mut(s).and_then(|sec| sec.prompts.get_mut(p))
    };
    if let Some(prompt) = prompt {
        prompt.outcome = PromptOutcome::Superseded {
            by_section: by_section.to_string(),
        };
    }
}

fn report_prompt_error(placeholder: &str, err: &AssistantError) {
    match err {
        AssistantError::Cancelled { .. } => warn!("Prompt {placeholder} cancelled."),
        _ => error!("Error generating response for {placeholder}: {err}"),
    }
}
