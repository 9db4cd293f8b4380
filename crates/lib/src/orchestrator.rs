//! # Answer Orchestrator
//!
//! Asks one question per isolated thread: post the composed prompt, run the
//! section's assistant, wait for the run, and read back the newest textual answer.

use crate::{
    context::PreparedContext,
    errors::AssistantError,
    poll::{Poller, Probe},
    providers::ai::{AssistantApi, ContentBlock, ThreadMessage},
};
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct AnswerOrchestrator {
    api: Box<dyn AssistantApi>,
    poller: Poller,
}

impl AnswerOrchestrator {
    pub fn new(api: Box<dyn AssistantApi>, poller: Poller) -> Self {
        Self { api, poller }
    }

    /// Sends `prompt` to `assistant_id` and returns its answer, or `None` when the
    /// thread holds no textual assistant reply.
    #[instrument(skip(self, prompt, context))]
    pub async fn ask(
        &self,
        prompt: &str,
        assistant_id: &str,
        context: &PreparedContext,
    ) -> Result<Option<String>, AssistantError> {
        let resources = context.tool_resources();
        let thread_id = self.api.create_thread(resources.as_ref()).await?;
        self.api
            .add_user_message(&thread_id, &context.message(prompt))
            .await?;

        let run = self.api.start_run(&thread_id, assistant_id).await?;
        debug!(thread_id = %thread_id, run_id = %run.id, status = run.status.as_str(), "Run started.");

        match run.probe() {
            Probe::Done => {}
            Probe::Failed { status, detail } => {
                return Err(AssistantError::RunFailed {
                    id: run.id,
                    status,
                    detail,
                })
            }
            Probe::Pending => {
                let api = self.api.as_ref();
                let thread_id = thread_id.as_str();
                let run_id = run.id.as_str();
                self.poller
                    .wait(run_id, || async move {
                        Ok::<_, AssistantError>(api.run_status(thread_id, run_id).await?.probe())
                    })
                    .await?;
            }
        }

        let messages = self.api.list_messages(&thread_id).await?;
        Ok(extract_answer(&messages))
    }
}

/// Picks the answer from a thread listed newest first: the first text block of
/// the most recent assistant message that has non-empty text.
pub fn extract_answer(messages: &[ThreadMessage]) -> Option<String> {
    messages
        .iter()
        .filter(|m| m.is_assistant())
        .filter_map(first_text)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn first_text(message: &ThreadMessage) -> Option<&str> {
    message.content.iter().find_map(|block| match block {
        ContentBlock::Text { text } => Some(text.value.as_str()),
        ContentBlock::Other => None,
    })
}
