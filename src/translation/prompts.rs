/*!
 * Prompt templates for chunk translation.
 *
 * Every request carries two messages: a system message establishing the
 * translator persona and the job context, and a user message holding the
 * source chunk plus the instruction to return the translation only.
 */

use crate::providers::ChatMessage;

/// Pair of system and task templates
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: String,
    task: String,
}

impl PromptTemplate {
    /// Default persona/context instruction.
    /// Placeholders: `{context}`, `{target_language}`
    pub const DEFAULT_SYSTEM: &'static str = r#"You are a professional translator who renders documents into fluent, natural {target_language}.

Background on the document you are translating:
{context}

Keep terminology consistent with this background. Preserve paragraph breaks, lists and numbers exactly."#;

    /// Default task instruction.
    /// Placeholders: `{text}`, `{target_language}`
    pub const DEFAULT_TASK: &'static str = r#"Translate the following text into natural {target_language}. Return only the translation, with no explanations, notes or quotation marks.

Source text:
{text}"#;

    pub fn new(system: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            task: task.into(),
        }
    }

    /// Render the persona message for a job
    pub fn render_system(&self, context: &str, target_language: &str) -> String {
        self.system
            .replace("{target_language}", target_language)
            .replace("{context}", context.trim())
    }

    /// Render the task message for one chunk
    ///
    /// `{text}` is substituted last so placeholders inside the source text
    /// are left alone.
    pub fn render_task(&self, text: &str, target_language: &str) -> String {
        self.task
            .replace("{target_language}", target_language)
            .replace("{text}", text)
    }

    /// Build the message list sent to the backend
    pub fn messages(&self, text: &str, context: &str, target_language: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.render_system(context, target_language)),
            ChatMessage::user(self.render_task(text, target_language)),
        ]
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SYSTEM, Self::DEFAULT_TASK)
    }
}
