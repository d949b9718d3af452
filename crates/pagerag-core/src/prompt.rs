//! Two-part chat prompt template.
//!
//! A [`PromptTemplate`] holds a system message and a human message, each of
//! which may contain the slots `{context}` and `{question}`. Rendering fills
//! both slots in a single left-to-right pass (so a retrieved chunk that
//! happens to contain `{question}` is never substituted again) and joins the
//! parts as role-prefixed lines:
//!
//! ```text
//! System: <system text>
//! Human: <human text>
//! ```
//!
//! Any other brace group is left as is, which keeps LaTeX in instructions
//! intact.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

pub const CONTEXT_SLOT: &str = "{context}";
pub const QUESTION_SLOT: &str = "{question}";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a middle school math teacher. \
Your task is to respond to 6th graders' doubts from their curriculum. \
You should have an encouraging and polite attitude to the students.\
You should use the data in the vector database to find the most relevant portions to explain them the concepts.\
Before starting the response, translate the students' question into a title. \
Then, solve the {question} and format it into step-by-step explanations abiding to pedagogical standards for a 6th grader. \
Include all steps to reach the answer without skipping any. Use standard approaches.\
After the explanation for the question, you should give two different examples of different difficulty levels. \
The first example should be a direct and easy one, and the second should invoke some reasoning in the student.\
Finally, provide a third example without solution that covers all the topics from the explanation for the student to solve. \
Provide the answer as a hint. Ensure all the mathematical equations are LaTeX-formatted throughout the response.";

pub const DEFAULT_HUMAN_PROMPT: &str =
    "Answer the question based on the following context: {context} Question: {question}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub human: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            human: DEFAULT_HUMAN_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Build a template, rejecting one whose parts never mention `{question}`.
    pub fn new(system: impl Into<String>, human: impl Into<String>) -> Result<Self> {
        let template = Self {
            system: system.into(),
            human: human.into(),
        };
        template.validate()?;
        Ok(template)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.system.contains(QUESTION_SLOT) && !self.human.contains(QUESTION_SLOT) {
            return Err(RagError::InvalidTemplate(format!(
                "neither message contains {}",
                QUESTION_SLOT
            )));
        }
        Ok(())
    }

    /// Resolve both slots and join the messages into the final prompt.
    ///
    /// ```rust
    /// use pagerag_core::prompt::PromptTemplate;
    ///
    /// let t = PromptTemplate::new("Be brief.", "Context: {context} Q: {question}").unwrap();
    /// assert_eq!(
    ///     t.render("c1", "why?"),
    ///     "System: Be brief.\nHuman: Context: c1 Q: why?"
    /// );
    /// ```
    pub fn render(&self, context: &str, question: &str) -> String {
        format!(
            "System: {}\nHuman: {}",
            fill(&self.system, context, question),
            fill(&self.human, context, question)
        )
    }
}

fn fill(template: &str, context: &str, question: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        if let Some(after) = tail.strip_prefix(CONTEXT_SLOT) {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(QUESTION_SLOT) {
            out.push_str(question);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
