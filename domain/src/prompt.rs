//! Prompt template with exactly two slots, `{context}` and `{question}`.
//!
//! The template is split into literal segments once at startup. Rendering
//! concatenates segments and values in a single pass, so placeholder syntax
//! that happens to appear inside a retrieved chunk or the question is copied
//! through untouched.

use shared::types::{AppError, Result};

pub const CONTEXT_PLACEHOLDER: &str = "{context}";
pub const QUESTION_PLACEHOLDER: &str = "{question}";

pub const DEFAULT_TEMPLATE: &str = "Answer the question based only on the following context:

{context}

---

Answer the question based on the above context: {question}";

/// Values substituted into the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptInputs<'a> {
    pub context: &'a str,
    pub question: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Context,
    Question,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    head: String,
    first: Slot,
    middle: String,
    second: Slot,
    tail: String,
}

impl PromptTemplate {
    /// Splits `text` around its two placeholders. Each must occur exactly once.
    pub fn parse(text: &str) -> Result<Self> {
        let context_at = single_occurrence(text, CONTEXT_PLACEHOLDER)?;
        let question_at = single_occurrence(text, QUESTION_PLACEHOLDER)?;

        let (first, first_at, first_len, second, second_at, second_len) =
            if context_at < question_at {
                (
                    Slot::Context,
                    context_at,
                    CONTEXT_PLACEHOLDER.len(),
                    Slot::Question,
                    question_at,
                    QUESTION_PLACEHOLDER.len(),
                )
            } else {
                (
                    Slot::Question,
                    question_at,
                    QUESTION_PLACEHOLDER.len(),
                    Slot::Context,
                    context_at,
                    CONTEXT_PLACEHOLDER.len(),
                )
            };

        Ok(Self {
            head: text[..first_at].to_string(),
            first,
            middle: text[first_at + first_len..second_at].to_string(),
            second,
            tail: text[second_at + second_len..].to_string(),
        })
    }

    pub fn render(&self, inputs: &PromptInputs<'_>) -> String {
        let value = |slot: Slot| match slot {
            Slot::Context => inputs.context,
            Slot::Question => inputs.question,
        };
        let first = value(self.first);
        let second = value(self.second);

        let mut out = String::with_capacity(
            self.head.len()
                + first.len()
                + self.middle.len()
                + second.len()
                + self.tail.len(),
        );
        out.push_str(&self.head);
        out.push_str(first);
        out.push_str(&self.middle);
        out.push_str(second);
        out.push_str(&self.tail);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            head: "Answer the question based only on the following context:\n\n".to_string(),
            first: Slot::Context,
            middle: "\n\n---\n\nAnswer the question based on the above context: ".to_string(),
            second: Slot::Question,
            tail: String::new(),
        }
    }
}

fn single_occurrence(text: &str, placeholder: &str) -> Result<usize> {
    let mut matches = text.match_indices(placeholder).map(|(i, _)| i);
    let Some(at) = matches.next() else {
        return Err(AppError::template(format!("missing {placeholder} placeholder")));
    };
    if matches.next().is_some() {
        return Err(AppError::template(format!(
            "{placeholder} placeholder appears more than once"
        )));
    }
    Ok(at)
}
