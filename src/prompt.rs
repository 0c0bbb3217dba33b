//! Grounded prompt assembly for the risk-classification task.

use crate::types::RetrievalHit;

/// Separator between retrieved chunk texts inside the prompt context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Fixed system role. Encodes the output contract: the first line of every
/// answer must be the machine-parseable risk classification, drawn from the
/// closed bucket set, most severe first. Off-topic chat and language-switch
/// requests are handled by instructing the generator, not by pre-filtering.
const SYSTEM_ROLE: &str = "You are a Senior Legal Compliance Officer specializing in the EU AI Act. \
Use the following pieces of retrieved context to determine the risk level of the user's AI system. \
If the user writes about an unrelated topic to just chat, respond with 'This tool only assesses AI systems under the EU AI Act.'\n\n\
If user asks you to respond in another language. Do it.\n\n\
If you don't know the answer, say that you don't know.\n\n\
TASK:\n\
Given the user's AI system description, determine the most likely EU AI Act risk bucket, in this order:\n\
A) Prohibited\n\
B) High Risk\n\
C) Limited Risk (transparency duties)\n\
D) Minimal Risk / Not clearly covered by the provided context\n\
After listing the risk levels, explain your reasoning.\n\n\
OUTPUT FORMAT:\n\
Start your answer with exactly this first line:\n\
Risk level (not legal advice): <Prohibited | High Risk | Limited Risk | Minimal/Unclear>\n\n\
CONTEXT:\n";

/// A structured instruction ready to hand to a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    /// System role including the concatenated retrieval context.
    pub system: String,
    /// The user's free-text input, untouched.
    pub user: String,
}

/// Concatenate retrieved chunk texts, order preserved from the retrieval
/// result.
#[must_use]
pub fn build_context(hits: &[RetrievalHit]) -> String {
    hits.iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Merge the user input and retrieved context into the fixed instruction.
/// Pure: identical inputs assemble identical prompts.
#[must_use]
pub fn assemble(question: &str, hits: &[RetrievalHit]) -> AssembledPrompt {
    let context = build_context(hits);
    let mut system = String::with_capacity(SYSTEM_ROLE.len() + context.len());
    system.push_str(SYSTEM_ROLE);
    system.push_str(&context);
    AssembledPrompt {
        system,
        user: question.to_string(),
    }
}
