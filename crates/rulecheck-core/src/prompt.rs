//! Prompt construction for rule checks.
//!
//! The prompt is plain instruction text: nothing is escaped. Each page is
//! rendered as a labeled block so the model can cite page numbers, and a
//! fixed footer restates the rule and the answer format.

use crate::page::PageStore;

/// System prompt shared by every rule check.
///
/// Frames the model as an evaluator of a single rule that must answer in
/// strict JSON and quote evidence in the same form the verifier rewrites to.
pub const SYSTEM_PROMPT: &str = "You are an assistant that evaluates whether a document satisfies a single rule. \
Always answer in strict JSON with the keys: rule, status (pass/fail), evidence, reasoning, confidence. \
Evidence should be a short quoted sentence and the page number, e.g. \"Found in page 2: 'Published 2024'\". \
Return confidence as a number between 0 and 100. Do not include extra commentary outside the JSON.";

const PROMPT_HEADER: &str = "Document pages below.";

/// Render one page block.
fn page_block(page: u32, text: &str) -> String {
    format!("[PAGE {}]:\n{}", page, text)
}

/// Build the instruction string for checking `rule` against `pages`.
///
/// Deterministic: same pages and rule always produce the same prompt.
pub fn build_prompt(pages: &PageStore, rule: &str) -> String {
    let document = pages
        .iter()
        .map(|p| page_block(p.page, &p.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{header}\n\n{document}\n\n\
         Check the following rule EXACTLY: \"{rule}\"\n\
         Output a single JSON object with keys: rule, status (pass or fail), \
         evidence (exact sentence + page), reasoning (1-2 sentences), confidence (0-100). \
         If you quote text as evidence, ensure it appears verbatim in the document.",
        header = PROMPT_HEADER,
        document = document,
        rule = rule,
    )
}
