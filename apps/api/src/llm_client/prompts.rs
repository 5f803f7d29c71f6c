// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Appended to prompts whose response is decoded as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "\
Remember: 
- All output must be in valid JSON format
- All arrays must be properly formatted, even if empty
- All string values must be properly escaped
- All numeric values must be integers within specified ranges";

/// Appended to prompts whose response is used verbatim as text.
pub const PLAIN_TEXT_ONLY_INSTRUCTION: &str = "\
Return only the requested text. Do NOT add headings, markdown, commentary, or explanations.";
