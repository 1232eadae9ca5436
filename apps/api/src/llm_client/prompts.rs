// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with a single valid JSON object. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to every prompt that estimates money figures.
pub const ESTIMATE_DISCLAIMER: &str = "\
    All numbers are estimates. Use whole numbers only, no currency symbols or \
    thousands separators inside JSON values. If you cannot estimate a value, \
    omit the field rather than inventing precision.";
