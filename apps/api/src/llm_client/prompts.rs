// Shared prompt fragments.
// Each module that calls the model defines its own prompts.rs alongside it;
// this file holds the cross-cutting pieces.

/// System prompt for plain comma-separated list output.
pub const LIST_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    Respond with a single comma-separated list and nothing else. \
    Do NOT number the items, do NOT add headings, explanations or quotes.";
