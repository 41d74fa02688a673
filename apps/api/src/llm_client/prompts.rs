// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Common instruction appended to every coaching persona.
pub const GROUNDING_INSTRUCTION: &str = "\
    Base every observation on the user's data provided in the context. \
    Do NOT invent applications, contacts, sessions, or numbers that are not there. \
    If a section says None, say the user has not logged anything there yet.";
