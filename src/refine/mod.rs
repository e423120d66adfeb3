//! Bio refinement: free-text traits in, bio text out.

use async_trait::async_trait;

mod gemini;

pub use gemini::GeminiRefiner;

pub const MAX_TRAITS_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("generation service returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("generation service returned no text")]
    EmptyResponse,
    #[error("generation service is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait BioRefiner: Send + Sync {
    /// One outbound call, no retry.
    async fn refine(&self, traits: &str) -> Result<String, GenerationError>;
}

/// Public bios share one typographic register: trimmed, upper case.
pub fn normalize_bio(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_uppercase()
}

pub(crate) fn build_prompt(traits: &str) -> String {
    format!(
        "Write a short, punchy bio for a personal link-in-bio page. \
         Keep it under 150 characters, a single sentence, no hashtags, no emojis, \
         no surrounding quotes. The person describes their vibe as: {traits}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_upper_cases_and_trims() {
        assert_eq!(normalize_bio("  building quiet tools\n"), "BUILDING QUIET TOOLS");
        assert_eq!(normalize_bio("\"quoted vibe\""), "QUOTED VIBE");
        assert_eq!(normalize_bio("straße"), "STRASSE");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_bio("Neon dreams & late-night code");
        assert_eq!(normalize_bio(&once), once);
    }

    #[test]
    fn prompt_embeds_traits() {
        let prompt = build_prompt("calm, curious");
        assert!(prompt.ends_with("calm, curious"));
    }
}
