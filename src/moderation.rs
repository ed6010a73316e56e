//! Toxicity verdicts from the moderation prompt
//!
//! The model is asked for strict JSON; anything unparseable degrades to
//! a benign verdict so moderation never blocks the message path.

use serde::{Deserialize, Serialize};

/// Toxicity score at or above which a warning is issued
pub const WARNING_THRESHOLD: u8 = 7;

/// Moderation verdict produced by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the message is toxic
    pub is_toxic: bool,
    /// Toxicity score from 1 (safe) to 10 (extremely toxic)
    pub toxicity_score: u8,
    /// Short explanation (in Russian) of the verdict
    pub reason: String,
}

impl Verdict {
    /// Benign verdict used when analysis fails
    pub fn fallback(reason: impl Into<String>) -> Self {
        Verdict {
            is_toxic: false,
            toxicity_score: 1,
            reason: reason.into(),
        }
    }

    /// Whether the verdict warrants a warning to the user
    pub fn warrants_warning(&self) -> bool {
        self.is_toxic && self.toxicity_score >= WARNING_THRESHOLD
    }

    /// Render the verdict as pretty JSON for the /analyze reply
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Parse a model response into a verdict.
///
/// Unwraps a fenced ```json block first (models often fence JSON even
/// when told not to). Parse failure yields a benign fallback.
pub fn parse_verdict(raw: &str) -> Verdict {
    let body = strip_code_fence(raw.trim());

    serde_json::from_str(body)
        .unwrap_or_else(|_| Verdict::fallback("Ошибка анализа формата ответа."))
}

/// Strip a surrounding ``` or ```json fence, if present
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim().strip_suffix("```").unwrap_or(rest).trim()
}
