//! Stuck-loop detection for the tool-calling agent
//!
//! Detects the model calling the same tool and getting the same result
//! over and over, and produces a hint message that forces it to change
//! course.

use std::collections::VecDeque;

/// Comparison window over result text
const SNIPPET_CHARS: usize = 200;

/// Tracks recent tool calls and flags repetition
pub struct LoopGuard {
    recent: VecDeque<(String, String)>,
    threshold: usize,
}

impl LoopGuard {
    /// `threshold` consecutive same-tool-same-result calls trigger a hint
    pub fn new(threshold: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(threshold + 1),
            threshold,
        }
    }

    /// Record a tool call and its result, returning a hint if stuck
    pub fn record(&mut self, tool_name: &str, result: &str) -> Option<String> {
        let snippet = snippet(result);
        self.recent.push_back((tool_name.to_string(), snippet.clone()));

        while self.recent.len() > self.threshold {
            self.recent.pop_front();
        }

        if self.recent.len() >= self.threshold {
            let all_same = self
                .recent
                .iter()
                .all(|(name, snip)| name == tool_name && *snip == snippet);

            if all_same {
                self.recent.clear();
                return Some(format!(
                    "[SYSTEM] The tool '{}' returned the same result {} times in a row. \
                     Do not call it again with a similar query. Answer with what you \
                     already have, or take a different approach.",
                    tool_name, self.threshold
                ));
            }
        }

        None
    }
}

impl Default for LoopGuard {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Leading chars of a result for comparison (results are often Cyrillic,
/// so slicing must be char-aware)
fn snippet(s: &str) -> String {
    s.chars().take(SNIPPET_CHARS).collect()
}
