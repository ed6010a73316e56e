//! Channel post composition and length bounding
//!
//! A finished post is the model-provided content followed by the fixed
//! call-to-action, hashtags, and signature blocks. Content is capped at
//! [`CONTENT_CAP`] characters and the whole post at [`TOTAL_CAP`]; cuts
//! prefer the last word boundary inside a trailing window. All slicing
//! is character-based — the posts are Russian and byte offsets would
//! split UTF-8 sequences.

/// Maximum characters of model content kept in a post
pub const CONTENT_CAP: usize = 500;

/// Maximum characters for the whole composed post
pub const TOTAL_CAP: usize = 750;

/// Hashtags appended to every post
pub const HASHTAGS: &str = "#путешествия #выживание #кочевники #jekardos #jk";

/// Italic signature appended to every post
pub const SIGNATURE: &str = "*Нейро Jekardos*";

/// Apology returned when the agent produced no content
pub const EMPTY_CONTENT_APOLOGY: &str = "Извините, агент не смог сгенерировать основной текст \
     поста. Пожалуйста, попробуйте другую тему или перефразируйте запрос.";

/// Composes finished posts from model-provided content
#[derive(Debug, Clone)]
pub struct PostComposer {
    call_to_action: String,
}

impl PostComposer {
    /// Create a composer advertising the given chat invite link
    pub fn new(invite_link: impl Into<String>) -> Self {
        PostComposer {
            call_to_action: format!("Вступай в чат {}", invite_link.into()),
        }
    }

    /// Compose the final post for `topic` from `content_ideas`.
    ///
    /// Returns the apology message when `content_ideas` is blank.
    pub fn compose(&self, topic: &str, content_ideas: &str) -> String {
        if content_ideas.trim().is_empty() {
            return EMPTY_CONTENT_APOLOGY.to_string();
        }

        let mut content = normalize(content_ideas);
        content = trim_content(&content, CONTENT_CAP, 100);

        let post = self.assemble(&content);
        if char_len(&post) <= TOTAL_CAP {
            return post;
        }

        // Fixed parts plus the six newline separator characters
        let fixed = char_len(&self.call_to_action) + char_len(HASHTAGS) + char_len(SIGNATURE) + 6;
        let available = TOTAL_CAP.saturating_sub(fixed);

        if available > 100 {
            let content = trim_content(&content, available, 50);
            self.assemble(&content)
        } else {
            self.assemble(&format!("Краткий пост на тему: {}", topic))
        }
    }

    /// Glue content and the fixed blocks together
    fn assemble(&self, content: &str) -> String {
        format!(
            "{}\n\n{}\n\n{}\n\n{}",
            content, self.call_to_action, HASHTAGS, SIGNATURE
        )
    }

    /// The call-to-action line used by this composer
    pub fn call_to_action(&self) -> &str {
        &self.call_to_action
    }
}

/// Strip a leading `##` heading marker, drop blank lines, trim each line
fn normalize(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_prefix("##") {
        text = stripped.trim_start();
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `content` to at most `cap` characters.
///
/// If the last space of the cut falls inside the trailing `window`
/// characters, cut there; otherwise hard-cut at `cap - 3` and append
/// an ellipsis.
fn trim_content(content: &str, cap: usize, window: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= cap {
        return content.to_string();
    }

    let cut = &chars[..cap];
    let last_space = cut.iter().rposition(|c| *c == ' ');

    match last_space {
        Some(idx) if idx > cap.saturating_sub(window) => cut[..idx].iter().collect(),
        _ => {
            let mut trimmed: String = chars[..cap.saturating_sub(3)].iter().collect();
            trimmed.push_str("...");
            trimmed
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
