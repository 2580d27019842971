//! # Keyword Classifier
//!
//! Decides whether an inbound body is worth logging and which compliance
//! action it asks for (opt-out, opt-in, help, or plain message).

use crate::domain::config::{KeywordsConfig, MatchMode, RepliesConfig};
use crate::domain::types::{Action, Classification};

/// Longest free-text body that still gets logged.
pub const MAX_LOGGED_CHARS: usize = 160;

/// Fragments of provider error traces that get echoed back as "messages".
const NOISE_MARKERS: [&str; 8] = [
    "http error",
    "twilio returned",
    "unable to create record",
    "invalid",
    "error:",
    "21610",
    "21211",
    "21212",
];

pub struct KeywordClassifier {
    opt_out: Vec<String>,
    opt_in: Vec<String>,
    help: Vec<String>,
    mode: MatchMode,
    replies: RepliesConfig,
}

fn normalize_list(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Lowercased words joined by single spaces, padded for whole-word search.
fn word_text(normalized: &str) -> String {
    let words: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    format!(" {} ", words.join(" "))
}

impl KeywordClassifier {
    pub fn new(keywords: &KeywordsConfig, replies: &RepliesConfig) -> Self {
        Self {
            opt_out: normalize_list(&keywords.opt_out),
            opt_in: normalize_list(&keywords.opt_in),
            help: normalize_list(&keywords.help),
            mode: keywords.match_mode,
            replies: replies.clone(),
        }
    }

    fn is_bare_keyword(&self, normalized: &str) -> bool {
        self.opt_out
            .iter()
            .chain(&self.opt_in)
            .chain(&self.help)
            .any(|k| k == normalized)
    }

    fn find<'a>(&self, list: &'a [String], normalized: &str, words: &str) -> Option<&'a str> {
        list.iter()
            .find(|k| match self.mode {
                MatchMode::Exact => k.as_str() == normalized,
                MatchMode::Contains => words.contains(&format!(" {} ", word_text(k).trim())),
            })
            .map(String::as_str)
    }

    /// Filters out empty bodies and echoed provider error traces.
    pub fn should_log(&self, body: &str) -> bool {
        let normalized = body.trim().to_lowercase();
        if normalized.is_empty() {
            return false;
        }
        if self.is_bare_keyword(&normalized) {
            return true;
        }
        normalized.chars().count() <= MAX_LOGGED_CHARS
            && !NOISE_MARKERS.iter().any(|m| normalized.contains(m))
    }

    pub fn classify(&self, body: &str) -> Classification {
        let normalized = body.trim().to_lowercase();
        let words = word_text(&normalized);

        if let Some(keyword) = self.find(&self.opt_out, &normalized, &words) {
            return Classification {
                action: Action::OptOut,
                reason: format!("user_sent_{}", keyword.replace(' ', "_")),
                reply: self.replies.opt_out.clone(),
            };
        }
        if let Some(keyword) = self.find(&self.opt_in, &normalized, &words) {
            return Classification {
                action: Action::OptIn,
                reason: format!("user_sent_{}", keyword.replace(' ', "_")),
                reply: self.replies.opt_in.clone(),
            };
        }
        if self.find(&self.help, &normalized, &words).is_some() {
            return Classification {
                action: Action::Help,
                reason: "user_asked_help".to_string(),
                reply: self.replies.help.clone(),
            };
        }
        Classification {
            action: Action::Message,
            reason: "free_text".to_string(),
            reply: self.replies.message.clone(),
        }
    }
}
