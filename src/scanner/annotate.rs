//! Annotation builder: text + matches -> ordered fragment
//!
//! Pure function over a text run. The result is consumed once by the tree
//! mutator and then dropped.

use serde::{Deserialize, Serialize};

use crate::scanner::duration::format_duration;
use crate::scanner::lexer::MoneyMatch;
use crate::settings::{DisplayMode, Settings};

// =============================================================================
// Types
// =============================================================================

/// One piece of a rebuilt text run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Segment {
    /// Untouched source text
    Text { content: String },
    /// Money mention decorated with its time-to-earn
    Annotated {
        original: String,
        decoration: String,
        mode: DisplayMode,
    },
    /// Money mention that could not be converted. Still wrapped as processed
    /// so later passes never lex it again.
    Inert { original: String },
}

impl Segment {
    pub fn text(content: impl Into<String>) -> Self {
        Segment::Text { content: content.into() }
    }

    /// Whether the host must wrap this segment in a processed container
    pub fn is_processed(&self) -> bool {
        !matches!(self, Segment::Text { .. })
    }

    /// Source text this segment stands for
    pub fn original(&self) -> &str {
        match self {
            Segment::Text { content } => content.as_str(),
            Segment::Annotated { original, .. } | Segment::Inert { original } => original.as_str(),
        }
    }

    /// Visible text once materialised
    pub fn rendered(&self) -> String {
        match self {
            Segment::Text { content } => content.clone(),
            Segment::Inert { original } => original.clone(),
            Segment::Annotated { original, decoration, mode } => match mode {
                DisplayMode::Tooltip => original.clone(),
                DisplayMode::Replace => decoration.clone(),
                DisplayMode::Inline => {
                    if original.is_empty() || original.ends_with(char::is_whitespace) {
                        format!("{}({})", original, decoration)
                    } else {
                        format!("{} ({})", original, decoration)
                    }
                }
            },
        }
    }

    /// Hover label, if the host should attach one
    pub fn hover_label(&self) -> Option<&str> {
        match self {
            Segment::Annotated { decoration, mode: DisplayMode::Tooltip, .. } => Some(decoration.as_str()),
            _ => None,
        }
    }
}

/// Ordered replacement for one text location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedFragment {
    pub segments: Vec<Segment>,
}

impl AnnotatedFragment {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when materialising would reproduce the source unchanged
    pub fn is_plain(&self) -> bool {
        self.segments.iter().all(|s| !s.is_processed())
    }

    pub fn annotated_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Annotated { .. }))
            .count()
    }

    /// Concatenated source text. Equals the input text of [`build_fragment`].
    pub fn original_text(&self) -> String {
        self.segments.iter().map(Segment::original).collect()
    }

    /// Concatenated visible text after materialisation
    pub fn rendered_text(&self) -> String {
        self.segments.iter().map(Segment::rendered).collect()
    }

    fn push_text(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        // Keep adjacent plain runs merged
        if let Some(Segment::Text { content: last }) = self.segments.last_mut() {
            last.push_str(content);
        } else {
            self.segments.push(Segment::text(content));
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Rebuild `text` with every match decorated according to `settings`.
///
/// `matches` must be sorted and non-overlapping (as produced by the lexer);
/// a match that overlaps its predecessor or falls outside `text` is left as
/// plain text.
pub fn build_fragment(text: &str, matches: &[MoneyMatch], settings: &Settings) -> AnnotatedFragment {
    let mut fragment = AnnotatedFragment::default();
    let mut cursor = 0;

    for m in matches {
        if m.start < cursor || m.end > text.len() || !text.is_char_boundary(m.start) || !text.is_char_boundary(m.end) {
            continue;
        }
        fragment.push_text(&text[cursor..m.start]);

        let original = text[m.start..m.end].to_string();
        let duration = if m.is_convertible() {
            format_duration(m.amount, &settings.schedule)
        } else {
            None
        };

        fragment.segments.push(match duration {
            Some(decoration) => Segment::Annotated {
                original,
                decoration,
                mode: settings.display_mode,
            },
            None => Segment::Inert { original },
        });
        cursor = m.end;
    }

    fragment.push_text(&text[cursor..]);
    fragment
}

// =============================================================================
// Tests
// =============================================================================
