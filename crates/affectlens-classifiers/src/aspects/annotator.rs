//! Linguistic annotation contract
//!
//! Offsets are UTF-8 byte offsets into the annotated text; spans are
//! half-open `[start, end)`.

use affectlens_core::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A named entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    /// Entity type, e.g. `PERSON`, `ORG`, `PRODUCT`
    pub label: String,
    pub start: usize,
    pub end: usize,
}

/// A base noun phrase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NounChunk {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A token with its part-of-speech and dependency tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    /// Universal POS tag (`NOUN`, `VERB`, ...); empty when untagged
    #[serde(default)]
    pub pos: String,
    /// Dependency relation (`nsubj`, `dobj`, ...); empty when unparsed
    #[serde(default)]
    pub dep: String,
    pub offset: usize,
}

/// A sentence span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub start: usize,
    pub end: usize,
}

/// Everything an annotator produces for one text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub noun_chunks: Vec<NounChunk>,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub sentences: Vec<Sentence>,
}

/// Produces tokens, entities, noun chunks and sentence boundaries.
///
/// Implementations that depend on an unavailable model must fail with
/// [`affectlens_core::Error::AnnotatorUnavailable`].
pub trait Annotator: Send + Sync {
    fn annotate(&self, text: &str) -> Result<Annotation>;

    fn name(&self) -> &str;
}

/// Words (with an optional contraction suffix) or single punctuation marks
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9]+(?:'[A-Za-z]+)?|[^\sA-Za-z0-9]").expect("valid token regex")
});

/// Terminal punctuation followed by whitespace or end of text, or a blank line
static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.!?]+(?:\s+|$)|\n{2,}").expect("valid sentence regex")
});

/// Tokenizer and sentence splitter with no tagging model.
///
/// Tokens carry no POS or dependency tags and no entities or noun chunks are
/// produced, so aspect extraction over this annotator always takes the
/// heuristic path.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAnnotator;

impl BasicAnnotator {
    pub fn new() -> Self {
        Self
    }

    /// Split `text` into trimmed, non-empty sentence spans
    pub fn sentences(text: &str) -> Vec<Sentence> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for m in SENTENCE_END_RE.find_iter(text) {
            push_trimmed(text, start, m.end(), &mut sentences);
            start = m.end();
        }
        push_trimmed(text, start, text.len(), &mut sentences);

        sentences
    }

    pub fn tokens(text: &str) -> Vec<Token> {
        TOKEN_RE
            .find_iter(text)
            .map(|m| Token {
                text: m.as_str().to_string(),
                pos: String::new(),
                dep: String::new(),
                offset: m.start(),
            })
            .collect()
    }
}

fn push_trimmed(text: &str, start: usize, end: usize, out: &mut Vec<Sentence>) {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading + trailing < slice.len() {
        out.push(Sentence {
            start: start + leading,
            end: end - trailing,
        });
    }
}

impl Annotator for BasicAnnotator {
    fn annotate(&self, text: &str) -> Result<Annotation> {
        Ok(Annotation {
            entities: Vec::new(),
            noun_chunks: Vec::new(),
            tokens: Self::tokens(text),
            sentences: Self::sentences(text),
        })
    }

    fn name(&self) -> &str {
        "basic"
    }
}
