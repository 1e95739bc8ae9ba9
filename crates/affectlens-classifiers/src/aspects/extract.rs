//! Aspect candidate extraction and context windows

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

use super::annotator::{Annotation, Sentence};

/// Entity types treated as aspects
const ASPECT_ENTITY_TYPES: &[&str] = &["PERSON", "ORG", "PRODUCT", "EVENT", "WORK_OF_ART", "LAW"];

/// Dependency relations that make a noun an aspect
const ASPECT_DEPENDENCIES: &[&str] = &["nsubj", "dobj", "pobj"];

const PRONOUNS: &[&str] = &["i", "you", "he", "she", "it", "we", "they"];

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "and", "or", "but", "is", "are", "was",
    "were", "it", "i", "you", "he", "she", "we", "they", "to", "for", "of", "in", "on", "with",
    "by", "be", "has", "have", "had", "its", "my", "your", "our", "their", "too",
];

static DETERMINER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(the|a|an|this|that|these|those)\s+").expect("valid determiner regex")
});

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+(?:'[A-Za-z]+)?").expect("valid word regex"));

/// How an aspect was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectKind {
    Entity,
    NounPhrase,
    Noun,
    Heuristic,
}

/// An aspect candidate with its span in the source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aspect {
    pub text: String,
    pub kind: AspectKind,
    /// Entity type for entities, otherwise the kind in upper case
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl Aspect {
    fn new(
        text: impl Into<String>,
        kind: AspectKind,
        label: impl Into<String>,
        start: usize,
        end: usize,
    ) -> Self {
        Self {
            text: text.into(),
            kind,
            label: label.into(),
            start,
            end,
        }
    }
}

/// Extract up to `max_aspects` aspects from an annotated text.
///
/// Entities, noun chunks and syntactic nouns are merged, ordered by start
/// offset and deduplicated case-insensitively (first occurrence wins). When
/// that yields nothing, adjacent content-word pairs are used instead.
pub fn extract_aspects(text: &str, annotation: &Annotation, max_aspects: usize) -> Vec<Aspect> {
    let mut candidates = Vec::new();

    for entity in &annotation.entities {
        let trimmed = entity.text.trim();
        if ASPECT_ENTITY_TYPES.contains(&entity.label.as_str()) && trimmed.chars().count() > 1 {
            candidates.push(Aspect::new(
                trimmed,
                AspectKind::Entity,
                entity.label.as_str(),
                entity.start,
                entity.end,
            ));
        }
    }

    for chunk in &annotation.noun_chunks {
        let trimmed = chunk.text.trim();
        let lowered = trimmed.to_lowercase();
        if trimmed.chars().count() > 2
            && !PRONOUNS.contains(&lowered.as_str())
            && !DETERMINER_PREFIX.is_match(&lowered)
        {
            candidates.push(Aspect::new(
                trimmed,
                AspectKind::NounPhrase,
                "NOUN_PHRASE",
                chunk.start,
                chunk.end,
            ));
        }
    }

    for token in &annotation.tokens {
        let trimmed = token.text.trim();
        if token.pos == "NOUN"
            && ASPECT_DEPENDENCIES.contains(&token.dep.as_str())
            && trimmed.chars().count() > 2
        {
            candidates.push(Aspect::new(
                trimmed,
                AspectKind::Noun,
                "NOUN",
                token.offset,
                token.offset + trimmed.len(),
            ));
        }
    }

    // Stable: equal starts keep entity > noun phrase > noun precedence
    candidates.sort_by_key(|a| a.start);

    let mut seen = HashSet::new();
    let mut aspects: Vec<Aspect> = candidates
        .into_iter()
        .filter(|a| seen.insert(a.text.to_lowercase()))
        .collect();

    if aspects.is_empty() {
        return heuristic_aspects(text, max_aspects);
    }

    aspects.truncate(max_aspects);
    aspects
}

/// Adjacent word pairs where neither word is a stopword and both are longer
/// than two characters. Text is lowercased; the span is the first
/// case-insensitive occurrence of the pair, or the two words' own extent
/// when they are separated by more than a single space.
pub fn heuristic_aspects(text: &str, max_aspects: usize) -> Vec<Aspect> {
    let words: Vec<_> = WORD_RE.find_iter(text).collect();
    let mut seen = HashSet::new();
    let mut aspects = Vec::new();

    for pair in words.windows(2) {
        if aspects.len() >= max_aspects {
            break;
        }

        let w1 = pair[0].as_str().to_ascii_lowercase();
        let w2 = pair[1].as_str().to_ascii_lowercase();
        if !is_content_word(&w1) || !is_content_word(&w2) {
            continue;
        }

        let candidate = format!("{} {}", w1, w2);
        if !seen.insert(candidate.clone()) {
            continue;
        }

        let (start, end) = match find_ascii_case_insensitive(text, &candidate) {
            Some(start) => (start, start + candidate.len()),
            None => (pair[0].start(), pair[1].end()),
        };

        aspects.push(Aspect::new(candidate, AspectKind::Heuristic, "HEURISTIC", start, end));
    }

    aspects
}

fn is_content_word(word: &str) -> bool {
    word.len() > 2 && !STOPWORDS.contains(&word)
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Text surrounding an aspect.
///
/// The first sentence whose span contains the aspect's start offset (bounds
/// inclusive) wins. Otherwise `window` characters either side of the span
/// are taken, clipped to the text. The result is trimmed.
pub fn aspect_context(
    text: &str,
    aspect: &Aspect,
    sentences: &[Sentence],
    window: usize,
) -> String {
    let sentence = sentences
        .iter()
        .filter(|s| s.start <= aspect.start && aspect.start <= s.end)
        .find_map(|s| text.get(s.start..s.end));
    if let Some(sentence) = sentence {
        return sentence.trim().to_string();
    }

    let start = floor_char_boundary(text, aspect.start);
    let end = floor_char_boundary(text, aspect.end.max(aspect.start));
    let from = chars_back(text, start, window);
    let to = chars_forward(text, end, window);
    text[from..to].trim().to_string()
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn chars_back(text: &str, from: usize, n: usize) -> usize {
    if n == 0 {
        return from;
    }
    text[..from]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn chars_forward(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}
