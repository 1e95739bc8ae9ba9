//! Aspect-based sentiment
//!
//! An [`Annotator`] supplies entities, noun chunks, tagged tokens and
//! sentences; [`extract_aspects`] turns them into candidate aspects (falling
//! back to adjacent-word heuristics) and [`AspectPipeline`] scores each aspect
//! in context before aggregating an overall sentiment.

pub mod annotator;
pub mod extract;
pub mod pipeline;

pub use annotator::{Annotation, Annotator, BasicAnnotator, Entity, NounChunk, Sentence, Token};
pub use extract::{aspect_context, extract_aspects, heuristic_aspects, Aspect, AspectKind};
pub use pipeline::{
    aggregate_overall, AspectAnalysis, AspectPipeline, AspectVerdict, OverallSentiment,
    NO_ASPECTS_MESSAGE,
};
