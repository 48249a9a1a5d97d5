// =============================================================================
// AI Module
// =============================================================================
//
// Optional augmentation of the rule-based signal by an external inference
// service.  Advisory only: the rule-based path never waits on it.

pub mod client;
pub mod pipeline;

pub use client::{HttpInferenceClient, InferenceClient, InferenceResponse};
pub use pipeline::{AiAugmenter, AugmentationRequest};
