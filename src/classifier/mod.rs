// Scam classification — trait-based abstraction over the external classifier.
//
// ScamClassifier is the interface. LlmClassifier implements it against an
// OpenAI-compatible chat API; swapping providers doesn't touch the pipeline.
// The verdict enum and its dispatch table live in `verdict`.

pub mod llm;
pub mod rate_limiter;
pub mod traits;
pub mod verdict;

pub use traits::{NoopClassifier, ScamClassifier};
pub use verdict::{Verdict, VerdictPolicy, DISPATCH_TABLE};
