//! Inference provider contract (`spec.md` §4.6): an opaque value wrapping a
//! native local inference backend, exposing generation, streaming with
//! cancellation, and retry — never the model math itself.

mod echo;
mod generation;

pub use echo::EchoProvider;
pub use generation::{
    generate_with_retry, CancelToken, GenerationOutcome, InferenceProvider, StreamEvent,
};
