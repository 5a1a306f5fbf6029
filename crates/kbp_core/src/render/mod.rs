//! Render planning: from a track bundle to an encoder invocation.
//!
//! [`RenderPlanCompiler`] produces an immutable [`RenderPlan`] per bundle.
//! The plan holds a typed [`CompositionGraph`] that is only serialized to
//! ffmpeg syntax by [`EncoderArgsBuilder`].

mod compiler;
mod errors;
pub mod ffmpeg_args;
pub mod graph;
mod plan;
mod settings;

pub use compiler::{has_unsafe_chars, output_dir_for, RenderPlanCompiler, DEFAULT_OUTPUT_FOLDER};
pub use errors::{CompileError, CompileResult};
pub use ffmpeg_args::{format_tokens_pretty, EncoderArgsBuilder};
pub use graph::{CompositionGraph, EofAction, Filter, Node, SerializedGraph, StreamKind};
pub use plan::{
    AudioOutput, EncodePlan, InputDescriptor, InputRole, OutputOptions, Quality, RenderPlan,
};
pub use settings::RenderSettings;
