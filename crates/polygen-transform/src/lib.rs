//! Model transformation passes for the polygen code generator

pub mod conflicting_composition;
pub mod elevate_properties;
pub mod generics;
pub mod pipeline;
pub mod simplify_inheritance;

pub use conflicting_composition::ConflictingCompositionResolver;
pub use elevate_properties::ElevateProperties;
pub use generics::GenericsExtraction;
pub use pipeline::{ModelTransformer, PipelineError, PipelineResult, TransformPipeline};
pub use simplify_inheritance::SimplifyInheritance;
