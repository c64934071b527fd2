//! Type graph, structural type algebra and naming for the polygen code generator

pub mod algebra;
pub mod error;
pub mod hierarchy;
pub mod ir;
pub mod name_resolver;
pub mod naming;
pub mod options;
pub mod property_algebra;
pub mod substitute;
pub mod types;
pub mod visitor;

pub use algebra::{CommonDenominator, DiffKind, TypeAlgebra};
pub use error::CoreError;
pub use ir::{Model, ModelBuilder, TypeOwner};
pub use name_resolver::NameResolver;
pub use naming::TypeName;
pub use options::{ModelTransformOptions, TargetFeatures, TransformConfig};
pub use property_algebra::{CommonProperty, PropertyDifference, PropertyEquality};
pub use substitute::substitute;
pub use types::{PropertyId, TypeGraph, TypeId, TypeKind};
