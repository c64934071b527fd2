//! Resolves intersections of enums and primitives into a single type.

use polygen_core::types::{CompositionKind, TypeKind};
use polygen_core::visitor::DepthFirst;
use polygen_core::{CoreError, Model, ModelTransformOptions, TargetFeatures, TypeAlgebra, TypeId};
use serde_json::Value;
use tracing::{debug, warn};

use crate::pipeline::ModelTransformer;

pub struct ConflictingCompositionResolver;

impl ModelTransformer for ConflictingCompositionResolver {
    fn name(&self) -> &'static str {
        "ConflictingCompositionResolver"
    }

    fn transform(&self, _model: &mut Model, _options: &ModelTransformOptions) -> Result<(), CoreError> {
        Ok(())
    }

    fn transform_2nd_pass(
        &self,
        model: &mut Model,
        _options: &ModelTransformOptions,
        features: &TargetFeatures,
    ) -> Result<(), CoreError> {
        DepthFirst::new().visit_model(model, |model, ctx| {
            let TypeKind::Composition {
                composition: CompositionKind::And,
                types,
            } = model.graph.kind(ctx.id).clone()
            else {
                return Ok(());
            };

            let mut enums = 0;
            let mut primitives = 0;
            let mut others = 0;
            for child in &types {
                match model.graph.kind(model.graph.unwrap(*child)) {
                    TypeKind::Enum { .. } => enums += 1,
                    TypeKind::Primitive { .. } => primitives += 1,
                    _ => others += 1,
                }
            }
            let buckets = [enums, primitives, others].iter().filter(|n| **n > 0).count();
            if buckets <= 1 {
                return Ok(());
            }
            if others > 0 {
                warn!(
                    "Intersection {} mixes {} enums, {} primitives and {} other types, leaving as is",
                    model.graph.describe(ctx.id),
                    enums,
                    primitives,
                    others
                );
                return Ok(());
            }

            let Some(common) = TypeAlgebra::new(&mut model.graph, *features).common_denominator(&types, true)
            else {
                warn!(
                    "No common type for intersection {}, leaving as is",
                    model.graph.describe(ctx.id)
                );
                return Ok(());
            };

            let resolved = merge_members(model, ctx.id, &types, common.ty);
            debug!(
                "Resolved intersection {} into {}",
                model.graph.describe(ctx.id),
                model.graph.describe(resolved)
            );
            ctx.replacement = Some(resolved);
            Ok(())
        })
    }
}

/// A copy of `common` carrying the documentation and enum values of every member.
fn merge_members(model: &mut Model, composition: TypeId, members: &[TypeId], common: TypeId) -> TypeId {
    let mut descriptions: Vec<String> = Vec::new();
    let mut summaries: Vec<String> = Vec::new();
    let mut examples: Vec<Value> = Vec::new();

    for id in std::iter::once(composition).chain(members.iter().copied()) {
        let meta = model.graph.meta(id);
        push_unique(&mut descriptions, meta.description.clone());
        push_unique(&mut summaries, meta.summary.clone());
        if let TypeKind::Enum { members, .. } = model.graph.kind(model.graph.unwrap(id)) {
            for member in members {
                push_unique(&mut examples, Some(member.value.clone()));
            }
        }
    }

    let resolved = model.graph.duplicate(common);
    let meta = &mut model.graph.node_mut(resolved).meta;
    if !descriptions.is_empty() {
        meta.description = Some(descriptions.join(", "));
    }
    if !summaries.is_empty() {
        meta.summary = Some(summaries.join(", "));
    }
    for example in examples {
        push_unique(&mut meta.examples, Some(example));
    }
    resolved
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: Option<T>) {
    if let Some(value) = value {
        if !values.contains(&value) {
            values.push(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polygen_core::types::PrimitiveKind;
    use polygen_core::ModelBuilder;
    use serde_json::json;

    #[test]
    fn test_enum_and_primitive_become_primitive() {
        let mut builder = ModelBuilder::new("m");
        let status = builder.enumeration("Status", PrimitiveKind::String, &[json!("on"), json!("off"), json!("on")]);
        builder.graph().node_mut(status).meta.description = Some("Power state".to_string());
        let string = builder.primitive(PrimitiveKind::String);
        builder.graph().node_mut(string).meta.description = Some("Free text".to_string());
        let both = builder.composition(CompositionKind::And, vec![status, string]);
        builder.graph().node_mut(both).meta.description = Some("Power state".to_string());
        let holder = builder.object("Holder");
        let prop = builder.property(holder, "state", both);
        let mut model = builder.build();

        ConflictingCompositionResolver
            .transform_2nd_pass(&mut model, &ModelTransformOptions::default(), &TargetFeatures::GENERIC)
            .unwrap();

        let ty = model.graph.property(prop).ty;
        assert_ne!(ty, string);
        assert_eq!(model.graph.kind(ty), &TypeKind::primitive(PrimitiveKind::String));
        let meta = model.graph.meta(ty);
        assert_eq!(meta.description.as_deref(), Some("Power state, Free text"));
        assert_eq!(meta.examples, vec![json!("on"), json!("off")]);
        assert!(model.graph.meta(string).examples.is_empty());
    }

    #[test]
    fn test_mixed_with_objects_is_untouched() {
        let mut builder = ModelBuilder::new("m");
        let status = builder.enumeration("Status", PrimitiveKind::String, &[json!("on")]);
        let other = builder.object("Other");
        let both = builder.composition(CompositionKind::And, vec![status, other]);
        let holder = builder.object("Holder");
        let prop = builder.property(holder, "state", both);
        let mut model = builder.build();

        ConflictingCompositionResolver
            .transform_2nd_pass(&mut model, &ModelTransformOptions::default(), &TargetFeatures::GENERIC)
            .unwrap();
        assert_eq!(model.graph.property(prop).ty, both);
    }

    #[test]
    fn test_single_bucket_is_untouched() {
        let mut builder = ModelBuilder::new("m");
        let a = builder.object("A");
        let b = builder.object("B");
        let both = builder.composition(CompositionKind::And, vec![a, b]);
        builder.root(both);
        let mut model = builder.build();
        let before = model.clone();

        ConflictingCompositionResolver
            .transform_2nd_pass(&mut model, &ModelTransformOptions::default(), &TargetFeatures::GENERIC)
            .unwrap();
        assert_eq!(model, before);
    }

    #[test]
    fn test_unrelated_enum_and_primitive_left_alone() {
        let mut builder = ModelBuilder::new("m");
        let status = builder.enumeration("Status", PrimitiveKind::String, &[json!("on")]);
        let flag = builder.primitive(PrimitiveKind::Bool);
        let both = builder.composition(CompositionKind::And, vec![status, flag]);
        let holder = builder.object("Holder");
        let prop = builder.property(holder, "state", both);
        let mut model = builder.build();

        ConflictingCompositionResolver
            .transform_2nd_pass(&mut model, &ModelTransformOptions::default(), &TargetFeatures::GENERIC)
            .unwrap();
        assert_eq!(model.graph.property(prop).ty, both);
    }

    #[test]
    fn test_summaries_are_merged() {
        let mut builder = ModelBuilder::new("m");
        let size = builder.enumeration("Size", PrimitiveKind::Integer, &[json!(1), json!(2)]);
        builder.graph().node_mut(size).meta.summary = Some("Known sizes".to_string());
        let int = builder.primitive(PrimitiveKind::Integer);
        builder.graph().node_mut(int).meta.summary = Some("Any size".to_string());
        let both = builder.composition(CompositionKind::And, vec![int, size]);
        builder.graph().node_mut(both).meta.summary = Some("Any size".to_string());
        let wrapper = builder.array(both);
        let holder = builder.object("Holder");
        let prop = builder.property(holder, "sizes", wrapper);
        let mut model = builder.build();

        ConflictingCompositionResolver
            .transform_2nd_pass(&mut model, &ModelTransformOptions::default(), &TargetFeatures::GENERIC)
            .unwrap();

        assert_eq!(model.graph.property(prop).ty, wrapper);
        let TypeKind::Array { of } = model.graph.kind(wrapper) else {
            panic!("expected an array");
        };
        let meta = model.graph.meta(*of);
        assert_eq!(meta.summary.as_deref(), Some("Any size, Known sizes"));
        assert!(meta.description.is_none());
        assert_eq!(meta.examples, vec![json!(1), json!(2)]);
        assert_eq!(model.graph.meta(int).summary.as_deref(), Some("Any size"));
    }
}
