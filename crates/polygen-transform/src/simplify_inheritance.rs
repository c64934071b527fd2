//! Inheritance simplification.
//!
//! First pass: a two-member union with `null` becomes the nullable other
//! member, and intersection members already implied by another member's
//! hierarchy are dropped. Second pass, for targets without primitive
//! inheritance: property-less objects that extend a primitive become that
//! primitive.

use std::collections::HashSet;

use polygen_core::hierarchy::super_type_hierarchy;
use polygen_core::types::{CompositionKind, TypeKind};
use polygen_core::visitor::DepthFirst;
use polygen_core::{substitute, CoreError, Model, ModelTransformOptions, TargetFeatures, TypeId, TypeOwner};
use tracing::debug;

use crate::pipeline::ModelTransformer;

pub struct SimplifyInheritance;

impl ModelTransformer for SimplifyInheritance {
    fn name(&self) -> &'static str {
        "SimplifyInheritance"
    }

    fn transform(&self, model: &mut Model, options: &ModelTransformOptions) -> Result<(), CoreError> {
        if !options.simplify_type_hierarchy {
            return Ok(());
        }

        DepthFirst::new().visit_model(model, |model, ctx| {
            let TypeKind::Composition { composition, types } = model.graph.kind(ctx.id).clone() else {
                return Ok(());
            };
            match composition {
                CompositionKind::Or => {
                    if let Some(nullable) = collapse_nullable_union(model, &types) {
                        debug!(
                            "Collapsed union {} into nullable {}",
                            model.graph.describe(ctx.id),
                            model.graph.describe(nullable)
                        );
                        ctx.replacement = Some(nullable);
                    }
                }
                CompositionKind::And => {
                    let kept = non_redundant_members(model, &types)?;
                    if kept.len() == types.len() {
                        return Ok(());
                    }
                    if let [single] = kept[..] {
                        debug!(
                            "Replacing intersection {} with its only member {}",
                            model.graph.describe(ctx.id),
                            model.graph.describe(single)
                        );
                        ctx.replacement = Some(single);
                    } else if let TypeKind::Composition { types, .. } = model.graph.kind_mut(ctx.id) {
                        *types = kept;
                    }
                }
                CompositionKind::Xor | CompositionKind::Not => {}
            }
            Ok(())
        })
    }

    fn transform_2nd_pass(
        &self,
        model: &mut Model,
        options: &ModelTransformOptions,
        features: &TargetFeatures,
    ) -> Result<(), CoreError> {
        if !options.simplify_type_hierarchy || features.primitive_inheritance {
            return Ok(());
        }

        let mut flattened: Vec<(TypeId, TypeId)> = Vec::new();
        DepthFirst::new().visit_model(model, |model, ctx| {
            let TypeKind::Object {
                properties,
                extended_by: Some(parent),
                ..
            } = model.graph.kind(ctx.id)
            else {
                return Ok(());
            };
            let primitive = model.graph.unwrap(*parent);
            if !matches!(model.graph.kind(primitive), TypeKind::Primitive { .. }) {
                return Ok(());
            }
            if !properties.is_empty() {
                return Err(CoreError::InvalidType(format!(
                    "{} extends primitive {} but has {} properties, which would be lost",
                    model.graph.describe(ctx.id),
                    model.graph.describe(primitive),
                    properties.len()
                )));
            }

            let object_meta = model.graph.meta(ctx.id).clone();
            let replacement = model.graph.duplicate(primitive);
            let meta = &mut model.graph.node_mut(replacement).meta;
            meta.name = object_meta.name;
            meta.title = object_meta.title;
            meta.description = object_meta.description;
            meta.summary = object_meta.summary;
            flattened.push((ctx.id, replacement));
            Ok(())
        })?;

        for (object, primitive) in flattened {
            debug!("Flattened primitive inheritance of {}", model.graph.describe(object));
            substitute(model, TypeOwner::Model, object, primitive, usize::MAX)?;
        }
        Ok(())
    }
}

/// `[T, null]` in either order becomes nullable `T`.
fn collapse_nullable_union(model: &mut Model, types: &[TypeId]) -> Option<TypeId> {
    let [first, second] = types else {
        return None;
    };
    let other = match (model.graph.is_null(*first), model.graph.is_null(*second)) {
        (true, false) => *second,
        (false, true) => *first,
        _ => return None,
    };
    Some(model.graph.nullable_of(other))
}

/// Members that do not already appear in another member's hierarchy.
fn non_redundant_members(model: &Model, types: &[TypeId]) -> Result<Vec<TypeId>, CoreError> {
    let graph = &model.graph;
    let mut hierarchies: Vec<HashSet<TypeId>> = Vec::with_capacity(types.len());
    for member in types {
        let hierarchy = super_type_hierarchy(graph, *member)?;
        hierarchies.push(hierarchy.into_iter().map(|t| graph.unwrap(t)).collect());
    }

    let mut kept = Vec::new();
    for (i, member) in types.iter().enumerate() {
        let unwrapped = graph.unwrap(*member);
        let redundant = hierarchies.iter().enumerate().any(|(j, hierarchy)| {
            j != i && graph.unwrap(types[j]) != unwrapped && hierarchy.contains(&unwrapped)
        });
        if !redundant && !kept.contains(member) {
            kept.push(*member);
        }
    }
    // Members that imply each other cyclically would all be dropped.
    if kept.is_empty() {
        kept.extend(types.first());
    }
    Ok(kept)
}
