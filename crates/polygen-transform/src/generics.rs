//! Generics extraction.
//!
//! When all direct subtypes of an object declare a property whose type
//! differs between them, the supertype becomes a generic source with one
//! type parameter per such property, and each subtype extends a generic
//! target binding the parameters to its own property types.

use std::collections::HashSet;

use indexmap::IndexMap;
use polygen_core::algebra::DiffKind;
use polygen_core::hierarchy::{dependency_order, is_generic_super_type, sub_to_super_map, super_to_sub_map};
use polygen_core::naming::to_pascal_case;
use polygen_core::property_algebra::CommonProperty;
use polygen_core::types::{
    CompositionKind, GenericTargetIdentifier, PrimitiveKind, Property, TypeGraph, TypeKind, TypeNode,
    UnknownKind,
};
use polygen_core::{
    substitute, CoreError, Model, ModelTransformOptions, TargetFeatures, TypeAlgebra, TypeId, TypeOwner,
};
use tracing::debug;

use crate::pipeline::ModelTransformer;

pub struct GenericsExtraction;

impl ModelTransformer for GenericsExtraction {
    fn name(&self) -> &'static str {
        "GenericsExtraction"
    }

    fn transform(&self, model: &mut Model, options: &ModelTransformOptions) -> Result<(), CoreError> {
        if !options.generify_types {
            return Ok(());
        }

        let sub_to_super = sub_to_super_map(model)?;
        let super_to_sub = super_to_sub_map(&sub_to_super);

        for supertype in dependency_order(&super_to_sub) {
            if !matches!(model.graph.kind(supertype), TypeKind::Object { .. })
                || !is_generic_super_type(&model.graph, supertype)
            {
                debug!("Skipping {}, it cannot become generic", model.graph.describe(supertype));
                continue;
            }
            let subtypes = match super_to_sub.get(&supertype) {
                Some(subs) if subs.len() > 1 => subs.clone(),
                _ => continue,
            };
            if !subtypes
                .iter()
                .all(|sub| matches!(model.graph.kind(*sub), TypeKind::Object { .. }))
            {
                continue;
            }

            let common = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC).common_properties(
                |_| false,
                |_| false,
                &subtypes,
            );
            let candidates: Vec<CommonProperty> = common
                .into_values()
                .filter(|info| info.distinct_types.len() > 1)
                .filter(|info| {
                    options.generification_box_allowed
                        || info.distinct_types.iter().all(|t| generic_allowed(&model.graph, *t))
                })
                .collect();
            if candidates.is_empty() {
                continue;
            }
            generify(model, supertype, &subtypes, &candidates)?;
        }
        Ok(())
    }
}

/// Types usable as generic arguments without boxing.
fn generic_allowed(graph: &TypeGraph, ty: TypeId) -> bool {
    match graph.kind(graph.unwrap(ty)) {
        TypeKind::Primitive {
            primitive, nullable, ..
        } => *primitive == PrimitiveKind::String || *nullable,
        _ => true,
    }
}

fn generify(
    model: &mut Model,
    supertype: TypeId,
    subtypes: &[TypeId],
    candidates: &[CommonProperty],
) -> Result<(), CoreError> {
    let mut source_node = TypeNode::new(TypeKind::GenericSource {
        of: supertype,
        source_identifiers: Vec::new(),
    });
    source_node.meta.name = model.graph.meta(supertype).name.clone();
    let source = model.graph.add(source_node);
    substitute(model, TypeOwner::Model, supertype, source, usize::MAX)?;
    debug!(
        "Made {} generic over {} properties",
        model.graph.describe(supertype),
        candidates.len()
    );

    let mut bindings: IndexMap<TypeId, Vec<GenericTargetIdentifier>> =
        subtypes.iter().map(|sub| (*sub, Vec::new())).collect();
    let mut identifiers = Vec::new();

    for info in candidates {
        let placeholder = if candidates.len() == 1 {
            "T".to_string()
        } else {
            format!("T{}", to_pascal_case(&info.name))
        };
        let lower_bound = info
            .common_type
            .filter(|_| !info.type_diffs.contains(&DiffKind::FundamentalType))
            .filter(|ty| !matches!(model.graph.kind(*ty), TypeKind::Unknown { .. }));
        let identifier = model.graph.add_kind(TypeKind::GenericSourceIdentifier {
            placeholder,
            lower_bound,
            upper_bound: None,
        });
        let chain = explode(&mut model.graph, identifier);
        identifiers.push(identifier);
        identifiers.extend(chain.iter().copied());

        for (sub, property) in subtypes.iter().zip(&info.properties) {
            let ty = model.graph.property(*property).ty;
            let mut bound = vec![GenericTargetIdentifier {
                source_identifier: identifier,
                ty,
            }];
            let mut current = ty;
            for chained in &chain {
                current = match single_argument(&model.graph, current) {
                    Some(argument) => argument,
                    None => bound_of(&mut model.graph, *chained),
                };
                bound.push(GenericTargetIdentifier {
                    source_identifier: *chained,
                    ty: current,
                });
            }
            if let Some(entry) = bindings.get_mut(sub) {
                entry.extend(bound);
            }
            model.graph.remove_property(*sub, *property);
        }

        let siblings: Vec<Property> = info
            .properties
            .iter()
            .map(|p| model.graph.property(*p).clone())
            .collect();
        let mut property = Property::new(info.name.clone(), identifier, supertype);
        property.required = siblings.iter().all(|p| p.required);
        property.read_only = siblings.iter().all(|p| p.read_only);
        property.write_only = siblings.iter().all(|p| p.write_only);
        property.deprecated = siblings.iter().all(|p| p.deprecated);
        property.is_abstract = siblings.iter().all(|p| p.is_abstract);
        model.graph.push_property(property);
    }

    if let TypeKind::GenericSource {
        source_identifiers, ..
    } = model.graph.kind_mut(source)
    {
        source_identifiers.extend(identifiers);
    }

    for (sub, target_identifiers) in bindings {
        let target = model.graph.add_kind(TypeKind::GenericTarget {
            source,
            target_identifiers,
        });
        extend_target(&mut model.graph, sub, supertype, source, target);
    }
    Ok(())
}

/// Point the subtype at its generic target instead of the supertype.
fn extend_target(graph: &mut TypeGraph, sub: TypeId, supertype: TypeId, source: TypeId, target: TypeId) {
    let parent = match graph.kind(sub) {
        TypeKind::Object {
            extended_by: Some(parent),
            ..
        } => *parent,
        _ => return,
    };
    if parent == supertype || parent == source {
        if let TypeKind::Object { extended_by, .. } = graph.kind_mut(sub) {
            *extended_by = Some(target);
        }
        return;
    }
    let parent = graph.unwrap(parent);
    if let TypeKind::Composition {
        composition: CompositionKind::And,
        types,
    } = graph.kind_mut(parent)
    {
        for member in types.iter_mut() {
            if *member == supertype || *member == source {
                *member = target;
            }
        }
    }
}

/// Replace a single-argument generic-target bound with a chained parameter,
/// so the bound does not leak a raw generic. Returns the chained identifiers.
fn explode(graph: &mut TypeGraph, identifier: TypeId) -> Vec<TypeId> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = identifier;

    loop {
        let (placeholder, Some(bound)) = (match graph.kind(current) {
            TypeKind::GenericSourceIdentifier {
                placeholder,
                lower_bound,
                ..
            } => (placeholder.clone(), *lower_bound),
            _ => break,
        }) else {
            break;
        };
        if !seen.insert(bound) {
            break;
        }
        let (source, inner) = match graph.kind(bound) {
            TypeKind::GenericTarget {
                source,
                target_identifiers,
            } if target_identifiers.len() == 1 => (*source, target_identifiers[0].source_identifier),
            _ => break,
        };
        let (inner_placeholder, inner_bound) = match graph.kind(inner) {
            TypeKind::GenericSourceIdentifier {
                placeholder,
                lower_bound,
                upper_bound,
            } => (placeholder.clone(), lower_bound.or(*upper_bound)),
            _ => break,
        };
        let Some(inner_bound) = inner_bound else {
            break;
        };

        let chained = graph.add_kind(TypeKind::GenericSourceIdentifier {
            placeholder: format!("{}{}", placeholder, inner_placeholder),
            lower_bound: Some(inner_bound),
            upper_bound: None,
        });
        let rebound = graph.add_kind(TypeKind::GenericTarget {
            source,
            target_identifiers: vec![GenericTargetIdentifier {
                source_identifier: inner,
                ty: chained,
            }],
        });
        if let TypeKind::GenericSourceIdentifier { lower_bound, .. } = graph.kind_mut(current) {
            *lower_bound = Some(rebound);
        }
        chain.push(chained);
        current = chained;
    }
    chain
}

fn single_argument(graph: &TypeGraph, ty: TypeId) -> Option<TypeId> {
    match graph.kind(graph.unwrap(ty)) {
        TypeKind::GenericTarget {
            target_identifiers, ..
        } if target_identifiers.len() == 1 => Some(target_identifiers[0].ty),
        _ => None,
    }
}

fn bound_of(graph: &mut TypeGraph, identifier: TypeId) -> TypeId {
    match graph.kind(identifier) {
        TypeKind::GenericSourceIdentifier {
            lower_bound: Some(bound),
            ..
        } => *bound,
        _ => graph.add_kind(TypeKind::unknown(UnknownKind::Wildcard)),
    }
}
