//! Property elevation.
//!
//! Properties declared identically by every direct subtype move up to the
//! supertype. Before the target is known only identical properties move.
//! With target features, properties that differ only by literal value also
//! get an abstract declaration on the supertype while subtypes keep theirs.

use polygen_core::algebra::DiffKind;
use polygen_core::hierarchy::{dependency_order, sub_to_super_map, super_to_sub_map};
use polygen_core::property_algebra::{CommonProperty, PropertyDifference};
use polygen_core::types::{CompositionKind, Property, TypeKind};
use polygen_core::{CoreError, Model, ModelTransformOptions, TargetFeatures, TypeAlgebra, TypeId};
use tracing::debug;

use crate::pipeline::ModelTransformer;

pub struct ElevateProperties;

impl ModelTransformer for ElevateProperties {
    fn name(&self) -> &'static str {
        "ElevateProperties"
    }

    fn transform(&self, model: &mut Model, options: &ModelTransformOptions) -> Result<(), CoreError> {
        if !options.elevate_properties {
            return Ok(());
        }
        elevate(model, options, None)
    }

    fn transform_2nd_pass(
        &self,
        model: &mut Model,
        options: &ModelTransformOptions,
        features: &TargetFeatures,
    ) -> Result<(), CoreError> {
        if !options.elevate_properties {
            return Ok(());
        }
        elevate(model, options, Some(features))
    }
}

fn banned_type_diff(diff: DiffKind) -> bool {
    matches!(diff, DiffKind::FundamentalType | DiffKind::IsomorphicType)
}

fn banned_property_diff(diff: PropertyDifference) -> bool {
    [
        PropertyDifference::Name,
        PropertyDifference::Type,
        PropertyDifference::Meta,
        PropertyDifference::Signature,
    ]
    .into_iter()
    .any(|needle| diff.matches(needle))
}

/// Subtypes eligible for elevation: objects extending the supertype.
fn object_subtypes(model: &Model, subtypes: &[TypeId]) -> Option<Vec<TypeId>> {
    subtypes
        .iter()
        .map(|sub| match model.graph.kind(*sub) {
            TypeKind::Object { .. } => Some(*sub),
            _ => None,
        })
        .collect()
}

fn elevate(
    model: &mut Model,
    options: &ModelTransformOptions,
    features: Option<&TargetFeatures>,
) -> Result<(), CoreError> {
    let sub_to_super = sub_to_super_map(model)?;
    let super_to_sub = super_to_sub_map(&sub_to_super);

    for supertype in dependency_order(&super_to_sub) {
        if !matches!(model.graph.kind(supertype), TypeKind::Object { .. }) {
            continue;
        }
        let Some(subtypes) = super_to_sub.get(&supertype).and_then(|s| object_subtypes(model, s)) else {
            continue;
        };
        if subtypes.is_empty() {
            continue;
        }

        // Literal divergence must surface as a narrowing, whatever the target.
        let comparison = TargetFeatures {
            literal_types: false,
            ..features.copied().unwrap_or(TargetFeatures::GENERIC)
        };
        let common = TypeAlgebra::new(&mut model.graph, comparison).common_properties(
            banned_type_diff,
            banned_property_diff,
            &subtypes,
        );

        for (name, info) in common {
            if model.graph.find_property(supertype, &name).is_some() {
                continue;
            }
            if info.is_identical() {
                move_to_supertype(model, supertype, &info);
            } else if info.type_diffs == [DiffKind::NarrowedLiteralType] {
                if let Some(features) = features {
                    declare_abstract(model, supertype, &info, options, features);
                }
            }
        }
    }
    Ok(())
}

fn move_to_supertype(model: &mut Model, supertype: TypeId, info: &CommonProperty) {
    let Some(first) = info.properties.first() else {
        return;
    };
    let mut hoisted = model.graph.property(*first).clone();
    hoisted.owner = supertype;
    model.graph.push_property(hoisted);

    for property in &info.properties {
        let owner = model.graph.property(*property).owner;
        model.graph.remove_property(owner, *property);
    }
    debug!(
        "Elevated property {} from {} subtypes to {}",
        info.name,
        info.properties.len(),
        model.graph.describe(supertype)
    );
}

fn declare_abstract(
    model: &mut Model,
    supertype: TypeId,
    info: &CommonProperty,
    options: &ModelTransformOptions,
    features: &TargetFeatures,
) {
    let ty = if features.literal_types && info.distinct_types.len() < options.literal_union_max_count {
        model.graph.add_kind(TypeKind::Composition {
            composition: CompositionKind::Xor,
            types: info.distinct_types.clone(),
        })
    } else {
        match info.common_type {
            Some(ty) => ty,
            None => return,
        }
    };

    let siblings: Vec<Property> = info
        .properties
        .iter()
        .map(|p| model.graph.property(*p).clone())
        .collect();
    let Some(first) = siblings.first() else {
        return;
    };
    let shared = |get: fn(&Property) -> &Option<String>| {
        let value = get(first);
        siblings.iter().all(|p| get(p) == value).then(|| value.clone()).flatten()
    };

    let mut property = Property::new(info.name.clone(), ty, supertype);
    property.is_abstract = true;
    property.required = siblings.iter().all(|p| p.required);
    property.deprecated = siblings.iter().all(|p| p.deprecated);
    property.description = shared(|p| &p.description);
    property.summary = shared(|p| &p.summary);
    model.graph.push_property(property);

    debug!(
        "Declared abstract property {} on {} over {} literal types",
        info.name,
        model.graph.describe(supertype),
        info.distinct_types.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use polygen_core::types::PrimitiveKind;
    use polygen_core::ModelBuilder;
    use serde_json::json;

    fn literal_features() -> TargetFeatures {
        TargetFeatures {
            literal_types: true,
            ..TargetFeatures::GENERIC
        }
    }

    #[test]
    fn test_chained_elevation_reaches_root() {
        let mut builder = ModelBuilder::new("m");
        let string = builder.primitive(PrimitiveKind::String);
        let root = builder.object("Root");
        let middle = builder.object_extending("Middle", root);
        let sibling = builder.object_extending("Sibling", root);
        let leaf_a = builder.object_extending("LeafA", middle);
        let leaf_b = builder.object_extending("LeafB", middle);
        for owner in [leaf_a, leaf_b, sibling] {
            builder.property(owner, "id", string);
        }
        let mut model = builder.build();

        ElevateProperties
            .transform(&mut model, &ModelTransformOptions::default())
            .unwrap();

        assert!(model.graph.find_property(root, "id").is_some());
        for owner in [middle, sibling, leaf_a, leaf_b] {
            assert!(model.graph.find_property(owner, "id").is_none());
        }
    }

    #[test]
    fn test_differing_types_stay_put() {
        let mut builder = ModelBuilder::new("m");
        let string = builder.primitive(PrimitiveKind::String);
        let int = builder.primitive(PrimitiveKind::Integer);
        let base = builder.object("Base");
        let a = builder.object_extending("A", base);
        let b = builder.object_extending("B", base);
        builder.property(a, "value", string);
        builder.property(b, "value", int);
        let mut model = builder.build();

        ElevateProperties
            .transform(&mut model, &ModelTransformOptions::default())
            .unwrap();
        assert!(model.graph.properties_of(base).is_empty());
        assert_eq!(model.graph.properties_of(a).len(), 1);
    }

    #[test]
    fn test_literal_divergence_declares_union() {
        let mut builder = ModelBuilder::new("m");
        let cat = builder.literal(PrimitiveKind::String, json!("cat"));
        let dog = builder.literal(PrimitiveKind::String, json!("dog"));
        let base = builder.object("Pet");
        let a = builder.object_extending("Cat", base);
        let b = builder.object_extending("Dog", base);
        builder.required_property(a, "kind", cat);
        builder.required_property(b, "kind", dog);
        let mut model = builder.build();

        let options = ModelTransformOptions::default();
        ElevateProperties.transform(&mut model, &options).unwrap();
        assert!(model.graph.properties_of(base).is_empty());

        ElevateProperties
            .transform_2nd_pass(&mut model, &options, &literal_features())
            .unwrap();
        let kind = model.graph.find_property(base, "kind").unwrap();
        let property = model.graph.property(kind);
        assert!(property.is_abstract);
        assert!(property.required);
        assert!(matches!(
            model.graph.kind(property.ty),
            TypeKind::Composition { composition: CompositionKind::Xor, types } if *types == vec![cat, dog]
        ));
        assert!(model.graph.find_property(a, "kind").is_some());
        assert!(model.graph.find_property(b, "kind").is_some());
    }

    #[test]
    fn test_literal_divergence_without_literal_types_uses_common_type() {
        let mut builder = ModelBuilder::new("m");
        let cat = builder.literal(PrimitiveKind::String, json!("cat"));
        let dog = builder.literal(PrimitiveKind::String, json!("dog"));
        let base = builder.object("Pet");
        let a = builder.object_extending("Cat", base);
        let b = builder.object_extending("Dog", base);
        builder.property(a, "kind", cat);
        builder.property(b, "kind", dog);
        let mut model = builder.build();

        ElevateProperties
            .transform_2nd_pass(&mut model, &ModelTransformOptions::default(), &TargetFeatures::GENERIC)
            .unwrap();
        let kind = model.graph.find_property(base, "kind").unwrap();
        assert_eq!(
            model.graph.kind(model.graph.property(kind).ty),
            &TypeKind::primitive(PrimitiveKind::String)
        );
    }

    #[test]
    fn test_disabled_is_noop() {
        let mut builder = ModelBuilder::new("m");
        let string = builder.primitive(PrimitiveKind::String);
        let base = builder.object("Base");
        let a = builder.object_extending("A", base);
        let b = builder.object_extending("B", base);
        builder.property(a, "id", string);
        builder.property(b, "id", string);
        let mut model = builder.build();
        let before = model.clone();

        let options = ModelTransformOptions::disabled();
        ElevateProperties.transform(&mut model, &options).unwrap();
        ElevateProperties
            .transform_2nd_pass(&mut model, &options, &literal_features())
            .unwrap();
        assert_eq!(model, before);
    }
}
