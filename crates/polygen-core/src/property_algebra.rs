//! Property-level equality built on [`TypeAlgebra`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::algebra::{merge_diffs, DiffKind, TypeAlgebra};
use crate::types::{PropertyId, TypeId};

/// Why two properties are not interchangeable, in descending severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyDifference {
    Name,
    FieldName,
    /// Never reported directly; matched by [`PropertyDifference::Signature`].
    Type,
    /// Groups every difference that changes how the property is declared.
    Signature,
    Required,
    Meta,
}

impl PropertyDifference {
    pub fn severity(self) -> u8 {
        match self {
            PropertyDifference::Name => 10,
            PropertyDifference::FieldName => 9,
            PropertyDifference::Type => 8,
            PropertyDifference::Signature => 7,
            PropertyDifference::Required => 6,
            PropertyDifference::Meta => 5,
        }
    }

    /// Whether this difference is covered by `needle`.
    pub fn matches(self, needle: PropertyDifference) -> bool {
        self == needle
            || (needle == PropertyDifference::Signature
                && matches!(
                    self,
                    PropertyDifference::Type | PropertyDifference::Name | PropertyDifference::Meta
                ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEquality {
    /// `None` when the property types share no common type.
    pub common_type: Option<TypeId>,
    pub property_diffs: Vec<PropertyDifference>,
    pub type_diffs: Vec<DiffKind>,
}

/// A property name present on every compared owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonProperty {
    pub name: String,
    /// One property per owner, in owner order.
    pub properties: Vec<PropertyId>,
    pub property_diffs: Vec<PropertyDifference>,
    pub type_diffs: Vec<DiffKind>,
    pub common_type: Option<TypeId>,
    pub distinct_types: Vec<TypeId>,
}

impl CommonProperty {
    /// True when every owner declares this property identically.
    pub fn is_identical(&self) -> bool {
        self.property_diffs.is_empty() && self.type_diffs.is_empty()
    }
}

impl TypeAlgebra<'_> {
    /// Compare two properties. The first non-type mismatch short-circuits.
    pub fn property_equality(&mut self, a: PropertyId, b: PropertyId) -> PropertyEquality {
        if a == b {
            return PropertyEquality {
                common_type: Some(self.graph().property(a).ty),
                property_diffs: Vec::new(),
                type_diffs: Vec::new(),
            };
        }
        let pa = self.graph().property(a).clone();
        let pb = self.graph().property(b).clone();
        if pa.name != pb.name {
            return PropertyEquality {
                common_type: None,
                property_diffs: vec![PropertyDifference::Name],
                type_diffs: Vec::new(),
            };
        }

        let (common_type, type_diffs) = match self.common_denominator_between(pa.ty, pb.ty, false) {
            Some(common) => (Some(common.ty), common.diffs),
            None => (None, vec![DiffKind::FundamentalType]),
        };

        let mismatch = if pa.required != pb.required {
            Some(PropertyDifference::Required)
        } else if pa.property_name != pb.property_name || pa.field_name != pb.field_name {
            Some(PropertyDifference::FieldName)
        } else if pa.description != pb.description {
            Some(PropertyDifference::Meta)
        } else {
            None
        };

        PropertyEquality {
            common_type,
            property_diffs: mismatch.into_iter().collect(),
            type_diffs,
        }
    }

    /// Properties shared by name across all `owners`, keyed by name in the
    /// first owner's declaration order.
    ///
    /// A name is dropped when any adjacent pair of its properties shows a
    /// banned type or property difference.
    pub fn common_properties<T, P>(
        &mut self,
        banned_type_diff: T,
        banned_property_diff: P,
        owners: &[TypeId],
    ) -> IndexMap<String, CommonProperty>
    where
        T: Fn(DiffKind) -> bool,
        P: Fn(PropertyDifference) -> bool,
    {
        let mut result = IndexMap::new();
        let Some((first, rest)) = owners.split_first() else {
            return result;
        };

        let names: Vec<String> = self
            .graph()
            .properties_of(*first)
            .iter()
            .map(|p| self.graph().property(*p).name.clone())
            .filter(|name| rest.iter().all(|o| self.graph().find_property(*o, name).is_some()))
            .collect();

        'names: for name in names {
            let properties: Vec<PropertyId> = owners
                .iter()
                .filter_map(|o| self.graph().find_property(*o, &name))
                .collect();

            let mut property_diffs = Vec::new();
            let mut type_diffs = Vec::new();
            let mut possible_types = Vec::new();
            let mut unifiable = true;
            for pair in properties.windows(2) {
                let equality = self.property_equality(pair[0], pair[1]);
                if equality.property_diffs.iter().any(|d| banned_property_diff(*d))
                    || equality.type_diffs.iter().any(|d| banned_type_diff(*d))
                {
                    continue 'names;
                }
                for diff in equality.property_diffs {
                    if !property_diffs.contains(&diff) {
                        property_diffs.push(diff);
                    }
                }
                merge_diffs(&mut type_diffs, &equality.type_diffs);
                match equality.common_type {
                    Some(ty) => possible_types.push(ty),
                    None => unifiable = false,
                }
            }
            if let Some(last) = properties.last() {
                possible_types.push(self.graph().property(*last).ty);
            }

            // A pair without a common type leaves the whole set without one.
            let folded = if unifiable {
                self.common_denominator(&possible_types, false)
            } else {
                None
            };
            let common_type = match folded {
                Some(common) => {
                    merge_diffs(&mut type_diffs, &common.diffs);
                    Some(common.ty)
                }
                None => None,
            };

            let property_types: Vec<TypeId> =
                properties.iter().map(|p| self.graph().property(*p).ty).collect();
            let distinct_types = self.distinct_types(&property_types, |_| false);

            result.insert(
                name.clone(),
                CommonProperty {
                    name,
                    properties,
                    property_diffs,
                    type_diffs,
                    common_type,
                    distinct_types,
                },
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ModelBuilder;
    use crate::options::TargetFeatures;
    use crate::types::PrimitiveKind;
    use serde_json::json;

    #[test]
    fn test_signature_matches_declaration_diffs() {
        assert!(PropertyDifference::Type.matches(PropertyDifference::Signature));
        assert!(PropertyDifference::Meta.matches(PropertyDifference::Signature));
        assert!(!PropertyDifference::Required.matches(PropertyDifference::Signature));
        assert!(PropertyDifference::Required.matches(PropertyDifference::Required));
    }

    #[test]
    fn test_property_equality_short_circuits() {
        let mut builder = ModelBuilder::new("m");
        let string = builder.primitive(PrimitiveKind::String);
        let a = builder.object("A");
        let b = builder.object("B");
        let name_a = builder.required_property(a, "name", string);
        let name_b = builder.property(b, "name", string);
        let other = builder.property(b, "other", string);
        let mut model = builder.build();
        model.graph.property_mut(name_b).description = Some("differs".to_string());
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        let equality = algebra.property_equality(name_a, name_b);
        assert_eq!(equality.property_diffs, vec![PropertyDifference::Required]);
        assert_eq!(equality.common_type, Some(string));

        let equality = algebra.property_equality(name_a, other);
        assert_eq!(equality.property_diffs, vec![PropertyDifference::Name]);
        assert!(equality.common_type.is_none());
    }

    #[test]
    fn test_property_equality_without_common_type() {
        let mut builder = ModelBuilder::new("m");
        let string = builder.primitive(PrimitiveKind::String);
        let int = builder.primitive(PrimitiveKind::Integer);
        let a = builder.object("A");
        let b = builder.object("B");
        let pa = builder.property(a, "value", string);
        let pb = builder.property(b, "value", int);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        let equality = algebra.property_equality(pa, pb);
        assert_eq!(equality.common_type, None);
        assert_eq!(equality.type_diffs, vec![DiffKind::FundamentalType]);
        assert!(equality.property_diffs.is_empty());
    }

    #[test]
    fn test_common_properties_intersects_names() {
        let mut builder = ModelBuilder::new("m");
        let string = builder.primitive(PrimitiveKind::String);
        let int = builder.primitive(PrimitiveKind::Integer);
        let long = builder.primitive(PrimitiveKind::Long);
        let a = builder.object("A");
        let b = builder.object("B");
        builder.property(a, "id", int);
        builder.property(a, "only_a", string);
        builder.property(a, "name", string);
        builder.property(b, "name", string);
        builder.property(b, "id", long);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        let common = algebra.common_properties(|_| false, |_| false, &[a, b]);
        assert_eq!(common.keys().collect::<Vec<_>>(), vec!["id", "name"]);

        let id = &common["id"];
        assert_eq!(id.common_type, Some(long));
        assert_eq!(id.type_diffs, vec![DiffKind::Size]);
        assert_eq!(id.distinct_types, vec![int, long]);
        assert!(common["name"].is_identical());
        assert_eq!(common["name"].distinct_types, vec![string]);
    }

    #[test]
    fn test_common_properties_banned_diffs_exclude() {
        let mut builder = ModelBuilder::new("m");
        let x = builder.literal(PrimitiveKind::String, json!("x"));
        let y = builder.literal(PrimitiveKind::String, json!("y"));
        let int = builder.primitive(PrimitiveKind::Integer);
        let string = builder.primitive(PrimitiveKind::String);
        let a = builder.object("A");
        let b = builder.object("B");
        builder.property(a, "kind", x);
        builder.property(b, "kind", y);
        builder.property(a, "value", int);
        builder.property(b, "value", string);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        let common = algebra.common_properties(
            |d| matches!(d, DiffKind::FundamentalType | DiffKind::IsomorphicType),
            |d| d.matches(PropertyDifference::Signature),
            &[a, b],
        );
        assert_eq!(common.len(), 1);
        let kind = &common["kind"];
        assert_eq!(kind.type_diffs, vec![DiffKind::NarrowedLiteralType]);
        assert_eq!(kind.distinct_types, vec![x, y]);
    }

    #[test]
    fn test_common_properties_without_common_type() {
        let mut builder = ModelBuilder::new("m");
        let int = builder.primitive(PrimitiveKind::Integer);
        let string = builder.primitive(PrimitiveKind::String);
        let a = builder.object("A");
        let b = builder.object("B");
        let c = builder.object("C");
        builder.property(a, "v", int);
        builder.property(b, "v", string);
        builder.property(c, "v", string);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        let common = algebra.common_properties(|_| false, |_| false, &[a, b, c]);
        let v = &common["v"];
        assert_eq!(v.type_diffs, vec![DiffKind::FundamentalType]);
        assert_eq!(v.common_type, None);
        assert_eq!(v.distinct_types, vec![int, string]);
    }
}
