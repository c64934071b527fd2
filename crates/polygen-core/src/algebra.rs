//! Structural comparison of types.
//!
//! [`TypeAlgebra`] answers "what single type can represent both of these,
//! and what had to be given up to get there". The answer is a
//! [`CommonDenominator`]: a type plus the [`DiffKind`]s that were tolerated.
//! Some synthesized nodes (generalized literals, nullable copies, unknowns)
//! are added to the graph even when `create` is off; `create` only governs
//! whether new container types may be built.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::options::TargetFeatures;
use crate::property_algebra::PropertyDifference;
use crate::types::{
    GenericTargetIdentifier, PrimitiveKind, PropertyId, TypeGraph, TypeId, TypeKind, UnknownKind,
};

/// Why two types are not identical, in descending severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffKind {
    /// No common type exists.
    FundamentalType,
    /// Same family, different representation (number vs integer).
    IsomorphicType,
    /// A literal compared to its generalized primitive, or two literals.
    NarrowedLiteralType,
    NoGenericOverlap,
    /// An enum compared to its item primitive.
    NarrowedType,
    IsSupertype,
    Nullability,
    Size,
    Precision,
}

impl DiffKind {
    pub fn severity(self) -> u8 {
        match self {
            DiffKind::FundamentalType => 10,
            DiffKind::IsomorphicType => 9,
            DiffKind::NarrowedLiteralType => 8,
            DiffKind::NoGenericOverlap => 7,
            DiffKind::NarrowedType => 6,
            DiffKind::IsSupertype => 5,
            DiffKind::Nullability => 4,
            DiffKind::Size => 3,
            DiffKind::Precision => 2,
        }
    }

    /// True for diffs that rule out treating two types as interchangeable.
    pub fn is_disqualifying(self) -> bool {
        self.severity() >= DiffKind::NarrowedLiteralType.severity()
    }
}

/// Highest severity in a diff list, `0` when empty.
pub fn max_severity(diffs: &[DiffKind]) -> u8 {
    diffs.iter().map(|d| d.severity()).max().unwrap_or(0)
}

pub(crate) fn merge_diffs(into: &mut Vec<DiffKind>, from: &[DiffKind]) {
    for diff in from {
        if !into.contains(diff) {
            into.push(*diff);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonDenominator {
    pub ty: TypeId,
    pub diffs: Vec<DiffKind>,
}

impl CommonDenominator {
    fn same(ty: TypeId) -> Option<Self> {
        Some(Self { ty, diffs: Vec::new() })
    }

    fn with(ty: TypeId, diffs: Vec<DiffKind>) -> Option<Self> {
        Some(Self { ty, diffs })
    }
}

/// Which operand of a widening table row wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pick {
    Left,
    Right,
}

/// Widening rule from `a` to `b`. Only one direction is encoded per pair;
/// callers try both.
fn widening(a: PrimitiveKind, b: PrimitiveKind) -> Option<(Pick, &'static [DiffKind])> {
    use DiffKind::{IsomorphicType, Precision, Size};
    use PrimitiveKind::*;
    const SIZE: &[DiffKind] = &[Size];
    const PRECISION: &[DiffKind] = &[Precision];
    const BOTH: &[DiffKind] = &[Size, Precision];
    const ISOMORPHIC: &[DiffKind] = &[IsomorphicType];

    let rule = match (a, b) {
        (IntegerSmall, Integer | Long) => (Pick::Right, SIZE),
        (IntegerSmall, Float | Double | Decimal) => (Pick::Right, BOTH),
        (Integer, IntegerSmall) => (Pick::Left, SIZE),
        (Integer, Long) => (Pick::Right, SIZE),
        (Integer, Float) => (Pick::Right, PRECISION),
        (Integer, Double | Decimal) => (Pick::Right, BOTH),
        (Long, IntegerSmall | Integer) => (Pick::Left, SIZE),
        (Long, Float) => (Pick::Left, BOTH),
        (Long, Double | Decimal) => (Pick::Right, PRECISION),
        (Float, IntegerSmall) => (Pick::Left, BOTH),
        (Float, Integer) => (Pick::Left, PRECISION),
        (Float, Double | Decimal) => (Pick::Right, BOTH),
        (Decimal, IntegerSmall | Integer | Float | Double) => (Pick::Left, BOTH),
        (Number, other) if other.is_numeric() => (Pick::Left, ISOMORPHIC),
        (Char, String) => (Pick::Right, SIZE),
        _ => return None,
    };
    Some(rule)
}

/// Structural type comparison over a mutable graph.
pub struct TypeAlgebra<'g> {
    graph: &'g mut TypeGraph,
    features: TargetFeatures,
    in_progress: Vec<(TypeId, TypeId)>,
}

impl<'g> TypeAlgebra<'g> {
    pub fn new(graph: &'g mut TypeGraph, features: TargetFeatures) -> Self {
        Self {
            graph,
            features,
            in_progress: Vec::new(),
        }
    }

    pub fn graph(&self) -> &TypeGraph {
        self.graph
    }

    pub fn graph_mut(&mut self) -> &mut TypeGraph {
        self.graph
    }

    pub fn features(&self) -> TargetFeatures {
        self.features
    }

    /// Differences between two types; `[FundamentalType]` when they share nothing.
    pub fn diff(&mut self, a: TypeId, b: TypeId) -> Vec<DiffKind> {
        if a == b {
            return Vec::new();
        }
        match self.common_denominator_between(a, b, false) {
            Some(common) => common.diffs,
            None => vec![DiffKind::FundamentalType],
        }
    }

    /// Fold the pairwise common denominator over `types`.
    ///
    /// Keeps the most severe diff set seen; a fundamental difference aborts.
    pub fn common_denominator(&mut self, types: &[TypeId], create: bool) -> Option<CommonDenominator> {
        let (first, rest) = types.split_first()?;
        let mut common = CommonDenominator {
            ty: *first,
            diffs: Vec::new(),
        };
        for ty in rest {
            let next = self.common_denominator_between(common.ty, *ty, create)?;
            if next.diffs.contains(&DiffKind::FundamentalType) {
                return None;
            }
            common.ty = next.ty;
            if max_severity(&next.diffs) > max_severity(&common.diffs) {
                common.diffs = next.diffs;
            }
        }
        Some(common)
    }

    /// Representatives of `types`; a type joins an existing bucket when their
    /// common denominator has no diff that `allowed` rejects.
    pub fn distinct_types<F>(&mut self, types: &[TypeId], allowed: F) -> Vec<TypeId>
    where
        F: Fn(DiffKind) -> bool,
    {
        let mut distinct: Vec<TypeId> = Vec::new();
        for ty in types {
            let mut matched = false;
            for existing in &distinct {
                let existing = *existing;
                if existing == *ty {
                    matched = true;
                    break;
                }
                if let Some(common) = self.common_denominator_between(existing, *ty, false) {
                    if common.diffs.iter().all(|d| allowed(*d)) {
                        matched = true;
                        break;
                    }
                }
            }
            if !matched {
                distinct.push(*ty);
            }
        }
        distinct
    }

    /// Common denominator of two types, or `None` when they cannot be unified.
    pub fn common_denominator_between(
        &mut self,
        a: TypeId,
        b: TypeId,
        create: bool,
    ) -> Option<CommonDenominator> {
        if a == b {
            return CommonDenominator::same(a);
        }
        let ua = self.graph.unwrap(a);
        let ub = self.graph.unwrap(b);
        if ua == ub {
            return CommonDenominator::same(a);
        }
        // Recursive structures compare equal while the pair is being decided.
        if self.in_progress.contains(&(ua, ub)) {
            return CommonDenominator::same(a);
        }
        self.in_progress.push((ua, ub));
        let result = self.between(ua, ub, create);
        self.in_progress.pop();
        result
    }

    fn between(&mut self, a: TypeId, b: TypeId, create: bool) -> Option<CommonDenominator> {
        let kind_a = self.graph.kind(a).clone();
        let kind_b = self.graph.kind(b).clone();

        match (&kind_a, &kind_b) {
            (TypeKind::Primitive { .. }, TypeKind::Primitive { .. }) => {
                return self.primitive_common(a, b);
            }
            (TypeKind::HardcodedReference { fqn: fa }, TypeKind::HardcodedReference { fqn: fb }) => {
                return if fa == fb { CommonDenominator::same(a) } else { None };
            }
            (TypeKind::Enum { .. }, TypeKind::Enum { .. }) => {
                let name_a = self.graph.meta(a).name.as_ref().and_then(|n| n.primary());
                let name_b = self.graph.meta(b).name.as_ref().and_then(|n| n.primary());
                return match (name_a, name_b) {
                    (Some(x), Some(y)) if x == y => CommonDenominator::same(a),
                    _ => None,
                };
            }
            (
                TypeKind::Dictionary { key: ka, value: va },
                TypeKind::Dictionary { key: kb, value: vb },
            ) => return self.dictionary_common(a, (*ka, *va), (*kb, *vb), create),
            (TypeKind::Array { of: ea }, TypeKind::Array { of: eb }) => {
                return self.array_common(a, *ea, *eb, create);
            }
            (TypeKind::Unknown { .. }, TypeKind::Unknown { .. }) => return CommonDenominator::same(a),
            (
                TypeKind::PositionalProperties { properties: pa },
                TypeKind::PositionalProperties { properties: pb },
            ) => {
                return if self.positional_matches(pa, pb) {
                    CommonDenominator::same(a)
                } else {
                    None
                };
            }
            _ => {}
        }

        let a_is_object = matches!(kind_a, TypeKind::Object { .. });
        let b_is_object = matches!(kind_b, TypeKind::Object { .. });
        if a_is_object && b_is_object {
            if let Some(common) = self.object_common(a, b) {
                return Some(common);
            }
        }
        if a_is_object || b_is_object {
            return self.object_with_other(a, b, create);
        }

        match (&kind_a, &kind_b) {
            (TypeKind::GenericTarget { .. }, TypeKind::GenericTarget { .. }) => {
                self.generic_target_common(a, b, create)
            }
            (TypeKind::Enum { item_kind, .. }, TypeKind::Primitive { primitive, .. })
                if item_kind == primitive =>
            {
                CommonDenominator::with(b, vec![DiffKind::NarrowedType])
            }
            (TypeKind::Primitive { primitive, .. }, TypeKind::Enum { item_kind, .. })
                if item_kind == primitive =>
            {
                CommonDenominator::with(a, vec![DiffKind::NarrowedType])
            }
            _ => None,
        }
    }

    fn primitive_common(&mut self, a: TypeId, b: TypeId) -> Option<CommonDenominator> {
        let (kind_a, nullable_a, literal_a, value_a) = primitive_parts(self.graph.kind(a))?;
        let (kind_b, nullable_b, literal_b, value_b) = primitive_parts(self.graph.kind(b))?;

        if kind_a == kind_b && nullable_a == nullable_b && literal_a == literal_b && value_a == value_b {
            return CommonDenominator::same(a);
        }

        let (mut ty, mut diffs) = if kind_a == kind_b {
            // Prefer the nullable operand so nullability reconciles below.
            (if nullable_b && !nullable_a { b } else { a }, Vec::new())
        } else if let Some((pick, rule)) = widening(kind_a, kind_b) {
            (if pick == Pick::Left { a } else { b }, rule.to_vec())
        } else if let Some((pick, rule)) = widening(kind_b, kind_a) {
            (if pick == Pick::Left { b } else { a }, rule.to_vec())
        } else {
            return None;
        };

        if nullable_a != nullable_b {
            let nullable_side = if nullable_a { a } else { b };
            if ty != nullable_side {
                return None;
            }
            diffs.push(DiffKind::Nullability);
        }

        if literal_a != literal_b || value_a != value_b {
            if literal_a && literal_b && self.features.literal_types {
                return None;
            }
            // Reuse an operand that already is the generalized form.
            let plain = [(a, literal_a, &value_a), (b, literal_b, &value_b)]
                .into_iter()
                .find(|(_, literal, value)| !literal && value.is_none())
                .map(|(id, _, _)| id)
                .filter(|id| self.same_primitive_shape(*id, ty));
            ty = match plain {
                Some(id) => id,
                None => self.generalized(ty),
            };
            diffs.push(DiffKind::NarrowedLiteralType);
        }

        CommonDenominator::with(ty, diffs)
    }

    fn same_primitive_shape(&self, x: TypeId, y: TypeId) -> bool {
        match (primitive_parts(self.graph.kind(x)), primitive_parts(self.graph.kind(y))) {
            (Some((kx, nx, _, _)), Some((ky, ny, _, _))) => kx == ky && nx == ny,
            _ => false,
        }
    }

    /// A copy of a primitive without literal flag or constant value.
    fn generalized(&mut self, id: TypeId) -> TypeId {
        match self.graph.kind(id) {
            TypeKind::Primitive {
                literal: false,
                value: None,
                ..
            } => id,
            TypeKind::Primitive {
                primitive,
                nullable,
                ..
            } => {
                let kind = TypeKind::Primitive {
                    primitive: *primitive,
                    nullable: *nullable,
                    literal: false,
                    value: None,
                };
                self.graph.add_kind(kind)
            }
            _ => id,
        }
    }

    fn dictionary_common(
        &mut self,
        a: TypeId,
        (key_a, value_a): (TypeId, TypeId),
        (key_b, value_b): (TypeId, TypeId),
        create: bool,
    ) -> Option<CommonDenominator> {
        let key = self.common_denominator_between(key_a, key_b, create)?;
        let value = self.common_denominator_between(value_a, value_b, create)?;
        let mut diffs = key.diffs.clone();
        merge_diffs(&mut diffs, &value.diffs);

        if key.ty == key_a && value.ty == value_a {
            return CommonDenominator::with(a, diffs);
        }
        if !create {
            return None;
        }
        let ty = self.graph.add_kind(TypeKind::Dictionary {
            key: key.ty,
            value: value.ty,
        });
        CommonDenominator::with(ty, diffs)
    }

    fn array_common(&mut self, a: TypeId, of_a: TypeId, of_b: TypeId, create: bool) -> Option<CommonDenominator> {
        let element = self.common_denominator_between(of_a, of_b, create)?;
        if element.ty == of_a {
            return CommonDenominator::with(a, element.diffs);
        }
        if !create {
            return None;
        }
        let ty = self.graph.add_kind(TypeKind::Array { of: element.ty });
        CommonDenominator::with(ty, element.diffs)
    }

    fn positional_matches(&mut self, a: &[PropertyId], b: &[PropertyId]) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).all(|(pa, pb)| {
            let equality = self.property_equality(*pa, *pb);
            equality.common_type.is_some()
                && !equality.type_diffs.iter().any(|d| d.is_disqualifying())
                && equality.property_diffs.is_empty()
        })
    }

    fn object_common(&mut self, a: TypeId, b: TypeId) -> Option<CommonDenominator> {
        let (props_a, ext_a, additional_a) = object_parts(self.graph.kind(a))?;
        let (props_b, ext_b, additional_b) = object_parts(self.graph.kind(b))?;
        if props_a.len() != props_b.len() || ext_a != ext_b || additional_a != additional_b {
            return None;
        }

        let mut diffs = Vec::new();
        for (pa, pb) in props_a.iter().zip(&props_b) {
            let equality = self.property_equality(*pa, *pb);
            if equality.type_diffs.iter().any(|d| d.is_disqualifying()) {
                return None;
            }
            if equality
                .property_diffs
                .iter()
                .any(|d| matches!(d, PropertyDifference::Name | PropertyDifference::Type))
            {
                return None;
            }
            merge_diffs(&mut diffs, &equality.type_diffs);
        }

        let named_alike = match (&self.graph.meta(a).name, &self.graph.meta(b).name) {
            (Some(name_a), Some(name_b)) => name_a.overlaps(name_b),
            _ => false,
        };
        if !named_alike {
            return None;
        }
        CommonDenominator::with(a, diffs)
    }

    fn object_with_other(&mut self, a: TypeId, b: TypeId, create: bool) -> Option<CommonDenominator> {
        for (object, other, object_is_b) in [(b, a, true), (a, b, false)] {
            if let TypeKind::Object {
                extended_by: Some(parent),
                ..
            } = self.graph.kind(object)
            {
                let parent = *parent;
                let found = if object_is_b {
                    self.common_denominator_between(other, parent, create)
                } else {
                    self.common_denominator_between(parent, other, create)
                };
                let found = found.filter(|c| !c.diffs.contains(&DiffKind::FundamentalType));
                if let Some(mut common) = found {
                    merge_diffs(&mut common.diffs, &[DiffKind::IsSupertype]);
                    return Some(common);
                }
            }
        }
        if create {
            let unknown = self.graph.add_kind(TypeKind::unknown(UnknownKind::Wildcard));
            return CommonDenominator::with(unknown, vec![DiffKind::FundamentalType]);
        }
        None
    }

    fn generic_target_common(&mut self, a: TypeId, b: TypeId, create: bool) -> Option<CommonDenominator> {
        let (source_a, ids_a) = match self.graph.kind(a) {
            TypeKind::GenericTarget {
                source,
                target_identifiers,
            } => (*source, target_identifiers.clone()),
            _ => return None,
        };
        let (source_b, ids_b) = match self.graph.kind(b) {
            TypeKind::GenericTarget {
                source,
                target_identifiers,
            } => (*source, target_identifiers.clone()),
            _ => return None,
        };
        if source_a != source_b || ids_a.len() != ids_b.len() {
            return None;
        }

        let mut diffs = Vec::new();
        let mut bindings = Vec::with_capacity(ids_a.len());
        for id_a in &ids_a {
            let id_b = ids_b
                .iter()
                .find(|candidate| candidate.source_identifier == id_a.source_identifier)?;
            let ty = match self.common_denominator_between(id_a.ty, id_b.ty, create) {
                Some(common) => {
                    merge_diffs(&mut diffs, &common.diffs);
                    common.ty
                }
                None => {
                    merge_diffs(&mut diffs, &[DiffKind::NoGenericOverlap]);
                    self.graph.add_kind(TypeKind::unknown(UnknownKind::Wildcard))
                }
            };
            bindings.push(GenericTargetIdentifier {
                source_identifier: id_a.source_identifier,
                ty,
            });
        }

        if bindings.iter().zip(&ids_a).all(|(new, old)| new.ty == old.ty) {
            return CommonDenominator::with(a, diffs);
        }
        let ty = self.graph.add_kind(TypeKind::GenericTarget {
            source: source_a,
            target_identifiers: bindings,
        });
        CommonDenominator::with(ty, diffs)
    }
}

fn primitive_parts(kind: &TypeKind) -> Option<(PrimitiveKind, bool, bool, Option<Value>)> {
    match kind {
        TypeKind::Primitive {
            primitive,
            nullable,
            literal,
            value,
        } => Some((*primitive, *nullable, *literal, value.clone())),
        _ => None,
    }
}

fn object_parts(kind: &TypeKind) -> Option<(Vec<PropertyId>, Option<TypeId>, bool)> {
    match kind {
        TypeKind::Object {
            properties,
            extended_by,
            additional_properties,
            ..
        } => Some((properties.clone(), *extended_by, *additional_properties)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ModelBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn literal_features() -> TargetFeatures {
        TargetFeatures {
            literal_types: true,
            ..TargetFeatures::GENERIC
        }
    }

    #[test]
    fn test_diff_integer_widening() {
        let mut builder = ModelBuilder::new("m");
        let int = builder.primitive(PrimitiveKind::Integer);
        let long = builder.primitive(PrimitiveKind::Long);
        let double = builder.primitive(PrimitiveKind::Double);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        assert_eq!(algebra.diff(int, double), vec![DiffKind::Size, DiffKind::Precision]);
        assert_eq!(algebra.diff(int, long), vec![DiffKind::Size]);
        assert_eq!(algebra.diff(double, int), vec![DiffKind::Size, DiffKind::Precision]);
        assert_eq!(algebra.common_denominator_between(int, long, false).unwrap().ty, long);
    }

    #[test]
    fn test_number_absorbs_numerics() {
        let mut builder = ModelBuilder::new("m");
        let number = builder.primitive(PrimitiveKind::Number);
        let float = builder.primitive(PrimitiveKind::Float);
        let string = builder.primitive(PrimitiveKind::String);
        let ch = builder.primitive(PrimitiveKind::Char);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        let common = algebra.common_denominator_between(float, number, false).unwrap();
        assert_eq!(common.ty, number);
        assert_eq!(common.diffs, vec![DiffKind::IsomorphicType]);

        let common = algebra.common_denominator_between(ch, string, false).unwrap();
        assert_eq!(common.ty, string);
        assert_eq!(algebra.diff(string, number), vec![DiffKind::FundamentalType]);
    }

    #[test]
    fn test_literal_strings_generalize_without_literal_types() {
        let mut builder = ModelBuilder::new("m");
        let a = builder.literal(PrimitiveKind::String, json!("a"));
        let b = builder.literal(PrimitiveKind::String, json!("b"));
        let mut model = builder.build();

        {
            let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);
            let common = algebra.common_denominator_between(a, b, false).unwrap();
            assert_eq!(common.diffs, vec![DiffKind::NarrowedLiteralType]);
            assert_eq!(
                algebra.graph().kind(common.ty),
                &TypeKind::primitive(PrimitiveKind::String)
            );
        }

        let mut algebra = TypeAlgebra::new(&mut model.graph, literal_features());
        assert!(algebra.common_denominator_between(a, b, false).is_none());
        assert_eq!(algebra.diff(a, b), vec![DiffKind::FundamentalType]);
    }

    #[test]
    fn test_literal_against_plain_narrows_under_literal_types() {
        let mut builder = ModelBuilder::new("m");
        let a = builder.literal(PrimitiveKind::String, json!("a"));
        let plain = builder.primitive(PrimitiveKind::String);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, literal_features());

        let common = algebra.common_denominator_between(a, plain, false).unwrap();
        assert_eq!(common.ty, plain);
        assert_eq!(common.diffs, vec![DiffKind::NarrowedLiteralType]);
    }

    #[test]
    fn test_nullability_reconciled() {
        let mut builder = ModelBuilder::new("m");
        let int = builder.primitive(PrimitiveKind::Integer);
        let nullable_int = builder.nullable(PrimitiveKind::Integer);
        let nullable_long = builder.nullable(PrimitiveKind::Long);
        let nullable_small = builder.nullable(PrimitiveKind::IntegerSmall);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        let common = algebra.common_denominator_between(int, nullable_int, false).unwrap();
        assert_eq!(common.ty, nullable_int);
        assert_eq!(common.diffs, vec![DiffKind::Nullability]);

        let common = algebra.common_denominator_between(int, nullable_long, false).unwrap();
        assert_eq!(common.ty, nullable_long);
        assert_eq!(common.diffs, vec![DiffKind::Size, DiffKind::Nullability]);

        // The wider side is not the nullable one.
        assert!(algebra.common_denominator_between(nullable_small, int, false).is_none());
    }

    #[test]
    fn test_arrays_and_dictionaries_respect_create() {
        let mut builder = ModelBuilder::new("m");
        let int = builder.primitive(PrimitiveKind::Integer);
        let long = builder.primitive(PrimitiveKind::Long);
        let string = builder.primitive(PrimitiveKind::String);
        let ints = builder.array(int);
        let longs = builder.array(long);
        let by_int = builder.dictionary(string, int);
        let by_long = builder.dictionary(string, long);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        assert!(algebra.common_denominator_between(ints, longs, false).is_none());
        let common = algebra.common_denominator_between(ints, longs, true).unwrap();
        assert_eq!(algebra.graph().kind(common.ty), &TypeKind::Array { of: long });
        assert_eq!(common.diffs, vec![DiffKind::Size]);

        let common = algebra.common_denominator_between(by_long, by_int, false).unwrap();
        assert_eq!(common.ty, by_long);
        assert!(algebra.common_denominator_between(by_int, by_long, false).is_none());
        let common = algebra.common_denominator_between(by_int, by_long, true).unwrap();
        assert_eq!(
            algebra.graph().kind(common.ty),
            &TypeKind::Dictionary { key: string, value: long }
        );
    }

    #[test]
    fn test_objects_compare_structurally_by_name() {
        let mut builder = ModelBuilder::new("m");
        let string = builder.primitive(PrimitiveKind::String);
        let a = builder.object("Pet");
        builder.property(a, "name", string);
        let b = builder.object("Pet");
        builder.property(b, "name", string);
        let c = builder.object("Car");
        builder.property(c, "name", string);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        assert_eq!(algebra.common_denominator_between(a, b, false).unwrap().ty, a);
        assert!(algebra.common_denominator_between(a, c, false).is_none());
    }

    #[test]
    fn test_object_supertype_fallback() {
        let mut builder = ModelBuilder::new("m");
        let base = builder.object("Base");
        let a = builder.object_extending("A", base);
        let b = builder.object_extending("B", base);
        let string = builder.primitive(PrimitiveKind::String);
        builder.property(a, "x", string);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        let common = algebra.common_denominator_between(a, b, false).unwrap();
        assert_eq!(common.ty, base);
        assert!(common.diffs.contains(&DiffKind::IsSupertype));

        let common = algebra.common_denominator_between(a, string, true).unwrap();
        assert!(matches!(algebra.graph().kind(common.ty), TypeKind::Unknown { .. }));
        assert_eq!(common.diffs, vec![DiffKind::FundamentalType]);
    }

    #[test]
    fn test_recursive_objects_terminate() {
        let mut builder = ModelBuilder::new("m");
        let a = builder.object("Node");
        builder.property(a, "next", a);
        let b = builder.object("Node");
        builder.property(b, "next", b);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        assert_eq!(algebra.common_denominator_between(a, b, false).unwrap().ty, a);
    }

    #[test]
    fn test_enum_against_item_primitive() {
        let mut builder = ModelBuilder::new("m");
        let color = builder.enumeration("Color", PrimitiveKind::String, &[json!("red")]);
        let string = builder.primitive(PrimitiveKind::String);
        let int = builder.primitive(PrimitiveKind::Integer);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        let common = algebra.common_denominator_between(color, string, false).unwrap();
        assert_eq!(common.ty, string);
        assert_eq!(common.diffs, vec![DiffKind::NarrowedType]);
        assert!(algebra.common_denominator_between(color, int, false).is_none());
    }

    #[test]
    fn test_generic_targets_without_overlap_become_unknown() {
        let mut builder = ModelBuilder::new("m");
        let wrapped = builder.object("Box");
        let t = builder.add(TypeKind::GenericSourceIdentifier {
            placeholder: "T".to_string(),
            lower_bound: None,
            upper_bound: None,
        });
        let source = builder.add(TypeKind::GenericSource {
            of: wrapped,
            source_identifiers: vec![t],
        });
        let string = builder.primitive(PrimitiveKind::String);
        let int = builder.primitive(PrimitiveKind::Integer);
        let bind = |ty| TypeKind::GenericTarget {
            source,
            target_identifiers: vec![GenericTargetIdentifier {
                source_identifier: t,
                ty,
            }],
        };
        let of_string = builder.add(bind(string));
        let of_int = builder.add(bind(int));
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        let common = algebra.common_denominator_between(of_string, of_int, false).unwrap();
        assert_eq!(common.diffs, vec![DiffKind::NoGenericOverlap]);
        match algebra.graph().kind(common.ty) {
            TypeKind::GenericTarget {
                target_identifiers, ..
            } => assert!(matches!(
                algebra.graph().kind(target_identifiers[0].ty),
                TypeKind::Unknown { .. }
            )),
            other => panic!("expected generic target, got {:?}", other),
        }
    }

    #[test]
    fn test_fold_aborts_on_fundamental() {
        let mut builder = ModelBuilder::new("m");
        let int = builder.primitive(PrimitiveKind::Integer);
        let long = builder.primitive(PrimitiveKind::Long);
        let double = builder.primitive(PrimitiveKind::Double);
        let string = builder.primitive(PrimitiveKind::String);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        let common = algebra.common_denominator(&[int, long, double], false).unwrap();
        assert_eq!(common.ty, double);
        assert_eq!(common.diffs, vec![DiffKind::Size]);
        assert!(algebra.common_denominator(&[int, string], false).is_none());
    }

    #[test]
    fn test_distinct_types() {
        let mut builder = ModelBuilder::new("m");
        let int = builder.primitive(PrimitiveKind::Integer);
        let int2 = builder.primitive(PrimitiveKind::Integer);
        let long = builder.primitive(PrimitiveKind::Long);
        let string = builder.primitive(PrimitiveKind::String);
        let mut model = builder.build();
        let mut algebra = TypeAlgebra::new(&mut model.graph, TargetFeatures::GENERIC);

        assert_eq!(algebra.distinct_types(&[int, int2, long, string], |_| false), vec![int, long, string]);
        assert_eq!(
            algebra.distinct_types(&[int, long, string], |d| d == DiffKind::Size),
            vec![int, string]
        );
    }
}
