//! Replace every reference to one type with another below an owner.

use std::collections::HashSet;

use tracing::debug;

use crate::error::CoreError;
use crate::hierarchy::{as_super_type, is_generic_super_type, is_super_type_capable};
use crate::ir::{Model, TypeOwner};
use crate::types::{PropertyId, TypeId, TypeKind};

/// Replace `from` with `to` in every slot reachable from `owner`.
///
/// `max_depth` counts type hops below the owner; `0` only touches the
/// owner's own slots. The walk never enters `from` or `to` themselves.
/// Returns whether any slot changed.
///
/// An object's `extended_by` is left alone when `to` cannot be a supertype.
/// Replacements that would break a generic source, a generic target or an
/// interface are rejected with [`CoreError::InvalidSubstitution`].
pub fn substitute(
    model: &mut Model,
    owner: TypeOwner,
    from: TypeId,
    to: TypeId,
    max_depth: usize,
) -> Result<bool, CoreError> {
    if from == to {
        return Ok(false);
    }
    let mut substitution = Substitution {
        from,
        to,
        max_depth,
        visited: HashSet::new(),
    };
    substitution.in_owner(model, owner, 0)
}

struct Substitution {
    from: TypeId,
    to: TypeId,
    max_depth: usize,
    visited: HashSet<TypeId>,
}

fn swap_slot(slot: &mut TypeId, from: TypeId, to: TypeId, next: &mut Vec<TypeId>) -> bool {
    if *slot == from {
        *slot = to;
        true
    } else {
        next.push(*slot);
        false
    }
}

impl Substitution {
    fn in_owner(&mut self, model: &mut Model, owner: TypeOwner, depth: usize) -> Result<bool, CoreError> {
        match owner {
            TypeOwner::Model => {
                let mut changed = false;
                for (ty, slot) in model.root_slots() {
                    if ty == self.from {
                        changed |= model.set_slot(slot, self.to);
                    } else {
                        changed |= self.descend(model, ty, depth)?;
                    }
                }
                let mut roots = Vec::with_capacity(model.types.len());
                for ty in &model.types {
                    let ty = if *ty == self.from {
                        changed = true;
                        self.to
                    } else {
                        *ty
                    };
                    if !roots.contains(&ty) {
                        roots.push(ty);
                    }
                }
                model.types = roots;
                Ok(changed)
            }
            TypeOwner::Type(id) => self.in_type(model, id, depth),
            slot => match model.slot(slot) {
                Some(ty) if ty == self.from => Ok(model.set_slot(slot, self.to)),
                Some(ty) => self.descend(model, ty, depth),
                None => Ok(false),
            },
        }
    }

    fn descend(&mut self, model: &mut Model, ty: TypeId, depth: usize) -> Result<bool, CoreError> {
        if depth >= self.max_depth || ty == self.to {
            return Ok(false);
        }
        self.in_type(model, ty, depth + 1)
    }

    fn in_type(&mut self, model: &mut Model, id: TypeId, depth: usize) -> Result<bool, CoreError> {
        if id == self.to || !self.visited.insert(id) {
            return Ok(false);
        }
        let (from, to) = (self.from, self.to);
        let graph = &model.graph;
        let mut kind = graph.kind(id).clone();
        let mut changed = false;
        let mut next = Vec::new();
        let mut properties: Vec<PropertyId> = Vec::new();

        match &mut kind {
            TypeKind::Object {
                properties: owned,
                extended_by,
                ..
            } => {
                if let Some(parent) = extended_by {
                    if *parent == from {
                        if as_super_type(graph, to).is_some() {
                            *parent = to;
                            changed = true;
                        } else {
                            debug!(
                                "Kept supertype of {}, {} cannot be a supertype",
                                graph.describe(id),
                                graph.describe(to)
                            );
                        }
                    } else {
                        next.push(*parent);
                    }
                }
                properties = owned.clone();
            }
            TypeKind::PositionalProperties { properties: owned } => properties = owned.clone(),
            TypeKind::Array { of }
            | TypeKind::Decorating { of, .. }
            | TypeKind::ExternalModelReference { of, .. } => {
                changed |= swap_slot(of, from, to, &mut next);
            }
            TypeKind::Interface { of } => {
                if *of == from && !is_super_type_capable(graph, to) {
                    return Err(CoreError::InvalidSubstitution(format!(
                        "interface {} cannot wrap {}",
                        graph.describe(id),
                        graph.describe(to)
                    )));
                }
                changed |= swap_slot(of, from, to, &mut next);
            }
            TypeKind::Dictionary { key, value } => {
                changed |= swap_slot(key, from, to, &mut next);
                changed |= swap_slot(value, from, to, &mut next);
            }
            TypeKind::Tuple { types } | TypeKind::Composition { types, .. } => {
                for slot in types.iter_mut() {
                    changed |= swap_slot(slot, from, to, &mut next);
                }
            }
            TypeKind::GenericSource {
                of,
                source_identifiers,
            } => {
                if *of == from && !is_generic_super_type(graph, to) {
                    return Err(CoreError::InvalidSubstitution(format!(
                        "generic source {} cannot wrap {}",
                        graph.describe(id),
                        graph.describe(to)
                    )));
                }
                changed |= swap_slot(of, from, to, &mut next);
                for slot in source_identifiers.iter_mut() {
                    if *slot == from && !is_source_identifier(graph.kind(to)) {
                        return Err(CoreError::InvalidSubstitution(format!(
                            "{} must stay a generic source identifier, got {}",
                            graph.describe(from),
                            graph.describe(to)
                        )));
                    }
                    changed |= swap_slot(slot, from, to, &mut next);
                }
            }
            TypeKind::GenericSourceIdentifier {
                lower_bound,
                upper_bound,
                ..
            } => {
                for slot in lower_bound.iter_mut().chain(upper_bound.iter_mut()) {
                    changed |= swap_slot(slot, from, to, &mut next);
                }
            }
            TypeKind::GenericTarget {
                source,
                target_identifiers,
            } => {
                if *source == from {
                    if !matches!(graph.kind(to), TypeKind::GenericSource { .. }) {
                        return Err(CoreError::InvalidSubstitution(format!(
                            "generic target {} must reference a generic source, got {}",
                            graph.describe(id),
                            graph.describe(to)
                        )));
                    }
                    *source = to;
                    changed = true;
                } else {
                    next.push(*source);
                }
                for identifier in target_identifiers.iter_mut() {
                    if identifier.source_identifier == from {
                        if !is_source_identifier(graph.kind(to)) {
                            return Err(CoreError::InvalidSubstitution(format!(
                                "{} must stay a generic source identifier, got {}",
                                graph.describe(from),
                                graph.describe(to)
                            )));
                        }
                        identifier.source_identifier = to;
                        changed = true;
                    }
                    changed |= swap_slot(&mut identifier.ty, from, to, &mut next);
                }
            }
            TypeKind::Unknown { upper_bound, .. } => {
                if let Some(slot) = upper_bound {
                    changed |= swap_slot(slot, from, to, &mut next);
                }
            }
            TypeKind::Primitive { .. } | TypeKind::Enum { .. } | TypeKind::HardcodedReference { .. } => {}
        }

        if changed {
            *model.graph.kind_mut(id) = kind;
        }
        for property in properties {
            changed |= self.in_owner(model, TypeOwner::Property(property), depth)?;
        }
        for child in next {
            changed |= self.descend(model, child, depth)?;
        }
        Ok(changed)
    }
}

fn is_source_identifier(kind: &TypeKind) -> bool {
    matches!(kind, TypeKind::GenericSourceIdentifier { .. })
}
