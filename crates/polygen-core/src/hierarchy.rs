//! Supertype queries and inheritance maps.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::warn;

use crate::error::CoreError;
use crate::ir::Model;
use crate::types::{CompositionKind, TypeGraph, TypeId, TypeKind};
use crate::visitor::DepthFirst;

const MAX_HIERARCHY_DEPTH: usize = 100;

/// Whether the type can appear as a supertype.
///
/// Decorating and external wrappers are looked through. An intersection
/// qualifies when every member does.
pub fn is_super_type_capable(graph: &TypeGraph, id: TypeId) -> bool {
    is_super_type_capable_inner(graph, id, &mut HashSet::new())
}

fn is_super_type_capable_inner(graph: &TypeGraph, id: TypeId, seen: &mut HashSet<TypeId>) -> bool {
    if !seen.insert(id) {
        return true;
    }
    match graph.kind(id) {
        TypeKind::Object { .. }
        | TypeKind::GenericTarget { .. }
        | TypeKind::Enum { .. }
        | TypeKind::Interface { .. }
        | TypeKind::HardcodedReference { .. } => true,
        TypeKind::Primitive {
            primitive,
            nullable,
            ..
        } => !nullable && !primitive.is_empty(),
        TypeKind::Decorating { of, .. } | TypeKind::ExternalModelReference { of, .. } => {
            is_super_type_capable_inner(graph, *of, seen)
        }
        TypeKind::Composition {
            composition: CompositionKind::And,
            types,
        } => types.iter().all(|t| is_super_type_capable_inner(graph, *t, seen)),
        _ => false,
    }
}

/// `Some(id)` if the type can be a supertype.
pub fn as_super_type(graph: &TypeGraph, id: TypeId) -> Option<TypeId> {
    is_super_type_capable(graph, id).then_some(id)
}

/// Whether the type can be wrapped by a generic source.
pub fn is_generic_super_type(graph: &TypeGraph, id: TypeId) -> bool {
    match graph.kind(id) {
        TypeKind::GenericTarget { .. }
        | TypeKind::Composition { .. }
        | TypeKind::Enum { .. }
        | TypeKind::HardcodedReference { .. }
        | TypeKind::ExternalModelReference { .. }
        | TypeKind::Primitive { .. } => false,
        TypeKind::Decorating { of, .. } => is_generic_super_type(graph, *of),
        _ => is_super_type_capable(graph, id),
    }
}

/// Direct supertypes of a type.
///
/// An intersection contributes its members, an object its `extended_by`
/// (flattened when that is itself an intersection). Generic wrappers
/// report the supertypes of what they wrap.
pub fn super_types(graph: &TypeGraph, id: TypeId) -> Vec<TypeId> {
    match graph.kind(id) {
        TypeKind::Composition {
            composition: CompositionKind::And,
            types,
        } => types.clone(),
        TypeKind::Object {
            extended_by: Some(parent),
            ..
        } => match graph.kind(graph.unwrap(*parent)) {
            TypeKind::Composition {
                composition: CompositionKind::And,
                types,
            } => types.clone(),
            _ => vec![*parent],
        },
        TypeKind::GenericSource { of, .. } | TypeKind::Interface { of } => super_types(graph, *of),
        TypeKind::GenericTarget { source, .. } => match graph.kind(*source) {
            TypeKind::GenericSource { of, .. } => super_types(graph, *of),
            _ => Vec::new(),
        },
        TypeKind::Decorating { of, .. } | TypeKind::ExternalModelReference { of, .. } => {
            super_types(graph, *of)
        }
        _ => Vec::new(),
    }
}

/// All transitive supertypes, nearest first.
pub fn super_type_hierarchy(graph: &TypeGraph, id: TypeId) -> Result<Vec<TypeId>, CoreError> {
    let mut hierarchy = Vec::new();
    let mut queue: VecDeque<(TypeId, usize)> =
        super_types(graph, id).into_iter().map(|t| (t, 1)).collect();

    while let Some((current, depth)) = queue.pop_front() {
        if depth > MAX_HIERARCHY_DEPTH {
            return Err(CoreError::CircularDependency(format!(
                "supertype hierarchy of {} does not terminate",
                graph.describe(id)
            )));
        }
        if current == id || hierarchy.contains(&current) {
            continue;
        }
        hierarchy.push(current);
        queue.extend(super_types(graph, current).into_iter().map(|t| (t, depth + 1)));
    }
    Ok(hierarchy)
}

/// Objects (and interfaces) mapped to their direct supertypes, in discovery order.
pub fn sub_to_super_map(model: &mut Model) -> Result<IndexMap<TypeId, Vec<TypeId>>, CoreError> {
    let mut map = IndexMap::new();
    DepthFirst::new().visit_model(model, |model, ctx| {
        if matches!(
            model.graph.kind(ctx.id),
            TypeKind::Object { .. } | TypeKind::Interface { .. }
        ) {
            let supers = super_types(&model.graph, ctx.id);
            if !supers.is_empty() {
                map.insert(ctx.id, supers);
            }
        }
        Ok(())
    })?;
    Ok(map)
}

/// Supertypes mapped to their direct subtypes, keeping discovery order.
pub fn super_to_sub_map(sub_to_super: &IndexMap<TypeId, Vec<TypeId>>) -> IndexMap<TypeId, Vec<TypeId>> {
    let mut map: IndexMap<TypeId, Vec<TypeId>> = IndexMap::new();
    for (sub, supers) in sub_to_super {
        for sup in supers {
            let subs = map.entry(*sup).or_default();
            if !subs.contains(sub) {
                subs.push(*sub);
            }
        }
    }
    map
}

/// Supertypes ordered so that every supertype comes after the supertypes
/// found among its own subtypes. Falls back to discovery order on a cycle.
pub fn dependency_order(super_to_sub: &IndexMap<TypeId, Vec<TypeId>>) -> Vec<TypeId> {
    let mut graph: DiGraph<TypeId, ()> = DiGraph::new();
    let mut nodes: HashMap<TypeId, NodeIndex> = HashMap::new();
    for sup in super_to_sub.keys() {
        nodes.insert(*sup, graph.add_node(*sup));
    }
    for (sup, subs) in super_to_sub {
        for sub in subs {
            if let Some(sub_node) = nodes.get(sub) {
                graph.add_edge(*sub_node, nodes[sup], ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => order.into_iter().map(|n| graph[n]).collect(),
        Err(cycle) => {
            warn!(
                "Inheritance cycle through {:?}, using discovery order",
                graph[cycle.node_id()]
            );
            super_to_sub.keys().copied().collect()
        }
    }
}
