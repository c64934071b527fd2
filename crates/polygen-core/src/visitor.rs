//! Depth-first and breadth-first traversal over a model's type graph.
//!
//! Both walks are cycle safe. The depth-first walk hands each callback a
//! mutable [`DfsContext`]; setting `replacement` swaps the node at its parent
//! and continues into the replacement, setting `skip` prunes the subtree.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::CoreError;
use crate::ir::{Model, TypeOwner};
use crate::substitute::substitute;
use crate::types::{TypeGraph, TypeId, TypeKind};

/// Direct type edges of a node, each with the owner of the slot.
pub fn children(graph: &TypeGraph, id: TypeId) -> Vec<(TypeId, TypeOwner)> {
    let here = TypeOwner::Type(id);
    let mut out = Vec::new();
    match graph.kind(id) {
        TypeKind::Object {
            properties,
            extended_by,
            ..
        } => {
            if let Some(parent) = extended_by {
                out.push((*parent, here));
            }
            for p in properties {
                out.push((graph.property(*p).ty, TypeOwner::Property(*p)));
            }
        }
        TypeKind::PositionalProperties { properties } => {
            for p in properties {
                out.push((graph.property(*p).ty, TypeOwner::Property(*p)));
            }
        }
        TypeKind::Array { of }
        | TypeKind::Interface { of }
        | TypeKind::Decorating { of, .. }
        | TypeKind::ExternalModelReference { of, .. } => out.push((*of, here)),
        TypeKind::Dictionary { key, value } => {
            out.push((*key, here));
            out.push((*value, here));
        }
        TypeKind::Tuple { types } | TypeKind::Composition { types, .. } => {
            out.extend(types.iter().map(|t| (*t, here)));
        }
        TypeKind::GenericSource {
            of,
            source_identifiers,
        } => {
            out.push((*of, here));
            out.extend(source_identifiers.iter().map(|t| (*t, here)));
        }
        TypeKind::GenericSourceIdentifier {
            lower_bound,
            upper_bound,
            ..
        } => {
            out.extend(lower_bound.iter().chain(upper_bound.iter()).map(|t| (*t, here)));
        }
        TypeKind::GenericTarget {
            source,
            target_identifiers,
        } => {
            out.push((*source, here));
            out.extend(target_identifiers.iter().map(|t| (t.ty, here)));
        }
        TypeKind::Unknown { upper_bound, .. } => {
            out.extend(upper_bound.iter().map(|t| (*t, here)));
        }
        TypeKind::Primitive { .. } | TypeKind::Enum { .. } | TypeKind::HardcodedReference { .. } => {}
    }
    out
}

/// State handed to a depth-first callback for one node.
#[derive(Debug, Clone)]
pub struct DfsContext {
    pub id: TypeId,
    pub parent: TypeOwner,
    pub depth: usize,
    /// Set to replace `id` at `parent`.
    pub replacement: Option<TypeId>,
    /// Set to stop descending below this node.
    pub skip: bool,
}

/// Depth-first walk configuration.
#[derive(Debug, Clone)]
pub struct DepthFirst {
    only_once: bool,
}

impl DepthFirst {
    pub fn new() -> Self {
        Self { only_once: true }
    }

    /// When false, a node is revisited through every distinct path and only
    /// the current path guards against cycles.
    pub fn only_once(mut self, only_once: bool) -> Self {
        self.only_once = only_once;
        self
    }

    /// Walk endpoints, examples and continuations, then the model's types.
    pub fn visit_model<F>(&self, model: &mut Model, mut on_enter: F) -> Result<(), CoreError>
    where
        F: FnMut(&mut Model, &mut DfsContext) -> Result<(), CoreError>,
    {
        let mut walk = Walk::new(self.only_once, &mut on_enter);
        for (root, owner) in model.root_slots() {
            walk.walk(model, root, owner, 0)?;
        }
        Ok(())
    }

    /// Walk the subgraph below one type.
    pub fn visit_type<F>(
        &self,
        model: &mut Model,
        root: TypeId,
        parent: TypeOwner,
        mut on_enter: F,
    ) -> Result<(), CoreError>
    where
        F: FnMut(&mut Model, &mut DfsContext) -> Result<(), CoreError>,
    {
        Walk::new(self.only_once, &mut on_enter).walk(model, root, parent, 0)
    }
}

impl Default for DepthFirst {
    fn default() -> Self {
        Self::new()
    }
}

struct Walk<'f, F> {
    only_once: bool,
    visited: HashSet<TypeId>,
    replaced: HashMap<TypeId, TypeId>,
    on_enter: &'f mut F,
}

impl<'f, F> Walk<'f, F>
where
    F: FnMut(&mut Model, &mut DfsContext) -> Result<(), CoreError>,
{
    fn new(only_once: bool, on_enter: &'f mut F) -> Self {
        Self {
            only_once,
            visited: HashSet::new(),
            replaced: HashMap::new(),
            on_enter,
        }
    }

    fn walk(
        &mut self,
        model: &mut Model,
        id: TypeId,
        parent: TypeOwner,
        depth: usize,
    ) -> Result<(), CoreError> {
        // Same node reached through another parent: apply the same swap there.
        if let Some(&replacement) = self.replaced.get(&id) {
            substitute(model, parent, id, replacement, 0)?;
            return Ok(());
        }
        if !self.visited.insert(id) {
            return Ok(());
        }

        let mut ctx = DfsContext {
            id,
            parent,
            depth,
            replacement: None,
            skip: false,
        };
        (self.on_enter)(model, &mut ctx)?;

        let mut current = id;
        if let Some(replacement) = ctx.replacement.filter(|r| *r != id) {
            substitute(model, parent, id, replacement, 0)?;
            self.replaced.insert(id, replacement);
            current = replacement;
            if !self.visited.insert(current) {
                ctx.skip = true;
            }
        }

        if !ctx.skip {
            for (child, owner) in children(&model.graph, current) {
                self.walk(model, child, owner, depth + 1)?;
            }
        }

        if !self.only_once {
            self.visited.remove(&id);
            if current != id {
                self.visited.remove(&current);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BfsContext {
    pub id: TypeId,
    pub owner: TypeOwner,
    /// Type-to-type hops from the model root.
    pub type_depth: usize,
    /// Property hops from the model root.
    pub use_depth: usize,
}

/// Every reachable type once, in breadth-first order from the model roots.
pub fn breadth_first(model: &Model) -> Vec<BfsContext> {
    let mut visited = HashSet::new();
    let mut queue: VecDeque<BfsContext> = model
        .root_slots()
        .into_iter()
        .map(|(id, owner)| BfsContext {
            id,
            owner,
            type_depth: 0,
            use_depth: 0,
        })
        .collect();

    let mut order = Vec::new();
    while let Some(ctx) = queue.pop_front() {
        if !visited.insert(ctx.id) {
            continue;
        }
        for (child, owner) in children(&model.graph, ctx.id) {
            let through_property = matches!(owner, TypeOwner::Property(_));
            queue.push_back(BfsContext {
                id: child,
                owner,
                type_depth: ctx.type_depth + 1,
                use_depth: ctx.use_depth + usize::from(through_property),
            });
        }
        order.push(ctx);
    }
    order
}

/// Types that would become standalone declarations in generated code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportableTypes {
    pub all: Vec<TypeId>,
    /// Exportable types referenced directly by the model.
    pub edge: Vec<TypeId>,
}

/// Collect declarable types reachable from the model.
///
/// Anything held directly by a generic source or target is part of that
/// generic declaration and is not exported on its own, except a generic
/// source itself.
pub fn exportable_types(model: &Model) -> ExportableTypes {
    let mut exportable = ExportableTypes::default();
    for ctx in breadth_first(model) {
        let kind = model.graph.kind(ctx.id);
        let declarable = matches!(
            kind,
            TypeKind::Object { .. }
                | TypeKind::Enum { .. }
                | TypeKind::Interface { .. }
                | TypeKind::Composition { .. }
                | TypeKind::GenericSource { .. }
        );
        if !declarable {
            continue;
        }
        if let TypeOwner::Type(owner) = ctx.owner {
            let owned_by_generic = matches!(
                model.graph.kind(owner),
                TypeKind::GenericSource { .. } | TypeKind::GenericTarget { .. }
            );
            if owned_by_generic && !matches!(kind, TypeKind::GenericSource { .. }) {
                continue;
            }
        }
        if ctx.type_depth == 0 {
            exportable.edge.push(ctx.id);
        }
        exportable.all.push(ctx.id);
    }
    exportable
}
