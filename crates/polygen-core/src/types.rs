//! The type graph: an arena of type nodes and properties addressed by handle.
//!
//! Edges between types are [`TypeId`] values, so the graph may be cyclic and a
//! node can be shared by many parents. "Same node" is `TypeId` equality;
//! "same shape" is decided by [`crate::algebra::TypeAlgebra`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::naming::TypeName;
use crate::options::ModelTransformOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId(pub u32);

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Bool,
    Char,
    String,
    Integer,
    IntegerSmall,
    Long,
    Float,
    Double,
    Decimal,
    Number,
    Null,
    Void,
    Undefined,
}

impl PrimitiveKind {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Integer
                | PrimitiveKind::IntegerSmall
                | PrimitiveKind::Long
                | PrimitiveKind::Float
                | PrimitiveKind::Double
                | PrimitiveKind::Decimal
                | PrimitiveKind::Number
        )
    }

    /// Kinds that carry no value and cannot be a supertype.
    pub fn is_empty(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Null | PrimitiveKind::Void | PrimitiveKind::Undefined
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionKind {
    And,
    Or,
    Xor,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKind {
    AnyObject,
    MapLike,
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: Option<String>,
    pub value: Value,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericTargetIdentifier {
    pub source_identifier: TypeId,
    pub ty: TypeId,
}

/// The closed set of type shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeKind {
    Primitive {
        primitive: PrimitiveKind,
        nullable: bool,
        literal: bool,
        value: Option<Value>,
    },
    Object {
        properties: Vec<PropertyId>,
        extended_by: Option<TypeId>,
        is_abstract: bool,
        additional_properties: bool,
    },
    Enum {
        item_kind: PrimitiveKind,
        members: Vec<EnumMember>,
    },
    Array {
        of: TypeId,
    },
    Dictionary {
        key: TypeId,
        value: TypeId,
    },
    Tuple {
        types: Vec<TypeId>,
    },
    PositionalProperties {
        properties: Vec<PropertyId>,
    },
    Interface {
        of: TypeId,
    },
    Composition {
        composition: CompositionKind,
        types: Vec<TypeId>,
    },
    GenericSource {
        of: TypeId,
        source_identifiers: Vec<TypeId>,
    },
    GenericSourceIdentifier {
        placeholder: String,
        lower_bound: Option<TypeId>,
        upper_bound: Option<TypeId>,
    },
    GenericTarget {
        source: TypeId,
        target_identifiers: Vec<GenericTargetIdentifier>,
    },
    Unknown {
        unknown: UnknownKind,
        upper_bound: Option<TypeId>,
    },
    HardcodedReference {
        fqn: String,
    },
    Decorating {
        of: TypeId,
        nullable: bool,
    },
    ExternalModelReference {
        model_name: String,
        of: TypeId,
        options: ModelTransformOptions,
    },
}

impl TypeKind {
    pub fn primitive(primitive: PrimitiveKind) -> Self {
        TypeKind::Primitive {
            primitive,
            nullable: false,
            literal: false,
            value: None,
        }
    }

    pub fn object() -> Self {
        TypeKind::Object {
            properties: Vec::new(),
            extended_by: None,
            is_abstract: false,
            additional_properties: false,
        }
    }

    pub fn unknown(unknown: UnknownKind) -> Self {
        TypeKind::Unknown {
            unknown,
            upper_bound: None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TypeKind::Primitive { .. } => "primitive",
            TypeKind::Object { .. } => "object",
            TypeKind::Enum { .. } => "enum",
            TypeKind::Array { .. } => "array",
            TypeKind::Dictionary { .. } => "dictionary",
            TypeKind::Tuple { .. } => "tuple",
            TypeKind::PositionalProperties { .. } => "positional properties",
            TypeKind::Interface { .. } => "interface",
            TypeKind::Composition { .. } => "composition",
            TypeKind::GenericSource { .. } => "generic source",
            TypeKind::GenericSourceIdentifier { .. } => "generic source identifier",
            TypeKind::GenericTarget { .. } => "generic target",
            TypeKind::Unknown { .. } => "unknown",
            TypeKind::HardcodedReference { .. } => "hardcoded reference",
            TypeKind::Decorating { .. } => "decorating",
            TypeKind::ExternalModelReference { .. } => "external model reference",
        }
    }
}

/// Descriptive data that does not affect the shape of a type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeMeta {
    pub name: Option<TypeName>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeNode {
    pub kind: TypeKind,
    #[serde(default)]
    pub meta: TypeMeta,
}

impl TypeNode {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            meta: TypeMeta::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub ty: TypeId,
    /// Diagnostic back-reference; never used for ownership.
    pub owner: TypeId,
    pub required: bool,
    pub is_abstract: bool,
    pub deprecated: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub property_name: Option<String>,
    pub field_name: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, ty: TypeId, owner: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            owner,
            required: false,
            is_abstract: false,
            deprecated: false,
            read_only: false,
            write_only: false,
            property_name: None,
            field_name: None,
            description: None,
            summary: None,
        }
    }
}

/// Arena holding every type node and property of a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeGraph {
    types: Vec<TypeNode>,
    properties: Vec<Property>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Add a node, failing once the arena has exhausted the `u32` handle space.
    pub fn try_add(&mut self, node: TypeNode) -> Result<TypeId, CoreError> {
        let id = arena_handle(self.types.len(), "type")?;
        self.types.push(node);
        Ok(TypeId(id))
    }

    /// # Panics
    ///
    /// Panics once a type handle no longer fits in a `u32`.
    pub fn add(&mut self, node: TypeNode) -> TypeId {
        match self.try_add(node) {
            Ok(id) => id,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn add_kind(&mut self, kind: TypeKind) -> TypeId {
        self.add(TypeNode::new(kind))
    }

    /// Checked lookup for handles that may come from another graph.
    pub fn get(&self, id: TypeId) -> Option<&TypeNode> {
        self.types.get(id.0 as usize)
    }

    /// # Panics
    ///
    /// Handles are only valid for the graph that issued them; a foreign
    /// handle past the end of this arena panics. Use [`TypeGraph::get`] for
    /// handles of unknown origin.
    pub fn node(&self, id: TypeId) -> &TypeNode {
        &self.types[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: TypeId) -> &mut TypeNode {
        &mut self.types[id.0 as usize]
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.node(id).kind
    }

    pub fn kind_mut(&mut self, id: TypeId) -> &mut TypeKind {
        &mut self.node_mut(id).kind
    }

    pub fn meta(&self, id: TypeId) -> &TypeMeta {
        &self.node(id).meta
    }

    pub fn property(&self, id: PropertyId) -> &Property {
        &self.properties[id.0 as usize]
    }

    pub fn property_mut(&mut self, id: PropertyId) -> &mut Property {
        &mut self.properties[id.0 as usize]
    }

    /// Allocate a property without attaching it to its owner's list.
    ///
    /// # Panics
    ///
    /// Panics once a property handle no longer fits in a `u32`.
    pub fn allocate_property(&mut self, property: Property) -> PropertyId {
        match arena_handle(self.properties.len(), "property") {
            Ok(id) => {
                self.properties.push(property);
                PropertyId(id)
            }
            Err(e) => panic!("{}", e),
        }
    }

    /// Allocate a property and append it to the owner's property list.
    ///
    /// Only objects and positional-property arrays own properties; for any
    /// other owner the property is allocated but left detached.
    pub fn push_property(&mut self, property: Property) -> PropertyId {
        let owner = property.owner;
        let id = self.allocate_property(property);
        if let Some(list) = self.property_list_mut(owner) {
            list.push(id);
        }
        id
    }

    pub fn properties_of(&self, owner: TypeId) -> &[PropertyId] {
        match self.kind(owner) {
            TypeKind::Object { properties, .. }
            | TypeKind::PositionalProperties { properties } => properties,
            _ => &[],
        }
    }

    fn property_list_mut(&mut self, owner: TypeId) -> Option<&mut Vec<PropertyId>> {
        match self.kind_mut(owner) {
            TypeKind::Object { properties, .. }
            | TypeKind::PositionalProperties { properties } => Some(properties),
            _ => None,
        }
    }

    pub fn find_property(&self, owner: TypeId, name: &str) -> Option<PropertyId> {
        self.properties_of(owner)
            .iter()
            .copied()
            .find(|p| self.property(*p).name == name)
    }

    /// Detach a property from the owner's list. Returns whether it was present.
    pub fn remove_property(&mut self, owner: TypeId, property: PropertyId) -> bool {
        match self.property_list_mut(owner) {
            Some(list) => {
                let before = list.len();
                list.retain(|p| *p != property);
                before != list.len()
            }
            None => false,
        }
    }

    /// Follow decorating wrappers and external references to the real node.
    pub fn unwrap(&self, mut id: TypeId) -> TypeId {
        for _ in 0..=self.types.len() {
            match self.kind(id) {
                TypeKind::Decorating { of, .. } | TypeKind::ExternalModelReference { of, .. } => {
                    id = *of
                }
                _ => return id,
            }
        }
        id
    }

    pub fn is_null(&self, id: TypeId) -> bool {
        matches!(
            self.kind(self.unwrap(id)),
            TypeKind::Primitive {
                primitive: PrimitiveKind::Null,
                ..
            }
        )
    }

    pub fn is_nullable(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Primitive { nullable, .. } => *nullable,
            TypeKind::Decorating { nullable, of } => *nullable || self.is_nullable(*of),
            _ => false,
        }
    }

    /// Copy a node. Owned properties are copied too and re-pointed at the copy.
    pub fn duplicate(&mut self, id: TypeId) -> TypeId {
        let node = self.node(id).clone();
        let copy = self.add(node);
        let originals = self.properties_of(copy).to_vec();
        if !originals.is_empty() {
            let copies: Vec<PropertyId> = originals
                .into_iter()
                .map(|p| {
                    let mut property = self.property(p).clone();
                    property.owner = copy;
                    self.allocate_property(property)
                })
                .collect();
            if let Some(list) = self.property_list_mut(copy) {
                *list = copies;
            }
        }
        copy
    }

    /// A nullable variant of `id`: primitives get a nullable copy, anything
    /// else is wrapped in a nullable decorating node.
    pub fn nullable_of(&mut self, id: TypeId) -> TypeId {
        if self.is_nullable(id) {
            return id;
        }
        match self.kind(id) {
            TypeKind::Primitive { .. } => {
                let copy = self.duplicate(id);
                if let TypeKind::Primitive { nullable, .. } = self.kind_mut(copy) {
                    *nullable = true;
                }
                copy
            }
            _ => self.add_kind(TypeKind::Decorating {
                of: id,
                nullable: true,
            }),
        }
    }

    /// Short human readable description of a type for logs and errors.
    pub fn describe(&self, id: TypeId) -> String {
        let node = self.node(id);
        match node.meta.name.as_ref().and_then(|n| n.primary()) {
            Some(name) => format!("{} {} ({})", node.kind.label(), name, id),
            None => match &node.kind {
                TypeKind::Primitive { primitive, .. } => format!("{:?} ({})", primitive, id),
                TypeKind::GenericSourceIdentifier { placeholder, .. } => {
                    format!("identifier {} ({})", placeholder, id)
                }
                TypeKind::HardcodedReference { fqn } => format!("reference {} ({})", fqn, id),
                kind => format!("{} ({})", kind.label(), id),
            },
        }
    }
}

fn arena_handle(len: usize, what: &str) -> Result<u32, CoreError> {
    u32::try_from(len).map_err(|_| CoreError::Internal(format!("{} arena is full at {} entries", what, len)))
}
