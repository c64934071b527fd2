//! The model: a type graph plus the roots that reference into it

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::naming::TypeName;
use crate::types::{
    CompositionKind, EnumMember, PrimitiveKind, Property, PropertyId, TypeGraph, TypeId,
    TypeKind, TypeNode,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub description: Option<String>,
    pub graph: TypeGraph,
    /// Root types, in declaration order.
    pub types: Vec<TypeId>,
    pub endpoints: Vec<Endpoint>,
    pub examples: Vec<ModelExample>,
    pub continuations: Vec<Continuation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub request: Option<TypeId>,
    pub responses: Vec<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleParam {
    pub name: String,
    pub ty: TypeId,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelExample {
    pub name: String,
    pub params: Vec<ExampleParam>,
    pub result_type: Option<TypeId>,
    pub result: Value,
}

/// Links the output of one endpoint to the input of another by property path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Continuation {
    pub name: String,
    pub mappings: Vec<ContinuationMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationMapping {
    pub source_path: Vec<PropertyId>,
    pub target_path: Vec<PropertyId>,
}

/// Where a type reference lives. Used as the parent in traversals and as the
/// scope of a substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeOwner {
    Model,
    Type(TypeId),
    Property(PropertyId),
    EndpointRequest(usize),
    EndpointResponse(usize, usize),
    ExampleParam(usize, usize),
    ExampleResult(usize),
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Every type slot held directly by the model, with the owner of the slot.
    pub fn root_slots(&self) -> Vec<(TypeId, TypeOwner)> {
        let mut slots = Vec::new();
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            if let Some(request) = endpoint.request {
                slots.push((request, TypeOwner::EndpointRequest(i)));
            }
            for (j, response) in endpoint.responses.iter().enumerate() {
                slots.push((*response, TypeOwner::EndpointResponse(i, j)));
            }
        }
        for (i, example) in self.examples.iter().enumerate() {
            for (j, param) in example.params.iter().enumerate() {
                slots.push((param.ty, TypeOwner::ExampleParam(i, j)));
            }
            if let Some(result) = example.result_type {
                slots.push((result, TypeOwner::ExampleResult(i)));
            }
        }
        for continuation in &self.continuations {
            for mapping in &continuation.mappings {
                for property in mapping.source_path.iter().chain(&mapping.target_path) {
                    slots.push((self.graph.property(*property).ty, TypeOwner::Property(*property)));
                }
            }
        }
        for ty in &self.types {
            slots.push((*ty, TypeOwner::Model));
        }
        slots
    }

    /// Read the type held by a slot owner; `None` for owners that hold many.
    pub fn slot(&self, owner: TypeOwner) -> Option<TypeId> {
        match owner {
            TypeOwner::Model | TypeOwner::Type(_) => None,
            TypeOwner::Property(p) => Some(self.graph.property(p).ty),
            TypeOwner::EndpointRequest(i) => self.endpoints.get(i).and_then(|e| e.request),
            TypeOwner::EndpointResponse(i, j) => self
                .endpoints
                .get(i)
                .and_then(|e| e.responses.get(j))
                .copied(),
            TypeOwner::ExampleParam(i, j) => self
                .examples
                .get(i)
                .and_then(|e| e.params.get(j))
                .map(|p| p.ty),
            TypeOwner::ExampleResult(i) => self.examples.get(i).and_then(|e| e.result_type),
        }
    }

    /// Overwrite the type held by a single-slot owner.
    pub fn set_slot(&mut self, owner: TypeOwner, ty: TypeId) -> bool {
        let slot = match owner {
            TypeOwner::Model | TypeOwner::Type(_) => None,
            TypeOwner::Property(p) => Some(&mut self.graph.property_mut(p).ty),
            TypeOwner::EndpointRequest(i) => {
                self.endpoints.get_mut(i).and_then(|e| e.request.as_mut())
            }
            TypeOwner::EndpointResponse(i, j) => {
                self.endpoints.get_mut(i).and_then(|e| e.responses.get_mut(j))
            }
            TypeOwner::ExampleParam(i, j) => self
                .examples
                .get_mut(i)
                .and_then(|e| e.params.get_mut(j))
                .map(|p| &mut p.ty),
            TypeOwner::ExampleResult(i) => {
                self.examples.get_mut(i).and_then(|e| e.result_type.as_mut())
            }
        };
        match slot {
            Some(slot) => {
                *slot = ty;
                true
            }
            None => false,
        }
    }
}

/// Builder for constructing models in code.
///
/// Named objects and enums are registered as root types automatically.
pub struct ModelBuilder {
    model: Model,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            model: Model::new(name),
        }
    }

    pub fn graph(&mut self) -> &mut TypeGraph {
        &mut self.model.graph
    }

    pub fn add(&mut self, kind: TypeKind) -> TypeId {
        self.model.graph.add_kind(kind)
    }

    pub fn named(&mut self, name: impl Into<TypeName>, kind: TypeKind) -> TypeId {
        let mut node = TypeNode::new(kind);
        node.meta.name = Some(name.into());
        self.model.graph.add(node)
    }

    pub fn root(&mut self, ty: TypeId) -> &mut Self {
        if !self.model.types.contains(&ty) {
            self.model.types.push(ty);
        }
        self
    }

    pub fn primitive(&mut self, kind: PrimitiveKind) -> TypeId {
        self.add(TypeKind::primitive(kind))
    }

    pub fn nullable(&mut self, kind: PrimitiveKind) -> TypeId {
        self.add(TypeKind::Primitive {
            primitive: kind,
            nullable: true,
            literal: false,
            value: None,
        })
    }

    pub fn literal(&mut self, kind: PrimitiveKind, value: Value) -> TypeId {
        self.add(TypeKind::Primitive {
            primitive: kind,
            nullable: false,
            literal: true,
            value: Some(value),
        })
    }

    pub fn object(&mut self, name: impl Into<TypeName>) -> TypeId {
        let id = self.named(name, TypeKind::object());
        self.root(id);
        id
    }

    pub fn object_extending(&mut self, name: impl Into<TypeName>, parent: TypeId) -> TypeId {
        let id = self.object(name);
        self.extend(id, parent);
        id
    }

    pub fn extend(&mut self, object: TypeId, parent: TypeId) -> &mut Self {
        if let TypeKind::Object { extended_by, .. } = self.model.graph.kind_mut(object) {
            *extended_by = Some(parent);
        }
        self
    }

    pub fn property(&mut self, owner: TypeId, name: impl Into<String>, ty: TypeId) -> PropertyId {
        self.model.graph.push_property(Property::new(name, ty, owner))
    }

    pub fn required_property(
        &mut self,
        owner: TypeId,
        name: impl Into<String>,
        ty: TypeId,
    ) -> PropertyId {
        let mut property = Property::new(name, ty, owner);
        property.required = true;
        self.model.graph.push_property(property)
    }

    pub fn enumeration(
        &mut self,
        name: impl Into<TypeName>,
        item_kind: PrimitiveKind,
        values: &[Value],
    ) -> TypeId {
        let members = values
            .iter()
            .map(|value| EnumMember {
                name: None,
                value: value.clone(),
                description: None,
            })
            .collect();
        let id = self.named(name, TypeKind::Enum { item_kind, members });
        self.root(id);
        id
    }

    pub fn array(&mut self, of: TypeId) -> TypeId {
        self.add(TypeKind::Array { of })
    }

    pub fn dictionary(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.add(TypeKind::Dictionary { key, value })
    }

    pub fn composition(&mut self, composition: CompositionKind, types: Vec<TypeId>) -> TypeId {
        self.add(TypeKind::Composition { composition, types })
    }

    pub fn endpoint(
        &mut self,
        name: impl Into<String>,
        request: Option<TypeId>,
        responses: Vec<TypeId>,
    ) -> &mut Self {
        self.model.endpoints.push(Endpoint {
            name: name.into(),
            request,
            responses,
        });
        self
    }

    pub fn build(self) -> Model {
        self.model
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new("model")
    }
}
