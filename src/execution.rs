// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lowering of compiled types onto the `async-graphql` dynamic executor.
//!
//! Runtime values are [`serde_json::Value`]s. A field without a resolver reads
//! the property of the same name from its parent object. Values of interface
//! type are bound to a concrete implementation by the interface's
//! `resolve_type` hook, then by a `__typename` property, then by the only
//! implementation if there is exactly one.

use crate::error::BuildError;
use crate::schema::{CompiledArgument, CompiledField, CompiledType};
use crate::*;

use std::collections::HashMap;

use async_graphql::dynamic::{
    self, FieldFuture, FieldValue, InputValue, Interface, InterfaceField, Object, ResolverContext,
};
use async_graphql::{PathSegment, Value as ConstValue};
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};

/// Callbacks collected while compiling; the executable schema takes them over.
#[derive(Default)]
pub(crate) struct RuntimeBindings {
    /// Keyed by object type name and field name.
    pub field_resolvers: HashMap<(Rc<str>, Rc<str>), ResolverFn>,
    pub queries: HashMap<Rc<str>, ResolverFn>,
    /// Keyed by interface name.
    pub resolve_type: HashMap<Rc<str>, ResolveTypeFn>,
    /// Emitted name of every compiled target.
    pub names: HashMap<Target, Rc<str>>,
}

/// Error reported for one field of a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionError {
    pub message: String,
    /// Field names and list indices leading to the failed field.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
}

/// Result of executing a query.
///
/// Failing fields are `null` in `data` and reported in `errors`; the rest of
/// the response is still produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ExecutionError>,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl From<async_graphql::Response> for Response {
    fn from(response: async_graphql::Response) -> Self {
        let errors = response
            .errors
            .into_iter()
            .map(|error| ExecutionError {
                message: error.message,
                path: error
                    .path
                    .into_iter()
                    .map(|segment| match segment {
                        PathSegment::Field(name) => Value::String(name),
                        PathSegment::Index(index) => Value::from(index),
                    })
                    .collect(),
            })
            .collect();
        Self {
            data: response.data.into_json().unwrap_or(Value::Null),
            errors,
        }
    }
}

/// How a resolved JSON value is handed to the executor.
enum Shape {
    Leaf,
    Object,
    Interface(Rc<Dispatch>),
    List(Box<Shape>),
}

impl Shape {
    fn field_value<'a>(&self, value: Value) -> async_graphql::Result<FieldValue<'a>> {
        if value.is_null() {
            return Ok(FieldValue::NULL);
        }
        Ok(match self {
            Shape::Leaf => FieldValue::value(ConstValue::from_json(value)?),
            Shape::Object => FieldValue::owned_any(value),
            Shape::Interface(dispatch) => {
                let type_name = dispatch.concrete_type(&value)?;
                FieldValue::owned_any(value).with_type(type_name.to_string())
            }
            Shape::List(item) => match value {
                Value::Array(items) => FieldValue::list(
                    items
                        .into_iter()
                        .map(|value| item.field_value(value))
                        .collect::<async_graphql::Result<Vec<_>>>()?,
                ),
                other => {
                    return Err(async_graphql::Error::new(format!(
                        "expected a list, found `{other}`"
                    )))
                }
            },
        })
    }
}

/// Binds values of one interface type to a concrete implementation.
struct Dispatch {
    interface: Rc<str>,
    implementations: Vec<Rc<str>>,
    resolve_type: Option<ResolveTypeFn>,
    names: Rc<HashMap<Target, Rc<str>>>,
}

impl Dispatch {
    fn concrete_type(&self, value: &Value) -> async_graphql::Result<Rc<str>> {
        if let Some(target) = self.resolve_type.as_ref().and_then(|hook| hook(value)) {
            return match self.names.get(&target) {
                Some(name) if self.implementations.contains(name) => Ok(name.clone()),
                _ => Err(async_graphql::Error::new(format!(
                    "`{target}` does not implement interface `{}`",
                    self.interface
                ))),
            };
        }

        if let Some(type_name) = value.get("__typename").and_then(Value::as_str) {
            return match self
                .implementations
                .iter()
                .find(|name| name.as_ref() == type_name)
            {
                Some(name) => Ok(name.clone()),
                None => Err(async_graphql::Error::new(format!(
                    "`{type_name}` does not implement interface `{}`",
                    self.interface
                ))),
            };
        }

        match self.implementations.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(async_graphql::Error::new(format!(
                "cannot determine the concrete type of a value of interface `{}`",
                self.interface
            ))),
        }
    }
}

struct Lowering {
    kinds: HashMap<Rc<str>, TypeKind>,
    dispatches: HashMap<Rc<str>, Rc<Dispatch>>,
}

impl Lowering {
    fn new(types: &[CompiledType], bindings: &mut RuntimeBindings) -> Self {
        let names = Rc::new(core::mem::take(&mut bindings.names));
        let kinds = types.iter().map(|t| (t.name.clone(), t.kind)).collect();
        let dispatches = types
            .iter()
            .filter(|t| t.kind == TypeKind::Interface)
            .map(|interface| {
                let implementations = types
                    .iter()
                    .filter(|t| t.kind == TypeKind::Object && t.interfaces.contains(&interface.name))
                    .map(|t| t.name.clone())
                    .collect();
                let dispatch = Dispatch {
                    interface: interface.name.clone(),
                    implementations,
                    resolve_type: bindings.resolve_type.remove(&interface.name),
                    names: names.clone(),
                };
                (interface.name.clone(), Rc::new(dispatch))
            })
            .collect();
        Self { kinds, dispatches }
    }

    fn shape(&self, ty: &WireType) -> Shape {
        match ty {
            WireType::NonNull(inner) => self.shape(inner),
            WireType::List(inner) => Shape::List(Box::new(self.shape(inner))),
            WireType::Named(name) => match self.kinds.get(name) {
                Some(TypeKind::Object) => Shape::Object,
                Some(TypeKind::Interface) => match self.dispatches.get(name) {
                    Some(dispatch) => Shape::Interface(dispatch.clone()),
                    None => Shape::Object,
                },
                None => Shape::Leaf,
            },
        }
    }

    fn field(&self, field: &CompiledField, resolver: Option<ResolverFn>) -> dynamic::Field {
        let shape = Rc::new(self.shape(&field.ty));
        let name = field.name.clone();
        let defaults = Rc::new(defaults(&field.args));

        let mut lowered = dynamic::Field::new(field.name.to_string(), type_ref(&field.ty), move |ctx| {
            let shape = shape.clone();
            let name = name.clone();
            let defaults = defaults.clone();
            let resolver = resolver.clone();
            FieldFuture::new(async move {
                let parent = ctx.parent_value.try_downcast_ref::<Value>().ok();
                let value = match resolver {
                    Some(callback) => {
                        let args = ResolverArgs::new(parent.cloned(), arguments(&ctx, &defaults)?);
                        callback(args)
                            .await
                            .map_err(|err| async_graphql::Error::new(format!("{err:#}")))?
                    }
                    None => parent
                        .and_then(|parent| parent.get(name.as_ref()))
                        .cloned()
                        .unwrap_or(Value::Null),
                };
                match value {
                    Value::Null => Ok(None),
                    value => shape.field_value(value).map(Some),
                }
            })
        });

        if let Some(description) = &field.description {
            lowered = lowered.description(description.to_string());
        }
        if let Some(reason) = &field.deprecation_reason {
            lowered = lowered.deprecation(Some(reason.as_ref()));
        }
        for arg in &field.args {
            lowered = lowered.argument(input_value(arg));
        }
        lowered
    }

    fn interface_field(&self, field: &CompiledField) -> InterfaceField {
        let mut lowered = InterfaceField::new(field.name.to_string(), type_ref(&field.ty));
        if let Some(description) = &field.description {
            lowered = lowered.description(description.to_string());
        }
        if let Some(reason) = &field.deprecation_reason {
            lowered = lowered.deprecation(Some(reason.as_ref()));
        }
        for arg in &field.args {
            lowered = lowered.argument(input_value(arg));
        }
        lowered
    }
}

fn type_ref(ty: &WireType) -> dynamic::TypeRef {
    match ty {
        WireType::Named(name) => dynamic::TypeRef::named(name.to_string()),
        WireType::List(inner) => dynamic::TypeRef::List(Box::new(type_ref(inner))),
        WireType::NonNull(inner) => dynamic::TypeRef::NonNull(Box::new(type_ref(inner))),
    }
}

fn input_value(arg: &CompiledArgument) -> InputValue {
    let mut input = InputValue::new(arg.name.to_string(), type_ref(&arg.ty));
    if let Some(description) = &arg.description {
        input = input.description(description.to_string());
    }
    if let Some(default) = arg
        .default_value
        .clone()
        .and_then(|value| ConstValue::from_json(value).ok())
    {
        input = input.default_value(default);
    }
    input
}

fn defaults(args: &[CompiledArgument]) -> Vec<(Rc<str>, Value)> {
    args.iter()
        .filter_map(|arg| Some((arg.name.clone(), arg.default_value.clone()?)))
        .collect()
}

/// Arguments of the current field as JSON, with declared defaults filled in.
fn arguments(
    ctx: &ResolverContext<'_>,
    defaults: &[(Rc<str>, Value)],
) -> async_graphql::Result<Map<String, Value>> {
    let mut args = Map::new();
    for (name, value) in ctx.args.iter() {
        args.insert(name.to_string(), value.as_value().clone().into_json()?);
    }
    for (name, value) in defaults {
        if !args.contains_key(name.as_ref()) {
            args.insert(name.to_string(), value.clone());
        }
    }
    Ok(args)
}

/// Builds the executable schema for compiled `types` and the root `query`.
pub(crate) fn build_executable(
    types: &[CompiledType],
    query: &CompiledType,
    scalars: &[Rc<str>],
    mut bindings: RuntimeBindings,
) -> Result<dynamic::Schema, BuildError> {
    let lowering = Lowering::new(types, &mut bindings);
    let mut builder = dynamic::Schema::build(query.name.as_ref(), None, None);

    for scalar in scalars {
        builder = builder.register(dynamic::Scalar::new(scalar.to_string()));
    }

    for ty in types {
        builder = match ty.kind {
            TypeKind::Object => {
                let mut object = Object::new(ty.name.to_string());
                if let Some(description) = &ty.description {
                    object = object.description(description.to_string());
                }
                for interface in &ty.interfaces {
                    object = object.implement(interface.to_string());
                }
                for field in &ty.fields {
                    let resolver = bindings
                        .field_resolvers
                        .get(&(ty.name.clone(), field.name.clone()))
                        .cloned();
                    object = object.field(lowering.field(field, resolver));
                }
                builder.register(object)
            }
            TypeKind::Interface => {
                let mut interface = Interface::new(ty.name.to_string());
                if let Some(description) = &ty.description {
                    interface = interface.description(description.to_string());
                }
                for implemented in &ty.interfaces {
                    interface = interface.implement(implemented.to_string());
                }
                for field in &ty.fields {
                    interface = interface.field(lowering.interface_field(field));
                }
                builder.register(interface)
            }
        };
    }

    let mut root = Object::new(query.name.to_string());
    for field in &query.fields {
        let callback = bindings.queries.get(&field.name).cloned().ok_or_else(|| {
            BuildError::Executable(format!("query `{}` has no resolver", field.name))
        })?;
        root = root.field(lowering.field(field, Some(callback)));
    }
    builder = builder.register(root);

    let schema = builder
        .finish()
        .map_err(|err| BuildError::Executable(err.to_string()))?;
    debug!("lowered {} types onto the executor", types.len() + 1);
    Ok(schema)
}

/// The standard introspection query.
pub const INTROSPECTION_QUERY: &str = r#"
query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types { ...FullType }
    directives {
      name
      description
      locations
      args { ...InputValue }
    }
  }
}

fragment FullType on __Type {
  kind
  name
  description
  fields(includeDeprecated: true) {
    name
    description
    args { ...InputValue }
    type { ...TypeRef }
    isDeprecated
    deprecationReason
  }
  inputFields { ...InputValue }
  interfaces { ...TypeRef }
  enumValues(includeDeprecated: true) {
    name
    description
    isDeprecated
    deprecationReason
  }
  possibleTypes { ...TypeRef }
}

fragment InputValue on __InputValue {
  name
  description
  type { ...TypeRef }
  defaultValue
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType {
            kind
            name
            ofType {
              kind
              name
              ofType {
                kind
                name
              }
            }
          }
        }
      }
    }
  }
}
"#;
