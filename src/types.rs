// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::BuildError;
use crate::target::Target;
use crate::*;

use core::fmt;
use core::future::Future;
use core::str::FromStr;

use anyhow::Context;
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};


/// Future produced by resolver callbacks.
pub type ResolverFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// Callback bound to a root query or to a field.
pub type ResolverFn = Rc<dyn Fn(ResolverArgs) -> ResolverFuture + Send + Sync>;

/// Maps a runtime value of an interface type to the target of its concrete type.
pub type ResolveTypeFn = Rc<dyn Fn(&Value) -> Option<Target> + Send + Sync>;

fn resolver_fn<F, Fut>(callback: F) -> ResolverFn
where
    F: Fn(ResolverArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Rc::new(move |args| callback(args).boxed())
}

fn same_callback<F: ?Sized>(a: &Option<Rc<F>>, b: &Option<Rc<F>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Kind of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKind {
    #[default]
    Object,
    Interface,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Object => f.write_str("OBJECT"),
            TypeKind::Interface => f.write_str("INTERFACE"),
        }
    }
}

/// Built-in scalars a field may be declared with.
///
/// `Number` and `Date` are placeholders whose GraphQL scalar is chosen at
/// build time by [`crate::NumberScalarMode`] and [`crate::DateScalarMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Int,
    Float,
    String,
    Boolean,
    Id,
    Number,
    Date,
}

impl Scalar {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Int" => Scalar::Int,
            "Float" => Scalar::Float,
            "String" => Scalar::String,
            "Boolean" => Scalar::Boolean,
            "ID" => Scalar::Id,
            "Number" => Scalar::Number,
            "Date" => Scalar::Date,
            _ => return None,
        })
    }

    /// Name used when declaring the scalar. For `Number` and `Date` this is
    /// not the emitted GraphQL name.
    pub fn declared_name(&self) -> &'static str {
        match self {
            Scalar::Int => "Int",
            Scalar::Float => "Float",
            Scalar::String => "String",
            Scalar::Boolean => "Boolean",
            Scalar::Id => "ID",
            Scalar::Number => "Number",
            Scalar::Date => "Date",
        }
    }
}

/// Declared type of a field, argument or resolver.
///
/// References to declared types use the [`Target`] of the declaring construct,
/// or a plain name that is looked up when the schema is compiled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Scalar(Scalar),
    Target(Target),
    Named(Rc<str>),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn scalar(scalar: Scalar) -> Self {
        TypeRef::Scalar(scalar)
    }

    pub fn target(target: &Target) -> Self {
        TypeRef::Target(target.clone())
    }

    /// A reference by name. Built-in scalar names map to [`TypeRef::Scalar`].
    pub fn named(name: &str) -> Self {
        match Scalar::from_name(name) {
            Some(scalar) => TypeRef::Scalar(scalar),
            None => TypeRef::Named(name.into()),
        }
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        match inner {
            TypeRef::NonNull(_) => inner,
            _ => TypeRef::NonNull(Box::new(inner)),
        }
    }

    /// Wraps `self` in a non-null marker.
    pub fn required(self) -> Self {
        TypeRef::non_null(self)
    }

    /// Innermost named reference.
    pub fn base(&self) -> &TypeRef {
        match self {
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.base(),
            _ => self,
        }
    }

    pub fn is_named(&self) -> bool {
        !matches!(self, TypeRef::List(_) | TypeRef::NonNull(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.base(), TypeRef::Scalar(_))
    }

    /// Name of the innermost reference as it was declared.
    pub fn base_name(&self) -> &str {
        match self.base() {
            TypeRef::Scalar(scalar) => scalar.declared_name(),
            TypeRef::Target(target) => target.name(),
            TypeRef::Named(name) => name,
            TypeRef::List(_) | TypeRef::NonNull(_) => unreachable!("base() is always named"),
        }
    }

    /// Rebuilds the reference, replacing every named leaf through `f`.
    pub fn map_named(&self, f: &impl Fn(&TypeRef) -> TypeRef) -> TypeRef {
        match self {
            TypeRef::List(inner) => TypeRef::List(Box::new(inner.map_named(f))),
            TypeRef::NonNull(inner) => TypeRef::NonNull(Box::new(inner.map_named(f))),
            named => f(named),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Scalar(scalar) => f.write_str(scalar.declared_name()),
            TypeRef::Target(target) => f.write_str(target.name()),
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

impl FromStr for TypeRef {
    type Err = BuildError;

    /// Parses GraphQL type syntax such as `[Item!]!`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeRefParser {
            text: s,
            chars: s.char_indices().peekable(),
        };
        let ty = parser.parse_type()?;
        parser.skip_whitespace();
        match parser.chars.next() {
            None => Ok(ty),
            Some((pos, ch)) => Err(parser.error(&format!("unexpected `{ch}` at offset {pos}"))),
        }
    }
}

struct TypeRefParser<'a> {
    text: &'a str,
    chars: core::iter::Peekable<core::str::CharIndices<'a>>,
}

impl TypeRefParser<'_> {
    fn error(&self, msg: &str) -> BuildError {
        BuildError::InvalidDocument(format!("invalid type reference `{}`: {msg}", self.text))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn parse_type(&mut self) -> Result<TypeRef, BuildError> {
        self.skip_whitespace();
        let ty = match self.chars.peek().copied() {
            Some((_, '[')) => {
                self.chars.next();
                let inner = self.parse_type()?;
                self.skip_whitespace();
                match self.chars.next() {
                    Some((_, ']')) => TypeRef::list(inner),
                    _ => return Err(self.error("missing `]`")),
                }
            }
            Some((start, c)) if c == '_' || c.is_ascii_alphabetic() => {
                let mut end = start;
                while let Some((pos, c)) = self.chars.peek().copied() {
                    if c == '_' || c.is_ascii_alphanumeric() {
                        end = pos + c.len_utf8();
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                TypeRef::named(&self.text[start..end])
            }
            Some((pos, c)) => return Err(self.error(&format!("unexpected `{c}` at offset {pos}"))),
            None => return Err(self.error("empty type")),
        };

        self.skip_whitespace();
        if let Some((_, '!')) = self.chars.peek() {
            self.chars.next();
            return Ok(TypeRef::non_null(ty));
        }
        Ok(ty)
    }
}

/// Type reference in the form emitted into the compiled schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WireType {
    Named(Rc<str>),
    List(Box<WireType>),
    NonNull(Box<WireType>),
}

impl WireType {
    pub fn base_name(&self) -> &str {
        match self {
            WireType::Named(name) => name,
            WireType::List(inner) | WireType::NonNull(inner) => inner.base_name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, WireType::NonNull(_))
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireType::Named(name) => f.write_str(name),
            WireType::List(inner) => write!(f, "[{inner}]"),
            WireType::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// Declaration of an object or interface type.
#[derive(Clone)]
pub struct TypeDeclaration {
    pub name: Rc<str>,
    pub kind: TypeKind,
    pub is_abstract: bool,
    pub target: Target,
    pub extends: Option<Target>,
    pub implements: Vec<Target>,
    pub description: Option<Rc<str>>,
    pub resolve_type: Option<ResolveTypeFn>,
}

impl TypeDeclaration {
    /// Object type declared on `target`, named after it.
    pub fn object(target: &Target) -> Self {
        Self::with_kind(target, TypeKind::Object)
    }

    /// Interface type declared on `target`, named after it.
    pub fn interface(target: &Target) -> Self {
        Self::with_kind(target, TypeKind::Interface)
    }

    pub fn with_kind(target: &Target, kind: TypeKind) -> Self {
        Self {
            name: target.name_rc(),
            kind,
            is_abstract: false,
            target: target.clone(),
            extends: None,
            implements: vec![],
            description: None,
            resolve_type: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<Rc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Abstract types lend their fields to subtypes but are never emitted.
    #[must_use]
    pub fn abstract_type(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    #[must_use]
    pub fn extends(mut self, supertype: &Target) -> Self {
        self.extends = Some(supertype.clone());
        self
    }

    #[must_use]
    pub fn implements(mut self, interface: &Target) -> Self {
        if !self.implements.contains(interface) {
            self.implements.push(interface.clone());
        }
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<Rc<str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn resolve_type<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Option<Target> + Send + Sync + 'static,
    {
        self.resolve_type = Some(Rc::new(f));
        self
    }

    /// Hooks are equal only when they are the same callback.
    pub(crate) fn same_descriptor(&self, other: &TypeDeclaration) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.is_abstract == other.is_abstract
            && self.target == other.target
            && self.extends == other.extends
            && self.implements == other.implements
            && self.description == other.description
            && same_callback(&self.resolve_type, &other.resolve_type)
    }
}

impl fmt::Debug for TypeDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDeclaration")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("is_abstract", &self.is_abstract)
            .field("target", &self.target)
            .field("extends", &self.extends)
            .field("implements", &self.implements)
            .field("description", &self.description)
            .field("resolve_type", &self.resolve_type.is_some())
            .finish()
    }
}

/// Argument accepted by a field or a root query.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDeclaration {
    pub name: Rc<str>,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
    pub description: Option<Rc<str>>,
}

impl ArgumentDeclaration {
    pub fn new(name: impl Into<Rc<str>>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
            description: None,
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<Rc<str>>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Declaration of a field on an object or interface type.
#[derive(Clone)]
pub struct FieldDeclaration {
    pub name: Rc<str>,
    pub ty: TypeRef,
    pub owner: Option<Target>,
    pub args: Vec<ArgumentDeclaration>,
    pub description: Option<Rc<str>>,
    pub deprecation_reason: Option<Rc<str>>,
    /// Without a resolver the field reads the property of the same name from
    /// its parent value.
    pub resolver: Option<ResolverFn>,
}

impl FieldDeclaration {
    pub fn new(name: impl Into<Rc<str>>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            owner: None,
            args: vec![],
            description: None,
            deprecation_reason: None,
            resolver: None,
        }
    }

    #[must_use]
    pub fn owner(mut self, owner: &Target) -> Self {
        self.owner = Some(owner.clone());
        self
    }

    #[must_use]
    pub fn argument(mut self, arg: ArgumentDeclaration) -> Self {
        self.args.push(arg);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<Rc<str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<Rc<str>>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn resolver<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(ResolverArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.resolver = Some(resolver_fn(callback));
        self
    }

    /// Resolvers are equal only when they are the same callback.
    pub(crate) fn same_declaration(&self, other: &FieldDeclaration) -> bool {
        self.name == other.name
            && self.ty == other.ty
            && self.args == other.args
            && self.description == other.description
            && self.deprecation_reason == other.deprecation_reason
            && same_callback(&self.resolver, &other.resolver)
    }
}

impl fmt::Debug for FieldDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDeclaration")
            .field("name", &self.name)
            .field("ty", &format_args!("{}", self.ty))
            .field("owner", &self.owner)
            .field("args", &self.args)
            .field("deprecation_reason", &self.deprecation_reason)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// A root query bound to an executable callback.
#[derive(Clone)]
pub struct ResolverDeclaration {
    pub container: Target,
    pub name: Rc<str>,
    pub return_type: TypeRef,
    pub args: Vec<ArgumentDeclaration>,
    pub description: Option<Rc<str>>,
    pub deprecation_reason: Option<Rc<str>>,
    pub callback: ResolverFn,
}

impl ResolverDeclaration {
    pub fn new<F, Fut>(
        container: &Target,
        name: impl Into<Rc<str>>,
        return_type: TypeRef,
        callback: F,
    ) -> Self
    where
        F: Fn(ResolverArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            container: container.clone(),
            name: name.into(),
            return_type,
            args: vec![],
            description: None,
            deprecation_reason: None,
            callback: resolver_fn(callback),
        }
    }

    /// A query that always returns `value`.
    pub fn constant(
        container: &Target,
        name: impl Into<Rc<str>>,
        return_type: TypeRef,
        value: Value,
    ) -> Self {
        Self::new(container, name, return_type, move |_| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    #[must_use]
    pub fn argument(mut self, arg: ArgumentDeclaration) -> Self {
        self.args.push(arg);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<Rc<str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<Rc<str>>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }

    pub(crate) fn same_declaration(&self, other: &ResolverDeclaration) -> bool {
        self.container == other.container
            && self.name == other.name
            && self.return_type == other.return_type
            && self.args == other.args
            && self.description == other.description
            && self.deprecation_reason == other.deprecation_reason
            && Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl fmt::Debug for ResolverDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverDeclaration")
            .field("container", &self.container)
            .field("name", &self.name)
            .field("return_type", &format_args!("{}", self.return_type))
            .field("args", &self.args)
            .finish()
    }
}

/// Input handed to a resolver callback.
#[derive(Debug, Clone, Default)]
pub struct ResolverArgs {
    parent: Option<Value>,
    args: Map<String, Value>,
}

impl ResolverArgs {
    pub fn new(parent: Option<Value>, args: Map<String, Value>) -> Self {
        Self { parent, args }
    }

    /// Value of the enclosing object. `None` for root queries.
    pub fn parent(&self) -> Option<&Value> {
        self.parent.as_ref()
    }

    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    /// Deserializes argument `name`. A missing argument reads as `null`, so
    /// optional arguments can be requested as `Option<T>`.
    pub fn arg<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self.args.get(name).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).with_context(|| format!("invalid argument `{name}`"))
    }
}
