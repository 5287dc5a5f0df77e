// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Declarative schema documents.
//!
//! A document lists types, generic factories, their instantiations and root
//! queries returning static data, and registers them the same way code does:
//!
//! ```yaml
//! types:
//!   - name: Dog
//!     fields:
//!       - { name: canBark, type: Boolean! }
//! generics:
//!   - name: Connection
//!     params: [T]
//!     fields:
//!       - { name: count, type: Int! }
//!       - { name: items, type: "[T!]!" }
//! instances:
//!   - { generic: Connection, args: [Dog] }
//! resolvers:
//!   - container: DogResolver
//!     name: dogs
//!     type: DogConnection!
//!     data: { count: 1, items: [{ canBark: true }] }
//! ```

use crate::build::{build_schema, BuildSchemaOptions, DateScalarMode, NumberScalarMode};
use crate::error::BuildError;
use crate::generic::GenericFactory;
use crate::registry::MetadataRegistry;
use crate::schema::CompiledSchema;
use crate::*;

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_json::Value;


#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(default)]
    pub types: Vec<TypeSpec>,
    #[serde(default)]
    pub generics: Vec<GenericSpec>,
    #[serde(default)]
    pub instances: Vec<InstanceSpec>,
    #[serde(default)]
    pub resolvers: Vec<ResolverSpec>,
    #[serde(default)]
    pub options: DocumentOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TypeSpec {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    pub extends: Option<String>,
    #[serde(default)]
    pub implements: Vec<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    /// GraphQL type syntax, e.g. `[Item!]!`.
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub args: Vec<ArgumentSpec>,
    pub description: Option<String>,
    /// Deprecation reason.
    pub deprecated: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ArgumentSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub default: Option<Value>,
    pub description: Option<String>,
}

/// A generic factory. Its fields may use `params` as type names.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenericSpec {
    pub name: String,
    pub params: Vec<String>,
    /// Defaults to `name`.
    pub suffix: Option<String>,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InstanceSpec {
    pub generic: String,
    pub args: Vec<String>,
}

/// A root query that returns `data` unchanged.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResolverSpec {
    pub container: String,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub args: Vec<ArgumentSpec>,
    pub description: Option<String>,
    pub deprecated: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct DocumentOptions {
    pub skip_check: bool,
    pub date_scalar_mode: DateScalarMode,
    pub number_scalar_mode: NumberScalarMode,
}

type Names = IndexMap<Rc<str>, Target>;

/// Replaces names of known types with their targets.
fn link(ty: &TypeRef, names: &Names) -> TypeRef {
    ty.map_named(&|leaf: &TypeRef| match leaf {
        TypeRef::Named(name) => names.get(name).map_or_else(|| leaf.clone(), TypeRef::target),
        other => other.clone(),
    })
}

fn lookup(names: &Names, name: &str, referenced_by: &str) -> Result<Target, BuildError> {
    names
        .get(name)
        .cloned()
        .ok_or_else(|| BuildError::UnresolvedTypeReference {
            type_name: name.into(),
            referenced_by: referenced_by.into(),
            reason: Some("no type with this name is declared in the document"),
        })
}

impl ArgumentSpec {
    fn declaration(&self) -> Result<ArgumentDeclaration, BuildError> {
        let mut arg = ArgumentDeclaration::new(self.name.as_str(), self.ty.parse()?);
        if let Some(default) = &self.default {
            arg = arg.default_value(default.clone());
        }
        if let Some(description) = &self.description {
            arg = arg.description(description.as_str());
        }
        Ok(arg)
    }
}

impl FieldSpec {
    /// Field declaration with the types as written.
    fn declaration(&self) -> Result<FieldDeclaration, BuildError> {
        let mut field = FieldDeclaration::new(self.name.as_str(), self.ty.parse()?);
        for arg in &self.args {
            field = field.argument(arg.declaration()?);
        }
        if let Some(description) = &self.description {
            field = field.description(description.as_str());
        }
        if let Some(reason) = &self.deprecated {
            field = field.deprecated(reason.as_str());
        }
        Ok(field)
    }
}

impl GenericSpec {
    fn factory(&self, names: &Names) -> Result<GenericFactory, BuildError> {
        if let Some(param) = self.params.iter().find(|p| Scalar::from_name(p).is_some()) {
            return Err(BuildError::InvalidDocument(format!(
                "generic `{}` uses the scalar name `{param}` as a parameter",
                self.name
            )));
        }

        let params: Vec<Rc<str>> = self.params.iter().map(|p| p.as_str().into()).collect();
        let templates = self
            .fields
            .iter()
            .map(FieldSpec::declaration)
            .collect::<Result<Vec<_>, _>>()?;
        let names = names.clone();

        let mut factory = GenericFactory::new(self.name.as_str(), move |args: &[TypeRef]| {
            let substitute = |ty: &TypeRef| {
                ty.map_named(&|leaf: &TypeRef| match leaf {
                    TypeRef::Named(name) => match params.iter().position(|p| p == name) {
                        Some(i) => args.get(i).cloned().unwrap_or_else(|| leaf.clone()),
                        None => names.get(name).map_or_else(|| leaf.clone(), TypeRef::target),
                    },
                    other => other.clone(),
                })
            };
            templates
                .iter()
                .map(|template| {
                    let mut field = template.clone();
                    field.ty = substitute(&field.ty);
                    for arg in &mut field.args {
                        arg.ty = substitute(&arg.ty);
                    }
                    field
                })
                .collect()
        })
        .kind(self.kind)
        .abstract_type(self.is_abstract);

        if let Some(suffix) = &self.suffix {
            factory = factory.suffix(suffix.as_str());
        }
        if let Some(description) = &self.description {
            factory = factory.description(description.as_str());
        }
        Ok(factory)
    }
}

impl SchemaDocument {
    pub fn from_json_str(text: &str) -> Result<Self, BuildError> {
        Ok(serde_json::from_str(text)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> Result<Self, BuildError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Registers everything the document declares in `registry`.
    ///
    /// Generic instances are registered before the document's own types.
    pub fn register(&self, registry: &mut MetadataRegistry) -> Result<LoadedDocument, BuildError> {
        let mut names = Names::new();
        for spec in &self.types {
            let target = Target::new(spec.name.as_str());
            if names.insert(target.name_rc(), target).is_some() {
                return Err(BuildError::InvalidDocument(format!(
                    "type `{}` is declared more than once",
                    spec.name
                )));
            }
        }

        let mut factories = IndexMap::new();
        for spec in &self.generics {
            let factory = spec.factory(&names)?;
            if factories
                .insert(spec.name.clone(), (factory, spec.params.len()))
                .is_some()
            {
                return Err(BuildError::InvalidDocument(format!(
                    "generic `{}` is declared more than once",
                    spec.name
                )));
            }
        }

        for instance in &self.instances {
            let Some((factory, arity)) = factories.get(&instance.generic) else {
                return Err(BuildError::InvalidDocument(format!(
                    "instance of unknown generic `{}`",
                    instance.generic
                )));
            };
            if instance.args.len() != *arity {
                return Err(BuildError::InvalidDocument(format!(
                    "generic `{}` expects {arity} type arguments, got {}",
                    instance.generic,
                    instance.args.len()
                )));
            }
            let args = instance
                .args
                .iter()
                .map(|arg| Ok(link(&arg.parse::<TypeRef>()?, &names)))
                .collect::<Result<Vec<_>, BuildError>>()?;
            let target = factory.instantiate(registry, &args)?;
            match names.get(target.name()) {
                Some(existing) if existing != &target => {
                    return Err(BuildError::InvalidDocument(format!(
                        "instance `{target}` of generic `{}` clashes with a type of the same name",
                        instance.generic
                    )))
                }
                _ => {
                    names.insert(target.name_rc(), target);
                }
            }
        }

        for spec in &self.types {
            let target = lookup(&names, &spec.name, &spec.name)?;
            let mut decl = TypeDeclaration::with_kind(&target, spec.kind).abstract_type(spec.is_abstract);
            if let Some(supertype) = &spec.extends {
                decl = decl.extends(&lookup(&names, supertype, &spec.name)?);
            }
            for interface in &spec.implements {
                decl = decl.implements(&lookup(&names, interface, &spec.name)?);
            }
            if let Some(description) = &spec.description {
                decl = decl.description(description.as_str());
            }
            registry.register_type(decl)?;

            for field in &spec.fields {
                let mut declaration = field.declaration()?;
                declaration.ty = link(&declaration.ty, &names);
                for arg in &mut declaration.args {
                    arg.ty = link(&arg.ty, &names);
                }
                registry.register_field(&target, declaration)?;
            }
        }

        let mut containers: IndexMap<Rc<str>, Target> = IndexMap::new();
        for spec in &self.resolvers {
            let container = containers
                .entry(spec.container.as_str().into())
                .or_insert_with(|| Target::new(spec.container.as_str()))
                .clone();
            let return_type = link(&spec.ty.parse::<TypeRef>()?, &names);
            let mut resolver =
                ResolverDeclaration::constant(&container, spec.name.as_str(), return_type, spec.data.clone());
            for arg in &spec.args {
                resolver = resolver.argument(arg.declaration()?);
            }
            if let Some(description) = &spec.description {
                resolver = resolver.description(description.as_str());
            }
            if let Some(reason) = &spec.deprecated {
                resolver = resolver.deprecated(reason.as_str());
            }
            registry.register_resolver(resolver)?;
        }

        debug!(
            "registered document with {} types, {} instances and {} queries",
            self.types.len(),
            self.instances.len(),
            self.resolvers.len()
        );
        Ok(LoadedDocument {
            names,
            containers,
            factories: factories
                .into_iter()
                .map(|(name, (factory, _))| (name, factory))
                .collect(),
            options: self.options.clone(),
        })
    }

    /// Registers the document in a fresh registry and builds its schema.
    pub fn build(&self) -> Result<CompiledSchema, BuildError> {
        let mut registry = MetadataRegistry::new();
        let loaded = self.register(&mut registry)?;
        build_schema(&registry, &loaded.options())
    }
}

/// Targets created while registering a [`SchemaDocument`].
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    names: Names,
    containers: IndexMap<Rc<str>, Target>,
    factories: IndexMap<String, GenericFactory>,
    options: DocumentOptions,
}

impl LoadedDocument {
    /// Target of a document type or generic instance.
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.names.get(name)
    }

    pub fn container(&self, name: &str) -> Option<&Target> {
        self.containers.get(name)
    }

    pub fn containers(&self) -> impl Iterator<Item = &Target> + '_ {
        self.containers.values()
    }

    /// Factory of a document generic, for further instantiation in code.
    pub fn factory(&self, name: &str) -> Option<&GenericFactory> {
        self.factories.get(name)
    }

    /// Build options selecting every resolver container of the document.
    pub fn options(&self) -> BuildSchemaOptions {
        BuildSchemaOptions::new(self.containers.values())
            .skip_check(self.options.skip_check)
            .date_scalar_mode(self.options.date_scalar_mode)
            .number_scalar_mode(self.options.number_scalar_mode)
    }
}
