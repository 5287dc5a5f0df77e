// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Parametric type factories.
//!
//! A [`GenericFactory`] produces a new named type each time it is
//! instantiated with type arguments it has not seen in the registry before.
//! Instantiating it again with the same arguments returns the type created
//! the first time, so naming and identity are both deterministic within one
//! registry.
//!
//! ```rust
//! let connection = GenericFactory::new("Connection", |args| {
//!     vec![
//!         FieldDeclaration::new("count", TypeRef::named("Int").required()),
//!         FieldDeclaration::new(
//!             "items",
//!             TypeRef::list(args[0].clone().required()).required(),
//!         ),
//!     ]
//! });
//! let user_connection = connection.instantiate(&mut registry, &[TypeRef::target(&user)])?;
//! assert_eq!(user_connection.name(), "UserConnection");
//! ```

use crate::error::BuildError;
use crate::registry::{validate_name, MetadataRegistry};
use crate::*;

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;


/// Produces the fields of an instantiation from its type arguments.
pub type FieldsFn = Rc<dyn Fn(&[TypeRef]) -> Vec<FieldDeclaration> + Send + Sync>;

/// Derives the name of an instantiation from its type arguments.
pub type NamingFn = Rc<dyn Fn(&[TypeRef]) -> String + Send + Sync>;

static NEXT_FACTORY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct GenericFactory {
    id: u64,
    name: Rc<str>,
    suffix: Rc<str>,
    naming: Option<NamingFn>,
    kind: TypeKind,
    is_abstract: bool,
    description: Option<Rc<str>>,
    implements: Vec<Target>,
    fields: FieldsFn,
}

impl GenericFactory {
    /// Creates a factory whose instantiations are named after their
    /// arguments followed by `name`, e.g. `UserConnection`.
    pub fn new<F>(name: impl Into<Rc<str>>, fields: F) -> Self
    where
        F: Fn(&[TypeRef]) -> Vec<FieldDeclaration> + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            id: NEXT_FACTORY_ID.fetch_add(1, Ordering::Relaxed),
            suffix: name.clone(),
            name,
            naming: None,
            kind: TypeKind::Object,
            is_abstract: false,
            description: None,
            implements: vec![],
            fields: Rc::new(fields),
        }
    }

    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<Rc<str>>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Replaces the argument-names-plus-suffix rule.
    #[must_use]
    pub fn naming<F>(mut self, naming: F) -> Self
    where
        F: Fn(&[TypeRef]) -> String + Send + Sync + 'static,
    {
        self.naming = Some(Rc::new(naming));
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Abstract instantiations are only useful as supertypes.
    #[must_use]
    pub fn abstract_type(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<Rc<str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn implements(mut self, interface: &Target) -> Self {
        self.implements.push(interface.clone());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name an instantiation with `args` gets.
    pub fn type_name(&self, args: &[TypeRef]) -> Result<String, BuildError> {
        self.check_arguments(args)?;
        Ok(match &self.naming {
            Some(naming) => naming(args),
            None => {
                let mut name: String = args.iter().map(TypeRef::base_name).collect();
                name.push_str(&self.suffix);
                name
            }
        })
    }

    fn check_arguments(&self, args: &[TypeRef]) -> Result<(), BuildError> {
        if args.is_empty() {
            return Err(BuildError::InvalidTypeArgument {
                generic: self.name.clone(),
                argument: "".into(),
                reason: "at least one type argument is required",
            });
        }
        match args.iter().find(|arg| !arg.is_named()) {
            Some(arg) => Err(BuildError::InvalidTypeArgument {
                generic: self.name.clone(),
                argument: arg.to_string().into(),
                reason: "type arguments must be named types without list or non-null wrappers",
            }),
            None => Ok(()),
        }
    }

    /// Registers the type for `args` and returns its target, or returns the
    /// target registered by an earlier call with equivalent arguments.
    ///
    /// A name argument and a target argument carrying the same name are
    /// equivalent. Nothing is registered when the produced fields conflict
    /// with each other.
    pub fn instantiate(
        &self,
        registry: &mut MetadataRegistry,
        args: &[TypeRef],
    ) -> Result<Target, BuildError> {
        let name: Rc<str> = self.type_name(args)?.into();
        let key = (self.id, name.clone());
        if let Some((cached, target)) = registry.instantiation(&key) {
            if !same_arguments(cached, args) {
                return Err(BuildError::DuplicateTypeName { name });
            }
            debug!("reusing instantiation `{name}` of generic `{}`", self.name);
            return Ok(target.clone());
        }

        validate_name(&name, "type")?;
        let fields = self.checked_fields(args, &name)?;

        let target = Target::new(name.clone());
        let mut decl = TypeDeclaration::with_kind(&target, self.kind).abstract_type(self.is_abstract);
        if let Some(description) = &self.description {
            decl = decl.description(description.clone());
        }
        for interface in &self.implements {
            decl = decl.implements(interface);
        }
        registry.register_type(decl)?;
        for field in fields {
            registry.register_field(&target, field)?;
        }

        debug!("instantiated generic `{}` as `{name}`", self.name);
        registry.record_instantiation(key, (args.to_vec(), target.clone()));
        Ok(target)
    }

    /// Fields for `args`, with repeated identical fields dropped.
    fn checked_fields(&self, args: &[TypeRef], name: &Rc<str>) -> Result<Vec<FieldDeclaration>, BuildError> {
        let mut fields: Vec<FieldDeclaration> = vec![];
        for field in (self.fields)(args) {
            validate_name(&field.name, "field")?;
            match fields.iter().find(|f| f.name == field.name) {
                Some(existing) if existing.same_declaration(&field) => {}
                Some(_) => {
                    return Err(BuildError::DuplicateRegistration {
                        kind: "field",
                        name: field.name,
                        target: name.clone(),
                    })
                }
                None => fields.push(field),
            }
        }
        Ok(fields)
    }
}

fn same_arguments(a: &[TypeRef], b: &[TypeRef]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(a, b)| match (a, b) {
            (TypeRef::Named(_), _) | (_, TypeRef::Named(_)) => a.base_name() == b.base_name(),
            _ => a == b,
        })
}

impl fmt::Debug for GenericFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericFactory")
            .field("name", &self.name)
            .field("suffix", &self.suffix)
            .field("kind", &self.kind)
            .field("is_abstract", &self.is_abstract)
            .finish_non_exhaustive()
    }
}
