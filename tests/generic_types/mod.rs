// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use gqlmeta::*;

use anyhow::Result;
use futures::executor::block_on;
use serde_json::json;

fn connection() -> GenericFactory {
    GenericFactory::new("Connection", |args| {
        vec![
            FieldDeclaration::new("count", TypeRef::named("Int").required()),
            FieldDeclaration::new(
                "items",
                TypeRef::list(args[0].clone().required()).required(),
            ),
        ]
    })
    .description("A page of items")
}

fn object(registry: &mut MetadataRegistry, name: &str, fields: &[(&str, &str)]) -> Result<Target> {
    let target = Target::new(name);
    registry.register_type(TypeDeclaration::object(&target))?;
    for (field, ty) in fields {
        registry.register_field(&target, FieldDeclaration::new(*field, ty.parse()?))?;
    }
    Ok(target)
}

#[test]
fn connections_for_users_and_dogs() -> Result<()> {
    let mut registry = MetadataRegistry::new();
    let user = object(&mut registry, "User", &[("id", "ID!"), ("name", "String!")])?;
    let dog = object(&mut registry, "Dog", &[("canBark", "Boolean!")])?;

    let factory = connection();
    let users = factory.instantiate(&mut registry, &[TypeRef::target(&user)])?;
    let dogs = factory.instantiate(&mut registry, &[TypeRef::target(&dog)])?;

    let resolvers = Target::new("DogResolver");
    registry.register_resolver(ResolverDeclaration::new(
        &resolvers,
        "dogs",
        TypeRef::target(&dogs).required(),
        |_| async {
            Ok(json!({
                "count": 2,
                "items": [{ "canBark": true }, { "canBark": false }]
            }))
        },
    ))?;
    registry.register_resolver(ResolverDeclaration::constant(
        &resolvers,
        "users",
        TypeRef::target(&users),
        json!({ "count": 0, "items": [] }),
    ))?;

    let schema = build_schema(&registry, &BuildSchemaOptions::new([&resolvers]))?;
    assert_eq!(
        schema.type_names(),
        ["User", "Dog", "UserConnection", "DogConnection", "Query"]
    );
    for name in ["UserConnection", "DogConnection"] {
        let ty = schema.get_type(name).unwrap();
        assert_eq!(ty.field_names(), ["count", "items"]);
        assert_eq!(ty.field("count").unwrap().ty.to_string(), "Int!");
        assert_eq!(ty.description.as_deref(), Some("A page of items"));
    }
    assert_eq!(
        schema.get_type("DogConnection").unwrap().field("items").unwrap().ty.to_string(),
        "[Dog!]!"
    );
    assert_eq!(
        schema.get_type("UserConnection").unwrap().field("items").unwrap().ty.to_string(),
        "[User!]!"
    );

    let response = block_on(schema.execute("{ dogs { count items { canBark } } }"));
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        json!({ "dogs": { "count": 2, "items": [{ "canBark": true }, { "canBark": false }] } })
    );

    let response = block_on(schema.execute("{ users { count items { name } } }"));
    assert_eq!(response.data, json!({ "users": { "count": 0, "items": [] } }));
    Ok(())
}

#[test]
fn connection_over_type_without_own_fields() -> Result<()> {
    let mut registry = MetadataRegistry::new();
    let animal = Target::new("Animal");
    registry.register_type(TypeDeclaration::object(&animal).abstract_type(true))?;
    registry.register_field(
        &animal,
        FieldDeclaration::new("name", TypeRef::named("String").required()),
    )?;
    let cat = Target::new("Cat");
    registry.register_type(TypeDeclaration::object(&cat).extends(&animal))?;

    let cats = connection().instantiate(&mut registry, &[TypeRef::target(&cat)])?;
    let resolvers = Target::new("CatResolver");
    registry.register_resolver(ResolverDeclaration::constant(
        &resolvers,
        "cats",
        TypeRef::target(&cats).required(),
        json!({ "count": 1, "items": [{ "name": "Tom" }] }),
    ))?;

    let schema = build_schema(&registry, &BuildSchemaOptions::new([&resolvers]))?;
    assert_eq!(
        schema.get_type("CatConnection").unwrap().field_names(),
        ["count", "items"]
    );
    assert_eq!(schema.get_type("Cat").unwrap().field_names(), ["name"]);

    let response = block_on(schema.execute("{ cats { count items { name } } }"));
    assert_eq!(
        response.data,
        json!({ "cats": { "count": 1, "items": [{ "name": "Tom" }] } })
    );
    Ok(())
}

#[test]
fn repeated_instantiation_reuses_the_type() -> Result<()> {
    let mut registry = MetadataRegistry::new();
    let dog = object(&mut registry, "Dog", &[("canBark", "Boolean!")])?;
    let factory = connection();

    let first = factory.instantiate(&mut registry, &[TypeRef::target(&dog)])?;
    let second = factory.instantiate(&mut registry, &[TypeRef::target(&dog)])?;
    assert_eq!(first, second);

    let resolvers = Target::new("DogResolver");
    registry.register_resolver(ResolverDeclaration::constant(
        &resolvers,
        "dogs",
        TypeRef::target(&first),
        json!(null),
    ))?;
    let schema = build_schema(&registry, &BuildSchemaOptions::new([&resolvers]))?;
    assert_eq!(schema.type_names(), ["Dog", "DogConnection", "Query"]);
    Ok(())
}

#[test]
fn instances_over_scalars_and_nested_instances() -> Result<()> {
    let mut registry = MetadataRegistry::new();
    let factory = connection();
    let numbers = factory.instantiate(&mut registry, &[TypeRef::named("Int")])?;
    let pages = factory.instantiate(&mut registry, &[TypeRef::target(&numbers)])?;
    assert_eq!(numbers.name(), "IntConnection");
    assert_eq!(pages.name(), "IntConnectionConnection");

    let resolvers = Target::new("Pages");
    registry.register_resolver(ResolverDeclaration::constant(
        &resolvers,
        "pages",
        TypeRef::target(&pages),
        json!({ "count": 1, "items": [{ "count": 2, "items": [1, 2] }] }),
    ))?;
    let schema = build_schema(&registry, &BuildSchemaOptions::new([&resolvers]))?;

    let response = block_on(schema.execute("{ pages { items { items } } }"));
    assert_eq!(
        response.data,
        json!({ "pages": { "items": [{ "items": [1, 2] }] } })
    );
    Ok(())
}

#[test]
fn abstract_generic_supertype() -> Result<()> {
    let mut registry = MetadataRegistry::new();
    let timestamped = GenericFactory::new("Timestamped", |args| {
        vec![
            FieldDeclaration::new("value", args[0].clone()),
            FieldDeclaration::new("at", TypeRef::scalar(Scalar::Date).required()),
        ]
    })
    .abstract_type(true);
    let base = timestamped.instantiate(&mut registry, &[TypeRef::named("Float")])?;

    let reading = Target::new("Reading");
    registry.register_type(TypeDeclaration::object(&reading).extends(&base))?;
    registry.register_field(&reading, FieldDeclaration::new("sensor", TypeRef::named("String")))?;

    let resolvers = Target::new("Readings");
    registry.register_resolver(ResolverDeclaration::constant(
        &resolvers,
        "latest",
        TypeRef::target(&reading),
        json!({ "value": 1.5, "at": 1700000000000u64, "sensor": "t1" }),
    ))?;

    let options = BuildSchemaOptions::new([&resolvers]).date_scalar_mode(DateScalarMode::Timestamp);
    let schema = build_schema(&registry, &options)?;
    assert_eq!(schema.type_names(), ["Reading", "Query"]);
    assert_eq!(
        schema.get_type("Reading").unwrap().field_names(),
        ["value", "at", "sensor"]
    );
    assert!(schema.sdl().contains("scalar Timestamp"));

    let response = block_on(schema.execute("{ latest { value at sensor } }"));
    assert_eq!(
        response.data,
        json!({ "latest": { "value": 1.5, "at": 1700000000000u64, "sensor": "t1" } })
    );
    Ok(())
}
