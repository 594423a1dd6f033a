use crate::model::{
    CollectionDef, DataType, Entity, OwnedReferenceDef, Property, PropertyDef, TypeDescriptor,
    TypeRegistry,
};
use crate::store::traits::EntityStore;
use anyhow::Result;
use serde_json::json;

/// Demo catalog type model: products (with a polymorphic bundle subtype)
/// owning a default sku, map-keyed attributes and reviews; skus owning media.
pub fn catalog_types() -> Vec<TypeDescriptor> {
    vec![
        TypeDescriptor::new("Product")
            .property(PropertyDef::new("name", DataType::String).required())
            .property(PropertyDef::new("status", DataType::String).default_value(json!("ACTIVE")))
            .property(PropertyDef::new("price", DataType::Number))
            .property(PropertyDef::new("cost", DataType::Number).visible_to("ROLE_ADMIN"))
            .property(PropertyDef::new("defaultSku", DataType::Id).references("Sku"))
            .owns(OwnedReferenceDef::new("defaultSku", "Sku"))
            .collection(CollectionDef::map(
                "attributes",
                "ProductAttribute",
                "product",
                "name",
            ))
            .collection(CollectionDef::list("reviews", "Review", "product").cascade(true)),
        TypeDescriptor::new("Bundle")
            .extends("Product")
            .property(PropertyDef::new("discount", DataType::Number)),
        TypeDescriptor::new("Sku")
            .property(PropertyDef::new("name", DataType::String))
            .property(PropertyDef::new("retailPrice", DataType::Number))
            .collection(CollectionDef::list("skuMedia", "Media", "sku")),
        TypeDescriptor::new("Media")
            .property(PropertyDef::new("url", DataType::String).required())
            .property(PropertyDef::new("title", DataType::String))
            .property(PropertyDef::new("sku", DataType::Id).references("Sku")),
        TypeDescriptor::new("VideoMedia")
            .extends("Media")
            .property(PropertyDef::new("durationSeconds", DataType::Number)),
        TypeDescriptor::new("ProductAttribute")
            .property(PropertyDef::new("name", DataType::String).required())
            .property(PropertyDef::new("value", DataType::String))
            .property(PropertyDef::new("product", DataType::Id).references("Product")),
        TypeDescriptor::new("Review")
            .property(PropertyDef::new("rating", DataType::Number).required())
            .property(PropertyDef::new("comment", DataType::String))
            .property(PropertyDef::new("product", DataType::Id).references("Product")),
    ]
}

pub fn catalog_registry() -> Result<TypeRegistry> {
    TypeRegistry::new(catalog_types())
}

fn create_system_entity(id: &str, entity_type: &str, properties: Vec<Property>) -> Entity {
    properties
        .into_iter()
        .fold(Entity::new(id, entity_type), |entity, prop| entity.with_property(prop))
}

/// Load a small catalog: one product with a default sku, media and
/// attributes, plus a bundle without any sub-collection items.
pub async fn load_seed_data<S: EntityStore>(store: &S) -> Result<()> {
    let records = vec![
        create_system_entity(
            "sku-chair",
            "Sku",
            vec![
                Property::string("name", "Oak chair"),
                Property::new("retailPrice", json!(129), DataType::Number),
            ],
        ),
        create_system_entity(
            "prod-chair",
            "Product",
            vec![
                Property::string("name", "Chair"),
                Property::string("status", "ACTIVE"),
                Property::new("price", json!(129), DataType::Number),
                Property::new("cost", json!(60), DataType::Number),
                Property::reference("defaultSku", "sku-chair", "Sku"),
            ],
        ),
        create_system_entity(
            "media-chair-front",
            "Media",
            vec![
                Property::string("url", "https://cdn.example.com/chair-front.jpg"),
                Property::string("title", "Front"),
                Property::reference("sku", "sku-chair", "Sku"),
            ],
        ),
        create_system_entity(
            "attr-chair-material",
            "ProductAttribute",
            vec![
                Property::string("name", "material"),
                Property::string("value", "oak"),
                Property::reference("product", "prod-chair", "Product"),
            ],
        ),
        create_system_entity(
            "bundle-dining",
            "Bundle",
            vec![
                Property::string("name", "Dining set"),
                Property::string("status", "ARCHIVED"),
                Property::new("price", json!(899), DataType::Number),
                Property::new("discount", json!(10), DataType::Number),
            ],
        ),
    ];

    for record in records {
        store.create(record, &[]).await?;
    }

    Ok(())
}
