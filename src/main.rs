use open_admin_rust::config::AdminConfig;
use open_admin_rust::seed;
use open_admin_rust::{AdminEntityService, InMemoryStore, PermitAll, PersistencePackageRequest, UserContext};
use std::sync::Arc;

/// Loads the demo catalog into memory and prints the resolved metadata and
/// records of the type named on the command line (default `Product`).
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    open_admin_rust::init_logging();

    let config = AdminConfig::load()?;
    log::info!(
        "Configuration loaded: cache={}, removal={:?}",
        config.metadata.cache_enabled,
        config.removal.policy
    );

    let store = Arc::new(InMemoryStore::new(seed::catalog_registry()?));
    seed::load_seed_data(store.as_ref()).await?;

    let service = AdminEntityService::new(store, Arc::new(PermitAll), config);
    let type_name = std::env::args().nth(1).unwrap_or_else(|| "Product".to_string());
    let ctx = UserContext::system();

    let metadata = service
        .get_class_metadata(&PersistencePackageRequest::new(&type_name, ctx.clone()))
        .await?;
    println!("{}", serde_json::to_string_pretty(metadata.as_ref())?);

    let records = service
        .get_records(&PersistencePackageRequest::new(&type_name, ctx.clone()))
        .await?;
    for record in &records {
        let collections = service
            .get_records_for_all_sub_collections(&PersistencePackageRequest::new(&type_name, ctx.clone()), record)
            .await?;
        println!("{}", serde_json::to_string_pretty(record)?);
        for (name, items) in collections {
            println!("  {}: {} item(s)", name, items.len());
        }
    }

    Ok(())
}
