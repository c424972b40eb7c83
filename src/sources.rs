//! `ragdex sources`: list the connectors resolved from config.

use anyhow::Result;

use crate::config::Config;
use crate::traits::ConnectorRegistry;

pub fn list_sources(config: &Config) -> Result<()> {
    let registry = ConnectorRegistry::from_config(config);

    if registry.is_empty() {
        println!("No connectors configured.");
        return Ok(());
    }

    println!("Configured connectors ({}):", registry.len());
    for connector in registry.connectors() {
        println!("  {:<20} {}", connector.source_label(), connector.description());
    }

    println!();
    println!("Collection: {}", config.collection.name);
    println!("Store:      {}", config.store.url);
    println!(
        "Embedding:  {}{}",
        config.embedding.provider,
        config
            .embedding
            .model
            .as_deref()
            .map(|m| format!(" ({})", m))
            .unwrap_or_default()
    );

    Ok(())
}
