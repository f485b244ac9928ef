//! Walkthrough: build an in-memory vault with the deterministic local
//! embedder, ingest a few facts, query them, and watch the cascade delete.
//!
//! ```bash
//! cargo run --example quickstart
//! ```

use std::sync::Arc;

use ragvault::{HashedEmbeddings, KnowledgeVault, VaultError};

#[tokio::main]
async fn main() -> Result<(), VaultError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let vault = KnowledgeVault::builder()
        .with_embedding_provider(Arc::new(HashedEmbeddings::new()))
        .build()
        .await?;

    let facts = [
        "The sky is blue. Water boils at 100 degrees.",
        "Rust has no garbage collector. Ownership is checked at compile time.",
        "SQLite stores the whole database in a single file.",
    ];
    let mut resources = Vec::new();
    for fact in facts {
        let resource = vault.ingest(fact).await?;
        println!("ingested {}", resource.id);
        resources.push(resource);
    }
    println!(
        "corpus: {} resources, {} embeddings\n",
        vault.resource_count().await?,
        vault.embedding_count().await?
    );

    for query in ["boiling point", "memory safety", "database files"] {
        println!("query: {query}");
        for hit in vault.retrieve(query, 2).await? {
            println!("  {:>6.3}  {}", hit.score, hit.content.trim());
        }
        println!();
    }

    let removed = vault.delete(&resources[0].id).await?;
    println!("deleted the first resource; {removed} embeddings went with it");
    println!(
        "corpus: {} resources, {} embeddings",
        vault.resource_count().await?,
        vault.embedding_count().await?
    );

    Ok(())
}
