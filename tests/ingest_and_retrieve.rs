//! End-to-end tests over the deterministic local embedding provider.
//!
//! Everything here is hermetic: embeddings come from `HashedEmbeddings`
//! and the store is a private in-memory database, so results are
//! reproducible in CI.

use std::sync::Arc;

use ragvault::{
    HashedEmbeddings, KnowledgeVault, NewEmbedding, SearcherKind, VaultError,
    chunking::chunk_text,
};

async fn make_vault() -> KnowledgeVault {
    KnowledgeVault::builder()
        .with_embedding_provider(Arc::new(HashedEmbeddings::new()))
        .build()
        .await
        .expect("in-memory vault should build")
}

#[tokio::test]
async fn ingest_then_retrieve_returns_a_chunk_of_the_text() {
    let vault = make_vault().await;
    let text = "Rust has no garbage collector. Ownership is checked at compile time.";
    vault.ingest(text).await.unwrap();

    let hits = vault.retrieve("garbage collector", 3).await.unwrap();
    assert!(!hits.is_empty());

    let chunks = chunk_text(text);
    assert!(
        hits.iter().any(|hit| chunks.contains(&hit.content)),
        "expected at least one hit to be a chunk of the ingested text"
    );
}

#[tokio::test]
async fn two_sentence_scenario_creates_two_records_and_one_resource() {
    let vault = make_vault().await;
    vault
        .ingest("The sky is blue. Water boils at 100 degrees.")
        .await
        .unwrap();

    assert_eq!(vault.resource_count().await.unwrap(), 1);
    assert_eq!(vault.embedding_count().await.unwrap(), 2);

    let hits = vault.retrieve("sky", 10).await.unwrap();
    let contents: Vec<&str> = hits.iter().map(|hit| hit.content.as_str()).collect();
    assert!(contents.contains(&"The sky is blue"));
    assert!(contents.contains(&" Water boils at 100 degrees"));
}

#[tokio::test]
async fn boiling_point_query_ranks_the_water_chunk_first() {
    let vault = make_vault().await;
    vault
        .ingest("The sky is blue. Water boils at 100 degrees.")
        .await
        .unwrap();

    let hits = vault.retrieve("boiling point", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, " Water boils at 100 degrees");
}

#[tokio::test]
async fn empty_ingest_fails_validation_and_writes_nothing() {
    let vault = make_vault().await;

    let err = vault.ingest("").await.unwrap_err();
    assert!(matches!(err, VaultError::Validation(_)));

    let err = vault.ingest("   \n ").await.unwrap_err();
    assert!(matches!(err, VaultError::Validation(_)));

    // Input that chunks to nothing is also refused before any write.
    let err = vault.ingest("...").await.unwrap_err();
    assert!(matches!(err, VaultError::Validation(_)));

    assert_eq!(vault.resource_count().await.unwrap(), 0);
    assert_eq!(vault.embedding_count().await.unwrap(), 0);
}

#[tokio::test]
async fn deleting_a_resource_removes_every_record_from_search() {
    let vault = make_vault().await;
    let kept = vault
        .ingest("Cats sleep most of the day. Cats purr when content.")
        .await
        .unwrap();
    let doomed = vault
        .ingest("Cats chase laser pointers. Cats knock things off tables.")
        .await
        .unwrap();

    let removed = vault.delete(&doomed.id).await.unwrap();
    assert_eq!(removed, 2);

    // Search the index directly so resource ids are visible.
    let provider = HashedEmbeddings::new();
    let query = ragvault::EmbeddingProvider::embed_batch(&provider, &["cats".to_string()])
        .await
        .unwrap()
        .remove(0);
    let hits = vault.index().search(&query, 10).unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|(rec, _)| rec.resource_id != doomed.id));
    assert!(hits.iter().any(|(rec, _)| rec.resource_id == kept.id));

    assert_eq!(vault.resource_count().await.unwrap(), 1);
    assert_eq!(vault.embedding_count().await.unwrap(), 2);
}

#[tokio::test]
async fn deleting_a_missing_resource_is_not_found() {
    let vault = make_vault().await;
    let err = vault.delete("no-such-resource").await.unwrap_err();
    assert_eq!(err, VaultError::NotFound("no-such-resource".to_string()));
}

#[tokio::test]
async fn dimension_mismatch_rejects_the_batch_and_leaves_the_index_unchanged() {
    let vault = make_vault().await;
    vault.ingest("A stable baseline sentence.").await.unwrap();
    let before = vault.embedding_count().await.unwrap();

    let resource = vault.index().insert_resource("raw resource").await.unwrap();
    let err = vault
        .index()
        .insert_many(vec![NewEmbedding {
            resource_id: resource.id.clone(),
            content: "bad vector".to_string(),
            vector: vec![0.5; 3],
        }])
        .await
        .unwrap_err();

    assert!(matches!(err, VaultError::SchemaViolation { .. }));
    assert_eq!(vault.embedding_count().await.unwrap(), before);
    assert_eq!(vault.index().searchable_count(), before);
}

#[tokio::test]
async fn search_on_an_empty_index_returns_empty_not_error() {
    let vault = make_vault().await;
    let hits = vault.retrieve("anything at all", 5).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn retrieve_validates_its_arguments() {
    let vault = make_vault().await;

    let err = vault.retrieve("query", 0).await.unwrap_err();
    assert!(matches!(err, VaultError::Validation(_)));

    let err = vault.retrieve("   ", 3).await.unwrap_err();
    assert!(matches!(err, VaultError::Validation(_)));
}

#[tokio::test]
async fn results_are_ordered_by_descending_score() {
    let vault = make_vault().await;
    vault
        .ingest("Bread needs flour and water. Planets orbit the sun. Flour comes from wheat.")
        .await
        .unwrap();

    let hits = vault.retrieve("flour for baking bread", 3).await.unwrap();
    assert!(hits.len() >= 2);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn concurrent_ingests_are_independent() {
    let vault = Arc::new(make_vault().await);

    let mut handles = Vec::new();
    for i in 0..8 {
        let vault = Arc::clone(&vault);
        handles.push(tokio::spawn(async move {
            vault
                .ingest(&format!("Fact number {i} about topic {i}. Extra detail {i}."))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(vault.resource_count().await.unwrap(), 8);
    assert_eq!(vault.embedding_count().await.unwrap(), 16);

    let hits = vault.retrieve("fact number 3", 4).await.unwrap();
    assert!(!hits.is_empty());
}

#[tokio::test]
async fn persisted_vault_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.sqlite");

    let resource_id = {
        let vault = KnowledgeVault::builder()
            .database_path(&path)
            .with_embedding_provider(Arc::new(HashedEmbeddings::new()))
            .build()
            .await
            .unwrap();
        let resource = vault
            .ingest("Glaciers carve valleys over millennia.")
            .await
            .unwrap();
        resource.id
    };

    let reopened = KnowledgeVault::builder()
        .database_path(&path)
        .with_embedding_provider(Arc::new(HashedEmbeddings::new()))
        .build()
        .await
        .unwrap();

    assert_eq!(reopened.resource_count().await.unwrap(), 1);
    let hits = reopened.retrieve("glaciers", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "Glaciers carve valleys over millennia");

    reopened.delete(&resource_id).await.unwrap();
    assert_eq!(reopened.embedding_count().await.unwrap(), 0);
}

#[tokio::test]
async fn exact_searcher_behaves_like_the_default() {
    let vault = KnowledgeVault::builder()
        .with_embedding_provider(Arc::new(HashedEmbeddings::new()))
        .searcher(SearcherKind::Exact)
        .build()
        .await
        .unwrap();

    vault
        .ingest("The sky is blue. Water boils at 100 degrees.")
        .await
        .unwrap();
    let hits = vault.retrieve("boiling point", 1).await.unwrap();
    assert_eq!(hits[0].content, " Water boils at 100 degrees");
}
