//! Contract tests run against every DocumentStore implementation.

use serde_json::json;
use std::sync::Arc;
use triage_store::{
    DocumentStore, Embedder, HashEmbedder, InMemoryDocumentStore, InMemoryVectorIndex,
    SqliteDocumentStore, VectorIndex,
};

fn stores() -> Vec<(&'static str, Arc<dyn DocumentStore>)> {
    vec![
        ("memory", Arc::new(InMemoryDocumentStore::new())),
        ("sqlite", Arc::new(SqliteDocumentStore::open_in_memory().unwrap())),
    ]
}

// =============================================================================
// Document store contract
// =============================================================================

#[tokio::test]
async fn test_consultation_roundtrip_all_backends() {
    for (name, store) in stores() {
        let record = json!({
            "user_id": "user-7",
            "human": {"symptoms": "sốt, ho", "patient_age": 30, "patient_gender": null},
            "ai": {"possible_conditions": ["Cảm cúm"]},
            "created_at": "2026-10-18T08:00:00Z",
            "updated_at": "2026-10-18T08:00:00Z"
        });
        let id = store.insert("consultations", record).await.unwrap();

        let by_id = store.find_by_id("consultations", &id).await.unwrap().unwrap();
        assert_eq!(by_id["human"]["symptoms"], "sốt, ho", "backend {}", name);

        let by_user = store
            .find_one("consultations", &json!({"user_id": "user-7"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_user["_id"], id, "backend {}", name);

        assert!(store
            .find_one("consultations", &json!({"user_id": "nobody"}))
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test]
async fn test_non_object_rejected_all_backends() {
    for (name, store) in stores() {
        assert!(store.insert("c", json!("text")).await.is_err(), "backend {}", name);
    }
}

// =============================================================================
// Vector index with local embedder
// =============================================================================

#[tokio::test]
async fn test_hash_embedder_with_memory_index() {
    let embedder = HashEmbedder::default();
    let index = InMemoryVectorIndex::new();

    for (id, text, stock) in [
        ("p1", "Paracetamol giảm đau hạ sốt", "IN-STOCK"),
        ("p2", "Siro ho thảo dược giảm ho", "IN-STOCK"),
        ("p3", "Paracetamol giảm đau hạ sốt viên sủi", "OUT-OF-STOCK"),
    ] {
        let vector = embedder.embed_document(text).await.unwrap();
        index
            .upsert(id, vector, json!({"medicine_id": id, "is_active": true, "stock_status": stock}))
            .await
            .unwrap();
    }

    let query = embedder.embed_query("hạ sốt giảm đau").await.unwrap();
    let hits = index
        .search(&query, Some("is_active == true and stock_status == 'IN-STOCK'"), 10)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "p1");
}
