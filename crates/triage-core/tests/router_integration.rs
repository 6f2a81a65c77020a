//! End-to-end integration across store, engine, and prompt builder: the full
//! request path a gateway would exercise, minus HTTP.

use std::sync::Arc;

use tempfile::TempDir;

use triage::config::Config;
use triage::embedding::{EmbeddingCache, MockEmbedder};
use triage::engine::{DecisionEngine, EngineOptions, RoutingTier};
use triage::patterns::{NewPattern, PatternStore, Severity};
use triage::prompt::PromptBuilder;

const DIM: usize = 16;

fn write_reference_files(dir: &TempDir) {
    std::fs::write(
        dir.path().join("entity_names.json"),
        r#"{
            "diseases": ["糖尿病", "高血压", "白血病"],
            "vaccines": ["乙肝疫苗", "流感疫苗"]
        }"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("weaknesses.json"),
        r#"{
            "weaknesses": [{
                "weakness_id": "missing_referral_advice",
                "category": "diseases",
                "description": "答案缺少就医建议",
                "severity": "major",
                "frequency": 0.5,
                "triggers": {"keywords": ["症状"]},
                "prompt_addition": "必要时明确建议就医。"
            }]
        }"#,
    )
    .unwrap();
}

fn open_store(dir: &TempDir) -> PatternStore<MockEmbedder> {
    let cache = EmbeddingCache::open(
        MockEmbedder::new(DIM),
        dir.path().join("data").join("embedding_cache.json"),
        Config::default().max_embed_chars,
    )
    .unwrap();
    PatternStore::open(cache, &dir.path().join("data")).unwrap()
}

fn open_engine(dir: &TempDir) -> DecisionEngine {
    DecisionEngine::new(
        dir.path().join("entity_names.json"),
        dir.path().join("weaknesses.json"),
        EngineOptions::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_full_request_path_weakness_tier() {
    let dir = tempfile::tempdir().unwrap();
    write_reference_files(&dir);

    let store = open_store(&dir);
    let engine = open_engine(&dir);

    store
        .add_pattern(NewPattern {
            category: "diseases".to_string(),
            severity: Severity::Major,
            ..NewPattern::new("糖尿病症状回答不完整", "逐项列出典型与不典型症状")
        })
        .await
        .unwrap();

    let decision = engine.get_routing_decision("糖尿病有什么症状", Some("diseases"), 0.70, false);
    assert_eq!(decision.routing_tier, RoutingTier::Weakness);
    assert!(decision.use_rag);

    let retrieved = store
        .retrieve_relevant("糖尿病有什么症状", 5, Some("diseases"), Severity::Minor, 0.0)
        .await;
    assert!(!retrieved.is_empty());

    let context = retrieved
        .iter()
        .map(|r| r.pattern.guideline.clone())
        .collect::<Vec<_>>()
        .join("\n");
    let prompt =
        PromptBuilder.build_prompt(None, &decision.weakness_patterns, Some(&context));

    assert!(prompt.contains("必要时明确建议就医。"));
    assert!(prompt.contains("逐项列出典型与不典型症状"));
}

#[tokio::test]
async fn test_state_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    write_reference_files(&dir);

    {
        let store = open_store(&dir);
        store
            .add_patterns_batch(vec![
                NewPattern::new("描述一", "指南一"),
                NewPattern::new("描述二", "指南二"),
            ])
            .await
            .unwrap();
    }

    // A second "process" reopens everything from disk.
    let store = open_store(&dir);
    assert_eq!(store.len(), 2);
    assert_eq!(store.row_count(), 2);

    // Cached embeddings answer without the provider.
    store.embedder().provider().set_failing(true);
    let retrieved = store
        .retrieve_relevant("描述一", 1, None, Severity::Minor, 0.0)
        .await;
    assert_eq!(retrieved.len(), 1);
    assert_eq!(retrieved[0].pattern.description, "描述一");
}

#[tokio::test]
async fn test_shared_store_concurrent_reads_and_writes() {
    let dir = tempfile::tempdir().unwrap();
    write_reference_files(&dir);

    let store = Arc::new(open_store(&dir));

    let mut tasks = Vec::new();
    for i in 0..4 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store
                .add_pattern(NewPattern::new(format!("描述 {i}"), format!("指南 {i}")))
                .await
                .unwrap();
        }));
    }
    for i in 0..4 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            // Readers may run mid-write; they must never observe torn state.
            store
                .retrieve_relevant(&format!("描述 {i}"), 3, None, Severity::Minor, 0.0)
                .await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.len(), 4);
    assert_eq!(store.row_count(), store.len());
}

#[tokio::test]
async fn test_routing_reflects_weakness_file_edits() {
    let dir = tempfile::tempdir().unwrap();
    write_reference_files(&dir);
    let engine = open_engine(&dir);

    let decision = engine.get_routing_decision("乙肝疫苗多久打一次", None, 0.70, false);
    assert_eq!(decision.routing_tier, RoutingTier::Rag);

    std::fs::write(
        dir.path().join("weaknesses.json"),
        r#"{
            "weaknesses": [{
                "weakness_id": "vaccine_schedule_errors",
                "category": "vaccines",
                "description": "接种时间表出错",
                "severity": "critical",
                "frequency": 0.6,
                "triggers": {"keywords": ["疫苗"]},
                "prompt_addition": "核对官方免疫规划时间表。"
            }]
        }"#,
    )
    .unwrap();
    let file = std::fs::File::options()
        .write(true)
        .open(dir.path().join("weaknesses.json"))
        .unwrap();
    file.set_modified(std::time::SystemTime::now() + std::time::Duration::from_secs(5))
        .unwrap();

    assert!(engine.check_for_updates());

    let decision = engine.get_routing_decision("乙肝疫苗多久打一次", None, 0.70, false);
    assert_eq!(decision.routing_tier, RoutingTier::Weakness);
    assert_eq!(
        decision.weakness_patterns[0].weakness.weakness_id,
        "vaccine_schedule_errors"
    );
}
