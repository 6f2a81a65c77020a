use super::*;
use crate::embedding::{EmbeddingCache, MockEmbedder};
use tempfile::TempDir;

const DIM: usize = 8;

fn store_in(dir: &TempDir) -> PatternStore<MockEmbedder> {
    let embedder = EmbeddingCache::open(
        MockEmbedder::new(DIM),
        dir.path().join("embedding_cache.json"),
        5500,
    )
    .expect("cache opens");
    PatternStore::open(embedder, dir.path()).expect("store opens")
}

fn pattern(description: &str, category: &str, severity: Severity) -> NewPattern {
    NewPattern {
        category: category.to_string(),
        severity,
        ..NewPattern::new(description, format!("避免: {description}"))
    }
}

#[tokio::test]
async fn test_batch_add_keeps_index_and_list_in_step() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let ids = store
        .add_patterns_batch(vec![
            pattern("答案遗漏就医建议", "diseases", Severity::Major),
            pattern("疫苗接种时间表不准确", "vaccines", Severity::Critical),
            pattern("检查前准备说明含糊", "examinations", Severity::Minor),
        ])
        .await
        .unwrap();

    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(store.len(), 3);
    assert_eq!(store.row_count(), store.len());
}

#[tokio::test]
async fn test_ids_are_dense_across_adds() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let first = store
        .add_pattern(pattern("描述一", "general", Severity::Minor))
        .await
        .unwrap();
    let second = store
        .add_pattern(pattern("描述二", "general", Severity::Minor))
        .await
        .unwrap();

    assert_eq!(first, 0);
    assert_eq!(second, 1);
}

#[tokio::test]
async fn test_retrieve_exact_description_scores_one() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store
        .add_patterns_batch(vec![
            pattern("答案遗漏就医建议", "diseases", Severity::Major),
            pattern("疫苗接种时间表不准确", "vaccines", Severity::Critical),
        ])
        .await
        .unwrap();

    // Identical text embeds to the identical vector: distance 0, score 1.
    let results = store
        .retrieve_relevant("答案遗漏就医建议", 1, None, Severity::Minor, 0.0)
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].pattern.id, 0);
    assert!((results[0].relevance_score - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_retrieve_respects_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store
        .add_patterns_batch(vec![
            pattern("答案遗漏就医建议", "diseases", Severity::Major),
            pattern("剂量单位写错", "diseases", Severity::Critical),
        ])
        .await
        .unwrap();

    let results = store
        .retrieve_relevant("一个毫不相关的问题", 5, None, Severity::Minor, 0.99)
        .await;

    for retrieved in &results {
        assert!(retrieved.relevance_score >= 0.99);
    }
    // Mock vectors are far apart; nothing should clear a 0.99 floor.
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_retrieve_category_filter_with_general_wildcard() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store
        .add_patterns_batch(vec![
            pattern("疫苗问题答案缺少禁忌说明", "vaccines", Severity::Major),
            pattern("手术恢复时间描述过于乐观", "surgeries", Severity::Major),
            pattern("答案缺少安全边界提示", "general", Severity::Major),
        ])
        .await
        .unwrap();

    let results = store
        .retrieve_relevant("接种疫苗要注意什么", 10, Some("vaccines"), Severity::Minor, 0.0)
        .await;

    assert!(!results.is_empty());
    for retrieved in &results {
        assert_ne!(retrieved.pattern.category, "surgeries");
        assert!(
            retrieved.pattern.category == "vaccines" || retrieved.pattern.category == "general"
        );
    }
    // The "general" pattern matches every requested category.
    assert!(results.iter().any(|r| r.pattern.category == "general"));
}

#[tokio::test]
async fn test_retrieve_severity_floor() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store
        .add_patterns_batch(vec![
            pattern("小瑕疵", "general", Severity::Minor),
            pattern("重大事实错误", "general", Severity::Critical),
        ])
        .await
        .unwrap();

    let results = store
        .retrieve_relevant("任意问题", 10, None, Severity::Major, 0.0)
        .await;

    for retrieved in &results {
        assert!(retrieved.pattern.severity >= Severity::Major);
    }
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_retrieve_returns_short_list_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store
        .add_pattern(pattern("唯一的模式", "general", Severity::Minor))
        .await
        .unwrap();

    let results = store
        .retrieve_relevant("问题", 5, None, Severity::Minor, 0.0)
        .await;
    assert_eq!(results.len(), 1);

    let empty = store
        .retrieve_relevant("问题", 5, Some("vaccines"), Severity::Critical, 0.0)
        .await;
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_retrieve_degrades_on_embedding_failure() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store
        .add_pattern(pattern("某个模式", "general", Severity::Minor))
        .await
        .unwrap();

    store.embedder.provider().set_failing(true);

    let results = store
        .retrieve_relevant("一个从未embed过的问题", 5, None, Severity::Minor, 0.0)
        .await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_add_fails_when_embedding_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store.embedder.provider().set_failing(true);

    let result = store
        .add_pattern(pattern("不会被存下来", "general", Severity::Minor))
        .await;

    assert!(matches!(result, Err(StoreError::Embedding(_))));
    assert_eq!(store.len(), 0);
    assert_eq!(store.row_count(), 0);
}

#[tokio::test]
async fn test_persist_failure_rolls_back_and_keeps_disk_consistent() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = store_in(&dir);
        store
            .add_pattern(pattern("答案遗漏就医建议", "diseases", Severity::Major))
            .await
            .unwrap();

        // A directory squatting on the index staging path makes the next
        // persist fail before any live file is replaced.
        let blocker = dir.path().join("patterns.idx.tmp");
        std::fs::create_dir(&blocker).unwrap();

        let result = store
            .add_pattern(pattern("不会被存下来", "general", Severity::Minor))
            .await;
        assert!(result.is_err());

        // In-memory state rolled back to the last persisted pair.
        assert_eq!(store.len(), 1);
        assert_eq!(store.row_count(), 1);

        std::fs::remove_dir(&blocker).unwrap();
    }

    // The on-disk pair stayed consistent: reopening succeeds and further
    // adds pick up where the rollback left off.
    let reopened = store_in(&dir);
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.row_count(), 1);

    let id = reopened
        .add_pattern(pattern("疫苗接种时间表不准确", "vaccines", Severity::Critical))
        .await
        .unwrap();
    assert_eq!(id, 1);
}

#[tokio::test]
async fn test_reopen_roundtrips_state() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = store_in(&dir);
        store
            .add_patterns_batch(vec![
                pattern("答案遗漏就医建议", "diseases", Severity::Major),
                pattern("疫苗接种时间表不准确", "vaccines", Severity::Critical),
            ])
            .await
            .unwrap();
    }

    let reopened = store_in(&dir);
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.row_count(), 2);

    let results = reopened
        .retrieve_relevant("答案遗漏就医建议", 1, None, Severity::Minor, 0.0)
        .await;
    assert_eq!(results[0].pattern.id, 0);
}

#[tokio::test]
async fn test_open_rejects_missing_companion() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = store_in(&dir);
        store
            .add_pattern(pattern("描述", "general", Severity::Minor))
            .await
            .unwrap();
    }

    std::fs::remove_file(dir.path().join("patterns.idx")).unwrap();

    let embedder = EmbeddingCache::open(
        MockEmbedder::new(DIM),
        dir.path().join("embedding_cache.json"),
        5500,
    )
    .unwrap();
    let result = PatternStore::open(embedder, dir.path());
    assert!(matches!(result, Err(StoreError::MissingCompanion { .. })));
}

#[tokio::test]
async fn test_get_top_patterns_sorted_by_frequency() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store
        .add_patterns_batch(vec![
            NewPattern {
                frequency: 1,
                ..pattern("很少见", "diseases", Severity::Minor)
            },
            NewPattern {
                frequency: 7,
                ..pattern("很常见", "diseases", Severity::Minor)
            },
            NewPattern {
                frequency: 3,
                ..pattern("一般", "vaccines", Severity::Minor)
            },
        ])
        .await
        .unwrap();

    let top = store.get_top_patterns(2, None, 2);
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].frequency, 7);
    assert_eq!(top[1].frequency, 3);

    let by_category = store.get_top_patterns(10, Some("diseases"), 0);
    assert_eq!(by_category.len(), 2);
}

#[tokio::test]
async fn test_stats_counts() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store
        .add_patterns_batch(vec![
            pattern("a", "diseases", Severity::Major),
            pattern("b", "diseases", Severity::Minor),
            pattern("c", "vaccines", Severity::Critical),
        ])
        .await
        .unwrap();

    let stats = store.stats();
    assert_eq!(stats.total_patterns, 3);
    assert_eq!(stats.by_category["diseases"], 2);
    assert_eq!(stats.by_severity["critical"], 1);
}
