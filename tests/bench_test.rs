//! Benchmark tests for critical operations
//!
//! Run with: cargo test bench --release -- --ignored --nocapture

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, TimeZone, Utc};
use tempfile::NamedTempFile;

use ai_disguise::analytics::{process_user_data, DEFAULT_TOP_N};
use ai_disguise::database::{init_db, insert_history, list_history};
use ai_disguise::model::{Conversion, HistoryRecord, OutputLanguage};
use ai_disguise::prompt::build_prompt;
use ai_disguise::rate_limit::{InMemoryUsageStore, UsageStore};
use ai_disguise::sanitize::sanitize;

/// Benchmark helper to measure execution time
fn benchmark<F>(name: &str, iterations: usize, mut f: F)
where
    F: FnMut(),
{
    let start = Instant::now();

    for _ in 0..iterations {
        f();
    }

    let duration = start.elapsed();
    let avg_us = duration.as_micros() as f64 / iterations as f64;
    let ops_per_sec = (iterations as f64 / duration.as_secs_f64()) as u64;

    println!("  {} ({} iterations)", name, iterations);
    println!("    Total time: {:?}", duration);
    println!("    Avg time: {:.3}µs", avg_us);
    println!("    Throughput: {} ops/sec\n", ops_per_sec);
}

fn sample_records(count: usize) -> Vec<HistoryRecord> {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let styles = ["chat", "poem", "formal", "humor"];
    (0..count)
        .map(|i| HistoryRecord {
            id: format!("rec{}", i),
            original: format!("message number {}", i),
            disguised: format!("disguised {}", i),
            style: styles[i % styles.len()].to_string(),
            conversion_mode: "style".to_string(),
            detected_language: if i % 5 == 0 { "zh" } else { "en" }.to_string(),
            output_language: "en".to_string(),
            is_favorited: i % 7 == 0,
            usage_count: (i % 4) as u32 + 1,
            created_at: Some(start + Duration::minutes(i as i64 * 37)),
            tags: vec![format!("tag{}", i % 3)],
            ..Default::default()
        })
        .collect()
}

#[test]
#[ignore] // Run explicitly with: cargo test bench --release -- --ignored --nocapture
fn bench_sanitize_and_prompt() {
    println!("\n=== Benchmark: Sanitize & Prompt ===\n");

    let raw = "```text\nResult: \"1. Hello there, friend!\n\n2. <b>See you</b>\"\n```";
    benchmark("Sanitize noisy output", 10_000, || {
        let _ = sanitize(raw);
    });

    let conversion = Conversion::Style("poem".to_string());
    benchmark("Build prompt (auto language)", 10_000, || {
        let _ = build_prompt("今天天气很好，我们去公园吧", &conversion, OutputLanguage::Auto);
    });
}

#[test]
#[ignore]
fn bench_analytics_scaling() {
    println!("\n=== Benchmark: Analytics Scaling ===\n");

    for &size in &[100, 1_000, 10_000] {
        let records = sample_records(size);
        benchmark(&format!("Process {} records", size), 20, || {
            let _ = process_user_data(&records, DEFAULT_TOP_N);
        });
    }
}

#[test]
#[ignore]
fn bench_history_listing() {
    println!("\n=== Benchmark: History Listing ===\n");

    let temp_db = NamedTempFile::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();

    println!("  Preparing: Inserting 1000 records...");
    for record in sample_records(1_000) {
        insert_history(&db, "bench_user", &record).unwrap();
    }
    println!("  Done!\n");

    benchmark("List first page", 1_000, || {
        let _ = list_history(&db, "bench_user", 0, 10);
    });
    benchmark("List deep page", 1_000, || {
        let _ = list_history(&db, "bench_user", 900, 10);
    });
}

#[tokio::test]
#[ignore]
async fn bench_concurrent_rate_limiting() {
    println!("\n=== Benchmark: Concurrent Rate Limiting ===\n");

    let store = Arc::new(InMemoryUsageStore::new(1_000_000));
    let num_tasks = 100;
    let ops_per_task = 1_000;

    let start = Instant::now();
    let mut handles = vec![];

    for task_id in 0..num_tasks {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let client = format!("10.0.0.{}", task_id % 10);
            for _ in 0..ops_per_task {
                store.try_reserve(&client).await;
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let duration = start.elapsed();
    let total_ops = num_tasks * ops_per_task;
    println!("  Total operations: {}", total_ops);
    println!("  Total time: {:?}", duration);
    println!(
        "  Throughput: {} ops/sec\n",
        (total_ops as f64 / duration.as_secs_f64()) as u64
    );

    let used: u32 = total_used(&store, 10).await;
    assert_eq!(used as usize, total_ops);
}

async fn total_used(store: &InMemoryUsageStore, clients: usize) -> u32 {
    let mut total = 0;
    for i in 0..clients {
        total += store.check_limit(&format!("10.0.0.{}", i)).await.used;
    }
    total
}
