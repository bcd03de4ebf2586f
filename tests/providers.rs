//! HTTP provider behavior against the in-process fake service: batching,
//! ordering, retry, and timeouts.

mod common;

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use common::{keyword_vector, spawn_fake_service};
use ragdoc::config::{EmbeddingConfig, GenerationConfig};
use ragdoc::embedding::OpenAiEmbedder;
use ragdoc::generation::OpenAiGenerator;
use ragdoc::retry::RetryPolicy;
use ragdoc_core::embedding::Embedder;
use ragdoc_core::error::{EmbeddingError, GenerationError};
use ragdoc_core::generation::{Generator, SamplingConfig};
use ragdoc_core::prompt::PromptMessages;

fn embed_config(url: &str, batch_size: usize, max_retries: u32) -> EmbeddingConfig {
    EmbeddingConfig {
        provider: "openai".to_string(),
        model: Some("fake-embed".to_string()),
        url: Some(url.to_string()),
        batch_size,
        max_retries,
        timeout_secs: 5,
        ..Default::default()
    }
}

fn chat_config(url: &str, max_retries: u32) -> GenerationConfig {
    GenerationConfig {
        model: "fake-chat".to_string(),
        url: Some(url.to_string()),
        max_retries,
        timeout_secs: 5,
        ..Default::default()
    }
}

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, 5).with_base_delay(Duration::from_millis(10))
}

fn messages(user: &str) -> PromptMessages {
    PromptMessages {
        system: "Answer only from the context.".to_string(),
        user: user.to_string(),
    }
}

#[tokio::test]
async fn test_embeddings_batched_and_ordered() {
    let fake = spawn_fake_service().await;
    let embedder = OpenAiEmbedder::with_api_key(&embed_config(&fake.base_url(), 2, 0), "sk-test".into())
        .unwrap();

    let texts: Vec<String> = ["blue sky", "water", "apple apple", "boiling", "temperature"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let vectors = embedder.embed_all(&texts).await.unwrap();

    assert_eq!(vectors.len(), texts.len());
    for (text, v) in texts.iter().zip(&vectors) {
        assert_eq!(v, &keyword_vector(text));
    }
    assert_eq!(*fake.state.embedding_batches.lock().unwrap(), vec![2, 2, 1]);
}

#[tokio::test]
async fn test_embedding_retries_server_errors() {
    let fake = spawn_fake_service().await;
    fake.state.fail_first.store(2, Ordering::SeqCst);
    let embedder = OpenAiEmbedder::with_api_key(&embed_config(&fake.base_url(), 64, 3), "sk-test".into())
        .unwrap()
        .with_policy(fast_policy(3));

    let v = embedder.embed("water").await.unwrap();
    assert_eq!(v, keyword_vector("water"));
    assert_eq!(fake.embedding_calls(), 3);
}

#[tokio::test]
async fn test_embedding_gives_up_after_max_retries() {
    let fake = spawn_fake_service().await;
    fake.state.fail_first.store(10, Ordering::SeqCst);
    let embedder = OpenAiEmbedder::with_api_key(&embed_config(&fake.base_url(), 64, 2), "sk-test".into())
        .unwrap()
        .with_policy(fast_policy(2));

    let err = embedder.embed("water").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::Service { status: 500, .. }));
    assert_eq!(fake.embedding_calls(), 3);
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let fake = spawn_fake_service().await;
    fake.state.fail_first.store(5, Ordering::SeqCst);
    fake.state.fail_status.store(401, Ordering::SeqCst);
    let generator = OpenAiGenerator::with_api_key(&chat_config(&fake.base_url(), 3), "sk-bad".into())
        .with_policy(fast_policy(3));

    let err = generator
        .generate(&messages("hello"), &SamplingConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Service { status: 401, .. }));
    assert!(!err.is_transient());
    assert_eq!(fake.chat_calls(), 1);
}

#[tokio::test]
async fn test_generation_timeout() {
    let fake = spawn_fake_service().await;
    fake.state.delay_ms.store(2_000, Ordering::SeqCst);
    let generator = OpenAiGenerator::with_api_key(&chat_config(&fake.base_url(), 0), "sk-test".into())
        .with_policy(fast_policy(0).with_timeout(Duration::from_millis(100)));

    let started = Instant::now();
    let err = generator
        .generate(&messages("hello"), &SamplingConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Timeout(_)), "got {:?}", err);
    assert!(started.elapsed() < Duration::from_millis(1_500));
}

#[tokio::test]
async fn test_generation_request_shape() {
    let fake = spawn_fake_service().await;
    let generator = OpenAiGenerator::with_api_key(&chat_config(&fake.base_url(), 0), "sk-test".into());

    let sampling = SamplingConfig::default();
    let text = generator
        .generate(
            &messages("Context:\n--- Context Part 1 ---\nWater boils at 100 degrees.\n\nq"),
            &sampling,
        )
        .await
        .unwrap();
    assert_eq!(text, "Water boils at 100 degrees.");

    let body = fake.state.last_chat.lock().unwrap().clone().unwrap();
    assert_eq!(body["model"], "fake-chat");
    assert_eq!(body["max_tokens"], 500);
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    assert!((body["top_p"].as_f64().unwrap() - 0.7).abs() < 1e-6);
}
