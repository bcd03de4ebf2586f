//! In-process fake of an OpenAI-compatible embeddings + chat service.
//!
//! Embeddings are keyword counts over a small vocabulary plus a bias
//! dimension. Chat completions echo the first context passage found in the
//! user message, or the not-found sentence when there is none.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};

pub const VOCAB: &[&str] = &["sky", "blue", "water", "boil", "temperature", "apple"];
pub const NOT_FOUND: &str = "No relevant information found.";

pub const PARA_SKY: &str = "The sky is blue because of Rayleigh scattering.";
pub const PARA_WATER: &str = "Water boils at 100 degrees at sea level pressure.";

#[derive(Default)]
pub struct FakeState {
    pub embedding_calls: AtomicUsize,
    pub chat_calls: AtomicUsize,
    /// Respond 500 to this many requests before succeeding.
    pub fail_first: AtomicUsize,
    /// Status to use for injected failures (default 500).
    pub fail_status: AtomicUsize,
    /// Respond 400 to this many chat requests.
    pub fail_chat: AtomicUsize,
    /// Sleep before answering each request.
    pub delay_ms: AtomicUsize,
    pub last_chat: Mutex<Option<Value>>,
    pub embedding_batches: Mutex<Vec<usize>>,
}

pub struct FakeService {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
}

impl FakeService {
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn embedding_calls(&self) -> usize {
        self.state.embedding_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.state.chat_calls.load(Ordering::SeqCst)
    }
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let mut v: Vec<f32> = VOCAB
        .iter()
        .map(|term| words.iter().filter(|w| w.starts_with(term)).count() as f32)
        .collect();
    v.push(0.1);
    v
}

async fn injected_failure(state: &FakeState) -> Option<(StatusCode, Json<Value>)> {
    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }
    let remaining = state.fail_first.load(Ordering::SeqCst);
    if remaining > 0 {
        state.fail_first.store(remaining - 1, Ordering::SeqCst);
        let status = match state.fail_status.load(Ordering::SeqCst) {
            0 => 500,
            s => s as u16,
        };
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Some((status, Json(json!({"error": {"message": "injected failure"}}))));
    }
    None
}

async fn embeddings(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.embedding_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(fail) = injected_failure(&state).await {
        return fail;
    }
    let inputs: Vec<String> = body["input"]
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    state.embedding_batches.lock().unwrap().push(inputs.len());

    // Reverse order on the wire; clients must reorder by index.
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(i, text)| json!({"object": "embedding", "index": i, "embedding": keyword_vector(text)}))
        .collect();
    (StatusCode::OK, Json(json!({"object": "list", "data": data})))
}

async fn chat(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.chat_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(fail) = injected_failure(&state).await {
        return fail;
    }
    let remaining = state.fail_chat.load(Ordering::SeqCst);
    if remaining > 0 {
        state.fail_chat.store(remaining - 1, Ordering::SeqCst);
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"message": "context length exceeded"}})),
        );
    }
    *state.last_chat.lock().unwrap() = Some(body.clone());

    let user = body["messages"][1]["content"].as_str().unwrap_or_default();
    let answer = user
        .lines()
        .skip_while(|l| !l.starts_with("--- Context Part"))
        .nth(1)
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| NOT_FOUND.to_string());

    (
        StatusCode::OK,
        Json(json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": answer}, "finish_reason": "stop"}]
        })),
    )
}

pub async fn spawn_fake_service() -> FakeService {
    let state = Arc::new(FakeState::default());
    let app = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .route("/v1/chat/completions", post(chat))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    FakeService { addr, state }
}

/// Config TOML pointing both providers at `base_url`.
pub fn config_toml(document: &str, base_url: &str, chunk_size: usize) -> String {
    format!(
        r#"[document]
path = "{document}"

[chunking]
chunk_size = {chunk_size}
overlap = 0

[retrieval]
top_k = 1
score_threshold = 0.5

[embedding]
provider = "openai"
model = "fake-embed"
url = "{base_url}"
max_retries = 1
timeout_secs = 5

[generation]
provider = "openai"
model = "fake-chat"
url = "{base_url}"
max_retries = 1
timeout_secs = 5
"#
    )
}

/// Two 50-char paragraphs so `chunk_size = 50` puts each in its own chunk.
pub fn two_paragraph_text() -> String {
    let sky = format!("{:<50}", PARA_SKY);
    let water = format!("{:<50}", PARA_WATER);
    assert_eq!(sky.chars().count(), 50);
    assert_eq!(water.chars().count(), 50);
    format!("{}{}", sky, water)
}
