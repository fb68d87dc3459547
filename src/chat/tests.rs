use super::*;
use crate::PdfChatError;
use crate::chunking::{ChunkingConfig, Segment};
use crate::config::{ChatConfig, Config, GeminiConfig};
use crate::database::SegmentRecord;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer, dir: &TempDir) -> Config {
    Config {
        gemini: GeminiConfig {
            base_url: server.uri(),
            embedding_dimension: 3,
            ..GeminiConfig::default()
        },
        chunking: ChunkingConfig::default(),
        chat: ChatConfig::default(),
        base_dir: dir.path().to_path_buf(),
    }
}

fn record(
    source: &str,
    page: u32,
    index: usize,
    seq: u64,
    content: &str,
    vector: Vec<f32>,
) -> SegmentRecord {
    let segment = Segment {
        text: content.to_string(),
        source: source.to_string(),
        page,
        index,
        char_count: content.chars().count(),
    };
    SegmentRecord::new(&segment, vector, seq)
}

async fn seeded_store(config: &Config) -> VectorStore {
    let mut store = VectorStore::open_or_create(config)
        .await
        .expect("store should open");
    store
        .add_segments(vec![
            record(
                "guide.pdf",
                1,
                0,
                0,
                "Rust was announced in 2010.",
                vec![1.0, 0.0, 0.0],
            ),
            record(
                "guide.pdf",
                2,
                1,
                1,
                "Cargo is the package manager.",
                vec![0.0, 1.0, 0.0],
            ),
            record(
                "notes.pdf",
                1,
                0,
                2,
                "Lifetimes prevent dangling references.",
                vec![0.0, 0.0, 1.0],
            ),
        ])
        .await
        .expect("seed should succeed");
    store
}

async fn mount_embed(server: &MockServer, vector: &[f32]) {
    Mock::given(method("POST"))
        .and(path("/v1beta/models/embedding-001:embedContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": { "values": vector }
        })))
        .mount(server)
        .await;
}

fn generation_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] }
        }]
    }))
}

#[tokio::test]
async fn first_question_is_used_verbatim() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");
    let config = test_config(&server, &dir);
    let store = seeded_store(&config).await;
    let client = GeminiClient::new(&config, "test-key".to_string()).expect("client");

    mount_embed(&server, &[1.0, 0.0, 0.0]).await;

    // With no history, no rewrite request may be issued.
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(body_string_contains("reformulate"))
        .respond_with(generation_response("unexpected rewrite"))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(body_string_contains("Context:"))
        .respond_with(generation_response("Rust appeared in 2010."))
        .expect(1)
        .mount(&server)
        .await;

    let chain = RagChain::new(&config, &client, &store);
    let history = ChatHistory::new();
    let answer = chain
        .ask("When was Rust announced?", &history)
        .await
        .expect("ask should succeed");

    assert_eq!(answer.answer, "Rust appeared in 2010.");
    assert_eq!(answer.retrieval_query, "When was Rust announced?");
    assert!(!answer.sources.is_empty());
    assert_eq!(answer.sources[0].source, "guide.pdf");
    assert_eq!(answer.sources[0].page, 1);
}

#[tokio::test]
async fn followup_rewrites_into_standalone_query() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");
    let config = test_config(&server, &dir);
    let store = seeded_store(&config).await;
    let client = GeminiClient::new(&config, "test-key".to_string()).expect("client");

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(body_string_contains("reformulate"))
        .respond_with(generation_response("What language was announced in 2010?"))
        .expect(1)
        .mount(&server)
        .await;

    // The rewritten text, not the raw follow-up, is what gets embedded.
    Mock::given(method("POST"))
        .and(path("/v1beta/models/embedding-001:embedContent"))
        .and(body_string_contains("What language was announced in 2010?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": { "values": [1.0, 0.0, 0.0] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The answering request still carries the original question and the
    // prior exchange.
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(body_string_contains("Context:"))
        .and(body_string_contains("It appeared in 2010."))
        .and(body_string_contains("And what year again?"))
        .respond_with(generation_response("2010."))
        .expect(1)
        .mount(&server)
        .await;

    let mut history = ChatHistory::new();
    history.push_exchange("When was Rust announced?", "It appeared in 2010.");

    let chain = RagChain::new(&config, &client, &store);
    let answer = chain
        .ask("And what year again?", &history)
        .await
        .expect("ask should succeed");

    assert_eq!(answer.answer, "2010.");
    assert_eq!(answer.retrieval_query, "What language was announced in 2010?");
}

#[tokio::test]
async fn rewrite_failure_fails_the_turn() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");
    let config = test_config(&server, &dir);
    let store = seeded_store(&config).await;
    let client = GeminiClient::new(&config, "test-key".to_string()).expect("client");

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(body_string_contains("reformulate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    // The original question must not be embedded as a fallback.
    Mock::given(method("POST"))
        .and(path("/v1beta/models/embedding-001:embedContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": { "values": [1.0, 0.0, 0.0] }
        })))
        .expect(0)
        .mount(&server)
        .await;

    let mut history = ChatHistory::new();
    history.push_exchange("When was Rust announced?", "It appeared in 2010.");

    let chain = RagChain::new(&config, &client, &store);
    let error = chain
        .ask("And what year again?", &history)
        .await
        .expect_err("rewrite failure should fail the turn");

    assert!(error.is_transient());
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn context_joins_segments_in_rank_order() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");
    let config = test_config(&server, &dir);
    let store = seeded_store(&config).await;
    let client = GeminiClient::new(&config, "test-key".to_string()).expect("client");

    // Distances to [0.9, 0.4, 0.0] rank the three seeded segments strictly.
    mount_embed(&server, &[0.9, 0.4, 0.0]).await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(body_string_contains(
            "Rust was announced in 2010.\\n\\nCargo is the package manager.",
        ))
        .respond_with(generation_response("Grounded answer."))
        .expect(1)
        .mount(&server)
        .await;

    let chain = RagChain::new(&config, &client, &store);
    let answer = chain
        .ask("Tell me about Rust", &ChatHistory::new())
        .await
        .expect("ask should succeed");

    let sources: Vec<(&str, u32)> = answer
        .sources
        .iter()
        .map(|s| (s.source.as_str(), s.page))
        .collect();
    assert_eq!(
        sources,
        vec![("guide.pdf", 1), ("guide.pdf", 2), ("notes.pdf", 1)]
    );
    assert!(answer.sources[0].similarity >= answer.sources[1].similarity);
}

#[tokio::test]
async fn empty_store_still_answers_from_no_context() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");
    let config = test_config(&server, &dir);
    let store = VectorStore::open_or_create(&config)
        .await
        .expect("store should open");
    let client = GeminiClient::new(&config, "test-key".to_string()).expect("client");

    mount_embed(&server, &[1.0, 0.0, 0.0]).await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(generation_response("The documents do not cover this."))
        .expect(1)
        .mount(&server)
        .await;

    let chain = RagChain::new(&config, &client, &store);
    let answer = chain
        .ask("Anything?", &ChatHistory::new())
        .await
        .expect("ask should succeed");

    assert_eq!(answer.answer, "The documents do not cover this.");
    assert!(answer.sources.is_empty());
}

#[test]
fn retrieval_limit_takes_whole_store_up_to_cap() {
    assert_eq!(retrieval_limit(0), 20);
    assert_eq!(retrieval_limit(1), 1);
    assert_eq!(retrieval_limit(19), 19);
    assert_eq!(retrieval_limit(20), 20);
    assert_eq!(retrieval_limit(500), 20);
}

#[tokio::test]
async fn summarize_joins_segments_in_storage_order() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");
    let config = test_config(&server, &dir);
    let store = seeded_store(&config).await;
    let client = GeminiClient::new(&config, "test-key".to_string()).expect("client");

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(body_string_contains(
            "Rust was announced in 2010. Cargo is the package manager. \
             Lifetimes prevent dangling references.",
        ))
        .respond_with(generation_response("A short summary."))
        .expect(1)
        .mount(&server)
        .await;

    let summarizer = Summarizer::new(&config, &client, &store);
    let summary = summarizer.summarize().await.expect("summary should succeed");

    assert_eq!(summary, "A short summary.");
}

#[tokio::test]
async fn summarize_empty_store_is_not_found() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");
    let config = test_config(&server, &dir);
    let store = VectorStore::open_or_create(&config)
        .await
        .expect("store should open");
    let client = GeminiClient::new(&config, "test-key".to_string()).expect("client");

    // No mock is mounted: any model call would surface as a different error.
    let summarizer = Summarizer::new(&config, &client, &store);
    let error = summarizer
        .summarize()
        .await
        .expect_err("empty store should fail");

    assert!(matches!(error, PdfChatError::NotFound(_)));
}

#[tokio::test]
async fn summarize_rejects_oversized_input() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");
    let config = test_config(&server, &dir);
    let mut store = VectorStore::open_or_create(&config)
        .await
        .expect("store should open");
    let client = GeminiClient::new(&config, "test-key".to_string()).expect("client");

    let content = "x".repeat(2000);
    let records: Vec<SegmentRecord> = (0..201)
        .map(|i| record("big.pdf", 1, i, i as u64, &content, vec![1.0, 0.0, 0.0]))
        .collect();
    store.add_segments(records).await.expect("seed");

    let summarizer = Summarizer::new(&config, &client, &store);
    let error = summarizer
        .summarize()
        .await
        .expect_err("oversized input should fail");

    assert!(matches!(error, PdfChatError::InputTooLarge(_)));
}
