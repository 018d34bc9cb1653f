use anyhow::Result;
use async_trait::async_trait;
use docqa_cli::channels::{MessageSender, ONLY_TEXT_REPLY};
use docqa_cli::server::{self, ServerState};
use docqa_cli::{AppConfig, AppContext};
use docqa_indexer::{CanonicalReindex, GateOutcome, ReindexWatcher, WatcherConfig};
use docqa_search::{GenerationError, Generator};
use docqa_vector_store::{HashEmbedder, VectorIndex};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const VERIFY_TOKEN: &str = "espazo-verify";

/// Answers with the first line of the context section so tests can see
/// which chunk was retrieved.
#[derive(Default)]
struct ContextEcho {
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl Generator for ContextEcho {
    fn model_id(&self) -> &str {
        "context-echo"
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        if self.fail {
            return Err(GenerationError::Timeout);
        }
        let first = prompt
            .split("Context:\n")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .unwrap_or_default();
        Ok(first.to_string())
    }
}

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingSender {
    fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().expect("lock").clone()
    }

    async fn wait_for(&self, count: usize) -> Vec<(String, String, String)> {
        for _ in 0..200 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_whatsapp(&self, to: &str, text: &str) -> Result<()> {
        self.sent
            .lock()
            .expect("lock")
            .push(("whatsapp".into(), to.into(), text.into()));
        Ok(())
    }

    async fn send_instagram(&self, recipient_id: &str, text: &str) -> Result<()> {
        self.sent
            .lock()
            .expect("lock")
            .push(("instagram".into(), recipient_id.into(), text.into()));
        Ok(())
    }
}

struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
    generator: Arc<ContextEcho>,
    sender: Arc<RecordingSender>,
    watcher: Option<ReindexWatcher>,
    _docs: TempDir,
    _index: TempDir,
}

impl TestServer {
    async fn start(ingest: bool, generator: ContextEcho) -> Self {
        Self::start_with(ingest, generator, false).await
    }

    async fn start_with(ingest: bool, generator: ContextEcho, watch: bool) -> Self {
        let docs = TempDir::new().expect("docs dir");
        let index = TempDir::new().expect("index dir");
        std::fs::write(
            docs.path().join("domes.txt"),
            "The glamping domes have heating and are open all year round.",
        )
        .expect("write domes");
        std::fs::write(
            docs.path().join("checkout.txt"),
            "Checkout is at 11am and late checkout costs extra.",
        )
        .expect("write checkout");

        let mut config = AppConfig::default();
        config.source.data_dir = docs.path().to_path_buf();
        config.index.index_dir = index.path().to_path_buf();
        config.answer.persona = None;
        config.answer.k = 1;

        let store = Arc::new(VectorIndex::open(index.path()).await.expect("open index"));
        let generator = Arc::new(generator);
        let ctx = AppContext::from_parts(
            config,
            store,
            Arc::new(HashEmbedder::default()),
            generator.clone(),
        );
        if ingest {
            let request = ctx.ingest_request(true, None).expect("request");
            let outcome = ctx.gate.run(&request).await.expect("ingest");
            assert!(matches!(outcome, GateOutcome::Completed(_)));
        }

        let watcher = watch.then(|| {
            let request = ctx.ingest_request(true, None).expect("request");
            let target = Arc::new(CanonicalReindex::new(ctx.gate.clone(), request));
            let config = WatcherConfig {
                debounce: Duration::from_millis(50),
                ..WatcherConfig::default()
            };
            ReindexWatcher::start(docs.path(), target, config).expect("start watcher")
        });

        let sender = Arc::new(RecordingSender::default());
        let state = ServerState {
            qa: ctx.qa.clone(),
            sender: sender.clone(),
            verify_token: Some(VERIFY_TOKEN.to_string()),
            default_language: "Auto".to_string(),
            watcher_health: watcher.as_ref().map(ReindexWatcher::health_stream),
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            server::serve(listener, state, std::future::pending())
                .await
                .expect("serve");
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            generator,
            sender,
            watcher,
            _docs: docs,
            _index: index,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("request");
        let status = response.status().as_u16();
        (status, response.json().await.expect("json body"))
    }

    async fn get(&self, path: &str) -> (u16, String) {
        let response = self.client.get(self.url(path)).send().await.expect("request");
        let status = response.status().as_u16();
        (status, response.text().await.expect("body"))
    }

    fn prompts(&self) -> Vec<String> {
        self.generator.prompts.lock().expect("lock").clone()
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let server = TestServer::start(false, ContextEcho::default()).await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(
        serde_json::from_str::<Value>(&body).expect("json"),
        json!({"status": "ok"})
    );
}

#[tokio::test]
async fn health_includes_watcher_progress() {
    let server = TestServer::start_with(false, ContextEcho::default(), true).await;
    let watcher = server.watcher.as_ref().expect("watcher");

    let (_, body) = server.get("/health").await;
    let body: Value = serde_json::from_str(&body).expect("json");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["watcher"]["runs"], 0);

    watcher.trigger("initial build").await.expect("trigger");
    let mut health = Value::Null;
    for _ in 0..100 {
        let (status, body) = server.get("/health").await;
        assert_eq!(status, 200);
        health = serde_json::from_str(&body).expect("json");
        if health["watcher"]["runs"] == 1 && health["watcher"]["state"] == "idle" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(health["watcher"]["runs"], 1);
    assert_eq!(health["watcher"]["state"], "idle");
    assert_eq!(health["watcher"]["consecutive_failures"], 0);
    assert!(health["watcher"]["last_error"].is_null());

    let (status, body) = server
        .post_json("/chat", json!({"message": "Is late checkout possible?"}))
        .await;
    assert_eq!(status, 200);
    assert!(body["response"]
        .as_str()
        .expect("response")
        .contains("Checkout is at 11am"));
    watcher.stop().await;
}

#[tokio::test]
async fn chat_answers_from_indexed_documents() {
    let server = TestServer::start(true, ContextEcho::default()).await;

    let (status, body) = server
        .post_json(
            "/chat",
            json!({"message": "Do the glamping domes have heating?", "language": "Spanish"}),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"response": "The glamping domes have heating and are open all year round."})
    );
    let prompts = server.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Respond in Spanish."));
}

#[tokio::test]
async fn chat_error_statuses() {
    let server = TestServer::start(false, ContextEcho::default()).await;

    let (status, body) = server.post_json("/chat", json!({"message": "   "})).await;
    assert_eq!(status, 400);
    assert!(body["detail"].is_string());

    let (status, body) = server
        .post_json("/chat", json!({"message": "Is there wifi?", "user_id": "u1"}))
        .await;
    assert_eq!(status, 503);
    assert!(body["detail"]
        .as_str()
        .expect("detail")
        .contains("documents_fixed"));
    assert!(server.prompts().is_empty());
}

#[tokio::test]
async fn generation_failure_is_bad_gateway() {
    let generator = ContextEcho {
        fail: true,
        ..ContextEcho::default()
    };
    let server = TestServer::start(true, generator).await;

    let (status, _) = server
        .post_json("/chat", json!({"message": "When is checkout?"}))
        .await;
    assert_eq!(status, 502);
}

#[tokio::test]
async fn webhook_verification_handshake() {
    let server = TestServer::start(false, ContextEcho::default()).await;

    for path in ["/whatsapp/webhook", "/instagram/webhook"] {
        let ok = format!(
            "{path}?hub.mode=subscribe&hub.verify_token={VERIFY_TOKEN}&hub.challenge=1158201444"
        );
        assert_eq!(server.get(&ok).await, (200, "1158201444".to_string()));

        let wrong = format!("{path}?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=1");
        assert_eq!(server.get(&wrong).await.0, 403);

        assert_eq!(server.get(path).await.0, 400);
    }
}

#[tokio::test]
async fn whatsapp_text_is_answered_and_delivered() {
    let server = TestServer::start(true, ContextEcho::default()).await;
    let payload = json!({
        "entry": [{
            "changes": [{
                "value": {
                    "messages": [{
                        "from": "34600000000",
                        "type": "text",
                        "text": {"body": "When is checkout?"}
                    }]
                }
            }]
        }]
    });

    let (status, body) = server.post_json("/whatsapp/webhook", payload).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"status": "received"}));

    let sent = server.sender.wait_for(1).await;
    assert_eq!(
        sent,
        vec![(
            "whatsapp".to_string(),
            "34600000000".to_string(),
            "Checkout is at 11am and late checkout costs extra.".to_string()
        )]
    );
}

#[tokio::test]
async fn whatsapp_non_text_gets_fixed_reply_and_status_updates_are_ignored() {
    let server = TestServer::start(true, ContextEcho::default()).await;

    let status_update = json!({
        "entry": [{"changes": [{"value": {"statuses": [{"status": "read"}]}}]}]
    });
    let (status, _) = server.post_json("/whatsapp/webhook", status_update).await;
    assert_eq!(status, 200);

    let image = json!({
        "entry": [{"changes": [{"value": {"messages": [
            {"from": "34611111111", "type": "image", "image": {"id": "abc"}}
        ]}}]}]
    });
    server.post_json("/whatsapp/webhook", image).await;

    let sent = server.sender.wait_for(1).await;
    assert_eq!(
        sent,
        vec![(
            "whatsapp".to_string(),
            "34611111111".to_string(),
            ONLY_TEXT_REPLY.to_string()
        )]
    );
    assert!(server.prompts().is_empty());
}

#[tokio::test]
async fn instagram_answers_each_text_event() {
    let server = TestServer::start(true, ContextEcho::default()).await;
    let payload = json!({
        "entry": [{
            "messaging": [
                {"sender": {"id": "ig-1"}, "message": {"text": "Do the domes have heating?"}},
                {"sender": {"id": "ig-2"}, "read": {"mid": "m1"}}
            ]
        }]
    });

    let (status, body) = server.post_json("/instagram/webhook", payload).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"status": "received"}));

    let sent = server.sender.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "instagram");
    assert_eq!(sent[0].1, "ig-1");
    assert!(sent[0].2.contains("heating"));
}
