//! Offline webhook routing tests: serve the app with recording stand-ins for
//! the LINE and OpenAI clients and assert delivery-level behavior end to end.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use lib::channels::{sign_body, LineError, ReplySender};
use lib::config::Config;
use lib::gateway::{build_app, AppState};
use lib::llm::{Completer, OpenAiError, SamplingConfig};
use lib::router::{
    Clock, Router, RouterRules, ESCALATION_CONTACT_REQUEST, ESCALATION_FOLLOW_UP,
};
use std::sync::{Arc, Mutex};

const CHANNEL_SECRET: &str = "routing-test-secret";

struct FixedClock(DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[derive(Default)]
struct RecordingSender {
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl ReplySender for RecordingSender {
    async fn reply(&self, reply_token: &str, texts: &[String]) -> Result<(), LineError> {
        self.calls
            .lock()
            .expect("lock")
            .push((reply_token.to_string(), texts.to_vec()));
        Ok(())
    }
}

struct StubCompleter {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl StubCompleter {
    fn new(fail: bool) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail,
        }
    }
}

#[async_trait]
impl Completer for StubCompleter {
    async fn complete(
        &self,
        _model: &str,
        _system_prompt: &str,
        user_text: &str,
        _sampling: SamplingConfig,
    ) -> Result<String, OpenAiError> {
        self.calls.lock().expect("lock").push(user_text.to_string());
        if self.fail {
            Err(OpenAiError::Api("simulated outage".to_string()))
        } else {
            Ok(format!("answer to: {}", user_text))
        }
    }
}

/// Sunday noon Bangkok time: outside the working window, so non-keyword text
/// takes the model fallback while keywords still escalate.
fn sunday_noon() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(7 * 3600)
        .expect("offset")
        .with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid datetime")
}

fn state_with(
    sender: Arc<RecordingSender>,
    completer: Arc<StubCompleter>,
) -> AppState {
    let config = Config::default();
    let rules = RouterRules::from_config(&config.routing).expect("default rules");
    let router = Router::new(
        rules,
        config.openai.model.clone(),
        SamplingConfig {
            temperature: config.openai.temperature,
            max_tokens: config.openai.max_tokens,
        },
        sender,
        completer,
        Arc::new(FixedClock(sunday_noon())),
    );
    AppState {
        config: Arc::new(config),
        router: Arc::new(router),
        channel_secret: Arc::new(CHANNEL_SECRET.to_string()),
    }
}

async fn serve(state: AppState) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let port = listener.local_addr().expect("local_addr").port();
    let app = build_app(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    port
}

async fn post_signed(port: u16, body: &str) -> reqwest::StatusCode {
    reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/webhook", port))
        .header("X-Line-Signature", sign_body(CHANNEL_SECRET, body.as_bytes()))
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .expect("send webhook")
        .status()
}

fn text_event_json(reply_token: &str, text: &str) -> String {
    format!(
        r#"{{ "type": "message", "replyToken": "{}", "message": {{ "type": "text", "id": "m", "text": "{}" }} }}"#,
        reply_token, text
    )
}

#[tokio::test]
async fn keyword_delivery_escalates_with_two_messages() {
    let sender = Arc::new(RecordingSender::default());
    let completer = Arc::new(StubCompleter::new(false));
    let port = serve(state_with(sender.clone(), completer.clone())).await;

    let body = format!(r#"{{ "events": [ {} ] }}"#, text_event_json("rt-1", "ติดตั้ง"));
    let status = post_signed(port, &body).await;
    assert_eq!(status, reqwest::StatusCode::OK);

    let calls = sender.calls.lock().expect("lock");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "rt-1");
    assert_eq!(
        calls[0].1,
        vec![
            ESCALATION_FOLLOW_UP.to_string(),
            ESCALATION_CONTACT_REQUEST.to_string()
        ]
    );
    assert!(completer.calls.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn mixed_batch_sends_one_reply_per_actionable_event() {
    let sender = Arc::new(RecordingSender::default());
    let completer = Arc::new(StubCompleter::new(false));
    let port = serve(state_with(sender.clone(), completer.clone())).await;

    let body = format!(
        r#"{{ "events": [ {}, {}, {{ "type": "follow", "replyToken": "rt-3" }} ] }}"#,
        text_event_json("rt-1", "gate dimensions please"),
        text_event_json("rt-2", "hello there")
    );
    let status = post_signed(port, &body).await;
    assert_eq!(status, reqwest::StatusCode::OK);

    let calls = sender.calls.lock().expect("lock");
    assert_eq!(calls.len(), 2);
    let escalation = calls.iter().find(|c| c.0 == "rt-1").expect("rt-1 reply");
    assert_eq!(escalation.1.len(), 2);
    let fallback = calls.iter().find(|c| c.0 == "rt-2").expect("rt-2 reply");
    assert_eq!(fallback.1, vec!["answer to: hello there".to_string()]);

    let completions = completer.calls.lock().expect("lock");
    assert_eq!(completions.as_slice(), ["hello there"]);
}

#[tokio::test]
async fn completion_failure_turns_the_delivery_into_500() {
    let sender = Arc::new(RecordingSender::default());
    let completer = Arc::new(StubCompleter::new(true));
    let port = serve(state_with(sender.clone(), completer.clone())).await;

    let body = format!(
        r#"{{ "events": [ {}, {} ] }}"#,
        text_event_json("rt-1", "void measurements"),
        text_event_json("rt-2", "hello there")
    );
    let status = post_signed(port, &body).await;
    assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    // The sibling escalation still got its reply; only the failed event is lost.
    let calls = sender.calls.lock().expect("lock");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "rt-1");
}
