use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use converse_config::{ChatOptions, ChatOptionsOverrides, ConverseConfig, PromptStyle};
use futures_util::stream;

use super::*;
use crate::keys::{InMemoryKeyStore, KeyStore};
use crate::tokenizer::Tokenizer;
use crate::transport::{ByteStream, CompletionRequest, Transport};
use crate::usage::Usage;
use crate::{AiError, ConversationId, Role};

struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

enum Script {
    Reply(&'static str),
    Chunks(Vec<&'static str>),
    ChunksThenError(Vec<&'static str>),
    ChunksThenHang(Vec<&'static str>),
    Fail(u16, &'static str),
}

#[derive(Default)]
struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<(String, CompletionRequest)>>,
    moderated: Mutex<Vec<String>>,
    flag_everything: bool,
}

impl ScriptedTransport {
    fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            ..Self::default()
        })
    }

    fn flagging() -> Arc<Self> {
        Arc::new(Self {
            flag_everything: true,
            ..Self::default()
        })
    }

    fn next(&self, api_key: &str, request: &CompletionRequest) -> Script {
        self.requests
            .lock()
            .unwrap()
            .push((api_key.to_string(), request.clone()));
        self.scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport called more often than scripted")
    }

    fn requests(&self) -> Vec<(String, CompletionRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

fn chunks(parts: Vec<&'static str>) -> Vec<Result<Vec<u8>, AiError>> {
    parts.into_iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, AiError> {
        match self.next(api_key, request) {
            Script::Reply(text) => Ok(text.to_string()),
            Script::Fail(status, message) => Err(AiError::remote(Some(status), message)),
            _ => panic!("streaming script used for a plain request"),
        }
    }

    async fn complete_streaming(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<ByteStream, AiError> {
        use futures_util::StreamExt;

        match self.next(api_key, request) {
            Script::Chunks(parts) => Ok(Box::pin(stream::iter(chunks(parts)))),
            Script::ChunksThenError(parts) => {
                let mut items = chunks(parts);
                items.push(Err(AiError::remote(None, "connection reset")));
                Ok(Box::pin(stream::iter(items)))
            }
            Script::ChunksThenHang(parts) => {
                Ok(Box::pin(stream::iter(chunks(parts)).chain(stream::pending())))
            }
            Script::Fail(status, message) => Err(AiError::remote(Some(status), message)),
            Script::Reply(_) => panic!("plain script used for a streaming request"),
        }
    }

    async fn moderate(&self, _api_key: &str, input: &str) -> Result<bool, AiError> {
        self.moderated.lock().unwrap().push(input.to_string());
        Ok(self.flag_everything)
    }
}

fn test_options() -> ChatOptions {
    ChatOptions {
        instructions: "Be brief.".into(),
        max_tokens: 50,
        max_conversation_tokens: 120,
        ..ChatOptions::default()
    }
}

fn session_with(
    transport: Arc<ScriptedTransport>,
    keys: Arc<InMemoryKeyStore>,
    options: ChatOptions,
) -> Session {
    Session::new(transport, keys, Arc::new(WordTokenizer)).with_options(options)
}

fn default_id() -> ConversationId {
    ConversationId::default()
}

#[tokio::test]
async fn ask_appends_exchange_and_records_usage() {
    let transport = ScriptedTransport::new(vec![Script::Reply(" Hello there<|im_end|>")]);
    let keys = Arc::new(InMemoryKeyStore::new(["k1"]));
    let session = session_with(transport.clone(), keys.clone(), test_options());

    let reply = session.ask("hi", &default_id(), "User").await.unwrap();
    assert_eq!(reply, "Hello there");

    let conversation = session.conversation(&default_id()).await.unwrap();
    let messages = conversation.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "hi.");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hello there");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let (key, request) = &requests[0];
    assert_eq!(key, "k1");
    assert!(!request.is_streaming());
    assert_eq!(request.body["messages"][0]["role"], "system");
    assert_eq!(request.body["messages"][1]["content"], "hi.");

    // preamble 8 words + "User: hi." + cue; completion counts the raw reply
    let usage = session.usage().await;
    assert_eq!(usage.call_count(), 1);
    assert_eq!(usage.total().prompt_tokens, 11);
    assert_eq!(usage.total().completion_tokens, 2);

    let stored = keys.keys().await;
    assert_eq!(stored[0].queries, 1);
    assert_eq!(stored[0].tokens, 13);
    assert!((stored[0].balance - 13.0 / 1000.0 * 0.002).abs() < 1e-12);
}

#[tokio::test]
async fn ask_without_keys_fails_before_touching_history() {
    let transport = ScriptedTransport::new(vec![]);
    let keys = Arc::new(InMemoryKeyStore::default());
    let session = session_with(transport.clone(), keys, test_options());

    let err = session.ask("hi", &default_id(), "User").await.unwrap_err();
    assert!(matches!(err, AiError::NoKeysAvailable));
    assert!(session.store().is_empty().await);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn ask_stream_forwards_fragments_and_skips_malformed() {
    let transport = ScriptedTransport::new(vec![Script::Chunks(vec![
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
        ": keep-alive\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"choi",
        "ces\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
        "data: not json\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" Ada:\"}}]}\n",
        "data: [DONE]\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n",
    ])]);
    let keys = Arc::new(InMemoryKeyStore::new(["k1"]));
    let session = session_with(transport.clone(), keys, test_options());

    let mut fragments = Vec::new();
    let mut reported: Option<Usage> = None;
    let reply = session
        .ask_stream(
            |f| fragments.push(f.to_string()),
            |u| reported = Some(u.clone()),
            "hi",
            &default_id(),
            "Ada",
        )
        .await
        .unwrap();

    assert_eq!(fragments, vec!["Hel", "lo", " Ada:"]);
    assert_eq!(reply, "Hello");
    assert!(transport.requests()[0].1.is_streaming());

    let usage = reported.expect("usage reported");
    assert_eq!(usage.key, "k1");
    assert_eq!(usage.completion_tokens, 2);
    assert_eq!(usage.total_tokens, usage.prompt_tokens + 2);

    let conversation = session.conversation(&default_id()).await.unwrap();
    assert_eq!(conversation.user_name, "Ada");
    assert_eq!(conversation.messages()[1].content, "Hello");
}

#[tokio::test]
async fn stream_error_leaves_history_untouched() {
    let transport = ScriptedTransport::new(vec![
        Script::Reply("First answer"),
        Script::ChunksThenError(vec!["data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n"]),
    ]);
    let keys = Arc::new(InMemoryKeyStore::new(["k1"]));
    let session = session_with(transport, keys, test_options());

    session.ask("first", &default_id(), "User").await.unwrap();

    let mut fragments = Vec::new();
    let mut usage_called = false;
    let err = session
        .ask_stream(
            |f| fragments.push(f.to_string()),
            |_| usage_called = true,
            "second",
            &default_id(),
            "User",
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AiError::RemoteRequestFailed { status: None, .. }));
    assert_eq!(fragments, vec!["Hel"]);
    assert!(!usage_called);

    let conversation = session.conversation(&default_id()).await.unwrap();
    let contents: Vec<_> = conversation.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first.", "First answer"]);
    assert_eq!(session.usage().await.call_count(), 1);
}

#[tokio::test]
async fn remote_failure_is_surfaced_and_rolled_back() {
    let transport = ScriptedTransport::new(vec![
        Script::Fail(401, "Incorrect API key provided"),
        Script::Reply("Hi!"),
    ]);
    let keys = Arc::new(InMemoryKeyStore::new(["k1"]));
    let session = session_with(transport, keys.clone(), test_options());

    let err = session.ask("hi", &default_id(), "User").await.unwrap_err();
    match err {
        AiError::RemoteRequestFailed { status, message, .. } => {
            assert_eq!(status, Some(401));
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(session.conversation(&default_id()).await.unwrap().is_empty());
    assert_eq!(keys.keys().await[0].queries, 0);

    assert_eq!(session.ask("hi", &default_id(), "User").await.unwrap(), "Hi!");
    assert_eq!(session.conversation(&default_id()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn cancelled_stream_appends_nothing() {
    let transport = ScriptedTransport::new(vec![
        Script::ChunksThenHang(vec!["data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n"]),
        Script::Reply("Done"),
    ]);
    let keys = Arc::new(InMemoryKeyStore::new(["k1"]));
    let session = session_with(transport, keys, test_options());

    let id = default_id();
    let call = session.ask_stream(|_| {}, |_| {}, "hi", &id, "User");
    let outcome = tokio::time::timeout(Duration::from_millis(50), call).await;
    assert!(outcome.is_err());

    assert!(session.conversation(&id).await.unwrap().is_empty());
    assert_eq!(session.usage().await.call_count(), 0);

    // the conversation lock was released with the abandoned call
    assert_eq!(session.ask("hi", &id, "User").await.unwrap(), "Done");
}

#[tokio::test]
async fn flagged_prompt_is_refused_without_sending() {
    let transport = ScriptedTransport::flagging();
    let keys = Arc::new(InMemoryKeyStore::new(["k1"]));
    let options = ChatOptions {
        moderation: true,
        ..test_options()
    };
    let session = session_with(transport.clone(), keys.clone(), options);

    let reply = session.ask("something rude", &default_id(), "User").await.unwrap();
    assert_eq!(reply, FLAGGED_REPLY);

    let mut fragments = Vec::new();
    let mut usage_called = false;
    let streamed = session
        .ask_stream(
            |f| fragments.push(f.to_string()),
            |_| usage_called = true,
            "something rude",
            &default_id(),
            "User",
        )
        .await
        .unwrap();
    assert_eq!(streamed, FLAGGED_REPLY);
    assert_eq!(fragments, vec![FLAGGED_REPLY]);
    assert!(!usage_called);

    assert_eq!(transport.moderated.lock().unwrap().len(), 2);
    assert!(transport.requests().is_empty());
    assert!(session.conversation(&default_id()).await.unwrap().is_empty());
    assert_eq!(keys.keys().await[0].queries, 0);
}

#[tokio::test]
async fn moderation_is_skipped_when_disabled() {
    let transport = ScriptedTransport::new(vec![Script::Reply("ok")]);
    let keys = Arc::new(InMemoryKeyStore::new(["k1"]));
    let session = session_with(transport.clone(), keys, test_options());

    session.ask("hi", &default_id(), "User").await.unwrap();
    assert!(transport.moderated.lock().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_prompt_is_rejected() {
    let transport = ScriptedTransport::new(vec![]);
    let keys = Arc::new(InMemoryKeyStore::new(["k1"]));
    let session = session_with(transport.clone(), keys, test_options());

    let huge = "word ".repeat(200);
    let err = session.ask(&huge, &default_id(), "User").await.unwrap_err();
    assert!(matches!(err, AiError::ConversationTooLarge { budget: 120, .. }));
    assert!(transport.requests().is_empty());
    assert!(session.conversation(&default_id()).await.unwrap().is_empty());
}

#[tokio::test]
async fn least_spent_key_is_used() {
    let transport = ScriptedTransport::new(vec![Script::Reply("a"), Script::Reply("b")]);
    let keys = Arc::new(InMemoryKeyStore::new(["k1", "k2"]));
    let session = session_with(transport.clone(), keys, test_options());

    session.ask("one", &default_id(), "User").await.unwrap();
    session.ask("two", &default_id(), "User").await.unwrap();

    let used: Vec<_> = transport.requests().into_iter().map(|(k, _)| k).collect();
    assert_eq!(used, vec!["k1", "k2"]);
    let usage = session.usage().await;
    assert!(usage.for_key("k1").is_some());
    assert!(usage.for_key("k2").is_some());
}

#[tokio::test]
async fn completion_style_sends_flat_prompt() {
    let transport = ScriptedTransport::new(vec![Script::Reply(" Sure.\nUser:")]);
    let keys = Arc::new(InMemoryKeyStore::new(["k1"]));
    let options = ChatOptions {
        style: PromptStyle::Completion,
        ..test_options()
    };
    let session = session_with(transport.clone(), keys, options);

    let reply = session.ask("help me", &default_id(), "User").await.unwrap();
    assert_eq!(reply, "Sure.");

    let (_, request) = &transport.requests()[0];
    assert_eq!(request.style, PromptStyle::Completion);
    let prompt = request.body["prompt"].as_str().unwrap();
    assert!(prompt.starts_with("Be brief.\n"));
    assert!(prompt.ends_with("User: help me.\nChatGPT:"));
    assert_eq!(request.body["stop"][0], "<|im_end|>");
}

#[tokio::test]
async fn same_conversation_calls_do_not_interleave() {
    let transport = ScriptedTransport::new(vec![Script::Reply("one"), Script::Reply("two")]);
    let keys = Arc::new(InMemoryKeyStore::new(["k1"]));
    let session = Arc::new(session_with(transport, keys, test_options()));

    let a = tokio::spawn({
        let session = session.clone();
        async move { session.ask("first", &default_id(), "User").await }
    });
    let b = tokio::spawn({
        let session = session.clone();
        async move { session.ask("second", &default_id(), "User").await }
    });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let conversation = session.conversation(&default_id()).await.unwrap();
    let roles: Vec<_> = conversation.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
}

#[tokio::test]
async fn reset_clears_history() {
    let transport = ScriptedTransport::new(vec![Script::Reply("ok")]);
    let keys = Arc::new(InMemoryKeyStore::new(["k1"]));
    let session = session_with(transport, keys, test_options());

    session.ask("hi", &default_id(), "User").await.unwrap();
    let cleared = session.reset(&default_id()).await.unwrap();
    assert!(cleared.is_empty());
    assert!(session.conversation(&default_id()).await.unwrap().is_empty());
    assert!(session.reset(&ConversationId::new("missing")).await.is_none());
}

#[test]
fn overrides_merge_field_by_field() {
    let transport = ScriptedTransport::new(vec![]);
    let keys = Arc::new(InMemoryKeyStore::default());
    let session = session_with(transport, keys, test_options()).with_overrides(&ChatOptionsOverrides {
        temperature: Some(0.2),
        ..ChatOptionsOverrides::default()
    });
    assert_eq!(session.options().temperature, 0.2);
    assert_eq!(session.options().instructions, "Be brief.");
}

#[test]
fn from_config_rejects_invalid_options() {
    let mut config = ConverseConfig::default();
    config.options.temperature = Some(5.0);
    let transport: Arc<dyn Transport> = ScriptedTransport::new(vec![]);
    let err = Session::from_config(
        &config,
        transport,
        Arc::new(InMemoryKeyStore::default()),
        Arc::new(WordTokenizer),
    )
    .unwrap_err();
    assert!(matches!(err, AiError::Config(_)));
}

#[test]
fn from_config_applies_overrides() {
    let mut config = ConverseConfig::default();
    config.options.model = Some("gpt-4".into());
    let transport: Arc<dyn Transport> = ScriptedTransport::new(vec![]);
    let session = Session::from_config(
        &config,
        transport,
        Arc::new(InMemoryKeyStore::default()),
        Arc::new(WordTokenizer),
    )
    .unwrap();
    assert_eq!(session.options().model, "gpt-4");
    assert_eq!(session.options().max_tokens, 512);
}
