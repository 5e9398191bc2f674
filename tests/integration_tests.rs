//! End-to-end tests for the streaming pipeline over in-memory transports.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::stream;
use ragchat::{
    ChatRequest, ChatTransport, ConversationController, ConversationId, Error, HistoryStore,
    Message, QueryOptions, Result, StreamState,
};

/// Transport that serves scripted streams, re-chunked to a fixed size so
/// frames land split across delivery boundaries.
struct RechunkingTransport {
    scripts: Mutex<Vec<Vec<u8>>>,
    chunk_size: usize,
    hang_after: bool,
}

impl RechunkingTransport {
    fn new(scripts: Vec<&str>, chunk_size: usize) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().map(|s| s.as_bytes().to_vec()).collect()),
            chunk_size,
            hang_after: false,
        }
    }

    fn hanging(scripts: Vec<&str>, chunk_size: usize) -> Self {
        Self {
            hang_after: true,
            ..Self::new(scripts, chunk_size)
        }
    }
}

#[async_trait::async_trait]
impl ChatTransport for RechunkingTransport {
    async fn open_stream(&self, _request: &ChatRequest) -> Result<ragchat::ByteStream> {
        let wire = self.scripts.lock().unwrap().remove(0);
        let chunks: Vec<Result<Bytes>> = wire
            .chunks(self.chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let replay = stream::iter(chunks);
        if self.hang_after {
            Ok(Box::pin(replay.chain(stream::pending())))
        } else {
            Ok(Box::pin(replay))
        }
    }
}

struct FixtureStore {
    conversations: HashMap<ConversationId, Vec<Message>>,
}

impl FixtureStore {
    fn new(conversations: Vec<(&str, Vec<Message>)>) -> Self {
        Self {
            conversations: conversations
                .into_iter()
                .map(|(id, messages)| (ConversationId::new(id), messages))
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl HistoryStore for FixtureStore {
    async fn list_messages(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        self.conversations
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("conversation {conversation_id}")))
    }
}

fn wire_turn(fragments: &[&str]) -> String {
    let mut wire = String::from("data: {\"type\":\"session\",\"session_id\":\"conv-a\"}\n\n");
    for fragment in fragments {
        wire.push_str(&format!(
            "data: {{\"type\":\"text\",\"content\":\"{fragment}\"}}\n\n"
        ));
    }
    wire.push_str("data: {\"type\":\"end\"}\n\n");
    wire
}

#[tokio::test]
async fn answer_reassembles_under_pathological_chunking() {
    let wire = wire_turn(&["The ", "knowledge ", "graph ", "links ", "entities."]);

    for chunk_size in [1, 3, 7, 1024] {
        let transport = RechunkingTransport::new(vec![&wire], chunk_size);
        let store = FixtureStore::new(vec![("conv-a", Vec::new())]);
        let mut controller =
            ConversationController::new(Arc::new(transport), Arc::new(store));

        controller
            .select_conversation(ConversationId::new("conv-a"))
            .await
            .unwrap();
        controller
            .send_query("what does it do?", QueryOptions::default())
            .await
            .unwrap();
        let outcome = controller.await_active().await.unwrap();

        assert_eq!(outcome.state, StreamState::Completed, "chunk {chunk_size}");
        assert_eq!(
            controller.transcript().last().unwrap().content,
            "The knowledge graph links entities.",
            "chunk {chunk_size}"
        );
    }
}

#[tokio::test]
async fn malformed_lines_and_noise_survive_end_to_end() {
    let wire = "data: {\"type\":\"session\",\"session_id\":\"conv-a\"}\n\n\
                data: not-json\n\
                : keepalive comment\n\
                data: {\"type\":\"text\",\"content\":\"ok\"}\n\n\
                data: {\"type\":\"progress\",\"stage\":\"rerank\"}\n\n\
                data: {\"type\":\"end\"}\n\n";
    let transport = RechunkingTransport::new(vec![wire], 5);
    let store = FixtureStore::new(vec![("conv-a", Vec::new())]);
    let mut controller = ConversationController::new(Arc::new(transport), Arc::new(store));

    controller
        .select_conversation(ConversationId::new("conv-a"))
        .await
        .unwrap();
    controller
        .send_query("q", QueryOptions::default())
        .await
        .unwrap();
    let outcome = controller.await_active().await.unwrap();

    assert_eq!(outcome.state, StreamState::Completed);
    assert_eq!(controller.transcript().last().unwrap().content, "ok");
}

#[tokio::test]
async fn switching_conversations_never_interleaves_transcripts() {
    let transport = RechunkingTransport::hanging(
        vec![
            "data: {\"type\":\"text\",\"content\":\"A says hi\"}\n\n",
            "data: {\"type\":\"text\",\"content\":\"B says hi\"}\n\n",
        ],
        4,
    );
    let store = FixtureStore::new(vec![
        ("conv-a", Vec::new()),
        ("conv-b", vec![Message::user("earlier b question")]),
    ]);
    let mut controller = ConversationController::new(Arc::new(transport), Arc::new(store));

    controller
        .select_conversation(ConversationId::new("conv-a"))
        .await
        .unwrap();
    controller
        .send_query("to a", QueryOptions::default())
        .await
        .unwrap();

    let mut snapshots = controller.subscribe();
    loop {
        let content = snapshots
            .borrow()
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        if content == "A says hi" {
            break;
        }
        snapshots.changed().await.unwrap();
    }

    // Switch while A's stream is still open; B's query then streams.
    controller
        .select_conversation(ConversationId::new("conv-b"))
        .await
        .unwrap();
    controller
        .send_query("to b", QueryOptions::default())
        .await
        .unwrap();

    loop {
        let content = snapshots
            .borrow()
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        if content == "B says hi" {
            break;
        }
        snapshots.changed().await.unwrap();
    }

    let transcript = controller.transcript();
    let contents: Vec<&str> = transcript
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["earlier b question", "to b", "B says hi"]);
    assert!(
        !contents.iter().any(|c| c.contains("A says")),
        "conversation A must not leak into B's transcript"
    );
}

#[tokio::test]
async fn backend_failure_mid_answer_keeps_partial_text_visible() {
    let wire = "data: {\"type\":\"text\",\"content\":\"partial ans\"}\n\n\
                data: {\"type\":\"error\",\"content\":\"graph store unreachable\"}\n\n";
    let transport = RechunkingTransport::new(vec![wire], 8);
    let store = FixtureStore::new(vec![("conv-a", Vec::new())]);
    let mut controller = ConversationController::new(Arc::new(transport), Arc::new(store));

    controller
        .select_conversation(ConversationId::new("conv-a"))
        .await
        .unwrap();
    controller
        .send_query("q", QueryOptions::default())
        .await
        .unwrap();
    let outcome = controller.await_active().await.unwrap();

    assert_eq!(outcome.state, StreamState::Failed);
    let error = outcome.error.unwrap();
    assert!(error.to_string().contains("graph store unreachable"));
    assert_eq!(
        controller.transcript().last().unwrap().content,
        "partial ans"
    );
}

#[tokio::test]
async fn tool_calls_arrive_on_the_final_message() {
    let wire = "data: {\"type\":\"text\",\"content\":\"Acme was founded in 1949.\"}\n\n\
                data: {\"type\":\"tools\",\"tools\":[{\"tool_name\":\"graph_search\",\"args\":{\"query\":\"acme\"},\"tool_call_id\":\"c1\"}]}\n\n\
                data: {\"type\":\"end\"}\n\n";
    let transport = RechunkingTransport::new(vec![wire], 16);
    let store = FixtureStore::new(vec![("conv-a", Vec::new())]);
    let mut controller = ConversationController::new(Arc::new(transport), Arc::new(store));

    controller
        .select_conversation(ConversationId::new("conv-a"))
        .await
        .unwrap();
    controller
        .send_query("when was acme founded?", QueryOptions::default())
        .await
        .unwrap();
    controller.await_active().await.unwrap();

    let transcript = controller.transcript();
    let last = transcript.last().unwrap();
    assert_eq!(last.tool_calls.len(), 1);
    assert_eq!(last.tool_calls[0].tool_name, "graph_search");
    assert_eq!(last.tool_calls[0].tool_call_id.as_deref(), Some("c1"));
}
