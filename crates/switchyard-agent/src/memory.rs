// Chat memory
//
// ChatMemory holds the ordered conversation transcript. The agent only ever
// appends during a run, and truncates back to the pre-run length when the run
// fails; reset and replace exist for callers that manage a conversation
// across runs.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::MemoryError;
use crate::message::ChatTurn;

/// Storage for the conversation transcript
#[async_trait]
pub trait ChatMemory: Send + Sync {
    /// Append one turn
    async fn append(&self, turn: ChatTurn) -> Result<(), MemoryError>;

    /// Append turns, preserving their order
    async fn append_batch(&self, turns: Vec<ChatTurn>) -> Result<(), MemoryError> {
        for turn in turns {
            self.append(turn).await?;
        }
        Ok(())
    }

    /// Ordered turns to present to the model
    async fn snapshot(&self) -> Result<Vec<ChatTurn>, MemoryError>;

    /// Drop every turn
    async fn reset(&self) -> Result<(), MemoryError>;

    /// Keep only the first `len` turns
    async fn truncate(&self, len: usize) -> Result<(), MemoryError>;

    /// Replace the transcript wholesale
    async fn replace(&self, turns: Vec<ChatTurn>) -> Result<(), MemoryError> {
        self.reset().await?;
        self.append_batch(turns).await
    }

    /// Number of stored turns
    async fn len(&self) -> Result<usize, MemoryError>;

    async fn is_empty(&self) -> Result<bool, MemoryError> {
        Ok(self.len().await? == 0)
    }
}

// ============================================================================
// InMemoryChatMemory - Stores turns in memory
// ============================================================================

/// In-memory chat memory
///
/// Clones share the same transcript. With a window set, snapshots hold at most
/// the last `max_turns` turns and never start with a tool turn whose
/// originating assistant turn was cut off.
#[derive(Debug, Default, Clone)]
pub struct InMemoryChatMemory {
    turns: Arc<RwLock<Vec<ChatTurn>>>,
    window: Option<usize>,
}

impl InMemoryChatMemory {
    /// Create an unbounded memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory whose snapshots hold at most `max_turns` turns
    pub fn with_window(max_turns: usize) -> Self {
        Self {
            turns: Arc::new(RwLock::new(Vec::new())),
            window: Some(max_turns),
        }
    }

    /// Pre-populate with turns (useful for testing)
    pub async fn seed(&self, turns: Vec<ChatTurn>) {
        *self.turns.write().await = turns;
    }

    /// Every stored turn, ignoring the window
    pub async fn turns(&self) -> Vec<ChatTurn> {
        self.turns.read().await.clone()
    }
}

#[async_trait]
impl ChatMemory for InMemoryChatMemory {
    async fn append(&self, turn: ChatTurn) -> Result<(), MemoryError> {
        self.turns.write().await.push(turn);
        Ok(())
    }

    async fn append_batch(&self, turns: Vec<ChatTurn>) -> Result<(), MemoryError> {
        self.turns.write().await.extend(turns);
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<ChatTurn>, MemoryError> {
        let turns = self.turns.read().await;
        let Some(window) = self.window else {
            return Ok(turns.clone());
        };

        let mut start = turns.len().saturating_sub(window);
        while start < turns.len() && turns[start].is_tool() {
            start += 1;
        }
        Ok(turns[start..].to_vec())
    }

    async fn reset(&self) -> Result<(), MemoryError> {
        self.turns.write().await.clear();
        Ok(())
    }

    async fn truncate(&self, len: usize) -> Result<(), MemoryError> {
        self.turns.write().await.truncate(len);
        Ok(())
    }

    async fn len(&self) -> Result<usize, MemoryError> {
        Ok(self.turns.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ToolInvocationRequest, TurnRole};
    use serde_json::json;

    #[tokio::test]
    async fn test_truncate_keeps_leading_turns() {
        let memory = InMemoryChatMemory::with_window(1);
        memory
            .seed(vec![ChatTurn::user("a"), ChatTurn::assistant("b"), ChatTurn::user("c")])
            .await;

        memory.truncate(1).await.unwrap();
        assert_eq!(memory.turns().await.len(), 1);
        assert_eq!(memory.snapshot().await.unwrap()[0].content, "a");

        // Longer than the transcript is a no-op
        memory.truncate(5).await.unwrap();
        assert_eq!(memory.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_append_and_snapshot_preserve_order() {
        let memory = InMemoryChatMemory::new();
        memory.append(ChatTurn::user("first")).await.unwrap();
        memory
            .append_batch(vec![ChatTurn::assistant("second"), ChatTurn::user("third")])
            .await
            .unwrap();

        let contents: Vec<String> = memory
            .snapshot()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(memory.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_clones_share_transcript() {
        let memory = InMemoryChatMemory::new();
        let other = memory.clone();

        other.append(ChatTurn::user("Hello!")).await.unwrap();
        assert_eq!(memory.len().await.unwrap(), 1);

        memory.reset().await.unwrap();
        assert!(other.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_replace() {
        let memory = InMemoryChatMemory::new();
        memory.seed(vec![ChatTurn::user("old")]).await;

        memory
            .replace(vec![ChatTurn::user("new"), ChatTurn::assistant("reply")])
            .await
            .unwrap();

        let turns = memory.turns().await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "new");
    }

    #[tokio::test]
    async fn test_window_skips_orphaned_tool_turns() {
        let memory = InMemoryChatMemory::with_window(3);
        let call = ToolInvocationRequest::new("call_1", "add", json!({"a": 1, "b": 2}));
        memory
            .append_batch(vec![
                ChatTurn::user("add 1 and 2"),
                ChatTurn::assistant_with_tools("", vec![call]),
                ChatTurn::tool("call_1", "add", "3"),
                ChatTurn::assistant("3"),
                ChatTurn::user("thanks"),
            ])
            .await
            .unwrap();

        // Last three would start with the tool turn; it is dropped
        let snapshot = memory.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].role, TurnRole::Assistant);
        assert_eq!(snapshot[1].content, "thanks");

        // The full transcript is kept
        assert_eq!(memory.len().await.unwrap(), 5);
    }
}
