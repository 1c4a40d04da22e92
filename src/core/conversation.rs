//! Conversation state: a bounded message history around one chat model.

use crate::core::message::{Message, Role};
use crate::models::{ChatModel, FragmentSink, Reply};

/// Owns the ordered message history and drives one exchange at a time.
///
/// After every mutation `messages.len() <= max_history` holds, and a
/// system message at index 0 is never evicted while anything else can be —
/// the history window slides over the remaining slots only.
pub struct Conversation {
    model: Box<dyn ChatModel>,
    messages: Vec<Message>,
    max_history: usize,
}

impl Conversation {
    pub fn new(model: Box<dyn ChatModel>, max_history: usize) -> Self {
        Self {
            model,
            messages: Vec::new(),
            max_history: max_history.max(1),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Append a message, then evict the oldest unpinned entries until the
    /// history fits the bound again.
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
        self.enforce_bound();
    }

    fn enforce_bound(&mut self) {
        while self.messages.len() > self.max_history {
            // len > max_history >= 1, so index 1 exists when pinned.
            if self.messages[0].role.is_system() {
                self.messages.remove(1);
            } else {
                self.messages.remove(0);
            }
        }
    }

    /// Replace the pinned system message in place, or insert one at the
    /// front, re-applying the bound if the insertion overflows it.
    pub fn set_system_message(&mut self, content: impl Into<String>) {
        let content = content.into();
        match self.messages.first_mut() {
            Some(first) if first.role.is_system() => first.content = content,
            _ => {
                self.messages.insert(0, Message::system(content));
                self.enforce_bound();
            }
        }
    }

    /// Drop the history, keeping only the pinned system message if present.
    pub fn clear_history(&mut self) {
        let system = self
            .messages
            .first()
            .filter(|message| message.role.is_system())
            .cloned();
        self.messages.clear();
        if let Some(system) = system {
            self.messages.push(system);
        }
    }

    /// Run one exchange: record the user message, invoke the model, and
    /// record the assistant reply.
    ///
    /// Streamed fragments go to `sink` immediately on arrival; the
    /// accumulated reply is committed to history only once the stream is
    /// exhausted, so history holds completed exchanges only. Returns the
    /// reply for non-streaming calls and `None` when the sink already
    /// received it. `&mut self` keeps exchanges strictly sequential.
    pub async fn send_message(
        &mut self,
        text: &str,
        stream: bool,
        sink: &mut dyn FragmentSink,
    ) -> Option<String> {
        self.add_message(Role::User, text);

        let reply = self.model.generate(&self.messages, stream).await;
        match reply {
            Reply::Complete(reply) => {
                self.add_message(Role::Assistant, reply.clone());
                Some(reply)
            }
            Reply::Stream(mut fragments) => {
                let mut accumulated = String::new();
                while let Some(fragment) = fragments.next().await {
                    sink.emit(&fragment);
                    accumulated.push_str(&fragment);
                }
                self.add_message(Role::Assistant, accumulated);
                None
            }
        }
    }
}
