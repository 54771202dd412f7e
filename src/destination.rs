/// Where a notification should be delivered.
///
/// Every field is opaque to the scheduler; only the transport integration
/// interprets them. The whole value is copied into the job at schedule time
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Opaque conversation handle (chat id, channel name, ...).
    pub conversation: String,
    /// Optional reply target inside the conversation.
    pub reply_to: Option<String>,
    /// Optional opaque content reference to attach to the notification,
    /// e.g. a file id the transport can re-send.
    pub content: Option<String>,
}

impl Destination {
    /// Create a destination with no reply target and no content reference.
    pub fn new(conversation: impl Into<String>) -> Self {
        Self {
            conversation: conversation.into(),
            reply_to: None,
            content: None,
        }
    }
}
