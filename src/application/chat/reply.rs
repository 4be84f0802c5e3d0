//! Local reply generation: canned answers, file acknowledgements, prompts.

use metrics::counter;
use rand::Rng;

use crate::domain::chat::{ChatPrompt, UploadedFile};

pub const EMPTY_PROMPT_REPLY: &str = "Please send a message or upload a file!";

const DEFAULT_CANNED_REPLIES: [&str; 5] = [
    "Hey there! Here's a quick reply: **bold** text works! How can I assist you today?",
    "Interesting question! Here's some code for you:\n```\nfunction sayHi() {\n  console.log('Hi!');\n}\n```\nWhat else can I do?",
    "I'm a demo assistant. Let me think... How about this: `inline code` is neat, right?",
    r#"{"status":"success","message":"Hello from the demo assistant!","data":{"id":42,"name":"Test"}}"#,
    "Here's a quick comparison:\n\n| Feature | Supported |\n| --- | --- |\n| Markdown | yes |\n| JSON | yes |",
];

/// How a reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Canned,
    FileAck,
    Prompt,
    Proxied,
}

impl ReplyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyKind::Canned => "canned",
            ReplyKind::FileAck => "file_ack",
            ReplyKind::Prompt => "prompt",
            ReplyKind::Proxied => "proxied",
        }
    }

    pub(crate) fn record(self) {
        counter!("deepchat_reply_total", "kind" => self.as_str()).increment(1);
    }
}

/// A locally generated reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
}

/// Fixed set of pre-authored replies picked from with equal probability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedPool {
    replies: Vec<String>,
}

impl CannedPool {
    /// Build a pool from explicit replies. Returns `None` for an empty list.
    pub fn new<I, S>(replies: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let replies: Vec<String> = replies.into_iter().map(Into::into).collect();
        (!replies.is_empty()).then_some(Self { replies })
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    pub fn replies(&self) -> &[String] {
        &self.replies
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        let index = rng.gen_range(0..self.replies.len());
        &self.replies[index]
    }
}

impl Default for CannedPool {
    fn default() -> Self {
        Self {
            replies: DEFAULT_CANNED_REPLIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Acknowledgement returned when the client uploads a file.
pub fn file_ack(file: &UploadedFile) -> String {
    format!(
        "Received file: **{}** (Type: {}, Size: {} bytes)",
        file.original_name, file.mime_type, file.size_bytes
    )
}

/// Choose the reply for `prompt`.
///
/// A file always wins; an empty prompt gets a nudge; anything else draws from
/// `pool` using `rng`.
pub fn select_reply<R: Rng + ?Sized>(
    prompt: &ChatPrompt,
    pool: &CannedPool,
    rng: &mut R,
) -> Reply {
    let reply = if let Some(file) = prompt.file() {
        Reply {
            kind: ReplyKind::FileAck,
            text: file_ack(file),
        }
    } else if prompt.message().is_none() {
        Reply {
            kind: ReplyKind::Prompt,
            text: EMPTY_PROMPT_REPLY.to_string(),
        }
    } else {
        Reply {
            kind: ReplyKind::Canned,
            text: pool.pick(rng).to_string(),
        }
    };
    reply.kind.record();
    reply
}
