//! Command center: a toggled console with an append-only transcript.
//!
//! While open, each submitted command adds an echo line immediately; its
//! result line is appended whenever the reply arrives. Several commands may
//! be in flight, so results land in arrival order. Closing discards the
//! transcript.

use crate::formatter::escape_html;

/// Kind of a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// The submitted command, as `$ <command>`.
    Echo,
    /// Output returned by the agent.
    Result,
    /// Failure of the relay itself.
    SystemError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub text: String,
    pub kind: LineKind,
}

/// Shown above the transcript when the console opens.
pub const BANNER: [&str; 2] = [
    "# System Ready. Waiting for commands...",
    "# Try: \"open notepad\", \"create folder test\", \"run dir\"",
];

/// Text of the system line for an empty reply.
pub const NO_RESPONSE: &str = "No response from agent.";

#[derive(Debug, Default)]
enum State {
    #[default]
    Closed,
    Open {
        transcript: Vec<TranscriptLine>,
        input: String,
    },
}

#[derive(Debug, Default)]
pub struct CommandCenter {
    state: State,
}

impl CommandCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open { .. })
    }

    /// Open when closed; close (dropping the transcript) when open.
    pub fn toggle(&mut self) {
        if self.is_open() {
            self.close();
        } else {
            self.state = State::Open {
                transcript: Vec::new(),
                input: String::new(),
            };
        }
    }

    pub fn close(&mut self) {
        self.state = State::Closed;
    }

    /// Replace the input field's contents.
    pub fn set_input(&mut self, text: impl Into<String>) {
        if let State::Open { input, .. } = &mut self.state {
            *input = text.into();
        }
    }

    pub fn input(&self) -> &str {
        match &self.state {
            State::Open { input, .. } => input.as_str(),
            State::Closed => "",
        }
    }

    /// Submit the input field. Appends the echo line, clears the input and
    /// returns the command to send, or `None` when closed or blank.
    pub fn submit(&mut self) -> Option<String> {
        let State::Open { transcript, input } = &mut self.state else {
            return None;
        };
        let command = input.trim().to_string();
        if command.is_empty() {
            return None;
        }
        transcript.push(TranscriptLine {
            text: format!("$ {command}"),
            kind: LineKind::Echo,
        });
        input.clear();
        Some(command)
    }

    /// Append the agent's output. An empty result is reported as a system line.
    pub fn append_result(&mut self, result: &str) {
        if result.is_empty() {
            self.append(NO_RESPONSE.to_string(), LineKind::SystemError);
        } else {
            self.append(result.to_string(), LineKind::Result);
        }
    }

    pub fn append_system_error(&mut self, message: &str) {
        self.append(message.to_string(), LineKind::SystemError);
    }

    fn append(&mut self, text: String, kind: LineKind) {
        match &mut self.state {
            State::Open { transcript, .. } => transcript.push(TranscriptLine { text, kind }),
            State::Closed => tracing::debug!("Console closed, dropping line: {text}"),
        }
    }

    pub fn transcript(&self) -> &[TranscriptLine] {
        match &self.state {
            State::Open { transcript, .. } => transcript.as_slice(),
            State::Closed => &[],
        }
    }

    /// Markup for the console body, or `None` while closed.
    pub fn render(&self) -> Option<String> {
        let State::Open { transcript, .. } = &self.state else {
            return None;
        };
        let mut out = String::from("<div id=\"command-output\">");
        for line in BANNER {
            out.push_str(&format!("<div class=\"banner\">{line}</div>"));
        }
        for line in transcript {
            let class = match line.kind {
                LineKind::Echo => "echo",
                LineKind::Result => "result",
                LineKind::SystemError => "system-error",
            };
            out.push_str(&format!("<div class=\"{class}\">{}</div>", escape_html(&line.text)));
        }
        out.push_str("</div>");
        Some(out)
    }
}
