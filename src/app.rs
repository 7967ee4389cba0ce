use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tokio::task::JoinHandle;

use crate::backend::BackendClient;
use crate::config::Settings;
use crate::content::ContentLoader;
use crate::history::{HistoryStore, Role, Turn};
use crate::markdown::{extract_code_blocks, MarkdownRenderer, PlainText, StyledMarkdown};

pub const ERROR_REPLY: &str = "Something went wrong. Please try again later.";
pub const DEGRADED_NOTICE: &str =
    "I could not load the site documentation, but I can still answer general questions.";
pub const LOADING_PLACEHOLDER: &str = "The documentation is still loading.";

const COPY_ACK_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Everything belonging to one widget session: visibility, input, history,
/// the grounding context and in-flight requests. Owned by the event loop;
/// nothing here is shared mutable state.
pub struct App {
    pub should_quit: bool,

    // Widget visibility
    pub open: bool,
    pub fullscreen: bool,
    pub input_mode: InputMode,

    // Input state
    pub input: String,
    pub cursor: usize, // char position in input

    // Conversation state
    pub history: HistoryStore,
    pub pending_reply: Option<JoinHandle<Result<String>>>,
    pub animation_frame: u8, // 0-2 for the typing indicator

    // Chat scroll state (dimensions updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub total_chat_lines: u16,

    // Code block copy state
    pub code_blocks: Vec<String>,
    pub selected_block: Option<usize>,
    copied_until: Option<Instant>,

    // Content grounding
    pub content: Arc<ContentLoader>,
    pub content_task: Option<JoinHandle<Result<String>>>,
    pub content_failed: bool,

    // Rendering capability for bot turns
    pub markdown: Box<dyn MarkdownRenderer>,

    pub backend: BackendClient,
    pub settings: Settings,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let markdown: Box<dyn MarkdownRenderer> = if settings.plain_text {
            Box::new(PlainText)
        } else {
            Box::new(StyledMarkdown)
        };

        Self {
            should_quit: false,

            open: false,
            fullscreen: false,
            input_mode: InputMode::Normal,

            input: String::new(),
            cursor: 0,

            history: HistoryStore::new(&settings.history_path),
            pending_reply: None,
            animation_frame: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            total_chat_lines: 0,

            code_blocks: Vec::new(),
            selected_block: None,
            copied_until: None,

            content: Arc::new(ContentLoader::new(&settings.content_url)),
            content_task: None,
            content_failed: false,

            markdown,

            backend: BackendClient::new(&settings.backend_url),
            settings,
        }
    }

    // Widget shell actions

    /// Reveal the chat panel: rehydrate the persisted session, then either
    /// prime the content loader or, when the context is already in and the
    /// session is fresh, show the greeting.
    pub fn open_widget(&mut self) -> Result<()> {
        self.open = true;
        self.history.reload();
        self.rebuild_code_blocks();
        self.scroll_to_bottom();

        if !self.content.is_loaded() {
            if self.content_task.is_none() {
                let loader = Arc::clone(&self.content);
                self.content_task =
                    Some(tokio::spawn(async move { loader.load().await.map(str::to_string) }));
            }
        } else if self.history.is_empty() {
            self.push_greeting()?;
        }

        Ok(())
    }

    pub fn close_widget(&mut self) {
        self.open = false;
        self.input_mode = InputMode::Normal;
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear()?;
        self.code_blocks.clear();
        self.selected_block = None;
        self.chat_scroll = 0;
        self.push_greeting()
    }

    fn push_greeting(&mut self) -> Result<()> {
        if self.settings.greeting.is_empty() {
            return Ok(());
        }
        let greeting = self.settings.greeting.clone();
        self.append_model_turn(greeting)
    }

    // Chat controller

    /// Submit the current input. Whitespace-only input and submissions while
    /// a request is already in flight are dropped.
    pub fn submit(&mut self) -> Result<bool> {
        let message = self.input.trim().to_string();
        if message.is_empty() || self.pending_reply.is_some() {
            return Ok(false);
        }

        self.history.append(Turn::user(message.clone()))?;
        self.input.clear();
        self.cursor = 0;

        // Prior history excludes the turn just appended; the new message
        // travels in its own field.
        let turns = self.history.turns();
        let prior: Vec<Turn> = turns[..turns.len() - 1].to_vec();
        let system_instruction =
            compose_system_instruction(&self.settings.system_instruction, self.content.context());

        let backend = self.backend.clone();
        self.pending_reply = Some(tokio::spawn(async move {
            backend.send(&prior, &message, &system_instruction).await
        }));

        self.scroll_to_bottom();
        Ok(true)
    }

    pub fn is_thinking(&self) -> bool {
        self.pending_reply.is_some()
    }

    /// Drain finished background tasks. Called from the event loop; the
    /// 300ms tick guarantees this runs shortly after a task completes.
    pub async fn poll_background(&mut self) -> Result<()> {
        if self.pending_reply.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.pending_reply.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow!("reply task failed: {e}")),
                };
                self.finish_reply(result)?;
            }
        }

        if self.content_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.content_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow!("content task failed: {e}")),
                };
                self.finish_content(result.map(|_| ()))?;
            }
        }

        Ok(())
    }

    /// Complete the send cycle: a backend reply becomes a model turn, any
    /// failure becomes the fixed error turn. Both are persisted.
    pub fn finish_reply(&mut self, result: Result<String>) -> Result<()> {
        let text = result.unwrap_or_else(|_| ERROR_REPLY.to_string());
        self.append_model_turn(text)
    }

    /// Complete the content load. Success shows the greeting for a fresh
    /// session; failure degrades to ungrounded chat with a visible notice.
    pub fn finish_content(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.content_failed = false;
                if self.history.is_empty() {
                    self.push_greeting()?;
                }
            }
            Err(_) => {
                self.content_failed = true;
                self.append_model_turn(DEGRADED_NOTICE.to_string())?;
            }
        }
        Ok(())
    }

    fn append_model_turn(&mut self, text: String) -> Result<()> {
        let new_blocks = extract_code_blocks(&text);
        self.history.append(Turn::model(text))?;
        self.code_blocks.extend(new_blocks);
        if !self.code_blocks.is_empty() {
            self.selected_block = Some(self.code_blocks.len() - 1);
        }
        self.scroll_to_bottom();
        Ok(())
    }

    fn rebuild_code_blocks(&mut self) {
        self.code_blocks = self
            .history
            .turns()
            .iter()
            .filter(|turn| turn.role == Role::Model)
            .flat_map(|turn| extract_code_blocks(&turn.text))
            .collect();
        self.selected_block = self.code_blocks.len().checked_sub(1);
    }

    // Code block copy actions

    pub fn copy_selected_block(&mut self) {
        if let Some(text) = self.selected_block.and_then(|i| self.code_blocks.get(i)) {
            copy_to_clipboard(text);
            self.copied_until = Some(Instant::now() + COPY_ACK_DURATION);
        }
    }

    pub fn copy_ack_active(&self) -> bool {
        self.copied_until.is_some_and(|until| Instant::now() < until)
    }

    pub fn select_next_block(&mut self) {
        let len = self.code_blocks.len();
        if len > 0 {
            let i = self.selected_block.unwrap_or(0);
            self.selected_block = Some((i + 1).min(len - 1));
        }
    }

    pub fn select_prev_block(&mut self) {
        if let Some(i) = self.selected_block {
            self.selected_block = Some(i.saturating_sub(1));
        }
    }

    /// Tick animation frame and expire the copy acknowledgment.
    pub fn tick(&mut self) {
        if self.pending_reply.is_some() || self.content_task.is_some() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.copied_until.is_some_and(|until| Instant::now() >= until) {
            self.copied_until = None;
        }
    }

    // Chat scrolling

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        if self.chat_scroll < self.total_chat_lines.saturating_sub(self.chat_height) {
            self.chat_scroll = self.chat_scroll.saturating_add(1);
        }
    }

    pub fn scroll_half_page_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(self.chat_height / 2);
    }

    pub fn scroll_half_page_down(&mut self) {
        let max_scroll = self.total_chat_lines.saturating_sub(self.chat_height);
        self.chat_scroll = (self.chat_scroll + self.chat_height / 2).min(max_scroll);
    }

    /// Scroll so the newest message (or the typing indicator) is visible.
    /// Uses a wrap estimate from the raw text; the render pass refines
    /// `total_chat_lines` afterwards.
    pub fn scroll_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };

        let mut total_lines: u16 = 0;
        for turn in self.history.turns() {
            total_lines += 1; // Role line ("You:" / "Assistant:")
            for line in turn.text.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        // Room for the typing indicator
        total_lines += 2;

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}

/// Embed the grounding context into the instruction template. Before the
/// index has loaded the backend still gets a truthful placeholder.
pub fn compose_system_instruction(template: &str, context: Option<&str>) -> String {
    template.replace("{context}", context.unwrap_or(LOADING_PLACEHOLDER))
}

fn copy_to_clipboard(text: &str) {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let candidates: [(&str, &[&str]); 3] =
        [("pbcopy", &[]), ("wl-copy", &[]), ("xclip", &["-selection", "clipboard"])];

    for (cmd, args) in candidates {
        if let Ok(mut child) = Command::new(cmd).args(args).stdin(Stdio::piped()).spawn() {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(text.as_bytes());
            }
            let _ = child.wait();
            return;
        }
    }
}
