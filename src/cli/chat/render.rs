use std::io::{self, Write};

use crossterm::cursor::MoveToPreviousLine;
use crossterm::queue;
use crossterm::style::Stylize;
use crossterm::terminal::{self, Clear, ClearType};

use super::conversation_state::{Conversation, Message};

const DEFAULT_WIDTH: usize = 80;
const MIN_BUBBLE_WIDTH: usize = 20;
const INDENT: &str = "  ";
const PANEL_TITLE: &str = " 🤖 AI Assistant";
const PANEL_CLOSE_HINT: &str = " /close to hide ";

/// Draws the widget into a terminal.
///
/// Output only ever grows downward, so the newest message is always the last
/// thing printed and the terminal's own scrollback keeps older ones reachable.
pub struct Renderer {
    width: usize,
    /// How many messages of the current panel have already been drawn.
    rendered: usize,
}

impl Renderer {
    pub fn new(width: usize) -> Self {
        Self { width, rendered: 0 }
    }

    pub fn for_terminal() -> Self {
        let width = terminal::size()
            .map(|(columns, _)| usize::from(columns))
            .unwrap_or(DEFAULT_WIDTH);
        Self::new(width)
    }

    /// Replies wrap at 80% of the terminal width, like the panel's bubbles.
    fn bubble_width(&self) -> usize {
        (self.width * 4 / 5).max(MIN_BUBBLE_WIDTH)
    }

    pub fn launcher<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "{} {}",
            " 💬 ".white().on_blue(),
            "Press Enter or type /open to chat with the AI Assistant.".dark_grey()
        )?;
        out.flush()
    }

    /// Draw the panel header followed by the whole conversation.
    pub fn panel<W: Write>(&mut self, out: &mut W, conversation: &Conversation) -> io::Result<()> {
        // The robot glyph is two columns wide.
        let title_columns = PANEL_TITLE.chars().count() + 1;
        let padding = self
            .width
            .saturating_sub(title_columns + PANEL_CLOSE_HINT.chars().count());
        let title = format!("{PANEL_TITLE}{}", " ".repeat(padding));

        writeln!(out)?;
        writeln!(out, "{}{}", title.bold().white().on_blue(), PANEL_CLOSE_HINT.white().on_blue())?;

        self.rendered = 0;
        self.new_messages(out, conversation)
    }

    /// Draw the messages appended since the last call.
    pub fn new_messages<W: Write>(&mut self, out: &mut W, conversation: &Conversation) -> io::Result<()> {
        for message in conversation.messages().iter().skip(self.rendered) {
            self.message(out, message)?;
        }
        self.rendered = conversation.len();
        out.flush()
    }

    fn message<W: Write>(&self, out: &mut W, message: &Message) -> io::Result<()> {
        let lines = wrap_text(message.text(), self.bubble_width());

        writeln!(out)?;
        if message.is_bot() {
            for line in lines {
                writeln!(out, "{INDENT}{} {line}", "│".dark_grey())?;
            }
        } else {
            for line in lines {
                let padding = self.width.saturating_sub(line.chars().count() + INDENT.len());
                writeln!(out, "{}{}", " ".repeat(padding), line.blue().bold())?;
            }
        }
        Ok(())
    }

    pub fn thinking<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{INDENT}{}", "Bot is thinking...".dark_grey().italic())?;
        out.flush()
    }

    /// Erase the line just above the cursor, e.g. the thinking indicator or
    /// the echoed prompt.
    pub fn erase_previous_line<W: Write>(&self, out: &mut W) -> io::Result<()> {
        queue!(out, MoveToPreviousLine(1), Clear(ClearType::CurrentLine))?;
        out.flush()
    }
}

/// Word-wrap `text` to at most `width` characters per line. Explicit line
/// breaks are kept and words longer than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > width {
                if line_len > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            if line_len > 0 && line_len + 1 + word.len() > width {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line_len += word.len();
            line.extend(word);
        }

        lines.push(line);
    }

    lines
}
