pub mod command;
pub mod conversation_state;
pub mod prompt;
pub mod render;
pub mod visibility;
pub mod widget;

use std::io::Write;
use std::ops::ControlFlow;
use std::process::ExitCode;
use std::sync::Arc;

use color_print::cstr;
use command::Command;
use eyre::Result;
use prompt::generate_prompt;
use render::Renderer;
use rustyline::error::ReadlineError;
use tracing::{debug, info, warn};
use widget::{ChatWidget, Settlement, SubmitOutcome};

use crate::chat_client::ChatTransport;

const HELP_TEXT: &str = cstr!(
    "
<bold>AI Assistant</bold>

<green>/open</green>         Open the chat panel (or press Enter while it is closed)
<green>/close</green>        Close the chat panel
<green>/help</green>         Show this help dialogue
<green>/quit</green>         Quit the application

Anything else you type while the panel is open is sent to the assistant.
"
);

const CLOSED_HINT: &str = "The chat is closed. Press Enter or type /open to start chatting.";
const BUSY_HINT: &str = "Still waiting for the previous reply.";
const NOT_A_TERMINAL_HINT: &str = "Standard input is not a terminal. Pass --input to ask a single question.";

pub struct ChatContext {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    widget: ChatWidget,
    renderer: Renderer,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            output,
            input,
            interactive,
            widget: ChatWidget::new(transport),
            renderer: Renderer::for_terminal(),
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        // Handle non-interactive mode (single query)
        if let Some(input) = self.input.take() {
            let answered = self.run_once(&input).await?;
            return Ok(if answered { ExitCode::SUCCESS } else { ExitCode::FAILURE });
        }

        if !self.interactive {
            writeln!(self.output, "{}", NOT_A_TERMINAL_HINT)?;
            return Ok(ExitCode::FAILURE);
        }

        self.run_interactive().await?;
        Ok(ExitCode::SUCCESS)
    }

    /// Open the widget, ask one question and print the reply as plain text.
    /// Returns whether the server answered.
    async fn run_once(&mut self, input: &str) -> Result<bool> {
        self.widget.open();

        if self.widget.submit(input) != SubmitOutcome::Accepted {
            writeln!(self.output, "Nothing to send: the input is empty.")?;
            return Ok(false);
        }

        let settlement = self.widget.settle().await;
        if let Some(reply) = self.widget.conversation().last() {
            writeln!(self.output, "{}", reply.text())?;
        }

        Ok(settlement == Some(Settlement::Answered))
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;
        self.renderer.launcher(&mut self.output)?;

        loop {
            let prompt_text = generate_prompt(self.widget.visibility());
            let readline = rl.readline(&prompt_text);

            match readline {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str());
                    }

                    match self.handle_input(&line).await {
                        Ok(ControlFlow::Break(())) => break,
                        Ok(ControlFlow::Continue(())) => {}
                        Err(e) => writeln!(self.output, "Error: {}", e)?,
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        info!("Chat session closed");
        Ok(())
    }

    async fn handle_input(&mut self, line: &str) -> Result<ControlFlow<()>> {
        // Enter on the launcher opens the panel.
        if !self.widget.visibility().is_expanded() && line.trim().is_empty() {
            self.open_panel()?;
            return Ok(ControlFlow::Continue(()));
        }

        match Command::parse(line) {
            Command::Open => self.open_panel()?,
            Command::Close => {
                if self.widget.close() {
                    debug!("Chat panel collapsed");
                    self.renderer.launcher(&mut self.output)?;
                }
            }
            Command::Help => writeln!(self.output, "{}", HELP_TEXT)?,
            Command::Quit => return Ok(ControlFlow::Break(())),
            Command::Ask { prompt } => {
                if !self.widget.visibility().is_expanded() {
                    writeln!(self.output, "{}", CLOSED_HINT)?;
                } else {
                    return self.send(prompt).await;
                }
            }
        }

        Ok(ControlFlow::Continue(()))
    }

    fn open_panel(&mut self) -> Result<()> {
        if self.widget.open() {
            debug!("Chat panel expanded");
            self.renderer.panel(&mut self.output, self.widget.conversation())?;
        }
        Ok(())
    }

    async fn send(&mut self, prompt: String) -> Result<ControlFlow<()>> {
        self.widget.set_draft(prompt);

        match self.widget.submit_draft() {
            SubmitOutcome::Ignored => return Ok(ControlFlow::Continue(())),
            SubmitOutcome::Busy => {
                writeln!(self.output, "{}", BUSY_HINT)?;
                return Ok(ControlFlow::Continue(()));
            }
            SubmitOutcome::Accepted => {}
        }

        // The query is in flight now, so drawing must not return before it settles.
        let shown = self.show_pending();
        if let Err(err) = &shown {
            warn!(error = %err, "Failed to draw the pending message");
        }

        // Ctrl-C while waiting ends the session; dropping the widget aborts the query.
        let settlement = tokio::select! {
            settlement = self.widget.settle() => settlement,
            _ = tokio::signal::ctrl_c() => return Ok(ControlFlow::Break(())),
        };
        debug!(?settlement, "Chat query settled");

        if shown.is_ok() {
            self.renderer.erase_previous_line(&mut self.output)?;
        }
        self.renderer.new_messages(&mut self.output, self.widget.conversation())?;

        Ok(ControlFlow::Continue(()))
    }

    /// Replace the echoed prompt line with the user's bubble and the thinking indicator.
    fn show_pending(&mut self) -> std::io::Result<()> {
        self.renderer.erase_previous_line(&mut self.output)?;
        self.renderer.new_messages(&mut self.output, self.widget.conversation())?;
        self.renderer.thinking(&mut self.output)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::chat_client::{QueryError, QueryResponse};
    use crate::cli::chat::conversation_state::Message;
    use crate::cli::chat::widget::FALLBACK_TEXT;

    /// Answers every query by echoing it back.
    struct EchoTransport;

    #[async_trait]
    impl ChatTransport for EchoTransport {
        async fn query(&self, message: &str) -> Result<QueryResponse, QueryError> {
            Ok(QueryResponse {
                answer: format!("you said: {message}"),
                sources: Vec::new(),
            })
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl ChatTransport for FailingTransport {
        async fn query(&self, _message: &str) -> Result<QueryResponse, QueryError> {
            Err(QueryError::MissingAnswer)
        }
    }

    #[derive(Clone, Default)]
    struct SharedOutput {
        buf: Arc<Mutex<Vec<u8>>>,
        fail_next_write: Arc<AtomicBool>,
    }

    impl SharedOutput {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
        }

        fn fail_next_write(&self) {
            self.fail_next_write.store(true, Ordering::SeqCst);
        }
    }

    impl Write for SharedOutput {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.fail_next_write.swap(false, Ordering::SeqCst) {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            self.buf.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn context(transport: Arc<dyn ChatTransport>, input: Option<&str>) -> (ChatContext, SharedOutput) {
        let output = SharedOutput::default();
        let context = ChatContext::new(Box::new(output.clone()), input.map(str::to_string), false, transport);
        (context, output)
    }

    #[tokio::test]
    async fn refuses_to_start_without_a_terminal() {
        let (mut context, output) = context(Arc::new(EchoTransport), None);

        context.run().await.unwrap();

        assert!(output.contents().contains(NOT_A_TERMINAL_HINT));
        assert_eq!(context.widget.conversation().len(), 1);
    }

    #[tokio::test]
    async fn one_shot_prints_the_answer() {
        let (mut context, output) = context(Arc::new(EchoTransport), Some("hi"));

        assert!(context.run_once("hi").await.unwrap());
        assert_eq!(output.contents(), "you said: hi\n");
    }

    #[tokio::test]
    async fn one_shot_reports_failure_with_fallback_text() {
        let (mut context, output) = context(Arc::new(FailingTransport), None);

        assert!(!context.run_once("hi").await.unwrap());
        assert_eq!(output.contents(), format!("{FALLBACK_TEXT}\n"));
    }

    #[tokio::test]
    async fn one_shot_refuses_blank_input() {
        let (mut context, _output) = context(Arc::new(EchoTransport), None);

        assert!(!context.run_once("  ").await.unwrap());
        assert_eq!(context.widget.conversation().len(), 1);
    }

    #[tokio::test]
    async fn prompts_are_not_sent_while_collapsed() {
        let (mut context, output) = context(Arc::new(EchoTransport), None);

        let flow = context.handle_input("hello?").await.unwrap();

        assert_eq!(flow, ControlFlow::Continue(()));
        assert!(output.contents().contains(CLOSED_HINT));
        assert_eq!(context.widget.conversation().len(), 1);
    }

    #[tokio::test]
    async fn enter_opens_the_panel_and_prompts_get_answers() {
        let (mut context, output) = context(Arc::new(EchoTransport), None);

        context.handle_input("").await.unwrap();
        assert!(context.widget.visibility().is_expanded());

        context.handle_input("hi").await.unwrap();

        assert_eq!(
            context.widget.conversation().last(),
            Some(&Message::bot("you said: hi"))
        );
        assert!(!context.widget.is_pending());
        assert!(output.contents().contains("you said: hi"));
    }

    #[tokio::test]
    async fn close_and_quit_commands() {
        let (mut context, _output) = context(Arc::new(EchoTransport), None);

        context.handle_input("/open").await.unwrap();
        context.handle_input("/close").await.unwrap();
        assert!(!context.widget.visibility().is_expanded());

        let flow = context.handle_input("/quit").await.unwrap();
        assert_eq!(flow, ControlFlow::Break(()));
    }

    #[tokio::test]
    async fn slash_prefixed_prompts_are_sent() {
        let (mut context, _output) = context(Arc::new(EchoTransport), None);

        context.handle_input("/open").await.unwrap();
        context.handle_input("/etc/hosts is missing, why?").await.unwrap();

        assert_eq!(
            context.widget.conversation().last(),
            Some(&Message::bot("you said: /etc/hosts is missing, why?"))
        );
    }

    #[tokio::test]
    async fn draw_failure_while_sending_still_settles_the_query() {
        let (mut context, output) = context(Arc::new(EchoTransport), None);
        context.handle_input("/open").await.unwrap();

        output.fail_next_write();
        let flow = context.handle_input("hi").await.unwrap();

        assert_eq!(flow, ControlFlow::Continue(()));
        assert!(!context.widget.is_pending());
        assert_eq!(
            context.widget.conversation().last(),
            Some(&Message::bot("you said: hi"))
        );
        assert!(output.contents().contains("you said: hi"));

        assert_eq!(context.widget.submit("again"), SubmitOutcome::Accepted);
        context.widget.settle().await;
        assert_eq!(context.widget.conversation().len(), 5);
    }
}
