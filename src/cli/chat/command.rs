#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Open,
    Close,
    Help,
    Quit,
    Ask { prompt: String },
}

impl Command {
    /// Only exact command words are commands. Everything else, including
    /// text that merely starts with `/`, is a prompt sent verbatim.
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "/open" => Self::Open,
            "/close" => Self::Close,
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Ask {
                prompt: input.to_string(),
            },
        }
    }
}
