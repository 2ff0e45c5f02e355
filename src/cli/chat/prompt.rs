use rustyline::{Config, Editor, Result};

use super::visibility::Visibility;

pub fn generate_prompt(visibility: Visibility) -> String {
    match visibility {
        Visibility::Collapsed => "💬 ".to_string(),
        Visibility::Expanded => "> ".to_string(),
    }
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .build();
    Editor::with_config(config)
}
