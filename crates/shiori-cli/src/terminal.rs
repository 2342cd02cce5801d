use std::io::{self, BufRead, Write};

use shiori_runtime::{HostShell, PageError, PopupConfig, ShellUser};

/// Host capabilities backed by stdin/stderr.
pub struct TerminalShell {
    user: Option<ShellUser>,
}

impl TerminalShell {
    pub fn new() -> Self {
        let user = std::env::var("USER").ok().map(|name| ShellUser {
            id: 0,
            display_name: name,
        });
        Self { user }
    }

    pub fn alert_page(&self, err: &PageError) {
        tracing::debug!(error = %err, "page failed");
        self.alert(err.user_message());
    }

    fn prompt(&self, text: &str) -> Option<String> {
        eprint!("{text}");
        io::stderr().flush().ok()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        Some(line.trim().to_string())
    }
}

impl HostShell for TerminalShell {
    fn ready(&self) {
        tracing::debug!("terminal shell ready");
    }

    fn expand(&self) {}

    fn current_user(&self) -> Option<ShellUser> {
        self.user.clone()
    }

    fn alert(&self, message: &str) {
        eprintln!("! {message}");
    }

    fn confirm(&self, message: &str) -> bool {
        self.prompt(&format!("{message} [y/N] "))
            .is_some_and(|answer| matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }

    fn popup(&self, config: &PopupConfig) -> Option<String> {
        if let Some(title) = &config.title {
            eprintln!("{title}");
        }
        eprintln!("{}", config.message);
        for (i, button) in config.buttons.iter().enumerate() {
            eprintln!("  {}) {}", i + 1, button.text);
        }
        let choice: usize = self.prompt("> ")?.parse().ok()?;
        config
            .buttons
            .get(choice.checked_sub(1)?)
            .map(|b| b.id.clone())
    }
}
