//! Capabilities provided by the WebApp host the client runs inside.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// The user the host reports as signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellUser {
    pub id: i64,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonKind {
    #[default]
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupButton {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub kind: ButtonKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupConfig {
    pub title: Option<String>,
    pub message: String,
    pub buttons: Vec<PopupButton>,
}

pub trait HostShell: Send + Sync {
    /// Signal that the client finished booting.
    fn ready(&self);
    fn expand(&self);
    fn current_user(&self) -> Option<ShellUser>;
    fn alert(&self, message: &str);
    fn confirm(&self, message: &str) -> bool;
    /// Id of the pressed button, `None` when dismissed.
    fn popup(&self, config: &PopupConfig) -> Option<String>;
}

/// Everything a [`HeadlessShell`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Ready,
    Expand,
    Alert(String),
    Confirm(String),
    Popup(String),
}

/// Scripted host for tests and non-interactive runs.
#[derive(Debug, Default)]
pub struct HeadlessShell {
    user: Option<ShellUser>,
    confirm_answer: bool,
    popup_answer: Option<String>,
    events: Mutex<Vec<ShellEvent>>,
}

impl HeadlessShell {
    pub fn new(user: Option<ShellUser>) -> Self {
        Self {
            user,
            ..Default::default()
        }
    }

    pub fn answering(mut self, confirm: bool, popup: Option<&str>) -> Self {
        self.confirm_answer = confirm;
        self.popup_answer = popup.map(str::to_string);
        self
    }

    pub fn events(&self) -> Vec<ShellEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn record(&self, event: ShellEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl HostShell for HeadlessShell {
    fn ready(&self) {
        self.record(ShellEvent::Ready);
    }

    fn expand(&self) {
        self.record(ShellEvent::Expand);
    }

    fn current_user(&self) -> Option<ShellUser> {
        self.user.clone()
    }

    fn alert(&self, message: &str) {
        tracing::info!(message, "alert");
        self.record(ShellEvent::Alert(message.to_string()));
    }

    fn confirm(&self, message: &str) -> bool {
        self.record(ShellEvent::Confirm(message.to_string()));
        self.confirm_answer
    }

    fn popup(&self, config: &PopupConfig) -> Option<String> {
        self.record(ShellEvent::Popup(config.message.clone()));
        let answer = self.popup_answer.as_ref()?;
        config
            .buttons
            .iter()
            .find(|b| &b.id == answer)
            .map(|b| b.id.clone())
    }
}
