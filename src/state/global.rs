//! State that persists across screen changes.

use super::{ConfirmAction, Dialog};

#[derive(Debug, Clone, Default)]
pub struct GlobalState {
    /// Currently active dialog or overlay.
    pub dialog: Dialog,

    /// Whether a text input is focused.
    /// When true, global shortcuts are disabled so users can type freely.
    pub input_mode_active: bool,
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_dialog(&self) -> bool {
        !matches!(self.dialog, Dialog::None)
    }

    pub fn show_message(&mut self, title: impl Into<String>, content: impl Into<String>) {
        self.dialog = Dialog::Message {
            title: title.into(),
            content: content.into(),
        };
    }

    pub fn show_confirm(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        action: ConfirmAction,
    ) {
        self.dialog = Dialog::Confirm {
            title: title.into(),
            content: content.into(),
            action,
        };
    }

    pub fn close_dialog(&mut self) {
        self.dialog = Dialog::None;
    }

    pub fn toggle_help(&mut self) {
        self.dialog = match self.dialog {
            Dialog::Help => Dialog::None,
            _ => Dialog::Help,
        };
    }
}
