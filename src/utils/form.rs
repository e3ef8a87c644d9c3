//! Form field and form handling for the TUI screens.
//!
//! Fields edit by character (not byte) cursor, can be masked for
//! passwords, and go read-only when disabled.

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Height of one rendered field, borders included.
pub const FIELD_HEIGHT: u16 = 3;

#[derive(Clone)]
pub struct FormField {
    pub value: String,
    /// Cursor position in characters.
    pub cursor: usize,
    pub label: String,
    pub placeholder: Option<String>,
    pub is_focused: bool,
    pub is_disabled: bool,
    /// Render every character as `•`.
    pub is_masked: bool,
    /// Inline check run on each edit. Returns the error to show, if any.
    validator: Option<fn(&str) -> Option<String>>,
    validation_error: Option<String>,
}

impl std::fmt::Debug for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormField")
            .field("label", &self.label)
            .field("cursor", &self.cursor)
            .field("is_focused", &self.is_focused)
            .field("is_disabled", &self.is_disabled)
            .field("is_masked", &self.is_masked)
            .field("validation_error", &self.validation_error)
            .finish_non_exhaustive()
    }
}

impl Default for FormField {
    fn default() -> Self {
        Self::new("")
    }
}

impl FormField {
    pub fn new(label: &str) -> Self {
        Self {
            value: String::new(),
            cursor: 0,
            label: label.to_string(),
            placeholder: None,
            is_focused: false,
            is_disabled: false,
            is_masked: false,
            validator: None,
            validation_error: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn with_validator(mut self, validator: fn(&str) -> Option<String>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self.cursor = value.chars().count();
        self
    }

    pub fn masked(mut self) -> Self {
        self.is_masked = true;
        self
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
        self.validation_error = None;
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
        self.cursor = value.chars().count();
        self.validate();
    }

    pub fn value_trimmed(&self) -> &str {
        self.value.trim()
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Run the inline validator; an empty value is never flagged here.
    pub fn validate(&mut self) -> bool {
        self.validation_error = match self.validator {
            Some(validator) if !self.value.is_empty() => validator(&self.value),
            _ => None,
        };
        self.validation_error.is_none()
    }

    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    /// Returns true if the key changed the field or its cursor.
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        if self.is_disabled {
            return false;
        }

        let handled = match key {
            KeyCode::Char(c) => {
                self.insert_char(c);
                true
            }
            KeyCode::Backspace => {
                self.handle_backspace();
                true
            }
            KeyCode::Delete => {
                self.handle_delete();
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                if self.cursor < self.value.chars().count() {
                    self.cursor += 1;
                }
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.value.chars().count();
                true
            }
            _ => false,
        };

        if handled {
            self.validate();
        }
        handled
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map_or(self.value.len(), |(i, _)| i)
    }

    fn insert_char(&mut self, c: char) {
        let byte_pos = self.byte_index(self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            let start = self.byte_index(self.cursor - 1);
            let end = self.byte_index(self.cursor);
            self.value.replace_range(start..end, "");
            self.cursor -= 1;
        }
    }

    fn handle_delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let start = self.byte_index(self.cursor);
            let end = self.byte_index(self.cursor + 1);
            self.value.replace_range(start..end, "");
        }
    }

    fn display_text(&self) -> String {
        if self.value.is_empty() {
            return self.placeholder.clone().unwrap_or_default();
        }
        if self.is_masked {
            "•".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let border_color = if self.validation_error.is_some() {
            Color::Red
        } else if self.is_focused {
            Color::Cyan
        } else {
            Color::Gray
        };

        let title = match &self.validation_error {
            Some(error) => format!(" {} - {} ", self.label, error),
            None if self.label.is_empty() => String::new(),
            None => format!(" {} ", self.label),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(title);

        let style = if self.is_disabled || self.value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        frame.render_widget(
            Paragraph::new(self.display_text()).style(style).block(block),
            area,
        );

        if self.is_focused && !self.is_disabled {
            let cursor_x = area.x + 1 + self.cursor as u16;
            let cursor_y = area.y + 1;
            if cursor_x < area.x + area.width.saturating_sub(1) {
                frame.set_cursor_position((cursor_x, cursor_y));
            }
        }
    }
}

/// An ordered set of fields with one focused at a time.
#[derive(Debug, Default)]
pub struct Form {
    pub fields: Vec<FormField>,
    pub focused_index: usize,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, index: usize) -> Option<&FormField> {
        self.fields.get(index)
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut FormField> {
        self.fields.get_mut(index)
    }

    /// Trimmed value of field `index`, empty when out of range.
    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map_or("", FormField::value_trimmed)
    }

    /// Untrimmed value, for passwords.
    pub fn raw_value(&self, index: usize) -> &str {
        self.fields.get(index).map_or("", |f| f.value.as_str())
    }

    pub fn focused_field_mut(&mut self) -> Option<&mut FormField> {
        self.fields.get_mut(self.focused_index)
    }

    pub fn focus(&mut self, index: usize) {
        if index < self.fields.len() {
            for (i, field) in self.fields.iter_mut().enumerate() {
                field.is_focused = i == index;
            }
            self.focused_index = index;
        }
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus((self.focused_index + 1) % self.fields.len());
        }
    }

    pub fn prev_field(&mut self) {
        if !self.fields.is_empty() {
            let len = self.fields.len();
            self.focus((self.focused_index + len - 1) % len);
        }
    }

    /// Tab / BackTab / Up / Down move focus; anything else goes to the
    /// focused field.
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Tab | KeyCode::Down => {
                self.next_field();
                true
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.prev_field();
                true
            }
            _ => self
                .focused_field_mut()
                .is_some_and(|field| field.handle_key(key)),
        }
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        for field in &mut self.fields {
            field.is_disabled = disabled;
        }
    }

    pub fn init_focus(&mut self) {
        self.focus(0);
    }

    /// Lay the fields out top to bottom in `area`; fields that do not fit
    /// are skipped.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let constraints: Vec<Constraint> = self
            .fields
            .iter()
            .map(|_| Constraint::Length(FIELD_HEIGHT))
            .chain(std::iter::once(Constraint::Min(0)))
            .collect();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (field, row) in self.fields.iter().zip(rows.iter()) {
            if row.height >= FIELD_HEIGHT {
                field.render(frame, *row);
            }
        }
    }
}

/// Inline validators for form fields.
pub mod validators {
    use crate::utils::validation::{is_valid_email, is_valid_phone};

    pub fn email(value: &str) -> Option<String> {
        (!is_valid_email(value)).then(|| "invalid email".to_string())
    }

    pub fn phone(value: &str) -> Option<String> {
        (!is_valid_phone(value)).then(|| "invalid phone number".to_string())
    }
}
