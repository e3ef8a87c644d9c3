//! Screen controllers for the application.
//!
//! Each routed [`crate::state::Screen`] has a controller implementing the
//! [`Screen`] trait. Controllers own their state and handle both rendering
//! and events.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      App                                │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │  Router: transition(screen, NavEvent) -> screen   │  │
//! │  └───────────────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │  Screen controller (Box<dyn Screen>)              │  │
//! │  │  - render(frame, area, context)                   │  │
//! │  │  - handle_event(event, context) -> ScreenAction   │  │
//! │  │  - tick(context) -> ScreenAction                  │  │
//! │  └───────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod home;
pub mod intro;
pub mod location_search;
pub mod profile;
pub mod registration;
pub mod screen_trait;
pub mod user_type;

pub use auth::AuthScreen;
pub use home::HomeScreen;
pub use intro::IntroScreen;
pub use location_search::LocationSearchScreen;
pub use profile::ProfileScreen;
pub use registration::RegistrationScreen;
pub use screen_trait::{RenderContext, Screen, ScreenAction, ScreenContext};
pub use user_type::UserTypeScreen;

use crossterm::event::{Event, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use ratatui::Frame;

use crate::utils::{create_standard_layout, focused_border_style, hint_style};

/// Key presses only; releases and repeats are ignored.
pub(crate) fn key_press(event: &Event) -> Option<KeyEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(*key),
        _ => None,
    }
}

pub(crate) fn is_ctrl(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Draw the title bar and key-hint footer; returns the content area.
pub(crate) fn render_chrome(frame: &mut Frame, area: Rect, title: &str, hints: &str) -> Rect {
    let (header, content, footer) = create_standard_layout(area, 3, 1);

    let header_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(focused_border_style());
    frame.render_widget(
        Paragraph::new(Line::from(format!("servio · {title}")))
            .style(Style::default().add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(header_block),
        header,
    );
    frame.render_widget(Paragraph::new(hints).style(hint_style()), footer);

    content
}
