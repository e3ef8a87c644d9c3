//! "Are you looking for a service or offering one?"

use anyhow::Result;
use crossterm::event::{Event, KeyCode};
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, ListState};
use ratatui::Frame;

use super::{key_press, render_chrome, RenderContext, Screen, ScreenAction, ScreenContext};
use crate::api::models::UserType;
use crate::state::NavEvent;
use crate::utils::{center_popup, focused_border_style, selected_item_style};

const CHOICES: [(UserType, &str); 2] = [
    (UserType::Customer, "I need a service"),
    (UserType::Provider, "I offer a service"),
];

#[derive(Default)]
pub struct UserTypeScreen {
    list_state: ListState,
}

impl UserTypeScreen {
    pub fn new() -> Self {
        Self {
            list_state: ListState::default().with_selected(Some(0)),
        }
    }

    fn selected(&self) -> UserType {
        let index = self.list_state.selected().unwrap_or(0);
        CHOICES[index.min(CHOICES.len() - 1)].0
    }
}

impl Screen for UserTypeScreen {
    fn render(&mut self, frame: &mut Frame, area: Rect, _ctx: &RenderContext) -> Result<()> {
        let content = render_chrome(
            frame,
            area,
            "Get started",
            " ↑↓: choose  Enter: continue  q: quit",
        );

        let items: Vec<ListItem> = CHOICES
            .iter()
            .map(|(user_type, text)| {
                ListItem::new(Line::from(format!("  {text} ({})", user_type.label())))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(focused_border_style())
                    .title(" How will you use servio? "),
            )
            .highlight_style(selected_item_style());

        frame.render_stateful_widget(list, center_popup(content, 50, 40), &mut self.list_state);
        Ok(())
    }

    fn handle_event(&mut self, event: Event, _ctx: &ScreenContext) -> Result<ScreenAction> {
        let Some(key) = key_press(&event) else {
            return Ok(ScreenAction::None);
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list_state.select(Some(0)),
            KeyCode::Down | KeyCode::Char('j') => self.list_state.select(Some(1)),
            KeyCode::Enter => {
                return Ok(ScreenAction::Navigate(NavEvent::ChooseUserType(
                    self.selected(),
                )))
            }
            _ => {}
        }
        Ok(ScreenAction::None)
    }
}
