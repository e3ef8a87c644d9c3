//! Signed-in landing screen.

use anyhow::Result;
use crossterm::event::{Event, KeyCode};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use super::{key_press, render_chrome, RenderContext, Screen, ScreenAction, ScreenContext};
use crate::api::models::UserType;
use crate::services::ResolvedLocation;
use crate::state::{ConfirmAction, NavEvent};
use crate::utils::{focused_border_style, hint_style, selected_item_style};
use crate::widgets::Toast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Profile,
    Location,
    Logout,
}

impl MenuItem {
    fn label(self) -> &'static str {
        match self {
            MenuItem::Profile => "Business profile",
            MenuItem::Location => "Set my location",
            MenuItem::Logout => "Log out",
        }
    }
}

pub struct HomeScreen {
    user_type: UserType,
    items: Vec<MenuItem>,
    list_state: ListState,
    location: Option<String>,
}

impl HomeScreen {
    pub fn new(user_type: UserType) -> Self {
        let items = match user_type {
            UserType::Provider => vec![MenuItem::Profile, MenuItem::Location, MenuItem::Logout],
            UserType::Customer => vec![MenuItem::Location, MenuItem::Logout],
        };
        Self {
            user_type,
            items,
            list_state: ListState::default().with_selected(Some(0)),
            location: None,
        }
    }

    fn activate(&self, item: MenuItem) -> ScreenAction {
        match item {
            MenuItem::Profile => ScreenAction::Navigate(NavEvent::OpenProfile),
            MenuItem::Location => ScreenAction::Navigate(NavEvent::OpenLocationSearch),
            MenuItem::Logout => ScreenAction::Confirm {
                title: "Log out".to_string(),
                content: "Sign out of servio on this device?".to_string(),
                action: ConfirmAction::Logout,
            },
        }
    }
}

impl Screen for HomeScreen {
    fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &RenderContext) -> Result<()> {
        let content = render_chrome(
            frame,
            area,
            "Home",
            " ↑↓: move  Enter: open  ?: help  q: quit",
        );
        let [greeting, menu] =
            Layout::vertical([Constraint::Length(4), Constraint::Min(0)]).areas(content);

        let name = ctx
            .session
            .map_or("there", |session| session.user.display_name());
        let lines = vec![
            Line::from(Span::styled(
                format!("Hello, {name}"),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("Signed in as a {}", self.user_type.label()),
                hint_style(),
            )),
            Line::from(match &self.location {
                Some(location) => format!("Location: {location}"),
                None => "Location: not set".to_string(),
            }),
        ];
        frame.render_widget(Paragraph::new(lines), greeting);

        let items: Vec<ListItem> = self
            .items
            .iter()
            .map(|item| ListItem::new(format!("  {}", item.label())))
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(focused_border_style()),
            )
            .highlight_style(selected_item_style());
        frame.render_stateful_widget(list, menu, &mut self.list_state);
        Ok(())
    }

    fn handle_event(&mut self, event: Event, _ctx: &ScreenContext) -> Result<ScreenAction> {
        let Some(key) = key_press(&event) else {
            return Ok(ScreenAction::None);
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list_state.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.list_state.select_next(),
            KeyCode::Enter => {
                let index = self.list_state.selected().unwrap_or(0);
                if let Some(item) = self.items.get(index) {
                    return Ok(self.activate(*item));
                }
            }
            _ => {}
        }
        Ok(ScreenAction::None)
    }

    fn on_location_resolved(
        &mut self,
        location: ResolvedLocation,
        _ctx: &ScreenContext,
    ) -> Result<ScreenAction> {
        let label = location.label();
        self.location = Some(label.clone());
        Ok(ScreenAction::Notify(Toast::success(format!(
            "Location set to {label}"
        ))))
    }
}
