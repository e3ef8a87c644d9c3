//! Location picker with live suggestions.
//!
//! Opening the picker starts detecting the device location in the
//! background; once known it is offered as the first row. Every edit of
//! the query starts a new debounced search on the runtime; results come
//! back over a channel and only the newest search's results are shown.

use anyhow::Result;
use crossterm::event::{Event, KeyCode};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::debug;

use super::{is_ctrl, key_press, render_chrome, RenderContext, Screen, ScreenAction, ScreenContext};
use crate::services::{LocationChoice, LocationRecord, ResolvedLocation};
use crate::state::NavEvent;
use crate::utils::{hint_style, selected_item_style, unfocused_border_style, FormField, Ticket};

type SearchResult = (Ticket, Option<Vec<String>>);

/// The row under the cursor.
#[derive(Debug, Clone, PartialEq)]
enum Picked {
    Current(LocationRecord),
    Suggestion(String),
}

pub struct LocationSearchScreen {
    query: FormField,
    suggestions: Vec<String>,
    list_state: ListState,
    searching: bool,
    tx: mpsc::UnboundedSender<SearchResult>,
    rx: mpsc::UnboundedReceiver<SearchResult>,
    /// Device location found on open, listed above the suggestions.
    detected: Option<LocationRecord>,
    detecting: bool,
    detect_tx: mpsc::UnboundedSender<LocationRecord>,
    detect_rx: mpsc::UnboundedReceiver<LocationRecord>,
}

impl Default for LocationSearchScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationSearchScreen {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (detect_tx, detect_rx) = mpsc::unbounded_channel();
        let mut query = FormField::new("Search area or city").with_placeholder("e.g. Lekki");
        query.is_focused = true;
        Self {
            query,
            suggestions: Vec::new(),
            list_state: ListState::default(),
            searching: false,
            tx,
            rx,
            detected: None,
            detecting: false,
            detect_tx,
            detect_rx,
        }
    }

    /// Rows before the first suggestion.
    fn offset(&self) -> usize {
        usize::from(self.detected.is_some())
    }

    fn start_detection(&mut self, ctx: &ScreenContext) {
        if self.detecting || self.detected.is_some() {
            return;
        }
        let resolver = ctx.location.clone();
        let tx = self.detect_tx.clone();
        self.detecting = true;
        ctx.runtime.spawn(async move {
            let _ = tx.send(resolver.detect_current().await);
        });
    }

    fn apply_detected(&mut self, record: LocationRecord) {
        debug!("Current location ready: {}, {}", record.city, record.state);
        self.detecting = false;
        self.detected = Some(record);
        match self.list_state.selected() {
            // Keep the cursor on the same suggestion
            Some(index) => self.list_state.select(Some(index + 1)),
            None => self.list_state.select(Some(0)),
        }
    }

    fn picked(&self) -> Option<Picked> {
        let index = self.list_state.selected()?;
        match (&self.detected, index) {
            (Some(record), 0) => Some(Picked::Current(record.clone())),
            _ => self
                .suggestions
                .get(index - self.offset())
                .cloned()
                .map(Picked::Suggestion),
        }
    }

    fn start_search(&mut self, ctx: &ScreenContext) {
        let ticket = ctx.location.begin_search();
        let resolver = ctx.location.clone();
        let query = self.query.value.clone();
        let tx = self.tx.clone();
        self.searching = true;
        ctx.runtime.spawn(async move {
            let result = resolver.suggestions(ticket, &query).await;
            let _ = tx.send((ticket, result));
        });
    }

    /// Apply a finished search if it is still the newest one.
    fn apply_result(&mut self, ticket: Ticket, result: Option<Vec<String>>, is_latest: bool) {
        let Some(suggestions) = result else {
            return;
        };
        if !is_latest {
            debug!("Ignoring stale suggestions for search {}", ticket.number());
            return;
        }
        self.searching = false;
        let first = if suggestions.is_empty() {
            self.detected.as_ref().map(|_| 0)
        } else {
            Some(self.offset())
        };
        self.list_state.select(first);
        self.suggestions = suggestions;
    }

    fn resolve(&self, choice: LocationChoice, ctx: &ScreenContext) -> ScreenAction {
        let resolved = ctx.runtime.block_on(ctx.location.resolve_location(choice));
        ScreenAction::LocationResolved(resolved)
    }

    /// Use the detected location, detecting it now if it has not arrived.
    fn use_current(&self, ctx: &ScreenContext) -> ScreenAction {
        match &self.detected {
            Some(record) => {
                ScreenAction::LocationResolved(ResolvedLocation::Detected(record.clone()))
            }
            None => self.resolve(LocationChoice::CurrentLocation, ctx),
        }
    }
}

impl Screen for LocationSearchScreen {
    fn render(&mut self, frame: &mut Frame, area: Rect, _ctx: &RenderContext) -> Result<()> {
        let content = render_chrome(
            frame,
            area,
            "Choose location",
            " type to search  ↑↓: pick  Enter: select  ^L: use current location  Esc: back",
        );
        let [input, status, list_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(content);

        self.query.render(frame, input);

        let status_text = if self.searching {
            "Searching..."
        } else if self.detecting {
            "Detecting your current location..."
        } else if self.suggestions.is_empty() && !self.query.is_empty() {
            "No matching places"
        } else {
            ""
        };
        frame.render_widget(Paragraph::new(status_text).style(hint_style()), status);

        let current = self.detected.as_ref().map(|record| {
            let place = if record.address.is_empty() {
                format!("{}, {}", record.city, record.state)
            } else {
                record.address.clone()
            };
            ListItem::new(format!("  ◎ Current location: {place}"))
        });
        let items: Vec<ListItem> = current
            .into_iter()
            .chain(self.suggestions.iter().map(|s| ListItem::new(format!("  {s}"))))
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(unfocused_border_style())
                    .title(" Suggestions "),
            )
            .highlight_style(selected_item_style());
        frame.render_stateful_widget(list, list_area, &mut self.list_state);
        Ok(())
    }

    fn handle_event(&mut self, event: Event, ctx: &ScreenContext) -> Result<ScreenAction> {
        let Some(key) = key_press(&event) else {
            return Ok(ScreenAction::None);
        };

        if is_ctrl(&key) && key.code == KeyCode::Char('l') {
            return Ok(self.use_current(ctx));
        }

        match key.code {
            KeyCode::Esc => return Ok(ScreenAction::Navigate(NavEvent::Back)),
            KeyCode::Up => self.list_state.select_previous(),
            KeyCode::Down => self.list_state.select_next(),
            KeyCode::Enter => {
                return Ok(match self.picked() {
                    Some(Picked::Current(record)) => {
                        ScreenAction::LocationResolved(ResolvedLocation::Detected(record))
                    }
                    Some(Picked::Suggestion(label)) => {
                        self.resolve(LocationChoice::Suggestion(label), ctx)
                    }
                    None => ScreenAction::None,
                });
            }
            code => {
                let before = self.query.value.clone();
                self.query.handle_key(code);
                if self.query.value != before {
                    self.start_search(ctx);
                }
            }
        }
        Ok(ScreenAction::None)
    }

    fn on_enter(&mut self, ctx: &ScreenContext) -> Result<ScreenAction> {
        self.start_detection(ctx);
        Ok(ScreenAction::None)
    }

    fn tick(&mut self, ctx: &ScreenContext) -> Result<ScreenAction> {
        while let Ok(record) = self.detect_rx.try_recv() {
            self.apply_detected(record);
        }
        while let Ok((ticket, result)) = self.rx.try_recv() {
            let is_latest = ctx.location.is_latest(ticket);
            self.apply_result(ticket, result, is_latest);
        }
        Ok(ScreenAction::None)
    }

    fn is_input_focused(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::app::build_location_resolver;
    use crate::config::Config;
    use crate::utils::LatestRequest;

    #[test]
    fn test_only_latest_results_are_applied() {
        let latest = LatestRequest::new();
        let first = latest.issue();
        let second = latest.issue();

        let mut screen = LocationSearchScreen::new();
        screen.searching = true;
        screen.apply_result(
            first,
            Some(vec!["Ikeja, Lagos".to_string()]),
            latest.is_current(first),
        );
        assert!(screen.suggestions.is_empty());
        assert!(screen.searching);

        screen.apply_result(
            second,
            Some(vec!["Lekki, Lagos".to_string()]),
            latest.is_current(second),
        );
        assert_eq!(screen.suggestions, vec!["Lekki, Lagos".to_string()]);
        assert_eq!(screen.list_state.selected(), Some(0));
        assert!(!screen.searching);
    }

    #[test]
    fn test_superseded_search_is_dropped() {
        let latest = LatestRequest::new();
        let ticket = latest.issue();
        let mut screen = LocationSearchScreen::new();
        screen.suggestions = vec!["Yaba, Lagos".to_string()];
        screen.apply_result(ticket, None, true);
        assert_eq!(screen.suggestions, vec!["Yaba, Lagos".to_string()]);
    }

    #[test]
    fn test_detected_location_is_offered_first() {
        let mut screen = LocationSearchScreen::new();
        screen.suggestions = vec!["Yaba, Lagos".to_string()];
        screen.list_state.select(Some(0));

        screen.apply_detected(LocationRecord::fallback());
        assert!(!screen.detecting);
        // The cursor stays on the suggestion it was on
        assert_eq!(screen.picked(), Some(Picked::Suggestion("Yaba, Lagos".to_string())));

        screen.list_state.select(Some(0));
        assert_eq!(screen.picked(), Some(Picked::Current(LocationRecord::fallback())));
    }

    #[test]
    fn test_search_results_select_first_suggestion_below_current() {
        let latest = LatestRequest::new();
        let ticket = latest.issue();
        let mut screen = LocationSearchScreen::new();
        screen.apply_detected(LocationRecord::fallback());

        screen.apply_result(ticket, Some(vec!["Wuse, Abuja".to_string()]), true);
        assert_eq!(screen.list_state.selected(), Some(1));
        assert_eq!(screen.picked(), Some(Picked::Suggestion("Wuse, Abuja".to_string())));

        screen.apply_result(latest.issue(), Some(Vec::new()), true);
        assert_eq!(screen.list_state.selected(), Some(0));
    }

    #[test]
    fn test_opening_detects_current_location() {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let config = Config::default();
        let api = ApiClient::new("http://127.0.0.1:9", None).expect("client");
        let resolver = build_location_resolver(&config).expect("resolver");
        let ctx = ScreenContext {
            config: &config,
            runtime: &runtime,
            api: &api,
            location: &resolver,
            session: None,
        };

        let mut screen = LocationSearchScreen::new();
        screen.on_enter(&ctx).expect("enter");
        assert!(screen.detecting);

        // No device position is configured, so detection settles on the fallback
        let record = runtime
            .block_on(screen.detect_rx.recv())
            .expect("detection result");
        screen.apply_detected(record);

        let key = Event::Key(crossterm::event::KeyEvent::from(KeyCode::Enter));
        let action = screen.handle_event(key, &ctx).expect("enter key");
        let ScreenAction::LocationResolved(ResolvedLocation::Detected(record)) = action else {
            panic!("expected the detected location");
        };
        assert_eq!(record.city, "Lagos");
    }
}
