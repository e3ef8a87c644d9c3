//! Screen trait and associated types.
//!
//! Screens own their state, borrow shared resources through a context, and
//! report what should happen next as a [`ScreenAction`] instead of mutating
//! app state directly.

use crate::api::ApiClient;
use crate::config::Config;
use crate::services::{LocationResolver, ResolvedLocation};
use crate::session::Session;
use crate::state::{ConfirmAction, NavEvent};
use crate::widgets::Toast;
use anyhow::Result;
use crossterm::event::Event;
use ratatui::layout::Rect;
use ratatui::Frame;
use tokio::runtime::Runtime;

/// Read-only resources needed for rendering.
pub struct RenderContext<'a> {
    pub config: &'a Config,
    /// Signed-in session, if any.
    pub session: Option<&'a Session>,
}

impl<'a> RenderContext<'a> {
    pub fn new(config: &'a Config, session: Option<&'a Session>) -> Self {
        Self { config, session }
    }
}

/// Resources available while handling events.
///
/// Screens drive async service calls with `runtime.block_on` for short
/// request/response work, or `runtime.spawn` for work that reports back
/// through [`Screen::tick`].
pub struct ScreenContext<'a> {
    pub config: &'a Config,
    pub runtime: &'a Runtime,
    /// Shared client; clones share the bearer token.
    pub api: &'a ApiClient,
    pub location: &'a LocationResolver,
    pub session: Option<&'a Session>,
}

/// Actions that a screen can return after handling an event.
#[derive(Debug, Clone, Default)]
pub enum ScreenAction {
    /// Stay on the current screen.
    #[default]
    None,
    /// Feed an event to the router.
    Navigate(NavEvent),
    /// Persist the session and route to home.
    Authenticated(Session),
    /// Persist the session without leaving the screen.
    SessionStarted(Session),
    /// Hand a location back to the screen that opened the picker.
    LocationResolved(ResolvedLocation),
    /// Show a modal alert, dismissed with Enter, Esc or Space.
    ShowMessage {
        title: String,
        content: String,
    },
    /// Ask a yes/no question. `action` runs only on yes.
    Confirm {
        title: String,
        content: String,
        action: ConfirmAction,
    },
    /// Non-blocking status notice.
    Notify(Toast),
    /// Toggle the key binding overlay.
    ShowHelp,
    /// Leave the application.
    Quit,
}

impl ScreenAction {
    /// Shorthand for [`ScreenAction::ShowMessage`].
    pub fn message(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ShowMessage {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Trait for screen controllers.
///
/// # Example
///
/// ```rust,ignore
/// struct MyScreen {
///     state: MyState,
/// }
///
/// impl Screen for MyScreen {
///     fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &RenderContext) -> Result<()> {
///         Ok(())
///     }
///
///     fn handle_event(&mut self, event: Event, ctx: &ScreenContext) -> Result<ScreenAction> {
///         match event {
///             Event::Key(key) if key.code == KeyCode::Esc => {
///                 Ok(ScreenAction::Navigate(NavEvent::Back))
///             }
///             _ => Ok(ScreenAction::None),
///         }
///     }
/// }
/// ```
pub trait Screen {
    /// Render the screen.
    ///
    /// # Arguments
    ///
    /// * `frame` - The frame to render to.
    /// * `area` - The area to render within.
    /// * `ctx` - Render context with shared resources.
    fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &RenderContext) -> Result<()>;

    /// Handle an input event.
    ///
    /// # Returns
    ///
    /// An action indicating what should happen next.
    fn handle_event(&mut self, event: Event, ctx: &ScreenContext) -> Result<ScreenAction>;

    /// When true, global shortcuts are disabled so users can type freely.
    fn is_input_focused(&self) -> bool {
        false
    }

    /// Called when the screen is navigated to.
    fn on_enter(&mut self, _ctx: &ScreenContext) -> Result<ScreenAction> {
        Ok(ScreenAction::None)
    }

    /// Called on every loop iteration; used to collect background results.
    fn tick(&mut self, _ctx: &ScreenContext) -> Result<ScreenAction> {
        Ok(ScreenAction::None)
    }

    /// Called when the location picker opened by this screen returns.
    fn on_location_resolved(
        &mut self,
        _location: ResolvedLocation,
        _ctx: &ScreenContext,
    ) -> Result<ScreenAction> {
        Ok(ScreenAction::None)
    }
}
