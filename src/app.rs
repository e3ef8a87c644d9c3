use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::config::Config;
use crate::geocode::NominatimClient;
use crate::screens::{
    is_ctrl, key_press, AuthScreen, HomeScreen, IntroScreen, LocationSearchScreen, ProfileScreen,
    RegistrationScreen, RenderContext, Screen as ScreenController, ScreenAction, ScreenContext,
    UserTypeScreen,
};
use crate::services::{AuthController, ConfiguredGeolocator, LocationResolver, ResolvedLocation};
use crate::session::{Session, SessionStore};
use crate::state::{initial_screen, transition, ConfirmAction, Dialog, GlobalState, NavEvent, Screen};
use crate::tui::Tui;
use crate::utils::{get_config_path, get_state_path};
use crate::widgets::{Dialog as DialogWidget, DialogVariant, ToastManager};

const HELP_TEXT: &str = "\
Tab / Shift+Tab   move between fields
Enter             submit or continue
Esc               go back
Ctrl+C            quit from anywhere
q                 quit (outside text fields)
F1 or ?           toggle this help

Each screen lists its own shortcuts at the bottom.";

/// Build the location resolver from config: configured device position
/// plus the Nominatim geocoder.
pub fn build_location_resolver(config: &Config) -> Result<LocationResolver> {
    let geocoder = NominatimClient::new(&config.geocoding)?;
    Ok(LocationResolver::new(
        Arc::new(ConfiguredGeolocator::from_config(config)),
        Arc::new(geocoder),
        config,
    ))
}

/// Shared resources handed to screens.
pub struct AppCore {
    pub config: Config,
    pub runtime: Runtime,
    pub api: ApiClient,
    pub session: SessionStore,
    pub location: LocationResolver,
}

impl AppCore {
    pub fn load() -> Result<Self> {
        let config = Config::load_or_create(&get_config_path())?;
        let runtime = Runtime::new().context("Failed to create tokio runtime")?;
        let api = ApiClient::from_config(&config)?;
        let session = SessionStore::load(&get_state_path())?;
        if let Some(token) = session.token() {
            api.set_token(Some(token.to_string()));
        }
        let location = build_location_resolver(&config)?;

        Ok(Self {
            config,
            runtime,
            api,
            session,
            location,
        })
    }

    pub fn context(&self) -> ScreenContext<'_> {
        ScreenContext {
            config: &self.config,
            runtime: &self.runtime,
            api: &self.api,
            location: &self.location,
            session: self.session.current(),
        }
    }

    /// Store a fresh session and start sending its token.
    pub fn persist_session(&mut self, session: Session) -> Result<()> {
        self.api.set_token(Some(session.token.clone()));
        self.session.save(session)
    }

    /// Best-effort server logout, then forget the local session.
    pub fn logout(&mut self) -> Result<()> {
        let controller = AuthController::new(self.api.clone(), None);
        self.runtime.block_on(controller.logout());
        self.api.set_token(None);
        self.session.clear()
    }
}

/// Main application state
pub struct App {
    core: AppCore,
    tui: Tui,
    global: GlobalState,
    toasts: ToastManager,
    /// Router position.
    screen: Screen,
    controller: Box<dyn ScreenController>,
    /// The screen that opened the location picker, resumed when it closes.
    suspended: Option<Box<dyn ScreenController>>,
    should_quit: bool,
}

fn controller_for(screen: &Screen, core: &AppCore) -> Box<dyn ScreenController> {
    match screen {
        Screen::Intro { slide } => Box::new(IntroScreen::new(*slide)),
        Screen::UserType => Box::new(UserTypeScreen::new()),
        Screen::Auth { mode, user_type } => Box::new(AuthScreen::new(*mode, *user_type)),
        Screen::Home { user_type } => Box::new(HomeScreen::new(*user_type)),
        Screen::ProviderRegistration => Box::new(RegistrationScreen::new(&core.api, &core.config)),
        Screen::LocationSearch { .. } => Box::new(LocationSearchScreen::new()),
        Screen::ProviderProfile => Box::new(ProfileScreen::new(&core.api)),
    }
}

impl App {
    pub fn new() -> Result<Self> {
        let core = AppCore::load()?;
        let screen = initial_screen(core.session.has_launched(), core.session.current());
        info!("Starting on {}", screen.title());
        let controller = controller_for(&screen, &core);

        Ok(Self {
            core,
            tui: Tui::new()?,
            global: GlobalState::new(),
            toasts: ToastManager::new(),
            screen,
            controller,
            suspended: None,
            should_quit: false,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        self.tui.enter()?;

        let entered = self.controller.on_enter(&self.core.context());
        self.dispatch(entered)?;

        loop {
            self.draw()?;

            if self.should_quit {
                break;
            }

            if let Some(event) = self.tui.poll_event(Duration::from_millis(100))? {
                self.handle_event(event)?;
            }

            let ticked = self.controller.tick(&self.core.context());
            self.dispatch(ticked)?;
            self.toasts.tick();
        }

        self.tui.exit()?;
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        let Self {
            core,
            tui,
            global,
            toasts,
            controller,
            ..
        } = self;
        let render_ctx = RenderContext::new(&core.config, core.session.current());
        let mut rendered = Ok(());

        tui.terminal_mut().draw(|frame| {
            let area = frame.area();
            rendered = controller.render(frame, area, &render_ctx);

            match &global.dialog {
                Dialog::None => {}
                Dialog::Message { title, content } => frame.render_widget(
                    DialogWidget::new(title, content).footer("Enter: close"),
                    area,
                ),
                Dialog::Confirm { title, content, .. } => frame.render_widget(
                    DialogWidget::new(title, content)
                        .variant(DialogVariant::Warning)
                        .footer("y: confirm  n: cancel"),
                    area,
                ),
                Dialog::Help => frame.render_widget(
                    DialogWidget::new("Keys", HELP_TEXT)
                        .height(50)
                        .footer("any key: close"),
                    area,
                ),
            }

            toasts.render(frame, area);
        })?;
        rendered
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        if self.global.has_dialog() {
            return self.handle_dialog_event(&event);
        }

        self.global.input_mode_active = self.controller.is_input_focused();
        if let Some(key) = key_press(&event) {
            if is_ctrl(&key) && key.code == KeyCode::Char('c') {
                self.should_quit = true;
                return Ok(());
            }
            match key.code {
                KeyCode::F(1) => {
                    self.global.toggle_help();
                    return Ok(());
                }
                KeyCode::Char('?') if !self.global.input_mode_active => {
                    self.global.toggle_help();
                    return Ok(());
                }
                KeyCode::Char('q') if !self.global.input_mode_active => {
                    self.should_quit = true;
                    return Ok(());
                }
                _ => {}
            }
        }

        let handled = self.controller.handle_event(event, &self.core.context());
        self.dispatch(handled)
    }

    fn handle_dialog_event(&mut self, event: &Event) -> Result<()> {
        let Some(key) = key_press(event) else {
            return Ok(());
        };

        match self.global.dialog.clone() {
            Dialog::None => {}
            Dialog::Message { .. } => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                    self.global.close_dialog();
                }
            }
            Dialog::Confirm { action, .. } => match key.code {
                KeyCode::Char('y' | 'Y') | KeyCode::Enter => {
                    self.global.close_dialog();
                    self.confirm(action)?;
                }
                KeyCode::Char('n' | 'N') | KeyCode::Esc => self.global.close_dialog(),
                _ => {}
            },
            Dialog::Help => self.global.close_dialog(),
        }
        Ok(())
    }

    fn confirm(&mut self, action: ConfirmAction) -> Result<()> {
        match action {
            ConfirmAction::Logout => {
                self.core.logout()?;
                info!("Logged out");
                self.navigate(NavEvent::LoggedOut)
            }
            ConfirmAction::CancelRegistration => self.navigate(NavEvent::RegistrationCancelled),
        }
    }

    /// Apply a screen's result; screen errors are shown, not fatal.
    fn dispatch(&mut self, result: Result<ScreenAction>) -> Result<()> {
        match result {
            Ok(action) => self.apply(action),
            Err(e) => {
                error!("Screen error on {}: {:#}", self.screen.title(), e);
                self.global.show_message("Something went wrong", format!("{e:#}"));
                Ok(())
            }
        }
    }

    fn apply(&mut self, action: ScreenAction) -> Result<()> {
        match action {
            ScreenAction::None => {}
            ScreenAction::Navigate(event) => self.navigate(event)?,
            ScreenAction::Authenticated(session) => {
                let user_type = session.user_type();
                self.core.persist_session(session)?;
                info!("Signed in as {}", user_type.label());
                self.navigate(NavEvent::Authenticated { user_type })?;
            }
            ScreenAction::SessionStarted(session) => self.core.persist_session(session)?,
            ScreenAction::LocationResolved(location) => self.return_location(location)?,
            ScreenAction::ShowMessage { title, content } => {
                self.global.show_message(title, content);
            }
            ScreenAction::Confirm {
                title,
                content,
                action,
            } => self.global.show_confirm(title, content, action),
            ScreenAction::Notify(toast) => self.toasts.push(toast),
            ScreenAction::ShowHelp => self.global.toggle_help(),
            ScreenAction::Quit => self.should_quit = true,
        }
        Ok(())
    }

    fn navigate(&mut self, event: NavEvent) -> Result<()> {
        let from = self.screen.clone();
        let to = transition(from.clone(), event.clone());
        if to == from {
            debug!("{:?} does not apply on {}", event, from.title());
            return Ok(());
        }
        info!("{} -> {}", from.title(), to.title());

        if matches!(from, Screen::Intro { .. }) && !matches!(to, Screen::Intro { .. }) {
            if let Err(e) = self.core.session.mark_launched() {
                warn!("Could not record first launch: {:#}", e);
            }
        }
        self.screen = to;

        if matches!(self.screen, Screen::LocationSearch { .. }) {
            let picker: Box<dyn ScreenController> = Box::new(LocationSearchScreen::new());
            self.suspended = Some(std::mem::replace(&mut self.controller, picker));
            let entered = self.controller.on_enter(&self.core.context());
            return self.dispatch(entered);
        }
        if matches!(from, Screen::LocationSearch { .. }) {
            if let Some(resumed) = self.suspended.take() {
                self.controller = resumed;
                return Ok(());
            }
        }

        self.suspended = None;
        self.controller = controller_for(&self.screen, &self.core);
        let entered = self.controller.on_enter(&self.core.context());
        self.dispatch(entered)
    }

    fn return_location(&mut self, location: ResolvedLocation) -> Result<()> {
        self.navigate(NavEvent::LocationChosen)?;
        let resolved = self
            .controller
            .on_location_resolved(location, &self.core.context());
        self.dispatch(resolved)
    }
}
