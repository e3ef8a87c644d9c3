//! Sign in, sign up and password reset.

use anyhow::Result;
use crossterm::event::{Event, KeyCode};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tracing::debug;

use super::{is_ctrl, key_press, render_chrome, RenderContext, Screen, ScreenAction, ScreenContext};
use crate::api::models::UserType;
use crate::services::{AuthController, SignupForm};
use crate::state::{AuthMode, NavEvent};
use crate::utils::form::validators;
use crate::utils::{center_popup, hint_style, Form, FormField};

// Field indices per mode.
const LOGIN_EMAIL: usize = 0;
const LOGIN_PASSWORD: usize = 1;
const SIGNUP_NAME: usize = 0;
const SIGNUP_EMAIL: usize = 1;
const SIGNUP_PHONE: usize = 2;
const SIGNUP_PASSWORD: usize = 3;
const SIGNUP_CONFIRM: usize = 4;
const RESET_EMAIL: usize = 0;
const GOOGLE_TOKEN: usize = 0;

pub struct AuthScreen {
    mode: AuthMode,
    user_type: UserType,
    form: Form,
    /// Showing the single Google ID token field instead of the mode's form.
    google: bool,
}

impl AuthScreen {
    pub fn new(mode: AuthMode, user_type: UserType) -> Self {
        let mut form = Self::form_for(mode);
        form.init_focus();
        Self {
            mode,
            user_type,
            form,
            google: false,
        }
    }

    fn form_for(mode: AuthMode) -> Form {
        let email = FormField::new("Email")
            .with_placeholder("you@example.com")
            .with_validator(validators::email);
        match mode {
            AuthMode::Login => Form::new()
                .add_field(email)
                .add_field(FormField::new("Password").masked()),
            AuthMode::Signup => Form::new()
                .add_field(FormField::new("Full name"))
                .add_field(email)
                .add_field(
                    FormField::new("Phone")
                        .with_placeholder("08012345678")
                        .with_validator(validators::phone),
                )
                .add_field(FormField::new("Password").masked())
                .add_field(FormField::new("Confirm password").masked()),
            AuthMode::ForgotPassword => Form::new().add_field(email),
        }
    }

    fn start_google(&mut self) {
        self.google = true;
        self.form = Form::new().add_field(
            FormField::new("Google ID token").with_placeholder("paste the token from Google"),
        );
        self.form.init_focus();
    }

    fn hints(&self) -> String {
        if self.google {
            return " Enter: sign in with Google  Esc: back".to_string();
        }
        let mut hints = String::from(" Tab: next field  Enter: submit  Esc: back");
        match self.mode {
            AuthMode::Login => {
                hints.push_str("  ^N: create account  ^F: forgot password  ^G: Google");
                if self.user_type == UserType::Provider {
                    hints.push_str("  ^R: register business");
                }
            }
            AuthMode::Signup => hints.push_str("  ^G: Google"),
            AuthMode::ForgotPassword => {}
        }
        hints
    }

    fn submit(&mut self, ctx: &ScreenContext) -> ScreenAction {
        let controller = AuthController::new(
            ctx.api.clone(),
            ctx.config.google_client_id().map(str::to_string),
        );

        if self.google {
            let token = self.form.value(GOOGLE_TOKEN).to_string();
            return match ctx
                .runtime
                .block_on(controller.google_sign_in(self.user_type, &token))
            {
                Ok(session) => ScreenAction::Authenticated(session),
                Err(e) => ScreenAction::message("Google sign-in failed", e.user_message()),
            };
        }

        match self.mode {
            AuthMode::Login => {
                let email = self.form.value(LOGIN_EMAIL).to_string();
                let password = self.form.raw_value(LOGIN_PASSWORD).to_string();
                match ctx
                    .runtime
                    .block_on(controller.login(self.user_type, &email, &password))
                {
                    Ok(session) => ScreenAction::Authenticated(session),
                    Err(e) => {
                        debug!("Login rejected: {}", e);
                        ScreenAction::message("Sign in failed", e.user_message())
                    }
                }
            }
            AuthMode::Signup => {
                let form = SignupForm {
                    full_name: self.form.value(SIGNUP_NAME).to_string(),
                    email: self.form.value(SIGNUP_EMAIL).to_string(),
                    phone: self.form.value(SIGNUP_PHONE).to_string(),
                    password: self.form.raw_value(SIGNUP_PASSWORD).to_string(),
                    confirm_password: self.form.raw_value(SIGNUP_CONFIRM).to_string(),
                };
                match ctx.runtime.block_on(controller.signup(self.user_type, &form)) {
                    Ok(session) => ScreenAction::Authenticated(session),
                    Err(e) => ScreenAction::message("Sign up failed", e.user_message()),
                }
            }
            AuthMode::ForgotPassword => {
                let email = self.form.value(RESET_EMAIL).to_string();
                match ctx.runtime.block_on(controller.forgot_password(&email)) {
                    Ok(message) => ScreenAction::message("Check your email", message),
                    Err(e) => ScreenAction::message("Reset failed", e.user_message()),
                }
            }
        }
    }
}

impl Screen for AuthScreen {
    fn render(&mut self, frame: &mut Frame, area: Rect, _ctx: &RenderContext) -> Result<()> {
        let title = format!("{} ({})", self.mode.title(), self.user_type.label());
        let content = render_chrome(frame, area, &title, &self.hints());

        let height = u16::try_from(self.form.fields.len() * 3 + 2).unwrap_or(u16::MAX);
        let popup = center_popup(content, 60, 90);
        let [intro, fields] =
            Layout::vertical([Constraint::Length(2), Constraint::Max(height)]).areas(popup);

        let intro_text = if self.google {
            "Sign in with the ID token issued by Google."
        } else {
            match self.mode {
                AuthMode::Login => "Welcome back.",
                AuthMode::Signup => "Create your account.",
                AuthMode::ForgotPassword => "We will email you a reset link.",
            }
        };
        frame.render_widget(Paragraph::new(Line::from(intro_text)).style(hint_style()), intro);
        self.form.render(frame, fields);
        Ok(())
    }

    fn handle_event(&mut self, event: Event, ctx: &ScreenContext) -> Result<ScreenAction> {
        let Some(key) = key_press(&event) else {
            return Ok(ScreenAction::None);
        };

        if is_ctrl(&key) {
            let action = match (key.code, self.mode) {
                (KeyCode::Char('n'), AuthMode::Login) => {
                    ScreenAction::Navigate(NavEvent::SwitchAuthMode(AuthMode::Signup))
                }
                (KeyCode::Char('f'), AuthMode::Login) => {
                    ScreenAction::Navigate(NavEvent::SwitchAuthMode(AuthMode::ForgotPassword))
                }
                (KeyCode::Char('r'), AuthMode::Login) if self.user_type == UserType::Provider => {
                    ScreenAction::Navigate(NavEvent::StartProviderRegistration)
                }
                (KeyCode::Char('g'), AuthMode::Login | AuthMode::Signup) => {
                    if ctx.config.google_client_id().is_none() {
                        ScreenAction::message(
                            "Google sign-in",
                            "Google sign-in is not configured for this platform",
                        )
                    } else {
                        self.start_google();
                        ScreenAction::None
                    }
                }
                _ => ScreenAction::None,
            };
            return Ok(action);
        }

        match key.code {
            KeyCode::Esc if self.google => {
                let mut form = Self::form_for(self.mode);
                form.init_focus();
                self.form = form;
                self.google = false;
                Ok(ScreenAction::None)
            }
            KeyCode::Esc => Ok(ScreenAction::Navigate(NavEvent::Back)),
            KeyCode::Enter => Ok(self.submit(ctx)),
            code => {
                self.form.handle_key(code);
                Ok(ScreenAction::None)
            }
        }
    }

    fn is_input_focused(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_shape_per_mode() {
        assert_eq!(AuthScreen::new(AuthMode::Login, UserType::Customer).form.fields.len(), 2);
        assert_eq!(AuthScreen::new(AuthMode::Signup, UserType::Customer).form.fields.len(), 5);
        assert_eq!(
            AuthScreen::new(AuthMode::ForgotPassword, UserType::Provider).form.fields.len(),
            1
        );
    }

    #[test]
    fn test_password_fields_are_masked() {
        let screen = AuthScreen::new(AuthMode::Signup, UserType::Customer);
        assert!(screen.form.fields[SIGNUP_PASSWORD].is_masked);
        assert!(screen.form.fields[SIGNUP_CONFIRM].is_masked);
        assert!(!screen.form.fields[SIGNUP_EMAIL].is_masked);
    }

    #[test]
    fn test_registration_hint_only_for_providers() {
        let provider = AuthScreen::new(AuthMode::Login, UserType::Provider);
        let customer = AuthScreen::new(AuthMode::Login, UserType::Customer);
        assert!(provider.hints().contains("register business"));
        assert!(!customer.hints().contains("register business"));
    }
}
