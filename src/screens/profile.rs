//! Provider business profile: view, edit and save.

use anyhow::Result;
use crossterm::event::{Event, KeyCode};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use super::{is_ctrl, key_press, render_chrome, RenderContext, Screen, ScreenAction, ScreenContext};
use crate::api::models::{LocalFile, VerificationStatus};
use crate::api::ApiClient;
use crate::services::{ProfileEditor, ProfileError, ResolvedLocation, SaveOutcome, MAX_PORTFOLIO};
use crate::state::NavEvent;
use crate::utils::path::expand_path;
use crate::utils::{
    error_style, focused_border_style, hint_style, selected_item_style, success_style,
    unfocused_border_style, Form, FormField,
};
use crate::widgets::Toast;

const BUSINESS_NAME: usize = 0;
const BIO: usize = 1;
const CATEGORY: usize = 2;
const SUBCATEGORY: usize = 3;
const IMAGE_PATH: usize = 4;

/// Fields bound to the profile itself; read-only outside edit mode.
const PROFILE_FIELDS: [usize; 3] = [BUSINESS_NAME, BIO, CATEGORY];

pub struct ProfileScreen {
    editor: ProfileEditor<ApiClient>,
    form: Form,
    popular_state: ListState,
    portfolio_state: ListState,
}

impl ProfileScreen {
    pub fn new(api: &ApiClient) -> Self {
        let mut form = Form::new()
            .add_field(FormField::new("Business name"))
            .add_field(FormField::new("About"))
            .add_field(FormField::new("Category").with_placeholder("^K to apply"))
            .add_field(FormField::new("Subcategory").with_placeholder("^A add  ^R remove"))
            .add_field(FormField::new("Portfolio image path").with_placeholder("^U to upload"));
        form.init_focus();

        let mut screen = Self {
            editor: ProfileEditor::new(api.clone()),
            form,
            popular_state: ListState::default(),
            portfolio_state: ListState::default(),
        };
        screen.refresh_fields();
        screen
    }

    /// Copy the working profile into the form and lock or unlock fields.
    fn refresh_fields(&mut self) {
        let profile = self.editor.profile();
        let editing = self.editor.is_editing();
        for index in PROFILE_FIELDS {
            let value = match index {
                BUSINESS_NAME => &profile.business_name,
                BIO => &profile.bio,
                _ => &profile.category,
            };
            if let Some(field) = self.form.field_mut(index) {
                if field.value != *value {
                    field.set_value(value);
                }
                field.is_disabled = !editing;
            }
        }
    }

    fn error(title: &str, err: &ProfileError) -> ScreenAction {
        ScreenAction::message(title, err.user_message())
    }

    fn take_field(&mut self, index: usize) -> String {
        let value = self.form.value(index).to_string();
        if let Some(field) = self.form.field_mut(index) {
            field.clear();
        }
        value
    }

    fn toggle_edit(&mut self) -> ScreenAction {
        if self.editor.is_editing() {
            return ScreenAction::None;
        }
        match self.editor.start_edit() {
            Ok(()) => {
                self.refresh_fields();
                ScreenAction::Notify(Toast::info("Editing profile"))
            }
            Err(e) => Self::error("Edit profile", &e),
        }
    }

    fn save(&mut self, ctx: &ScreenContext) -> ScreenAction {
        let result = ctx.runtime.block_on(self.editor.save());
        self.refresh_fields();
        match result {
            Ok(SaveOutcome::Saved) => ScreenAction::Notify(Toast::success("Profile saved")),
            Ok(SaveOutcome::NoChanges) => ScreenAction::Notify(Toast::info("No changes to save")),
            Err(e) => Self::error("Save failed", &e),
        }
    }

    fn apply_category(&mut self, ctx: &ScreenContext) -> ScreenAction {
        let category = self.form.value(CATEGORY).to_string();
        let result = ctx
            .runtime
            .block_on(self.editor.select_category(&category))
            .map(<[String]>::len);
        self.refresh_fields();
        match result {
            Ok(count) => {
                self.popular_state.select((count > 0).then_some(0));
                ScreenAction::None
            }
            Err(e) => Self::error("Category", &e),
        }
    }

    fn toggle_popular(&mut self) -> ScreenAction {
        let Some(name) = self
            .popular_state
            .selected()
            .and_then(|i| self.editor.popular_subcategories().get(i))
            .cloned()
        else {
            return ScreenAction::None;
        };
        let result = self.editor.toggle_subcategory(&name);
        self.refresh_fields();
        match result {
            Ok(_) => ScreenAction::None,
            Err(e) => Self::error("Subcategories", &e),
        }
    }

    fn add_subcategory(&mut self) -> ScreenAction {
        let name = self.take_field(SUBCATEGORY);
        let result = self.editor.add_subcategory(&name);
        self.refresh_fields();
        match result {
            Ok(()) => ScreenAction::None,
            Err(e) => Self::error("Subcategories", &e),
        }
    }

    fn remove_subcategory(&mut self) -> ScreenAction {
        let name = self.take_field(SUBCATEGORY);
        let result = self.editor.remove_subcategory(&name);
        self.refresh_fields();
        match result {
            Ok(true) => ScreenAction::None,
            Ok(false) => ScreenAction::message("Subcategories", format!("\"{name}\" is not listed")),
            Err(e) => Self::error("Subcategories", &e),
        }
    }

    fn upload_image(&mut self, ctx: &ScreenContext) -> ScreenAction {
        let path = self.form.value(IMAGE_PATH).to_string();
        if path.is_empty() {
            return ScreenAction::message("Portfolio", "Enter the path of an image first");
        }
        let file = LocalFile::from_path(expand_path(&path));
        let result = ctx.runtime.block_on(self.editor.add_portfolio_image(&file));
        self.refresh_fields();
        match result {
            Ok(()) => {
                self.take_field(IMAGE_PATH);
                ScreenAction::Notify(Toast::success(format!("Added {}", file.name)))
            }
            Err(e) => Self::error("Portfolio", &e),
        }
    }

    fn remove_image(&mut self) -> ScreenAction {
        let Some(index) = self.portfolio_state.selected() else {
            return ScreenAction::None;
        };
        let result = self.editor.remove_portfolio_image(index);
        self.refresh_fields();
        match result {
            Ok(_) => ScreenAction::None,
            Err(e) => Self::error("Portfolio", &e),
        }
    }

    /// Push edits of the bound fields into the editor.
    fn push_field_edit(&mut self, index: usize) -> Option<ScreenAction> {
        let value = self.form.raw_value(index).to_string();
        let result = match index {
            BUSINESS_NAME => self.editor.set_business_name(&value),
            BIO => self.editor.set_bio(&value),
            _ => return None,
        };
        result.err().map(|e| Self::error("Edit profile", &e))
    }

    fn render_details(&mut self, frame: &mut Frame, area: Rect) {
        let [summary, popular_area, portfolio_area] = Layout::vertical([
            Constraint::Length(5),
            Constraint::Percentage(40),
            Constraint::Min(0),
        ])
        .areas(area);

        let profile = self.editor.profile();
        let status_style = match profile.verification_status {
            VerificationStatus::Verified => success_style(),
            VerificationStatus::Rejected => error_style(),
            VerificationStatus::Pending => hint_style(),
        };
        let location = if profile.location_city.is_empty() {
            "not set".to_string()
        } else {
            format!("{}, {}", profile.location_city, profile.location_state)
        };
        let mut lines = vec![
            Line::from(vec![
                Span::raw("Status: "),
                Span::styled(profile.verification_status.label(), status_style),
                Span::styled(
                    if self.editor.has_changes() { "  (unsaved changes)" } else { "" },
                    hint_style(),
                ),
            ]),
            Line::from(format!("Location: {location}")),
        ];
        lines.push(Line::from(format!(
            "Subcategories: {}",
            if profile.subcategories.is_empty() {
                "none".to_string()
            } else {
                profile.subcategories.join(", ")
            }
        )));
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), summary);

        let selected = &profile.subcategories;
        let popular: Vec<ListItem> = self
            .editor
            .popular_subcategories()
            .iter()
            .map(|name| {
                let mark = if selected.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                    "[x]"
                } else {
                    "[ ]"
                };
                ListItem::new(format!(" {mark} {name}"))
            })
            .collect();
        frame.render_stateful_widget(
            List::new(popular)
                .block(titled_block(" Popular subcategories (^N/^P move, ^T toggle) "))
                .highlight_style(selected_item_style()),
            popular_area,
            &mut self.popular_state,
        );

        let portfolio: Vec<ListItem> = profile
            .portfolio
            .iter()
            .map(|url| ListItem::new(format!(" {url}")))
            .collect();
        let title = format!(
            " Portfolio {}/{} (PgUp/PgDn move, ^D remove) ",
            profile.portfolio.len(),
            MAX_PORTFOLIO
        );
        frame.render_stateful_widget(
            List::new(portfolio)
                .block(titled_block(&title))
                .highlight_style(selected_item_style()),
            portfolio_area,
            &mut self.portfolio_state,
        );
    }
}

fn titled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(unfocused_border_style())
        .title(title)
}

impl Screen for ProfileScreen {
    fn render(&mut self, frame: &mut Frame, area: Rect, _ctx: &RenderContext) -> Result<()> {
        let hints = if self.editor.is_editing() {
            " ^S: save  ^L: location  ^K: apply category  Esc: discard changes"
        } else {
            " ^E: edit  ^A/^R: subcategory  ^U: upload image  Esc: back"
        };
        let content = render_chrome(frame, area, "Business profile", hints);

        if !self.editor.is_loaded() {
            frame.render_widget(
                Paragraph::new("Profile not loaded. Press ^F to retry.").style(hint_style()),
                content,
            );
            return Ok(());
        }

        let [left, right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(content);
        let form_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.editor.is_editing() {
                focused_border_style()
            } else {
                unfocused_border_style()
            })
            .title(if self.editor.is_editing() { " Editing " } else { " Details " });
        let inner = form_block.inner(left);
        frame.render_widget(form_block, left);
        self.form.render(frame, inner);
        self.render_details(frame, right);
        Ok(())
    }

    fn handle_event(&mut self, event: Event, ctx: &ScreenContext) -> Result<ScreenAction> {
        let Some(key) = key_press(&event) else {
            return Ok(ScreenAction::None);
        };

        if is_ctrl(&key) {
            let action = match key.code {
                KeyCode::Char('f') => return self.on_enter(ctx),
                KeyCode::Char('e') => self.toggle_edit(),
                KeyCode::Char('s') => self.save(ctx),
                KeyCode::Char('k') => self.apply_category(ctx),
                KeyCode::Char('n') => {
                    self.popular_state.select_next();
                    ScreenAction::None
                }
                KeyCode::Char('p') => {
                    self.popular_state.select_previous();
                    ScreenAction::None
                }
                KeyCode::Char('t') => self.toggle_popular(),
                KeyCode::Char('a') => self.add_subcategory(),
                KeyCode::Char('r') => self.remove_subcategory(),
                KeyCode::Char('u') => self.upload_image(ctx),
                KeyCode::Char('d') => self.remove_image(),
                KeyCode::Char('l') if self.editor.is_editing() => {
                    ScreenAction::Navigate(NavEvent::OpenLocationSearch)
                }
                KeyCode::Char('l') => {
                    ScreenAction::message("Edit profile", ProfileError::ReadOnly.user_message())
                }
                _ => ScreenAction::None,
            };
            return Ok(action);
        }

        match key.code {
            KeyCode::Esc if self.editor.is_editing() => {
                self.editor.cancel_edit();
                self.refresh_fields();
                Ok(ScreenAction::Notify(Toast::info("Changes discarded")))
            }
            KeyCode::Esc => Ok(ScreenAction::Navigate(NavEvent::Back)),
            KeyCode::PageDown => {
                self.portfolio_state.select_next();
                Ok(ScreenAction::None)
            }
            KeyCode::PageUp => {
                self.portfolio_state.select_previous();
                Ok(ScreenAction::None)
            }
            code => {
                let index = self.form.focused_index;
                let before = self.form.raw_value(index).to_string();
                self.form.handle_key(code);
                if self.form.raw_value(index) != before {
                    if let Some(action) = self.push_field_edit(index) {
                        return Ok(action);
                    }
                }
                Ok(ScreenAction::None)
            }
        }
    }

    fn on_enter(&mut self, ctx: &ScreenContext) -> Result<ScreenAction> {
        let result = ctx.runtime.block_on(self.editor.load()).map(|_| ());
        self.refresh_fields();
        Ok(match result {
            Ok(()) => ScreenAction::None,
            Err(e) => Self::error("Could not load profile", &e),
        })
    }

    fn on_location_resolved(
        &mut self,
        location: ResolvedLocation,
        _ctx: &ScreenContext,
    ) -> Result<ScreenAction> {
        Ok(match self.editor.set_location(&location) {
            Ok(()) => ScreenAction::Notify(Toast::success(format!(
                "Location set to {}",
                location.label()
            ))),
            Err(e) => Self::error("Location", &e),
        })
    }

    fn is_input_focused(&self) -> bool {
        true
    }
}
