//! Provider registration wizard.
//!
//! The screen collects input into the [`OnboardingMachine`]'s draft and
//! renders one view per step; all validation, saving and upload decisions
//! are the machine's.

use anyhow::Result;
use crossterm::event::{Event, KeyCode};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use super::{is_ctrl, key_press, render_chrome, RenderContext, Screen, ScreenAction, ScreenContext};
use crate::api::models::LocalFile;
use crate::api::ApiClient;
use crate::config::Config;
use crate::services::onboarding::{
    AdvanceOutcome, BackOutcome, ReferralStatus, Step, UploadBatchReport, UploadKind,
    UploadResult, UploadState,
};
use crate::services::{OnboardingMachine, ResolvedLocation};
use crate::state::{ConfirmAction, NavEvent};
use crate::utils::form::validators;
use crate::utils::{
    error_style, hint_style, selected_item_style, success_style, unfocused_border_style, Form,
    FormField, SystemBrowser, Ticket,
};
use crate::widgets::{StepIndicator, Toast};

// Personal info fields
const FULL_NAME: usize = 0;
const BUSINESS_NAME: usize = 1;
const EMAIL: usize = 2;
const PHONE: usize = 3;
const ALT_PHONE: usize = 4;
const PASSWORD: usize = 5;
const CONFIRM_PASSWORD: usize = 6;
const REFERRAL: usize = 7;

// Service detail fields
const CATEGORY: usize = 0;
const SUBCATEGORIES: usize = 1;
const BIO: usize = 2;

type ReferralResult = (Ticket, Option<ReferralStatus>);

pub struct RegistrationScreen {
    machine: OnboardingMachine<ApiClient>,
    personal: Form,
    service: Form,
    /// Comma-separated local paths for the documents step.
    files: FormField,
    categories: Vec<String>,
    plan_state: ListState,
    referral_tx: mpsc::UnboundedSender<ReferralResult>,
    referral_rx: mpsc::UnboundedReceiver<ReferralResult>,
    upload_tx: mpsc::UnboundedSender<UploadResult>,
    upload_rx: mpsc::UnboundedReceiver<UploadResult>,
    /// Files finished since the last batch was reported.
    upload_report: UploadBatchReport,
}

impl RegistrationScreen {
    pub fn new(api: &ApiClient, config: &Config) -> Self {
        let machine = OnboardingMachine::new(
            Arc::new(api.clone()),
            Arc::new(SystemBrowser),
            &config.referral,
        );
        let mut personal = Form::new()
            .add_field(FormField::new("Full name"))
            .add_field(FormField::new("Business name"))
            .add_field(FormField::new("Email").with_validator(validators::email))
            .add_field(FormField::new("Phone").with_validator(validators::phone))
            .add_field(
                FormField::new("Alternative phone (optional)")
                    .with_validator(validators::phone),
            )
            .add_field(FormField::new("Password").masked())
            .add_field(FormField::new("Confirm password").masked())
            .add_field(FormField::new("Referral code (optional)"));
        personal.init_focus();

        let mut service = Form::new()
            .add_field(FormField::new("Service category").with_placeholder("^K to cycle"))
            .add_field(
                FormField::new("Subcategories").with_placeholder("comma separated, optional"),
            )
            .add_field(FormField::new("About your business"));
        service.init_focus();

        let mut files = FormField::new("File paths").with_placeholder("~/id.pdf, ~/cac.pdf");
        files.is_focused = true;

        let (referral_tx, referral_rx) = mpsc::unbounded_channel();
        let (upload_tx, upload_rx) = mpsc::unbounded_channel();
        Self {
            machine,
            personal,
            service,
            files,
            categories: Vec::new(),
            plan_state: ListState::default(),
            referral_tx,
            referral_rx,
            upload_tx,
            upload_rx,
            upload_report: UploadBatchReport::default(),
        }
    }

    fn sync_personal(&mut self) {
        let form = &self.personal;
        let personal = &mut self.machine.draft_mut().personal;
        personal.full_name = form.value(FULL_NAME).to_string();
        personal.business_name = form.value(BUSINESS_NAME).to_string();
        personal.email = form.value(EMAIL).to_string();
        personal.phone = form.value(PHONE).to_string();
        personal.alternative_phone = form.value(ALT_PHONE).to_string();
        personal.password = form.raw_value(PASSWORD).to_string();
        personal.confirm_password = form.raw_value(CONFIRM_PASSWORD).to_string();
    }

    fn sync_service(&mut self) {
        let form = &self.service;
        let service = &mut self.machine.draft_mut().service;
        service.category = form.value(CATEGORY).to_string();
        service.subcategories = split_list(form.value(SUBCATEGORIES));
        service.bio = form.value(BIO).to_string();
    }

    fn cycle_category(&mut self) {
        if self.categories.is_empty() {
            return;
        }
        let current = self.service.value(CATEGORY);
        let next = self
            .categories
            .iter()
            .position(|c| c.eq_ignore_ascii_case(current))
            .map_or(0, |i| (i + 1) % self.categories.len());
        if let Some(field) = self.service.field_mut(CATEGORY) {
            field.set_value(&self.categories[next]);
        }
    }

    fn referral_edited(&mut self, ctx: &ScreenContext) {
        let code = self.personal.value(REFERRAL).to_string();
        let ticket = self.machine.set_referral_code(code);
        let lookup = self.machine.referral_lookup(ticket);
        let tx = self.referral_tx.clone();
        ctx.runtime.spawn(async move {
            let _ = tx.send(lookup.await);
        });
    }

    /// Fetch what the new step needs. Failures leave the step usable.
    fn enter_step(&mut self, ctx: &ScreenContext) -> ScreenAction {
        match self.machine.step() {
            Step::ServiceDetails if self.categories.is_empty() => {
                match ctx.runtime.block_on(ctx.api.categories()) {
                    Ok(categories) => {
                        self.categories = categories.into_iter().map(|c| c.name).collect();
                    }
                    Err(e) => warn!("Could not load categories: {}", e),
                }
                ScreenAction::None
            }
            Step::Subscription => match ctx.runtime.block_on(self.machine.load_plans()) {
                Ok(plans) => {
                    if self.plan_state.selected().is_none() && !plans.is_empty() {
                        self.plan_state.select(Some(0));
                    }
                    ScreenAction::None
                }
                Err(e) => ScreenAction::message("Subscription plans", e.user_message()),
            },
            _ => ScreenAction::None,
        }
    }

    fn advance(&mut self, ctx: &ScreenContext) -> ScreenAction {
        match self.machine.step() {
            Step::PersonalInfo if self.machine.account_created() => {}
            Step::PersonalInfo => self.sync_personal(),
            Step::ServiceDetails => self.sync_service(),
            Step::Subscription => {
                let selected = self
                    .plan_state
                    .selected()
                    .and_then(|i| self.machine.plans().get(i))
                    .map(|p| p.id.clone());
                if let Some(plan_id) = selected {
                    if let Err(e) = self.machine.select_plan(&plan_id) {
                        return ScreenAction::message("Subscription", e.to_string());
                    }
                }
            }
            Step::Documents | Step::Payment => {}
        }

        match ctx.runtime.block_on(self.machine.advance()) {
            Ok(AdvanceOutcome::Advanced { session, to, .. }) => {
                self.lock_personal();
                let follow_up = self.enter_step(ctx);
                match (session, follow_up) {
                    (Some(session), _) => ScreenAction::SessionStarted(session),
                    (None, ScreenAction::None) => ScreenAction::Notify(Toast::info(format!(
                        "Step {} of {}: {}",
                        to.number(),
                        Step::ALL.len(),
                        to.title()
                    ))),
                    (None, action) => action,
                }
            }
            Ok(AdvanceOutcome::PaymentStarted {
                authorization_url, ..
            }) => ScreenAction::message(
                "Complete your payment",
                format!(
                    "The payment page has been opened in your browser. If it did not open, visit:\n\n{authorization_url}\n\nWhen you have paid, press ^P to confirm."
                ),
            ),
            Err(e) if e.is_validation() => ScreenAction::message("Check your details", e.user_message()),
            Err(e) => ScreenAction::message("Registration", e.user_message()),
        }
    }

    fn confirm_payment(&mut self, ctx: &ScreenContext) -> ScreenAction {
        match ctx.runtime.block_on(self.machine.confirm_payment()) {
            Ok(()) => ScreenAction::Navigate(NavEvent::RegistrationCompleted),
            Err(e) => ScreenAction::message("Payment", e.user_message()),
        }
    }

    /// Start uploading the listed files in the background. Results arrive
    /// through [`Self::apply_uploads`].
    fn upload(&mut self, kind: UploadKind, ctx: &ScreenContext) -> ScreenAction {
        let files: Vec<LocalFile> = split_list(&self.files.value)
            .iter()
            .map(|p| LocalFile::from_path(crate::utils::path::expand_path(p)))
            .collect();
        if files.is_empty() {
            return ScreenAction::message("Upload", "Enter one or more file paths first");
        }

        let uploads = self.machine.begin_uploads(kind, files);
        let count = uploads.len();
        for upload in uploads {
            let tx = self.upload_tx.clone();
            ctx.runtime.spawn(async move {
                let _ = tx.send(upload.await);
            });
        }
        self.files.clear();
        ScreenAction::Notify(Toast::info(format!(
            "Uploading {count} {}(s)",
            kind.label()
        )))
    }

    /// Apply finished uploads. Once nothing is left in flight the batch
    /// is reported: an alert naming failed files, or a toast.
    fn apply_uploads(&mut self) -> ScreenAction {
        while let Ok(result) = self.upload_rx.try_recv() {
            let failure = self.machine.finish_upload(result);
            self.upload_report.record(failure);
        }
        if self.upload_report.is_empty() || self.machine.draft().uploads.in_flight() > 0 {
            return ScreenAction::None;
        }

        let report = std::mem::take(&mut self.upload_report);
        match report.alert_message() {
            Some(message) => ScreenAction::message("Upload failed", message),
            None => ScreenAction::Notify(Toast::success(format!(
                "{} file(s) attached",
                report.attached
            ))),
        }
    }

    /// Personal details are sent once, when step 1 creates the account.
    /// Later edits would never reach the server, so the form is frozen.
    fn lock_personal(&mut self) {
        if self.machine.account_created() {
            self.personal.set_disabled(true);
        }
    }

    fn back(&mut self) -> ScreenAction {
        match self.machine.back() {
            BackOutcome::WentBack(_) => ScreenAction::None,
            BackOutcome::Cancelled => ScreenAction::Confirm {
                title: "Cancel registration".to_string(),
                content: "Leave registration? Details entered so far will be lost.".to_string(),
                action: ConfirmAction::CancelRegistration,
            },
        }
    }

    fn hints(&self) -> &'static str {
        match self.machine.step() {
            Step::PersonalInfo if self.machine.account_created() => {
                " Account created, details locked  Enter: continue  Esc: cancel"
            }
            Step::PersonalInfo => " Tab: next field  Enter: continue  Esc: cancel",
            Step::ServiceDetails => {
                " Tab: next field  ^K: next category  ^L: set location  Enter: continue  Esc: back"
            }
            Step::Documents => {
                " ^D: upload as documents  ^B: upload as brand images  ^X: clear failed  Enter: continue  Esc: back"
            }
            Step::Subscription => " ↑↓: choose plan  Enter: continue  Esc: back",
            Step::Payment => " Enter: pay  ^P: confirm payment  Esc: back",
        }
    }

    fn render_personal(&self, frame: &mut Frame, area: Rect) {
        let [fields, referral] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);
        self.personal.render(frame, fields);

        let line = match self.machine.referral_status() {
            ReferralStatus::Unchecked => Span::styled("", hint_style()),
            ReferralStatus::Valid(referrer) => Span::styled(
                format!("✔ Referred by {}", referrer.business_name),
                success_style(),
            ),
            ReferralStatus::Invalid => Span::styled("✘ Referral code not recognised", error_style()),
        };
        frame.render_widget(Paragraph::new(Line::from(line)), referral);
    }

    fn render_service(&self, frame: &mut Frame, area: Rect) {
        let [fields, info] =
            Layout::vertical([Constraint::Length(9), Constraint::Min(0)]).areas(area);
        self.service.render(frame, fields);

        let service = &self.machine.draft().service;
        let location = if service.location_city.is_empty() {
            "Location: not set (^L)".to_string()
        } else {
            format!("Location: {}, {}", service.location_city, service.location_state)
        };
        let mut lines = vec![Line::from(location)];
        if !self.categories.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("Categories: {}", self.categories.join(", ")),
                hint_style(),
            )));
        }
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), info);
    }

    fn render_documents(&self, frame: &mut Frame, area: Rect) {
        let [input, list_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);
        self.files.render(frame, input);

        let items: Vec<ListItem> = self
            .machine
            .draft()
            .uploads
            .iter()
            .map(|(_, upload)| {
                let (status, style) = match &upload.state {
                    UploadState::Pending => ("queued".to_string(), hint_style()),
                    UploadState::Uploading => ("uploading...".to_string(), hint_style()),
                    UploadState::Done { .. } => ("uploaded".to_string(), success_style()),
                    UploadState::Failed { reason } => (format!("failed: {reason}"), error_style()),
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("  [{}] {} ", upload.kind.label(), upload.file.name)),
                    Span::styled(status, style),
                ]))
            })
            .collect();
        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(unfocused_border_style())
                .title(" Files (at least one document and one brand image) "),
        );
        frame.render_widget(list, list_area);
    }

    fn render_plans(&mut self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .machine
            .plans()
            .iter()
            .map(|plan| {
                let mut lines = vec![Line::from(format!("  {}", plan.summary()))];
                lines.extend(
                    plan.benefits
                        .iter()
                        .map(|b| Line::from(Span::styled(format!("    • {b}"), hint_style()))),
                );
                ListItem::new(lines)
            })
            .collect();
        let empty = items.is_empty();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(if empty {
                        " No plans loaded "
                    } else {
                        " Choose a plan "
                    }),
            )
            .highlight_style(selected_item_style());
        frame.render_stateful_widget(list, area, &mut self.plan_state);
    }

    fn render_payment(&self, frame: &mut Frame, area: Rect) {
        let draft = self.machine.draft();
        let plan = draft
            .subscription_plan_id
            .as_deref()
            .and_then(|id| self.machine.plans().iter().find(|p| p.id == id))
            .map_or_else(|| "none".to_string(), |p| p.summary());
        let mut lines = vec![
            Line::from(format!("Business: {}", draft.personal.business_name)),
            Line::from(format!("Contact: {} <{}>", draft.personal.full_name, draft.personal.email)),
            Line::from(format!("Category: {}", draft.service.category)),
            Line::from(format!("Plan: {plan}")),
            Line::from(""),
        ];
        lines.push(match &draft.payment_reference {
            Some(reference) => Line::from(Span::styled(
                format!("Payment started (reference {reference}). Press ^P once you have paid."),
                Style::default(),
            )),
            None => Line::from(Span::styled("Press Enter to open the payment page.", hint_style())),
        });
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
    }
}

impl Screen for RegistrationScreen {
    fn render(&mut self, frame: &mut Frame, area: Rect, _ctx: &RenderContext) -> Result<()> {
        let content = render_chrome(frame, area, "Become a provider", self.hints());
        let [steps, body] =
            Layout::vertical([Constraint::Length(2), Constraint::Min(0)]).areas(content);
        frame.render_widget(StepIndicator::new(self.machine.step()), steps);

        match self.machine.step() {
            Step::PersonalInfo => self.render_personal(frame, body),
            Step::ServiceDetails => self.render_service(frame, body),
            Step::Documents => self.render_documents(frame, body),
            Step::Subscription => self.render_plans(frame, body),
            Step::Payment => self.render_payment(frame, body),
        }
        Ok(())
    }

    fn handle_event(&mut self, event: Event, ctx: &ScreenContext) -> Result<ScreenAction> {
        let Some(key) = key_press(&event) else {
            return Ok(ScreenAction::None);
        };
        let step = self.machine.step();

        if is_ctrl(&key) {
            let action = match (step, key.code) {
                (Step::ServiceDetails, KeyCode::Char('k')) => {
                    self.cycle_category();
                    ScreenAction::None
                }
                (Step::ServiceDetails, KeyCode::Char('l')) => {
                    self.sync_service();
                    ScreenAction::Navigate(NavEvent::OpenLocationSearch)
                }
                (Step::Documents, KeyCode::Char('d')) => self.upload(UploadKind::Document, ctx),
                (Step::Documents, KeyCode::Char('b')) => self.upload(UploadKind::BrandImage, ctx),
                (Step::Documents, KeyCode::Char('x')) => {
                    self.machine.draft_mut().uploads.clear_failed();
                    ScreenAction::None
                }
                (Step::Payment, KeyCode::Char('p')) => self.confirm_payment(ctx),
                _ => ScreenAction::None,
            };
            return Ok(action);
        }

        match key.code {
            KeyCode::Esc => return Ok(self.back()),
            KeyCode::Enter => return Ok(self.advance(ctx)),
            code => match step {
                Step::PersonalInfo => {
                    let before = self.personal.value(REFERRAL).to_string();
                    self.personal.handle_key(code);
                    if self.personal.value(REFERRAL) != before {
                        self.referral_edited(ctx);
                    }
                }
                Step::ServiceDetails => {
                    self.service.handle_key(code);
                }
                Step::Documents => {
                    self.files.handle_key(code);
                }
                Step::Subscription => match code {
                    KeyCode::Up => self.plan_state.select_previous(),
                    KeyCode::Down => self.plan_state.select_next(),
                    _ => {}
                },
                Step::Payment => {}
            },
        }
        Ok(ScreenAction::None)
    }

    fn tick(&mut self, _ctx: &ScreenContext) -> Result<ScreenAction> {
        while let Ok((ticket, status)) = self.referral_rx.try_recv() {
            self.machine.apply_referral(ticket, status);
        }
        Ok(self.apply_uploads())
    }

    fn on_location_resolved(
        &mut self,
        location: ResolvedLocation,
        _ctx: &ScreenContext,
    ) -> Result<ScreenAction> {
        self.machine.draft_mut().service.apply_location(&location);
        Ok(ScreenAction::Notify(Toast::success(format!(
            "Location set to {}",
            location.label()
        ))))
    }

    fn is_input_focused(&self) -> bool {
        matches!(
            self.machine.step(),
            Step::PersonalInfo | Step::ServiceDetails | Step::Documents
        )
    }
}

/// Split a comma-separated list, dropping blanks.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
