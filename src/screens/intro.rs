//! First-run slides.

use anyhow::Result;
use crossterm::event::{Event, KeyCode};
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

use super::{key_press, render_chrome, RenderContext, Screen, ScreenAction, ScreenContext};
use crate::state::{NavEvent, INTRO_SLIDES};
use crate::utils::center_popup;

const SLIDES: [(&str, &str); INTRO_SLIDES] = [
    (
        "Find trusted help nearby",
        "Cleaners, plumbers, stylists and more, verified and close to you.",
    ),
    (
        "Book in a few steps",
        "Pick a service, choose a provider and agree on a time.",
    ),
    (
        "Grow your business",
        "Providers list their services, show their work and get discovered.",
    ),
];

pub struct IntroScreen {
    slide: usize,
}

impl IntroScreen {
    pub fn new(slide: usize) -> Self {
        Self {
            slide: slide.min(INTRO_SLIDES - 1),
        }
    }
}

impl Screen for IntroScreen {
    fn render(&mut self, frame: &mut Frame, area: Rect, _ctx: &RenderContext) -> Result<()> {
        let content = render_chrome(
            frame,
            area,
            "Welcome",
            " Enter/→: next  ←: previous  s: skip  q: quit",
        );

        let (title, body) = SLIDES[self.slide];
        let dots: Vec<Span> = (0..INTRO_SLIDES)
            .map(|i| {
                if i == self.slide {
                    Span::styled("● ", Style::default().fg(Color::Cyan))
                } else {
                    Span::styled("○ ", Style::default().fg(Color::DarkGray))
                }
            })
            .collect();

        let lines = vec![
            Line::from(Span::styled(
                title,
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(body),
            Line::from(""),
            Line::from(dots),
        ];
        frame.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            center_popup(content, 70, 50),
        );
        Ok(())
    }

    fn handle_event(&mut self, event: Event, _ctx: &ScreenContext) -> Result<ScreenAction> {
        let Some(key) = key_press(&event) else {
            return Ok(ScreenAction::None);
        };
        Ok(match key.code {
            KeyCode::Enter | KeyCode::Right | KeyCode::Char(' ') => {
                ScreenAction::Navigate(NavEvent::NextSlide)
            }
            KeyCode::Left => ScreenAction::Navigate(NavEvent::Back),
            KeyCode::Char('s') => ScreenAction::Navigate(NavEvent::SkipIntro),
            _ => ScreenAction::None,
        })
    }
}
