//! Onboarding progress line: `1 Personal info › 2 Service details › ...`

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use crate::services::onboarding::Step;

pub struct StepIndicator {
    current: Step,
}

impl StepIndicator {
    pub fn new(current: Step) -> Self {
        Self { current }
    }

    fn line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for (i, step) in Step::ALL.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" › ", Style::default().fg(Color::DarkGray)));
            }
            let style = match step.cmp(&self.current) {
                std::cmp::Ordering::Less => Style::default().fg(Color::Green),
                std::cmp::Ordering::Equal => Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
                std::cmp::Ordering::Greater => Style::default().fg(Color::DarkGray),
            };
            spans.push(Span::styled(
                format!("{} {}", step.number(), step.title()),
                style,
            ));
        }
        Line::from(spans)
    }
}

impl Widget for StepIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.line()).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_every_step() {
        let text: String = StepIndicator::new(Step::Documents)
            .line()
            .spans
            .iter()
            .map(|s| s.content.to_string())
            .collect();
        assert!(text.starts_with("1 "));
        assert!(text.contains("5 "));
        assert_eq!(text.matches('›').count(), 4);
    }
}
