//! Dialog widget for alerts, confirmations and errors.
//!
//! Centers itself in the given area, dims the background and stacks a
//! title block, a wrapped content block and an optional footer with
//! collapsed borders.

use ratatui::layout::Spacing;
use ratatui::prelude::*;
use ratatui::symbols::merge::MergeStrategy;
use ratatui::widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph, Widget, Wrap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DialogVariant {
    #[default]
    Default,
    Warning,
    Error,
}

impl DialogVariant {
    fn prefix(self) -> &'static str {
        match self {
            DialogVariant::Default => "",
            DialogVariant::Warning => "Warning",
            DialogVariant::Error => "Error",
        }
    }

    fn border_color(self) -> Color {
        match self {
            DialogVariant::Default => Color::Cyan,
            DialogVariant::Warning => Color::Yellow,
            DialogVariant::Error => Color::Red,
        }
    }
}

pub struct Dialog<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub min_width: u16,
    pub max_width: u16,
    /// Height as a percentage of the area.
    pub height_percent: u16,
    pub variant: DialogVariant,
    pub footer: Option<&'a str>,
}

impl<'a> Dialog<'a> {
    pub fn new(title: &'a str, content: &'a str) -> Self {
        Self {
            title,
            content,
            min_width: 50,
            max_width: 80,
            height_percent: 40,
            variant: DialogVariant::Default,
            footer: None,
        }
    }

    pub fn height(mut self, percent: u16) -> Self {
        self.height_percent = percent;
        self
    }

    pub fn variant(mut self, variant: DialogVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn footer(mut self, footer: &'a str) -> Self {
        self.footer = Some(footer);
        self
    }

    fn title_text(&self) -> String {
        match self.variant.prefix() {
            "" => self.title.to_string(),
            prefix => format!("{prefix}: {}", self.title),
        }
    }

    fn modal_width(&self, title: &str, area: Rect) -> u16 {
        let longest_line = self
            .content
            .lines()
            .map(|l| l.chars().count())
            .chain([title.chars().count(), self.footer.map_or(0, |f| f.chars().count())])
            .max()
            .unwrap_or(0);
        let suggested = u16::try_from(longest_line).unwrap_or(u16::MAX).saturating_add(8);
        let max = self.max_width.min(area.width.saturating_sub(4));
        suggested.clamp(self.min_width.min(max), max)
    }

    fn block(&self) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.variant.border_color()))
            .padding(Padding::horizontal(2))
            .merge_borders(MergeStrategy::Exact)
    }
}

impl Widget for Dialog<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title_text = self.title_text();
        let modal_width = self.modal_width(&title_text, area);

        let has_footer = self.footer.is_some();
        let title_height = 3u16;
        let footer_height = 3u16;
        let min_content_height = 5u16;
        let min_total_height = if has_footer {
            title_height + min_content_height + footer_height - 2
        } else {
            title_height + min_content_height - 1
        };

        let modal_height = area.height * self.height_percent / 100;
        let modal_height = modal_height
            .max(min_total_height)
            .min(area.height.saturating_sub(2));

        let popup_area = Rect::new(
            area.x + area.width.saturating_sub(modal_width) / 2,
            area.y + area.height.saturating_sub(modal_height) / 2,
            modal_width,
            modal_height,
        );

        Block::default()
            .style(Style::default().fg(Color::DarkGray))
            .render(area, buf);
        Clear.render(popup_area, buf);

        let mut constraints = vec![
            Constraint::Length(title_height),
            Constraint::Min(min_content_height),
        ];
        if has_footer {
            constraints.push(Constraint::Length(footer_height));
        }
        let layout = Layout::vertical(constraints)
            .spacing(Spacing::Overlap(1))
            .split(popup_area);

        let title_block = self.block();
        let title_inner = title_block.inner(layout[0]);
        title_block.render(layout[0], buf);
        Paragraph::new(title_text)
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .render(title_inner, buf);

        let content_block = self.block();
        let content_inner = content_block.inner(layout[1]);
        content_block.render(layout[1], buf);
        Paragraph::new(self.content)
            .wrap(Wrap { trim: false })
            .render(content_inner, buf);

        if let Some(footer) = self.footer {
            let footer_block = self.block();
            let footer_inner = footer_block.inner(layout[2]);
            footer_block.render(layout[2], buf);
            Paragraph::new(footer)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray))
                .render(footer_inner, buf);
        }
    }
}
