use ratatui::style::{Color, Modifier, Style};

/// Card colours cycle per channel, in directory order.
pub const CARD_COLORS: &[Color] = &[
    Color::LightBlue,
    Color::LightGreen,
    Color::LightMagenta,
    Color::LightYellow,
    Color::LightCyan,
    Color::LightRed,
    Color::White,
];

pub fn card_color(index: usize) -> Color {
    CARD_COLORS[index % CARD_COLORS.len()]
}

pub fn channel_name(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

pub fn song_text(color: Color) -> Style {
    Style::default().fg(color)
}

pub fn label() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

pub fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn error() -> Style {
    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
}
