//! Cat Tapper terminal HUD: score, level progress, the cat, rates and energy.

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratzilla::ratatui::Frame;

use crate::input::{is_narrow_layout, ClickState};

use super::actions::TAP;
use super::levels::CatSkin;
use super::view::{HudStatus, HudView};

/// Cat art, 4 lines, 9 chars wide. The face line varies by skin.
fn cat_art(skin: CatSkin) -> [&'static str; 4] {
    let (crown, face) = match skin {
        CatSkin::Kitten => ("         ", "( o.o ) "),
        CatSkin::Ginger => ("         ", "( ^.^ ) "),
        CatSkin::Tabby => ("         ", "( =.= ) "),
        CatSkin::Tuxedo => ("         ", "( •.• ) "),
        CatSkin::Shadow => ("         ", "( -.- ) "),
        CatSkin::Royal => ("   ♛     ", "( ◉.◉ ) "),
    };
    [crown, " /\\_/\\  ", face, " > ^ <  "]
}

fn skin_color(skin: CatSkin) -> Color {
    match skin {
        CatSkin::Kitten => Color::White,
        CatSkin::Ginger => Color::LightRed,
        CatSkin::Tabby => Color::Yellow,
        CatSkin::Tuxedo => Color::Gray,
        CatSkin::Shadow => Color::DarkGray,
        CatSkin::Royal => Color::Magenta,
    }
}

pub fn render(view: &HudView, f: &mut Frame, area: Rect, click_state: &Rc<RefCell<ClickState>>) {
    let borders = if is_narrow_layout(area.width) {
        Borders::TOP | Borders::BOTTOM
    } else {
        Borders::ALL
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // score + level
            Constraint::Length(3), // progress
            Constraint::Min(6),    // cat (tap area)
            Constraint::Length(3), // rates
            Constraint::Length(3), // energy
        ])
        .split(area);

    render_header(view, f, chunks[0], borders);
    render_progress(view, f, chunks[1], borders);
    render_cat(view, f, chunks[2], borders, click_state);
    render_rates(view, f, chunks[3], borders);
    render_energy(view, f, chunks[4], borders);
}

fn render_header(view: &HudView, f: &mut Frame, area: Rect, borders: Borders) {
    let line = match view.status {
        HudStatus::Loading => Line::from(Span::styled(
            "Loading…",
            Style::default().fg(Color::DarkGray),
        )),
        HudStatus::HostUnavailable => Line::from(Span::styled(
            "Please open in Telegram",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        HudStatus::Ready => Line::from(vec![
            Span::styled("🪙 ", Style::default().fg(Color::Yellow)),
            Span::styled(
                view.score_text.as_str(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
    };

    let title = format!(" {} · {} ", view.level_name, view.level_text);
    let widget = Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(borders)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(title, Style::default().fg(Color::Cyan))),
        );
    f.render_widget(widget, area);
}

fn render_progress(view: &HudView, f: &mut Frame, area: Rect, borders: Borders) {
    let ratio = (view.progress_percent / 100.0).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(Block::default().borders(borders).title(" Next level "))
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
        .ratio(ratio)
        .label(format!("{:.0}%", view.progress_percent.floor()));
    f.render_widget(gauge, area);
}

fn render_cat(
    view: &HudView,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let active = view.status == HudStatus::Ready;
    let color = if active { skin_color(view.skin) } else { Color::DarkGray };

    let mut lines: Vec<Line> = cat_art(view.skin)
        .iter()
        .map(|row| Line::from(Span::styled(*row, Style::default().fg(color))))
        .collect();
    if active {
        lines.push(Line::from(Span::styled(
            "tap the cat · [Space]",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let skin = view.skin_id().trim_start_matches("cat-");
    let widget = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(borders)
            .border_style(Style::default().fg(color))
            .title(format!(" {} ", skin)),
    );
    f.render_widget(widget, area);

    // Loading and host-less sessions leave the cat inert.
    if active {
        click_state.borrow_mut().add_click_target(area, TAP);
    }
}

fn render_rates(view: &HudView, f: &mut Frame, area: Rect, borders: Borders) {
    let dim = Style::default().fg(Color::DarkGray);
    let line = Line::from(vec![
        Span::styled("Tap +", dim),
        Span::styled(view.tap_value_text.as_str(), Style::default().fg(Color::Green)),
        Span::styled("  Next ", dim),
        Span::styled(view.level_up_cost_text.as_str(), Style::default().fg(Color::Cyan)),
        Span::styled("  Profit ", dim),
        Span::styled(
            format!("{}/h", view.profit_text),
            Style::default().fg(Color::Yellow),
        ),
    ]);
    let widget = Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(Block::default().borders(borders).border_style(dim));
    f.render_widget(widget, area);
}

fn render_energy(view: &HudView, f: &mut Frame, area: Rect, borders: Borders) {
    let gauge = Gauge::default()
        .block(Block::default().borders(borders).title(" Energy "))
        .gauge_style(Style::default().fg(Color::LightYellow).bg(Color::Black))
        .ratio(view.energy_ratio.clamp(0.0, 1.0))
        .label(format!("⚡ {}", view.energy_text));
    f.render_widget(gauge, area);
}
