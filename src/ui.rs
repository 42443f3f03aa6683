use chrono::Utc;
use itertools::Itertools;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table},
    Frame,
};
use time_humanize::{Accuracy, HumanTime, Tense};
use unicode_width::UnicodeWidthStr;

use crate::leaderboard::{LeaderboardEntry, SubmitOutcome};
use crate::session::{Mode, PlayerSnapshot, SessionResult, SessionSnapshot, Winner};
use crate::track::EndReason;
use crate::util::{fmt_secs, mean, std_dev};

const HORIZONTAL_MARGIN: u16 = 4;

/// Which physical keys answer TRUE and FALSE for one player, already
/// resolved against the button-side setting.
#[derive(Debug, Clone)]
pub struct KeyHints {
    pub true_key: &'static str,
    pub false_key: &'static str,
}

/// Everything the game-over screen needs, assembled by the app loop.
#[derive(Debug, Clone)]
pub struct GameOverView {
    pub result: SessionResult,
    pub reactions_ms: Vec<u64>,
    pub made_top: bool,
    pub name_input: String,
    pub submit_status: Option<SubmitOutcome>,
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Countdown colour flips to red inside the last 30% of the limit.
fn gauge_color(remaining_ms: u64, limit_ms: u64) -> Color {
    if remaining_ms * 10 < limit_ms * 3 {
        Color::Red
    } else {
        Color::Green
    }
}

fn countdown_gauge(remaining_ms: u64, limit_ms: u64) -> Gauge<'static> {
    let ratio = if limit_ms == 0 {
        0.0
    } else {
        (remaining_ms as f64 / limit_ms as f64).clamp(0.0, 1.0)
    };
    Gauge::default()
        .gauge_style(Style::default().fg(gauge_color(remaining_ms, limit_ms)))
        .ratio(ratio)
        .label(fmt_secs(remaining_ms))
}

fn statement_paragraph(player: &PlayerSnapshot) -> Paragraph<'static> {
    Paragraph::new(Line::from(Span::styled(
        player.equation.to_string(),
        bold().fg(Color::White),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL))
}

fn hint_line(hints: &KeyHints) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("[{}] ", hints.true_key), bold().fg(Color::Green)),
        Span::styled("TRUE   ", Style::default().fg(Color::Green)),
        Span::styled(format!("[{}] ", hints.false_key), bold().fg(Color::Red)),
        Span::styled("FALSE", Style::default().fg(Color::Red)),
    ])
}

pub fn render_home(f: &mut Frame, preferred_mode: Mode, time_limit_ms: u64) {
    let area = f.area();
    let lines = vec![
        Line::from(Span::styled("mathdash", bold().fg(Color::Cyan))),
        Line::from(""),
        Line::from("true or false, before the clock runs out"),
        Line::from(""),
        Line::from(Span::styled(
            format!("time limit {} · preferred {}", fmt_secs(time_limit_ms), preferred_mode),
            dim(),
        )),
        Line::from(""),
        Line::from("[1] solo    [2] co-op    [3] versus"),
        Line::from("[enter] play preferred   [l]eaderboard"),
        Line::from("[-/+] time limit   [esc] quit"),
    ];
    let height = lines.len() as u16;
    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    f.render_widget(paragraph, centered_rect(area.width, height, area));
}

/// One player's pane: score on top, countdown, statement, key hints.
/// Used whole-screen for solo and per-half for the two-player modes.
fn render_player_pane(
    f: &mut Frame,
    area: Rect,
    label: &str,
    player: &PlayerSnapshot,
    limit_ms: u64,
    hints: &KeyHints,
    show_clock: bool,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(2), // score
            Constraint::Length(1), // countdown
            Constraint::Min(3),    // statement
            Constraint::Length(1), // hints
        ])
        .split(area);

    let score = Paragraph::new(Line::from(vec![
        Span::styled(format!("{}  ", label), dim()),
        Span::styled(player.score.to_string(), bold().fg(Color::Yellow)),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(score, chunks[0]);

    if !player.active {
        let out = Paragraph::new(Span::styled(
            "ELIMINATED",
            bold().fg(Color::Red),
        ))
        .alignment(Alignment::Center);
        f.render_widget(out, chunks[2]);
        return;
    }

    if show_clock {
        f.render_widget(countdown_gauge(player.time_remaining_ms, limit_ms), chunks[1]);
    } else {
        let grace = Paragraph::new(Span::styled("no clock on the first one", dim()))
            .alignment(Alignment::Center);
        f.render_widget(grace, chunks[1]);
    }

    let text = player.equation.to_string();
    let box_width = (text.width() as u16 + 8).max(24);
    f.render_widget(
        statement_paragraph(player),
        centered_rect(box_width, 3, chunks[2]),
    );

    let hints = Paragraph::new(hint_line(hints)).alignment(Alignment::Center);
    f.render_widget(hints, chunks[3]);
}

pub fn render_game(
    f: &mut Frame,
    snapshot: &SessionSnapshot,
    mode: Mode,
    limit_ms: u64,
    p1_hints: &KeyHints,
    p2_hints: &KeyHints,
) {
    let area = f.area();
    match mode {
        Mode::Solo => {
            let p = &snapshot.players[0];
            render_player_pane(f, area, "score", p, limit_ms, p1_hints, clock_visible(p, limit_ms));
        }
        Mode::Coop | Mode::Versus => {
            let halves = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(area);
            let p2 = &snapshot.players[1];
            render_player_pane(f, halves[0], "player 2", p2, limit_ms, p2_hints, clock_visible(p2, limit_ms));
            let p1 = &snapshot.players[0];
            render_player_pane(f, halves[1], "player 1", p1, limit_ms, p1_hints, clock_visible(p1, limit_ms));
        }
    }
}

/// The opening statement runs without a clock; a full bar there would be
/// misleading, so the pane swaps in a grace note instead.
fn clock_visible(player: &PlayerSnapshot, limit_ms: u64) -> bool {
    player.time_remaining_ms < limit_ms || !player.active
}

fn reaction_summary(reactions_ms: &[u64]) -> Option<String> {
    let data: Vec<f64> = reactions_ms.iter().map(|&ms| ms as f64).collect();
    let m = mean(&data)?;
    let sd = std_dev(&data)?;
    Some(format!(
        "{} answers · avg {:.0} ms · sd {:.0} ms",
        reactions_ms.len(),
        m,
        sd
    ))
}

pub fn render_game_over(f: &mut Frame, view: &GameOverView) {
    let area = f.area();
    let mut lines: Vec<Line> = vec![Line::from(Span::styled("GAME OVER", bold().fg(Color::Cyan))), Line::from("")];

    match &view.result {
        SessionResult::Solo {
            score,
            equation,
            reason,
        } => {
            lines.push(Line::from(vec![
                Span::styled("score ", dim()),
                Span::styled(score.to_string(), bold().fg(Color::Yellow)),
            ]));
            let verdict = if equation.is_correct { "TRUE" } else { "FALSE" };
            lines.push(Line::from(format!("{} was {}", equation, verdict)));
            lines.push(Line::from(Span::styled(
                match reason {
                    EndReason::Timeout => "out of time",
                    EndReason::Wrong => "wrong call",
                },
                Style::default().fg(Color::Red),
            )));
        }
        SessionResult::Duo { scores, winner } => {
            let banner = match winner {
                Winner::Player1 => "player 1 wins!",
                Winner::Player2 => "player 2 wins!",
                Winner::Tie => "it's a tie!",
            };
            lines.push(Line::from(Span::styled(banner, bold().fg(Color::Yellow))));
            lines.push(Line::from(format!(
                "player 1: {}   player 2: {}",
                scores.0, scores.1
            )));
        }
    }

    if let Some(summary) = reaction_summary(&view.reactions_ms) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(summary, dim())));
    }

    if view.made_top {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "top-ten score! type a name and press enter:",
            Style::default().fg(Color::Green),
        )));
        lines.push(Line::from(Span::styled(
            format!("> {}_", view.name_input),
            bold(),
        )));
    }

    if let Some(status) = &view.submit_status {
        lines.push(Line::from(""));
        if status.success {
            lines.push(Line::from(Span::styled(
                "score saved",
                Style::default().fg(Color::Green),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                status
                    .error
                    .clone()
                    .unwrap_or_else(|| "submission failed".into()),
                Style::default().fg(Color::Red),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[r]estart  [m]enu  [l]eaderboard  [t]weet  [esc] quit",
        dim(),
    )));

    let height = lines.len() as u16;
    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    f.render_widget(paragraph, centered_rect(area.width, height, area));
}

pub fn render_leaderboard(f: &mut Frame, entries: &[LeaderboardEntry]) {
    let area = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let now_ms = Utc::now().timestamp_millis();
    let rows = entries
        .iter()
        .map(|e| {
            let age_secs = ((now_ms - e.submitted_at_ms) / 1000).max(0) as u64;
            let when = HumanTime::from(std::time::Duration::from_secs(age_secs))
                .to_text_en(Accuracy::Rough, Tense::Past);
            Row::new(vec![
                Cell::from(format!("{}", e.rank)),
                Cell::from(e.username.clone()),
                Cell::from(e.score.to_string()),
                Cell::from(fmt_secs(e.time_limit_ms)),
                Cell::from(when),
            ])
        })
        .collect_vec();

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(22),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Min(12),
        ],
    )
    .header(
        Row::new(vec!["#", "name", "score", "limit", "when"]).style(bold().fg(Color::Cyan)),
    )
    .block(Block::default().borders(Borders::ALL).title("top ten"));

    f.render_widget(table, chunks[0]);

    let footer = Paragraph::new(Span::styled("[esc] back", dim())).alignment(Alignment::Center);
    f.render_widget(footer, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_goes_red_inside_the_last_third() {
        assert_eq!(gauge_color(2_000, 2_000), Color::Green);
        assert_eq!(gauge_color(700, 2_000), Color::Green);
        assert_eq!(gauge_color(599, 2_000), Color::Red);
        assert_eq!(gauge_color(0, 2_000), Color::Red);
    }

    #[test]
    fn centered_rect_is_clamped_and_centered() {
        let area = Rect::new(0, 0, 100, 40);
        let r = centered_rect(20, 10, area);
        assert_eq!((r.x, r.y, r.width, r.height), (40, 15, 20, 10));

        let clamped = centered_rect(500, 500, area);
        assert_eq!((clamped.width, clamped.height), (100, 40));
    }

    #[test]
    fn reaction_summary_needs_data() {
        assert_eq!(reaction_summary(&[]), None);
        let s = reaction_summary(&[500, 700]).unwrap();
        assert!(s.contains("2 answers"));
        assert!(s.contains("600"));
    }
}
