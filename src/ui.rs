use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use time_humanize::{Accuracy, HumanTime, Tense};

use mathdash::celebration::Celebration;
use mathdash::game::{Phase, SaveStatus};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.game.phase {
            Phase::Selection => render_selection(self, area, buf),
            Phase::WarmupCountdown | Phase::Countdown => render_countdown(self, area, buf),
            Phase::Warmup => render_warmup(self, area, buf),
            Phase::Playing => render_playing(self, area, buf),
            Phase::Ended => render_results(self, area, buf),
        }
    }
}

fn centered_column(area: Rect, constraints: &[Constraint]) -> std::rc::Rc<[Rect]> {
    let used: u16 = constraints
        .iter()
        .map(|c| match c {
            Constraint::Length(n) => *n,
            _ => 0,
        })
        .sum();
    let pad = area.height.saturating_sub(used) / 2;

    let mut all = vec![Constraint::Length(pad)];
    all.extend_from_slice(constraints);

    Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(all)
        .split(area)
}

fn render_selection(app: &App, area: Rect, buf: &mut Buffer) {
    let settings = &app.game.settings;
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = centered_column(
        area,
        &[
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Length(1),
        ],
    );

    let title = Paragraph::new(Span::styled("mathdash", bold_style)).alignment(Alignment::Center);
    title.render(chunks[1], buf);

    let drill = format!(
        "{} · {}-{} {} {}-{} · {}s",
        settings.operation.to_string().to_lowercase(),
        settings.range.min1,
        settings.range.max1,
        settings.operation.symbol(),
        settings.range.min2,
        settings.range.max2,
        settings.timer_secs,
    );
    Paragraph::new(drill)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let toggles = [
        ("negatives", settings.allow_negatives),
        ("learner", settings.learner_mode),
        ("number pad", settings.custom_number_pad),
        ("typing adjust", settings.typing_speed_adjustment),
    ]
    .iter()
    .filter(|(_, on)| *on)
    .map(|(name, _)| *name)
    .join(", ");
    let focus = settings
        .focus_number
        .map(|n| format!("focus {}", n))
        .unwrap_or_default();
    let extras = [focus.as_str(), toggles.as_str()]
        .iter()
        .filter(|s| !s.is_empty())
        .join(" · ");
    if !extras.is_empty() {
        Paragraph::new(Span::styled(extras, italic_style))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    }

    let legend = Paragraph::new(Span::styled("(enter) start / (esc)ape", italic_style))
        .alignment(Alignment::Center);
    legend.render(chunks[6], buf);
}

fn render_countdown(app: &App, area: Rect, buf: &mut Buffer) {
    let left = app.game.countdown_left(app.now).max(1);
    let label = if app.game.phase == Phase::WarmupCountdown {
        "warmup in"
    } else {
        "go in"
    };

    let chunks = centered_column(area, &[Constraint::Length(1), Constraint::Length(1)]);
    Paragraph::new(Span::styled(
        label,
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);
    Paragraph::new(Span::styled(
        left.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);
}

fn render_warmup(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(warmup) = app.game.warmup.as_ref() else {
        return;
    };
    let bold_style = Style::default().add_modifier(Modifier::BOLD);

    let chunks = centered_column(
        area,
        &[
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(1),
        ],
    );

    Paragraph::new(Span::styled(
        format!("{}s · type the numbers as fast as you can", warmup.seconds_left(app.now)),
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(warmup.target().to_string(), bold_style))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let entry = if warmup.input().is_empty() {
        "_".to_string()
    } else {
        warmup.input().to_string()
    };
    Paragraph::new(entry)
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
}

fn render_playing(app: &App, area: Rect, buf: &mut Buffer) {
    let game = &app.game;
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);

    let pad_lines = if game.settings.custom_number_pad { 5 } else { 0 };
    let chunks = centered_column(
        area,
        &[
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(pad_lines),
        ],
    );

    let status = format!(
        "{}   score {}",
        game.time_left(app.now),
        game.score
    );
    Paragraph::new(Span::styled(status, dim_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    if let Some(problem) = game.current_problem {
        Paragraph::new(Span::styled(problem.display(), bold_style))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    }

    let mut entry = String::new();
    if game.negative {
        entry.push('-');
    }
    entry.push_str(&game.user_answer);
    if entry.is_empty() {
        entry.push('_');
    }
    let entry_style = if game.is_revealing() {
        // Learner reveal: visually distinct from the player's own input.
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::ITALIC)
    } else {
        bold_style
    };
    Paragraph::new(Span::styled(entry, entry_style))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

    if let Some(message) = game.encouragement {
        Paragraph::new(Span::styled(
            message,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);
    }

    if game.settings.custom_number_pad {
        render_number_pad(chunks[7], buf);
    }
}

fn render_number_pad(area: Rect, buf: &mut Buffer) {
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let rows = ["7 8 9", "4 5 6", "1 2 3", "- 0 ⌫"];
    let lines: Vec<Line> = rows
        .iter()
        .map(|row| Line::from(Span::styled(*row, dim_style)))
        .collect();
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let game = &app.game;
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = centered_column(
        area,
        &[
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Length(1),
        ],
    );

    let Some(outcome) = game.outcome.as_ref() else {
        return;
    };

    if outcome.is_high_score {
        Paragraph::new(Span::styled(
            app.celebration.banner,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    }

    Paragraph::new(Span::styled(
        format!("{} solved", outcome.score),
        bold_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    Paragraph::new(format!(
        "{:.2}s per answer   {:.2}s math time",
        outcome.metrics.answer_time_per_problem, outcome.metrics.math_time_per_problem
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);

    if let Some((best, played_at)) = game.best_so_far() {
        let elapsed = chrono::Local::now()
            .signed_duration_since(played_at)
            .num_seconds()
            .max(0) as u64;
        let age = HumanTime::from(std::time::Duration::from_secs(elapsed))
            .to_text_en(Accuracy::Rough, Tense::Past);
        Paragraph::new(Span::styled(
            format!("best for this drill: {} ({})", best, age),
            italic_style,
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }

    let save_note = match outcome.save_status {
        SaveStatus::Saved => None,
        SaveStatus::Rejected => Some("score not saved: over the plausibility limit"),
        SaveStatus::Failed => Some("score not saved: history store failed"),
        SaveStatus::NotAttempted => Some("score not saved"),
    };
    if let Some(note) = save_note {
        Paragraph::new(Span::styled(note, Style::default().fg(Color::Red)))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
    }

    let legend = Paragraph::new(Span::styled(
        "(r)etry / (m)enu / (esc)ape",
        italic_style,
    ))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    legend.render(chunks[8], buf);

    if app.celebration.is_active {
        render_celebration_particles(&app.celebration, area, buf);
    }
}

/// Render celebration particles on top of the results screen
fn render_celebration_particles(celebration: &Celebration, area: Rect, buf: &mut Buffer) {
    let colors = [
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::Green,
        Color::Red,
        Color::Blue,
        Color::LightYellow,
    ];

    for particle in &celebration.particles {
        let x = particle.x as u16;
        let y = particle.y as u16;

        if x < area.width && y < area.height {
            let color = colors[particle.color_index % colors.len()];
            let cell_x = area.x + x;
            let cell_y = area.y + y;
            if let Some(cell) = buf.cell_mut((cell_x, cell_y)) {
                cell.set_char(particle.symbol);
                cell.set_style(Style::default().fg(color).add_modifier(Modifier::BOLD));
            }
        }
    }
}
