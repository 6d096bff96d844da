use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Circle, Context, Line as Segment, Rectangle};
use ratatui::widgets::{Block, Paragraph, Wrap};
use ratatui::{DefaultTerminal, Frame};

use crate::core::session::{AvatarColor, SessionContext};
use crate::core::zone::ZoneId;
use crate::core::Vec3;
use crate::engine::Frontend;

/// World units visible on each side of the avatar.
const VIEW_RADIUS: f64 = 15.0;

pub struct TerminalFrontend {
    terminal: DefaultTerminal,
}

impl TerminalFrontend {
    pub fn new(terminal: DefaultTerminal) -> Self {
        Self { terminal }
    }
}

impl Frontend for TerminalFrontend {
    fn draw(&mut self, ctx: &SessionContext) -> anyhow::Result<()> {
        self.terminal.draw(|frame| render(frame, ctx))?;
        Ok(())
    }
}

/// Top-down map on the left, chat on the right, key help along the bottom.
pub fn render(frame: &mut Frame, ctx: &SessionContext) {
    let [main, help] = Layout::vertical([Constraint::Min(5), Constraint::Length(1)]).areas(frame.area());
    let [map, chat] =
        Layout::horizontal([Constraint::Percentage(65), Constraint::Percentage(35)]).areas(main);

    render_map(frame, map, ctx);
    render_chat(frame, chat, ctx);

    frame.render_widget(
        Paragraph::new("arrows move · Home/End or drag to turn · type + Enter to chat · /name <you> · Esc quits")
            .style(Style::default().fg(Color::Gray)),
        help,
    );
}

/// World X is screen X; world -Z is screen up.
fn to_canvas(p: &Vec3) -> (f64, f64) {
    (f64::from(p.x), -f64::from(p.z))
}

fn color_of(color: &AvatarColor) -> Color {
    color
        .rgb()
        .map(|(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(Color::White)
}

fn render_map(frame: &mut Frame, area: Rect, ctx: &SessionContext) {
    let avatar = ctx.avatar();
    let (cx, cy) = to_canvas(&avatar.position);

    let title = match ctx.identity() {
        Some(identity) => format!(" plaza · {} ", identity.user_id),
        None => " plaza · connecting… ".to_string(),
    };
    let footer = format!(
        " ({:.2}, {:.2}, {:.2}) · {} nearby ",
        avatar.position.x,
        avatar.position.y,
        avatar.position.z,
        ctx.registry().len()
    );

    let canvas = Canvas::default()
        .block(
            Block::bordered()
                .title(title)
                .title_bottom(footer),
        )
        .marker(Marker::Braille)
        .x_bounds([cx - VIEW_RADIUS, cx + VIEW_RADIUS])
        .y_bounds([cy - VIEW_RADIUS, cy + VIEW_RADIUS])
        .paint(|painter| paint_world(painter, ctx));
    frame.render_widget(canvas, area);
}

fn paint_world(painter: &mut Context<'_>, ctx: &SessionContext) {
    let edge = f64::from(ctx.ground_half_extent());
    painter.draw(&Rectangle {
        x: -edge,
        y: -edge,
        width: edge * 2.0,
        height: edge * 2.0,
        color: Color::DarkGray,
    });

    for (index, zone) in ctx.triggers().zones().iter().enumerate() {
        let (x, y) = to_canvas(&zone.center);
        let playing = ctx
            .triggers()
            .track(ZoneId(index))
            .is_some_and(|track| track.is_playing());
        let color = if playing { Color::LightGreen } else { Color::Green };
        painter.draw(&Circle {
            x,
            y,
            radius: f64::from(zone.trigger_radius()),
            color,
        });
        let label = if playing { format!("♪ {}", zone.name) } else { zone.name.clone() };
        painter.print(x, y, Span::styled(label, Style::default().fg(color)));
    }

    for obstacle in ctx.obstacles() {
        let bounds = &obstacle.bounds;
        painter.draw(&Rectangle {
            x: f64::from(bounds.min.x),
            y: -f64::from(bounds.max.z),
            width: f64::from(bounds.max.x - bounds.min.x),
            height: f64::from(bounds.max.z - bounds.min.z),
            color: Color::Yellow,
        });
    }

    painter.layer();

    for proxy in ctx.registry().proxies() {
        let (x, y) = to_canvas(&proxy.position);
        painter.print(x, y, Span::styled("●", Style::default().fg(color_of(&proxy.color))));
    }

    let avatar = ctx.avatar();
    let (x, y) = to_canvas(&avatar.position);
    if let Some(facing) = ctx.heading().horizontal() {
        let (dx, dy) = to_canvas(&facing);
        painter.draw(&Segment {
            x1: x,
            y1: y,
            x2: x + dx * 2.0,
            y2: y + dy * 2.0,
            color: Color::Cyan,
        });
    }
    painter.print(
        x,
        y,
        Span::styled(
            "@",
            Style::default()
                .fg(color_of(&avatar.color))
                .add_modifier(Modifier::BOLD),
        ),
    );
}

fn render_chat(frame: &mut Frame, area: Rect, ctx: &SessionContext) {
    let chat = ctx.chat();
    let [log, input, status] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    let lines: Vec<Line> = chat
        .messages()
        .iter()
        .map(|m| {
            Line::from(vec![
                Span::styled(format!("{}: ", m.username), Style::default().fg(Color::Cyan)),
                Span::raw(m.text.as_str()),
            ])
        })
        .collect();
    // Keep the newest messages in view.
    let visible = usize::from(log.height.saturating_sub(2));
    let skip = lines.len().saturating_sub(visible);
    frame.render_widget(
        Paragraph::new(lines.into_iter().skip(skip).collect::<Vec<_>>())
            .block(Block::bordered().title(" chat "))
            .wrap(Wrap { trim: false }),
        log,
    );

    let prompt = format!("{}> ", chat.username());
    frame.render_widget(
        Paragraph::new(format!("{prompt}{}", chat.input())).block(Block::bordered()),
        input,
    );
    let typed = prompt.chars().count() + chat.input().chars().count();
    let cursor_x = input
        .x
        .saturating_add(1)
        .saturating_add(u16::try_from(typed).unwrap_or(u16::MAX));
    frame.set_cursor_position((cursor_x.min(input.right().saturating_sub(2)), input.y + 1));

    if let Some(message) = chat.status() {
        frame.render_widget(
            Paragraph::new(message).style(Style::default().fg(Color::Yellow)),
            status,
        );
    }
}
