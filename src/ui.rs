use std::time::Instant;

use ratatui::prelude::*;
use ratatui::text::Text;
use ratatui::widgets::{Block, Padding, Paragraph};

use crate::app::App;
use crate::text_layout::wrap_with_carets;
use crate::theme::Theme;

const MAX_INPUT_TEXT_LINES: u16 = 5;
const TEXT_PADDING: u16 = 1;
const TITLE_BAR_HEIGHT: u16 = 1;
const STATUS_HEIGHT: u16 = 1;
const ACTIVE_TITLE_BG: Color = Color::Rgb(90, 145, 200);
const ACTIVE_TITLE_FG: Color = Color::Black;
const STATUS_HELP_TEXT: &str =
    "Tab focus | Enter newline | Alt+Enter send | Shift+Up/Down scroll | Ctrl+C quit";

pub fn render(frame: &mut Frame, app: &App, theme: &Theme) {
    let (_body, status) = screen_split(frame.area());
    let cells = grid_cells(frame.area(), app.view_count());
    for (index, cell) in cells.iter().enumerate() {
        render_view_cell(frame, *cell, app, index, theme);
    }
    render_status_bar(frame, status, app, theme);
}

fn screen_split(screen: Rect) -> (Rect, Rect) {
    let [body, status] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(STATUS_HEIGHT)]).areas(screen);
    (body, status)
}

/// Column count for the view grid: one column for a single view, two up to
/// four views, three up to nine, four beyond that.
pub fn grid_columns(view_count: usize) -> u16 {
    match view_count {
        0..=1 => 1,
        2..=4 => 2,
        5..=9 => 3,
        _ => 4,
    }
}

/// Splits the area above the status line into equal cells, row-major,
/// one per view.
pub fn grid_cells(screen: Rect, view_count: usize) -> Vec<Rect> {
    let (body, _status) = screen_split(screen);
    let count = view_count.max(1);
    let columns = grid_columns(count);
    let rows = count.div_ceil(columns as usize);
    let mut cells = Vec::with_capacity(count);
    let row_areas = Layout::vertical(vec![Constraint::Ratio(1, rows as u32); rows]).split(body);
    for row_area in row_areas.iter() {
        let column_areas = Layout::horizontal(vec![
            Constraint::Ratio(1, columns as u32);
            columns as usize
        ])
        .split(*row_area);
        for column_area in column_areas.iter() {
            if cells.len() < count {
                cells.push(*column_area);
            }
        }
    }
    cells
}

/// Maps a click position to the view cell under it, if any.
pub fn view_hit_test(screen: Rect, view_count: usize, x: u16, y: u16) -> Option<usize> {
    grid_cells(screen, view_count)
        .iter()
        .take(view_count)
        .position(|cell| point_in_rect(*cell, x, y))
}

pub fn input_text_width(screen: Rect, view_count: usize, index: usize) -> u16 {
    let Some(cell) = grid_cells(screen, view_count).get(index).copied() else {
        return 1;
    };
    cell.width.saturating_sub(TEXT_PADDING * 2).max(1)
}

/// Rows the output area of a view occupies once the title bar and the
/// current input box height are taken out of its cell.
pub fn output_viewport_height(screen: Rect, app: &App, index: usize) -> u16 {
    let Some(cell) = grid_cells(screen, app.view_count()).get(index).copied() else {
        return 0;
    };
    let Some(view) = app.views().get(index) else {
        return 0;
    };
    let width = cell.width.saturating_sub(TEXT_PADDING * 2).max(1);
    let input_layout = wrap_with_carets(view.input_text(), width);
    let (cursor_line, _) = view.input_cursor_line_col(width);
    let (input_height, _) = input_box_metrics(
        input_layout.line_count,
        cursor_line,
        max_input_height_for(cell),
    );
    cell.height
        .saturating_sub(TITLE_BAR_HEIGHT)
        .saturating_sub(input_height)
}

pub fn output_max_scroll(screen: Rect, app: &App, index: usize) -> u16 {
    let Some(view) = app.views().get(index) else {
        return 0;
    };
    view.max_scroll(output_viewport_height(screen, app, index))
}

fn max_input_height_for(cell: Rect) -> u16 {
    // Keep at least one output row visible below the title bar.
    cell.height.saturating_sub(TITLE_BAR_HEIGHT + 1).max(1)
}

/// Input box height and scroll offset keeping the cursor line visible,
/// centered once the text overflows. The box grows with the text up to
/// `MAX_INPUT_TEXT_LINES` rows.
fn input_box_metrics(input_text_lines: u16, cursor_line: u16, max_input_height: u16) -> (u16, u16) {
    let capped_text_lines = input_text_lines.clamp(1, MAX_INPUT_TEXT_LINES);
    let input_height = capped_text_lines.min(max_input_height.max(1));
    let max_scroll = input_text_lines.saturating_sub(input_height);
    let middle_line = input_height / 2;
    let input_scroll = cursor_line.saturating_sub(middle_line).min(max_scroll);
    (input_height, input_scroll)
}

fn render_view_cell(frame: &mut Frame, cell: Rect, app: &App, index: usize, theme: &Theme) {
    let Some(view) = app.views().get(index) else {
        return;
    };
    if cell.width < 1 || cell.height < 2 {
        return;
    }
    let active = index == app.focused_index();

    let width = cell.width.saturating_sub(TEXT_PADDING * 2).max(1);
    let input_layout = wrap_with_carets(view.input_text(), width);
    let (cursor_line, cursor_col) = view.input_cursor_line_col(width);
    let (input_height, input_scroll) = input_box_metrics(
        input_layout.line_count,
        cursor_line,
        max_input_height_for(cell),
    );

    let [title_area, output_area, input_area] = Layout::vertical([
        Constraint::Length(TITLE_BAR_HEIGHT),
        Constraint::Min(1),
        Constraint::Length(input_height),
    ])
    .areas(cell);

    let title_bg = title_bar_bg(theme.output_bg, active);
    let title_fg = if active { ACTIVE_TITLE_FG } else { theme.muted_fg };
    let busy_marker = if app.is_busy(view.process_id()) {
        format!(" {}", spinner_frame(app.ticks()))
    } else {
        String::new()
    };
    frame.render_widget(
        Paragraph::new(format!(" {}{busy_marker}", view.process_id()))
            .style(Style::default().bg(title_bg).fg(title_fg)),
        title_area,
    );

    let output_scroll = view.scroll().min(view.max_scroll(output_area.height));
    frame.render_widget(
        Paragraph::new(Text::from(view.display().to_vec()))
            .style(Style::default().bg(theme.output_bg).fg(theme.text_fg))
            .scroll((output_scroll, 0))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.output_bg))
                    .padding(Padding::horizontal(TEXT_PADDING)),
            ),
        output_area,
    );

    let input_fg = if active { theme.active_fg } else { theme.text_fg };
    frame.render_widget(
        Paragraph::new(input_layout.text)
            .style(Style::default().bg(theme.input_bg).fg(input_fg))
            .scroll((input_scroll, 0))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.input_bg))
                    .padding(Padding::horizontal(TEXT_PADDING)),
            ),
        input_area,
    );

    if active {
        let input_inner = input_area.inner(Margin {
            horizontal: TEXT_PADDING,
            vertical: 0,
        });
        if input_inner.width > 0 && input_inner.height > 0 {
            let visible_cursor_line = cursor_line.saturating_sub(input_scroll);
            if visible_cursor_line < input_inner.height {
                frame.set_cursor_position((
                    input_inner
                        .x
                        .saturating_add(cursor_col.min(input_inner.width.saturating_sub(1))),
                    input_inner.y.saturating_add(visible_cursor_line),
                ));
            }
        }
    }
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    frame.render_widget(
        Paragraph::new(format!(" {}", status_line_text(app, Instant::now())))
            .style(Style::default().bg(theme.status_bg).fg(theme.muted_fg)),
        area,
    );
}

fn status_line_text(app: &App, now: Instant) -> String {
    let mut text = if app.escape_armed(now) {
        format!("Esc again to quit | {STATUS_HELP_TEXT}")
    } else {
        STATUS_HELP_TEXT.to_string()
    };
    if app.any_busy() {
        text = format!("{text} | working {}", spinner_frame(app.ticks()));
    }
    text
}

fn spinner_frame(ticks: u64) -> &'static str {
    const FRAMES: [&str; 6] = ["[   ]", "[.  ]", "[.. ]", "[...]", "[ ..]", "[  .]"];
    FRAMES[((ticks / 2) as usize) % FRAMES.len()]
}

fn title_bar_bg(base: Color, active: bool) -> Color {
    if active {
        return ACTIVE_TITLE_BG;
    }
    match base {
        Color::Rgb(r, g, b) => {
            let delta = -12;
            Color::Rgb(
                adjust_channel(r, delta),
                adjust_channel(g, delta),
                adjust_channel(b, delta),
            )
        }
        _ => base,
    }
}

fn adjust_channel(channel: u8, delta: i16) -> u8 {
    let value = channel as i16 + delta;
    value.clamp(0, 255) as u8
}

fn point_in_rect(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}
