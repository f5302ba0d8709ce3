use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use crossterm::cursor::SetCursorStyle;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;

mod agent;
mod app;
mod events;
mod markdown;
mod text_layout;
mod theme;
mod ui;
mod view;

use agent::{AgentEvent, DelegatingToolAgent, ToolAdapter, ToolCommand, ToolExecutionError};
use app::App;
use events::AppEvent;
use theme::Theme;
use view::StreamingProcessView;

const MAX_ADAPTER_EVENTS_PER_LOOP: usize = 128;
const MAX_TRANSCRIPT_LINES: usize = 2000;

#[derive(Debug, Parser)]
#[command(
    name = "agentdeck",
    version,
    about = "Run several coding tool sessions side by side in one terminal"
)]
struct Cli {
    /// Prompt to start a tool session with; repeat for one session each.
    #[arg(short, long, value_name = "TEXT")]
    prompt: Vec<String>,

    /// External tool program to run.
    #[arg(long, default_value = "claude")]
    tool: String,

    /// Working directory for tool invocations.
    #[arg(long, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Theme file; a missing file means built-in colors.
    #[arg(long, default_value = "theme.toml", value_name = "FILE")]
    theme: PathBuf,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Run one prompt through the tool without the UI and print its output.
    Run { prompt: String },
}

/// One tool process owned by the main loop: its adapter, the full text it
/// has produced so far, and a prompt queued from the command line.
struct ProcessSlot {
    id: String,
    adapter: ToolAdapter,
    transcript: String,
    pending_prompt: Option<String>,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    if let Some(CliCommand::Run { prompt }) = &cli.command {
        std::process::exit(run_headless(tool_command(&cli), prompt));
    }

    // Load before entering the alternate screen so theme warnings stay
    // visible on the normal terminal.
    let theme = Theme::load_or_default(&cli.theme);
    let slots = build_slots(&cli);
    let mut app = App::default();
    for slot in &slots {
        app.register_view(StreamingProcessView::new(slot.id.as_str()));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        SetCursorStyle::SteadyBar
    )?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    let result = run_app(&mut terminal, app, &theme, slots);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        SetCursorStyle::DefaultUserShape,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_headless(command: ToolCommand, prompt: &str) -> i32 {
    let agent = DelegatingToolAgent::new(command);
    match agent.run_external_tool(prompt, None) {
        Ok(output) => {
            print!("{output}");
            0
        }
        Err(err) => {
            eprintln!("{err}");
            match err {
                ToolExecutionError::Failed {
                    code: Some(code), ..
                } if code > 0 => code,
                _ => 1,
            }
        }
    }
}

fn tool_command(cli: &Cli) -> ToolCommand {
    let mut command = ToolCommand::new(cli.tool.clone());
    command.working_directory = cli.workdir.clone();
    command
}

fn tool_label(program: &str) -> String {
    Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(program)
        .to_string()
}

fn build_slots(cli: &Cli) -> Vec<ProcessSlot> {
    let label = tool_label(&cli.tool);
    let prompts: Vec<Option<String>> = if cli.prompt.is_empty() {
        vec![None]
    } else {
        cli.prompt.iter().cloned().map(Some).collect()
    };
    prompts
        .into_iter()
        .enumerate()
        .map(|(index, pending_prompt)| ProcessSlot {
            id: format!("{label}-{}", index + 1),
            adapter: ToolAdapter::new(tool_command(cli)),
            transcript: String::new(),
            pending_prompt,
        })
        .collect()
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    theme: &Theme,
    mut slots: Vec<ProcessSlot>,
) -> io::Result<()> {
    for index in 0..slots.len() {
        if let Some(prompt) = slots[index].pending_prompt.take() {
            dispatch_prompt(&mut app, &mut slots[index], &prompt);
        }
    }

    while app.is_running() {
        for slot in slots.iter_mut() {
            for event in slot
                .adapter
                .drain_events_limited(MAX_ADAPTER_EVENTS_PER_LOOP)
            {
                match event {
                    AgentEvent::Output(line) | AgentEvent::System(line) => {
                        push_transcript_line(&mut slot.transcript, &line);
                    }
                    AgentEvent::Completed { .. } => {
                        app.clear_busy(&slot.id);
                    }
                }
            }
        }

        // Equal transcripts are a no-op inside the views, so syncing every
        // pass is cheap and keeps follow behavior applied to each frame.
        let screen = screen_rect(terminal)?;
        sync_views(&mut app, &slots, screen);

        terminal.draw(|frame| ui::render(frame, &app, theme))?;

        match events::next_event()? {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Quit => app.quit(),
            AppEvent::EscapePressed => app.handle_escape(Instant::now()),
            AppEvent::FocusNext => app.focus_next(),
            AppEvent::FocusPrev => app.focus_prev(),
            AppEvent::InputChar(c) => {
                if let Some(view) = app.focused_view_mut() {
                    view.input_char(c);
                }
            }
            AppEvent::InsertNewline => {
                if let Some(view) = app.focused_view_mut() {
                    view.insert_newline();
                }
            }
            AppEvent::Backspace => {
                if let Some(view) = app.focused_view_mut() {
                    view.backspace();
                }
            }
            AppEvent::Submit => {
                submit_focused(&mut app, &mut slots);
            }
            AppEvent::CursorLeft => {
                if let Some(view) = app.focused_view_mut() {
                    view.move_cursor_left();
                }
            }
            AppEvent::CursorRight => {
                if let Some(view) = app.focused_view_mut() {
                    view.move_cursor_right();
                }
            }
            AppEvent::CursorUp => {
                let screen = screen_rect(terminal)?;
                let width = ui::input_text_width(screen, app.view_count(), app.focused_index());
                if let Some(view) = app.focused_view_mut() {
                    view.move_cursor_up(width);
                }
            }
            AppEvent::CursorDown => {
                let screen = screen_rect(terminal)?;
                let width = ui::input_text_width(screen, app.view_count(), app.focused_index());
                if let Some(view) = app.focused_view_mut() {
                    view.move_cursor_down(width);
                }
            }
            AppEvent::ScrollBackward(step) => {
                if let Some(view) = app.focused_view_mut() {
                    view.scroll_backward(step);
                }
            }
            AppEvent::ScrollForward(step) => {
                let screen = screen_rect(terminal)?;
                let max_scroll = ui::output_max_scroll(screen, &app, app.focused_index());
                if let Some(view) = app.focused_view_mut() {
                    view.scroll_forward(step, max_scroll);
                }
            }
            AppEvent::MouseLeftClick(column, row) => {
                let screen = screen_rect(terminal)?;
                if let Some(index) = ui::view_hit_test(screen, app.view_count(), column, row) {
                    app.focus_index(index);
                }
            }
            AppEvent::Resize => terminal.autoresize()?,
        }
    }

    Ok(())
}

fn screen_rect(terminal: &Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<Rect> {
    let size = terminal.size()?;
    Ok(Rect::new(0, 0, size.width, size.height))
}

fn sync_views(app: &mut App, slots: &[ProcessSlot], screen: Rect) {
    for (index, slot) in slots.iter().enumerate() {
        let viewport = ui::output_viewport_height(screen, app, index);
        if let Some(view) = app.view_mut_by_id(&slot.id) {
            view.update_content(&slot.transcript);
            view.apply_follow(viewport);
        }
    }
}

fn submit_focused(app: &mut App, slots: &mut [ProcessSlot]) -> bool {
    let index = app.focused_index();
    let Some(slot) = slots.get_mut(index) else {
        return false;
    };
    if app.is_busy(&slot.id) {
        push_transcript_line(&mut slot.transcript, "tool is still running; prompt not sent");
        return true;
    }
    let mut submitted: Option<String> = None;
    if let Some(view) = app.focused_view_mut() {
        view.submit_to(|_process_id, text| submitted = Some(text.to_string()));
    }
    let Some(prompt) = submitted else {
        return false;
    };
    dispatch_prompt(app, slot, &prompt);
    true
}

fn dispatch_prompt(app: &mut App, slot: &mut ProcessSlot, prompt: &str) {
    for line in prompt.lines() {
        push_transcript_line(&mut slot.transcript, &format!("> {line}"));
    }
    slot.adapter.send_prompt(prompt.to_string());
    app.mark_busy(&slot.id);
}

fn push_transcript_line(transcript: &mut String, line: &str) {
    transcript.push_str(line);
    transcript.push('\n');
    trim_transcript(transcript);
}

/// Drops whole lines from the front once the transcript exceeds the cap,
/// so long-running tools cannot grow the display without bound.
fn trim_transcript(transcript: &mut String) {
    let line_count = transcript.matches('\n').count();
    if line_count <= MAX_TRANSCRIPT_LINES {
        return;
    }
    let excess = line_count - MAX_TRANSCRIPT_LINES;
    let mut cut = 0;
    for (offset, _) in transcript.match_indices('\n').take(excess) {
        cut = offset + 1;
    }
    transcript.drain(..cut);
}
