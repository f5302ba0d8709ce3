use std::io;
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

pub const PAGE_SCROLL_LINES: u16 = 5;
pub const WHEEL_SCROLL_LINES: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    Quit,
    EscapePressed,
    FocusNext,
    FocusPrev,
    InputChar(char),
    InsertNewline,
    Backspace,
    Submit,
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    ScrollBackward(u16),
    ScrollForward(u16),
    MouseLeftClick(u16, u16),
    Resize,
}

fn map_key_event(key_event: KeyEvent) -> AppEvent {
    if key_event.kind != KeyEventKind::Press {
        return AppEvent::Tick;
    }

    let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key_event.modifiers.contains(KeyModifiers::ALT);
    let shift = key_event.modifiers.contains(KeyModifiers::SHIFT);

    if key_event.code == KeyCode::Char('c') && ctrl {
        return AppEvent::Quit;
    }
    if key_event.code == KeyCode::Char('d') && ctrl {
        return AppEvent::Quit;
    }

    match key_event.code {
        KeyCode::Esc => AppEvent::EscapePressed,
        KeyCode::Tab => AppEvent::FocusNext,
        KeyCode::BackTab => AppEvent::FocusPrev,
        KeyCode::Enter if alt || ctrl => AppEvent::Submit,
        KeyCode::Enter => AppEvent::InsertNewline,
        KeyCode::Up if shift || ctrl => AppEvent::ScrollBackward(1),
        KeyCode::Down if shift || ctrl => AppEvent::ScrollForward(1),
        KeyCode::PageUp => AppEvent::ScrollBackward(PAGE_SCROLL_LINES),
        KeyCode::PageDown => AppEvent::ScrollForward(PAGE_SCROLL_LINES),
        KeyCode::Up => AppEvent::CursorUp,
        KeyCode::Down => AppEvent::CursorDown,
        KeyCode::Left => AppEvent::CursorLeft,
        KeyCode::Right => AppEvent::CursorRight,
        KeyCode::Backspace => AppEvent::Backspace,
        KeyCode::Char(c) if !ctrl && !alt => AppEvent::InputChar(c),
        _ => AppEvent::Tick,
    }
}

fn map_mouse_event(mouse_event: MouseEvent) -> AppEvent {
    match mouse_event.kind {
        MouseEventKind::ScrollUp => AppEvent::ScrollBackward(WHEEL_SCROLL_LINES),
        MouseEventKind::ScrollDown => AppEvent::ScrollForward(WHEEL_SCROLL_LINES),
        MouseEventKind::Down(MouseButton::Left) => {
            AppEvent::MouseLeftClick(mouse_event.column, mouse_event.row)
        }
        _ => AppEvent::Tick,
    }
}

pub fn next_event() -> io::Result<AppEvent> {
    if event::poll(Duration::from_millis(16))? {
        match event::read()? {
            Event::Key(key_event) => return Ok(map_key_event(key_event)),
            Event::Mouse(mouse_event) => return Ok(map_mouse_event(mouse_event)),
            Event::Resize(_, _) => return Ok(AppEvent::Resize),
            _ => {}
        }
    }

    Ok(AppEvent::Tick)
}
