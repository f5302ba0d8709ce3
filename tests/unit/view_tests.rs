use super::*;
use std::panic::{AssertUnwindSafe, catch_unwind};

use ratatui::style::Modifier;

fn line_text(line: &Line<'static>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}

fn numbered_lines(count: usize) -> String {
    (0..count).map(|n| format!("line {n}\n")).collect()
}

#[test]
fn new_view_is_empty_and_following() {
    let view = StreamingProcessView::new("claude-1");
    assert_eq!(view.process_id(), "claude-1");
    assert_eq!(view.phase(), ViewPhase::Empty);
    assert!(view.auto_scroll());
    assert_eq!(view.scroll(), 0);
    assert!(view.display().is_empty());
    assert!(view.input_text().is_empty());
}

#[test]
fn first_update_streams_the_full_text() {
    let mut view = StreamingProcessView::new("a");
    view.update_content("alpha\nbeta\n");
    assert_eq!(view.phase(), ViewPhase::Streaming);
    assert_eq!(view.display_line_count(), 2);
    assert_eq!(line_text(&view.display()[0]), "alpha");
    assert_eq!(line_text(&view.display()[1]), "beta");
    assert_eq!(view.last_rendered_text(), "alpha\nbeta\n");
}

#[test]
fn equal_update_is_a_no_op() {
    let mut view = StreamingProcessView::new("a");
    view.update_content("one\ntwo\n");
    view.update_content("one\ntwo\n");
    assert_eq!(view.display_line_count(), 2);
    assert_eq!(view.phase(), ViewPhase::Streaming);
}

#[test]
fn growth_appends_only_the_new_suffix() {
    let mut view = StreamingProcessView::new("a");
    view.update_content("one\n");
    view.update_content("one\ntwo\nthree\n");
    assert_eq!(view.phase(), ViewPhase::Streaming);
    assert_eq!(view.display_line_count(), 3);
    assert_eq!(line_text(&view.display()[0]), "one");
    assert_eq!(line_text(&view.display()[2]), "three");
}

#[test]
fn mid_line_growth_starts_a_new_display_line() {
    let mut view = StreamingProcessView::new("a");
    view.update_content("partial");
    view.update_content("partial plus\n");
    assert_eq!(view.display_line_count(), 2);
    assert_eq!(line_text(&view.display()[0]), "partial");
    assert_eq!(line_text(&view.display()[1]), " plus");
}

#[test]
fn divergent_update_replaces_the_display() {
    let mut view = StreamingProcessView::new("a");
    view.update_content("one\ntwo\n");
    view.update_content("zebra\n");
    assert_eq!(view.phase(), ViewPhase::Replaced);
    assert_eq!(view.display_line_count(), 1);
    assert_eq!(line_text(&view.display()[0]), "zebra");
}

#[test]
fn truncated_update_replaces_the_display() {
    let mut view = StreamingProcessView::new("a");
    view.update_content("one\ntwo\n");
    view.update_content("one\n");
    assert_eq!(view.phase(), ViewPhase::Replaced);
    assert_eq!(view.display_line_count(), 1);
}

#[test]
fn empty_replacement_clears_the_display() {
    let mut view = StreamingProcessView::new("a");
    view.update_content("one\n");
    view.update_content("");
    assert_eq!(view.phase(), ViewPhase::Replaced);
    assert!(view.display().is_empty());
    assert_eq!(view.last_rendered_text(), "");
}

#[test]
fn replaced_view_streams_again_on_growth() {
    let mut view = StreamingProcessView::new("a");
    view.update_content("one\n");
    view.update_content("zebra\n");
    assert_eq!(view.phase(), ViewPhase::Replaced);
    view.update_content("zebra\nmore\n");
    assert_eq!(view.phase(), ViewPhase::Streaming);
    assert_eq!(view.display_line_count(), 2);
}

#[test]
fn markdown_fragments_gain_styling() {
    let mut view = StreamingProcessView::new("a");
    view.update_content("**done**\n");
    let all_text: String = view.display().iter().map(line_text).collect();
    assert!(all_text.contains("done"));
    assert!(!all_text.contains('*'));
    assert!(
        view.display()
            .iter()
            .flat_map(|line| line.spans.iter())
            .any(|span| span.style.add_modifier.contains(Modifier::BOLD))
    );
}

#[test]
fn follow_pins_to_the_end_as_content_grows() {
    let mut view = StreamingProcessView::new("a");
    view.update_content(&numbered_lines(30));
    view.apply_follow(10);
    assert_eq!(view.scroll(), 20);
    view.update_content(&numbered_lines(35));
    view.apply_follow(10);
    assert_eq!(view.scroll(), 25);
}

#[test]
fn backward_gesture_unpins_the_view() {
    let mut view = StreamingProcessView::new("a");
    view.update_content(&numbered_lines(30));
    view.apply_follow(10);

    view.scroll_backward(5);
    assert_eq!(view.scroll(), 15);
    assert!(!view.auto_scroll());
    view.apply_follow(10);
    assert_eq!(view.scroll(), 15);

    view.scroll_backward(100);
    assert_eq!(view.scroll(), 0);
}

#[test]
fn forward_gesture_repins_only_at_the_end() {
    let mut view = StreamingProcessView::new("a");
    view.update_content(&numbered_lines(30));
    view.apply_follow(10);
    view.scroll_backward(5);

    view.scroll_forward(2, 20);
    assert_eq!(view.scroll(), 17);
    assert!(!view.auto_scroll());

    view.scroll_forward(10, 20);
    assert_eq!(view.scroll(), 20);
    assert!(view.auto_scroll());
}

#[test]
fn forward_gesture_with_nothing_to_scroll_keeps_following() {
    let mut view = StreamingProcessView::new("a");
    view.update_content("one\n");
    view.scroll_backward(1);
    assert!(!view.auto_scroll());
    view.scroll_forward(1, 0);
    assert_eq!(view.scroll(), 0);
    assert!(view.auto_scroll());
}

#[test]
fn submit_forwards_id_and_text_then_clears() {
    let mut view = StreamingProcessView::new("claude-1");
    for ch in "run it".chars() {
        view.input_char(ch);
    }
    let mut seen: Option<(String, String)> = None;
    assert!(view.submit_to(|id, text| seen = Some((id.to_string(), text.to_string()))));
    assert_eq!(
        seen,
        Some(("claude-1".to_string(), "run it".to_string()))
    );
    assert_eq!(view.input_text(), "");
    assert_eq!(view.input_cursor(), 0);
}

#[test]
fn empty_input_does_not_fire_the_handler() {
    let mut view = StreamingProcessView::new("a");
    let mut fired = false;
    assert!(!view.submit_to(|_, _| fired = true));
    assert!(!fired);
}

#[test]
fn input_is_cleared_even_when_the_handler_panics() {
    let mut view = StreamingProcessView::new("a");
    view.input_char('x');
    let result = catch_unwind(AssertUnwindSafe(|| {
        view.submit_to(|_, _| panic!("handler failure"));
    }));
    assert!(result.is_err());
    assert_eq!(view.input_text(), "");
    assert_eq!(view.input_cursor(), 0);
}

#[test]
fn inserts_and_deletes_at_the_cursor() {
    let mut view = StreamingProcessView::new("a");
    view.input_char('a');
    view.input_char('c');
    view.move_cursor_left();
    view.input_char('b');
    assert_eq!(view.input_text(), "abc");
    assert_eq!(view.input_cursor(), 2);
    view.backspace();
    assert_eq!(view.input_text(), "ac");
    assert_eq!(view.input_cursor(), 1);
}

#[test]
fn backspace_at_the_start_is_a_no_op() {
    let mut view = StreamingProcessView::new("a");
    view.backspace();
    assert_eq!(view.input_text(), "");
    view.input_char('x');
    view.move_cursor_left();
    view.backspace();
    assert_eq!(view.input_text(), "x");
}

#[test]
fn cursor_motion_clamps_at_both_ends() {
    let mut view = StreamingProcessView::new("a");
    view.input_char('h');
    view.input_char('i');
    view.move_cursor_right();
    assert_eq!(view.input_cursor(), 2);
    view.move_cursor_left();
    view.move_cursor_left();
    view.move_cursor_left();
    assert_eq!(view.input_cursor(), 0);
}

#[test]
fn cursor_moves_up_and_down_over_wrapped_rows() {
    let mut view = StreamingProcessView::new("a");
    for ch in "abcdefghij".chars() {
        view.input_char(ch);
    }
    assert_eq!(view.input_cursor_line_col(4), (2, 2));
    view.move_cursor_up(4);
    assert_eq!(view.input_cursor_line_col(4), (1, 2));
    view.move_cursor_up(4);
    assert_eq!(view.input_cursor_line_col(4), (0, 2));
    view.move_cursor_down(4);
    assert_eq!(view.input_cursor_line_col(4), (1, 2));
}

#[test]
fn goal_column_survives_a_short_middle_row() {
    let mut view = StreamingProcessView::new("a");
    for ch in "abcd\nx\nefgh".chars() {
        view.input_char(ch);
    }
    while view.input_cursor() > 0 {
        view.move_cursor_left();
    }
    view.move_cursor_right();
    view.move_cursor_right();
    view.move_cursor_right();
    assert_eq!(view.input_cursor_line_col(10), (0, 3));

    view.move_cursor_down(10);
    assert_eq!(view.input_cursor_line_col(10), (1, 1));
    view.move_cursor_down(10);
    assert_eq!(view.input_cursor_line_col(10), (2, 3));
}

#[test]
fn newline_input_moves_the_cursor_to_a_fresh_row() {
    let mut view = StreamingProcessView::new("a");
    view.input_char('a');
    view.input_char('b');
    view.insert_newline();
    view.input_char('c');
    assert_eq!(view.input_text(), "ab\nc");
    assert_eq!(view.input_cursor_line_col(10), (1, 1));
}
