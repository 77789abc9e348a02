//! Grid invariants and round-trip laws, checked against the public
//! `Terminal`/`Screen` surface after various mutations.

use vtcore::{Position, Terminal, TerminalConfig};

static TRACING: std::sync::Once = std::sync::Once::new();

fn terminal(rows: u16, cols: u16) -> Terminal {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "vtcore=debug".into()),
            )
            .with_test_writer()
            .init();
    });
    Terminal::new(rows, cols, TerminalConfig::default())
}

#[test]
fn ring_indices_between_delta_and_next_are_all_readable() {
    let mut term = terminal(4, 10);
    for i in 0..50 {
        term.feed(format!("line {i}\r\n").as_bytes());
    }
    let screen = term.screen();
    let (delta, next) = (screen.row_data.delta(), screen.row_data.next());
    assert!(next > delta);
    for i in delta..next {
        let row = screen.row_data.get(i);
        assert!(row.len() <= screen.cols as usize);
    }
}

#[test]
fn scroll_delta_stays_between_ring_delta_and_insert_delta() {
    let mut term = terminal(4, 10);
    for i in 0..20 {
        term.feed(format!("line {i}\r\n").as_bytes());
    }
    let screen = term.screen();
    assert!(screen.row_data.delta() <= screen.scroll_delta);
    assert!(screen.scroll_delta <= screen.insert_delta);
    assert!(screen.insert_delta <= screen.row_data.next());
}

#[test]
fn a_wide_cell_is_always_followed_by_its_fragment() {
    let mut term = terminal(3, 10);
    term.feed("A\u{4e2d}B".as_bytes());
    let row = term.screen().visible_row(0);
    let wide_col = 1;
    assert_eq!(row.cells[wide_col].columns, 2);
    assert!(!row.cells[wide_col].is_fragment());
    assert_eq!(row.cells[wide_col + 1].columns, 2);
    assert!(row.cells[wide_col + 1].is_fragment());
    assert_eq!(row.cells[wide_col + 1].unistr, row.cells[wide_col].unistr);
}

#[test]
fn combining_marks_never_attach_to_a_fragment_or_column_zero() {
    let mut term = terminal(3, 10);
    // A mark at column 0 with nothing above it is dropped, not attached.
    term.feed("\u{0301}x".as_bytes());
    let row = term.screen().visible_row(0);
    assert_eq!(row.cells[0].unistr, vtcore::UniStr::Scalar('x'));
}

#[test]
fn a_soft_wrapped_row_always_reports_the_full_grid_width() {
    let mut term = terminal(3, 5);
    term.feed(b"abcdefg");
    let row = term.screen().visible_row(0);
    assert!(row.soft_wrapped);
    assert_eq!(row.cells.len(), term.screen().cols as usize);
}

#[test]
fn overstrike_with_the_same_character_is_idempotent() {
    let mut a = terminal(3, 10);
    a.feed(b"x");

    let mut b = terminal(3, 10);
    b.feed(b"x\x08x"); // print, backspace, print the same char again

    let row_a = a.screen().visible_row(0);
    let row_b = b.screen().visible_row(0);
    assert_eq!(row_a.cells[0].unistr, row_b.cells[0].unistr);
    assert_eq!(a.cursor_position().col, b.cursor_position().col);
}

#[test]
fn scroll_region_bottom_linefeed_leaves_the_ring_size_unchanged() {
    let mut term = terminal(6, 10);
    term.feed(b"\x1b[2;4r"); // region rows 1..=3 (0-based)
    term.feed(b"\x1b[4;1H"); // cursor to row 3 (0-based)
    let screen = term.screen();
    let (delta_before, next_before) = (screen.row_data.delta(), screen.row_data.next());

    term.feed(b"\n");

    let screen = term.screen();
    assert_eq!(screen.row_data.delta(), delta_before);
    assert_eq!(screen.row_data.next(), next_before);
}

#[test]
fn switching_to_the_alternate_screen_never_grows_its_scrollback() {
    let mut term = terminal(4, 10);
    term.feed(b"\x1b[?1049h");
    for i in 0..30 {
        term.feed(format!("line {i}\r\n").as_bytes());
    }
    let screen = term.screen();
    assert_eq!(screen.row_data.next() - screen.row_data.delta(), 4);
}

#[test]
fn leaving_the_alternate_screen_restores_the_cursor_byte_for_byte() {
    let mut term = terminal(4, 10);
    term.feed(b"hello");
    let before = term.cursor_position();

    term.feed(b"\x1b[?1049h");
    term.feed(b"\x1b[3;3Hxyz");
    term.feed(b"\x1b[?1049l");

    assert_eq!(term.cursor_position(), before);
}

#[test]
fn round_tripping_plain_text_through_get_text_range_reproduces_it() {
    let mut term = terminal(3, 20);
    term.feed(b"the quick fox");
    let text = term.get_text_range(
        Position::new(term.screen().absolute(0), 0),
        Position::new(term.screen().absolute(0), 20),
        false,
    );

    let mut replay = terminal(3, 20);
    replay.feed(text.as_bytes());
    let replayed = replay.get_text_range(
        Position::new(replay.screen().absolute(0), 0),
        Position::new(replay.screen().absolute(0), 20),
        false,
    );
    assert_eq!(replayed, text);
}

#[test]
fn writing_exactly_at_the_right_margin_defers_the_wrap_to_the_next_character() {
    let mut term = terminal(3, 5);
    term.feed(b"abcde");
    // The margin character itself must not have triggered the wrap yet.
    assert!(!term.screen().visible_row(0).soft_wrapped);
    assert_eq!(term.cursor_position().col, 5);

    term.feed(b"f");
    assert!(term.screen().visible_row(0).soft_wrapped);
    assert_eq!(term.screen().visible_row(1).cells[0].unistr, vtcore::UniStr::Scalar('f'));
}
