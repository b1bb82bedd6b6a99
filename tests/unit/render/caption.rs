use super::*;

struct Failing;

impl TextMeasure for Failing {
    fn measure(&mut self, _text: &str) -> Option<f32> {
        None
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-3
}

fn ten_px() -> FixedAdvance {
    FixedAdvance { advance_px: 10.0 }
}

#[test]
fn wraps_greedily_within_width() {
    let lines = wrap_words("aaa bbb ccc dddd", 70.0, &mut ten_px());
    assert_eq!(lines, vec!["aaa bbb", "ccc", "dddd"]);
}

#[test]
fn long_word_stays_on_its_own_line() {
    let lines = wrap_words("a supercalifragilistic b", 50.0, &mut ten_px());
    assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
}

#[test]
fn wrap_collapses_whitespace_and_ignores_blank() {
    assert_eq!(
        wrap_words("  one \n two\tthree ", 1000.0, &mut ten_px()),
        vec!["one two three"]
    );
    assert!(wrap_words("   ", 100.0, &mut ten_px()).is_empty());
    assert!(wrap_words("", 100.0, &mut Failing).is_empty());
}

#[test]
fn failed_measurement_does_not_panic() {
    assert_eq!(wrap_words("a b c", 1.0, &mut Failing), vec!["a b c"]);
}

#[test]
fn rewrapping_wrapped_lines_is_stable() {
    let text = "The quick brown fox jumps over the lazy dog while the cat watches from afar";
    for width in [40.0, 90.0, 150.0, 400.0] {
        let lines = wrap_words(text, width, &mut ten_px());
        for line in &lines {
            assert_eq!(&wrap_words(line, width, &mut ten_px()), &vec![line.clone()]);
        }
        let again = wrap_words(&lines.join(" "), width, &mut ten_px());
        assert_eq!(again, lines);
    }
}

#[test]
fn band_geometry_matches_default_portrait_layout() {
    let canvas = Canvas::PORTRAIT_720P;
    let style = CaptionStyle::default();
    assert_eq!(style.text_box_width(canvas), 504.0);

    let layout = layout_caption("Hello", canvas, &style, &mut ten_px()).unwrap();
    assert_eq!(layout.lines, vec!["Hello"]);
    // One line: 40 + 80 padding < 150 floor.
    assert!(approx(layout.band.height(), 150.0));
    assert!(approx(layout.band.y0, 1280.0 - 256.0 - 150.0));
    assert_eq!(layout.band.x0, 0.0);
    assert_eq!(layout.band.x1, 720.0);
    assert!(approx(layout.center_x, 72.0 + 252.0));
    assert!(approx(layout.first_baseline_y, layout.band.y0 + 40.0 + 20.0));
}

#[test]
fn band_grows_with_line_count() {
    let canvas = Canvas::PORTRAIT_720P;
    let style = CaptionStyle::default();
    let text = "word ".repeat(60);
    let layout = layout_caption(&text, canvas, &style, &mut ten_px()).unwrap();
    let n = layout.lines.len();
    assert!(n >= 3);
    assert!(approx(layout.band.height(), n as f64 * 40.0 + 80.0));
    assert!(approx(layout.baseline_y(2) - layout.baseline_y(1), 40.0));
    assert!(approx(layout.band.y1, 1280.0 - 256.0));
}

#[test]
fn blank_caption_has_no_band() {
    let canvas = Canvas::PORTRAIT_720P;
    let style = CaptionStyle::default();
    assert!(layout_caption("", canvas, &style, &mut ten_px()).is_none());
    assert!(layout_caption(" \t ", canvas, &style, &mut Failing).is_none());
}

#[test]
fn style_validation() {
    assert!(CaptionStyle::default().validate().is_ok());
    let bad = CaptionStyle {
        font_size_px: 0.0,
        ..CaptionStyle::default()
    };
    assert!(bad.validate().is_err());
    let bad = CaptionStyle {
        left_margin_frac: 0.6,
        right_margin_frac: 0.5,
        ..CaptionStyle::default()
    };
    assert!(bad.validate().is_err());
}
