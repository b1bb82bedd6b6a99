use super::*;
use crate::assets::decode::ImageHandle;

fn solid(rgba: [u8; 4]) -> ImageHandle {
    let px: Vec<u8> = rgba.iter().copied().cycle().take(4 * 4 * 4).collect();
    Arc::new(PreparedImage::from_rgba8(4, 4, px).unwrap())
}

fn small_canvas() -> Canvas {
    Canvas::new(40, 40).unwrap()
}

fn small_style() -> CaptionStyle {
    CaptionStyle {
        font_size_px: 4.0,
        line_height_px: 4.0,
        min_band_height_px: 10.0,
        vertical_padding_px: 2.0,
        ..CaptionStyle::default()
    }
}

fn renderer() -> FrameRenderer {
    FrameRenderer::new(
        small_canvas(),
        small_style(),
        &CaptionFonts::default(),
        FontChoice::Neutral,
    )
    .unwrap()
}

fn steady(image: ImageHandle, text: &str) -> RenderInstruction {
    RenderInstruction {
        primary_image: image,
        primary_text: Arc::from(text),
        secondary_image: None,
        secondary_text: None,
        alpha: 1.0,
    }
}

fn pixel(surface: &Surface, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * surface.canvas().width + x) * 4) as usize;
    let d = surface.data();
    [d[i], d[i + 1], d[i + 2], d[i + 3]]
}

#[test]
fn steady_frame_covers_the_canvas() {
    let mut r = renderer();
    let mut s = Surface::new(small_canvas()).unwrap();
    let out = r.render(&mut s, &steady(solid([255, 0, 0, 255]), "")).unwrap();
    assert_eq!(out, FrameOutcome::Drawn);
    for (x, y) in [(0, 0), (39, 39), (20, 30), (39, 0)] {
        assert_eq!(pixel(&s, x, y), [255, 0, 0, 255], "pixel {x},{y}");
    }
    assert_eq!(r.font_choice(), None);
}

#[test]
fn cover_transform_fills_and_centres() {
    let canvas = Canvas::new(720, 1280).unwrap();
    // Landscape image: height drives the scale, width overflows evenly.
    let t = cover_transform(canvas, 1920, 1080);
    let [a, _, _, d, e, f] = t.as_coeffs();
    let scale = 1280.0 / 1080.0;
    assert!((a - scale).abs() < 1e-9 && (d - scale).abs() < 1e-9);
    assert!((e - (720.0 - 1920.0 * scale) / 2.0).abs() < 1e-9);
    assert!(f.abs() < 1e-9);

    // Tall image: width drives the scale.
    let t = cover_transform(canvas, 100, 1000);
    let [a, _, _, _, e, f] = t.as_coeffs();
    assert!((a - 7.2).abs() < 1e-9);
    assert!(e.abs() < 1e-9);
    assert!((f - (1280.0 - 7200.0) / 2.0).abs() < 1e-9);
}

#[test]
fn cross_fade_weights_both_sides_and_stays_opaque() {
    let mut r = renderer();
    let mut s = Surface::new(small_canvas()).unwrap();
    let instr = RenderInstruction {
        primary_image: solid([255, 0, 0, 255]),
        primary_text: Arc::from(""),
        secondary_image: Some(solid([0, 0, 255, 255])),
        secondary_text: Some(Arc::from("")),
        alpha: 0.25,
    };
    assert_eq!(r.render(&mut s, &instr).unwrap(), FrameOutcome::Drawn);
    let [red, _, blue, a] = pixel(&s, 10, 10);
    assert!(blue > red, "outgoing side dominates early in the fade");
    assert!(red > 40 && red < 90, "red weight ~0.25, got {red}");
    assert_eq!(a, 255);

    let full = RenderInstruction { alpha: 1.0, ..instr };
    r.render(&mut s, &full).unwrap();
    assert_eq!(pixel(&s, 10, 10), [255, 0, 0, 255]);
}

#[test]
fn caption_band_darkens_the_bottom_area() {
    let mut r = renderer();
    let mut s = Surface::new(small_canvas()).unwrap();
    r.render(&mut s, &steady(solid([255, 255, 255, 255]), "Hello there"))
        .unwrap();
    // band_y = 40 - 8 - 10 = 22, band height 10.
    let inside = pixel(&s, 20, 26);
    assert!(inside[0] < 200 && inside[0] > 60, "band pixel {inside:?}");
    assert_eq!(inside[3], 255);
    assert_eq!(pixel(&s, 20, 5), [255, 255, 255, 255]);
    assert_eq!(pixel(&s, 20, 36), [255, 255, 255, 255]);
}

#[test]
fn blank_caption_draws_no_band() {
    let mut r = renderer();
    let mut s = Surface::new(small_canvas()).unwrap();
    r.render(&mut s, &steady(solid([255, 255, 255, 255]), "   "))
        .unwrap();
    assert_eq!(pixel(&s, 20, 26), [255, 255, 255, 255]);
}

#[test]
fn unready_image_skips_and_keeps_previous_frame() {
    let mut r = renderer();
    let mut s = Surface::new(small_canvas()).unwrap();
    r.render(&mut s, &steady(solid([0, 255, 0, 255]), "")).unwrap();
    let before = s.data().to_vec();

    let out = r
        .render(&mut s, &steady(Arc::new(PreparedImage::unready(4, 4)), "x"))
        .unwrap();
    assert_eq!(out, FrameOutcome::Skipped);
    assert_eq!(s.data(), before.as_slice());
}

#[test]
fn identical_instructions_render_identical_pixels() {
    let mut r = renderer();
    let mut a = Surface::new(small_canvas()).unwrap();
    let mut b = Surface::new(small_canvas()).unwrap();
    let instr = steady(solid([10, 20, 30, 255]), "Same caption text");
    r.render(&mut a, &instr).unwrap();
    r.render(&mut b, &instr).unwrap();
    assert_eq!(a.data(), b.data());
}
