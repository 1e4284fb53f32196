use std::fs;

use asciivid::estimate::estimate_range;
use asciivid::quantize::quantize_index;
use asciivid::raster::rasterize;
use asciivid::render::{html, text, write_output};
use asciivid::resample::stride;
use asciivid::{
    convert, BrightnessRange, Channel, ConvertOptions, Error, GlyphRamp, GridSize, MemorySource, Normalization,
    OutputFormat, RangeMode, Style,
};
use image::RgbImage;

fn two_frame_clip() -> MemorySource {
    MemorySource::from_gray_rows(&[vec![vec![0, 255], vec![255, 0]], vec![vec![128, 128], vec![128, 128]]], Some(30.0))
}

fn clip_options() -> ConvertOptions {
    ConvertOptions::default()
        .with_size(2, 2)
        .with_ramp(GlyphRamp::new(" .#").unwrap())
        .with_range(RangeMode::Estimate(1))
}

#[test]
fn checkerboard_then_gray_clip() {
    let mut src = two_frame_clip();
    let anim = convert(&mut src, &clip_options(), |_| {}).unwrap();

    assert_eq!(anim.len(), 2);
    assert_eq!(anim.range, BrightnessRange::new(0, 255).unwrap());
    assert_eq!(anim.frames[0].to_text(), " #\n# ");
    assert_eq!(anim.frames[1].to_text(), "..\n..");
    assert!(!anim.is_colored());
}

#[test]
fn estimated_range_covers_the_first_frame() {
    let mut src = two_frame_clip();
    let range = estimate_range(&mut src, Channel::Luma, 1).unwrap();
    assert_eq!((range.min(), range.max()), (0, 255));
}

#[test]
fn empty_sources_fail_cleanly() {
    let mut src = MemorySource::new(Vec::new(), Some(30.0));
    assert!(matches!(estimate_range(&mut src, Channel::Luma, 5), Err(Error::NoFramesAvailable)));

    let opts = clip_options().with_range(RangeMode::Full);
    assert!(matches!(convert(&mut src, &opts, |_| {}), Err(Error::NoFramesProduced)));
}

#[test]
fn quantizer_is_bounded_and_monotonic() {
    for (min, max) in [(0u8, 255u8), (40, 41), (90, 90), (10, 200)] {
        let range = BrightnessRange::new(min, max).unwrap();
        for len in [1usize, 2, 13, 70] {
            let mut last = 0;
            for sample in min..=max {
                let index = quantize_index(sample, range, len);
                assert!(index < len);
                assert!(index >= last);
                last = index;
            }
        }
    }
}

#[test]
fn rasterizer_output_matches_requested_size() {
    let norm = Normalization::new(BrightnessRange::full(), GlyphRamp::default(), Channel::Luma);
    for (w, h) in [(1, 1), (7, 3), (640, 360), (3, 500)] {
        let frame = RgbImage::from_pixel(w, h, image::Rgb([50, 100, 150]));
        for size in [GridSize::new(1, 1).unwrap(), GridSize::new(80, 24).unwrap()] {
            let grid = rasterize(&frame, &norm, size, true);
            assert_eq!(grid.size(), size);
            assert!(grid.is_colored());
        }
    }
}

#[test]
fn strides_follow_rate_ratio() {
    assert_eq!(stride(30.0, 10.0), 3);
    assert_eq!(stride(24.0, 60.0), 1);
    assert_eq!(stride(29.97, 15.0), 2);
}

#[test]
fn html_player_is_written_for_the_clip() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("clip.html");
    let anim = convert(&mut two_frame_clip(), &clip_options(), |_| {}).unwrap();

    let written = write_output(&anim, OutputFormat::Html, &Style::default(), &out, |_| {}).unwrap();
    assert_eq!(written, vec![out.clone()]);

    let page = fs::read_to_string(&out).unwrap();
    assert!(page.contains(&format!("const frames = {};", html::frames_json(&anim).unwrap())));
    assert!(page.contains("const fps = 30;"));
}

#[test]
fn color_clip_embeds_span_markup() {
    let mut src = MemorySource::new(vec![RgbImage::from_pixel(2, 1, image::Rgb([255, 0, 0]))], Some(25.0));
    let opts = ConvertOptions::default()
        .with_size(2, 1)
        .with_color(true)
        .with_range(RangeMode::Full);
    let anim = convert(&mut src, &opts, |_| {}).unwrap();

    let markup = html::color_frame_markup(&anim.frames[0]);
    assert_eq!(markup, "<span style=\"color:#ff0000\">@@</span>");
}

#[test]
fn text_frames_are_written_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let anim = convert(&mut two_frame_clip(), &clip_options(), |_| {}).unwrap();

    let written = text::write_text_frames(&anim, dir.path(), |_| {}).unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(fs::read_to_string(&written[1]).unwrap(), "..\n..\n");
}
