//! Self-contained HTML player.
//!
//! All frames are embedded as a JSON string array. A `requestAnimationFrame`
//! loop shows the next frame only once `1000 / fps` ms have elapsed since
//! the previous one. Monochrome frames are plain text set through
//! `textContent`; colored frames are `<span>` markup set through `innerHTML`.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::{Error, Result};
use crate::grid::{Animation, GlyphGrid};
use crate::render::{write_atomically, Style};

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        _ => out.push(ch),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    s.chars().for_each(|c| push_escaped(&mut out, c));
    out
}

/// Markup for one colored frame; adjacent cells sharing a color share a span.
pub fn color_frame_markup(grid: &GlyphGrid) -> String {
    let mut out = String::with_capacity(grid.size().cells() * 8);
    for y in 0..grid.height() {
        if y > 0 {
            out.push('\n');
        }
        let mut open: Option<[u8; 3]> = None;
        for (ch, color) in grid.row_cells(y) {
            if color != open {
                if open.is_some() {
                    out.push_str("</span>");
                }
                if let Some([r, g, b]) = color {
                    let _ = write!(out, "<span style=\"color:#{:02x}{:02x}{:02x}\">", r, g, b);
                }
                open = color;
            }
            push_escaped(&mut out, ch);
        }
        if open.is_some() {
            out.push_str("</span>");
        }
    }
    out
}

/// The frame strings as a JSON array safe to inline in a `<script>` block.
pub fn frames_json(animation: &Animation) -> Result<String> {
    let frames: Vec<String> = animation
        .frames
        .iter()
        .map(|grid| if grid.is_colored() { color_frame_markup(grid) } else { grid.to_text() })
        .collect();
    let json = serde_json::to_string(&frames).map_err(|e| Error::InvalidConfig(format!("serializing frames: {}", e)))?;
    // `</script>` must never appear inside the script element.
    Ok(json.replace('<', "\\u003c"))
}

/// Builds the complete HTML document.
pub fn render_html(animation: &Animation, style: &Style) -> Result<String> {
    let frames = frames_json(animation)?;
    let setter = if animation.is_colored() { "innerHTML" } else { "textContent" };
    let fps = if animation.fps.is_finite() && animation.fps > 0.0 { animation.fps } else { 30.0 };
    let background = style.background.hex();
    let foreground = style.foreground.hex();
    let title = escape_html(&style.title);
    let font_size = style.font_size;

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{
            background-color: {background};
            color: {foreground};
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            overflow: hidden;
        }}
        #ascii-display {{
            white-space: pre;
            font-family: 'Courier New', monospace;
            font-size: {font_size}px;
            line-height: 1;
            letter-spacing: 0;
        }}
    </style>
</head>
<body>
    <pre id="ascii-display"></pre>
    <script>
        const frames = {frames};
        const fps = {fps};
        const frameDelay = 1000 / fps;
        const display = document.getElementById('ascii-display');
        let currentFrame = 0;
        let lastTime = 0;

        function playAnimation(timestamp) {{
            if (!lastTime) lastTime = timestamp;
            if (timestamp - lastTime >= frameDelay) {{
                display.{setter} = frames[currentFrame];
                currentFrame = (currentFrame + 1) % frames.length;
                lastTime = timestamp;
            }}
            requestAnimationFrame(playAnimation);
        }}

        window.addEventListener('DOMContentLoaded', () => {{
            if (frames.length > 0) {{
                display.{setter} = frames[0];
                currentFrame = frames.length > 1 ? 1 : 0;
                requestAnimationFrame(playAnimation);
            }}
        }});
    </script>
</body>
</html>
"#
    ))
}

/// Renders and writes the player to `path`; an existing file is replaced only on success.
pub fn write_html(animation: &Animation, style: &Style, path: &Path) -> Result<()> {
    let html = render_html(animation, style)?;
    write_atomically(path, html.as_bytes())?;
    log::info!("wrote {} frames to {} ({} KB)", animation.len(), path.display(), html.len() / 1024);
    Ok(())
}
