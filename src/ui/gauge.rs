//! Circular match gauge.
//!
//! The ring fills from a start value to its target over a fixed duration.
//! Progress is a pure function of elapsed time, so any frame source (a
//! terminal ticker, a test clock) yields the same curve.

use std::io::Write;
use std::time::Duration;

use super::results::percentage_label;

pub const DEFAULT_DURATION: Duration = Duration::from_millis(800);
pub const TRACK_COLOR: &str = "#4b5563";
pub const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingGeometry {
    pub size: f64,
    pub stroke_width: f64,
}

impl Default for RingGeometry {
    fn default() -> Self {
        Self {
            size: 160.0,
            stroke_width: 12.0,
        }
    }
}

impl RingGeometry {
    pub fn radius(&self) -> f64 {
        (self.size - self.stroke_width) / 2.0
    }

    pub fn circumference(&self) -> f64 {
        self.radius() * 2.0 * std::f64::consts::PI
    }

    /// Length of the unfilled part of the ring for `progress` percent.
    pub fn dash_offset(&self, progress: f64) -> f64 {
        let c = self.circumference();
        c - (progress.clamp(0.0, 100.0) / 100.0) * c
    }
}

/// Cubic ease-in-out over `t` in [0, 1].
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub from: f64,
    pub to: f64,
    pub duration: Duration,
}

impl Animation {
    /// Mount animation: from an empty ring to `target`.
    pub fn mount(target: f64) -> Self {
        Self {
            from: 0.0,
            to: target,
            duration: DEFAULT_DURATION,
        }
    }

    pub fn value_at(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.to;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.from + (self.to - self.from) * ease_in_out(t)
    }

    pub fn is_settled(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }
}

/// SVG ring: a track circle, a progress arc rotated to start at 12 o'clock,
/// and the rounded percentage in the middle.
pub fn render_svg(geometry: &RingGeometry, progress: f64, track_color: &str, progress_color: &str) -> String {
    let size = geometry.size;
    let center = size / 2.0;
    let radius = geometry.radius();
    let circumference = geometry.circumference();

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}">
  <g transform="rotate(-90 {center} {center})">
    <circle cx="{center}" cy="{center}" r="{radius:.3}" fill="none" stroke="{track}" stroke-width="{stroke}"/>
    <circle cx="{center}" cy="{center}" r="{radius:.3}" fill="none" stroke="{color}" stroke-width="{stroke}" stroke-dasharray="{circumference:.3}" stroke-dashoffset="{offset:.3}" stroke-linecap="round"/>
  </g>
  <text x="50%" y="50%" dominant-baseline="central" text-anchor="middle" font-family="sans-serif" font-size="{font}" font-weight="bold" fill="#e5e7eb">{label}</text>
</svg>
"##,
        size = size,
        center = center,
        radius = radius,
        track = track_color,
        stroke = geometry.stroke_width,
        color = progress_color,
        circumference = circumference,
        offset = geometry.dash_offset(progress),
        font = size * 0.1875,
        label = percentage_label(progress),
    )
}

/// One-line terminal rendition of the ring.
pub fn render_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!(
        "[{}{}] {:>4}",
        "█".repeat(filled),
        "░".repeat(width - filled),
        percentage_label(progress)
    )
}

/// Plays `animation` on `out`, redrawing one line per `frame` tick and
/// ending on the settled value.
pub async fn play<W, F>(animation: &Animation, out: &mut W, frame: Duration, render: F) -> std::io::Result<()>
where
    W: Write,
    F: Fn(f64) -> String,
{
    let start = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(frame);

    loop {
        ticker.tick().await;
        let elapsed = start.elapsed();
        write!(out, "\r{}", render(animation.value_at(elapsed)))?;
        out.flush()?;
        if animation.is_settled(elapsed) {
            break;
        }
    }

    writeln!(out)?;
    Ok(())
}
