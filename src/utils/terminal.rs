pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[90m";

const BOX_WIDTH: usize = 60; // Total width including borders
const CONTENT_WIDTH: usize = BOX_WIDTH - 4; // Width for content (excluding "║  " and "  ║")

/// Builds a framed box with the given lines.
/// Empty strings create empty lines, other strings are centered within the box
pub fn boxed(lines: &[&str]) -> String {
    let mut out = String::new();
    out.push_str(&format!("\x1b[36m╔{}╗\n", "═".repeat(BOX_WIDTH - 2)));

    for line in lines {
        if line.is_empty() {
            out.push_str(&format!("║{}║\n", " ".repeat(BOX_WIDTH - 2)));
            continue;
        }

        // Visible length excludes ANSI escape codes
        let visible_len = strip_ansi_codes(line).chars().count();

        if visible_len < CONTENT_WIDTH {
            let total_padding = CONTENT_WIDTH - visible_len;
            let left_padding = total_padding / 2;
            let right_padding = total_padding - left_padding;

            out.push_str(&format!(
                "║  {}{}{}\x1b[36m║\n",
                " ".repeat(left_padding),
                line,
                " ".repeat(right_padding)
            ));
        } else {
            // Text is too long, just fit it
            out.push_str(&format!("║  {}\x1b[36m  ║\n", line));
        }
    }

    out.push_str(&format!("╚{}╝{}", "═".repeat(BOX_WIDTH - 2), RESET));
    out
}

/// The application banner; plain text when `color` is off.
pub fn banner(color: bool) -> String {
    let framed = boxed(&[
        "",
        "\x1b[1m\x1b[34m AI Resume Reviewer \x1b[0m",
        "",
        "\x1b[0m Compare your resume against job requirements \x1b[0m",
        "",
    ]);
    if color {
        framed
    } else {
        strip_ansi_codes(&framed)
    }
}

/// Prints the application banner to stderr
pub fn print_banner(color: bool) {
    eprintln!("\n{}\n", banner(color));
}

/// Moves the cursor up `count` lines and clears everything below it.
pub fn erase_lines(count: usize) -> String {
    format!("\x1b[{}F\x1b[J", count)
}

/// Strips ANSI escape codes to calculate visible text length
pub fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::new();
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            // Skip escape sequence
            if chars.next() == Some('[') {
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Foreground escape for a `#rrggbb` color. Falls back to no styling on malformed input.
pub fn fg_hex(hex: &str) -> String {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return String::new();
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => format!("\x1b[38;2;{};{};{}m", r, g, b),
        _ => String::new(),
    }
}
