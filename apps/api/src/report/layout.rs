//! Text measurement and wrapping for the analysis page.
//!
//! Widths are the Helvetica AFM advance widths in em units, covering ASCII
//! 0x20..=0x7E. Index = (char as usize) - 32. Anything outside that range is
//! measured with `AVERAGE_WIDTH`.

// ────────────────────────────────────────────────────────────────────────────
// Metrics
// ────────────────────────────────────────────────────────────────────────────

#[rustfmt::skip]
const HELVETICA_WIDTHS: [f32; 95] = [
    // sp    !      "      #      $      %      &      '
    0.278, 0.278, 0.355, 0.556, 0.556, 0.889, 0.667, 0.191,
    // (     )      *      +      ,      -      .      /
    0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
    // 0-9
    0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
    // :     ;      <      =      >      ?      @
    0.278, 0.278, 0.584, 0.584, 0.584, 0.556, 1.015,
    // A     B      C      D      E      F      G      H      I      J      K      L      M
    0.667, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.500, 0.667, 0.556, 0.833,
    // N     O      P      Q      R      S      T      U      V      W      X      Y      Z
    0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
    // [     \      ]      ^      _      `
    0.278, 0.278, 0.278, 0.469, 0.556, 0.333,
    // a     b      c      d      e      f      g      h      i      j      k      l      m
    0.556, 0.556, 0.500, 0.556, 0.556, 0.278, 0.556, 0.556, 0.222, 0.222, 0.500, 0.222, 0.833,
    // n     o      p      q      r      s      t      u      v      w      x      y      z
    0.556, 0.556, 0.556, 0.556, 0.333, 0.500, 0.278, 0.556, 0.500, 0.722, 0.500, 0.500, 0.500,
    // {     |      }      ~
    0.334, 0.260, 0.334, 0.584,
];

const AVERAGE_WIDTH: f32 = 0.556;
const SPACE_WIDTH: f32 = 0.278;

/// Rendered width of `s` in em units.
pub fn measure_em(s: &str) -> f32 {
    s.chars()
        .map(|c| {
            let code = c as usize;
            if (32..=126).contains(&code) {
                HELVETICA_WIDTHS[code - 32]
            } else {
                AVERAGE_WIDTH
            }
        })
        .sum()
}

// ────────────────────────────────────────────────────────────────────────────
// Wrapping
// ────────────────────────────────────────────────────────────────────────────

/// Greedy word wrap to `max_em`. Input line breaks start new lines; blank
/// input lines are kept as empty output lines. Words wider than a full line
/// are split across lines.
pub fn wrap_text(text: &str, max_em: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        if paragraph.trim().is_empty() {
            // Collapse runs of blank lines into one.
            if lines.last().is_some_and(|l: &String| !l.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }

        let mut current = String::new();
        let mut current_width = 0.0_f32;

        for word in paragraph.split_whitespace() {
            for piece in split_long_word(word, max_em) {
                let piece_width = measure_em(&piece);
                if current.is_empty() {
                    current = piece;
                    current_width = piece_width;
                } else if current_width + SPACE_WIDTH + piece_width > max_em {
                    lines.push(std::mem::take(&mut current));
                    current = piece;
                    current_width = piece_width;
                } else {
                    current.push(' ');
                    current.push_str(&piece);
                    current_width += SPACE_WIDTH + piece_width;
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

fn split_long_word(word: &str, max_em: f32) -> Vec<String> {
    if measure_em(word) <= max_em {
        return vec![word.to_string()];
    }
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut width = 0.0_f32;
    for c in word.chars() {
        let w = measure_em(c.encode_utf8(&mut [0; 4]));
        if !piece.is_empty() && width + w > max_em {
            pieces.push(std::mem::take(&mut piece));
            width = 0.0;
        }
        piece.push(c);
        width += w;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

// ────────────────────────────────────────────────────────────────────────────
// Encoding
// ────────────────────────────────────────────────────────────────────────────

/// Maps text to WinAnsiEncoding bytes for the standard Type1 fonts.
/// Latin-1 passes through; common typographic punctuation maps to its
/// WinAnsi slot; everything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_em_empty_is_zero() {
        assert_eq!(measure_em(""), 0.0);
    }

    #[test]
    fn test_measure_em_known_glyphs() {
        assert!((measure_em("Hi") - (0.722 + 0.222)).abs() < 1e-6);
        assert!((measure_em("é") - AVERAGE_WIDTH).abs() < 1e-6);
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "Quantify the impact of each backend project you list. ".repeat(20);
        let lines = wrap_text(&text, 40.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(measure_em(line) <= 40.0, "line too wide: {line}");
        }
    }

    #[test]
    fn test_wrap_keeps_every_word() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let lines = wrap_text(text, 8.0);
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_preserves_paragraphs() {
        let lines = wrap_text("First point.\n\n\n\nSecond point.\n\n", 60.0);
        assert_eq!(lines, vec!["First point.", "", "Second point."]);
    }

    #[test]
    fn test_wrap_splits_overlong_word() {
        let word = "x".repeat(200);
        let lines = wrap_text(&word, 10.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Score: 82%"), b"Score: 82%".to_vec());
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("\u{2022} it\u{2019}s"), vec![0x95, b' ', b'i', b't', 0x92, b's']);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
        assert_eq!(encode_win_ansi("a\tb"), b"ab".to_vec());
    }
}
