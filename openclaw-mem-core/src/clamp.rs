//! Deterministic clamping of free-form text before it is sent to an
//! external embedding provider (spec §4.4).

use serde::{Deserialize, Serialize};

/// Marker inserted between head and tail when both are kept.
pub const MARKER: &str = "\n...\n";

/// Clamping knobs (spec §4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClampConfig {
    pub max_chars: usize,
    pub head_chars: usize,
    #[serde(default)]
    pub max_bytes: Option<usize>,
}

impl Default for ClampConfig {
    fn default() -> Self {
        Self {
            max_chars: 8000,
            head_chars: 2000,
            max_bytes: Some(32_000),
        }
    }
}

/// The clamping fields reported back to the caller (spec §4.4 step 4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClampResult {
    pub text: String,
    pub original_chars: usize,
    pub original_bytes: usize,
    pub clamped_chars: usize,
    pub clamped_bytes: usize,
    pub clipped: bool,
}

/// Clamp `text` per the spec §4.4 algorithm. Idempotent:
/// `clamp(clamp(t).text, cfg) == clamp(t, cfg)` (modulo the `original_*`
/// fields, which always describe the immediate input).
#[must_use]
pub fn clamp(text: &str, config: &ClampConfig) -> ClampResult {
    let original_chars = text.chars().count();
    let original_bytes = text.len();

    let within_bytes = config.max_bytes.is_none_or(|mb| original_bytes <= mb);
    if original_chars <= config.max_chars && within_bytes {
        return ClampResult {
            text: text.to_string(),
            original_chars,
            original_bytes,
            clamped_chars: original_chars,
            clamped_bytes: original_bytes,
            clipped: false,
        };
    }

    let chars: Vec<char> = text.chars().collect();
    let marker_chars = MARKER.chars().count();
    let uses_marker = config.head_chars > 0;

    let (mut head, mut tail): (Vec<char>, Vec<char>) = if uses_marker {
        let head_len = config.head_chars.min(chars.len());
        let tail_len = config
            .max_chars
            .saturating_sub(head_len)
            .saturating_sub(marker_chars);
        let tail_start = chars.len().saturating_sub(tail_len);
        let tail_start = tail_start.max(head_len);
        (chars[..head_len].to_vec(), chars[tail_start..].to_vec())
    } else {
        let start = chars.len().saturating_sub(config.max_chars);
        (Vec::new(), chars[start..].to_vec())
    };

    let mut output = assemble(&head, &tail, uses_marker);

    if let Some(max_bytes) = config.max_bytes {
        // Shrink the tail from its front (keeping the trailing suffix)
        // before touching the head, then shrink the head from its end
        // (keeping the leading prefix). Removing whole `char`s never
        // splits a UTF-8 code point.
        while output.len() > max_bytes && !tail.is_empty() {
            tail.remove(0);
            output = assemble(&head, &tail, uses_marker);
        }
        while output.len() > max_bytes && !head.is_empty() {
            head.pop();
            output = assemble(&head, &tail, uses_marker);
        }
    }

    ClampResult {
        clamped_chars: output.chars().count(),
        clamped_bytes: output.len(),
        text: output,
        original_chars,
        original_bytes,
        clipped: true,
    }
}

fn assemble(head: &[char], tail: &[char], uses_marker: bool) -> String {
    if uses_marker {
        let mut s = String::with_capacity(head.len() + MARKER.len() + tail.len() * 2);
        s.extend(head);
        s.push_str(MARKER);
        s.extend(tail);
        s
    } else {
        tail.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_passes_through_unchanged() {
        let config = ClampConfig {
            max_chars: 100,
            head_chars: 10,
            max_bytes: None,
        };
        let result = clamp("hello world", &config);
        assert!(!result.clipped);
        assert_eq!(result.text, "hello world");
    }

    #[test]
    fn spec_example_head_and_tail() {
        let input = format!("{}{}", "A".repeat(100), "TAIL".repeat(30));
        let config = ClampConfig {
            max_chars: 40,
            head_chars: 8,
            max_bytes: None,
        };
        let result = clamp(&input, &config);
        assert_eq!(result.clamped_chars, 40);
        assert!(result.text.starts_with("AAAAAAAA"));
        assert!(result.text.contains(MARKER));
        let expected_tail: String = input.chars().rev().take(27).collect::<Vec<_>>().into_iter().rev().collect();
        assert!(result.text.ends_with(&expected_tail));
        assert!(result.clipped);
    }

    #[test]
    fn zero_head_chars_keeps_only_tail() {
        let input = "x".repeat(100);
        let config = ClampConfig {
            max_chars: 40,
            head_chars: 0,
            max_bytes: None,
        };
        let result = clamp(&input, &config);
        assert_eq!(result.clamped_chars, 40);
        assert!(!result.text.contains(MARKER));
    }

    #[test]
    fn byte_clamp_never_splits_a_code_point() {
        // Multi-byte characters throughout so any mid-character split
        // would produce invalid UTF-8 and this test itself would panic
        // building `result.text` (String must always be valid UTF-8).
        let input = "\u{1F600}".repeat(200); // 4-byte emoji each
        let config = ClampConfig {
            max_chars: 100,
            head_chars: 20,
            max_bytes: Some(50),
        };
        let result = clamp(&input, &config);
        assert!(result.clamped_bytes <= 50);
        assert!(result.clipped);
        // Valid UTF-8 is guaranteed by the type; re-parse as a sanity check.
        assert!(std::str::from_utf8(result.text.as_bytes()).is_ok());
    }

    #[test]
    fn clamping_is_idempotent() {
        let input = format!("{}{}", "A".repeat(100), "TAIL".repeat(30));
        let config = ClampConfig {
            max_chars: 40,
            head_chars: 8,
            max_bytes: Some(35),
        };
        let once = clamp(&input, &config);
        let twice = clamp(&once.text, &config);
        assert_eq!(once.text, twice.text);
        assert_eq!(twice.clipped, false);
    }
}
