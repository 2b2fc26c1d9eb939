//! WebVTT cleanup and parsing.
//!
//! Models are asked for bare WebVTT but regularly wrap it in markdown fences or
//! open with a sentence of chatter. [`sanitize_transcript`] removes both;
//! [`parse_cues`] is a lenient reader used to sanity-check what was written.

/// Literal first line of every WebVTT document
pub const HEADER: &str = "WEBVTT";

/// File extension of the subtitle output
pub const EXTENSION: &str = "vtt";

/// Where the header ended up after cleaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    /// The text already started with the header
    Present,
    /// Leading text before the first header was discarded
    Recovered,
    /// No header anywhere; the text is kept as-is
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedTranscript {
    pub content: String,
    pub header: HeaderStatus,
}

/// A single timed caption
#[derive(Debug, Clone, PartialEq)]
pub struct VttCue {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    pub text: String,
}

/// Remove markdown code-fence markers and surrounding whitespace
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```vtt", "").replace("```", "").trim().to_string()
}

/// Normalize raw model output into a WebVTT document.
///
/// When the header never appears the fence-stripped text is returned
/// unchanged; callers decide whether to warn.
pub fn sanitize_transcript(raw: &str) -> SanitizedTranscript {
    let cleaned = strip_code_fences(raw);

    if cleaned.starts_with(HEADER) {
        return SanitizedTranscript {
            content: cleaned,
            header: HeaderStatus::Present,
        };
    }

    match cleaned.find(HEADER) {
        Some(start) => SanitizedTranscript {
            content: cleaned[start..].to_string(),
            header: HeaderStatus::Recovered,
        },
        None => SanitizedTranscript {
            content: cleaned,
            header: HeaderStatus::Missing,
        },
    }
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds
fn parse_timestamp(raw: &str) -> Option<f64> {
    let (clock, millis) = raw.trim().split_once('.')?;
    if millis.len() != 3 || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let fields: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match fields.as_slice() {
        [h, m, s] if h.len() >= 2 => (*h, *m, *s),
        [m, s] => ("0", *m, *s),
        _ => return None,
    };
    if minutes.len() != 2 || seconds.len() != 2 {
        return None;
    }

    let hours: u64 = hours.parse().ok()?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    let millis: u64 = millis.parse().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    // Hours come from the model and have no digit limit
    let total = hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)?;
    Some(total as f64 + millis as f64 / 1000.0)
}

/// Parse a timing line such as `00:00:01.000 --> 00:00:02.500 align:start`
fn parse_timing(line: &str) -> Option<(f64, f64)> {
    let (start, end) = line.split_once("-->")?;
    let start = start.split_whitespace().next()?;
    let end = end.split_whitespace().next()?;
    Some((parse_timestamp(start)?, parse_timestamp(end)?))
}

/// Leniently read the cues of a WebVTT document.
///
/// Cue identifiers and cue settings are accepted, blocks with malformed
/// timing are skipped rather than rejected.
pub fn parse_cues(text: &str) -> Vec<VttCue> {
    let lines: Vec<&str> = text.lines().collect();
    let mut cues = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() || line.starts_with(HEADER) {
            i += 1;
            continue;
        }

        // A line without an arrow may be a cue identifier
        let timing_line = if line.contains("-->") {
            line
        } else {
            i += 1;
            lines.get(i).map(|l| l.trim()).unwrap_or("")
        };

        let Some((start, end)) = parse_timing(timing_line) else {
            i += 1;
            continue;
        };

        i += 1;
        let mut text_lines = Vec::new();
        while i < lines.len() && !lines[i].trim().is_empty() {
            text_lines.push(lines[i]);
            i += 1;
        }

        cues.push(VttCue {
            start,
            end,
            text: text_lines.join("\n").trim().to_string(),
        });
    }

    cues
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\nHello";

    #[test]
    fn test_fenced_output_is_unwrapped() {
        let raw = "```vtt\nWEBVTT\n\n00:00:00.000 --> 00:00:02.000\nHello\n```";
        let sanitized = sanitize_transcript(raw);

        assert_eq!(sanitized.content, VALID);
        assert_eq!(sanitized.header, HeaderStatus::Present);
    }

    #[test]
    fn test_plain_fences_are_stripped() {
        let raw = format!("```\n{}\n```\n", VALID);
        assert_eq!(sanitize_transcript(&raw).content, VALID);
    }

    #[test]
    fn test_chatty_preamble_is_discarded() {
        let raw = "Sure, here it is:\nWEBVTT\n\n00:00:00.000 --> 00:00:01.000\nHi";
        let sanitized = sanitize_transcript(raw);

        assert_eq!(sanitized.header, HeaderStatus::Recovered);
        assert_eq!(sanitized.content, "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nHi");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            VALID.to_string(),
            format!("{}\n\n00:00:02.000 --> 00:00:04.000\nWorld\n", VALID),
            "WEBVTT".to_string(),
        ];

        for input in inputs {
            let once = sanitize_transcript(&input).content;
            let twice = sanitize_transcript(&once).content;
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_missing_header_falls_back_to_input() {
        let raw = "I could not hear any speech in this file.";
        let sanitized = sanitize_transcript(raw);

        assert_eq!(sanitized.header, HeaderStatus::Missing);
        assert_eq!(sanitized.content, raw);
        assert_eq!(sanitize_transcript("").content, "");
    }

    #[test]
    fn test_parse_cues() {
        let doc = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\nHello\nthere\n\n00:00:02.500 --> 00:00:04.000\nWorld\n";
        let cues = parse_cues(doc);

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "Hello\nthere");
        assert_eq!(cues[1].start, 2.5);
        assert_eq!(cues[1].end, 4.0);
    }

    #[test]
    fn test_parse_cues_with_identifiers_and_settings() {
        let doc = "WEBVTT - generated\r\n\r\nintro\r\n01:02:03.004 --> 01:02:05.000 align:start position:10%\r\nHi\r\n";
        let cues = parse_cues(doc);

        assert_eq!(cues.len(), 1);
        assert!((cues[0].start - 3723.004).abs() < 1e-9);
        assert_eq!(cues[0].text, "Hi");
    }

    #[test]
    fn test_parse_cues_short_timestamps() {
        let cues = parse_cues("WEBVTT\n\n00:01.000 --> 00:02.000\nShort");
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start, 1.0);
    }

    #[test]
    fn test_parse_cues_rejects_oversized_hours() {
        let doc = "WEBVTT\n\n18446744073709551615:00:00.000 --> 18446744073709551615:00:01.000\nHi\n\n\
                   99999999999999999999:00:00.000 --> 99999999999999999999:00:01.000\nHo";
        assert!(parse_cues(doc).is_empty());

        let cues = parse_cues("WEBVTT\n\n1000:00:00.000 --> 1000:00:01.000\nLong");
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start, 3_600_000.0);
    }

    #[test]
    fn test_parse_cues_skips_malformed_timing() {
        let doc = "WEBVTT\n\n0:0:1 --> 00:00:02.000\nBad\n\n00:00:03.000 --> 00:00:04.000\nGood";
        let cues = parse_cues(doc);

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Good");
        assert!(parse_cues("no subtitles here").is_empty());
    }
}
