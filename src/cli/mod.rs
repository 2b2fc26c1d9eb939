use anyhow::Result;
use clap::Parser;
use std::io::{BufRead, Write};

#[derive(Parser, Debug)]
#[command(
    name = "tubescribe",
    about = "YouTube to WebVTT subtitle generator using Google Gemini",
    version,
    long_about = "Downloads the audio of a YouTube video, transcribes it into English with a Gemini model and saves the result as a WebVTT (.vtt) file named after the video title. Requires GOOGLE_API_KEY in the environment or a .env file."
)]
pub struct Cli {
    /// YouTube video URL (prompted for when omitted)
    #[arg(value_name = "URL")]
    pub url: Option<String>,
}

impl Cli {
    /// Resolve the URL from the argument or by prompting on the given reader.
    ///
    /// Returns `Ok(None)` when the user entered nothing.
    pub fn resolve_url<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        prompt: &mut W,
    ) -> Result<Option<String>> {
        if let Some(url) = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            return Ok(Some(url.to_string()));
        }

        writeln!(prompt, "📝 Enter YouTube URL:")?;
        write!(prompt, "> ")?;
        prompt.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let url = line.trim();

        Ok((!url.is_empty()).then(|| url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_positional_url_is_optional() {
        let cli = Cli::try_parse_from(["tubescribe"]).unwrap();
        assert!(cli.url.is_none());

        let cli = Cli::try_parse_from(["tubescribe", "https://youtu.be/abc"]).unwrap();
        assert_eq!(cli.url.as_deref(), Some("https://youtu.be/abc"));
    }

    #[test]
    fn test_rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["tubescribe", "--format", "srt"]).is_err());
    }

    #[test]
    fn test_argument_skips_prompt() {
        let cli = Cli {
            url: Some("https://youtu.be/abc".into()),
        };
        let mut input = Cursor::new(Vec::new());
        let mut prompt = Vec::new();

        let url = cli.resolve_url(&mut input, &mut prompt).unwrap();
        assert_eq!(url.as_deref(), Some("https://youtu.be/abc"));
        assert!(prompt.is_empty());
    }

    #[test]
    fn test_prompts_when_missing() {
        let cli = Cli { url: None };
        let mut input = Cursor::new(b"  https://youtu.be/xyz \n".to_vec());
        let mut prompt = Vec::new();

        let url = cli.resolve_url(&mut input, &mut prompt).unwrap();
        assert_eq!(url.as_deref(), Some("https://youtu.be/xyz"));
        assert!(String::from_utf8(prompt).unwrap().contains("Enter YouTube URL"));
    }

    #[test]
    fn test_empty_answer_yields_none() {
        let cli = Cli { url: None };
        let mut input = Cursor::new(b"\n".to_vec());
        let mut prompt = Vec::new();

        assert!(cli.resolve_url(&mut input, &mut prompt).unwrap().is_none());
    }
}
