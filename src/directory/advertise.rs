use std::path::Path;

use tokio::fs;

/// One advertisable file on a host: a name and the free-text description
/// searches run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub file_name: String,
    pub description: String,
}

impl Advertisement {
    pub fn new(file_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            description: description.into(),
        }
    }

    /// The advertisement-message line for this entry.
    pub fn to_line(&self) -> String {
        format!("{}, {}", self.file_name, self.description)
    }
}

/// Parse one advertisement line by splitting on the first `", "`.
pub fn parse_line(line: &str) -> Option<Advertisement> {
    let (file_name, description) = line.split_once(", ")?;
    Some(Advertisement::new(file_name, description))
}

/// Parse advertisement text line by line. Returns the parsed entries in
/// input order plus the lines that failed to parse, so callers can emit a
/// diagnostic per rejected line without aborting. Blank lines (for example
/// the trailing one after the final entry) are neither.
pub fn parse_lines(text: &str) -> (Vec<Advertisement>, Vec<String>) {
    let mut parsed = Vec::new();
    let mut rejected = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(ad) => parsed.push(ad),
            None => rejected.push(line.to_string()),
        }
    }

    (parsed, rejected)
}

/// Build the advertisement message: one line per entry, with a trailing
/// newline after the last.
pub fn to_message(ads: &[Advertisement]) -> String {
    let mut message = String::new();
    for ad in ads {
        message.push_str(&ad.to_line());
        message.push('\n');
    }
    message
}

/// Load advertisements from a local file-list file whose lines are
/// `name, description`. Unparseable lines come back separately for
/// diagnostics, mirroring the server-side rule.
pub async fn load_file_list(
    path: impl AsRef<Path>,
) -> std::io::Result<(Vec<Advertisement>, Vec<String>)> {
    let text = fs::read_to_string(path).await?;
    Ok(parse_lines(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_the_first_comma_space_only() {
        let ad = parse_line("report.pdf, quarterly report, final").unwrap();
        assert_eq!(ad.file_name, "report.pdf");
        assert_eq!(ad.description, "quarterly report, final");
    }

    #[test]
    fn lines_without_the_separator_are_rejected() {
        assert!(parse_line("no-separator-here").is_none());
        assert!(parse_line("comma,but,no,space").is_none());
    }

    #[test]
    fn malformed_lines_are_collected_not_fatal() {
        let text = "a.txt, alpha notes\nbroken line\nb.txt, beta notes\n";
        let (parsed, rejected) = parse_lines(text);
        assert_eq!(parsed.len(), 2);
        assert_eq!(rejected, vec!["broken line".to_string()]);
        assert_eq!(parsed[1], Advertisement::new("b.txt", "beta notes"));
    }

    #[test]
    fn trailing_newline_is_not_a_rejected_line() {
        let (parsed, rejected) = parse_lines("a.txt, alpha\n");
        assert_eq!(parsed.len(), 1);
        assert!(rejected.is_empty());
    }

    #[test]
    fn message_round_trips_and_keeps_the_trailing_newline() {
        let ads = vec![
            Advertisement::new("report.pdf", "quarterly report"),
            Advertisement::new("b", "short name, long description"),
        ];
        let message = to_message(&ads);
        assert!(message.ends_with('\n'));

        let (parsed, rejected) = parse_lines(&message);
        assert_eq!(parsed, ads);
        assert!(rejected.is_empty());
    }

    #[test]
    fn empty_list_builds_an_empty_message() {
        assert_eq!(to_message(&[]), "");
        let (parsed, rejected) = parse_lines("");
        assert!(parsed.is_empty());
        assert!(rejected.is_empty());
    }
}
