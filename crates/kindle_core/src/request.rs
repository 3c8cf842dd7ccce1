use std::fmt;

/// One captured page pushed by the browser extension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngestRequest {
    /// Dedup key.
    pub url: String,
    pub title: String,
    pub html: String,
    /// Bypass the dedup ledger.
    pub force_resend: bool,
}

impl IngestRequest {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        html: impl Into<String>,
        force_resend: bool,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            html: html.into(),
            force_resend,
        }
    }

    /// Wire names of the required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url.is_empty() {
            missing.push("link");
        }
        if self.html.is_empty() {
            missing.push("html");
        }
        if self.title.is_empty() {
            missing.push("title");
        }
        missing
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFlagError {
    pub value: Option<String>,
}

impl fmt::Display for ParseFlagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "reSend must be 'true' or 'false', got '{value}'"),
            None => write!(f, "reSend must be 'true' or 'false', got nothing"),
        }
    }
}

impl std::error::Error for ParseFlagError {}

/// Parses the `reSend` form flag: `true`/`false`, case-insensitive, surrounding whitespace ignored.
pub fn parse_resend_flag(raw: Option<&str>) -> Result<bool, ParseFlagError> {
    let Some(raw) = raw else {
        return Err(ParseFlagError { value: None });
    };
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ParseFlagError {
            value: Some(raw.to_string()),
        })
    }
}
