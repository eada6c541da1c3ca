use thiserror::Error;
use url::Url;

/// Reasons a URL typed into the drawer is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddSourceError {
    #[error("URL is empty")]
    Empty,
    #[error("not a valid URL: {0}")]
    Malformed(String),
    #[error("unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
}

pub fn validate_source_url(input: &str) -> Result<Url, AddSourceError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AddSourceError::Empty);
    }

    let url = Url::parse(input).map_err(|e| AddSourceError::Malformed(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(AddSourceError::UnsupportedScheme(scheme.to_owned())),
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(AddSourceError::MissingHost),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AddSource {
    #[default]
    Idle,
    Adding {
        url: String,
    },
}

/// Side panel listing sources, with the add-source workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawerState {
    open: bool,
    pub cursor: usize,
    add: AddSource,
    feedback: Option<String>,
}

impl DrawerState {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn is_adding(&self) -> bool {
        matches!(self.add, AddSource::Adding { .. })
    }

    /// Text currently in the URL field, if the field is shown.
    pub fn url_field(&self) -> Option<&str> {
        match &self.add {
            AddSource::Adding { url } => Some(url),
            AddSource::Idle => None,
        }
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn set_feedback(&mut self, message: impl Into<String>) {
        self.feedback = Some(message.into());
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self, len: usize) {
        if len > 0 && self.cursor < len - 1 {
            self.cursor += 1;
        }
    }

    /// `Idle → Adding` with an empty field.
    pub fn add(&mut self) {
        if !self.is_adding() {
            self.add = AddSource::Adding { url: String::new() };
            self.feedback = None;
        }
    }

    pub fn input(&mut self, c: char) {
        if let AddSource::Adding { url } = &mut self.add {
            url.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let AddSource::Adding { url } = &mut self.add {
            url.pop();
        }
    }

    /// Validates the field. On success returns to `Idle` with the field
    /// cleared; on failure stays in `Adding` and records inline feedback.
    pub fn confirm(&mut self) -> Result<Url, AddSourceError> {
        let AddSource::Adding { url } = &self.add else {
            return Err(AddSourceError::Empty);
        };
        match validate_source_url(url) {
            Ok(parsed) => {
                self.add = AddSource::Idle;
                self.feedback = None;
                Ok(parsed)
            }
            Err(e) => {
                self.feedback = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Discards the field and returns to `Idle`.
    pub fn cancel(&mut self) {
        self.add = AddSource::Idle;
        self.feedback = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> DrawerState {
        let mut drawer = DrawerState::default();
        drawer.add();
        text.chars().for_each(|c| drawer.input(c));
        drawer
    }

    #[test]
    fn add_reveals_empty_field() {
        let mut drawer = DrawerState::default();
        assert_eq!(drawer.url_field(), None);
        drawer.add();
        assert_eq!(drawer.url_field(), Some(""));
    }

    #[test]
    fn cancel_always_returns_to_idle_with_empty_field() {
        for text in ["", "https://example.com/feed", "garbage"] {
            let mut drawer = typed(text);
            drawer.cancel();
            assert!(!drawer.is_adding());

            drawer.add();
            assert_eq!(drawer.url_field(), Some(""));
        }
    }

    #[test]
    fn confirm_accepts_http_url_and_clears_field() {
        let mut drawer = typed("  https://moxie.foxnews.com/google-publisher/latest.xml ");
        let url = drawer.confirm().unwrap();

        assert_eq!(url.as_str(), "https://moxie.foxnews.com/google-publisher/latest.xml");
        assert!(!drawer.is_adding());
        assert!(drawer.feedback().is_none());
    }

    #[test]
    fn confirm_rejects_empty_input_inline() {
        let mut drawer = typed("   ");
        assert_eq!(drawer.confirm(), Err(AddSourceError::Empty));
        assert!(drawer.is_adding());
        assert_eq!(drawer.feedback(), Some("URL is empty"));
    }

    #[test]
    fn confirm_rejects_malformed_and_foreign_schemes() {
        assert!(matches!(typed("not a url").confirm(), Err(AddSourceError::Malformed(_))));
        assert_eq!(
            typed("ftp://example.com/feed").confirm(),
            Err(AddSourceError::UnsupportedScheme("ftp".to_string()))
        );
        assert!(validate_source_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn rejected_input_is_kept_for_editing() {
        let mut drawer = typed("example.com/rss");
        assert!(drawer.confirm().is_err());
        assert_eq!(drawer.url_field(), Some("example.com/rss"));

        drawer.backspace();
        assert_eq!(drawer.url_field(), Some("example.com/rs"));
    }

    #[test]
    fn visibility_does_not_touch_the_field() {
        let mut drawer = typed("https://a.example");
        drawer.toggle();
        assert!(drawer.is_open());
        assert_eq!(drawer.url_field(), Some("https://a.example"));
        drawer.toggle();
        assert!(!drawer.is_open());
        drawer.open();
        drawer.close();
        assert!(!drawer.is_open());
    }
}
