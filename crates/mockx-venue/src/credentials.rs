use std::fmt;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// API credentials and connection options for a venue client.
#[derive(Clone, PartialEq, Eq)]
pub struct VenueCredentials {
    pub api_key: String,
    pub secret: String,
    pub sandbox: bool,
    pub timeout: Duration,
}

impl VenueCredentials {
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret: secret.into(),
            sandbox: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for VenueCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VenueCredentials")
            .field("api_key", &mask(&self.api_key))
            .field("secret", &"[REDACTED]")
            .field("sandbox", &self.sandbox)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn mask(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    if value.chars().count() <= 4 {
        String::from("****")
    } else {
        format!("{visible}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_never_contains_the_secret() {
        let credentials = VenueCredentials::new("abcdefgh", "very-secret-value");
        let rendered = format!("{credentials:?}");

        assert!(rendered.contains("abcd****"));
        assert!(!rendered.contains("very-secret-value"));
        assert!(!rendered.contains("efgh"));
    }
}
