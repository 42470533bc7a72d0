//! Output paths with `{{count}}` and `{{timestamp}}` placeholders.

use std::path::PathBuf;

use time::OffsetDateTime;

const COUNT: &str = "{{count}}";
const TIMESTAMP: &str = "{{timestamp}}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    raw: String,
}

impl OutputTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn has_placeholders(&self) -> bool {
        self.raw.contains(COUNT) || self.raw.contains(TIMESTAMP)
    }

    /// Substitute `count` (1-based) and `now_ms` (epoch milliseconds).
    pub fn resolve(&self, count: u64, now_ms: i128) -> PathBuf {
        PathBuf::from(
            self.raw
                .replace(COUNT, &count.to_string())
                .replace(TIMESTAMP, &now_ms.to_string()),
        )
    }

    pub fn resolve_now(&self, count: u64) -> PathBuf {
        self.resolve(count, epoch_millis())
    }
}

pub fn epoch_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_and_timestamp_are_substituted() {
        let tpl = OutputTemplate::new("renders/{{timestamp}}-{{count}}.png");
        assert!(tpl.has_placeholders());
        assert_eq!(
            tpl.resolve(3, 1_700_000_000_123),
            PathBuf::from("renders/1700000000123-3.png")
        );
    }

    #[test]
    fn plain_paths_are_unchanged() {
        let tpl = OutputTemplate::new("out.png");
        assert!(!tpl.has_placeholders());
        assert_eq!(tpl.resolve(7, 0), PathBuf::from("out.png"));
    }

    #[test]
    fn now_is_in_milliseconds() {
        let now = epoch_millis();
        // 2001-09-09 in ms; seconds would be ten digits.
        assert!(now > 1_000_000_000_000);
    }
}
