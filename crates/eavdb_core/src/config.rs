//! Store configuration.

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the database if it doesn't exist.
    pub create_if_missing: bool,

    /// Maximum length of an entity kind, in bytes.
    pub max_kind_len: usize,

    /// Maximum length of an attribute name, in bytes.
    pub max_attribute_name_len: usize,

    /// Maximum length of a text attribute value, in bytes.
    pub max_text_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            max_kind_len: 4096,
            max_attribute_name_len: 128,
            max_text_len: 32_000,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the maximum kind length.
    #[must_use]
    pub const fn max_kind_len(mut self, len: usize) -> Self {
        self.max_kind_len = len;
        self
    }

    /// Sets the maximum attribute name length.
    #[must_use]
    pub const fn max_attribute_name_len(mut self, len: usize) -> Self {
        self.max_attribute_name_len = len;
        self
    }

    /// Sets the maximum text value length.
    #[must_use]
    pub const fn max_text_len(mut self, len: usize) -> Self {
        self.max_text_len = len;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert_eq!(config.max_kind_len, 4096);
        assert_eq!(config.max_attribute_name_len, 128);
        assert_eq!(config.max_text_len, 32_000);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .max_attribute_name_len(16)
            .max_text_len(64);

        assert!(!config.create_if_missing);
        assert_eq!(config.max_attribute_name_len, 16);
        assert_eq!(config.max_text_len, 64);
    }
}
