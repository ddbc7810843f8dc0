use tracing::Level;

/// How log events should be filtered and rendered.
#[derive(Debug, Clone)]
pub struct Config {
    /// Filter directives in the `EnvFilter` syntax, e.g.
    /// `warn,bidder=debug`.
    pub(crate) env_filter: String,
    /// Events more severe than this level are written to stderr, everything
    /// else goes to stdout. Defaults to `ERROR`.
    pub(crate) stderr_threshold: Option<Level>,
    /// Render one JSON object per event instead of the human readable format.
    pub(crate) use_json_format: bool,
}

impl Config {
    pub fn new(env_filter: &str, stderr_threshold: Option<Level>, use_json_format: bool) -> Self {
        let config = Self::default().with_env_filter(env_filter);
        let config = match stderr_threshold {
            Some(level) => config.with_stderr_threshold(level),
            None => config,
        };
        if use_json_format {
            config.with_json_format()
        } else {
            config
        }
    }

    pub fn with_env_filter(mut self, env_filter: &str) -> Self {
        self.env_filter = env_filter.to_owned();
        self
    }

    pub fn with_json_format(mut self) -> Self {
        self.use_json_format = true;
        self
    }

    pub fn with_stderr_threshold(mut self, stderr_threshold: Level) -> Self {
        self.stderr_threshold = Some(stderr_threshold);
        self
    }

    pub fn env_filter(&self) -> &str {
        &self.env_filter
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env_filter: "info".to_owned(),
            stderr_threshold: None,
            use_json_format: false,
        }
    }
}
