use tracing::Level;

/// How logs get filtered and rendered.
///
/// Starts from `info` on stdout in a human readable format. Events at or above
/// the stderr threshold (`ERROR` unless set) go to stderr instead.
#[derive(Debug, Clone)]
pub struct Config {
    /// `EnvFilter` directives, e.g. `warn,allocation=debug`.
    pub(crate) env_filter: String,
    pub(crate) stderr_threshold: Option<Level>,
    /// One JSON object per event instead of plain text.
    pub(crate) use_json_format: bool,
}

impl Config {
    pub fn new(env_filter: &str, stderr_threshold: Option<Level>, use_json_format: bool) -> Self {
        Self {
            env_filter: env_filter.into(),
            stderr_threshold,
            use_json_format,
        }
    }

    pub fn with_json_format(mut self) -> Self {
        self.use_json_format = true;
        self
    }

    pub fn with_env_filter(mut self, env_filter: &str) -> Self {
        self.env_filter = env_filter.to_string();
        self
    }

    pub fn with_stderr_threshold(mut self, stderr_threshold: Level) -> Self {
        self.stderr_threshold = Some(stderr_threshold);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("info", None, false)
    }
}
