/// Failures the pipeline reports as typed errors.
///
/// Both variants travel inside `anyhow::Error`; callers that need to tell a
/// misconfiguration apart from a logic bug recover them with `downcast_ref`.
/// Empty frames are not errors and never appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Fatal, fix once: tensor shape, frame dimensions, label list, thresholds.
    Configuration(String),
    /// A message tag the generator does not know. Indicates a bug upstream.
    UnreachableVariant(String),
}

impl PipelineError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        PipelineError::Configuration(reason.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, PipelineError::Configuration(_))
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Configuration(reason) => write!(f, "configuration error: {}", reason),
            PipelineError::UnreachableVariant(tag) => {
                write!(f, "unreachable frame result variant '{}'", tag)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// Shorthand for bailing out with a configuration error.
pub(crate) fn config_error<T>(reason: impl Into<String>) -> anyhow::Result<T> {
    Err(PipelineError::configuration(reason).into())
}
