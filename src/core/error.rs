use serde::Serialize;
use thiserror::Error;

/// Terminal failure of a generation run. Every variant aborts the current
/// run only; none of them is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing credential, tool path or request field. The user has to fix
    /// the settings before trying again.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    /// Narration subprocess could not be launched, exited non-zero or left
    /// no media behind. Carries the subprocess diagnostics.
    #[error("Synthesis error: {0}")]
    Synthesis(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Provider,
    Filesystem,
    Synthesis,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Configuration(_) => ErrorKind::Configuration,
            PipelineError::Provider(_) => ErrorKind::Provider,
            PipelineError::Filesystem(_) => ErrorKind::Filesystem,
            PipelineError::Synthesis(_) => ErrorKind::Synthesis,
        }
    }

    pub(crate) fn provider(err: anyhow::Error) -> Self {
        PipelineError::Provider(format!("{:#}", err))
    }

    pub(crate) fn filesystem(err: anyhow::Error) -> Self {
        PipelineError::Filesystem(format!("{:#}", err))
    }

    pub(crate) fn synthesis(err: anyhow::Error) -> Self {
        PipelineError::Synthesis(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_provider_error_keeps_context_chain() {
        let err = anyhow!("quota exceeded").context("Gemini request failed");
        let mapped = PipelineError::provider(err);

        assert_eq!(mapped.kind(), ErrorKind::Provider);
        assert_eq!(
            mapped.to_string(),
            "Provider error: Gemini request failed: quota exceeded"
        );
    }
}
