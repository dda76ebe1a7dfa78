use std::fmt::{Display, Formatter};

/// The error type returned by a sweep step. It carries a message describing what the sweeper was
/// doing and, optionally, the error that caused it.
#[derive(Debug)]
pub struct SweepError {
    context: Option<String>,
    inner: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

pub type SweepResult<T> = std::result::Result<T, SweepError>;

impl SweepError {
    pub fn new_with_source_and_context<S, E>(context: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            context: Some(context.into()),
            inner: Some(source.into()),
        }
    }

    pub fn new_with_context<S>(context: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            context: Some(context.into()),
            inner: None,
        }
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.inner.as_ref().map(|some| some.as_ref())
    }
}

impl Display for SweepError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.context(), self.inner()) {
            (Some(context), Some(inner)) => write!(f, "{}: {}", context, inner),
            (Some(context), None) => write!(f, "{}", context),
            (None, Some(inner)) => write!(f, "{}", inner),
            (None, None) => write!(f, "Unknown sweep error"),
        }
    }
}

impl std::error::Error for SweepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Converts results and options into a `SweepError` with a familiar `context` function.
pub trait IntoSweepError<T> {
    fn context<S>(self, message: S) -> SweepResult<T>
    where
        S: Into<String>;
}

impl<T, E> IntoSweepError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S>(self, message: S) -> SweepResult<T>
    where
        S: Into<String>,
    {
        self.map_err(|e| SweepError::new_with_source_and_context(message, e))
    }
}

// `None` is converted into an error.
impl<T> IntoSweepError<T> for std::option::Option<T> {
    fn context<S>(self, message: S) -> SweepResult<T>
    where
        S: Into<String>,
    {
        self.ok_or_else(|| SweepError::new_with_context(message))
    }
}
