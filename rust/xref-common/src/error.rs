use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_format(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    /// An enumerator produced a term that is not strictly greater than the
    /// previous one.
    pub fn term_order(context: impl Into<String>, previous: &[u8], current: &[u8]) -> Error {
        Error(
            ErrorKind::TermOrder {
                context: context.into(),
                previous: display_term(previous),
                current: display_term(current),
            }
            .into(),
        )
    }

    /// The storage layer failed to add or combine segments into `index`.
    pub fn combine<E>(index: impl Into<String>, source: E) -> Error
    where
        E: Into<StdErrorBoxed>,
    {
        Error(
            ErrorKind::Combine {
                index: index.into(),
                source: source.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("invalid data for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("term order violation in {context}: '{current}' does not follow '{previous}'")]
    TermOrder {
        context: String,
        previous: String,
        current: String,
    },

    #[error("failed to combine segments into '{index}': {source}")]
    Combine {
        index: String,
        source: StdErrorBoxed,
    },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

/// Renders a term for diagnostics: UTF-8 text when possible, escaped bytes otherwise.
pub fn display_term(term: &[u8]) -> String {
    match std::str::from_utf8(term) {
        Ok(s) => s.to_string(),
        Err(_) => term.escape_ascii().to_string(),
    }
}
