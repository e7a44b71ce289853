use std::path::PathBuf;

/// Errors raised while expanding a single xacro document.
#[derive(Debug, thiserror::Error)]
pub enum XacroError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] xmltree::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    #[error("Include error: {0}")]
    Include(String),

    #[error("Undefined macro: {0}")]
    UndefinedMacro(String),

    #[error("Undefined property: {0}")]
    PropertyNotFound(String),

    #[error("Undefined substitution argument '{0}'")]
    UndefinedArgument(String),

    #[error("Undefined block '{name}'")]
    UndefinedBlock { name: String },

    #[error("Missing parameter '{param}' in macro '{macro_name}'")]
    MissingParameter { macro_name: String, param: String },

    #[error("Missing block parameter '{param}' in macro '{macro_name}'")]
    MissingBlockParameter { macro_name: String, param: String },

    #[error("Block parameter '{param}' cannot have a default value")]
    BlockParameterWithDefault { param: String },

    #[error("Missing attribute '{attribute}' in element '{element}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("Evaluation error in '{expr}': {source}")]
    EvalError {
        expr: String,
        #[source]
        source: crate::xacro::eval::EvalError,
    },

    #[error("Unknown substitution command '$({0})'")]
    UnknownExtension(String),

    #[error("Unsupported xacro directive <xacro:{0}>")]
    UnsupportedDirective(String),

    #[error("Macro recursion limit exceeded: depth {depth} > {limit} (possible infinite loop)")]
    MacroRecursionLimit { depth: usize, limit: usize },

    #[error("External xacro command '{program}' failed ({status}): {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Crate-level error returned by path resolution and template generation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parsing error: {source} ({})", path.display())]
    XmlParse {
        path: PathBuf,
        #[source]
        source: xmltree::ParseError,
    },

    #[error("failed to expand {}: {source}", path.display())]
    Expand {
        path: PathBuf,
        #[source]
        source: XacroError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap an engine failure, lifting XML syntax errors into their own variant.
    pub(crate) fn expand(
        path: impl Into<PathBuf>,
        source: XacroError,
    ) -> Self {
        let path = path.into();
        match source {
            XacroError::Xml(source) => Error::XmlParse { path, source },
            source => Error::Expand { path, source },
        }
    }

    /// True for failures that happened while expanding or writing a template.
    ///
    /// The command-line front end exits with status 2 for these.
    pub fn is_expansion_failure(&self) -> bool {
        matches!(
            self,
            Error::XmlParse { .. } | Error::Expand { .. } | Error::Write { .. }
        )
    }
}

pub type Result<T> = core::result::Result<T, Error>;
