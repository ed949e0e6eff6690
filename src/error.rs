use thiserror::Error;

/// A classified dispatch failure. Every variant has already been reported to the sender by the
/// time it is observed; this type exists so platform adapters can react programmatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The matched executor requires a different kind of sender.
    #[error("incorrect sender for command, expected {expected}")]
    IncorrectSender {
        /// Type name of the sender the executor was bound to.
        expected: &'static str,
    },

    /// The input ended at a node which cannot be executed on its own.
    #[error("unknown or incomplete command")]
    UnknownOrIncomplete {
        /// One-based position of the last token typed, or `None` for a bare command name.
        index: Option<usize>,
    },

    /// A token did not match any child of the node before it.
    #[error("incorrect argument \"{token}\" at position {index}")]
    IncorrectArgument {
        /// One-based position of the offending token.
        index: usize,
        /// The offending token.
        token: String,
    },

    /// The executor ran but reported a soft failure through `set_result(false)`.
    #[error("command rejected by its executor")]
    Rejected,

    /// No registered command answers to the given name.
    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),

    /// The line contained no command name.
    #[error("empty command line")]
    EmptyLine,
}
