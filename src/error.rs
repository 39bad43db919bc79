use std::io;

use thiserror::Error;

/// Failure modes surfaced by the knowledge base.
///
/// Querying an unknown action is not one of them: that resolves to `None`.
/// Fact or rule mismatches during resolution prune the search silently.
#[derive(Debug, Error)]
pub enum KbError {
    /// An argument string that does not split into `role:value`, or one
    /// with an empty role or value.
    #[error("malformed argument `{arg}`: expected `role:value`")]
    MalformedArgument { arg: String },

    /// Facts are ground records; `$`-prefixed values belong only in rule
    /// heads and subgoals.
    #[error("variable `{word}` is not allowed in a fact")]
    VariableInFact { word: String },

    /// A persisted record referenced an atom id the file never declared.
    #[error("corrupt knowledge base: atom id {id} out of range")]
    CorruptAtomId { id: u32 },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("failed to encode knowledge base: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode knowledge base: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}
