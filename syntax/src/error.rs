use thiserror::Error;

/// Errors raised by schema descriptors.
///
/// Two classes matter to callers. Mismatch-class errors (see
/// [`Error::is_mismatch`]) mean "this value or node does not fit this
/// descriptor"; CHOICE, OPTIONAL and DEFAULT absorb them to try another
/// branch or record absence. Everything else is structural and propagates
/// to the caller unchanged; once a branch has committed, nothing is
/// un-consumed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("tag mismatch: expected {expected}, found {found}")]
    TagMismatch { expected: String, found: String },
    #[error("value does not fit this syntax: {0}")]
    ValueMismatch(&'static str),
    #[error("missing required value")]
    Missing,

    #[error("no CHOICE alternative matched")]
    NoAlternative,
    #[error("SEQUENCE: {0} trailing elements after the last field")]
    TrailingElements(usize),
    #[error("unresolved discriminator '{0}' and no default type")]
    UnresolvedDiscriminator(String),

    #[error("value conversion: {0}")]
    Element(#[from] asn1::Error),
    #[error("nested encoding: {0}")]
    Ber(#[from] ber::Error),
}

impl Error {
    /// True for the errors a CHOICE or OPTIONAL/DEFAULT may swallow in
    /// order to try the next alternative or substitute absence.
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            Error::TagMismatch { .. }
                | Error::ValueMismatch(_)
                | Error::Missing
                | Error::Element(_)
        )
    }
}
