//! Outcome of one pipeline stage.
//!
//! Stages never throw their way out: a stage either finished cleanly, finished with a
//! value after absorbing a fault, or hit a fault the caller must act on.

/// Result of a best-effort pipeline stage.
///
/// ```
/// use unfold_common::StageOutcome;
///
/// let stage: StageOutcome<u32> = StageOutcome::Recoverable {
///     value: 3,
///     reason: "2 elements refused the click".into(),
/// };
/// assert_eq!(stage.reason(), Some("2 elements refused the click"));
/// assert_eq!(stage.into_value(), Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome<T> {
    Ok(T),
    Recoverable { value: T, reason: String },
    Fatal(String),
}

impl<T> StageOutcome<T> {
    /// Cause attached to a recovered or fatal stage.
    pub fn reason(&self) -> Option<&str> {
        match self {
            StageOutcome::Ok(_) => None,
            StageOutcome::Recoverable { reason, .. } | StageOutcome::Fatal(reason) => {
                Some(reason)
            }
        }
    }

    /// The produced value, or `None` when the stage was fatal.
    pub fn into_value(self) -> Option<T> {
        match self {
            StageOutcome::Ok(value) | StageOutcome::Recoverable { value, .. } => Some(value),
            StageOutcome::Fatal(_) => None,
        }
    }

    /// Build `Ok` when `faults` is empty, otherwise `Recoverable` with the faults joined.
    pub fn from_faults(value: T, faults: &[String]) -> Self {
        if faults.is_empty() {
            StageOutcome::Ok(value)
        } else {
            StageOutcome::Recoverable {
                value,
                reason: faults.join("; "),
            }
        }
    }
}
