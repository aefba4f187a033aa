/// Result of a best-effort enrichment call.
///
/// Both variants carry usable data; `Degraded` marks values that came from a
/// fallback path (heuristics, existing fields) rather than the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Enriched(T),
    Degraded { value: T, reason: String },
}

impl<T> Outcome<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_enriched(&self) -> bool {
        matches!(self, Self::Enriched(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Enriched(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Enriched(value) | Self::Degraded { value, .. } => value,
        }
    }
}
