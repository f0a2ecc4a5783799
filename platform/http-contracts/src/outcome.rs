/// Outcome of a side effect that is attempted but never allowed to fail the
/// operation it accompanies.
///
/// Callers log [`BestEffort::Dropped`] and move on; the distinction stays
/// visible in return types instead of disappearing into an ignored `Result`.
#[derive(Debug)]
pub enum BestEffort<E> {
    /// The side effect went through.
    Delivered,
    /// The side effect was attempted and failed; the error is kept for logging.
    Dropped(E),
}

impl<E> BestEffort<E> {
    pub fn from_result<T>(result: Result<T, E>) -> Self {
        match result {
            Ok(_) => BestEffort::Delivered,
            Err(e) => BestEffort::Dropped(e),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, BestEffort::Delivered)
    }

    pub fn dropped(&self) -> Option<&E> {
        match self {
            BestEffort::Delivered => None,
            BestEffort::Dropped(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_result_keeps_the_error() {
        let ok: BestEffort<String> = BestEffort::from_result(Ok::<_, String>(5));
        assert!(ok.is_delivered());
        assert!(ok.dropped().is_none());

        let err = BestEffort::from_result(Err::<(), _>("broker down".to_string()));
        assert!(!err.is_delivered());
        assert_eq!(err.dropped().map(String::as_str), Some("broker down"));
    }
}
