/// Lifecycle of a single remote call as seen by the screen.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestState<T> {
    Idle,
    Submitting,
    Succeeded(T),
    Failed(String),
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        RequestState::Idle
    }
}

impl<T> RequestState<T> {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, RequestState::Submitting)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            RequestState::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&str> {
        match self {
            RequestState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn settle<E>(result: Result<T, E>, on_error: impl FnOnce(E) -> String) -> Self {
        match result {
            Ok(value) => RequestState::Succeeded(value),
            Err(err) => RequestState::Failed(on_error(err)),
        }
    }
}
