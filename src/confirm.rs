/// Text shown on every confirmation dialog for a destructive action.
pub const IRREVERSIBLE_WARNING: &str = "Bu amalni ortga qaytarib bo'lmaydi";

/// Holds the target of a destructive action until the operator confirms it.
///
/// The gate stays open after a failed attempt so the operator can retry; only
/// a success or an explicit cancel closes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmGate<T> {
    pending: Option<T>,
}

impl<T> ConfirmGate<T> {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Opens the dialog for `target`, replacing any dialog already open.
    pub fn request(&mut self, target: T) {
        self.pending = Some(target);
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    pub fn close(&mut self) {
        self.pending = None;
    }
}

impl<T> Default for ConfirmGate<T> {
    fn default() -> Self {
        Self::new()
    }
}
