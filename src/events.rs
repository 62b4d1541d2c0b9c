use tokio::sync::broadcast;

const NOTICE_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A one-line, user-visible outcome of an operation. Never carries backend
/// error details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Mutation kinds with their fixed notice texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    Delete,
    Reorder,
    Upload,
    RemoveImage,
    StatusChange,
    SendMessage,
}

impl Operation {
    fn success_text(self) -> &'static str {
        match self {
            Operation::Save => "Muvaffaqiyatli saqlandi",
            Operation::Delete => "O'chirildi",
            Operation::Reorder => "Tartib yangilandi",
            Operation::Upload => "Rasm yuklandi",
            Operation::RemoveImage => "Rasm o'chirildi",
            Operation::StatusChange => "Holat yangilandi",
            Operation::SendMessage => "Xabar yuborildi",
        }
    }

    fn failure_text(self) -> &'static str {
        match self {
            Operation::Save => "Saqlashda xatolik yuz berdi",
            Operation::Delete => "O'chirishda xatolik yuz berdi",
            Operation::Reorder => "Tartibni o'zgartirishda xatolik",
            Operation::Upload => "Rasm yuklashda xatolik",
            Operation::RemoveImage => "Rasmni o'chirishda xatolik",
            Operation::StatusChange => "Holatni yangilashda xatolik",
            Operation::SendMessage => "Xabar yuborishda xatolik",
        }
    }
}

/// Fan-out of notices to whatever displays them. Sending with no listener is fine.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(NOTICE_BUFFER);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn success(&self, op: Operation) {
        self.emit(NoticeKind::Success, op.success_text().to_string());
    }

    pub fn failure(&self, op: Operation) {
        self.emit(NoticeKind::Error, op.failure_text().to_string());
    }

    /// Local validation message, shown verbatim.
    pub fn invalid(&self, message: &str) {
        self.emit(NoticeKind::Error, message.to_string());
    }

    fn emit(&self, kind: NoticeKind, message: String) {
        let _ = self.tx.send(Notice { kind, message });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
