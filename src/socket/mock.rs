//! In-memory socket for unit tests.

use super::{CloseListener, ErrorListener, Frame, MessageListener, Socket, SocketError, WriteCallback};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the mock does with a write callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WriteBehavior {
    Succeed,
    Fail,
    /// Keep the callback until `drop_pending` is called.
    Hold,
}

/// Records registrations and writes; `close()` emits `close` synchronously.
pub(crate) struct MockSocket {
    message: Mutex<Vec<MessageListener>>,
    error: Mutex<Vec<ErrorListener>>,
    close: Mutex<Vec<CloseListener>>,
    writes: Mutex<Vec<Frame>>,
    behavior: Mutex<WriteBehavior>,
    pending: Mutex<Vec<WriteCallback>>,
    close_calls: AtomicUsize,
}

impl MockSocket {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            message: Mutex::new(Vec::new()),
            error: Mutex::new(Vec::new()),
            close: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            behavior: Mutex::new(WriteBehavior::Succeed),
            pending: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_write_behavior(&self, behavior: WriteBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// (message, error, close) listener counts.
    pub(crate) fn registrations(&self) -> (usize, usize, usize) {
        (
            self.message.lock().unwrap().len(),
            self.error.lock().unwrap().len(),
            self.close.lock().unwrap().len(),
        )
    }

    pub(crate) fn writes(&self) -> Vec<Frame> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn drop_pending(&self) {
        self.pending.lock().unwrap().clear();
    }

    pub(crate) fn emit_message(&self, frame: Frame) {
        for listener in self.message.lock().unwrap().iter() {
            listener(frame.clone());
        }
    }

    pub(crate) fn emit_error(&self, error: SocketError) {
        for listener in self.error.lock().unwrap().iter() {
            listener(Arc::clone(&error));
        }
    }

    pub(crate) fn emit_close(&self) {
        for listener in self.close.lock().unwrap().iter() {
            listener();
        }
    }
}

impl Socket for MockSocket {
    fn on_message(&self, listener: MessageListener) {
        self.message.lock().unwrap().push(listener);
    }

    fn on_error(&self, listener: ErrorListener) {
        self.error.lock().unwrap().push(listener);
    }

    fn on_close(&self, listener: CloseListener) {
        self.close.lock().unwrap().push(listener);
    }

    fn send(&self, frame: Frame, done: WriteCallback) {
        self.writes.lock().unwrap().push(frame);
        let behavior = *self.behavior.lock().unwrap();
        match behavior {
            WriteBehavior::Succeed => done(Ok(())),
            WriteBehavior::Fail => done(Err(Arc::new(std::io::Error::other("write failed")))),
            WriteBehavior::Hold => self.pending.lock().unwrap().push(done),
        }
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.emit_close();
    }
}
