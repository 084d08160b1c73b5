use super::decode::{DecodeError, InboundMessage};
use super::session::CloseReason;

/// Receives the lifecycle events of one feed session.
///
/// Callbacks run serially on the task driving the session. `on_open` fires
/// once before anything else and `on_close` fires once after everything
/// else.
pub trait FeedObserver {
    fn on_open(&mut self) {}

    fn on_message(&mut self, message: &InboundMessage);

    fn on_decode_error(&mut self, _error: &DecodeError) {}

    fn on_close(&mut self, _reason: &CloseReason) {}
}

impl<T: FeedObserver + ?Sized> FeedObserver for &mut T {
    fn on_open(&mut self) {
        (**self).on_open()
    }

    fn on_message(&mut self, message: &InboundMessage) {
        (**self).on_message(message)
    }

    fn on_decode_error(&mut self, error: &DecodeError) {
        (**self).on_decode_error(error)
    }

    fn on_close(&mut self, reason: &CloseReason) {
        (**self).on_close(reason)
    }
}
