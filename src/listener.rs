use std::sync::Arc;

/// Receives chunks of text read from one stream of a spawned process.
///
/// Implementations must tolerate being called from a background reader task;
/// `receive` runs on whichever task read the chunk, synchronously, so it
/// should return quickly.
pub trait ShellListener: Send + Sync {
    /// Called with each chunk of text as it is read from the stream.
    fn receive(&self, text: &str);
}

/// Shared handle to a listener.
///
/// Listener identity is the allocation behind this handle, never structural
/// equality: removal only matches the exact handle that was registered.
pub type ListenerRef = Arc<dyn ShellListener>;

impl<F> ShellListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn receive(&self, text: &str) {
        self(text);
    }
}

/// Null object of [`ShellListener`]: valid wherever a listener is required,
/// discards everything it receives.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl ShellListener for NullListener {
    fn receive(&self, _text: &str) {}
}
