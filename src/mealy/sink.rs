//! Output sinks
//!
//! Sinks are a side channel. A sink that fails (error return, panic, or a
//! failed async task) is logged and otherwise ignored; it never changes the
//! state or outputs of the processing call that fed it.

use crate::event::CodecError;
use async_trait::async_trait;
use futures::FutureExt;
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Sink encoding failed: {0}")]
    Encode(#[from] CodecError),
    #[error("{0}")]
    Other(String),
}

impl SinkError {
    pub fn other(message: impl Into<String>) -> Self {
        SinkError::Other(message.into())
    }
}

/// Synchronous consumer of outputs
pub trait Sink<O>: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver the outputs of one processing call for conversation `id`.
    ///
    /// # Errors
    ///
    /// Returns a `SinkError` if delivery fails. The error is logged by the
    /// dispatcher and goes no further.
    fn dispatch(&self, id: &str, outputs: &[O]) -> Result<(), SinkError>;
}

/// Asynchronous consumer of outputs. Dispatch is spawned on the ambient tokio
/// runtime and never awaited by the caller.
#[async_trait]
pub trait AsyncSink<O: Send + 'static>: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Returns a `SinkError` if delivery fails; the spawned task logs it.
    async fn dispatch(&self, id: &str, outputs: Vec<O>) -> Result<(), SinkError>;
}

/// Sink backed by a closure
pub struct FnSink<F> {
    name: String,
    f: F,
}

impl<F> FnSink<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<O, F> Sink<O> for FnSink<F>
where
    F: Fn(&str, &[O]) -> Result<(), SinkError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&self, id: &str, outputs: &[O]) -> Result<(), SinkError> {
        (self.f)(id, outputs)
    }
}

type Filter<O> = Arc<dyn Fn(&O) -> bool + Send + Sync>;

enum Target<O: Send + 'static> {
    Blocking(Arc<dyn Sink<O>>),
    Spawned(Arc<dyn AsyncSink<O>>),
}

impl<O: Send + 'static> Target<O> {
    fn name(&self) -> &str {
        match self {
            Target::Blocking(sink) => sink.name(),
            Target::Spawned(sink) => sink.name(),
        }
    }
}

struct Registration<O: Send + 'static> {
    target: Target<O>,
    filter: Option<Filter<O>>,
}

/// Registered sinks, unconditional or filtered
pub struct SinkSet<O: Send + 'static> {
    registrations: Vec<Registration<O>>,
}

impl<O: Clone + Send + 'static> SinkSet<O> {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Register a sink that receives every output
    #[must_use]
    pub fn with_sink(mut self, sink: impl Sink<O> + 'static) -> Self {
        self.registrations.push(Registration {
            target: Target::Blocking(Arc::new(sink)),
            filter: None,
        });
        self
    }

    /// Register a sink that receives only outputs matching `filter`. It is not
    /// called at all when nothing matches.
    #[must_use]
    pub fn with_filtered_sink(
        mut self,
        sink: impl Sink<O> + 'static,
        filter: impl Fn(&O) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.registrations.push(Registration {
            target: Target::Blocking(Arc::new(sink)),
            filter: Some(Arc::new(filter)),
        });
        self
    }

    #[must_use]
    pub fn with_async_sink(mut self, sink: impl AsyncSink<O> + 'static) -> Self {
        self.registrations.push(Registration {
            target: Target::Spawned(Arc::new(sink)),
            filter: None,
        });
        self
    }

    #[must_use]
    pub fn with_filtered_async_sink(
        mut self,
        sink: impl AsyncSink<O> + 'static,
        filter: impl Fn(&O) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.registrations.push(Registration {
            target: Target::Spawned(Arc::new(sink)),
            filter: Some(Arc::new(filter)),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.registrations.iter().map(|r| r.target.name()).collect()
    }

    /// Hand `outputs` to every registered sink. Failures are logged, never
    /// returned.
    pub fn dispatch(&self, id: &str, outputs: &[O]) {
        if outputs.is_empty() {
            return;
        }

        for registration in &self.registrations {
            let selected: Cow<'_, [O]> = if let Some(filter) = &registration.filter {
                let matching: Vec<O> = outputs.iter().filter(|o| filter(o)).cloned().collect();
                if matching.is_empty() {
                    continue;
                }
                Cow::Owned(matching)
            } else {
                Cow::Borrowed(outputs)
            };

            match &registration.target {
                Target::Blocking(sink) => dispatch_blocking(sink.as_ref(), id, &selected),
                Target::Spawned(sink) => spawn_async(Arc::clone(sink), id, selected.into_owned()),
            }
        }
    }
}

impl<O: Clone + Send + 'static> Default for SinkSet<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Send + 'static> fmt::Debug for SinkSet<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.registrations.iter().map(|r| r.target.name()))
            .finish()
    }
}

fn dispatch_blocking<O>(sink: &dyn Sink<O>, id: &str, outputs: &[O]) {
    match panic::catch_unwind(AssertUnwindSafe(|| sink.dispatch(id, outputs))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(agent_id = %id, sink = %sink.name(), error = %e, "Sink dispatch failed");
        }
        Err(_) => {
            tracing::error!(agent_id = %id, sink = %sink.name(), "Sink panicked during dispatch");
        }
    }
}

fn spawn_async<O: Send + 'static>(sink: Arc<dyn AsyncSink<O>>, id: &str, outputs: Vec<O>) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::warn!(
            agent_id = %id,
            sink = %sink.name(),
            "No async runtime available, skipping async sink"
        );
        return;
    };

    let id = id.to_string();
    handle.spawn(async move {
        let result = AssertUnwindSafe(sink.dispatch(&id, outputs))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(agent_id = %id, sink = %sink.name(), error = %e, "Async sink dispatch failed");
            }
            Err(_) => {
                tracing::error!(agent_id = %id, sink = %sink.name(), "Async sink panicked during dispatch");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    type Received = Arc<Mutex<Vec<(String, Vec<u32>)>>>;

    fn recording_sink(name: &str) -> (FnSink<impl Fn(&str, &[u32]) -> Result<(), SinkError>>, Received) {
        let received: Received = Arc::default();
        let log = Arc::clone(&received);
        let sink = FnSink::new(name, move |id: &str, outputs: &[u32]| {
            log.lock().unwrap().push((id.to_string(), outputs.to_vec()));
            Ok(())
        });
        (sink, received)
    }

    struct ChannelSink {
        tx: mpsc::UnboundedSender<Vec<u32>>,
        fail: bool,
    }

    #[async_trait]
    impl AsyncSink<u32> for ChannelSink {
        fn name(&self) -> &str {
            "channel"
        }

        async fn dispatch(&self, _id: &str, outputs: Vec<u32>) -> Result<(), SinkError> {
            self.tx.send(outputs).map_err(|e| SinkError::other(e.to_string()))?;
            if self.fail {
                return Err(SinkError::other("downstream rejected"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_unconditional_sink_receives_everything() {
        let (sink, received) = recording_sink("all");
        let sinks = SinkSet::new().with_sink(sink);
        sinks.dispatch("agent-1", &[1, 2, 3]);
        assert_eq!(
            *received.lock().unwrap(),
            vec![("agent-1".to_string(), vec![1, 2, 3])]
        );
    }

    #[test]
    fn test_filtered_sink_only_sees_matches_and_skips_when_none() {
        let (sink, received) = recording_sink("even");
        let sinks = SinkSet::new().with_filtered_sink(sink, |n: &u32| n % 2 == 0);

        sinks.dispatch("a", &[1, 2, 3, 4]);
        sinks.dispatch("a", &[1, 3]);

        assert_eq!(*received.lock().unwrap(), vec![("a".to_string(), vec![2, 4])]);
    }

    #[test]
    fn test_failing_and_panicking_sinks_do_not_stop_dispatch() {
        let (sink, received) = recording_sink("last");
        let sinks = SinkSet::new()
            .with_sink(FnSink::new("broken", |_: &str, _: &[u32]| -> Result<(), SinkError> {
                Err(SinkError::other("boom"))
            }))
            .with_sink(FnSink::new("panicky", |_: &str, _: &[u32]| -> Result<(), SinkError> {
                panic!("sink exploded")
            }))
            .with_sink(sink);

        sinks.dispatch("a", &[7]);

        assert_eq!(received.lock().unwrap().len(), 1);
        assert_eq!(sinks.names(), vec!["broken", "panicky", "last"]);
    }

    #[test]
    fn test_empty_outputs_are_not_dispatched() {
        let (sink, received) = recording_sink("all");
        let sinks = SinkSet::new().with_sink(sink);
        sinks.dispatch("a", &[]);
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn test_async_sink_without_runtime_is_skipped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sinks = SinkSet::new().with_async_sink(ChannelSink { tx, fail: false });
        sinks.dispatch("a", &[1]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_async_sink_is_spawned() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sinks = SinkSet::new()
            .with_filtered_async_sink(ChannelSink { tx, fail: true }, |n: &u32| *n > 1);

        // Dispatch returns immediately; the failure is only logged
        sinks.dispatch("a", &[1, 2, 3]);

        let delivered = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(delivered, Some(vec![2, 3]));
    }
}
