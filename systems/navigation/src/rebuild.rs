//! Single-flight background rebuild of the navigation graph.

use std::sync::{
    mpsc::{self, Receiver, Sender, TryRecvError},
    Arc,
};

use tracing::{debug, trace};

use crate::graph::{CostField, NavigationGraph};

/// Where background work executes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dispatch {
    /// On the rayon global thread pool.
    #[default]
    Background,
    /// Immediately on the calling thread; results still arrive through the
    /// channel and are picked up by the next poll.
    Inline,
}

impl Dispatch {
    pub(crate) fn run<F>(self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            Self::Background => rayon::spawn(work),
            Self::Inline => work(),
        }
    }
}

#[derive(Debug)]
enum RebuildState {
    Idle,
    Computing { follow_up: Option<CostField> },
}

/// Rebuilds the graph off the tick and publishes it by swapping an [`Arc`].
///
/// At most one rebuild is in flight. Triggers that arrive meanwhile collapse
/// into a single follow-up that uses the newest cost field.
#[derive(Debug)]
pub struct GraphRebuilder {
    dispatch: Dispatch,
    state: RebuildState,
    current: Arc<NavigationGraph>,
    sender: Sender<NavigationGraph>,
    receiver: Receiver<NavigationGraph>,
}

impl GraphRebuilder {
    /// Creates a rebuilder publishing `initial` until the first rebuild lands.
    #[must_use]
    pub fn new(dispatch: Dispatch, initial: NavigationGraph) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            dispatch,
            state: RebuildState::Idle,
            current: Arc::new(initial),
            sender,
            receiver,
        }
    }

    /// Schedules a rebuild from `field`, or records it as the follow-up.
    pub fn request(&mut self, field: CostField) {
        match &mut self.state {
            RebuildState::Idle => {
                self.state = RebuildState::Computing { follow_up: None };
                self.spawn(field);
            }
            RebuildState::Computing { follow_up } => {
                trace!(revision = field.revision(), "rebuild coalesced");
                *follow_up = Some(field);
            }
        }
    }

    /// Publishes finished graphs without blocking.
    ///
    /// Returns the revision of the newest graph published by this call.
    pub fn poll(&mut self) -> Option<u64> {
        let mut published = None;
        loop {
            let graph = match self.receiver.try_recv() {
                Ok(graph) => graph,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            let revision = graph.revision();
            self.current = Arc::new(graph);
            published = Some(revision);
            debug!(revision, "navigation graph published");

            let follow_up = match &mut self.state {
                RebuildState::Computing { follow_up } => follow_up.take(),
                RebuildState::Idle => None,
            };
            match follow_up {
                Some(field) => {
                    self.state = RebuildState::Computing { follow_up: None };
                    self.spawn(field);
                }
                None => self.state = RebuildState::Idle,
            }
        }
        published
    }

    /// Most recently published graph.
    #[must_use]
    pub fn graph(&self) -> Arc<NavigationGraph> {
        Arc::clone(&self.current)
    }

    /// Whether a rebuild is in flight.
    #[must_use]
    pub fn is_computing(&self) -> bool {
        matches!(self.state, RebuildState::Computing { .. })
    }

    fn spawn(&self, field: CostField) {
        let sender = self.sender.clone();
        self.dispatch.run(move || {
            let _ = sender.send(NavigationGraph::build(field));
        });
    }
}
