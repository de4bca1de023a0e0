//! Redux-like state container with deferred effects.
//!
//! `dispatch` resolves an [`Action`] against the current state and commits the
//! result synchronously. Any [`Effect`]s it returns get a chance to `prepare`
//! the committed state, then their `perform` halves are queued on an unbounded
//! channel together with a snapshot of that state. The owner drains the queue
//! with [`StateContainer::run_effects`] or [`StateContainer::run_until_idle`];
//! effects report back through an [`EffectUpdater`].

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

use crate::error::{StateError, StateResult};

// ============================================================================
// Actions and effects
// ============================================================================

/// Outcome of resolving an action
pub enum Transition<S> {
    /// Commit the state, nothing else to do
    Next(S),
    /// Commit the state, then run the effects
    WithEffects(S, Vec<Box<dyn Effect<S>>>),
}

/// Something that can be dispatched against a state of type `S`
pub trait Action<S> {
    /// Name used in change notifications and logs
    fn name(&self) -> &'static str;

    /// Compute the next state. An error leaves the current state untouched.
    fn update(self, state: &S) -> StateResult<Transition<S>>;
}

/// Work deferred past a dispatch
pub trait Effect<S> {
    /// Name used in logs
    fn name(&self) -> &'static str {
        "effect"
    }

    /// Adjust the state before it is committed and observers are notified
    fn prepare(&self, state: S) -> S {
        state
    }

    /// Run the effect against a snapshot of the committed state
    fn perform(self: Box<Self>, state: &S, updater: &EffectUpdater<S>);
}

/// Where a state change came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A dispatched action
    Action(&'static str),
    /// An update pushed by an effect of `action`
    Effect { action: &'static str, tag: String },
}

enum Message<S> {
    Perform {
        action: &'static str,
        effect: Box<dyn Effect<S>>,
        snapshot: S,
    },
    Update {
        action: &'static str,
        tag: String,
        updater: Box<dyn FnOnce(&S) -> S>,
    },
}

/// Handle an effect uses to amend the state
pub struct EffectUpdater<S> {
    action: &'static str,
    sender: UnboundedSender<Message<S>>,
}

impl<S> Clone for EffectUpdater<S> {
    fn clone(&self) -> Self {
        Self {
            action: self.action,
            sender: self.sender.clone(),
        }
    }
}

impl<S: 'static> EffectUpdater<S> {
    /// Queue `updater` to run against whatever the state is when it is applied
    pub fn set_state(&self, tag: impl Into<String>, updater: impl FnOnce(&S) -> S + 'static) {
        let tag = tag.into();
        let message = Message::Update {
            action: self.action,
            tag: tag.clone(),
            updater: Box::new(updater),
        };
        if self.sender.send(message).is_err() {
            warn!(action = self.action, tag = %tag, "Dropping effect update, container disposed");
        }
    }
}

// ============================================================================
// Container
// ============================================================================

type OnChange<S> = Box<dyn FnMut(&S, &ChangeOrigin)>;

/// Holds the current state and the queue of pending effect work
pub struct StateContainer<S> {
    state: S,
    on_change: OnChange<S>,
    sender: Option<UnboundedSender<Message<S>>>,
    receiver: UnboundedReceiver<Message<S>>,
}

impl<S: Clone + 'static> StateContainer<S> {
    /// Container holding `initial`; `on_change` runs after every commit
    pub fn new(initial: S, on_change: impl FnMut(&S, &ChangeOrigin) + 'static) -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            state: initial,
            on_change: Box::new(on_change),
            sender: Some(sender),
            receiver,
        }
    }

    /// Current committed state
    pub fn get_state(&self) -> &S {
        &self.state
    }

    /// Resolve and commit `action`, queueing any effects it returns
    pub fn dispatch<A: Action<S>>(&mut self, action: A) -> StateResult<()> {
        let sender = self.sender.clone().ok_or(StateError::Disposed)?;
        let name = action.name();

        let (next, effects) = match action.update(&self.state)? {
            Transition::Next(state) => (state, Vec::new()),
            Transition::WithEffects(state, effects) => (state, effects),
        };
        self.state = effects
            .iter()
            .fold(next, |state, effect| effect.prepare(state));
        debug!(action = name, effects = effects.len(), "Dispatched action");
        (self.on_change)(&self.state, &ChangeOrigin::Action(name));

        for effect in effects {
            let message = Message::Perform {
                action: name,
                effect,
                snapshot: self.state.clone(),
            };
            let _ = sender.send(message);
        }
        Ok(())
    }

    /// Drain the queue on the calling thread, returning how many messages ran
    pub fn run_effects(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.receiver.try_recv() {
            self.handle(message);
            handled += 1;
        }
        handled
    }

    /// Drain the queue, yielding to the runtime between messages
    pub async fn run_until_idle(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.receiver.try_recv() {
            self.handle(message);
            handled += 1;
            tokio::task::yield_now().await;
        }
        handled
    }

    /// Close the queue and drop pending work
    pub fn dispose(&mut self) {
        self.sender = None;
        self.receiver.close();
        let mut dropped = 0;
        while self.receiver.try_recv().is_ok() {
            dropped += 1;
        }
        debug!(dropped, "Disposed state container");
    }

    /// Whether `dispose` has run
    pub fn is_disposed(&self) -> bool {
        self.sender.is_none()
    }

    fn handle(&mut self, message: Message<S>) {
        match message {
            Message::Perform {
                action,
                effect,
                snapshot,
            } => {
                let Some(sender) = &self.sender else {
                    return;
                };
                let updater = EffectUpdater {
                    action,
                    sender: sender.clone(),
                };
                trace!(action, effect = effect.name(), "Performing effect");
                effect.perform(&snapshot, &updater);
            }
            Message::Update {
                action,
                tag,
                updater,
            } => {
                self.state = updater(&self.state);
                debug!(action, tag = %tag, "Applied effect update");
                (self.on_change)(&self.state, &ChangeOrigin::Effect { action, tag });
            }
        }
    }
}
