//! Reply addresses that can be passed inside messages.
//!
//! A [`Recipient`] wraps a mailbox sender together with the conversion from
//! the reply type into the mailbox's own message type. Forwarding a message
//! that carries a recipient keeps the original caller as the reply target.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Result, WordCountError};

/// Identity of a recipient. Clones of one recipient share the same id.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RecipientId(pub Uuid);

impl Default for RecipientId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipientId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Deliver<M> = dyn Fn(M) -> bool + Send + Sync;

pub struct Recipient<M> {
    id: RecipientId,
    deliver: Arc<Deliver<M>>,
}

impl<M> Clone for Recipient<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            deliver: Arc::clone(&self.deliver),
        }
    }
}

impl<M> fmt::Debug for Recipient<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipient").field("id", &self.id).finish()
    }
}

impl<M: Send + 'static> Recipient<M> {
    /// Recipient with a fresh identity delivering into `sender`.
    pub fn new<T>(sender: mpsc::UnboundedSender<T>) -> Self
    where
        T: From<M> + Send + 'static,
    {
        Self::with_id(RecipientId::new(), sender)
    }

    /// Recipient delivering into `sender` under a caller-chosen identity, so
    /// an actor can hand out several typed addresses that all name itself.
    pub fn with_id<T>(id: RecipientId, sender: mpsc::UnboundedSender<T>) -> Self
    where
        T: From<M> + Send + 'static,
    {
        Self {
            id,
            deliver: Arc::new(move |message: M| sender.send(T::from(message)).is_ok()),
        }
    }

    /// Recipient backed by a dedicated channel; handy for clients and tests.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<M>) {
        let (tx, rx) = mpsc::unbounded_channel::<M>();
        (Self::new(tx), rx)
    }

    pub fn id(&self) -> RecipientId {
        self.id
    }

    /// Delivers `message` without waiting. Fails only when the receiving
    /// mailbox no longer exists.
    pub fn tell(&self, message: M) -> Result<()> {
        if (self.deliver)(message) {
            Ok(())
        } else {
            Err(WordCountError::MailboxClosed)
        }
    }
}

/// Set of recipients keyed by identity; registering twice is a no-op.
pub struct SubscriberSet<M> {
    members: Vec<Recipient<M>>,
}

impl<M> Default for SubscriberSet<M> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
        }
    }
}

impl<M> fmt::Debug for SubscriberSet<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberSet")
            .field("members", &self.members.len())
            .finish()
    }
}

impl<M: Clone + Send + 'static> SubscriberSet<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when a recipient with the same id is already present.
    pub fn insert(&mut self, recipient: Recipient<M>) -> bool {
        if self.members.iter().any(|m| m.id == recipient.id) {
            return false;
        }
        self.members.push(recipient);
        true
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sends `message` to every member once and empties the set. Returns the
    /// number of members whose mailbox accepted it.
    pub fn notify_all(&mut self, message: &M) -> usize {
        self.members
            .drain(..)
            .filter(|member| member.tell(message.clone()).is_ok())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Mailbox {
        Text(String),
    }

    impl From<String> for Mailbox {
        fn from(value: String) -> Self {
            Mailbox::Text(value)
        }
    }

    #[tokio::test]
    async fn recipient_converts_into_mailbox_type() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Mailbox>();
        let recipient: Recipient<String> = Recipient::new(tx);

        recipient.tell("hello".to_string()).unwrap();
        assert_eq!(rx.recv().await, Some(Mailbox::Text("hello".into())));
    }

    #[tokio::test]
    async fn tell_fails_once_mailbox_is_gone() {
        let (recipient, rx) = Recipient::<u32>::channel();
        drop(rx);
        assert!(matches!(recipient.tell(1), Err(WordCountError::MailboxClosed)));
    }

    #[tokio::test]
    async fn subscriber_set_delivers_once_per_identity() {
        let (recipient, mut rx) = Recipient::<u32>::channel();
        let mut set = SubscriberSet::new();
        assert!(set.insert(recipient.clone()));
        assert!(!set.insert(recipient));

        assert_eq!(set.notify_all(&7), 1);
        assert!(set.is_empty());
        assert_eq!(set.notify_all(&8), 0);

        assert_eq!(rx.recv().await, Some(7));
        assert!(rx.try_recv().is_err());
    }
}
