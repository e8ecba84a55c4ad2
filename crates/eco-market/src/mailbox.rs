//! Per-agent mailboxes: the sending half of the transaction protocol.
//!
//! Every agent owns one unbounded queue. Anyone holding a [`Mailbox`]
//! (the market, employers, the agent itself) can enqueue transactions; a
//! single consumer task per agent drains the [`MailboxReceiver`] and is the
//! only writer of that agent's cash and goods.
//!
//! Delivery never blocks the sender. Response-required requests go through
//! [`Mailbox::request`], which bounds the wait with a timeout and resolves
//! every failure mode (timeout, closed mailbox, dropped reply slot) to a
//! rejection.
//!
//! Backpressure policy: the queue is unbounded. Queue depth is bounded in
//! practice by the number of in-flight orders and labor contracts.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use eco_types::AgentId;

use crate::MarketError;
use crate::transaction::{Transaction, TransactionKind};

/// An item in an agent's queue.
#[derive(Debug)]
pub enum Envelope {
    /// A transaction to apply.
    Deliver(Transaction),
    /// Stop after everything queued before this envelope has been applied.
    Quit,
}

/// How a response-required request ended, from the requester's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// The agent applied the transaction.
    Accepted,
    /// The agent refused (e.g. insufficient funds).
    Rejected,
    /// No answer arrived before the deadline.
    TimedOut,
    /// The mailbox was closed or the reply slot was dropped unanswered.
    Undeliverable,
}

impl Reply {
    /// Only [`Reply::Accepted`] means the transaction happened.
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Sending handle for one agent's queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Mailbox {
    owner: AgentId,
    sender: mpsc::UnboundedSender<Envelope>,
}

/// Receiving handle, owned by the agent's mailbox processor.
#[derive(Debug)]
pub struct MailboxReceiver {
    owner: AgentId,
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

/// Create a mailbox for `owner`.
pub fn mailbox(owner: AgentId) -> (Mailbox, MailboxReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        Mailbox { owner, sender },
        MailboxReceiver { owner, receiver },
    )
}

impl Mailbox {
    /// The agent this mailbox belongs to.
    pub const fn owner(&self) -> AgentId {
        self.owner
    }

    /// Whether the processor has stopped accepting messages.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Enqueue a transaction without waiting for it to be applied.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::MailboxClosed`] if the processor has exited.
    pub fn post(&self, transaction: Transaction) -> Result<(), MarketError> {
        self.sender
            .send(Envelope::Deliver(transaction))
            .map_err(|_err| MarketError::MailboxClosed { owner: self.owner })
    }

    /// Send a response-required transaction and wait for the reply.
    ///
    /// The wait is bounded by `timeout`. When the deadline passes the
    /// reply slot is closed; a reply that was sent before the close is
    /// still honored, and one sent after it fails on the agent's side, which
    /// then undoes the change. Either way both sides agree on the outcome.
    pub async fn request(
        &self,
        kind: TransactionKind,
        from: &str,
        memo: impl Into<String>,
        timeout: Duration,
    ) -> Reply {
        let (reply_tx, mut reply_rx) = oneshot::channel();
        let label = kind.label();
        let transaction = Transaction::new(kind, from, memo).with_reply(reply_tx);

        if self.sender.send(Envelope::Deliver(transaction)).is_err() {
            warn!(owner = %self.owner, kind = label, "request sent to closed mailbox");
            return Reply::Undeliverable;
        }

        match tokio::time::timeout(timeout, &mut reply_rx).await {
            Ok(Ok(true)) => Reply::Accepted,
            Ok(Ok(false)) => Reply::Rejected,
            Ok(Err(_closed)) => {
                warn!(owner = %self.owner, kind = label, "request dropped without a reply");
                Reply::Undeliverable
            }
            Err(_elapsed) => {
                reply_rx.close();
                match reply_rx.try_recv() {
                    Ok(true) => Reply::Accepted,
                    Ok(false) => Reply::Rejected,
                    Err(_missing) => {
                        warn!(
                            owner = %self.owner,
                            kind = label,
                            timeout_ms = timeout.as_millis(),
                            "request timed out, treating as rejected"
                        );
                        Reply::TimedOut
                    }
                }
            }
        }
    }

    /// Ask the processor to stop once everything queued so far is applied.
    ///
    /// Returns `false` if the processor had already exited.
    pub fn quit(&self) -> bool {
        self.sender.send(Envelope::Quit).is_ok()
    }
}

impl MailboxReceiver {
    /// The agent this mailbox belongs to.
    pub const fn owner(&self) -> AgentId {
        self.owner
    }

    /// Wait for the next envelope. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    /// Refuse further sends. Already-queued envelopes stay readable.
    pub fn close(&mut self) {
        self.receiver.close();
    }

    /// Take the next queued envelope without waiting.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn debit(amount: i64) -> TransactionKind {
        TransactionKind::Debit {
            amount: Decimal::new(amount, 0),
            units: Vec::new(),
        }
    }

    #[tokio::test]
    async fn post_is_delivered_in_order() {
        let (mb, mut rx) = mailbox(AgentId::new());
        for i in 1..=3 {
            mb.post(Transaction::new(
                TransactionKind::Credit {
                    amount: Decimal::new(i, 0),
                },
                "test",
                "",
            ))
            .unwrap();
        }

        for expected in 1..=3 {
            let envelope = rx.recv().await;
            assert!(matches!(
                envelope,
                Some(Envelope::Deliver(Transaction {
                    kind: TransactionKind::Credit { amount },
                    ..
                })) if amount == Decimal::new(expected, 0)
            ));
        }
    }

    #[tokio::test]
    async fn post_to_closed_mailbox_fails() {
        let owner = AgentId::new();
        let (mb, rx) = mailbox(owner);
        drop(rx);
        let result = mb.post(Transaction::new(debit(1), "test", ""));
        assert!(matches!(result, Err(MarketError::MailboxClosed { owner: o }) if o == owner));
        assert!(mb.is_closed());
    }

    #[tokio::test]
    async fn request_returns_the_reply() {
        let (mb, mut rx) = mailbox(AgentId::new());
        let responder = tokio::spawn(async move {
            if let Some(Envelope::Deliver(t)) = rx.recv().await {
                t.reply.unwrap().send(false).unwrap();
            }
        });

        let reply = mb
            .request(debit(5), "market", "purchase", Duration::from_secs(1))
            .await;
        assert_eq!(reply, Reply::Rejected);
        assert!(!reply.is_accepted());
        responder.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn request_times_out_as_rejection() {
        let (mb, mut rx) = mailbox(AgentId::new());
        // Keep the receiver alive but never answer.
        let holder = tokio::spawn(async move {
            let envelope = rx.recv().await;
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(envelope);
        });

        let reply = mb
            .request(debit(5), "market", "purchase", Duration::from_millis(50))
            .await;
        assert_eq!(reply, Reply::TimedOut);
        holder.abort();
    }

    #[tokio::test]
    async fn late_reply_after_timeout_fails_on_sender_side() {
        let (mb, mut rx) = mailbox(AgentId::new());
        let reply = mb
            .request(debit(5), "market", "purchase", Duration::from_millis(1))
            .await;
        assert_eq!(reply, Reply::TimedOut);

        // The agent gets to it late: its reply must not be delivered.
        let envelope = rx.recv().await;
        assert!(matches!(envelope, Some(Envelope::Deliver(_))));
        if let Some(Envelope::Deliver(t)) = envelope {
            assert!(t.reply.unwrap().send(true).is_err());
        }
    }

    #[tokio::test]
    async fn dropped_reply_slot_is_undeliverable() {
        let (mb, mut rx) = mailbox(AgentId::new());
        let responder = tokio::spawn(async move {
            // Receive and drop without answering.
            let _ = rx.recv().await;
        });
        let reply = mb
            .request(debit(5), "market", "purchase", Duration::from_secs(1))
            .await;
        assert_eq!(reply, Reply::Undeliverable);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn request_to_closed_mailbox_is_undeliverable() {
        let (mb, rx) = mailbox(AgentId::new());
        drop(rx);
        let reply = mb
            .request(debit(1), "market", "purchase", Duration::from_secs(1))
            .await;
        assert_eq!(reply, Reply::Undeliverable);
    }

    #[tokio::test]
    async fn quit_is_queued_behind_earlier_messages() {
        let (mb, mut rx) = mailbox(AgentId::new());
        mb.post(Transaction::new(debit(1), "test", "")).unwrap();
        assert!(mb.quit());
        assert!(matches!(rx.recv().await, Some(Envelope::Deliver(_))));
        assert!(matches!(rx.recv().await, Some(Envelope::Quit)));
    }
}
