//! The mailbox processor: the only writer of an agent's state.
//!
//! One task per agent drains the agent's mailbox in order and applies each
//! transaction under the state lock. Every transaction that carries a
//! reply slot is answered exactly once. If the requester has already given
//! up (its timeout fired), an accepted change is undone while the lock is
//! still held, so the requester's view and the agent's state agree.

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use eco_market::{Envelope, MailboxReceiver, Transaction};

use crate::state::{SharedState, lock};

/// Start the processor for `receiver` on the current runtime.
pub fn spawn_processor(
    name: impl Into<String>,
    receiver: MailboxReceiver,
    state: SharedState,
) -> JoinHandle<()> {
    tokio::spawn(process_transactions(name.into(), receiver, state))
}

/// Apply transactions until a quit envelope or until every sender is gone.
///
/// After the quit envelope the mailbox is closed. Anything that slipped in
/// before the close is still handled: fire-and-forget transactions are
/// applied and requests are refused.
pub async fn process_transactions(name: String, mut receiver: MailboxReceiver, state: SharedState) {
    let mut applied: u64 = 0;
    while let Some(envelope) = receiver.recv().await {
        match envelope {
            Envelope::Deliver(transaction) => {
                handle(&name, &state, transaction);
                applied = applied.saturating_add(1);
            }
            Envelope::Quit => {
                receiver.close();
                while let Some(late) = receiver.try_recv() {
                    if let Envelope::Deliver(transaction) = late {
                        refuse_or_apply(&name, &state, transaction);
                    }
                }
                break;
            }
        }
    }
    info!(agent = %name, applied, "mailbox closed");
}

fn handle(name: &str, state: &SharedState, transaction: Transaction) {
    let Transaction {
        kind,
        from,
        memo,
        reply,
    } = transaction;
    let label = kind.label();

    let mut guard = lock(state);
    let result = guard.apply(kind);
    match &result {
        Ok(_) => debug!(agent = %name, kind = label, from = %from, memo = %memo, cash = %guard.cash, "applied"),
        Err(refusal) => debug!(agent = %name, kind = label, from = %from, memo = %memo, reason = %refusal, "refused"),
    }

    let Some(reply) = reply else {
        return;
    };
    let accepted = result.is_ok();
    if let (Err(_unsent), Ok(undo)) = (reply.send(accepted), result) {
        guard.revert(undo);
        warn!(agent = %name, kind = label, from = %from, "requester gave up, change reverted");
    }
}

fn refuse_or_apply(name: &str, state: &SharedState, mut transaction: Transaction) {
    let Some(reply) = transaction.reply.take() else {
        handle(name, state, transaction);
        return;
    };
    let _ = reply.send(false);
    debug!(agent = %name, kind = transaction.kind.label(), "refused after quit");
}
