//! The market actor.
//!
//! One task owns the order loop. Sellers push lots straight into the
//! shared [`OrderBook`]; buyers submit orders through a bounded queue that
//! the loop drains one at a time. Report requests arrive on their own queue
//! and are answered between orders, so a reader never stalls matching.
//!
//! The book lock is a [`std::sync::Mutex`] and is never held across an
//! await point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Notify, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use eco_types::MarketReport;

use crate::MarketError;
use crate::book::{OrderBook, Settlement};
use crate::lot::InventoryLot;
use crate::mailbox::Mailbox;
use crate::order::{Order, OrderOutcome};
use crate::transaction::{Transaction, TransactionKind};

/// Name the market signs its transactions with.
const MARKET_NAME: &str = "market";

/// Tuning for the market actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketConfig {
    /// Orders that can wait in the queue before `submit` has to wait.
    pub order_queue_capacity: usize,
    /// How long to wait for a buyer to answer a purchase proposal.
    pub response_timeout: Duration,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            order_queue_capacity: 100,
            response_timeout: Duration::from_millis(1000),
        }
    }
}

/// Stop flag shared by the handle and the loop.
#[derive(Debug, Default)]
struct StopSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    fn trigger(&self) -> bool {
        let already = self.requested.swap(true, Ordering::SeqCst);
        self.notify.notify_one();
        !already
    }

    fn is_set(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        while !self.is_set() {
            self.notify.notified().await;
        }
    }
}

/// Entry point for starting a market.
#[derive(Debug)]
pub struct Market;

impl Market {
    /// Start the order loop on the current tokio runtime.
    pub fn spawn(config: MarketConfig) -> MarketHandle {
        let book = Arc::new(Mutex::new(OrderBook::new()));
        let (order_tx, order_rx) = mpsc::channel(config.order_queue_capacity.max(1));
        let (report_tx, report_rx) = mpsc::channel(8);
        let stop = Arc::new(StopSignal::default());

        let task = tokio::spawn(process_orders(
            Arc::clone(&book),
            order_rx,
            report_rx,
            Arc::clone(&stop),
            config.response_timeout,
        ));
        info!(
            capacity = config.order_queue_capacity,
            timeout_ms = config.response_timeout.as_millis(),
            "market started"
        );

        MarketHandle {
            book,
            orders: order_tx,
            reports: report_tx,
            stop,
            task: Arc::new(tokio::sync::Mutex::new(Some(task))),
        }
    }
}

/// Cloneable handle to a running market.
#[derive(Debug, Clone)]
pub struct MarketHandle {
    book: Arc<Mutex<OrderBook>>,
    orders: mpsc::Sender<Order>,
    reports: mpsc::Sender<oneshot::Sender<MarketReport>>,
    stop: Arc<StopSignal>,
    task: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl MarketHandle {
    /// Offer a lot for sale. The market owns it from here on.
    pub fn push(&self, lot: InventoryLot) {
        debug!(
            seller = %lot.originator_name,
            kind = %lot.kind_key,
            units = lot.unit_count(),
            unit_price = %lot.unit_price,
            "lot received"
        );
        lock(&self.book).push(lot);
    }

    /// Queue an order, waiting for room if the queue is full.
    pub async fn submit(&self, order: Order) -> Result<(), MarketError> {
        if self.stop.is_set() {
            return Err(MarketError::MarketClosed);
        }
        self.orders
            .send(order)
            .await
            .map_err(|_closed| MarketError::MarketClosed)
    }

    /// Queue an order and wait for its outcome.
    pub async fn place_order(&self, mut order: Order) -> Result<OrderOutcome, MarketError> {
        let (tx, rx) = oneshot::channel();
        order.outcome = Some(tx);
        self.submit(order).await?;
        rx.await.map_err(|_dropped| MarketError::MarketClosed)
    }

    /// Activity since the previous report, plus current stock.
    pub async fn report(&self) -> Result<MarketReport, MarketError> {
        if self.stop.is_set() {
            return Err(MarketError::MarketClosed);
        }
        let (tx, rx) = oneshot::channel();
        self.reports
            .send(tx)
            .await
            .map_err(|_closed| MarketError::MarketClosed)?;
        rx.await.map_err(|_dropped| MarketError::MarketClosed)
    }

    /// Snapshot of the lots on offer for `key`, cheapest first.
    pub fn lots(&self, key: &str) -> Vec<InventoryLot> {
        lock(&self.book).lots(key)
    }

    /// Units currently on offer across all goods.
    pub fn stock(&self) -> u64 {
        lock(&self.book).stock()
    }

    /// Whether `quit` has been called.
    pub fn is_closed(&self) -> bool {
        self.stop.is_set()
    }

    /// Stop the order loop and wait for it to exit.
    ///
    /// The order being matched is finished; orders still queued are
    /// answered with [`OrderOutcome::MarketClosed`]. Safe to call more than
    /// once and from several handles.
    pub async fn quit(&self) {
        if self.stop.trigger() {
            info!("market quit requested");
        }
        let Some(task) = self.task.lock().await.take() else {
            return;
        };
        if let Err(err) = task.await {
            warn!(error = %err, "market loop ended abnormally");
        }
    }
}

fn lock(book: &Mutex<OrderBook>) -> MutexGuard<'_, OrderBook> {
    book.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Order loop
// ---------------------------------------------------------------------------

async fn process_orders(
    book: Arc<Mutex<OrderBook>>,
    mut orders: mpsc::Receiver<Order>,
    mut reports: mpsc::Receiver<oneshot::Sender<MarketReport>>,
    stop: Arc<StopSignal>,
    timeout: Duration,
) {
    loop {
        tokio::select! {
            biased;
            () = stop.wait() => break,
            next = orders.recv() => {
                let Some(order) = next else { break };
                match_order(&book, order, timeout).await;
            }
            Some(reply) = reports.recv() => {
                let report = lock(&book).take_report();
                let _ = reply.send(report);
            }
        }
    }

    orders.close();
    reports.close();
    let mut abandoned: u32 = 0;
    while let Ok(order) = orders.try_recv() {
        abandoned = abandoned.saturating_add(1);
        if let Some(outcome) = order.outcome {
            let _ = outcome.send(OrderOutcome::MarketClosed);
        }
    }
    info!(abandoned, "market stopped");
}

/// Run one order through reserve, propose, and confirm or roll back.
async fn match_order(book: &Mutex<OrderBook>, order: Order, timeout: Duration) {
    let Order {
        id,
        requester_name,
        kind_key,
        desired_quantity,
        available_cash,
        reply,
        outcome,
        ..
    } = order;

    let reserved = lock(book).reserve(&kind_key, desired_quantity, available_cash);
    let result = match reserved {
        Err(unmatched) => {
            debug!(
                order = %id,
                buyer = %requester_name,
                kind = %kind_key,
                desired = desired_quantity,
                cash = %available_cash,
                outcome = ?unmatched,
                "order not matched"
            );
            unmatched
        }
        Ok(reservation) => {
            let quantity = reservation.quantity();
            let total = reservation.total();
            let unit_price = reservation.lot().unit_price;
            let debit = TransactionKind::Debit {
                amount: total,
                units: reservation.proposed_units(),
            };
            let answer = reply
                .request(
                    debit,
                    MARKET_NAME,
                    format!("purchase of {quantity} {kind_key} at {unit_price}"),
                    timeout,
                )
                .await;

            if answer.is_accepted() {
                let settlement = lock(book).settle(reservation);
                let credit = Transaction::new(
                    TransactionKind::Credit {
                        amount: settlement.total,
                    },
                    requester_name.as_str(),
                    format!("sale of {} {kind_key}", settlement.quantity),
                );
                if let Err(err) = settlement.seller.post(credit) {
                    warn!(
                        seller = %settlement.seller_name,
                        buyer = %requester_name,
                        error = %err,
                        "seller is gone, refunding buyer"
                    );
                    refund(&reply, &requester_name, &settlement, &kind_key);
                }
                info!(
                    order = %id,
                    buyer = %requester_name,
                    seller = %settlement.seller_name,
                    kind = %kind_key,
                    quantity = settlement.quantity,
                    units = settlement.sold.len(),
                    unit_price = %settlement.unit_price,
                    total = %settlement.total,
                    "sale confirmed"
                );
                OrderOutcome::Filled {
                    quantity,
                    unit_price,
                    total,
                }
            } else {
                lock(book).restore(reservation.into_lot());
                debug!(
                    order = %id,
                    buyer = %requester_name,
                    kind = %kind_key,
                    quantity,
                    reply = ?answer,
                    "purchase declined, lot restored"
                );
                OrderOutcome::Declined { quantity }
            }
        }
    };

    if let Some(outcome) = outcome {
        let _ = outcome.send(result);
    }
}

/// Return the proceeds of a settled sale to the buyer when they cannot
/// reach the seller. The buyer keeps the goods.
fn refund(buyer: &Mailbox, buyer_name: &str, settlement: &Settlement, kind_key: &str) {
    let credit = Transaction::new(
        TransactionKind::Credit {
            amount: settlement.total,
        },
        MARKET_NAME,
        format!(
            "refund for {} {kind_key}, {} has left",
            settlement.quantity, settlement.seller_name
        ),
    );
    if let Err(err) = buyer.post(credit) {
        warn!(buyer = %buyer_name, error = %err, "refund could not be delivered");
    }
}
