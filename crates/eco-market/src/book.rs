//! The order book: price-sorted lots per good, plus report accumulators.
//!
//! The book itself is plain data with no locking. The market actor keeps
//! it behind a mutex and only ever calls these methods with the lock held
//! for the duration of one call.
//!
//! Every key's lots are kept sorted ascending by unit price. Sorting is
//! stable, so among equal prices the earliest pushed lot sells first.
//! Pushing re-sorts the whole slice, which is fine at simulation scale but
//! would want a sorted insert for large books.

use std::collections::HashMap;

use rust_decimal::Decimal;

use eco_types::{MarketReport, Unit};

use crate::lot::InventoryLot;
use crate::mailbox::Mailbox;
use crate::order::{OrderOutcome, purchasable_quantity};

/// Running totals since the last report.
#[derive(Debug, Clone, Default)]
struct Accumulators {
    sold: u64,
    received: u64,
    total_cash_flow: Decimal,
}

/// Lots on offer, keyed by good.
#[derive(Debug, Default)]
pub struct OrderBook {
    lots: HashMap<String, Vec<InventoryLot>>,
    stats: Accumulators,
}

/// A lot popped out of the book for one match attempt.
///
/// While a reservation exists the lot is invisible to every other order.
/// It must end in exactly one of [`OrderBook::settle`] or
/// [`OrderBook::restore`].
#[derive(Debug)]
pub struct Reservation {
    lot: InventoryLot,
    quantity: u32,
    total: Decimal,
}

impl Reservation {
    /// Units that will be sold if the buyer accepts.
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Price the buyer is asked to pay.
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// The reserved lot.
    pub const fn lot(&self) -> &InventoryLot {
        &self.lot
    }

    /// Copies of the units proposed to the buyer.
    pub fn proposed_units(&self) -> Vec<Unit> {
        self.lot.front_units(as_len(self.quantity))
    }

    /// Give the lot back untouched.
    pub fn into_lot(self) -> InventoryLot {
        self.lot
    }
}

/// The result of a completed sale, for crediting the seller.
#[derive(Debug)]
pub struct Settlement {
    /// Where the proceeds go.
    pub seller: Mailbox,
    /// Seller display name.
    pub seller_name: String,
    /// Units sold.
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: Decimal,
    /// Proceeds of the sale.
    pub total: Decimal,
    /// The units that left the lot.
    pub sold: Vec<Unit>,
}

impl OrderBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a lot and keep that key sorted by price.
    ///
    /// Empty lots are ignored.
    pub fn push(&mut self, lot: InventoryLot) {
        if lot.is_empty() {
            return;
        }
        let count = u64::try_from(lot.unit_count()).unwrap_or(u64::MAX);
        self.stats.received = self.stats.received.saturating_add(count);

        let lots = self.lots.entry(lot.kind_key.clone()).or_default();
        lots.push(lot);
        lots.sort_by_key(|l| l.unit_price);
    }

    /// The cheapest lot on offer for `key`.
    #[cfg(test)]
    pub fn lowest(&self, key: &str) -> Option<&InventoryLot> {
        self.lots.get(key).and_then(|lots| lots.first())
    }

    /// Pop the cheapest lot for `key` if the buyer can afford at least one
    /// unit of it.
    ///
    /// Nothing changes when the result is an error.
    pub fn reserve(
        &mut self,
        key: &str,
        desired: u32,
        cash: Decimal,
    ) -> Result<Reservation, OrderOutcome> {
        if desired == 0 {
            return Err(OrderOutcome::NothingRequested);
        }
        let Some(lots) = self.lots.get_mut(key) else {
            return Err(OrderOutcome::NoSupply);
        };
        let Some(cheapest) = lots.first() else {
            return Err(OrderOutcome::NoSupply);
        };

        let unit_price = cheapest.unit_price;
        let quantity = purchasable_quantity(desired, cheapest.unit_count(), unit_price, cash);
        if quantity == 0 {
            return Err(OrderOutcome::Unaffordable { unit_price });
        }
        let Some(total) = Decimal::from(quantity).checked_mul(unit_price) else {
            return Err(OrderOutcome::Unaffordable { unit_price });
        };

        let lot = lots.remove(0);
        if lots.is_empty() {
            self.lots.remove(key);
        }
        Ok(Reservation {
            lot,
            quantity,
            total,
        })
    }

    /// Put a lot back at its sorted position, ahead of equal-priced lots.
    pub fn restore(&mut self, lot: InventoryLot) {
        if lot.is_empty() {
            return;
        }
        let lots = self.lots.entry(lot.kind_key.clone()).or_default();
        let at = lots.partition_point(|l| l.unit_price < lot.unit_price);
        lots.insert(at, lot);
    }

    /// Complete an accepted sale.
    ///
    /// The sold units leave the lot, any remainder goes back into the book,
    /// and the sale is added to the report accumulators.
    pub fn settle(&mut self, reservation: Reservation) -> Settlement {
        let Reservation {
            mut lot,
            quantity,
            total,
        } = reservation;

        let sold = lot.take_front(as_len(quantity));
        self.stats.sold = self.stats.sold.saturating_add(u64::from(quantity));
        self.stats.total_cash_flow = self.stats.total_cash_flow.saturating_add(total);

        let settlement = Settlement {
            seller: lot.seller.clone(),
            seller_name: lot.originator_name.clone(),
            quantity,
            unit_price: lot.unit_price,
            total,
            sold,
        };
        self.restore(lot);
        settlement
    }

    /// Snapshot of the lots on offer for `key`, cheapest first.
    pub fn lots(&self, key: &str) -> Vec<InventoryLot> {
        self.lots.get(key).cloned().unwrap_or_default()
    }

    /// Units on offer across every good.
    pub fn stock(&self) -> u64 {
        self.lots
            .values()
            .flatten()
            .map(|lot| u64::try_from(lot.unit_count()).unwrap_or(u64::MAX))
            .fold(0_u64, u64::saturating_add)
    }

    /// Read the activity since the last report and reset the accumulators.
    pub fn take_report(&mut self) -> MarketReport {
        let stats = std::mem::take(&mut self.stats);
        let average_price = if stats.sold == 0 {
            Decimal::ZERO
        } else {
            stats
                .total_cash_flow
                .checked_div(Decimal::from(stats.sold))
                .unwrap_or(Decimal::ZERO)
        };
        MarketReport {
            sold: stats.sold,
            received: stats.received,
            total_cash_flow: stats.total_cash_flow,
            average_price,
            stock: self.stock(),
        }
    }
}

fn as_len(quantity: u32) -> usize {
    usize::try_from(quantity).unwrap_or(usize::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use eco_types::{AgentId, ConsumableKind, KEY_APPLE};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::mailbox::{MailboxReceiver, mailbox};

    fn lot(count: usize, price: Decimal) -> (InventoryLot, MailboxReceiver) {
        let seller = AgentId::new();
        let (mb, rx) = mailbox(seller);
        let lot = InventoryLot {
            originator: seller,
            originator_name: String::from("seller"),
            kind_key: String::from(KEY_APPLE),
            units: (0..count)
                .map(|_| Unit::new(ConsumableKind::apple()))
                .collect(),
            unit_price: price,
            cost_basis: dec!(0.50),
            seller: mb,
        };
        (lot, rx)
    }

    fn prices(book: &OrderBook) -> Vec<Decimal> {
        book.lots(KEY_APPLE).iter().map(|l| l.unit_price).collect()
    }

    #[test]
    fn push_keeps_lots_sorted_and_counts_received() {
        let mut book = OrderBook::new();
        let (a, _ra) = lot(3, dec!(3.00));
        let (b, _rb) = lot(4, dec!(1.00));
        let (c, _rc) = lot(5, dec!(2.00));
        book.push(a);
        book.push(b);
        book.push(c);

        assert_eq!(prices(&book), vec![dec!(1.00), dec!(2.00), dec!(3.00)]);
        assert_eq!(book.stock(), 12);
        let report = book.take_report();
        assert_eq!(report.received, 12);
        assert_eq!(report.stock, 12);
    }

    #[test]
    fn empty_lot_is_ignored() {
        let mut book = OrderBook::new();
        let (empty, _rx) = lot(0, dec!(1.00));
        book.push(empty);
        assert!(book.lowest(KEY_APPLE).is_none());
        assert_eq!(book.take_report().received, 0);
    }

    #[test]
    fn reserve_hides_the_lot() {
        let mut book = OrderBook::new();
        let (a, _ra) = lot(10, dec!(2.00));
        book.push(a);

        let reservation = book.reserve(KEY_APPLE, 10, dec!(25.00)).unwrap();
        assert_eq!(reservation.quantity(), 10);
        assert_eq!(reservation.total(), dec!(20.00));
        assert!(book.lowest(KEY_APPLE).is_none());
        assert_eq!(
            book.reserve(KEY_APPLE, 10, dec!(25.00)).unwrap_err(),
            OrderOutcome::NoSupply
        );
    }

    #[test]
    fn reserve_rounds_down_to_affordable_units() {
        let mut book = OrderBook::new();
        let (a, _ra) = lot(10, dec!(2.00));
        book.push(a);

        let reservation = book.reserve(KEY_APPLE, 10, dec!(9.99)).unwrap();
        assert_eq!(reservation.quantity(), 4);
        assert_eq!(reservation.total(), dec!(8.00));
        assert_eq!(reservation.proposed_units().len(), 4);
    }

    #[test]
    fn unaffordable_order_changes_nothing() {
        let mut book = OrderBook::new();
        let (a, _ra) = lot(10, dec!(2.00));
        book.push(a);

        assert_eq!(
            book.reserve(KEY_APPLE, 10, dec!(1.50)).unwrap_err(),
            OrderOutcome::Unaffordable {
                unit_price: dec!(2.00)
            }
        );
        assert_eq!(book.stock(), 10);
        assert_eq!(
            book.reserve(KEY_APPLE, 0, dec!(100)).unwrap_err(),
            OrderOutcome::NothingRequested
        );
        assert_eq!(
            book.reserve("pear", 1, dec!(100)).unwrap_err(),
            OrderOutcome::NoSupply
        );
    }

    #[test]
    fn restore_puts_lot_back_unchanged_and_sorted() {
        let mut book = OrderBook::new();
        let (cheap, _r1) = lot(6, dec!(1.00));
        let (same, _r2) = lot(2, dec!(1.00));
        let (dear, _r3) = lot(3, dec!(5.00));
        let original: Vec<_> = cheap.units.iter().map(|u| u.id).collect();
        book.push(cheap);
        book.push(same);
        book.push(dear);

        let reservation = book.reserve(KEY_APPLE, 4, dec!(100)).unwrap();
        assert_eq!(book.stock(), 5);
        book.restore(reservation.into_lot());

        let lots = book.lots(KEY_APPLE);
        assert_eq!(prices(&book), vec![dec!(1.00), dec!(1.00), dec!(5.00)]);
        let first = lots.first().unwrap();
        assert_eq!(first.unit_count(), 6);
        assert_eq!(first.units.iter().map(|u| u.id).collect::<Vec<_>>(), original);
        assert_eq!(book.stock(), 11);
    }

    #[test]
    fn settle_returns_the_remainder_and_records_the_sale() {
        let mut book = OrderBook::new();
        let (a, _ra) = lot(10, dec!(2.00));
        book.push(a);
        let _ = book.take_report();

        let reservation = book.reserve(KEY_APPLE, 4, dec!(100)).unwrap();
        let proposed: Vec<_> = reservation.proposed_units().iter().map(|u| u.id).collect();
        let settlement = book.settle(reservation);

        assert_eq!(settlement.quantity, 4);
        assert_eq!(settlement.total, dec!(8.00));
        assert_eq!(
            settlement.sold.iter().map(|u| u.id).collect::<Vec<_>>(),
            proposed
        );
        let remaining = book.lots(KEY_APPLE);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.first().unwrap().unit_count(), 6);

        let report = book.take_report();
        assert_eq!(report.sold, 4);
        assert_eq!(report.received, 0);
        assert_eq!(report.total_cash_flow, dec!(8.00));
        assert_eq!(report.average_price, dec!(2.00));
        assert_eq!(report.stock, 6);

        let again = book.take_report();
        assert_eq!(again.sold, 0);
        assert_eq!(again.average_price, Decimal::ZERO);
        assert_eq!(again.stock, 6);
    }

    #[test]
    fn settling_a_whole_lot_removes_it() {
        let mut book = OrderBook::new();
        let (a, _ra) = lot(3, dec!(2.00));
        book.push(a);
        let reservation = book.reserve(KEY_APPLE, 10, dec!(100)).unwrap();
        let settlement = book.settle(reservation);
        assert_eq!(settlement.quantity, 3);
        assert!(book.lowest(KEY_APPLE).is_none());
        assert_eq!(book.stock(), 0);
    }
}
