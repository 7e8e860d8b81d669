//! Position tracking.
//!
//! A position is opened when a buy order is accepted and is keyed by that
//! buy order's id. The paired sell order id is attached at most once.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use time::OffsetDateTime;

use super::order::OrderStatus;

/// One bracket: an accepted buy order and, once placed, its sell order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Market the position was opened in.
    pub market_id: String,
    /// Token bought.
    pub token_id: String,
    /// Limit price of the buy leg.
    pub buy_price: Decimal,
    /// Shares.
    pub amount: Decimal,
    /// Buy order id.
    pub order_id: String,
    /// Shares the buy leg has matched so far.
    pub filled_size: Decimal,
    /// When the buy order was accepted.
    pub timestamp: OffsetDateTime,
    /// Sell order id, set once the sell leg is accepted.
    pub sell_order_id: Option<String>,
    /// Last polled status of the buy leg.
    pub buy_status: Option<OrderStatus>,
    /// Last polled status of the sell leg.
    pub sell_status: Option<OrderStatus>,
}

impl Position {
    /// Open a position for an accepted buy order.
    pub fn new(
        market_id: impl Into<String>,
        token_id: impl Into<String>,
        buy_price: Decimal,
        amount: Decimal,
        order_id: impl Into<String>,
    ) -> Self {
        Self {
            market_id: market_id.into(),
            token_id: token_id.into(),
            buy_price,
            amount,
            order_id: order_id.into(),
            filled_size: Decimal::ZERO,
            timestamp: OffsetDateTime::now_utc(),
            sell_order_id: None,
            buy_status: None,
            sell_status: None,
        }
    }

    /// Calculate the cost basis.
    pub fn cost_basis(&self) -> Decimal {
        self.amount * self.buy_price
    }

    /// Whether the buy leg holds shares that need selling.
    ///
    /// A buy that ended after matching part of its size counts as filled for
    /// the matched amount.
    pub fn buy_filled(&self) -> bool {
        match self.buy_status {
            Some(status) if status.is_filled() => true,
            Some(status) if status.is_terminal() => self.filled_size > Decimal::ZERO,
            _ => false,
        }
    }

    /// Shares the sell leg should offer.
    pub fn sell_size(&self) -> Decimal {
        let partial = self.buy_status.map(|s| s.is_terminal() && !s.is_filled()).unwrap_or(false);
        if partial && self.filled_size > Decimal::ZERO {
            self.filled_size.min(self.amount)
        } else {
            self.amount
        }
    }

    /// Whether no sell order has been accepted for this position yet.
    pub fn needs_sell(&self) -> bool {
        self.sell_order_id.is_none()
    }

    /// Whether nothing further can happen to this bracket.
    ///
    /// Either the buy ended without matching anything, or it holds shares and
    /// the sell leg reached a terminal state.
    pub fn is_closed(&self) -> bool {
        match self.buy_status {
            Some(status) if status.is_terminal() => {
                !self.buy_filled() || self.sell_status.map(|s| s.is_terminal()).unwrap_or(false)
            }
            _ => false,
        }
    }
}

/// In-memory position table keyed by buy order id.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: BTreeMap<String, Position>,
}

impl PositionBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a position. An id that is already present keeps its original record.
    ///
    /// Returns `true` when the position was newly inserted.
    pub fn open(&mut self, position: Position) -> bool {
        use std::collections::btree_map::Entry;

        match self.positions.entry(position.order_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(position);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Attach the sell order id to the position opened by `buy_order_id`.
    ///
    /// Returns `false` when the position is unknown or already has a sell order.
    pub fn attach_sell_order(&mut self, buy_order_id: &str, sell_order_id: impl Into<String>) -> bool {
        match self.positions.get_mut(buy_order_id) {
            Some(position) if position.sell_order_id.is_none() => {
                position.sell_order_id = Some(sell_order_id.into());
                true
            }
            _ => false,
        }
    }

    /// Get a position by buy order id.
    pub fn get(&self, buy_order_id: &str) -> Option<&Position> {
        self.positions.get(buy_order_id)
    }

    /// Get a mutable position by buy order id.
    pub fn get_mut(&mut self, buy_order_id: &str) -> Option<&mut Position> {
        self.positions.get_mut(buy_order_id)
    }

    /// Snapshot of all tracked buy order ids.
    pub fn order_ids(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    /// Iterate positions in order id order.
    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Number of tracked positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no positions are tracked.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Drop positions that can no longer change. Returns the removed records.
    pub fn prune_closed(&mut self) -> Vec<Position> {
        let closed: Vec<String> = self
            .positions
            .iter()
            .filter(|(_, p)| p.is_closed())
            .map(|(id, _)| id.clone())
            .collect();

        closed
            .into_iter()
            .filter_map(|id| self.positions.remove(&id))
            .collect()
    }

    /// Total cost basis of tracked positions.
    pub fn total_cost_basis(&self) -> Decimal {
        self.positions.values().map(Position::cost_basis).sum()
    }

    /// Number of positions still waiting for a sell order.
    pub fn awaiting_sell(&self) -> usize {
        self.positions.values().filter(|p| p.needs_sell()).count()
    }
}
