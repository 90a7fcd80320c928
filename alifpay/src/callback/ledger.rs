//! Idempotent application of verified callbacks to order state.
//!
//! The gateway may deliver the same callback several times. The ledger makes
//! delivery idempotent: the first terminal status recorded for a
//! `(order_id, transaction_id)` pair wins, repeats of it are no-ops, and a
//! different terminal status is refused as a conflict.

use std::{
    fmt,
    num::NonZeroUsize,
    sync::{Arc, Mutex},
};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    audit,
    callback::{
        action::{CallbackAction, Outcome},
        models::CallbackEnvelope,
    },
    error::{GatewayError, Result},
    security::audit::AuditEventType,
    signing::VerifiedCallback,
};

/// Default number of orders kept by [`MemoryStore`].
pub const DEFAULT_STORE_CAPACITY: usize = 10_000;

/// Lifecycle state of an order as seen through callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Payment or tokenization in flight.
    Pending,
    /// Payment completed.
    Paid,
    /// Tokenization completed.
    Tokenized,
    /// Payment or tokenization failed.
    Failed,
}

impl OrderState {
    /// Returns `true` for states no callback may leave.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Tokenized => "tokenized",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&Outcome> for OrderState {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Paid => Self::Paid,
            Outcome::Tokenized => Self::Tokenized,
            Outcome::Failed { .. } => Self::Failed,
        }
    }
}

/// Result of applying a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The order moved to this terminal state.
    Applied(OrderState),
    /// The order was already in this terminal state. Nothing changed.
    AlreadyApplied(OrderState),
    /// The callback reported an in-flight status.
    Held,
    /// The callback status is unknown. Nothing changed.
    Ignored,
}

/// Identity of a callback delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackKey {
    /// Merchant order id.
    pub order_id: String,
    /// Gateway transaction id.
    pub transaction_id: String,
}

impl CallbackKey {
    /// Creates a key.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn new(order_id: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self { order_id: order_id.into(), transaction_id: transaction_id.into() }
    }
}

/// Persistence for order states.
///
/// Implementations must make [`compare_and_set`](Self::compare_and_set)
/// atomic: it is the only synchronization point between concurrent
/// deliveries of callbacks for the same key.
pub trait CallbackStore: Send + Sync {
    /// Returns the state recorded for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] if the backend fails.
    fn get(&self, key: &CallbackKey) -> Result<Option<OrderState>>;

    /// Stores `new` only if the current state equals `expected`.
    ///
    /// `expected = None` means "no state recorded yet". Returns whether the
    /// write happened.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] if the backend fails.
    fn compare_and_set(
        &self,
        key: &CallbackKey,
        expected: Option<OrderState>,
        new: OrderState,
    ) -> Result<bool>;
}

/// Bounded in-memory [`CallbackStore`].
///
/// Terminal states are never evicted. When the store is full, the least
/// recently used pending order makes room; if every entry is terminal, new
/// orders are refused with [`GatewayError::Store`] until settled orders are
/// dropped with [`remove`](Self::remove). Back the ledger with a durable store
/// when orders must outlive the process.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<LruCache<CallbackKey, OrderState>>>,
}

impl MemoryStore {
    /// Creates a store holding up to `capacity` orders.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { entries: Arc::new(Mutex::new(LruCache::new(capacity))) }
    }

    /// Drops the state of an order, returning what was recorded.
    ///
    /// Call this once an order can no longer receive callbacks.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] if the store lock is poisoned.
    pub fn remove(&self, key: &CallbackKey) -> Result<Option<OrderState>> {
        Ok(self.lock()?.pop(key))
    }

    /// Number of orders held.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] if the store lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Returns `true` if no order is held.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] if the store lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<CallbackKey, OrderState>>> {
        self.entries
            .lock()
            .map_err(|_| GatewayError::Store("failed to acquire callback store lock".to_owned()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_STORE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl CallbackStore for MemoryStore {
    fn get(&self, key: &CallbackKey) -> Result<Option<OrderState>> {
        Ok(self.lock()?.get(key).copied())
    }

    fn compare_and_set(
        &self,
        key: &CallbackKey,
        expected: Option<OrderState>,
        new: OrderState,
    ) -> Result<bool> {
        let mut entries = self.lock()?;
        if entries.get(key).copied() != expected {
            return Ok(false);
        }

        if expected.is_none() && entries.len() >= entries.cap().get() {
            let Some(pending) = entries
                .iter()
                .rev()
                .find(|(_, state)| !state.is_terminal())
                .map(|(key, _)| key.clone())
            else {
                warn!(capacity = entries.cap().get(), "callback store full of terminal orders");
                return Err(GatewayError::Store(format!(
                    "callback store full: {} terminal orders held",
                    entries.len()
                )));
            };
            entries.pop(&pending);
            debug!(order_id = %pending.order_id, "evicted pending order");
        }

        entries.put(key.clone(), new);
        Ok(true)
    }
}

/// Applies verified callbacks to a [`CallbackStore`].
///
/// # Examples
///
/// ```
/// use alifpay::callback::{MemoryStore, OrderLedger, OrderState, Transition};
///
/// let ledger = OrderLedger::new(MemoryStore::default());
/// # let _ = (ledger, OrderState::Paid, Transition::Held);
/// ```
#[derive(Debug, Clone)]
pub struct OrderLedger<S> {
    store: S,
}

impl<S: CallbackStore> OrderLedger<S> {
    /// Creates a ledger over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the state recorded for an order and transaction.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] if the store fails.
    pub fn state(&self, order_id: &str, transaction_id: &str) -> Result<Option<OrderState>> {
        self.store.get(&CallbackKey::new(order_id, transaction_id))
    }

    /// Applies a verified callback.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Conflict`] if the order already holds a different
    ///   terminal state
    /// - [`GatewayError::Store`] if the store fails
    #[instrument(
        skip_all,
        fields(
            flow = %callback.flow(),
            order_id = callback.order_id(),
            transaction_id = callback.transaction_id(),
            action = %callback.action()
        )
    )]
    pub fn apply<E: CallbackEnvelope>(&self, callback: &VerifiedCallback<E>) -> Result<Transition> {
        let key = CallbackKey::new(callback.order_id(), callback.transaction_id());

        match callback.action() {
            CallbackAction::Finalize(outcome) => {
                self.finalize(callback.terminal_id(), &key, outcome.into())
            }
            CallbackAction::Hold => {
                // Only a fresh order becomes pending. Anything recorded stays.
                if self.store.compare_and_set(&key, None, OrderState::Pending)? {
                    debug!("order recorded as pending");
                }
                Ok(Transition::Held)
            }
            CallbackAction::Investigate(raw) => {
                debug!(status = %raw, "unknown status left unapplied");
                Ok(Transition::Ignored)
            }
        }
    }

    fn finalize(
        &self,
        terminal_id: &str,
        key: &CallbackKey,
        target: OrderState,
    ) -> Result<Transition> {
        loop {
            let current = self.store.get(key)?;

            match current {
                Some(state) if state == target => {
                    debug!(%state, "callback already applied");
                    return Ok(Transition::AlreadyApplied(state));
                }
                Some(state) if state.is_terminal() => {
                    warn!(current = %state, attempted = %target, "conflicting terminal callback");
                    let err = GatewayError::Conflict {
                        order_id: key.order_id.clone(),
                        transaction_id: key.transaction_id.clone(),
                        current: state,
                        attempted: target,
                    };
                    audit!(
                        AuditEventType::TransitionConflict,
                        terminal_id,
                        with_order(key.order_id.as_str(), key.transaction_id.as_str()),
                        with_status(target.to_string()),
                        with_error(err.to_string())
                    );
                    return Err(err);
                }
                _ => {}
            }

            if self.store.compare_and_set(key, current, target)? {
                info!(to = %target, "order state updated");
                audit!(
                    AuditEventType::TransitionApplied,
                    terminal_id,
                    with_order(key.order_id.as_str(), key.transaction_id.as_str()),
                    with_status(target.to_string())
                );
                return Ok(Transition::Applied(target));
            }
            // Lost a race with a concurrent delivery, re-read.
        }
    }
}
