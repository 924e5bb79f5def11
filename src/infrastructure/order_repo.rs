use std::time::Duration;

use crate::domain::errors::DomainError;
use crate::domain::order::{FindAllPage, FindAllResult, Order};
use crate::domain::ports::OrderRepository;

use super::kv::{Batch, BatchOutcome, KeyValueStore, StoreError};
use super::models::{decode_order, encode_order};

/// Name of the set holding every order key.
pub const ORDER_INDEX: &str = "orders";

/// How long an order value lives after its last write.
pub const ORDER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const SCAN_PATTERN: &str = "*";

/// COUNT hint used when a page does not ask for a size.
const DEFAULT_SCAN_COUNT: u64 = 10;

pub fn order_key(id: u64) -> String {
    format!("order:{}", id)
}

fn store_error(op: &str, key: &str, e: StoreError) -> DomainError {
    match e {
        StoreError::Unavailable(msg) => {
            DomainError::Unavailable(format!("{} {}: {}", op, key, msg))
        }
        StoreError::Internal(msg) => DomainError::Internal(format!("{} {}: {}", op, key, msg)),
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct KvOrderRepository<S> {
    store: S,
    ttl: Duration,
}

impl<S: KeyValueStore> KvOrderRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_ttl(store, ORDER_TTL)
    }

    pub fn with_ttl(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn queue_insert(&self, txn: &mut Batch, key: &str, order: &Order) -> Result<(), DomainError> {
        let data = encode_order(order)
            .map_err(|e| DomainError::Internal(format!("encode {}: {}", key, e)))?;

        txn.set_if_absent(key, data, self.ttl)
            .set_add(ORDER_INDEX, key);
        Ok(())
    }
}

impl<S: KeyValueStore> OrderRepository for KvOrderRepository<S> {
    fn insert(&self, order: &Order) -> Result<(), DomainError> {
        let key = order_key(order.order_id);

        let mut txn = Batch::new();
        if let Err(e) = self.queue_insert(&mut txn, &key, order) {
            txn.discard();
            return Err(e);
        }

        match self.store.exec(txn).map_err(|e| store_error("insert", &key, e))? {
            BatchOutcome::Committed => Ok(()),
            BatchOutcome::Aborted { index: 0 } => {
                log::debug!("insert {}: key already exists", key);
                Err(DomainError::Conflict(format!("insert {}", key)))
            }
            BatchOutcome::Aborted { index } => Err(DomainError::Internal(format!(
                "insert {}: transaction aborted at command {}",
                key, index
            ))),
        }
    }

    fn find_by_id(&self, id: u64) -> Result<Order, DomainError> {
        let key = order_key(id);

        let Some(raw) = self
            .store
            .get(&key)
            .map_err(|e| store_error("get", &key, e))?
        else {
            return Err(DomainError::NotFound(format!("get {}", key)));
        };

        decode_order(&raw).map_err(|e| DomainError::Corrupt(format!("get {}: {}", key, e)))
    }

    fn delete_by_id(&self, id: u64) -> Result<(), DomainError> {
        let key = order_key(id);

        let mut txn = Batch::new();
        txn.delete(&key).set_remove(ORDER_INDEX, &key);

        match self.store.exec(txn).map_err(|e| store_error("delete", &key, e))? {
            BatchOutcome::Committed => Ok(()),
            BatchOutcome::Aborted { index: 0 } => {
                Err(DomainError::NotFound(format!("delete {}", key)))
            }
            BatchOutcome::Aborted { index } => Err(DomainError::Internal(format!(
                "delete {}: transaction aborted at command {}",
                key, index
            ))),
        }
    }

    fn update_by_id(&self, order: &Order) -> Result<(), DomainError> {
        let key = order_key(order.order_id);
        let data = encode_order(order)
            .map_err(|e| DomainError::Internal(format!("encode {}: {}", key, e)))?;

        let written = self
            .store
            .set_if_present(&key, &data, self.ttl)
            .map_err(|e| store_error("update", &key, e))?;

        if written {
            Ok(())
        } else {
            Err(DomainError::NotFound(format!("update {}", key)))
        }
    }

    fn find_all(&self, page: FindAllPage) -> Result<FindAllResult, DomainError> {
        let count = if page.size == 0 {
            DEFAULT_SCAN_COUNT
        } else {
            page.size
        };

        let scan = self
            .store
            .set_scan(ORDER_INDEX, page.offset, SCAN_PATTERN, count)
            .map_err(|e| store_error("scan", ORDER_INDEX, e))?;

        // An empty batch ends the enumeration even when the store handed back
        // a nonzero cursor.
        if scan.members.is_empty() {
            return Ok(FindAllResult {
                orders: vec![],
                cursor: 0,
            });
        }

        let values = self
            .store
            .multi_get(&scan.members)
            .map_err(|e| store_error("mget", ORDER_INDEX, e))?;

        let orders = scan
            .members
            .iter()
            .zip(values)
            .map(|(key, value)| {
                let Some(raw) = value else {
                    log::warn!("{} is indexed but has no stored value", key);
                    return Err(DomainError::Corrupt(format!(
                        "mget {}: indexed but missing from the store",
                        key
                    )));
                };
                decode_order(&raw)
                    .map_err(|e| DomainError::Corrupt(format!("mget {}: {}", key, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FindAllResult {
            orders,
            cursor: scan.cursor,
        })
    }
}
