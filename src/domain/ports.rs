use std::sync::Arc;

use super::errors::DomainError;
use super::order::{FindAllPage, FindAllResult, Order};

pub trait OrderRepository: Send + Sync + 'static {
    /// Fails with `Conflict` when an order with the same id is already stored.
    fn insert(&self, order: &Order) -> Result<(), DomainError>;
    fn find_by_id(&self, id: u64) -> Result<Order, DomainError>;
    fn delete_by_id(&self, id: u64) -> Result<(), DomainError>;
    /// Overwrites an existing order. Never creates one.
    fn update_by_id(&self, order: &Order) -> Result<(), DomainError>;
    fn find_all(&self, page: FindAllPage) -> Result<FindAllResult, DomainError>;
}

impl<R: OrderRepository + ?Sized> OrderRepository for Arc<R> {
    fn insert(&self, order: &Order) -> Result<(), DomainError> {
        (**self).insert(order)
    }

    fn find_by_id(&self, id: u64) -> Result<Order, DomainError> {
        (**self).find_by_id(id)
    }

    fn delete_by_id(&self, id: u64) -> Result<(), DomainError> {
        (**self).delete_by_id(id)
    }

    fn update_by_id(&self, order: &Order) -> Result<(), DomainError> {
        (**self).update_by_id(order)
    }

    fn find_all(&self, page: FindAllPage) -> Result<FindAllResult, DomainError> {
        (**self).find_all(page)
    }
}
