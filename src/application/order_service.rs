use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{FindAllPage, FindAllResult, LineItem, Order, OrderStatus};
use crate::domain::ports::OrderRepository;

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Stores a new order under a freshly generated id, stamped with the
    /// current time as its creation milestone.
    pub fn create_order(
        &self,
        customer_id: Uuid,
        line_items: Vec<LineItem>,
    ) -> Result<Order, DomainError> {
        let mut order = Order::new(random_order_id(), customer_id, line_items);
        order.created_at = Some(Utc::now());

        self.repo.insert(&order)?;
        log::info!("created order {}", order.order_id);
        Ok(order)
    }

    pub fn get_order(&self, id: u64) -> Result<Order, DomainError> {
        self.repo.find_by_id(id)
    }

    pub fn list_orders(&self, cursor: u64, size: u64) -> Result<FindAllResult, DomainError> {
        self.repo.find_all(FindAllPage {
            size,
            offset: cursor,
        })
    }

    /// Moves the order to `status`. The read and the write are separate store
    /// calls; a concurrent delete in between surfaces as `NotFound`.
    pub fn update_status(&self, id: u64, status: OrderStatus) -> Result<Order, DomainError> {
        let mut order = self.repo.find_by_id(id)?;
        order.advance(status, Utc::now())?;
        self.repo.update_by_id(&order)?;
        Ok(order)
    }

    pub fn delete_order(&self, id: u64) -> Result<(), DomainError> {
        self.repo.delete_by_id(id)?;
        log::info!("deleted order {}", id);
        Ok(())
    }
}

fn random_order_id() -> u64 {
    Uuid::new_v4().as_u64_pair().0
}
