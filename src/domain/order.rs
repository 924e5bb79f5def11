use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub item_id: Uuid,
    pub quantity: u32,
    /// Unit price in the smallest currency unit.
    pub price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_id: u64,
    pub customer_id: Uuid,
    pub line_items: Vec<LineItem>,
    pub created_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Lifecycle milestone a caller may move an order to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Shipped,
    Completed,
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shipped" => Ok(OrderStatus::Shipped),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(DomainError::InvalidInput(format!(
                "unknown order status '{}'",
                other
            ))),
        }
    }
}

impl Order {
    pub fn new(order_id: u64, customer_id: Uuid, line_items: Vec<LineItem>) -> Self {
        Self {
            order_id,
            customer_id,
            line_items,
            created_at: None,
            shipped_at: None,
            completed_at: None,
        }
    }

    /// Records the milestone at `now`.
    ///
    /// An order ships once, and completes only after it has shipped.
    pub fn advance(&mut self, status: OrderStatus, now: DateTime<Utc>) -> Result<(), DomainError> {
        match status {
            OrderStatus::Shipped => {
                if self.shipped_at.is_some() {
                    return Err(DomainError::InvalidInput(format!(
                        "order {} has already shipped",
                        self.order_id
                    )));
                }
                self.shipped_at = Some(now);
            }
            OrderStatus::Completed => {
                if self.shipped_at.is_none() {
                    return Err(DomainError::InvalidInput(format!(
                        "order {} has not shipped yet",
                        self.order_id
                    )));
                }
                if self.completed_at.is_some() {
                    return Err(DomainError::InvalidInput(format!(
                        "order {} is already completed",
                        self.order_id
                    )));
                }
                self.completed_at = Some(now);
            }
        }
        Ok(())
    }

    pub fn total(&self) -> u64 {
        self.line_items
            .iter()
            .map(|l| l.price.saturating_mul(u64::from(l.quantity)))
            .fold(0, u64::saturating_add)
    }
}

/// Pagination request. An `offset` of 0 starts a new enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindAllPage {
    pub size: u64,
    pub offset: u64,
}

/// A page of orders. A `cursor` of 0 means there is nothing left to read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindAllResult {
    pub orders: Vec<Order>,
    pub cursor: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::new(
            7,
            Uuid::new_v4(),
            vec![
                LineItem {
                    item_id: Uuid::new_v4(),
                    quantity: 3,
                    price: 250,
                },
                LineItem {
                    item_id: Uuid::new_v4(),
                    quantity: 1,
                    price: 99,
                },
            ],
        )
    }

    #[test]
    fn parses_known_statuses() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert_eq!(
            "completed".parse::<OrderStatus>().unwrap(),
            OrderStatus::Completed
        );
        assert!(matches!(
            "lost".parse::<OrderStatus>(),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn ship_then_complete() {
        let mut o = order();
        let now = Utc::now();
        o.advance(OrderStatus::Shipped, now).unwrap();
        o.advance(OrderStatus::Completed, now).unwrap();
        assert_eq!(o.shipped_at, Some(now));
        assert_eq!(o.completed_at, Some(now));
    }

    #[test]
    fn cannot_complete_before_shipping() {
        let mut o = order();
        let err = o.advance(OrderStatus::Completed, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert!(o.completed_at.is_none());
    }

    #[test]
    fn cannot_ship_twice() {
        let mut o = order();
        o.advance(OrderStatus::Shipped, Utc::now()).unwrap();
        assert!(o.advance(OrderStatus::Shipped, Utc::now()).is_err());
    }

    #[test]
    fn total_sums_line_items() {
        assert_eq!(order().total(), 849);
    }
}
