use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{LineItem, Order};

/// Stored shape of an order value. Unknown fields are ignored when reading so
/// that records written by a newer build still decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(rename = "orderID")]
    pub order_id: u64,
    #[serde(rename = "customerID")]
    pub customer_id: Uuid,
    #[serde(default)]
    pub line_items: Vec<LineItemRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemRecord {
    #[serde(rename = "itemID")]
    pub item_id: Uuid,
    pub quantity: u32,
    pub price: u64,
}

impl From<&Order> for OrderRecord {
    fn from(o: &Order) -> Self {
        Self {
            order_id: o.order_id,
            customer_id: o.customer_id,
            line_items: o
                .line_items
                .iter()
                .map(|l| LineItemRecord {
                    item_id: l.item_id,
                    quantity: l.quantity,
                    price: l.price,
                })
                .collect(),
            created_at: o.created_at,
            shipped_at: o.shipped_at,
            completed_at: o.completed_at,
        }
    }
}

impl From<OrderRecord> for Order {
    fn from(r: OrderRecord) -> Self {
        Self {
            order_id: r.order_id,
            customer_id: r.customer_id,
            line_items: r
                .line_items
                .into_iter()
                .map(|l| LineItem {
                    item_id: l.item_id,
                    quantity: l.quantity,
                    price: l.price,
                })
                .collect(),
            created_at: r.created_at,
            shipped_at: r.shipped_at,
            completed_at: r.completed_at,
        }
    }
}

pub fn encode_order(order: &Order) -> Result<String, serde_json::Error> {
    serde_json::to_string(&OrderRecord::from(order))
}

pub fn decode_order(raw: &str) -> Result<Order, serde_json::Error> {
    serde_json::from_str::<OrderRecord>(raw).map(Order::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn absent_timestamps_are_omitted() {
        let order = Order::new(1, Uuid::nil(), vec![]);
        let raw = encode_order(&order).unwrap();

        assert!(!raw.contains("shippedAt"));
        assert!(!raw.contains("createdAt"));
        assert_eq!(decode_order(&raw).unwrap(), order);
    }

    #[test]
    fn present_timestamps_survive() {
        let mut order = Order::new(2, Uuid::new_v4(), vec![]);
        order.created_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        order.shipped_at = Some(Utc.with_ymd_and_hms(2024, 5, 2, 8, 30, 0).unwrap());

        let decoded = decode_order(&encode_order(&order).unwrap()).unwrap();
        assert_eq!(decoded.created_at, order.created_at);
        assert_eq!(decoded.shipped_at, order.shipped_at);
        assert_eq!(decoded.completed_at, None);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = r#"{
            "orderID": 9,
            "customerID": "00000000-0000-0000-0000-000000000000",
            "lineItems": [{"itemID": "00000000-0000-0000-0000-000000000001", "quantity": 2, "price": 150, "sku": "x"}],
            "giftWrap": true
        }"#;

        let order = decode_order(raw).unwrap();
        assert_eq!(order.order_id, 9);
        assert_eq!(order.line_items.len(), 1);
        assert_eq!(order.line_items[0].price, 150);
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(decode_order("not json").is_err());
        assert!(decode_order(r#"{"orderID": "nine"}"#).is_err());
    }
}
