use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub rowid: i64,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub ticker: String,
    pub order_action: String,
    #[serde(default)]
    pub order_contracts: i64,
    #[serde(default)]
    pub order_price: Option<f64>,
    #[serde(default)]
    pub mar_pos: Option<String>,
    #[serde(default)]
    pub mar_pos_size: Option<i64>,
    #[serde(default)]
    pub pre_mar_pos: Option<String>,
    #[serde(default)]
    pub pre_mar_pos_size: Option<i64>,
    #[serde(default)]
    pub order_comment: Option<String>,
    #[serde(default)]
    pub order_status: Option<String>,
    #[serde(default)]
    pub fill_price: Option<f64>,
    #[serde(default)]
    pub slip: Option<f64>,
}

impl Signal {
    pub fn status(&self) -> OrderStatus {
        OrderStatus::parse(self.order_status.as_deref())
    }
}

/// Response of the signal listing endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalList {
    #[serde(default)]
    pub signals: Vec<Signal>,
    /// Cap the server applies to anonymous callers
    #[serde(default)]
    pub notoken_limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Waiting,
    Canceled,
    Filled,
    Created,
    Other,
}

impl OrderStatus {
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|s| s.to_lowercase()).as_deref() {
            Some("waiting") => OrderStatus::Waiting,
            Some("canceled") => OrderStatus::Canceled,
            Some("filled") => OrderStatus::Filled,
            Some("created") => OrderStatus::Created,
            _ => OrderStatus::Other,
        }
    }

    /// One-character marker used in list views.
    pub fn marker(&self) -> char {
        match self {
            OrderStatus::Waiting => 'W',
            OrderStatus::Canceled => 'X',
            OrderStatus::Filled => 'F',
            OrderStatus::Created => 'C',
            OrderStatus::Other => ' ',
        }
    }
}

/// Body of `POST webhook` / `PUT webhook`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookSignal {
    pub passphrase: String,
    pub ticker: String,
    pub order_action: String,
    pub order_contracts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mar_pos: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mar_pos_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_mar_pos: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_mar_pos_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<String>,
    /// Set only when updating an existing signal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rowid: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signal_list_with_limit() {
        let json = r#"{"signals": [{"rowid": 7, "timestamp": "2026-03-01 12:00:00", "ticker": "AAPL-1.2*MSFT",
            "order_action": "buy", "order_contracts": 10, "order_price": null, "mar_pos": "long",
            "mar_pos_size": 10, "pre_mar_pos": "flat", "pre_mar_pos_size": 0,
            "order_comment": "Enter Long", "order_status": "filled"}], "notoken_limit": 3}"#;
        let list: SignalList = serde_json::from_str(json).unwrap();
        assert_eq!(list.notoken_limit, Some(3));
        assert_eq!(list.signals.len(), 1);
        assert_eq!(list.signals[0].status(), OrderStatus::Filled);
        assert_eq!(list.signals[0].order_price, None);
    }

    #[test]
    fn test_order_status_parse() {
        assert_eq!(OrderStatus::parse(Some("WAITING")), OrderStatus::Waiting);
        assert_eq!(OrderStatus::parse(Some("canceled")), OrderStatus::Canceled);
        assert_eq!(OrderStatus::parse(Some("rerouted")), OrderStatus::Other);
        assert_eq!(OrderStatus::parse(None), OrderStatus::Other);
    }

    #[test]
    fn test_webhook_omits_empty_fields() {
        let body = WebhookSignal {
            passphrase: "secret".into(),
            ticker: "AAPL".into(),
            order_action: "buy".into(),
            order_contracts: 5,
            ..Default::default()
        };
        let value = serde_json::to_value(&body).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert!(!obj.contains_key("rowid"));
        assert!(!obj.contains_key("order_price"));
    }
}
