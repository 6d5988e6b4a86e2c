use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub symbol: String,
    #[serde(default = "default_prixch")]
    pub prixch: String,
    #[serde(default = "default_secxch")]
    pub secxch: String,
    #[serde(default)]
    pub active: i64,
}

fn default_prixch() -> String {
    "SMART".to_string()
}

fn default_secxch() -> String {
    "ISLAND".to_string()
}

impl Stock {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            prixch: default_prixch(),
            secxch: default_secxch(),
            active: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active != 0
    }

    /// The service stores exchange and symbol names upper-cased.
    pub fn normalized(&self) -> Self {
        Self {
            symbol: self.symbol.to_uppercase(),
            prixch: self.prixch.to_uppercase(),
            secxch: self.secxch.to_uppercase(),
            active: self.active,
        }
    }

    /// `SYMBOL-PRIXCH-SECXCH`
    pub fn label(&self) -> String {
        format!("{}-{}-{}", self.symbol, self.prixch, self.secxch).to_uppercase()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockList {
    #[serde(default)]
    pub stocks: Vec<Stock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_defaults_and_label() {
        let stock: Stock = serde_json::from_str(r#"{"symbol": "aapl"}"#).unwrap();
        assert_eq!(stock.prixch, "SMART");
        assert_eq!(stock.secxch, "ISLAND");
        assert!(!stock.is_active());
        assert_eq!(stock.label(), "AAPL-SMART-ISLAND");
        assert_eq!(stock.normalized().symbol, "AAPL");
    }
}
