use std::cmp::Ordering;

use crate::models::{Pair, Signal, Stock};

/// Case-insensitive ordering used for every alphabetical list
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

pub fn sort_stocks(stocks: &mut [Stock]) {
    stocks.sort_by(|a, b| cmp_ignore_case(&a.symbol, &b.symbol));
}

pub fn sort_pairs(pairs: &mut [Pair]) {
    pairs.sort_by(|a, b| cmp_ignore_case(&a.name, &b.name));
}

/// `ACTION | CONTRACTS | TICKER`, upper-cased, as shown in the signal list
pub fn signal_line(signal: &Signal) -> String {
    format!(
        "{} | {} | {}",
        signal.order_action, signal.order_contracts, signal.ticker
    )
    .to_uppercase()
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_stocks_ignores_case() {
        let mut stocks = vec![Stock::new("msft"), Stock::new("AAPL"), Stock::new("amzn")];
        sort_stocks(&mut stocks);
        let symbols: Vec<&str> = stocks.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "amzn", "msft"]);
    }

    #[test]
    fn test_sort_pairs_ignores_case() {
        let mut pairs = vec![
            Pair { name: "ko-pep".into(), hedge: 1.0, status: 0 },
            Pair { name: "AAPL-MSFT".into(), hedge: 1.0, status: 1 },
        ];
        sort_pairs(&mut pairs);
        assert_eq!(pairs[0].name, "AAPL-MSFT");
    }

    #[test]
    fn test_signal_line() {
        let signal: Signal = serde_json::from_str(
            r#"{"rowid": 1, "ticker": "aapl-1.5*msft", "order_action": "buy", "order_contracts": 10}"#,
        )
        .unwrap();
        assert_eq!(signal_line(&signal), "BUY | 10 | AAPL-1.5*MSFT");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }
}
