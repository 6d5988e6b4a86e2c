//! Turning form input into webhook bodies.
//!
//! `TickerDirectory` holds what the form needs to know about the selectable
//! tickers (hedge ratio and whether trading is switched on). `WebhookForm`
//! collects raw `key=value` input and builds the `WebhookSignal` that is sent
//! to the service.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{Pair, Stock, WebhookSignal};
use crate::utils::cmp_ignore_case;

#[derive(Error, Debug, PartialEq)]
pub enum WebhookError {
    #[error("Please select a ticker to create the webhook")]
    NoTicker,

    #[error("Required field missing: {0}")]
    MissingRequired(&'static str),

    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    #[error("Pair name must look like LEG1-LEG2: {0}")]
    InvalidPairName(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeType {
    Pair,
    Stock,
}

#[derive(Debug, Clone, PartialEq)]
struct TickerInfo {
    hedge: Option<f64>,
    active: bool,
}

/// Selectable tickers for one trade type.
#[derive(Debug, Clone)]
pub struct TickerDirectory {
    trade_type: TradeType,
    entries: BTreeMap<String, TickerInfo>,
}

impl TickerDirectory {
    pub fn from_pairs(pairs: &[Pair]) -> Self {
        let entries = pairs
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    TickerInfo {
                        hedge: Some(p.hedge),
                        active: p.is_active(),
                    },
                )
            })
            .collect();
        Self {
            trade_type: TradeType::Pair,
            entries,
        }
    }

    pub fn from_stocks(stocks: &[Stock]) -> Self {
        let entries = stocks
            .iter()
            .map(|s| {
                (
                    s.symbol.clone(),
                    TickerInfo {
                        hedge: None,
                        active: s.is_active(),
                    },
                )
            })
            .collect();
        Self {
            trade_type: TradeType::Stock,
            entries,
        }
    }

    pub fn trade_type(&self) -> TradeType {
        self.trade_type
    }

    /// Names in case-insensitive alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_by(|a, b| cmp_ignore_case(a, b));
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Unknown tickers count as inactive.
    pub fn is_active(&self, name: &str) -> bool {
        self.entries.get(name).map(|t| t.active).unwrap_or(false)
    }

    pub fn hedge(&self, name: &str) -> Option<f64> {
        self.entries.get(name).and_then(|t| t.hedge)
    }

    /// The ticker string the webhook expects for a selected name:
    /// `LEG1-<hedge>*LEG2` for pairs, the first `-` segment for stocks.
    pub fn webhook_ticker(&self, name: &str) -> Result<String, WebhookError> {
        match self.trade_type {
            TradeType::Stock => Ok(name.split('-').next().unwrap_or(name).to_string()),
            TradeType::Pair => {
                let hedge = self
                    .hedge(name)
                    .ok_or_else(|| WebhookError::UnknownTicker(name.to_string()))?;
                let (first, second) = name
                    .split_once('-')
                    .filter(|(_, second)| !second.contains('-'))
                    .ok_or_else(|| WebhookError::InvalidPairName(name.to_string()))?;
                Ok(format!("{}-{}*{}", first, hedge, second))
            }
        }
    }
}

/// Raw webhook form input. Empty values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookForm {
    pub passphrase: String,
    pub ticker: String,
    pub order_action: String,
    pub order_contracts: Option<i64>,
    pub order_price: Option<f64>,
    pub mar_pos: Option<String>,
    pub mar_pos_size: Option<i64>,
    pub pre_mar_pos: Option<String>,
    pub pre_mar_pos_size: Option<i64>,
    pub order_status: Option<String>,
    pub order_comment: Option<String>,
    pub rowid: Option<i64>,
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, WebhookError> {
    value.trim().parse().map_err(|_| WebhookError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

impl WebhookForm {
    /// Build a form from `key=value` pairs.
    pub fn parse_fields<I, S>(fields: I) -> Result<Self, WebhookError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut form = Self::default();
        for field in fields {
            let field = field.as_ref();
            let (key, value) = field.split_once('=').ok_or_else(|| WebhookError::InvalidValue {
                field: field.to_string(),
                value: String::new(),
            })?;
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "passphrase" => form.passphrase = value.to_string(),
                "ticker" => form.ticker = value.to_string(),
                "order_action" => form.order_action = value.to_string(),
                "order_contracts" => form.order_contracts = Some(parse_number(key, value)?),
                "order_price" => form.order_price = Some(parse_number(key, value)?),
                "mar_pos" => form.mar_pos = Some(value.to_string()),
                "mar_pos_size" => form.mar_pos_size = Some(parse_number(key, value)?),
                "pre_mar_pos" => form.pre_mar_pos = Some(value.to_string()),
                "pre_mar_pos_size" => form.pre_mar_pos_size = Some(parse_number(key, value)?),
                "order_status" => form.order_status = Some(value.to_string()),
                "order_comment" => form.order_comment = Some(value.to_string()),
                "rowid" => form.rowid = Some(parse_number(key, value)?),
                other => return Err(WebhookError::UnknownField(other.to_string())),
            }
        }
        Ok(form)
    }

    fn check_required(&self) -> Result<i64, WebhookError> {
        if self.ticker.is_empty() {
            return Err(WebhookError::NoTicker);
        }
        if self.order_action.is_empty() {
            return Err(WebhookError::MissingRequired("order_action"));
        }
        match self.order_contracts {
            Some(n) if n != 0 => Ok(n),
            _ => Err(WebhookError::MissingRequired("order_contracts")),
        }
    }

    fn base_signal(&self, ticker: String, contracts: i64) -> WebhookSignal {
        WebhookSignal {
            passphrase: self.passphrase.clone(),
            ticker,
            order_action: self.order_action.clone(),
            order_contracts: contracts,
            order_price: self.order_price,
            mar_pos: self.mar_pos.clone(),
            mar_pos_size: self.mar_pos_size,
            pre_mar_pos: self.pre_mar_pos.clone(),
            pre_mar_pos_size: self.pre_mar_pos_size,
            order_comment: self.order_comment.clone(),
            order_status: self.order_status.clone(),
            rowid: None,
        }
    }

    /// Body for a new signal. The ticker is the selected directory name and
    /// is rewritten into webhook form; status and comment are derived.
    pub fn build(&self, directory: &TickerDirectory) -> Result<WebhookSignal, WebhookError> {
        let contracts = self.check_required()?;
        if !directory.contains(&self.ticker) {
            return Err(WebhookError::UnknownTicker(self.ticker.clone()));
        }

        let mut signal = self.base_signal(directory.webhook_ticker(&self.ticker)?, contracts);

        if !directory.is_active(&self.ticker) {
            signal.order_status = Some("canceled".to_string());
            signal.order_comment = Some("ticker is not active".to_string());
        } else {
            let comment = if self.mar_pos.as_deref() == Some("flat") {
                "Pos. Closed"
            } else if self.order_action == "buy" {
                "Enter Long"
            } else {
                "Enter Short"
            };
            signal.order_comment = Some(comment.to_string());
        }

        Ok(signal)
    }

    /// Body for updating an existing signal. Fields go out as entered.
    pub fn build_update(&self) -> Result<WebhookSignal, WebhookError> {
        let rowid = self.rowid.ok_or(WebhookError::MissingRequired("rowid"))?;
        let contracts = self.check_required()?;
        let mut signal = self.base_signal(self.ticker.clone(), contracts);
        signal.rowid = Some(rowid);
        Ok(signal)
    }
}
