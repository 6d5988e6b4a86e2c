//! Command-line parsing.
//!
//! Deliberately small: one command word followed by positional arguments,
//! a handful of `--flag value` options and `key=value` form fields.

use anyhow::{anyhow, bail, Context, Result};
use signaldesk_core::models::{Pair, Stock};

/// Token lifetime requested at login when `--expire` is not given
pub const DEFAULT_EXPIRE_MINUTES: i64 = 10;

pub const USAGE: &str = "\
Usage: signaldesk <command> [args]

Session:
  login [USERNAME] [--expire MINUTES]   get an access token
  logout                                revoke and forget the access token
  status                                show the token countdown once
  countdown                             live token countdown (Ctrl-C to stop)

Signals:
  signals [LIMIT] [--ticker T | --status S] [--page N]
  signal ROWID
  webhook [tradetype=pair|stock] key=value...
  update-signal rowid=N key=value...
  delete-signal ROWID

Stocks:
  stocks [--page N]
  stock SYMBOL
  add-stock symbol=S [prixch=X] [secxch=Y] [active=0|1]
  update-stock symbol=S [prixch=X] [secxch=Y] [active=0|1]
  delete-stock SYMBOL

Pairs:
  pairs [--page N]
  pair NAME
  add-pair name=A-B hedge=H [status=0|1]
  update-pair name=A-B hedge=H [status=0|1]
  delete-pair NAME

Environment: SIGNALDESK_SERVER_URL, SIGNALDESK_API_VERSION,
SIGNALDESK_USERNAME, SIGNALDESK_PASSWORD, RUST_LOG";

#[derive(Debug, Clone, PartialEq)]
pub enum SignalFilter {
    All,
    Ticker(String),
    Status(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    Pair,
    Stock,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Login { username: Option<String>, expire_minutes: i64 },
    Logout,
    Status,
    Countdown,
    Signals { filter: SignalFilter, limit: Option<u32>, page: usize },
    Signal { rowid: i64 },
    Webhook { kind: TradeKind, fields: Vec<String> },
    UpdateSignal { fields: Vec<String> },
    DeleteSignal { rowid: i64 },
    Stocks { page: usize },
    Stock { symbol: String },
    AddStock(Stock),
    UpdateStock(Stock),
    DeleteStock { symbol: String },
    Pairs { page: usize },
    Pair { name: String },
    AddPair(Pair),
    UpdatePair(Pair),
    DeletePair { name: String },
}

/// Positional arguments and `--flag value` options, in order.
#[derive(Debug, Default)]
struct Args {
    positional: Vec<String>,
    flags: Vec<(String, String)>,
}

impl Args {
    fn split(args: &[String]) -> Result<Self> {
        let mut out = Args::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if let Some(flag) = arg.strip_prefix("--") {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--{} needs a value", flag))?;
                out.flags.push((flag.to_string(), value.clone()));
            } else {
                out.positional.push(arg.clone());
            }
        }
        Ok(out)
    }

    fn flag(&self, name: &str) -> Option<&str> {
        self.flags
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn reject_flags(&self, allowed: &[&str]) -> Result<()> {
        match self.flags.iter().find(|(k, _)| !allowed.contains(&k.as_str())) {
            Some((k, _)) => bail!("Unknown option --{}", k),
            None => Ok(()),
        }
    }

    fn page(&self) -> Result<usize> {
        match self.flag("page") {
            Some(v) => {
                let page: usize = v.parse().with_context(|| format!("Invalid page '{}'", v))?;
                Ok(page.max(1))
            }
            None => Ok(1),
        }
    }

    fn one(&self, what: &str) -> Result<&str> {
        match self.positional.as_slice() {
            [value] => Ok(value.as_str()),
            [] => bail!("Missing {}", what),
            _ => bail!("Expected a single {}", what),
        }
    }

    fn none(&self) -> Result<()> {
        if let Some(extra) = self.positional.first() {
            bail!("Unexpected argument '{}'", extra);
        }
        Ok(())
    }
}

fn parse_rowid(value: &str) -> Result<i64> {
    value
        .parse()
        .with_context(|| format!("Invalid signal id '{}'", value))
}

/// Parse the arguments after the program name.
pub fn parse(args: &[String]) -> Result<Command> {
    let Some((name, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };
    let args = Args::split(rest)?;

    let command = match name.as_str() {
        "help" | "-h" | "--help" => Command::Help,
        "login" => {
            args.reject_flags(&["expire"])?;
            let expire_minutes = match args.flag("expire") {
                Some(v) => v
                    .parse()
                    .ok()
                    .filter(|m: &i64| *m > 0)
                    .ok_or_else(|| anyhow!("Invalid expire minutes '{}'", v))?,
                None => DEFAULT_EXPIRE_MINUTES,
            };
            let username = match args.positional.as_slice() {
                [] => None,
                [user] => Some(user.clone()),
                _ => bail!("Expected at most one username"),
            };
            Command::Login { username, expire_minutes }
        }
        "logout" => {
            args.none()?;
            Command::Logout
        }
        "status" => {
            args.none()?;
            Command::Status
        }
        "countdown" => {
            args.none()?;
            Command::Countdown
        }
        "signals" => {
            args.reject_flags(&["ticker", "status", "page"])?;
            let filter = match (args.flag("ticker"), args.flag("status")) {
                (Some(_), Some(_)) => bail!("Use either --ticker or --status, not both"),
                (Some(t), None) => SignalFilter::Ticker(t.to_string()),
                (None, Some(s)) => SignalFilter::Status(s.to_lowercase()),
                (None, None) => SignalFilter::All,
            };
            let limit = match args.positional.as_slice() {
                [] => None,
                [n] => Some(n.parse().with_context(|| format!("Invalid limit '{}'", n))?),
                _ => bail!("Expected at most one limit"),
            };
            Command::Signals { filter, limit, page: args.page()? }
        }
        "signal" => {
            args.reject_flags(&[])?;
            Command::Signal { rowid: parse_rowid(args.one("signal id")?)? }
        }
        "webhook" => {
            args.reject_flags(&[])?;
            let mut kind = TradeKind::Pair;
            let mut fields = Vec::new();
            for field in args.positional {
                match field.strip_prefix("tradetype=") {
                    Some("pair") => kind = TradeKind::Pair,
                    Some("stock") => kind = TradeKind::Stock,
                    Some(other) => bail!("Unknown trade type '{}'", other),
                    None => fields.push(field),
                }
            }
            Command::Webhook { kind, fields }
        }
        "update-signal" => {
            args.reject_flags(&[])?;
            Command::UpdateSignal { fields: args.positional }
        }
        "delete-signal" => {
            args.reject_flags(&[])?;
            Command::DeleteSignal { rowid: parse_rowid(args.one("signal id")?)? }
        }
        "stocks" => {
            args.reject_flags(&["page"])?;
            args.none()?;
            Command::Stocks { page: args.page()? }
        }
        "stock" | "add-stock" | "update-stock" | "delete-stock" => {
            args.reject_flags(&[])?;
            match name.as_str() {
                "stock" => Command::Stock { symbol: args.one("symbol")?.to_string() },
                "add-stock" => Command::AddStock(parse_stock(&args.positional)?),
                "update-stock" => Command::UpdateStock(parse_stock(&args.positional)?),
                _ => Command::DeleteStock { symbol: args.one("symbol")?.to_string() },
            }
        }
        "pairs" => {
            args.reject_flags(&["page"])?;
            args.none()?;
            Command::Pairs { page: args.page()? }
        }
        "pair" | "add-pair" | "update-pair" | "delete-pair" => {
            args.reject_flags(&[])?;
            match name.as_str() {
                "pair" => Command::Pair { name: args.one("pair name")?.to_string() },
                "add-pair" => Command::AddPair(parse_pair(&args.positional)?),
                "update-pair" => Command::UpdatePair(parse_pair(&args.positional)?),
                _ => Command::DeletePair { name: args.one("pair name")?.to_string() },
            }
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    };
    Ok(command)
}

fn key_values(fields: &[String]) -> Result<Vec<(&str, &str)>> {
    fields
        .iter()
        .map(|f| {
            f.split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| anyhow!("Expected key=value, got '{}'", f))
        })
        .collect()
}

fn parse_flag_value(field: &str, value: &str) -> Result<i64> {
    match value {
        "0" | "false" | "no" => Ok(0),
        "1" | "true" | "yes" => Ok(1),
        _ => bail!("Invalid {} '{}'", field, value),
    }
}

pub fn parse_stock(fields: &[String]) -> Result<Stock> {
    let mut stock = Stock::new("");
    for (key, value) in key_values(fields)? {
        match key {
            "symbol" => stock.symbol = value.to_string(),
            "prixch" if !value.is_empty() => stock.prixch = value.to_string(),
            "secxch" if !value.is_empty() => stock.secxch = value.to_string(),
            "prixch" | "secxch" => {}
            "active" => stock.active = parse_flag_value(key, value)?,
            other => bail!("Unknown stock field '{}'", other),
        }
    }
    if stock.symbol.is_empty() {
        bail!("symbol is required");
    }
    Ok(stock)
}

pub fn parse_pair(fields: &[String]) -> Result<Pair> {
    let mut name = None;
    let mut hedge = None;
    let mut status = 0;
    for (key, value) in key_values(fields)? {
        match key {
            "name" => name = Some(value.to_string()),
            "hedge" => {
                hedge = Some(
                    value
                        .parse::<f64>()
                        .with_context(|| format!("Invalid hedge '{}'", value))?,
                )
            }
            "status" => status = parse_flag_value(key, value)?,
            other => bail!("Unknown pair field '{}'", other),
        }
    }
    let pair = Pair {
        name: name.filter(|n| !n.is_empty()).ok_or_else(|| anyhow!("name is required"))?,
        hedge: hedge.ok_or_else(|| anyhow!("hedge is required"))?,
        status,
    };
    if pair.legs().is_none() {
        bail!("Pair name must look like LEG1-LEG2, got '{}'", pair.name);
    }
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_no_arguments_is_help() {
        assert_eq!(parse(&[]).unwrap(), Command::Help);
        assert_eq!(parse(&args("--help")).unwrap(), Command::Help);
    }

    #[test]
    fn test_login() {
        assert_eq!(
            parse(&args("login")).unwrap(),
            Command::Login { username: None, expire_minutes: DEFAULT_EXPIRE_MINUTES }
        );
        assert_eq!(
            parse(&args("login alice --expire 30")).unwrap(),
            Command::Login { username: Some("alice".into()), expire_minutes: 30 }
        );
        assert!(parse(&args("login --expire 0")).is_err());
        assert!(parse(&args("login --expire")).is_err());
        assert!(parse(&args("login a b")).is_err());
    }

    #[test]
    fn test_signals_filters() {
        assert_eq!(
            parse(&args("signals")).unwrap(),
            Command::Signals { filter: SignalFilter::All, limit: None, page: 1 }
        );
        assert_eq!(
            parse(&args("signals 20 --ticker AAPL-MSFT --page 2")).unwrap(),
            Command::Signals {
                filter: SignalFilter::Ticker("AAPL-MSFT".into()),
                limit: Some(20),
                page: 2,
            }
        );
        assert_eq!(
            parse(&args("signals --status Waiting")).unwrap(),
            Command::Signals { filter: SignalFilter::Status("waiting".into()), limit: None, page: 1 }
        );
        assert!(parse(&args("signals --ticker A --status waiting")).is_err());
        assert!(parse(&args("signals --sort asc")).is_err());
        assert!(parse(&args("signals ten")).is_err());
    }

    #[test]
    fn test_page_zero_is_first_page() {
        assert_eq!(parse(&args("stocks --page 0")).unwrap(), Command::Stocks { page: 1 });
    }

    #[test]
    fn test_webhook_trade_type_is_split_off() {
        let cmd = parse(&args("webhook tradetype=stock ticker=MSFT order_action=buy")).unwrap();
        assert_eq!(
            cmd,
            Command::Webhook {
                kind: TradeKind::Stock,
                fields: vec!["ticker=MSFT".into(), "order_action=buy".into()],
            }
        );
        assert!(matches!(
            parse(&args("webhook ticker=AAPL-MSFT")).unwrap(),
            Command::Webhook { kind: TradeKind::Pair, .. }
        ));
        assert!(parse(&args("webhook tradetype=option")).is_err());
    }

    #[test]
    fn test_signal_ids() {
        assert_eq!(parse(&args("signal 42")).unwrap(), Command::Signal { rowid: 42 });
        assert_eq!(parse(&args("delete-signal 7")).unwrap(), Command::DeleteSignal { rowid: 7 });
        assert!(parse(&args("signal")).is_err());
        assert!(parse(&args("signal abc")).is_err());
    }

    #[test]
    fn test_parse_stock() {
        let stock = parse_stock(&args("symbol=msft active=1")).unwrap();
        assert_eq!(stock.symbol, "msft");
        assert_eq!(stock.prixch, "SMART");
        assert_eq!(stock.secxch, "ISLAND");
        assert!(stock.is_active());

        let stock = parse_stock(&args("symbol=ko prixch=NYSE secxch= active=no")).unwrap();
        assert_eq!(stock.prixch, "NYSE");
        assert_eq!(stock.secxch, "ISLAND");
        assert!(!stock.is_active());

        assert!(parse_stock(&args("prixch=NYSE")).is_err());
        assert!(parse_stock(&args("symbol=A active=maybe")).is_err());
        assert!(parse_stock(&args("symbol=A color=red")).is_err());
    }

    #[test]
    fn test_parse_pair() {
        let pair = parse_pair(&args("name=aapl-msft hedge=1.5 status=1")).unwrap();
        assert_eq!(pair.name, "aapl-msft");
        assert_eq!(pair.hedge, 1.5);
        assert!(pair.is_active());

        assert!(parse_pair(&args("name=AAPL hedge=1")).is_err());
        assert!(parse_pair(&args("name=A-B-C hedge=1")).is_err());
        assert!(parse_pair(&args("name=A-B")).is_err());
        assert!(parse_pair(&args("name=A-B hedge=x")).is_err());
    }

    #[test]
    fn test_commands_without_options_reject_flags() {
        for line in [
            "signal 7 --force yes",
            "delete-signal 7 --force yes",
            "webhook ticker=AAPL-MSFT --dry-run yes",
            "update-signal rowid=7 --force yes",
            "stock MSFT --page 2",
            "add-stock symbol=MSFT --force yes",
            "update-stock symbol=MSFT --force yes",
            "delete-stock MSFT --force yes",
            "pair AAPL-MSFT --page 2",
            "add-pair name=A-B hedge=1 --force yes",
            "update-pair name=A-B hedge=1 --force yes",
            "delete-pair A-B --force yes",
        ] {
            let err = parse(&args(line)).unwrap_err();
            assert!(err.to_string().starts_with("Unknown option --"), "{line}: {err}");
        }
    }

    #[test]
    fn test_unknown_command() {
        let err = parse(&args("dance")).unwrap_err();
        assert!(err.to_string().contains("Unknown command 'dance'"));
    }
}
