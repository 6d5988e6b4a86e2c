//! Command handlers.
//!
//! `App` owns the configuration, the durable session and the API client and
//! turns each parsed command into calls against them, printing the results.

use std::future::Future;
use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::Utc;
use signaldesk_core::api::{ApiClient, ApiError, FetchOutcome};
use signaldesk_core::auth::{Countdown, CountdownDisplay, FileStore, KeyValueStore, SessionStore};
use signaldesk_core::config::{Config, ENV_PASSWORD};
use signaldesk_core::models::{Pair, Signal, SignalList, Stock};
use signaldesk_core::utils::{signal_line, sort_pairs, sort_stocks, truncate_string, Pager};
use signaldesk_core::webhook::{TickerDirectory, WebhookForm};
use tracing::{debug, info, warn};

use crate::commands::{Command, SignalFilter, TradeKind, USAGE};

/// Longest order comment shown in a signal row
const COMMENT_WIDTH: usize = 24;

pub struct App<S: KeyValueStore = FileStore> {
    config: Config,
    sessions: SessionStore<S>,
    api: ApiClient,
}

impl App<FileStore> {
    /// Load config (falling back to defaults), apply environment overrides
    /// and open the durable session.
    pub fn new() -> Result<Self> {
        let mut config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        config.apply_env();

        let storage_path = Config::storage_path()?;
        let store = FileStore::open(&storage_path)
            .with_context(|| format!("Failed to open session storage {}", storage_path.display()))?;
        let sessions = SessionStore::open(store)?;
        let api = ApiClient::new(&config.api_base_url())?;
        debug!(server = %api.base_url(), "App ready");

        Ok(Self::with_parts(config, sessions, api))
    }
}

impl<S: KeyValueStore> App<S> {
    pub fn with_parts(config: Config, sessions: SessionStore<S>, api: ApiClient) -> Self {
        Self { config, sessions, api }
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Help => println!("{}", USAGE),
            Command::Login { username, expire_minutes } => self.login(username, expire_minutes).await?,
            Command::Logout => self.logout().await?,
            Command::Status => println!("{}", self.countdown_display()),
            Command::Countdown => self.watch_countdown(ctrl_c()).await?,
            Command::Signals { filter, limit, page } => self.list_signals(filter, limit, page).await?,
            Command::Signal { rowid } => print_signal(&self.api.get_signal(rowid).await?),
            Command::Webhook { kind, fields } => self.post_webhook(kind, &fields).await?,
            Command::UpdateSignal { fields } => self.update_signal(&fields).await?,
            Command::DeleteSignal { rowid } => {
                let token = self.require_token()?;
                let resp = self.api.delete_signal(token, rowid).await.map_err(relogin_hint)?;
                println!("{}", resp.message);
            }
            Command::Stocks { page } => self.list_stocks(page).await?,
            Command::Stock { symbol } => print_stock(&self.api.get_stock(&symbol).await?),
            Command::AddStock(stock) => {
                let token = self.require_token()?;
                let resp = self.api.create_stock(token, &stock).await.map_err(relogin_hint)?;
                println!("{}", resp.message);
            }
            Command::UpdateStock(stock) => {
                let token = self.require_token()?;
                let resp = self.api.update_stock(token, &stock).await.map_err(relogin_hint)?;
                println!("{}", resp.message);
            }
            Command::DeleteStock { symbol } => {
                let token = self.require_token()?;
                let resp = self.api.delete_stock(token, &symbol).await.map_err(relogin_hint)?;
                println!("{}", resp.message);
            }
            Command::Pairs { page } => self.list_pairs(page).await?,
            Command::Pair { name } => print_pair(&self.api.get_pair(&name).await?),
            Command::AddPair(pair) => {
                let token = self.require_token()?;
                let resp = self.api.create_pair(token, &pair).await.map_err(relogin_hint)?;
                println!("{}", resp.message);
            }
            Command::UpdatePair(pair) => {
                let token = self.require_token()?;
                let resp = self.api.update_pair(token, &pair).await.map_err(relogin_hint)?;
                println!("{}", resp.message);
            }
            Command::DeletePair { name } => {
                let token = self.require_token()?;
                let resp = self.api.delete_pair(token, &name).await.map_err(relogin_hint)?;
                println!("{}", resp.message);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// The stored token, fresh or not. Mutations go out with whatever is
    /// stored and let the server decide.
    fn require_token(&self) -> Result<&str, ApiError> {
        self.sessions.token().ok_or(ApiError::NotLoggedIn)
    }

    fn countdown_display(&self) -> CountdownDisplay {
        CountdownDisplay::from_remaining(self.sessions.remaining_duration(Utc::now()))
    }

    async fn login(&mut self, username: Option<String>, expire_minutes: i64) -> Result<()> {
        let username = match username.or_else(|| self.config.last_username.clone()) {
            Some(user) => user,
            None => prompt_username()?,
        };
        let password = match std::env::var(ENV_PASSWORD) {
            Ok(pw) if !pw.is_empty() => pw,
            _ => rpassword::prompt_password(format!("Password for {}: ", username))?,
        };

        let response = match self.api.login(&username, &password, expire_minutes).await {
            Ok(response) => response,
            Err(ApiError::AuthRejected(message)) => anyhow::bail!("Try again! {}", message),
            Err(e) => return Err(e.into()),
        };

        // the login flow fails as a whole if the token cannot be stored
        self.sessions
            .login(&response.access_token, response.expire)
            .context("Failed to save access token")?;
        info!(username = %username, expire = response.expire, "Logged in");

        self.config.last_username = Some(username);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        println!("Successful login! Saved access token.");
        println!("{}", self.countdown_display());
        Ok(())
    }

    async fn logout(&mut self) -> Result<()> {
        let Some(token) = self.sessions.token().map(str::to_string) else {
            println!("Nothing to logout!");
            println!("{}", CountdownDisplay::NoToken);
            return Ok(());
        };

        // local state is cleared whatever the server says
        match self.api.logout(&token).await {
            Ok(resp) => println!("{}", resp.message),
            Err(ApiError::AuthRejected(message)) => println!("Nothing to logout! {}", message),
            Err(e) => println!("Server logout failed: {}", e),
        }
        self.sessions.logout().context("Failed to clear access token")?;
        println!("{}", self.countdown_display());
        Ok(())
    }

    /// Print the countdown until the token expires or `stop` completes. An
    /// expired token is invalidated locally.
    async fn watch_countdown(&mut self, stop: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(stop);
        let mut countdown = Countdown::new();
        let expires_at = self.sessions.session().expires_at.filter(|_| self.sessions.session().has_token());
        let mut rx = countdown.start(expires_at, Utc::now());

        let mut last = *rx.borrow_and_update();
        print_countdown_line(&last)?;

        while matches!(last, CountdownDisplay::Remaining(_)) {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    last = *rx.borrow_and_update();
                    print_countdown_line(&last)?;
                }
                _ = &mut stop => {
                    debug!("Countdown interrupted");
                    break;
                }
            }
        }
        countdown.stop();
        println!();

        if last == CountdownDisplay::Expired && self.sessions.session().has_token() {
            info!("Access token expired, clearing it");
            self.sessions.invalidate().context("Failed to clear expired access token")?;
        }
        Ok(())
    }

    // =========================================================================
    // Signals
    // =========================================================================

    async fn list_signals(&self, filter: SignalFilter, limit: Option<u32>, page: usize) -> Result<()> {
        let limit = limit.unwrap_or(self.config.signals_limit);
        let session = self.sessions.session();
        let outcome = match &filter {
            SignalFilter::All => self.api.list_signals(limit, session).await?,
            SignalFilter::Ticker(ticker) => {
                self.api.list_signals_for_ticker(ticker, limit, session).await?
            }
            SignalFilter::Status(status) => {
                self.api.list_signals_by_status(status, limit, session).await?
            }
        };
        debug!(
            used_auth = outcome.used_auth,
            downgraded = outcome.was_downgraded,
            "Signals fetched"
        );

        let rows: Vec<String> = outcome
            .payload
            .signals
            .iter()
            .map(|s| match filter {
                SignalFilter::All => format!("{} #{:<6} {}", s.status().marker(), s.rowid, signal_line(s)),
                _ => signal_row(s),
            })
            .collect();

        if rows.is_empty() {
            println!("No signals.");
        } else {
            print_page(&rows, self.config.page_size, page);
        }
        if let Some(hint) = downgrade_hint(&outcome) {
            println!("{}", hint);
        }
        Ok(())
    }

    async fn post_webhook(&self, kind: TradeKind, fields: &[String]) -> Result<()> {
        let form = WebhookForm::parse_fields(fields)?;
        let directory = match kind {
            TradeKind::Pair => TickerDirectory::from_pairs(&self.api.list_pairs(0).await?),
            TradeKind::Stock => TickerDirectory::from_stocks(&self.api.list_stocks(0).await?),
        };
        if !form.ticker.is_empty() && !directory.contains(&form.ticker) {
            anyhow::bail!(
                "Unknown ticker '{}'. Choose one of: {}",
                form.ticker,
                directory.names().join(", ")
            );
        }
        let signal = form.build(&directory)?;
        println!("{}", serde_json::to_string_pretty(&signal)?);

        let resp = self.api.post_webhook(&signal).await?;
        println!("{}", resp.message);
        Ok(())
    }

    async fn update_signal(&self, fields: &[String]) -> Result<()> {
        let signal = WebhookForm::parse_fields(fields)?.build_update()?;
        let token = self.require_token()?;
        let updated = self.api.update_signal(token, &signal).await.map_err(relogin_hint)?;
        println!("Signal updated.");
        print_signal(&updated);
        Ok(())
    }

    // =========================================================================
    // Stocks and pairs
    // =========================================================================

    async fn list_stocks(&self, page: usize) -> Result<()> {
        let mut stocks = self.api.list_stocks(0).await?;
        sort_stocks(&mut stocks);
        let rows: Vec<String> = stocks.iter().map(stock_row).collect();
        if rows.is_empty() {
            println!("No stocks.");
        } else {
            print_page(&rows, self.config.page_size, page);
        }
        Ok(())
    }

    async fn list_pairs(&self, page: usize) -> Result<()> {
        let mut pairs = self.api.list_pairs(0).await?;
        sort_pairs(&mut pairs);
        let rows: Vec<String> = pairs.iter().map(pair_row).collect();
        if rows.is_empty() {
            println!("No pairs.");
        } else {
            print_page(&rows, self.config.page_size, page);
        }
        Ok(())
    }
}

// ============================================================================
// Output helpers
// ============================================================================

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim().to_string();
    if username.is_empty() {
        anyhow::bail!("Username required");
    }
    Ok(username)
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves,
/// so the countdown still runs to expiry.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn print_countdown_line(display: &CountdownDisplay) -> Result<()> {
    let mut out = io::stdout();
    write!(out, "\r{:<20}", display.to_string())?;
    out.flush()?;
    Ok(())
}

/// A rejected token on a mutation tells the user to log in again; the
/// stored token is left in place.
fn relogin_hint(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::AuthRejected(message) => {
            anyhow::anyhow!("{}\nYou need to re-login!", message)
        }
        other => other.into(),
    }
}

fn downgrade_hint(outcome: &FetchOutcome<SignalList>) -> Option<String> {
    if !outcome.was_downgraded {
        return None;
    }
    Some(match outcome.payload.notoken_limit {
        Some(limit) => format!("Showing at most {} signals. Login to see more!", limit),
        None => "Login to see more signals!".to_string(),
    })
}

/// `page` is 1-based; pages past the end show the last one.
fn page_rows(rows: &[String], page_size: usize, page: usize) -> (Pager, &[String]) {
    let mut pager = Pager::new(rows.len(), page_size);
    for _ in 1..page {
        if !pager.next() {
            break;
        }
    }
    let visible = pager.slice(rows);
    (pager, visible)
}

fn print_page(rows: &[String], page_size: usize, page: usize) {
    let (pager, visible) = page_rows(rows, page_size, page);
    for row in visible {
        println!("{}", row);
    }
    if pager.has_controls() {
        let (current, total) = pager.position();
        println!("-- page {}/{} (--page N) --", current, total);
    }
}

fn signal_row(s: &Signal) -> String {
    format!(
        "{} #{:<6} {:<19} {:<12} {:<4} {:>5} @ {:<10} {:<9} {:<10} {:<6} {}",
        s.status().marker(),
        s.rowid,
        s.timestamp.as_deref().unwrap_or("-"),
        s.ticker,
        s.order_action.to_uppercase(),
        s.order_contracts,
        fmt_opt(s.order_price),
        s.order_status.as_deref().unwrap_or("-"),
        fmt_opt(s.fill_price),
        fmt_opt(s.slip),
        truncate_string(s.order_comment.as_deref().unwrap_or(""), COMMENT_WIDTH),
    )
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_signal(s: &Signal) {
    println!("Signal #{} ({})", s.rowid, s.status().marker());
    println!("  timestamp:        {}", s.timestamp.as_deref().unwrap_or("-"));
    println!("  ticker:           {}", s.ticker);
    println!("  order:            {}", signal_line(s));
    println!("  order_price:      {}", fmt_opt(s.order_price));
    println!(
        "  mar_pos:          {} ({})",
        s.mar_pos.as_deref().unwrap_or("-"),
        s.mar_pos_size.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
    );
    println!(
        "  pre_mar_pos:      {} ({})",
        s.pre_mar_pos.as_deref().unwrap_or("-"),
        s.pre_mar_pos_size.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
    );
    println!("  order_status:     {}", s.order_status.as_deref().unwrap_or("-"));
    println!("  order_comment:    {}", s.order_comment.as_deref().unwrap_or("-"));
    println!("  fill_price:       {}", fmt_opt(s.fill_price));
    println!("  slip:             {}", fmt_opt(s.slip));
}

fn stock_row(s: &Stock) -> String {
    format!("{} {}", if s.is_active() { "+" } else { " " }, s.label())
}

fn print_stock(s: &Stock) {
    println!("{}", s.label());
    println!("  active: {}", if s.is_active() { "yes" } else { "no" });
}

fn pair_row(p: &Pair) -> String {
    format!(
        "{} {:<16} hedge {}",
        if p.is_active() { "+" } else { " " },
        p.name.to_uppercase(),
        p.hedge
    )
}

fn print_pair(p: &Pair) {
    println!("{}", p.name.to_uppercase());
    println!("  hedge:  {}", p.hedge);
    println!("  active: {}", if p.is_active() { "yes" } else { "no" });
}
