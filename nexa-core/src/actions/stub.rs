//! `StubActions`: deterministic executor that performs no I/O.
//!
//! Every call is recorded as `"<intent>:<argument>"` so tests can assert
//! which collaborator the session reached. Lookups answer from the canned
//! data configured with the `with_*` builders; anything unconfigured is an
//! upstream failure, as is every call once `failing()` is set.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::actions::{platform_url, ActionExecutor};
use crate::error::{NexaError, Result};

#[derive(Debug, Default)]
pub struct StubActions {
    forecasts: HashMap<String, Vec<String>>,
    headlines: Vec<String>,
    joke: Option<String>,
    quote: Option<String>,
    prices: HashMap<String, String>,
    recipes: HashMap<String, Vec<String>>,
    failing: bool,
    calls: Mutex<Vec<String>>,
}

impl StubActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call returns an upstream error.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_forecast(mut self, city: &str, descriptions: &[&str]) -> Self {
        self.forecasts.insert(
            city.to_lowercase(),
            descriptions.iter().map(|d| d.to_string()).collect(),
        );
        self
    }

    pub fn with_headlines(mut self, headlines: &[&str]) -> Self {
        self.headlines = headlines.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn with_joke(mut self, joke: &str) -> Self {
        self.joke = Some(joke.to_string());
        self
    }

    pub fn with_quote(mut self, quote: &str) -> Self {
        self.quote = Some(quote.to_string());
        self
    }

    pub fn with_price(mut self, symbol: &str, price: &str) -> Self {
        self.prices.insert(symbol.to_lowercase(), price.to_string());
        self
    }

    pub fn with_recipes(mut self, ingredient: &str, titles: &[&str]) -> Self {
        self.recipes.insert(
            ingredient.to_lowercase(),
            titles.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// Recorded calls, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, intent: &str, argument: &str) -> Result<()> {
        debug!(intent, argument, "stub action");
        self.calls.lock().push(format!("{intent}:{argument}"));
        if self.failing {
            return Err(NexaError::upstream(format!("stub {intent} failure")));
        }
        Ok(())
    }
}

fn missing(what: &str) -> NexaError {
    NexaError::upstream(format!("stub has no {what}"))
}

impl ActionExecutor for StubActions {
    fn weather(&self, city: &str) -> Result<Vec<String>> {
        self.record("weather", city)?;
        self.forecasts
            .get(&city.to_lowercase())
            .cloned()
            .ok_or_else(|| missing("forecast"))
    }

    fn news(&self) -> Result<Vec<String>> {
        self.record("news", "")?;
        Ok(self.headlines.clone())
    }

    fn joke(&self) -> Result<String> {
        self.record("joke", "")?;
        self.joke.clone().ok_or_else(|| missing("joke"))
    }

    fn quote(&self) -> Result<String> {
        self.record("quote", "")?;
        self.quote.clone().ok_or_else(|| missing("quote"))
    }

    fn stock(&self, symbol: &str) -> Result<String> {
        self.record("stock", symbol)?;
        self.prices
            .get(&symbol.to_lowercase())
            .map(|price| format!("Current price of {}: {price}", symbol.to_uppercase()))
            .ok_or_else(|| missing("price"))
    }

    fn recipes(&self, ingredient: &str) -> Result<Vec<String>> {
        self.record("recipe", ingredient)?;
        self.recipes
            .get(&ingredient.to_lowercase())
            .cloned()
            .ok_or_else(|| missing("recipes"))
    }

    fn play(&self, query: &str) -> Result<()> {
        self.record("play", query)
    }

    fn search(&self, query: &str) -> Result<()> {
        self.record("search", query)
    }

    fn open_platform(&self, platform: &str) -> Result<bool> {
        self.record("open", platform)?;
        Ok(platform_url(platform).is_some())
    }

    fn battery(&self) -> Result<String> {
        self.record("battery", "")?;
        Ok("Battery percentage: 80%, Plugged in: true".to_string())
    }

    fn storage(&self) -> Result<String> {
        self.record("storage", "")?;
        Ok("Drive /dev/stub: 40% used, 60 GB free".to_string())
    }

    fn disk_usage(&self) -> Result<String> {
        self.record("disk-usage", "")?;
        Ok("Total: 100 GB, Used: 40 GB, Free: 60 GB".to_string())
    }

    fn empty_recycle_bin(&self) -> Result<String> {
        self.record("recycle-bin", "")?;
        Ok("Recycle bin cleared.".to_string())
    }
}
