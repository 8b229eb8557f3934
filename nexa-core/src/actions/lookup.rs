//! Endpoint descriptions for JSON lookups.
//!
//! An endpoint is a URL template plus a list of JSON pointers naming the
//! fields to extract. A `*` pointer segment fans out over every element of
//! an array, so `/articles/*/title` yields one string per article.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NexaError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EndpointConfig {
    /// `{query}` and `{key}` are substituted (percent-encoded).
    pub url: String,
    /// JSON pointers to extract, in output order.
    pub pick: Vec<String>,
    pub api_key: Option<String>,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>, pick: &[&str]) -> Self {
        Self {
            url: url.into(),
            pick: pick.iter().map(|p| p.to_string()).collect(),
            api_key: None,
        }
    }

    pub fn with_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    /// Concrete request URL for `query`.
    pub fn render_url(&self, query: &str) -> Result<String> {
        if self.url.contains("{key}") && self.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(NexaError::upstream(format!("no API key configured for {}", self.url)));
        }
        let key = self.api_key.as_deref().unwrap_or_default();
        Ok(self
            .url
            .replace("{query}", &urlencoding::encode(query))
            .replace("{key}", &urlencoding::encode(key)))
    }

    /// Every non-empty string selected by `pick`, in pointer order.
    pub fn extract(&self, body: &Value) -> Result<Vec<String>> {
        let values: Vec<String> = self
            .pick
            .iter()
            .flat_map(|pointer| pick_values(body, pointer))
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            return Err(NexaError::upstream("response had none of the expected fields"));
        }
        Ok(values)
    }
}

/// Lookup endpoints per intent. `None` disables the lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LookupEndpoints {
    pub weather: Option<EndpointConfig>,
    pub news: Option<EndpointConfig>,
    pub joke: Option<EndpointConfig>,
    pub quote: Option<EndpointConfig>,
    pub stock: Option<EndpointConfig>,
    pub recipe: Option<EndpointConfig>,
}

impl Default for LookupEndpoints {
    fn default() -> Self {
        Self {
            weather: Some(EndpointConfig::new(
                "https://api.openweathermap.org/data/2.5/forecast?q={query}&cnt=5&units=metric&appid={key}",
                &["/list/*/weather/0/description"],
            )),
            news: Some(EndpointConfig::new(
                "https://newsapi.org/v2/top-headlines?country=us&apiKey={key}",
                &["/articles/*/title"],
            )),
            joke: Some(EndpointConfig::new(
                "https://official-joke-api.appspot.com/random_joke",
                &["/setup", "/punchline"],
            )),
            quote: Some(EndpointConfig::new(
                "https://api.quotable.io/random",
                &["/content"],
            )),
            stock: None,
            recipe: Some(EndpointConfig::new(
                "https://api.spoonacular.com/recipes/findByIngredients?ingredients={query}&apiKey={key}",
                &["/*/title"],
            )),
        }
    }
}

/// Resolve a JSON pointer with `*` wildcards to scalar strings.
pub fn pick_values(value: &Value, pointer: &str) -> Vec<String> {
    let segments: Vec<String> = pointer
        .split('/')
        .skip(1)
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect();
    let mut out = Vec::new();
    walk(value, &segments, &mut out);
    out
}

fn walk(value: &Value, segments: &[String], out: &mut Vec<String>) {
    let Some((head, rest)) = segments.split_first() else {
        match value {
            Value::String(s) => out.push(s.trim().to_string()),
            Value::Number(n) => out.push(n.to_string()),
            Value::Bool(b) => out.push(b.to_string()),
            _ => {}
        }
        return;
    };

    match value {
        Value::Array(items) if head == "*" => {
            for item in items {
                walk(item, rest, out);
            }
        }
        Value::Array(items) => {
            if let Some(item) = head.parse::<usize>().ok().and_then(|i| items.get(i)) {
                walk(item, rest, out);
            }
        }
        Value::Object(map) => {
            if let Some(child) = map.get(head.as_str()) {
                walk(child, rest, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wildcard_fans_out_over_arrays() {
        let body = json!({
            "list": [
                {"weather": [{"description": "light rain"}]},
                {"weather": [{"description": "clear sky"}]},
                {"weather": []}
            ]
        });
        assert_eq!(
            pick_values(&body, "/list/*/weather/0/description"),
            vec!["light rain", "clear sky"]
        );
    }

    #[test]
    fn scalars_and_missing_fields() {
        let body = json!({"price": 187.5, "open": true, "name": " ACME "});
        assert_eq!(pick_values(&body, "/price"), vec!["187.5"]);
        assert_eq!(pick_values(&body, "/open"), vec!["true"]);
        assert_eq!(pick_values(&body, "/name"), vec!["ACME"]);
        assert!(pick_values(&body, "/missing").is_empty());
        assert!(pick_values(&body, "").is_empty());
    }

    #[test]
    fn extract_keeps_pointer_order() {
        let endpoint = EndpointConfig::new("http://x", &["/setup", "/punchline"]);
        let body = json!({"punchline": "To get to the other side.", "setup": "Why did the chicken cross the road?"});
        assert_eq!(
            endpoint.extract(&body).unwrap(),
            vec!["Why did the chicken cross the road?", "To get to the other side."]
        );
        assert!(matches!(endpoint.extract(&json!({})), Err(NexaError::Upstream(_))));
    }

    #[test]
    fn render_substitutes_and_encodes() {
        let endpoint = EndpointConfig::new("https://api.test/q={query}&k={key}", &[]).with_key(Some("a b".into()));
        assert_eq!(endpoint.render_url("São Paulo").unwrap(), "https://api.test/q=S%C3%A3o%20Paulo&k=a%20b");
    }

    #[test]
    fn missing_key_is_upstream_error() {
        let endpoint = EndpointConfig::new("https://api.test/?k={key}", &[]);
        assert!(matches!(endpoint.render_url("x"), Err(NexaError::Upstream(_))));
        let keyless = EndpointConfig::new("https://api.test/?q={query}", &[]);
        assert_eq!(keyless.render_url("x").unwrap(), "https://api.test/?q=x");
    }

    #[test]
    fn endpoints_deserialize_with_defaults() {
        let endpoints: LookupEndpoints = serde_json::from_str(r#"{"stock": {"url": "https://s/{query}", "pick": ["/price"]}}"#).unwrap();
        assert_eq!(endpoints.stock.unwrap().pick, vec!["/price"]);
        assert!(endpoints.weather.is_some());
    }
}
