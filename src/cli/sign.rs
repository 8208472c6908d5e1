//! Request signing command

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde_json::Value;

use crate::auth::{
    self, canonical_query, format_timestamp, SharedSecret, CLIENT_ID_HEADER, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};

/// Print the headers a client must send with `body`
pub fn sign(
    client_id: String,
    secret: String,
    body: String,
    query: Option<String>,
    timestamp: Option<String>,
) -> Result<()> {
    let timestamp = timestamp.unwrap_or_else(|| format_timestamp(Utc::now()));
    for (name, value) in signed_headers(&client_id, secret, &body, query.as_deref(), timestamp)? {
        println!("{}: {}", name, value);
    }
    Ok(())
}

fn signed_headers(
    client_id: &str,
    secret: String,
    body: &str,
    query: Option<&str>,
    timestamp: String,
) -> Result<Vec<(&'static str, String)>> {
    let secret = SharedSecret::new(secret).ok_or_else(|| anyhow!("secret must not be empty"))?;
    let body: Value = serde_json::from_str(body).context("body is not valid JSON")?;
    let query = canonical_query(query.map(|q| q.trim_start_matches('?')))
        .context("malformed query string")?;
    let signature = auth::sign(&secret, client_id, &timestamp, &query, &body)?;

    Ok(vec![
        (CLIENT_ID_HEADER, client_id.to_string()),
        (TIMESTAMP_HEADER, timestamp),
        (SIGNATURE_HEADER, signature),
    ])
}
