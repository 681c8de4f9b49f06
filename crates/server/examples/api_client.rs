//! Walk through the gateway API against a running server.
//!
//! ```text
//! cargo run -p docgate-server &
//! cargo run -p docgate-server --example api_client
//! ```

use reqwest::Client;
use serde_json::{json, Value};

const SERVER_URL: &str = "http://localhost:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = Client::new();

    println!("1. Greeting:");
    let resp = client.get(format!("{SERVER_URL}/")).send().await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    println!("2. Create a widget:");
    let resp = client
        .put(format!("{SERVER_URL}/widgets"))
        .json(&json!({ "name": "bolt", "qty": 5 }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    let created: Value = resp.json().await?;
    println!("Body: {created}");
    let id = created["_id"].as_str().unwrap_or_default().to_string();
    println!();

    println!("3. Fetch it back:");
    let resp = client
        .get(format!("{SERVER_URL}/widgets/{id}"))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    println!("4. Merge-update the quantity:");
    let resp = client
        .put(format!("{SERVER_URL}/widgets/{id}"))
        .json(&json!({ "qty": 9 }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    println!("5. Filter by quantity:");
    let resp = client
        .post(format!("{SERVER_URL}/widgets"))
        .json(&json!({ "qty": 9 }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    println!("6. Count:");
    let resp = client
        .get(format!("{SERVER_URL}/widgets/count"))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    println!("7. Delete, then fetch again:");
    let resp = client
        .delete(format!("{SERVER_URL}/widgets/{id}"))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    let resp = client
        .get(format!("{SERVER_URL}/widgets/{id}"))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);

    Ok(())
}
