//! Demonstrates a token-refreshing client against a mocked Umami instance: the login runs on
//! the background refresher, and every authenticated call reuses the cached bearer token.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::Duration;
// self
use umami_client::{
	auth::RefreshPolicy,
	client::{Client, ClientConfig},
	request::QueryMap,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login");
			then.status(200).body(r#"{"token":"demo-token","user":{"id":"u-1"}}"#);
		})
		.await;
	let stats = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/websites/w-1/stats")
				.header("authorization", "Bearer demo-token");
			then.status(200).body(r#"{"pageviews":{"value":42},"visitors":{"value":7}}"#);
		})
		.await;
	let config = ClientConfig::builder(server.base_url())
		.token_refresh("admin", "umami")
		.token_expiry(Duration::hours(1))
		.refresh_policy(RefreshPolicy::default().with_safety_margin(Duration::minutes(5)))
		.build()?;
	let client = Client::new(config).await?;
	let range = QueryMap::time_range(
		time::macros::datetime!(2025-01-01 00:00 UTC),
		time::macros::datetime!(2025-01-31 23:59 UTC),
	);

	for _ in 0..3 {
		let body: serde_json::Value = client.get("/api/websites/w-1/stats", range.clone()).await?;

		println!("pageviews: {}", body["pageviews"]["value"]);
	}

	if let Some(refresher) = client.refresher() {
		let metrics = refresher.metrics();

		println!(
			"refresher: {} attempt(s), {} success(es), {} hand-off(s)",
			metrics.attempts(),
			metrics.successes(),
			metrics.handoffs()
		);

		client.close();
		refresher.shutdown().await;
	}

	login.assert_async().await;
	stats.assert_calls_async(3).await;

	Ok(())
}
