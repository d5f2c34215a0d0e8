//! # Example: token_refresh
//!
//! Many threads ask [`AuthorizedUserCredentials`] for a header at the same
//! time; the [`TokenCache`](cloudretry::TokenCache) performs a single refresh
//! against a fake token endpoint and shares the result.
//!
//! ## Run
//! ```bash
//! cargo run --example token_refresh
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    thread,
    time::Duration,
};

use cloudretry::{AuthorizedUserCredentials, Config, Credentials, HttpResponse, Status};

fn main() -> anyhow::Result<()> {
    let refreshes = Arc::new(AtomicU32::new(0));
    let counter = refreshes.clone();

    // 1. Fake endpoint: first call fails transiently, then hands out a token
    let endpoint = move |body: &str| -> Result<HttpResponse, Status> {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        println!("[endpoint] POST #{n}: {body}");
        thread::sleep(Duration::from_millis(100));
        if n == 1 {
            return Ok(HttpResponse::new(503, "try again"));
        }
        Ok(HttpResponse::new(
            200,
            r#"{"token_type":"Bearer","access_token":"ya29.demo","expires_in":3600}"#,
        ))
    };

    // 2. Credentials from an authorized_user JSON document
    let creds = AuthorizedUserCredentials::from_json(
        r#"{"type":"authorized_user","client_id":"demo id","client_secret":"s3cr3t","refresh_token":"1//rt"}"#,
        endpoint,
        &Config::default(),
    )?;

    // 3. Twenty threads need a header at once
    thread::scope(|s| {
        for i in 0..20 {
            let creds = &creds;
            s.spawn(move || match creds.authorization_header() {
                Ok(h) => println!("[thread {i:02}] {h}"),
                Err(e) => println!("[thread {i:02}] error: {e}"),
            });
        }
    });

    println!("[main] endpoint calls: {}", refreshes.load(Ordering::SeqCst));
    Ok(())
}
