//! Walks one tab through a whole session against an in-process backend:
//! login from a redirect URL, background refreshes while the user is
//! active, a hidden/visible round-trip, and finally an inactivity logout.
//!
//! Timings are shrunk to seconds so the run takes about fifteen seconds.
//!
//! ```text
//! RUST_LOG=debug cargo run -p session-walkthrough
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dealgate::bootstrap::from_redirect_url;
use dealgate::prelude::*;
use dealgate::session::RecordingNavigator;
use dealgate::token::{RefreshRequest, RefreshResponse, remaining_lifetime};
use dealgate::transport::TransportError;
use serde_json::json;

/// How long each minted access token lives.
const TOKEN_LIFETIME_SECS: u64 = 5;

// ---------------------------------------------------------------------------
// Backend stand-in
// ---------------------------------------------------------------------------

/// Mints short-lived tokens and rotates the refresh token on every call.
#[derive(Default)]
struct DemoBackend {
    issued: AtomicUsize,
}

impl DemoBackend {
    fn mint(&self, user_id: &str) -> String {
        let exp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            + TOKEN_LIFETIME_SECS;
        let payload = json!({ "sub": user_id, "role": "seller", "exp": exp });
        format!(
            "{}.{}.demo",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(payload.to_string()),
        )
    }
}

impl RefreshTransport for DemoBackend {
    async fn refresh(&self, request: RefreshRequest) -> Result<RefreshResponse, TransportError> {
        if !request.refresh_token.starts_with("demo-refresh-") {
            return Err(TransportError::Status(401));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(RefreshResponse {
            access_token: self.mint("u-42"),
            refresh_token: Some(format!("demo-refresh-{n}")),
        })
    }
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), DealgateError> {
    dealgate::telemetry::init_tracing("info,dealgate_session=debug");

    let backend = Arc::new(DemoBackend::default());
    let navigator = Arc::new(RecordingNavigator::new());
    let config = SessionConfig {
        refresh_lead_secs: 2,
        inactivity_timeout_secs: 4,
        ..SessionConfig::default()
    };
    let session = SessionController::builder(Arc::clone(&backend))
        .config(config)
        .navigator(navigator.clone())
        .build()?;

    let mut events = session.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("  event: {event:?}");
            if matches!(event, SessionEvent::LoggedOut { .. }) {
                break;
            }
        }
    });

    // 1. The sign-in page redirects back with the session in the query.
    let redirect = format!(
        "https://app.example.com/seller/dashboard?token={}&userId=u-42&role=seller&refreshToken=demo-refresh-0",
        backend.mint("u-42"),
    );
    println!("== login from redirect");
    if let Some(login) = from_redirect_url(&redirect)? {
        session.login_session(login);
    }
    println!("  status: {:?}", session.check_auth());

    // 2. The user keeps working; refreshes happen in the background.
    println!("== active for 7s (token lifetime {TOKEN_LIFETIME_SECS}s, lead 2s)");
    for _ in 0..7 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.record_activity(ActivitySignal::PointerMove);
        if let Some(token) = session.access_token() {
            let left = remaining_lifetime(&token, SystemTime::now());
            println!("  token valid for another {}s", left.as_secs());
        }
    }
    println!("  refreshes so far: {}", backend.issued.load(Ordering::SeqCst));

    // 3. The tab goes to the background and comes back.
    println!("== hidden, then visible");
    session.handle_visibility(Visibility::Hidden).await;
    let outcome = session.handle_visibility(Visibility::Visible).await;
    println!("  reconciliation: {outcome:?}");

    // 4. The user walks away.
    println!("== idle");
    tokio::time::sleep(Duration::from_secs(5)).await;

    let _ = printer.await;
    println!("  redirected to: {:?}", navigator.destinations());
    println!("  status: {:?}", session.check_auth());
    Ok(())
}
