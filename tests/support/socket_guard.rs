use std::net::TcpListener;

use wiremock::MockServer;

const REQUIRE_ENV: &str = "PARTLIST_REQUIRE_SOCKET_TESTS";

/// Starts a wiremock server, or returns `None` when the sandbox forbids
/// binding localhost. Set `PARTLIST_REQUIRE_SOCKET_TESTS=1` to fail instead.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl Future<Output = Option<MockServer>> {
    let caller = std::panic::Location::caller();
    let can_bind = TcpListener::bind("127.0.0.1:0").is_ok();
    async move {
        if can_bind {
            return Some(MockServer::start().await);
        }
        let required = std::env::var(REQUIRE_ENV)
            .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
        assert!(
            !required,
            "[socket-bound-test] {caller}: cannot bind a localhost socket and {REQUIRE_ENV} is set"
        );
        eprintln!("[socket-bound-test] {caller}: cannot bind a localhost socket, skipping");
        None
    }
}
