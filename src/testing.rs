//! Shared test fixtures

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::app::Bouncer;
use crate::common::Credentials;
use crate::config::Config;
use crate::store::{Datastore, SqliteDatastore};
use crate::transport::memory::MemoryTransport;
use crate::transport::Transport;

const TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn credentials(name: &str) -> Credentials {
    Credentials {
        network: name.to_string(),
        hostname: "irc.example.org".to_string(),
        port: 6667,
        nickname: "alice".to_string(),
        username: "alice".to_string(),
        realname: "Alice".to_string(),
        password: None,
        usermode: 0,
    }
}

/// Default config with the web server off
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.web.enabled = false;
    config
}

/// A bouncer over an in-memory store and transport
pub(crate) async fn memory_bouncer() -> (Arc<Bouncer>, Arc<SqliteDatastore>, Arc<MemoryTransport>) {
    let store = Arc::new(SqliteDatastore::in_memory().unwrap());
    let transport = Arc::new(MemoryTransport::new());
    let bouncer = Bouncer::initialize(
        test_config(),
        Some(store.clone() as Arc<dyn Datastore>),
        transport.clone() as Arc<dyn Transport>,
    )
    .await
    .unwrap();
    (bouncer, store, transport)
}

pub(crate) async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(TIMEOUT, fut).await.expect("timed out")
}

/// Poll `check` until it holds
pub(crate) async fn eventually(mut check: impl FnMut() -> bool) {
    within(async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

pub(crate) async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> String {
    let mut line = String::new();
    within(reader.read_line(&mut line)).await.expect("read failed");
    line
}
