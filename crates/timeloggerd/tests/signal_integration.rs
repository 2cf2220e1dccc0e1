//! Delivers real signals to the test process.
//!
//! Kept in its own test binary with a single test: once the listener is
//! registered, SIGTERM and SIGHUP no longer kill this process, and no other
//! test should observe that.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::getpid;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use timelog_core::{ExitStatus, ServiceConfig};
use timeloggerd::logging::subscriber;
use timeloggerd::{
    spawn_signal_listener, ChannelEvent, LifecycleController, MemoryChannel, Service,
};

const DELIVERY_GAP: Duration = Duration::from_millis(100);
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_os_signals_drive_the_lifecycle() {
    let channel = Arc::new(MemoryChannel::new());
    let _guard = tracing::subscriber::set_default(subscriber(channel.clone()));
    let service = Service::new(ServiceConfig::default(), channel.clone());

    let cancel_token = CancellationToken::new();
    let mut signals = spawn_signal_listener(cancel_token.clone()).expect("register signals");

    let pid = getpid();
    let driver = async move {
        sleep(DELIVERY_GAP).await;
        kill(pid, Signal::SIGUSR1).unwrap();
        sleep(DELIVERY_GAP).await;
        kill(pid, Signal::SIGHUP).unwrap();
        sleep(DELIVERY_GAP).await;
        kill(pid, Signal::SIGTERM).unwrap();
    };

    let controller = LifecycleController::new();
    let (status, ()) = timeout(TEST_TIMEOUT, async {
        tokio::join!(
            service.supervise(&controller, &mut signals),
            driver
        )
    })
    .await
    .expect("SIGTERM should end the loop");
    cancel_token.cancel();

    assert_eq!(status, ExitStatus::Success);
    let messages = channel.messages();
    assert_eq!(
        messages
            .iter()
            .filter(|m| m.as_str() == "received unhandled signal.")
            .count(),
        1
    );
    assert_eq!(
        messages.last().map(String::as_str),
        Some("received SIGTERM, exiting.")
    );
    assert_eq!(channel.events().last(), Some(&ChannelEvent::Closed));
}
