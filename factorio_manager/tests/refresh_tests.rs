mod common;

use std::{sync::Arc, time::Duration};

use common::{panel_manager, FakeChannel, StaticConsole};
use factorio_manager::refresh::RefreshLoop;

const INTERVAL: Duration = Duration::from_secs(25);

#[tokio::test(start_paused = true)]
async fn loop_edits_once_per_interval_until_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let channel = FakeChannel::new();
    let manager = Arc::new(panel_manager(
        channel.clone(),
        StaticConsole::online("Alice"),
        &dir.path().join("bot_state.json"),
    ));
    let id = manager.ensure_single_panel().await.unwrap();

    let refresh = RefreshLoop::spawn(manager.clone(), INTERVAL);
    // the first cycle waits a full interval
    tokio::time::sleep(Duration::from_secs(24)).await;
    assert_eq!(channel.edits(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(channel.edits(), 1);

    tokio::time::sleep(INTERVAL).await;
    assert_eq!(channel.edits(), 2);

    refresh.stop().await;
    tokio::time::sleep(INTERVAL * 4).await;
    assert_eq!(channel.edits(), 2);
    assert_eq!(channel.created(), 1);
    assert_eq!(channel.ids(), [id]);
}
