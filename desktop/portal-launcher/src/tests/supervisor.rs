use crate::server::{LaunchSpec, ServerStatus, SupervisorTimings};
use crate::settings::ProcessSettings;
use crate::tests::{FailingBrowser, Harness, fast_timings, free_port, shell_spec, site_dir};

use portal_config::LogLevel;

use std::sync::Arc;
use std::time::Duration;

use googletest::assert_that;
use googletest::prelude::{eq, gt, none, some};

const LONG_RUNNING: &str = "sleep 30";
const WAIT: Duration = Duration::from_secs(5);

// =========================================================================
// Start
// =========================================================================

#[tokio::test]
async fn given_free_port_when_start_then_running_on_configured_port() {
    // Given
    let port = free_port();
    let harness = Harness::new(shell_spec(LONG_RUNNING), port);

    // When
    let started = harness.supervisor.start().await;

    // Then
    assert!(started);
    assert_that!(harness.supervisor.status().await, eq(ServerStatus::Running));
    assert_that!(harness.supervisor.port().await, some(eq(port)));
    assert_that!(harness.statuses(), eq(&vec![ServerStatus::Running]));
    assert_that!(harness.supervisor.last_status(), eq(ServerStatus::Running));

    harness.supervisor.stop().await;
}

#[tokio::test]
async fn given_configured_port_occupied_when_start_then_next_free_port_used() {
    // Given
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();
    let harness = Harness::new(shell_spec(LONG_RUNNING), port);

    // When
    let started = harness.supervisor.start().await;

    // Then
    assert!(started);
    assert_that!(harness.supervisor.status().await, eq(ServerStatus::Running));
    let actual = harness.supervisor.port().await.unwrap();
    assert_that!(actual, gt(port));

    let url = harness.supervisor.open_browser().await;
    assert_that!(url, some(eq(&format!("http://localhost:{actual}/"))));

    harness.supervisor.stop().await;
    drop(occupied);
}

#[tokio::test]
async fn given_already_running_when_start_then_noop_success() {
    // Given
    let harness = Harness::new(shell_spec(LONG_RUNNING), free_port());
    assert!(harness.supervisor.start().await);
    let port = harness.supervisor.port().await;

    // When
    let started_again = harness.supervisor.start().await;

    // Then
    assert!(started_again);
    assert_that!(harness.supervisor.port().await, eq(port));
    assert_that!(harness.statuses(), eq(&vec![ServerStatus::Running]));

    harness.supervisor.stop().await;
}

#[tokio::test]
async fn given_child_exits_during_grace_when_start_then_error_reported() {
    // Given
    let harness = Harness::new(shell_spec("exit 1"), free_port());

    // When
    let started = harness.supervisor.start().await;

    // Then
    assert!(!started);
    assert_that!(harness.supervisor.status().await, eq(ServerStatus::Stopped));
    assert_that!(harness.supervisor.port().await, none());
    assert_that!(harness.statuses(), eq(&vec![ServerStatus::Error]));
}

#[tokio::test]
async fn given_missing_program_when_start_then_error_reported() {
    // Given
    let spec = LaunchSpec::new("/nonexistent/portal-server-binary");
    let harness = Harness::new(spec, free_port());

    // When
    let started = harness.supervisor.start().await;

    // Then
    assert!(!started);
    assert_that!(harness.supervisor.last_status(), eq(ServerStatus::Error));
    assert_that!(harness.statuses(), eq(&vec![ServerStatus::Error]));
}

#[tokio::test]
async fn given_site_root_when_start_then_child_runs_there_with_port_env() {
    // Given
    let site = tempfile::TempDir::new().unwrap();
    let port = free_port();
    let spec = shell_spec("echo \"$PORT\" > launched.txt; sleep 30").with_working_dir(site.path());
    let harness = Harness::new(spec, port);

    // When
    assert!(harness.supervisor.start().await);

    // Then
    let written = std::fs::read_to_string(site.path().join("launched.txt")).unwrap();
    assert_that!(written.trim(), eq(port.to_string().as_str()));

    harness.supervisor.stop().await;
}

#[tokio::test]
async fn given_site_root_setting_when_start_then_child_runs_in_site_root() {
    // Given
    let site = site_dir();
    let settings = ProcessSettings {
        server_program: Some("sh".into()),
        server_args: vec![
            "-c".to_string(),
            "test -f pages/index.html && test -f \"$PORTAL_SITE_ROOT/pages/index.html\" && exec sleep 30"
                .to_string(),
        ],
        site_root: Some(site.path().to_path_buf()),
        ..ProcessSettings::default()
    };
    let spec = LaunchSpec::from_settings(&settings, LogLevel::default()).unwrap();
    let harness = Harness::new(spec, free_port());

    // When
    let started = harness.supervisor.start().await;

    // Then
    assert!(started);
    assert_that!(harness.supervisor.status().await, eq(ServerStatus::Running));

    harness.supervisor.stop().await;
}

// =========================================================================
// Stop
// =========================================================================

#[tokio::test]
async fn given_not_running_when_stop_then_success_without_notification() {
    // Given
    let harness = Harness::new(shell_spec(LONG_RUNNING), free_port());

    // When
    let stopped = harness.supervisor.stop().await;

    // Then
    assert!(stopped);
    assert!(harness.statuses().is_empty());
    assert_that!(harness.supervisor.status().await, eq(ServerStatus::Stopped));
}

#[tokio::test]
async fn given_running_when_stop_then_stopped_notified_once() {
    // Given
    let harness = Harness::new(shell_spec(LONG_RUNNING), free_port());
    assert!(harness.supervisor.start().await);

    // When
    let stopped = harness.supervisor.stop().await;

    // Then
    assert!(stopped);
    assert_that!(harness.supervisor.status().await, eq(ServerStatus::Stopped));
    assert_that!(harness.supervisor.port().await, none());

    // The monitor must not report the same exit again
    tokio::time::sleep(fast_timings().monitor_interval * 4).await;
    assert_that!(
        harness.statuses(),
        eq(&vec![ServerStatus::Running, ServerStatus::Stopped])
    );
}

#[tokio::test]
async fn given_child_ignores_sigterm_when_stop_then_killed_after_timeout() {
    // Given
    let timings = SupervisorTimings {
        shutdown_timeout: Duration::from_millis(300),
        ..fast_timings()
    };
    let spec = shell_spec("trap '' TERM; exec sleep 30");
    let harness = Harness::with_timings(spec, free_port(), timings);
    assert!(harness.supervisor.start().await);

    // When
    let stopped = harness.supervisor.stop().await;

    // Then
    assert!(stopped);
    assert_that!(harness.supervisor.status().await, eq(ServerStatus::Stopped));
    assert_that!(harness.supervisor.last_status(), eq(ServerStatus::Stopped));
}

// =========================================================================
// Monitor
// =========================================================================

#[tokio::test]
async fn given_child_exits_on_its_own_when_monitoring_then_stopped_reported() {
    // Given
    let harness = Harness::new(shell_spec("sleep 0.5"), free_port());
    assert!(harness.supervisor.start().await);

    // When
    let reported = harness.wait_for(ServerStatus::Stopped, WAIT).await;

    // Then
    assert!(reported);
    assert_that!(harness.supervisor.status().await, eq(ServerStatus::Stopped));
    assert_that!(harness.supervisor.port().await, none());
    assert_that!(
        harness.statuses(),
        eq(&vec![ServerStatus::Running, ServerStatus::Stopped])
    );

    // Nothing left to stop
    assert!(harness.supervisor.stop().await);
    assert_that!(harness.statuses().len(), eq(2));
}

#[tokio::test]
async fn given_restart_when_old_monitor_wakes_then_only_new_generation_reports() {
    // Given
    let harness = Harness::new(shell_spec(LONG_RUNNING), free_port());
    assert!(harness.supervisor.start().await);
    assert!(harness.supervisor.stop().await);

    // When
    assert!(harness.supervisor.start().await);
    tokio::time::sleep(fast_timings().monitor_interval * 4).await;

    // Then
    assert_that!(harness.supervisor.status().await, eq(ServerStatus::Running));
    assert_that!(
        harness.statuses(),
        eq(&vec![
            ServerStatus::Running,
            ServerStatus::Stopped,
            ServerStatus::Running
        ])
    );

    harness.supervisor.stop().await;
}

#[tokio::test]
async fn given_server_error_when_status_then_error_until_stop() {
    // Given
    let harness = Harness::new(shell_spec(LONG_RUNNING), free_port());
    assert!(harness.supervisor.start().await);

    // When
    harness.supervisor.fault().await;

    // Then
    assert_that!(harness.supervisor.status().await, eq(ServerStatus::Error));
    assert_that!(harness.supervisor.last_status(), eq(ServerStatus::Error));
    assert_that!(harness.supervisor.open_browser().await, none());

    assert!(harness.supervisor.stop().await);
    assert_that!(harness.supervisor.status().await, eq(ServerStatus::Stopped));
    assert_that!(
        harness.statuses(),
        eq(&vec![
            ServerStatus::Running,
            ServerStatus::Error,
            ServerStatus::Stopped
        ])
    );
}

#[tokio::test]
async fn given_server_error_when_start_then_relaunched() {
    // Given
    let harness = Harness::new(shell_spec(LONG_RUNNING), free_port());
    assert!(harness.supervisor.start().await);
    harness.supervisor.fault().await;

    // When
    let started = harness.supervisor.start().await;

    // Then
    assert!(started);
    assert_that!(harness.supervisor.status().await, eq(ServerStatus::Running));
    assert_that!(harness.supervisor.port().await, some(gt(0)));
    assert_that!(harness.supervisor.last_status(), eq(ServerStatus::Running));

    harness.supervisor.stop().await;
}

// =========================================================================
// Browser
// =========================================================================

#[tokio::test]
async fn given_not_running_when_open_browser_then_nothing_opened() {
    // Given
    let harness = Harness::new(shell_spec(LONG_RUNNING), free_port());

    // When
    let url = harness.supervisor.open_browser().await;

    // Then
    assert_that!(url, none());
    assert!(harness.opened_urls().is_empty());
}

#[tokio::test]
async fn given_default_index_page_when_open_browser_then_site_root_opened() {
    // Given
    let port = free_port();
    let harness = Harness::new(shell_spec(LONG_RUNNING), port);
    assert!(harness.supervisor.start().await);

    // When
    let url = harness.supervisor.open_browser().await;

    // Then
    let expected = format!("http://localhost:{port}/");
    assert_that!(url, some(eq(&expected)));
    assert_that!(harness.opened_urls(), eq(&vec![expected]));

    harness.supervisor.stop().await;
}

#[tokio::test]
async fn given_other_default_page_when_open_browser_then_page_path_appended() {
    // Given
    let port = free_port();
    let harness = Harness::new(shell_spec(LONG_RUNNING), port);
    assert!(
        harness
            .supervisor
            .config()
            .lock()
            .await
            .set_default_page("pages/plenary.html")
    );
    assert!(harness.supervisor.start().await);

    // When
    let url = harness.supervisor.open_browser().await;

    // Then
    assert_that!(
        url,
        some(eq(&format!("http://localhost:{port}/pages/plenary.html")))
    );

    harness.supervisor.stop().await;
}

#[tokio::test]
async fn given_browser_fails_when_open_browser_then_url_still_returned() {
    // Given
    let port = free_port();
    let (_temp, _path, config) = crate::tests::shared_config(port);
    let supervisor = crate::server::ProcessSupervisor::new(
        config,
        shell_spec(LONG_RUNNING),
        fast_timings(),
    )
    .with_browser(Arc::new(FailingBrowser));
    assert!(supervisor.start().await);

    // When
    let url = supervisor.open_browser().await;

    // Then
    assert_that!(url, some(eq(&format!("http://localhost:{port}/"))));

    supervisor.stop().await;
}
