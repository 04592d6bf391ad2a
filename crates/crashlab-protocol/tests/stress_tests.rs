//! Stress tests for concurrent in-flight commands

use std::collections::HashSet;
use std::time::Duration;

use serde_json::json;
use tokio::task::JoinSet;

use crashlab_protocol::prelude::*;
use crashlab_test_helpers::prelude::*;

const IN_FLIGHT: usize = 100;

fn client_for(sim: &MockSimulator, command_timeout: Duration) -> ProtocolClient {
    ProtocolClient::new(
        ClientBuilder::new()
            .address(sim.host(), sim.port())
            .command_timeout(command_timeout)
            .build(),
    )
}

#[tokio::test]
async fn disconnect_fails_every_in_flight_command_once() -> Result<(), SimulatorError> {
    let sim = must(MockSimulator::silent().await);
    let command_timeout = Duration::from_secs(10);
    let client = client_for(&sim, command_timeout);
    client.connect().await?;

    let mut tasks = JoinSet::new();
    for i in 0..IN_FLIGHT {
        let client = client.clone();
        tasks.spawn(async move { (i, client.get_damage_data(&format!("s{i}")).await) });
    }

    must_within(Duration::from_secs(5), async {
        while sim.received_count() < IN_FLIGHT {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert_eq!(client.pending_count(), IN_FLIGHT);

    client.disconnect().await;
    assert_eq!(client.pending_count(), 0);

    let mut seen = HashSet::new();
    let collected = must_within(command_timeout, async {
        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            results.push(must(joined));
        }
        results
    })
    .await;

    for (i, result) in collected {
        assert!(seen.insert(i), "command {i} resolved twice");
        let err = must_err(result);
        assert!(
            matches!(err, SimulatorError::ConnectionLost(_)),
            "command {i} failed with {err}"
        );
    }
    assert_eq!(seen.len(), IN_FLIGHT);
    Ok(())
}

#[tokio::test]
async fn shuffled_replies_are_correlated() -> Result<(), SimulatorError> {
    let sim = must(
        MockSimulator::start(|command| {
            let index: f64 = command
                .data
                .get("session_id")
                .and_then(|v| v.as_str())
                .and_then(|s| s.strip_prefix('s'))
                .and_then(|s| s.parse().ok())
                .unwrap_or(-1.0);
            let delay_ms = (index as u64 * 7) % 23;
            MockReply::Success(json!({"position": [index, 0.0, 0.0]}))
                .after(Duration::from_millis(delay_ms))
        })
        .await,
    );
    let client = client_for(&sim, Duration::from_secs(5));
    client.connect().await?;

    let mut tasks = JoinSet::new();
    for i in 0..IN_FLIGHT {
        let client = client.clone();
        tasks.spawn(async move { (i, client.get_vehicle_state(&format!("s{i}")).await) });
    }

    let mut count = 0;
    while let Some(joined) = tasks.join_next().await {
        let (i, result) = must(joined);
        let state = result?;
        assert_approx_eq!(state.position[0], i as f64, f64::EPSILON);
        count += 1;
    }
    assert_eq!(count, IN_FLIGHT);
    assert_eq!(client.pending_count(), 0);

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn independent_timers_under_load() -> Result<(), SimulatorError> {
    let sim = must(
        MockSimulator::start(|command| {
            if command.data.get("session_id").and_then(|v| v.as_str()) == Some("slow") {
                MockReply::Silent
            } else {
                MockReply::Success(json!({"components": {}}))
                    .after(Duration::from_millis(20))
            }
        })
        .await,
    );
    let client = client_for(&sim, Duration::from_millis(300));
    client.connect().await?;

    let mut tasks = JoinSet::new();
    for i in 0..IN_FLIGHT {
        let client = client.clone();
        let session = if i % 10 == 0 { "slow".to_string() } else { format!("s{i}") };
        tasks.spawn(async move { (session.clone(), client.get_damage_data(&session).await) });
    }

    let mut timeouts = 0;
    let mut successes = 0;
    while let Some(joined) = tasks.join_next().await {
        let (session, result) = must(joined);
        match result {
            Ok(_) => successes += 1,
            Err(err) => {
                assert_eq!(session, "slow");
                assert!(err.is_retryable(), "{err}");
                timeouts += 1;
            }
        }
    }

    assert_eq!(timeouts, IN_FLIGHT / 10);
    assert_eq!(successes, IN_FLIGHT - IN_FLIGHT / 10);
    assert!(client.is_connected());
    assert_eq!(client.pending_count(), 0);

    client.disconnect().await;
    Ok(())
}
