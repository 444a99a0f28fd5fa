// Failure propagation from group requests back to individual callers

mod common;

use std::sync::Arc;

use common::{init_tracing, MockTransport};
use recordstore_adapter::prelude::*;

fn setup(max_url_length: i64) -> (Arc<MockTransport>, Coordinator<Arc<MockTransport>>) {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let config = AdapterConfig::new()
        .with_coalescing(true)
        .with_max_url_length(max_url_length);
    (transport.clone(), Coordinator::new(transport, config))
}

#[tokio::test]
async fn test_transport_error_rejects_whole_group() -> anyhow::Result<()> {
    let (transport, coordinator) = setup(2048);
    let err = AdapterError::Transport {
        url: "/testRecords".to_string(),
        message: "connection reset".to_string(),
    };
    transport.fail_with(err.clone());

    let resource = ResourceName::new("testRecord")?;
    let lookups = coordinator.find_many(&resource, ["a", "b", "c"]);

    for lookup in lookups {
        assert_eq!(lookup.await, Err(err.clone()));
    }
    assert_eq!(transport.requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failure_hits_every_group_of_the_window() -> anyhow::Result<()> {
    let (transport, coordinator) = setup(60);
    let err = AdapterError::Status {
        url: "/testRecords".to_string(),
        status: 503,
    };
    transport.fail_with(err.clone());

    let resource = ResourceName::new("testRecord")?;
    let lookups = coordinator.find_many(&resource, 1..=20);

    for lookup in lookups {
        let result = lookup.await;
        assert_eq!(result, Err(err.clone()));
        assert!(result.unwrap_err().is_group_failure());
    }
    assert!(transport.requests().len() > 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_record_fails_only_that_caller() -> anyhow::Result<()> {
    let (transport, coordinator) = setup(2048);
    transport.omit("2");

    let resource = ResourceName::new("testRecord")?;
    let mut lookups = coordinator.find_many(&resource, [1, 2, 3]).into_iter();

    let first = lookups.next().unwrap().await?;
    let second = lookups.next().unwrap().await;
    let third = lookups.next().unwrap().await?;

    assert_eq!(first.id().as_str(), "1");
    assert_eq!(third.id().as_str(), "3");
    assert_eq!(
        second,
        Err(AdapterError::MissingRecord {
            resource: "testRecord".to_string(),
            id: "2".to_string(),
        })
    );
    assert!(!second.unwrap_err().is_group_failure());
    Ok(())
}

#[tokio::test]
async fn test_fetch_all_surfaces_first_error() -> anyhow::Result<()> {
    let (transport, coordinator) = setup(2048);
    transport.omit("my-id:2");

    let resource = ResourceName::new("testRecord")?;
    let result = coordinator.fetch_all(&resource, ["my-id:1", "my-id:2"]).await;

    assert!(matches!(result, Err(AdapterError::MissingRecord { ref id, .. }) if id == "my-id:2"));
    Ok(())
}
