// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Behaviour of the in-process broker through the BrokerAdapter trait object.

use std::sync::Arc;

use courier_broker::{MemoryBroker, Settlement};
use courier_core::BrokerAdapter;
use futures::StreamExt;

#[tokio::test]
async fn subjects_are_isolated() {
    let broker = MemoryBroker::new();
    let adapter: Arc<dyn BrokerAdapter> = Arc::new(broker.clone());

    let mut group = adapter.subscribe("mailing.group").await.unwrap();
    adapter.publish("mailing.pool", b"p".to_vec()).await.unwrap();
    adapter.publish("mailing.group", b"g".to_vec()).await.unwrap();

    let msg = group.next().await.unwrap();
    assert_eq!(msg.payload, b"g");
    msg.in_progress().await.unwrap();
    msg.ack().await.unwrap();

    assert_eq!(broker.backlog_len("mailing.pool"), 1);
    assert_eq!(broker.published("mailing.pool"), vec![b"p".to_vec()]);
    assert_eq!(broker.count("mailing.group", Settlement::InProgress), 1);
    assert_eq!(broker.count("mailing.group", Settlement::Ack), 1);
}

#[tokio::test]
async fn dropped_subscription_keeps_redeliveries() {
    let broker = MemoryBroker::new();
    let mut first = broker.subscribe("s").await.unwrap();
    broker.publish("s", vec![7]).await.unwrap();
    let held = first.next().await.unwrap();
    drop(first);

    held.nak().await.unwrap();
    assert_eq!(broker.backlog_len("s"), 1);

    let mut second = broker.subscribe("s").await.unwrap();
    assert_eq!(second.next().await.unwrap().payload, vec![7]);
}
