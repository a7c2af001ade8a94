use ami_client::{AmiError, LineCodec, ManagerClient, Message};
use futures::StreamExt;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::codec::FramedRead;

/// Echo daemon: answers every request with `Response: Success` under the
/// same `ActionID`, until the client goes away.
fn spawn_echo_server(stream: DuplexStream) {
    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(stream);
        let mut lines = FramedRead::new(read, LineCodec::new());
        let mut block = String::new();
        while let Some(Ok(line)) = lines.next().await {
            if !line.is_empty() {
                block.push_str(&line);
                block.push_str("\r\n");
                continue;
            }
            if block.is_empty() {
                continue;
            }
            block.push_str("\r\n");
            let request: Message = match block.parse() {
                Ok(request) => request,
                Err(_) => return,
            };
            block.clear();

            let Some(id) = request.get("ActionID") else {
                continue;
            };
            let response = Message::new()
                .field("Response", "Success")
                .field("ActionID", id);
            if write.write_all(&response.to_bytes()).await.is_err() {
                return;
            }
        }
    });
}

fn echo_client() -> ManagerClient {
    let (client_side, server_side) = tokio::io::duplex(64 * 1024);
    spawn_echo_server(server_side);
    let client = ManagerClient::from_stream(client_side);
    client.start().unwrap();
    client
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_publish_load() {
    let client = echo_client();
    let tasks_count = 8usize;
    let requests_per_task = 25usize;

    let mut tasks = JoinSet::new();
    for task_nr in 0..tasks_count {
        let client = client.clone();
        tasks.spawn(async move {
            for i in 0..requests_per_task {
                let request = Message::new()
                    .field("ActionID", &format!("load-{task_nr}-{i}"))
                    .field("Action", "Ping");
                let response = timeout(Duration::from_secs(10), client.publish(request))
                    .await
                    .expect("publish timed out")
                    .expect("publish failed");
                assert!(response.is_success());
                assert_eq!(
                    response.get("ActionID").unwrap(),
                    format!("load-{task_nr}-{i}")
                );
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }
    assert!(client.is_connected());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_token_lets_exactly_one_register() {
    let (client_side, server_side) = tokio::io::duplex(4096);
    let client = ManagerClient::from_stream(client_side);
    client.start().unwrap();
    let (server_read, mut server_write) = tokio::io::split(server_side);
    let mut server_lines = FramedRead::new(server_read, LineCodec::new());

    let request = || {
        Message::new()
            .field("ActionID", "shared")
            .field("Action", "Ping")
    };
    let mut first = {
        let client = client.clone();
        tokio::spawn(async move { client.publish(request()).await })
    };
    let mut second = {
        let client = client.clone();
        tokio::spawn(async move { client.publish(request()).await })
    };

    // exactly one request reaches the wire
    let mut block = String::new();
    loop {
        let line = server_lines.next().await.unwrap().unwrap();
        if line.is_empty() {
            break;
        }
        block.push_str(&line);
        block.push_str("\r\n");
    }
    assert!(block.contains("ActionID: shared"));

    // the registration loser fails before any response exists; the winner
    // stays suspended, so the first task to finish must be the loser
    let first_finished_first = tokio::select! {
        result = &mut first => {
            let err = result.unwrap().unwrap_err();
            assert!(matches!(err, AmiError::DuplicateActionId(token) if token == "shared"));
            true
        }
        result = &mut second => {
            let err = result.unwrap().unwrap_err();
            assert!(matches!(err, AmiError::DuplicateActionId(token) if token == "shared"));
            false
        }
    };

    let response = Message::new()
        .field("Response", "Success")
        .field("ActionID", "shared");
    server_write.write_all(&response.to_bytes()).await.unwrap();

    let winner = if first_finished_first { second } else { first };
    let resolved = timeout(Duration::from_secs(5), winner)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(resolved.is_success());

    // the token is free again after resolution
    let reused = {
        let client = client.clone();
        tokio::spawn(async move { client.publish(request()).await })
    };
    let mut block = String::new();
    loop {
        let line = server_lines.next().await.unwrap().unwrap();
        if line.is_empty() {
            break;
        }
        block.push_str(&line);
        block.push_str("\r\n");
    }
    assert!(block.contains("ActionID: shared"));
    server_write
        .write_all(
            &Message::new()
                .field("Response", "Success")
                .field("ActionID", "shared")
                .to_bytes(),
        )
        .await
        .unwrap();
    let resolved = timeout(Duration::from_secs(5), reused)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(resolved.is_success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_stop_races_safely() {
    let (client_side, _server_side) = tokio::io::duplex(16 * 1024);
    let client = ManagerClient::from_stream(client_side);
    client.start().unwrap();

    let mut publishers = JoinSet::new();
    for i in 0..16 {
        let client = client.clone();
        publishers.spawn(async move {
            client
                .publish(
                    Message::new()
                        .field("ActionID", &format!("racing-{i}"))
                        .field("Action", "Ping"),
                )
                .await
        });
    }

    let mut stoppers = JoinSet::new();
    for _ in 0..8 {
        let client = client.clone();
        stoppers.spawn(async move { client.stop().await });
    }
    while let Some(res) = stoppers.join_next().await {
        res.unwrap();
    }

    // every publish resolves one way or the other; none may hang
    while let Some(res) = timeout(Duration::from_secs(5), publishers.join_next())
        .await
        .expect("publisher failed to resolve")
    {
        match res.unwrap() {
            Ok(response) => assert!(response.is_success()),
            Err(
                AmiError::NotConnected | AmiError::ConnectionClosed | AmiError::ConnectionReset(_),
            ) => {}
            Err(other) => panic!("unexpected publish outcome: {other:?}"),
        }
    }
    assert!(!client.is_connected());
}
