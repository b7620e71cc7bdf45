//! TCP Server Tests
//!
//! Drives the real acceptor on an ephemeral port with the real client,
//! covering the framing round-trip, the state machine, and the graceful
//! drain.

#[cfg(test)]
mod tests {
    use crate::client::Client;
    use crate::pool::executor::TaskPool;
    use crate::server::service::{ServerError, TcpServer};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpStream;

    fn echo_server() -> Arc<TcpServer> {
        let mut server = TcpServer::new(TaskPool::new(2));
        server.set_task(|request| request);
        Arc::new(server)
    }

    // ============================================================
    // FRAMING ROUND-TRIP
    // ============================================================

    #[tokio::test]
    async fn request_and_response_round_trip() {
        let server = echo_server();
        let addr = server.clone().start(0).await.unwrap();

        let mut client = Client::connect("127.0.0.1", addr.port()).await.unwrap();
        let response = client.request("hello worker").await.unwrap();

        assert_eq!(response, "hello worker");
        server.stop();
    }

    #[tokio::test]
    async fn handler_output_is_wrapped_with_the_terminator() {
        let mut server = TcpServer::new(TaskPool::new(1));
        server.set_task(|request| format!("[response]\r\n{}", request));
        let server = Arc::new(server);
        let addr = server.clone().start(0).await.unwrap();

        let mut client = Client::connect("127.0.0.1", addr.port()).await.unwrap();
        let response = client.request("[echo] hello").await.unwrap();

        // The client strips the trailing \r\n\r\n the server appended.
        assert_eq!(response, "[response]\r\n[echo] hello");
        server.stop();
    }

    #[tokio::test]
    async fn connections_are_served_concurrently() {
        let server = echo_server();
        let addr = server.clone().start(0).await.unwrap();

        let requests: Vec<_> = (0..8)
            .map(|i| {
                let port = addr.port();
                tokio::spawn(async move {
                    let mut client = Client::connect("127.0.0.1", port).await.unwrap();
                    client.request(&format!("message-{}", i)).await.unwrap()
                })
            })
            .collect();

        for (i, request) in requests.into_iter().enumerate() {
            assert_eq!(request.await.unwrap(), format!("message-{}", i));
        }
        server.stop();
    }

    // ============================================================
    // STATE MACHINE
    // ============================================================

    #[tokio::test]
    async fn start_requires_a_handler() {
        let server = Arc::new(TcpServer::new(TaskPool::new(1)));

        let error = server.clone().start(0).await.unwrap_err();

        assert!(matches!(error, ServerError::HandlerNotSet));
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let server = echo_server();
        server.clone().start(0).await.unwrap();

        let error = server.clone().start(0).await.unwrap_err();

        assert!(matches!(error, ServerError::AlreadyStarted));
        server.stop();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let server = echo_server();
        server.clone().start(0).await.unwrap();

        server.stop();
        server.stop();

        tokio::time::timeout(Duration::from_secs(2), server.wait_drained())
            .await
            .expect("server should drain");
    }

    // ============================================================
    // GRACEFUL DRAIN
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_drains_the_in_flight_handler() {
        let mut server = TcpServer::new(TaskPool::new(2));
        server.set_task(|request| {
            std::thread::sleep(Duration::from_millis(300));
            format!("[response]\r\n{}", request)
        });
        let server = Arc::new(server);
        let addr = server.clone().start(0).await.unwrap();
        let port = addr.port();

        let in_flight = tokio::spawn(async move {
            let mut client = Client::connect("127.0.0.1", port).await.unwrap();
            client.request("slow request").await.unwrap()
        });

        // Let the request reach the handler, then stop mid-flight.
        tokio::time::sleep(Duration::from_millis(100)).await;
        server.stop();

        let response = in_flight.await.unwrap();
        assert_eq!(response, "[response]\r\nslow request");

        tokio::time::timeout(Duration::from_secs(2), server.wait_drained())
            .await
            .expect("drain should finish once the handler completed");

        // The acceptor is gone; nobody picks up new connections.
        assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
    }

    // ============================================================
    // FULL WORKER STACK
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn grading_commands_over_the_wire() {
        use crate::grading::answers::AnswerStore;
        use crate::grading::handlers::process_request;

        let store = Arc::new(AnswerStore::new());
        let mut server = TcpServer::new(TaskPool::new(2));
        let handler_store = store.clone();
        server.set_task(move |request| process_request(&handler_store, &request));
        let server = Arc::new(server);
        let addr = server.clone().start(0).await.unwrap();

        // One request per connection, as the protocol expects.
        let request = |body: String| {
            let port = addr.port();
            async move {
                let mut client = Client::connect("127.0.0.1", port).await.unwrap();
                client.request(&body).await.unwrap()
            }
        };

        assert_eq!(
            request("[echo] hello".to_string()).await,
            "[response]\r\nhello"
        );

        assert_eq!(
            request("[frob] x".to_string()).await,
            "[response]\r\nERROR: Invalid command: [frob]"
        );

        assert_eq!(
            request(
                "[set-answers] [{\"question_id\":1,\"answer_index\":2},{\"question_id\":2,\"answer_index\":0}]"
                    .to_string()
            )
            .await,
            "[response]\r\nAnswers set successfully"
        );
        assert_eq!(
            request(
                "[check] [{\"question_id\":1,\"answer_index\":2},{\"question_id\":2,\"answer_index\":1}]"
                    .to_string()
            )
            .await,
            "[response]\r\n{\"correct_answers\":1,\"total_questions\":2,\"answers\":[{\"question_id\":1,\"is_correct\":true},{\"question_id\":2,\"is_correct\":false}]}"
        );

        server.stop();
    }
}
