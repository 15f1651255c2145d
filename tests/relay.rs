use std::time::Duration;

use localmail::{EmailMessage, RelayConfig, RelayServer, Session, TcpConnector};
use tokio::sync::mpsc;
use tokio::time::timeout;

#[tokio::test]
async fn relay_receives_from_session() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let relay = RelayServer::new(tx)
        .with_address(([127, 0, 0, 1], 0).into())
        .with_config(RelayConfig::default().name("relay.local"))
        .bind()
        .await
        .unwrap();
    let addr = relay.local_addr().unwrap();
    tokio::spawn(relay.serve());

    let message = EmailMessage::build("a@x.com", "b@y.com", "Hi", ".Hello\nthere");
    let mut out = Vec::new();
    let outcome = Session::with_connector(TcpConnector::new(addr.to_string()))
        .send_message(&message, &mut out)
        .await
        .unwrap();

    assert!(outcome.is_sent());
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "starting send\nEmail sent successfully!\n"
    );

    let mail = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mail.from, "a@x.com");
    assert_eq!(mail.to, vec!["b@y.com".to_string()]);
    assert_eq!(mail.body, message.formatted());
}

#[tokio::test]
async fn relay_refuses_oversized_message() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let relay = RelayServer::new(tx)
        .with_address(([127, 0, 0, 1], 0).into())
        .with_config(RelayConfig::default().max_size(32))
        .bind()
        .await
        .unwrap();
    let addr = relay.local_addr().unwrap();
    tokio::spawn(relay.serve());

    let mut out = Vec::new();
    let outcome = Session::with_connector(TcpConnector::new(addr.to_string()))
        .send(
            "a@x.com",
            "b@y.com",
            "Subject: Hi\nFrom: a@x.com\nTo: b@y.com\n\nHello there",
            &mut out,
        )
        .await
        .unwrap();

    // The advertised SIZE stops the client before MAIL
    assert!(matches!(outcome.error(), Some(localmail::Error::Client(_))));
    assert!(String::from_utf8(out)
        .unwrap()
        .ends_with("Failed to send email: client: message is larger than the relay accepts\n"));
    assert!(rx.try_recv().is_err());
}
