//! Runs real client runtimes against a real server on an ephemeral port.

use std::sync::{atomic::AtomicBool, Arc};
use std::time::Duration;

use chat_client::infrastructure::network::connector::TcpConnector;
use chat_client::infrastructure::network::runtime::{ClientEvent, ClientRuntime};
use chat_core::CredentialTable;
use chat_server::application::ServerState;
use chat_server::infrastructure::network::listener::serve;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// A client runtime with its "keyboard" and "screen".
struct Terminal {
    keyboard: mpsc::UnboundedSender<ClientEvent>,
    screen: mpsc::UnboundedReceiver<String>,
    task: JoinHandle<()>,
}

impl Terminal {
    fn start() -> Self {
        let (screen_tx, screen) = mpsc::unbounded_channel();
        let runtime = ClientRuntime::new(TcpConnector, screen_tx);
        let keyboard = runtime.events();
        let task = tokio::spawn(runtime.run());
        Self {
            keyboard,
            screen,
            task,
        }
    }

    fn type_line(&self, line: &str) {
        self.keyboard
            .send(ClientEvent::Input(line.to_string()))
            .expect("runtime running");
    }

    async fn next_line(&mut self) -> String {
        timeout(Duration::from_secs(2), self.screen.recv())
            .await
            .expect("output within timeout")
            .expect("runtime still printing")
    }
}

async fn start_server() -> u16 {
    let credentials = CredentialTable::from_pairs([("A", "pw"), ("B", "pw")]);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(serve(
        listener,
        ServerState::new(credentials),
        Arc::new(AtomicBool::new(true)),
    ));
    port
}

#[tokio::test]
async fn test_two_clients_chat_in_a_session() {
    let port = start_server().await;
    let mut a = Terminal::start();
    let mut b = Terminal::start();

    a.type_line(&format!("/login A pw 127.0.0.1 {port}"));
    assert_eq!(a.next_line().await, "Login successful");
    a.type_line("/createsession team");
    assert_eq!(a.next_line().await, "Current session: team");

    b.type_line(&format!("/login B pw 127.0.0.1 {port}"));
    assert_eq!(b.next_line().await, "Login successful");
    b.type_line("/joinsession team");
    assert_eq!(b.next_line().await, "Current session: team");

    a.type_line("hello");
    assert_eq!(b.next_line().await, "[A]: hello");

    // A's next output is its listing, not an echo of its own message.
    a.type_line("/list");
    assert_eq!(
        a.next_line().await,
        "Clients: A (session: team), B (session: team); Sessions: team"
    );

    a.type_line("/leavesession");
    a.type_line("/list");
    assert_eq!(
        a.next_line().await,
        "Clients: A (session: None), B (session: team); Sessions: team"
    );

    b.type_line("/leavesession");
    b.type_line("/list");
    assert_eq!(
        b.next_line().await,
        "Clients: A (session: None), B (session: None); Sessions: None"
    );

    a.type_line("/quit");
    b.type_line("/quit");
    timeout(Duration::from_secs(2), a.task).await.unwrap().unwrap();
    timeout(Duration::from_secs(2), b.task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_wrong_password_allows_retry() {
    let port = start_server().await;
    let mut a = Terminal::start();

    a.type_line(&format!("/login A nope 127.0.0.1 {port}"));
    assert_eq!(
        a.next_line().await,
        "[warning]: Invalid credentials or already logged in"
    );

    a.type_line(&format!("/login A pw 127.0.0.1 {port}"));
    assert_eq!(a.next_line().await, "Login successful");
}

#[tokio::test]
async fn test_joining_missing_session_warns() {
    let port = start_server().await;
    let mut a = Terminal::start();
    a.type_line(&format!("/login A pw 127.0.0.1 {port}"));
    a.next_line().await;

    a.type_line("/joinsession nowhere");

    assert_eq!(a.next_line().await, "[warning]: Session does not exist");
    a.type_line("hello");
    assert_eq!(a.next_line().await, "[warning]: Not in a session yet.");
}

#[tokio::test]
async fn test_login_to_closed_port_warns() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut a = Terminal::start();

    a.type_line(&format!("/login A pw 127.0.0.1 {port}"));

    assert!(a
        .next_line()
        .await
        .starts_with("[warning]: Connection failed"));
}
