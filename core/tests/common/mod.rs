use std::net::SocketAddr;

use echo_server::{Account, Mail};

/// Start the echo server on a random loopback port on its own runtime thread.
pub fn spawn_echo_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            echo_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

pub fn sample_account() -> Account {
    Account {
        id: 526,
        name: "John Doe".to_string(),
        email: "johndoe@example.com".to_string(),
        country: "US".to_string(),
        inbox: vec![Mail {
            remote_email: "jannetdoe@example.com".to_string(),
            body: "Hello. Greetings. Bye.".to_string(),
        }],
    }
}
