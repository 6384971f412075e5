//! Sends a protobuf-encoded `Account` to the echo server.
//!
//! # Design
//! The message types are defined here independently of the server crate.
//! The integration tests post to a live server, so any schema drift between
//! the two shows up there.

use courier_core::{Client, RequestBody, RequestError};
use prost::Message;
use thiserror::Error;
use tracing::info;

#[derive(Clone, PartialEq, Message)]
pub struct Account {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(string, tag = "4")]
    pub country: String,
    #[prost(message, repeated, tag = "5")]
    pub inbox: Vec<Mail>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Mail {
    #[prost(string, tag = "1")]
    pub remote_email: String,
    #[prost(string, tag = "2")]
    pub body: String,
}

#[derive(Debug, Error)]
pub enum EchoError {
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The server answered with a non-2xx status.
    #[error("echo server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("undecodable echo: {0}")]
    Decode(#[from] prost::DecodeError),
}

pub fn sample_account() -> Account {
    Account {
        id: 526,
        name: "John Doe".to_string(),
        email: "johndoe@example.com".to_string(),
        country: "US".to_string(),
        inbox: vec![
            Mail {
                remote_email: "jannetdoe@example.com".to_string(),
                body: "Hello. Greetings. Bye.".to_string(),
            },
            Mail {
                remote_email: "WilburDoe@example.com".to_string(),
                body: "Bye, Greetings, hello.".to_string(),
            },
        ],
    }
}

/// Post `account` to the client's base URL and decode what comes back.
pub fn send_account(client: &Client, account: &Account) -> Result<Account, EchoError> {
    let response = client.post(RequestBody::protobuf(account.encode_to_vec()))?;
    if !response.is_success() {
        return Err(EchoError::Status {
            status: response.status,
            body: response.text(),
        });
    }

    let echoed = Account::decode(response.body.as_slice())?;
    info!(id = echoed.id, mails = echoed.inbox.len(), "account echoed");
    Ok(echoed)
}
