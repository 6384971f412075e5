use axum::{
    body::Bytes,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use prost::Message;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

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

pub fn app() -> Router {
    Router::new().route("/", post(echo))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(body: Bytes) -> Result<impl IntoResponse, (StatusCode, String)> {
    let account = Account::decode(body).map_err(|e| {
        warn!(error = %e, "rejected undecodable account");
        (StatusCode::BAD_REQUEST, format!("invalid account: {e}"))
    })?;

    info!(
        id = account.id,
        name = %account.name,
        email = %account.email,
        country = %account.country,
        mails = account.inbox.len(),
        "account received"
    );
    for mail in &account.inbox {
        info!(remote_email = %mail.remote_email, body = %mail.body, "mail");
    }

    Ok((
        [(header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE)],
        account.encode_to_vec(),
    ))
}
