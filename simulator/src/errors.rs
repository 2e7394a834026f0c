use rumqttc::ConnectReturnCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("client {client_id} failed to connect: {source}")]
    Connect {
        client_id: String,
        #[source]
        source: rumqttc::ConnectionError,
    },

    #[error("client {client_id} refused by broker: {code:?}")]
    Refused {
        client_id: String,
        code: ConnectReturnCode,
    },

    #[error("MQTT publish error: {0}")]
    Publish(#[from] rumqttc::ClientError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
