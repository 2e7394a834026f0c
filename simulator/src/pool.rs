use crate::config::Config;
use crate::errors::{Error, Result};
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, QoS,
};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const REQUEST_CAPACITY: usize = 64;
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected client that can send readings.
pub trait Publisher {
    fn client_id(&self) -> &str;

    /// Queues a publish without waiting for the broker.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
}

/// Opens one connection and resolves once the broker has accepted it.
pub trait Connector {
    type Client: Publisher;

    fn connect(&self, client_id: String) -> impl Future<Output = Result<Self::Client>>;
}

pub fn client_id(prefix: &str, index: usize) -> String {
    format!("{}{}", prefix, index)
}

/// Connected clients, in creation order.
pub struct ClientPool<C> {
    clients: Vec<C>,
}

impl<C: Publisher> ClientPool<C> {
    /// Connects `count` clients one after another. The first failure aborts
    /// the whole pool.
    pub async fn connect<K>(connector: &K, count: usize, prefix: &str) -> Result<Self>
    where
        K: Connector<Client = C>,
    {
        let mut clients = Vec::with_capacity(count);

        for index in 0..count {
            let client = connector.connect(client_id(prefix, index)).await?;
            info!("client {} connected", client.client_id());
            clients.push(client);
        }

        Ok(Self { clients })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.clients.iter()
    }
}

impl ClientPool<MqttClient> {
    /// Sends DISCONNECT on every client, then gives all drivers one shared
    /// deadline to flush. Drivers still running after it are aborted.
    pub async fn close(self) {
        let mut drivers = Vec::with_capacity(self.clients.len());

        for client in self.clients {
            match client.client.try_disconnect() {
                Ok(()) => drivers.push(client.driver),
                Err(e) => {
                    warn!("client {} disconnect failed: {}", client.id, e);
                    client.driver.abort();
                }
            }
        }

        let deadline = Instant::now() + CLOSE_TIMEOUT;
        let mut stalled = 0usize;

        for mut driver in drivers {
            if tokio::time::timeout_at(deadline, &mut driver).await.is_err() {
                driver.abort();
                stalled += 1;
            }
        }

        if stalled > 0 {
            warn!(
                "{} clients did not disconnect within {:?}",
                stalled, CLOSE_TIMEOUT
            );
        }
    }
}

pub struct MqttConnector {
    host: String,
    port: u16,
    keep_alive: Duration,
    qos: QoS,
}

impl MqttConnector {
    pub fn new(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            keep_alive: config.keep_alive(),
            qos: config.qos(),
        }
    }
}

impl Connector for MqttConnector {
    type Client = MqttClient;

    async fn connect(&self, client_id: String) -> Result<MqttClient> {
        debug!("Connecting {} to {}:{}", client_id, self.host, self.port);

        let mut mqtt_options = MqttOptions::new(client_id.clone(), self.host.clone(), self.port);
        mqtt_options.set_keep_alive(self.keep_alive);
        mqtt_options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                    if connack.code == ConnectReturnCode::Success {
                        break;
                    }
                    return Err(Error::Refused {
                        client_id,
                        code: connack.code,
                    });
                }
                Ok(_) => {}
                Err(ConnectionError::ConnectionRefused(code)) => {
                    return Err(Error::Refused { client_id, code });
                }
                Err(source) => return Err(Error::Connect { client_id, source }),
            }
        }

        let driver = tokio::spawn(drive(client_id.clone(), eventloop));

        Ok(MqttClient {
            id: client_id,
            client,
            qos: self.qos,
            driver,
        })
    }
}

/// Keeps polling a connected event loop so queued publishes reach the
/// broker. Stops once the client's disconnect has gone out.
async fn drive(client_id: String, mut eventloop: EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("client {} disconnected", client_id);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("client {} reconnect: {}", client_id, e);
                tokio::time::sleep(RECONNECT_PAUSE).await;
            }
        }
    }
}

pub struct MqttClient {
    id: String,
    client: AsyncClient,
    qos: QoS,
    driver: JoinHandle<()>,
}

impl Publisher for MqttClient {
    fn client_id(&self) -> &str {
        &self.id
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client.try_publish(topic, self.qos, false, payload)?;
        Ok(())
    }
}
