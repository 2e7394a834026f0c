use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_json::Value;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{timeout, Instant};

const BASE_TS: u64 = 1_519_833_600_000;

/// Runs the binary against a broker on localhost:1883 and checks what a
/// subscriber receives: 2 clients over a 2-step window is 4 readings.
#[tokio::test]
#[ignore]
async fn test_replay_reaches_subscriber() {
    let topic = format!("sensor-mock-test/{}", std::process::id());

    let mut mqtt_options = MqttOptions::new("sensor-mock-test-sub", "localhost", 1883);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);
    client.subscribe(&topic, QoS::AtMostOnce).await.unwrap();

    // Wait for the subscription before starting publishers.
    timeout(Duration::from_secs(5), async {
        loop {
            if let Event::Incoming(Packet::SubAck(_)) = eventloop.poll().await.unwrap() {
                break;
            }
        }
    })
    .await
    .expect("no SUBACK from broker");

    let mut simulator = Command::new(env!("CARGO_BIN_EXE_sensor-mock"))
        .args([
            "--clients",
            "2",
            "--window-secs",
            "5",
            "--step-ms",
            "5000",
            "--await-ms",
            "0",
            "--client-prefix",
            "sensor_mock_test_",
            "--topic",
            topic.as_str(),
            "--seed",
            "1",
        ])
        .spawn()
        .unwrap();

    let mut readings = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(15);

    while readings.len() < 4 && Instant::now() < deadline {
        if let Ok(Ok(Event::Incoming(Packet::Publish(publish)))) =
            timeout(Duration::from_secs(1), eventloop.poll()).await
        {
            let reading: Value = serde_json::from_slice(&publish.payload).unwrap();
            readings.push(reading);
        }
    }

    let status = simulator.wait().await.unwrap();
    assert!(status.success(), "simulator exited with {}", status);
    assert_eq!(readings.len(), 4, "received {:?}", readings);

    let mut ts: Vec<u64> = readings.iter().map(|r| r["ts"].as_u64().unwrap()).collect();
    ts.sort_unstable();
    assert_eq!(ts, vec![BASE_TS, BASE_TS + 1, BASE_TS + 2, BASE_TS + 3]);

    for reading in &readings {
        assert_eq!(reading["name"], "D01");
        let id = reading["id"].as_str().unwrap();
        assert!(id == "sensor_mock_test_0" || id == "sensor_mock_test_1");
        let temperature = reading["temperature"].as_f64().unwrap();
        assert!((22.0..=100.0).contains(&temperature));
        let voltage = reading["voltage"].as_f64().unwrap();
        assert!((12.0..=86.0).contains(&voltage));
        assert!(reading["devid"].as_u64().unwrap() <= 20);
    }
}
