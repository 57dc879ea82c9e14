//! Tagged transport events and pure MQTT event routing
//!
//! The background loop consumes `TransportEvent` values instead of reacting to
//! transport-library callbacks, so state transitions stay on the owning task.

use rumqttc::v5::Event;

/// Events the connection loop reacts to
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Broker acknowledged the connection - ready to publish/subscribe
    ConnAck,
    /// Message received on a subscribed topic
    Message {
        topic: String,
        payload: Vec<u8>,
        retain: bool,
    },
    /// Subscription confirmed with per-topic return codes
    SubAck { return_codes: Vec<u8> },
    /// Broker closed the connection
    Disconnected,
    /// Anything else (ping responses, outgoing acks, ...)
    Other(String),
}

/// Map a raw MQTT event to a transport event (pure function)
pub fn route_event(event: &Event) -> TransportEvent {
    match event {
        Event::Incoming(incoming) => {
            use rumqttc::v5::mqttbytes::v5::Packet;
            match incoming {
                Packet::ConnAck(_) => TransportEvent::ConnAck,
                Packet::Publish(publish) => TransportEvent::Message {
                    topic: String::from_utf8_lossy(&publish.topic).to_string(),
                    payload: publish.payload.to_vec(),
                    retain: publish.retain,
                },
                Packet::Disconnect(_) => TransportEvent::Disconnected,
                Packet::SubAck(suback) => TransportEvent::SubAck {
                    return_codes: suback.return_codes.iter().map(suback_code).collect(),
                },
                other => TransportEvent::Other(format!("{other:?}")),
            }
        }
        Event::Outgoing(outgoing) => TransportEvent::Other(format!("outgoing {outgoing:?}")),
    }
}

/// Numeric protocol value of a SubAck reason code. Granted subscriptions map
/// to their QoS level, rejections to the 0x80+ range.
fn suback_code(code: &rumqttc::v5::mqttbytes::v5::SubscribeReasonCode) -> u8 {
    use rumqttc::v5::mqttbytes::{v5::SubscribeReasonCode, QoS};
    match code {
        SubscribeReasonCode::Success(QoS::AtMostOnce) => 0x00,
        SubscribeReasonCode::Success(QoS::AtLeastOnce) => 0x01,
        SubscribeReasonCode::Success(QoS::ExactlyOnce) => 0x02,
        SubscribeReasonCode::Failure => 0x80,
        SubscribeReasonCode::Unspecified => 0x80,
        SubscribeReasonCode::ImplementationSpecific => 0x83,
        SubscribeReasonCode::NotAuthorized => 0x87,
        SubscribeReasonCode::TopicFilterInvalid => 0x8f,
        SubscribeReasonCode::PkidInUse => 0x91,
        SubscribeReasonCode::QuotaExceeded => 0x97,
        SubscribeReasonCode::SharedSubscriptionsNotSupported => 0x9e,
        SubscribeReasonCode::SubscriptionIdNotSupported => 0xa1,
        SubscribeReasonCode::WildcardSubscriptionsNotSupported => 0xa2,
    }
}

/// Validate subscription success from SubAck return codes (pure function)
pub fn validate_subscription_success(return_codes: &[u8]) -> Result<(), String> {
    if return_codes.iter().any(|&code| code >= 0x80) {
        Err(format!(
            "Subscription failed with return codes: {return_codes:?}"
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use rumqttc::v5::mqttbytes::v5::{ConnAck, ConnectReturnCode, Disconnect, Packet, Publish};
    use rumqttc::v5::mqttbytes::QoS;

    #[test]
    fn test_route_connack() {
        let connack = Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
            properties: None,
        }));
        assert!(matches!(route_event(&connack), TransportEvent::ConnAck));
    }

    #[test]
    fn test_route_disconnect() {
        let disconnect = Event::Incoming(Packet::Disconnect(Disconnect {
            reason_code: rumqttc::v5::mqttbytes::v5::DisconnectReasonCode::NormalDisconnection,
            properties: None,
        }));
        assert!(matches!(
            route_event(&disconnect),
            TransportEvent::Disconnected
        ));
    }

    #[test]
    fn test_route_publish() {
        let publish = Event::Incoming(Packet::Publish(Publish {
            dup: false,
            qos: QoS::AtLeastOnce,
            retain: false,
            topic: Bytes::from("edge/commands"),
            pkid: 1,
            payload: Bytes::from("restart"),
            properties: None,
        }));

        if let TransportEvent::Message {
            topic,
            payload,
            retain,
        } = route_event(&publish)
        {
            assert_eq!(topic, "edge/commands");
            assert_eq!(payload, b"restart");
            assert!(!retain);
        } else {
            panic!("Expected Message event");
        }
    }

    #[test]
    fn test_route_suback_preserves_reason_codes() {
        use rumqttc::v5::mqttbytes::v5::{SubAck, SubscribeReasonCode};

        let suback = Event::Incoming(Packet::SubAck(SubAck {
            pkid: 1,
            return_codes: vec![
                SubscribeReasonCode::Success(QoS::AtLeastOnce),
                SubscribeReasonCode::Success(QoS::AtMostOnce),
                SubscribeReasonCode::NotAuthorized,
            ],
            properties: None,
        }));

        if let TransportEvent::SubAck { return_codes } = route_event(&suback) {
            assert_eq!(return_codes, vec![0x01, 0x00, 0x87]);
        } else {
            panic!("Expected SubAck event");
        }
    }

    #[test]
    fn test_route_suback_rejection_fails_validation() {
        use rumqttc::v5::mqttbytes::v5::{SubAck, SubscribeReasonCode};

        let suback = Event::Incoming(Packet::SubAck(SubAck {
            pkid: 2,
            return_codes: vec![SubscribeReasonCode::Unspecified],
            properties: None,
        }));

        if let TransportEvent::SubAck { return_codes } = route_event(&suback) {
            assert!(validate_subscription_success(&return_codes).is_err());
        } else {
            panic!("Expected SubAck event");
        }
    }

    #[test]
    fn test_validate_subscription_success() {
        // Success codes (< 0x80)
        assert!(validate_subscription_success(&[0x00, 0x01, 0x02]).is_ok());

        // Failure codes (>= 0x80)
        assert!(validate_subscription_success(&[0x80, 0x81]).is_err());

        // Mixed codes - should fail
        assert!(validate_subscription_success(&[0x00, 0x80]).is_err());
    }
}
