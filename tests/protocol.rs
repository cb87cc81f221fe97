mod common;

mod tests {
    use super::common::{ACK, MockConnection};
    use lightbox::color::Rgb;
    use lightbox::error::ConnectionError;
    use lightbox::protocol::{BANNER, BINARY_COMMAND_RATE, HANDSHAKE_ATTEMPTS};
    use lightbox::{BinaryProtocol, Protocol, ProtocolKind, ProtocolSlot, TextProtocol};

    const ORANGE: Rgb = Rgb { r: 255, g: 10, b: 0 };

    #[test]
    fn test_text_encoding() {
        let text = TextProtocol;
        assert_eq!(text.encode_set_all(ORANGE), b"#255,10,0\n");
        assert_eq!(text.encode_set_single(3, Rgb::new(1, 2, 3)), b"$3,1,2,3\n");
        assert_eq!(text.encode_heartbeat(), Some(b"H\n".to_vec()));
        assert_eq!(text.acknowledgment(), Some(ACK));
        assert_eq!(text.serial_config().baud_rate, 57_600);
    }

    #[test]
    fn test_binary_encoding() {
        let binary = BinaryProtocol;
        assert_eq!(binary.encode_set_all(ORANGE), b"\x01\x03\xff\x0a\x00");
        assert_eq!(
            binary.encode_set_single(4, Rgb::new(1, 2, 3)),
            b"\x02\x04\x04\x01\x02\x03"
        );
        assert_eq!(binary.encode_heartbeat(), None);
        assert_eq!(binary.acknowledgment(), None);
        assert_eq!(binary.serial_config().baud_rate, 115_200);
    }

    #[test]
    fn test_protocol_slot_dispatch() {
        for kind in ProtocolKind::ALL {
            assert_eq!(ProtocolKind::parse_from_str(kind.as_str()), Some(kind));
            assert_eq!(kind.to_slot().kind(), kind);
            assert_eq!(kind.to_slot().name(), kind.as_str());
        }
        assert_eq!(ProtocolKind::parse_from_str("morse"), None);

        let slot = ProtocolSlot::from(ProtocolKind::Binary);
        assert_eq!(slot.encode_set_all(ORANGE), BinaryProtocol.encode_set_all(ORANGE));
        let slot = ProtocolSlot::from(ProtocolKind::Text);
        assert_eq!(slot.encode_set_all(ORANGE), TextProtocol.encode_set_all(ORANGE));
    }

    #[test]
    fn test_text_handshake() {
        let mock = MockConnection::text();
        mock.push_input(b"garbage");
        let mut conn = mock.clone();
        TextProtocol.connect_handshake(&mut conn).unwrap();
        assert_eq!(mock.frames(), vec![b"#0,0,0\n".to_vec()]);
    }

    #[test]
    fn test_text_handshake_gives_up() {
        let mock = MockConnection::silent();
        let mut conn = mock.clone();
        let result = TextProtocol.connect_handshake(&mut conn);
        match result {
            Err(ConnectionError::Handshake { device, protocol }) => {
                assert_eq!(device, "mock");
                assert_eq!(protocol, "text");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(mock.frames().len(), HANDSHAKE_ATTEMPTS);
    }

    #[test]
    fn test_binary_handshake() {
        let mock = MockConnection::binary();
        let mut conn = mock.clone();
        BinaryProtocol.connect_handshake(&mut conn).unwrap();
        assert_eq!(mock.resets(), 1);
        assert!(mock.frames().is_empty());

        let silent = MockConnection::silent().named("/dev/ttyACM0");
        let mut conn = silent.clone();
        match BinaryProtocol.connect_handshake(&mut conn) {
            Err(ConnectionError::Handshake { device, protocol }) => {
                assert_eq!(device, "/dev/ttyACM0");
                assert_eq!(protocol, "binary");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(BANNER, b"[Lightbox]");
    }

    #[test]
    fn test_verify_response() {
        let mut conn = MockConnection::silent();
        conn.push_input(b"R\r\n");
        assert!(TextProtocol.verify_response(&mut conn).is_ok());

        conn.push_input(b"E\r\n");
        match TextProtocol.verify_response(&mut conn) {
            Err(ConnectionError::Acknowledgment { expected, received }) => {
                assert_eq!(expected, ACK);
                assert_eq!(received, b"E\r\n");
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(
            TextProtocol.verify_response(&mut conn),
            Err(ConnectionError::Acknowledgment { .. })
        ));
        assert!(BinaryProtocol.verify_response(&mut conn).is_ok());
    }

    #[test]
    fn test_detect_frequency() {
        let mock = MockConnection::text().count_only();
        let mut conn = mock.clone();
        let frequency = TextProtocol.detect_frequency(&mut conn).unwrap();
        assert!(frequency > 0);
        assert_eq!(mock.written(), frequency as usize);
        assert!(mock.frames().is_empty());

        let mut conn = MockConnection::silent();
        assert_eq!(
            BinaryProtocol.detect_frequency(&mut conn).unwrap(),
            BINARY_COMMAND_RATE
        );
    }
}
