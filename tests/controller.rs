mod common;

mod tests {
    use std::time::{Duration as StdDuration, Instant as StdInstant};

    use embassy_time::Duration;
    use lightbox::color::Rgb;
    use lightbox::error::{ConnectionError, Error, ValidationError};
    use lightbox::{
        Action, CommandOptions, CommandRequest, Controller, ControllerConfig, GammaConfig,
        HeartbeatConfig, ProtocolKind,
    };
    use lightbox::protocol::HANDSHAKE_ATTEMPTS;

    use super::common::{MockConnection, init_logging};

    const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
    const WAIT: StdDuration = StdDuration::from_secs(2);

    fn config(outputs: usize) -> ControllerConfig {
        ControllerConfig::default()
            .with_outputs(outputs)
            .with_frequency(100)
    }

    fn text_controller(outputs: usize) -> (MockConnection, Controller) {
        init_logging();
        let mock = MockConnection::text();
        let controller =
            Controller::open(mock.boxed(), ProtocolKind::Text.to_slot(), config(outputs)).unwrap();
        (mock, controller)
    }

    fn output_id(controller: &Controller, next: bool) -> usize {
        let output = if next {
            controller.next_output()
        } else {
            controller.random_output()
        };
        output.unwrap().lock().id()
    }

    #[test]
    fn test_period_follows_output_count() {
        let (_mock, controller) = text_controller(5);
        assert_eq!(controller.period(), Duration::from_millis(50));

        assert_eq!(controller.add().unwrap(), 5);
        assert_eq!(controller.output_count(), 6);
        assert_eq!(controller.period(), Duration::from_millis(60));

        let info = controller.info();
        assert_eq!(info.command_rate.controller, 100);
        assert_eq!(info.command_rate.per_output, 100.0 / 6.0);
        assert!((info.period - 0.06).abs() < 1e-9);
        assert_eq!(info.outputs, 6);
    }

    #[test]
    fn test_info_serializes() {
        let (_mock, controller) = text_controller(2);
        let json = serde_json::to_value(controller.info()).unwrap();
        assert_eq!(json["controller"], "text");
        assert_eq!(json["device"], "mock");
        assert_eq!(json["commandRate"]["controller"], 100);
        assert_eq!(json["commandRate"]["perOutput"], 50.0);
        assert_eq!(json["blenders"].as_array().unwrap().len(), 5);
        assert_eq!(json["actions"][2], "Blink");
        assert_eq!(json["envelopes"][0], "Cosine");

        let outputs = serde_json::to_value(controller.outputs_info()).unwrap();
        assert_eq!(outputs.as_array().unwrap().len(), 2);
        assert_eq!(outputs[1]["outputNumber"], 1);
        assert_eq!(outputs[1]["layers"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_set_all_and_single() {
        let (mock, controller) = text_controller(1);
        mock.clear_frames();
        controller.set_all(Rgb::new(255, 10, 0)).unwrap();
        controller.set_single(0, Rgb::new(1, 2, 3)).unwrap();
        assert!(mock.has_frame(b"#255,10,0\n"));
        assert!(mock.has_frame(b"$0,1,2,3\n"));
        assert!(matches!(
            controller.set_single(300, RED),
            Err(Error::Validation(ValidationError::OutputOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_command_reports_failures() {
        let (mock, controller) = text_controller(1);
        mock.set_fail_writes(true);
        assert!(matches!(
            controller.set_all(RED),
            Err(Error::Connection(ConnectionError::Io(_)))
        ));
        mock.set_fail_writes(false);

        let silent = MockConnection::silent();
        let controller =
            Controller::with_connection(silent.boxed(), ProtocolKind::Text.to_slot(), config(1))
                .unwrap();
        assert!(matches!(
            controller.command(b"#0,0,0\n", true),
            Err(Error::Connection(ConnectionError::Acknowledgment { .. }))
        ));
        assert!(controller.command(b"#0,0,0\n", false).is_ok());
    }

    #[test]
    fn test_ticker_writes_changed_output() {
        let (mock, controller) = text_controller(2);
        controller
            .output(1)
            .unwrap()
            .lock()
            .constant(&CommandOptions::color(RED))
            .unwrap();
        assert!(mock.wait_for_frame(b"$1,255,0,0\n", WAIT));
        assert!(!mock.has_frame(b"$0,255,0,0\n"));
    }

    #[test]
    fn test_ticker_retries_failed_write() {
        let (mock, controller) = text_controller(1);
        mock.set_fail_writes(true);
        controller
            .apply(&CommandRequest {
                color: Some(lightbox::ColorValue::Hex("#ff0000".to_owned())),
                action: Some("Constant".to_owned()),
                ..CommandRequest::default()
            }
            .parse()
            .unwrap())
            .unwrap();
        std::thread::sleep(StdDuration::from_millis(100));
        assert!(!mock.has_frame(b"$0,255,0,0\n"));

        mock.set_fail_writes(false);
        assert!(mock.wait_for_frame(b"$0,255,0,0\n", WAIT));
    }

    #[test]
    fn test_gamma_applies_to_ticker_writes() {
        let (mock, controller) = text_controller(1);
        controller
            .set_gamma(GammaConfig {
                gamma: 1.0,
                in_bits: 8,
                out_bits: 7,
            })
            .unwrap();
        assert_eq!(controller.gamma().out_bits, 7);
        controller
            .output(0)
            .unwrap()
            .lock()
            .apply(Action::Constant, &CommandOptions::color(RED))
            .unwrap();
        assert!(mock.wait_for_frame(b"$0,127,0,0\n", WAIT));
        assert!(controller
            .set_gamma(GammaConfig {
                gamma: 0.0,
                ..GammaConfig::LINEAR
            })
            .is_err());
    }

    #[test]
    fn test_heartbeat() {
        let mock = MockConnection::text();
        let config = config(1).with_heartbeat(HeartbeatConfig {
            delay: Duration::from_millis(20),
            fail_delay: Duration::from_millis(10),
        });
        let controller =
            Controller::open(mock.boxed(), ProtocolKind::Text.to_slot(), config).unwrap();
        assert!(mock.wait_for_frame(b"H\n", WAIT));
        controller.shutdown();

        mock.clear_frames();
        std::thread::sleep(StdDuration::from_millis(100));
        assert!(mock.frames().is_empty());
    }

    #[test]
    fn test_heartbeat_retries_after_failure() {
        let mock = MockConnection::text();
        let config = config(1).with_heartbeat(HeartbeatConfig {
            delay: Duration::from_secs(1),
            fail_delay: Duration::from_millis(10),
        });
        let _controller =
            Controller::with_connection(mock.boxed(), ProtocolKind::Text.to_slot(), config)
                .unwrap();
        mock.set_fail_writes(true);

        // failed beats come back every fail_delay, well before the next delay
        let deadline = StdInstant::now() + StdDuration::from_millis(1800);
        while mock.failed_writes() < 5 && StdInstant::now() < deadline {
            std::thread::sleep(StdDuration::from_millis(5));
        }
        assert!(mock.failed_writes() >= 5);

        mock.set_fail_writes(false);
        assert!(mock.wait_for_frame(b"H\n", WAIT));

        // back to the normal pace
        mock.clear_frames();
        std::thread::sleep(StdDuration::from_millis(300));
        assert!(!mock.has_frame(b"H\n"));
    }

    #[test]
    fn test_remove_writes_black() {
        let (mock, controller) = text_controller(3);
        controller
            .output(2)
            .unwrap()
            .lock()
            .constant(&CommandOptions::color(RED))
            .unwrap();
        assert!(mock.wait_for_frame(b"$2,255,0,0\n", WAIT));

        controller.remove().unwrap();
        assert_eq!(controller.output_count(), 2);
        assert!(mock.has_frame(b"$2,0,0,0\n"));
        assert_eq!(controller.period(), Duration::from_millis(20));

        // The removed output was the last selected one
        assert_eq!(output_id(&controller, true), 0);
    }

    #[test]
    fn test_remove_all_outputs() {
        let (_mock, controller) = text_controller(1);
        controller.remove().unwrap();
        assert!(matches!(
            controller.remove(),
            Err(Error::Validation(ValidationError::NoOutputs))
        ));
        assert!(controller.next_output().is_err());
        assert!(controller.random_output().is_err());
    }

    #[test]
    fn test_next_output_cycles() {
        let (_mock, controller) = text_controller(3);
        let ids: Vec<usize> = (0..4).map(|_| output_id(&controller, true)).collect();
        assert_eq!(ids, vec![0, 1, 2, 0]);

        controller.output(1).unwrap();
        assert_eq!(output_id(&controller, true), 2);
        assert!(matches!(
            controller.output(3),
            Err(Error::Validation(ValidationError::OutputOutOfRange { index: 3, count: 3 }))
        ));
    }

    #[test]
    fn test_random_output_avoids_last() {
        let (_mock, controller) = text_controller(3);
        let mut previous = output_id(&controller, false);
        for _ in 0..100 {
            let current = output_id(&controller, false);
            assert_ne!(current, previous);
            previous = current;
        }

        let (_mock, single) = text_controller(1);
        assert_eq!(output_id(&single, false), 0);
        assert_eq!(output_id(&single, false), 0);
    }

    #[test]
    fn test_binary_controller() {
        let mock = MockConnection::binary();
        let controller = Controller::open(
            mock.boxed(),
            ProtocolKind::Binary.to_slot(),
            ControllerConfig::default().with_outputs(2),
        )
        .unwrap();
        assert_eq!(controller.frequency(), 200);
        assert_eq!(controller.period(), Duration::from_millis(10));

        controller.set_all(Rgb::new(255, 10, 0)).unwrap();
        assert!(mock.has_frame(b"\x01\x03\xff\x0a\x00"));

        controller
            .output(1)
            .unwrap()
            .lock()
            .constant(&CommandOptions::color(RED))
            .unwrap();
        assert!(mock.wait_for_frame(b"\x02\x04\x01\xff\x00\x00", WAIT));
        assert!(!mock.has_frame(b"H\n"));
    }

    #[test]
    fn test_connect_first_without_devices() {
        let result = Controller::connect_first(
            &["/nonexistent/lightbox0", "/nonexistent/lightbox1"],
            ProtocolKind::Text,
            config(1),
        );
        assert!(matches!(
            result,
            Err(Error::Connection(ConnectionError::NoDevice))
        ));
    }

    #[test]
    fn test_connect_first_takes_first_answering_device() {
        let silent = MockConnection::silent().named("/dev/ttyUSB1");
        let device = MockConnection::text().named("/dev/ttyUSB2");
        let spare = MockConnection::text().named("/dev/ttyUSB3");
        let mut opened = Vec::new();

        let controller = Controller::connect_first_with(
            &["/dev/ttyUSB0", "/dev/ttyUSB1", "/dev/ttyUSB2", "/dev/ttyUSB3"],
            ProtocolKind::Text,
            config(1),
            |name, serial| {
                assert_eq!(serial.baud_rate, 57_600);
                opened.push(name.to_owned());
                match name {
                    "/dev/ttyUSB1" => Ok(silent.boxed()),
                    "/dev/ttyUSB2" => Ok(device.boxed()),
                    "/dev/ttyUSB3" => Ok(spare.boxed()),
                    _ => Err(ConnectionError::Open {
                        device: name.to_owned(),
                        reason: "no such device".to_owned(),
                    }
                    .into()),
                }
            },
        )
        .unwrap();

        assert_eq!(controller.device(), "/dev/ttyUSB2");
        assert_eq!(opened, ["/dev/ttyUSB0", "/dev/ttyUSB1", "/dev/ttyUSB2"]);
        let blackouts = silent.frames();
        assert_eq!(blackouts.len(), HANDSHAKE_ATTEMPTS);
        assert!(blackouts.iter().all(|frame| frame == b"#0,0,0\n"));
        assert!(device.has_frame(b"#0,0,0\n"));
        assert!(spare.frames().is_empty());
    }

    #[test]
    fn test_connect_first_stops_on_other_errors() {
        let mut opened = 0;
        let result = Controller::connect_first_with(
            &["/dev/ttyUSB0", "/dev/ttyUSB1"],
            ProtocolKind::Text,
            config(1),
            |_, _| {
                opened += 1;
                Err(ValidationError::OutputLimit(0).into())
            },
        );
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::OutputLimit(0)))
        ));
        assert_eq!(opened, 1);
    }

    #[test]
    fn test_too_many_outputs() {
        let mock = MockConnection::text();
        let result =
            Controller::with_connection(mock.boxed(), ProtocolKind::Text.to_slot(), config(1000));
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::OutputLimit(_)))
        ));
    }
}
