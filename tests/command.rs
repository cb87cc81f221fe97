mod tests {
    use lightbox::color::Rgb;
    use lightbox::error::ValidationError;
    use lightbox::{Action, Blender, CommandOptions, CommandRequest, Envelope};

    fn parse(json: &str) -> Result<lightbox::Command, ValidationError> {
        serde_json::from_str::<CommandRequest>(json).unwrap().parse()
    }

    #[test]
    fn test_action_names() {
        for action in Action::ALL {
            assert_eq!(Action::parse_from_str(action.as_str()), Some(action));
        }
        assert_eq!(Action::parse_from_str("CONSTANT"), Some(Action::Constant));
        assert_eq!(Action::parse_from_str("blink"), Some(Action::Blink));
        assert_eq!(Action::parse_from_str("Strobe"), None);
    }

    #[test]
    fn test_parse_full_request() {
        let command = parse(
            r##"{
                "output": 1,
                "action": "blink",
                "layer": 2,
                "color": "#f00",
                "opacity": 0.5,
                "steps": 5,
                "blender": "Darken",
                "envelope": "Linear",
                "count": 2,
                "queue": false
            }"##,
        )
        .unwrap();
        assert_eq!(command.output, 1);
        assert_eq!(command.action, Action::Blink);
        assert_eq!(
            command.options,
            CommandOptions::color(Rgb::new(255, 0, 0))
                .with_layer(2)
                .with_opacity(0.5)
                .with_steps(5)
                .with_blender(Blender::Darken)
                .with_envelope(Envelope::Linear)
                .with_count(2)
                .with_queue(false)
        );
    }

    #[test]
    fn test_parse_defaults() {
        let command = parse(r#"{"color": [1, 2, 3]}"#).unwrap();
        assert_eq!(command.output, 0);
        assert_eq!(command.action, Action::Fade);
        assert_eq!(command.options, CommandOptions::color(Rgb::new(1, 2, 3)));
        assert_eq!(command.options.steps, 1);
        assert_eq!(command.options.count, 1);
        assert!(command.options.queue);
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        assert_eq!(
            parse(r#"{"blender": "Multiply"}"#),
            Err(ValidationError::UnknownBlender("Multiply".to_owned()))
        );
        assert_eq!(
            parse(r#"{"envelope": "Bounce"}"#),
            Err(ValidationError::UnknownEnvelope("Bounce".to_owned()))
        );
        assert_eq!(
            parse(r#"{"action": "Strobe"}"#),
            Err(ValidationError::UnknownAction("Strobe".to_owned()))
        );
        assert_eq!(
            parse(r#"{"steps": 0}"#),
            Err(ValidationError::InvalidSteps(0))
        );
        assert_eq!(
            parse(r#"{"count": -1}"#),
            Err(ValidationError::InvalidCount(-1))
        );
        assert_eq!(
            parse(r#"{"opacity": 1.5}"#),
            Err(ValidationError::OpacityOutOfRange(1.5))
        );
        assert_eq!(
            parse(r##"{"color": "#12345"}"##),
            Err(ValidationError::InvalidHexColor("#12345".to_owned()))
        );
    }

    #[test]
    fn test_options_build_transition() {
        let transition = CommandOptions::color(Rgb::new(0, 0, 255))
            .with_opacity(0.25)
            .with_envelope(Envelope::Linear)
            .with_queue(false)
            .transition(7)
            .unwrap();
        assert_eq!(transition.color(), Some(Rgb::new(0, 0, 255)));
        assert_eq!(transition.opacity(), Some(0.25));
        assert_eq!(transition.steps(), 7);
        assert_eq!(transition.envelope(), Some(Envelope::Linear));
        assert_eq!(transition.blender(), None);
        assert!(!transition.is_queued());
        assert!(!transition.is_reverse());
    }
}
