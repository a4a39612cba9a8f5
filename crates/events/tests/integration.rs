//! Integration tests for events

#[cfg(test)]
mod tests {
    use osup_errors::InstallError;
    use osup_events::*;

    #[tokio::test]
    async fn test_event_sender_emitter() {
        let (tx, mut rx) = channel();

        tx.emit_warning_with_context("test warning", "lost+found occupied");
        tx.emit_debug("test debug");

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(
            event1,
            AppEvent::General(GeneralEvent::Warning { context: Some(_), .. })
        ));
        assert_eq!(event1.level(), EventLevel::Warn);

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(
            event2,
            AppEvent::General(GeneralEvent::Debug { .. })
        ));
        assert_eq!(event2.log_level(), tracing::Level::DEBUG);
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    #[test]
    fn test_optional_sender_is_silent() {
        let none: Option<EventSender> = None;
        none.emit_warning("nobody listening");
        assert!(none.event_sender().is_none());
    }

    #[test]
    fn test_failure_context_from_error() {
        let err = InstallError::NotStaged {
            path: "/usr/bin/tool".into(),
        };
        let failure = FailureContext::from_error(&err);
        assert_eq!(failure.code.as_deref(), Some("install.not_staged"));
        assert!(failure.retryable);

        let event = AppEvent::Install(InstallEvent::FinalizeFailed {
            path: "/usr/bin/tool".into(),
            failure,
        });
        assert_eq!(event.event_source(), EventSource::INSTALL);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "install");
        assert_eq!(json["event"]["type"], "FinalizeFailed");
    }

    #[test]
    fn test_deficit_raises_level() {
        let ok = AppEvent::Install(InstallEvent::Completed {
            expected: 3,
            finalized: 3,
            failed: 0,
            skipped: 0,
            deficit: 0,
        });
        let short = AppEvent::Install(InstallEvent::Completed {
            expected: 3,
            finalized: 2,
            failed: 1,
            skipped: 0,
            deficit: 1,
        });
        assert_eq!(ok.level(), EventLevel::Info);
        assert_eq!(short.level(), EventLevel::Warn);
    }
}
