use osup_events::EventSender;

/// Installation context
#[derive(Clone, Debug)]
pub struct InstallContext {
    /// Number of files the caller's diff expects to change; defaults to the
    /// length of the list handed to the installer
    pub expected_updates: Option<usize>,
    /// Fail instead of recreating missing target directories
    pub no_autofix: bool,

    /// Event sender for progress reporting
    pub event_sender: Option<EventSender>,
}

context_builder! {
    InstallContext {
        expected_updates: Option<usize>,
        no_autofix: bool,
    }
}
