//! Classification of incoming message bodies.

/// A diagnostic command recognised by the server itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCommand {
    /// `!logsend`: upload the client's logs.
    LogSend,
    /// `!botlog`: fetch recent bot logs from the external log source.
    BotLog,
    /// `!pprof <kind> [flags...] <duration>`: capture a profile.
    Profile,
}

impl DiagnosticCommand {
    /// All diagnostic commands, in matching priority order.
    pub const ALL: [DiagnosticCommand; 3] = [
        DiagnosticCommand::LogSend,
        DiagnosticCommand::BotLog,
        DiagnosticCommand::Profile,
    ];

    /// The message prefix that triggers this command.
    pub fn prefix(self) -> &'static str {
        match self {
            DiagnosticCommand::LogSend => "!logsend",
            DiagnosticCommand::BotLog => "!botlog",
            DiagnosticCommand::Profile => "!pprof",
        }
    }

    /// Human-readable action name, used in logs.
    pub fn action(self) -> &'static str {
        match self {
            DiagnosticCommand::LogSend => "log send",
            DiagnosticCommand::BotLog => "bot log request",
            DiagnosticCommand::Profile => "pprof",
        }
    }
}

/// Where a message should be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Handled by the server; never reaches the application.
    Diagnostic(DiagnosticCommand),
    /// Passed to the application handler.
    Application,
}

/// Classifies a message body.
///
/// The body is trimmed and matched case-sensitively against each
/// diagnostic prefix in priority order. Messages without text always go to
/// the application.
pub fn classify(text: Option<&str>) -> Route {
    let Some(text) = text else {
        return Route::Application;
    };
    let body = text.trim();
    DiagnosticCommand::ALL
        .into_iter()
        .find(|cmd| body.starts_with(cmd.prefix()))
        .map_or(Route::Application, Route::Diagnostic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_diagnostics() {
        assert_eq!(
            classify(Some("!logsend")),
            Route::Diagnostic(DiagnosticCommand::LogSend)
        );
        assert_eq!(
            classify(Some("  !botlog\n")),
            Route::Diagnostic(DiagnosticCommand::BotLog)
        );
        assert_eq!(
            classify(Some("!pprof cpu -d 5m")),
            Route::Diagnostic(DiagnosticCommand::Profile)
        );
    }

    #[test]
    fn test_prefix_match_is_not_word_match() {
        // Prefixes match anything that starts with them.
        assert_eq!(
            classify(Some("!logsendnow")),
            Route::Diagnostic(DiagnosticCommand::LogSend)
        );
    }

    #[test]
    fn test_classify_application() {
        assert_eq!(classify(None), Route::Application);
        assert_eq!(classify(Some("")), Route::Application);
        assert_eq!(classify(Some("!help")), Route::Application);
        assert_eq!(classify(Some("!PPROF cpu")), Route::Application);
        assert_eq!(classify(Some("please !logsend")), Route::Application);
    }
}
