//! Parsing of `!pprof` requests into a capture invocation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::duration::{format_duration, parse_duration, DurationError};
use crate::error::Result;

/// Reply sent when `!pprof` is given no profile kind.
pub const PROFILE_USAGE: &str = "must specify 'trace', 'cpu' or 'heap'. Try `!pprof cpu -d 5m`";

/// What to do with a `!pprof` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfilePlan {
    /// Not enough tokens; reply with [`PROFILE_USAGE`] and capture nothing.
    Usage,
    /// Run a capture.
    Capture(ProfileRequest),
}

/// A fully resolved profiling invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRequest {
    /// Arguments for the capture command, output path last.
    pub args: Vec<String>,
    /// Profile kind as given (`trace`, `cpu`, `heap`).
    pub kind: String,
    /// Capture window.
    pub duration: Duration,
    /// Where the capture tool writes its output.
    pub output_path: PathBuf,
    /// Set when the requested duration was unusable and the default applied.
    pub duration_error: Option<DurationError>,
}

impl ProfileRequest {
    /// When the artifact should be ready for upload.
    pub fn ready_after(&self, grace: Duration) -> Duration {
        self.duration + grace
    }
}

/// Turns a `!pprof` message body into a plan.
///
/// The body is split into shell words. The leading `!` is dropped from the
/// command token. The last token is read as the capture window; if it does
/// not parse, `default_duration` is used and the token is rewritten so the
/// capture tool still receives a valid duration. The output file is
/// `<tmp_dir>/<kind>-<unix_secs>.out` and is appended as the final argument.
pub fn plan_profile(
    body: &str,
    tmp_dir: &Path,
    default_duration: Duration,
    unix_secs: u64,
) -> Result<ProfilePlan> {
    let mut tokens = shell_words::split(body.trim())?;
    if tokens.len() <= 1 {
        return Ok(ProfilePlan::Usage);
    }

    if let Some(first) = tokens.first_mut() {
        if let Some(stripped) = first.strip_prefix('!') {
            *first = stripped.to_string();
        }
    }
    let kind = tokens[1].clone();

    let mut duration_error = None;
    let duration = match tokens.last().map(|t| parse_duration(t)) {
        Some(Ok(d)) => d,
        Some(Err(e)) => {
            duration_error = Some(e);
            if let Some(last) = tokens.last_mut() {
                *last = format_duration(default_duration);
            }
            default_duration
        }
        None => default_duration,
    };

    let output_path = tmp_dir.join(format!("{}-{}.out", kind, unix_secs));
    tokens.push(output_path.to_string_lossy().into_owned());

    Ok(ProfilePlan::Capture(ProfileRequest {
        args: tokens,
        kind,
        duration,
        output_path,
        duration_error,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_MIN: Duration = Duration::from_secs(300);

    fn capture(body: &str) -> ProfileRequest {
        match plan_profile(body, Path::new("/tmp"), FIVE_MIN, 1_700_000_000).unwrap() {
            ProfilePlan::Capture(req) => req,
            ProfilePlan::Usage => panic!("expected a capture for {:?}", body),
        }
    }

    #[test]
    fn test_usage_without_kind() {
        let plan = plan_profile("!pprof", Path::new("/tmp"), FIVE_MIN, 1).unwrap();
        assert_eq!(plan, ProfilePlan::Usage);
        let plan = plan_profile("  !pprof  ", Path::new("/tmp"), FIVE_MIN, 1).unwrap();
        assert_eq!(plan, ProfilePlan::Usage);
    }

    #[test]
    fn test_valid_duration() {
        let req = capture("!pprof cpu -d 30s");
        assert_eq!(
            req.args,
            vec!["pprof", "cpu", "-d", "30s", "/tmp/cpu-1700000000.out"]
        );
        assert_eq!(req.kind, "cpu");
        assert_eq!(req.duration, Duration::from_secs(30));
        assert_eq!(req.output_path, PathBuf::from("/tmp/cpu-1700000000.out"));
        assert!(req.duration_error.is_none());
    }

    #[test]
    fn test_bad_duration_falls_back_and_rewrites_token() {
        let req = capture("!pprof cpu -d not-a-duration");
        assert_eq!(
            req.args,
            vec!["pprof", "cpu", "-d", "5m0s", "/tmp/cpu-1700000000.out"]
        );
        assert_eq!(req.duration, FIVE_MIN);
        assert!(matches!(req.duration_error, Some(DurationError::Invalid(_))));
    }

    #[test]
    fn test_kind_only_keeps_kind_in_output_name() {
        let req = capture("!pprof heap");
        assert_eq!(req.args, vec!["pprof", "5m0s", "/tmp/heap-1700000000.out"]);
        assert_eq!(req.kind, "heap");
        assert_eq!(req.duration, FIVE_MIN);
    }

    #[test]
    fn test_negative_duration_falls_back() {
        let req = capture("!pprof cpu -d -1s");
        assert_eq!(
            req.args,
            vec!["pprof", "cpu", "-d", "5m0s", "/tmp/cpu-1700000000.out"]
        );
        assert_eq!(req.duration, FIVE_MIN);
        assert!(matches!(req.duration_error, Some(DurationError::Negative(_))));
    }

    #[test]
    fn test_quoted_tokens() {
        let req = capture("!pprof trace --label 'slow path' 1m");
        assert_eq!(req.args[3], "slow path");
        assert_eq!(req.duration, Duration::from_secs(60));
    }

    #[test]
    fn test_unbalanced_quote_is_an_error() {
        let result = plan_profile("!pprof cpu 'oops", Path::new("/tmp"), FIVE_MIN, 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_ready_after() {
        let req = capture("!pprof cpu -d 2s");
        assert_eq!(req.ready_after(Duration::from_secs(1)), Duration::from_secs(3));
    }
}
