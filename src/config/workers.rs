//! Workers-per-site resolution
//!
//! The value can come from the command line, an interactive prompt or the
//! configuration file. Whatever the source, text that is not an integer and
//! integers outside [`WORKERS_PER_SITE_RANGE`] fall back to
//! [`DEFAULT_WORKERS_PER_SITE`].

use crate::config::types::{DEFAULT_WORKERS_PER_SITE, WORKERS_PER_SITE_RANGE};
use std::fmt;
use std::io::{BufRead, Write};

/// Where the resolved worker count came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCountSource {
    CommandLine,
    Prompt,
    ConfigFile,
    Default,
}

impl fmt::Display for WorkerCountSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CommandLine => "command line",
            Self::Prompt => "prompt",
            Self::ConfigFile => "config file",
            Self::Default => "default",
        };
        f.write_str(label)
    }
}

/// A worker count as supplied by one source
///
/// `Err` keeps the raw text of a value that is present but not an integer.
pub type WorkerCountInput = Result<i64, String>;

/// Parses operator-supplied text into a worker count input
pub fn parse_worker_count(raw: &str) -> WorkerCountInput {
    let trimmed = raw.trim();
    trimmed.parse::<i64>().map_err(|_| trimmed.to_string())
}

/// Resolves workers per site from the first source that provided a value
///
/// Sources are tried in order; the first `Some` wins even if it is invalid, in
/// which case the default is used and a warning is logged.
///
/// # Returns
///
/// The worker count and the source it was taken from (`Default` on fallback)
pub fn resolve_workers_per_site(
    candidates: &[(WorkerCountSource, Option<WorkerCountInput>)],
) -> (u32, WorkerCountSource) {
    let Some((source, input)) = candidates
        .iter()
        .find_map(|(source, input)| input.as_ref().map(|i| (*source, i)))
    else {
        return (DEFAULT_WORKERS_PER_SITE, WorkerCountSource::Default);
    };

    let raw = match input {
        Ok(value) => match u32::try_from(*value) {
            Ok(count) if WORKERS_PER_SITE_RANGE.contains(&count) => return (count, source),
            _ => value.to_string(),
        },
        Err(raw) => format!("'{}'", raw),
    };

    tracing::warn!(
        "Invalid workers per site {} from {} (expected {}-{}), using default {}",
        raw,
        source,
        WORKERS_PER_SITE_RANGE.start(),
        WORKERS_PER_SITE_RANGE.end(),
        DEFAULT_WORKERS_PER_SITE
    );
    (DEFAULT_WORKERS_PER_SITE, WorkerCountSource::Default)
}

/// Asks the operator for workers per site
///
/// An empty answer or end of input yields `None`, so the next source is
/// consulted. Any other answer is returned as given; range and format checks
/// happen in [`resolve_workers_per_site`].
pub fn prompt_workers_per_site<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> std::io::Result<Option<WorkerCountInput>> {
    write!(
        output,
        "Workers per site ({}-{}, default {}): ",
        WORKERS_PER_SITE_RANGE.start(),
        WORKERS_PER_SITE_RANGE.end(),
        DEFAULT_WORKERS_PER_SITE
    )?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }

    let answer = line.trim();
    if answer.is_empty() {
        return Ok(None);
    }

    Ok(Some(parse_worker_count(answer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompt(answer: &str) -> Option<WorkerCountInput> {
        let mut input = Cursor::new(answer.to_string());
        let mut output = Vec::new();
        prompt_workers_per_site(&mut input, &mut output).unwrap()
    }

    #[test]
    fn test_resolve_prefers_first_present_source() {
        let resolved = resolve_workers_per_site(&[
            (WorkerCountSource::CommandLine, None),
            (WorkerCountSource::Prompt, Some(Ok(12))),
            (WorkerCountSource::ConfigFile, Some(Ok(3))),
        ]);
        assert_eq!(resolved, (12, WorkerCountSource::Prompt));
    }

    #[test]
    fn test_resolve_falls_back_on_invalid_values() {
        for bad in [0, -4, 21, 1_000, i64::MAX] {
            let resolved =
                resolve_workers_per_site(&[(WorkerCountSource::CommandLine, Some(Ok(bad)))]);
            assert_eq!(resolved, (DEFAULT_WORKERS_PER_SITE, WorkerCountSource::Default));
        }
    }

    #[test]
    fn test_resolve_unparsable_command_line_uses_default() {
        let resolved = resolve_workers_per_site(&[
            (WorkerCountSource::CommandLine, Some(parse_worker_count("abc"))),
            (WorkerCountSource::ConfigFile, Some(Ok(8))),
        ]);
        assert_eq!(resolved, (DEFAULT_WORKERS_PER_SITE, WorkerCountSource::Default));
    }

    #[test]
    fn test_resolve_unparsable_prompt_answer_uses_default() {
        let resolved = resolve_workers_per_site(&[
            (WorkerCountSource::CommandLine, None),
            (WorkerCountSource::Prompt, prompt("abc\n")),
            (WorkerCountSource::ConfigFile, Some(Ok(8))),
        ]);
        assert_eq!(resolved, (DEFAULT_WORKERS_PER_SITE, WorkerCountSource::Default));
    }

    #[test]
    fn test_resolve_accepts_range_bounds() {
        assert_eq!(
            resolve_workers_per_site(&[(WorkerCountSource::ConfigFile, Some(Ok(1)))]),
            (1, WorkerCountSource::ConfigFile)
        );
        assert_eq!(
            resolve_workers_per_site(&[(WorkerCountSource::ConfigFile, Some(Ok(20)))]),
            (20, WorkerCountSource::ConfigFile)
        );
    }

    #[test]
    fn test_resolve_without_any_value() {
        assert_eq!(
            resolve_workers_per_site(&[]),
            (DEFAULT_WORKERS_PER_SITE, WorkerCountSource::Default)
        );
    }

    #[test]
    fn test_parse_worker_count() {
        assert_eq!(parse_worker_count(" 7 "), Ok(7));
        assert_eq!(parse_worker_count("-3"), Ok(-3));
        assert_eq!(parse_worker_count("many"), Err("many".to_string()));
    }

    #[test]
    fn test_prompt_parses_answer() {
        let mut input = Cursor::new("7\n");
        let mut output = Vec::new();
        let value = prompt_workers_per_site(&mut input, &mut output).unwrap();

        assert_eq!(value, Some(Ok(7)));
        assert!(String::from_utf8(output).unwrap().contains("Workers per site"));
    }

    #[test]
    fn test_prompt_blank_answer_is_none() {
        for answer in ["\n", "", "   \n"] {
            assert_eq!(prompt(answer), None);
        }
    }

    #[test]
    fn test_prompt_garbage_is_kept_as_invalid() {
        assert_eq!(prompt("many\n"), Some(Err("many".to_string())));
    }
}
