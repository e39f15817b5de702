use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use tracing::{debug, error, instrument, warn};

use super::{LineMatch, LineSearchError, LineSearchRequest, LineSearcher, SearchTarget};

/// [`LineSearcher`] that shells out to ripgrep.
#[derive(Debug, Clone)]
pub struct RipgrepSearcher {
    program: PathBuf,
}

impl Default for RipgrepSearcher {
    fn default() -> Self {
        Self {
            program: PathBuf::from("rg"),
        }
    }
}

impl RipgrepSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the `rg` binary at `program` instead of looking it up on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Whether the configured binary can be started at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .is_ok_and(|out| out.status.success())
    }

    fn command(&self, request: &LineSearchRequest<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        if request.crlf {
            cmd.arg("--crlf");
        }
        if request.case_insensitive {
            cmd.arg("-i");
        } else {
            cmd.arg("-s");
        }
        cmd.arg("--max-count")
            .arg(request.max_count.to_string())
            .args([
                "--null",
                "--line-number",
                "--byte-offset",
                "--no-heading",
                "--with-filename",
                "--no-config",
                "--color",
                "never",
            ]);

        match request.target {
            SearchTarget::File(path) => {
                cmd.arg("--regexp").arg(request.pattern).arg("--").arg(path);
            }
            SearchTarget::Glob { root, pattern } => {
                // `rg` globs match like gitignore lines; anchor the file part
                // anywhere and bound the walk to the pattern's depth instead.
                let file_part = pattern.rsplit('/').next().unwrap_or(pattern);
                let depth = pattern.split('/').count();
                cmd.arg("--glob")
                    .arg(format!("**/{file_part}"))
                    .arg("--max-depth")
                    .arg(depth.to_string())
                    .arg("--regexp")
                    .arg(request.pattern)
                    .arg("--")
                    .arg(root);
            }
        }
        cmd
    }
}

impl LineSearcher for RipgrepSearcher {
    #[instrument(name = "Ripgrep line search", level = "trace", skip_all, fields(pattern = request.pattern))]
    fn search(&self, request: &LineSearchRequest<'_>) -> Result<Vec<LineMatch>, LineSearchError> {
        let output = self.command(request).output().map_err(|e| {
            error!(program = ?self.program, error = %e, "could not run ripgrep");
            LineSearchError::Execution(format!("could not run {}: {e}", self.program.display()))
        })?;
        classify_exit(&output)?;

        let matches = parse_output(&output.stdout, request.crlf);
        debug!(matches = matches.len(), "ripgrep line search done");
        if matches.is_empty() {
            return Err(LineSearchError::NoMatches);
        }
        Ok(matches)
    }
}

/// Map ripgrep's exit status onto the adapter error taxonomy.
fn classify_exit(output: &Output) -> Result<(), LineSearchError> {
    classify_code(
        output.status.code(),
        &String::from_utf8_lossy(&output.stderr),
    )
}

fn classify_code(code: Option<i32>, stderr: &str) -> Result<(), LineSearchError> {
    match code {
        Some(0) => Ok(()),
        Some(1) => Err(LineSearchError::NoMatches),
        Some(2) => {
            warn!(stderr = stderr.trim(), "ripgrep rejected the search");
            Err(LineSearchError::MalformedPattern(stderr.trim().to_string()))
        }
        Some(code) => Err(LineSearchError::Execution(format!(
            "ripgrep exited with status {code}: {}",
            stderr.trim()
        ))),
        None => Err(LineSearchError::Execution(
            "ripgrep was terminated by a signal".to_string(),
        )),
    }
}

/// Parse `path\0line:offset:text` records, one per line.
fn parse_output(stdout: &[u8], crlf: bool) -> Vec<LineMatch> {
    stdout
        .split(|&b| b == b'\n')
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let parsed = parse_record(record, crlf);
            if parsed.is_none() {
                warn!(record = %String::from_utf8_lossy(record), "unparsable ripgrep output line");
            }
            parsed
        })
        .collect()
}

fn parse_record(record: &[u8], crlf: bool) -> Option<LineMatch> {
    let nul = record.iter().position(|&b| b == 0)?;
    let (path, rest) = (&record[..nul], &record[nul + 1..]);
    let rest = String::from_utf8_lossy(rest);
    let mut parts = rest.splitn(3, ':');
    let line_number = parts.next()?.parse().ok()?;
    let byte_offset = parts.next()?.parse().ok()?;
    let mut text = parts.next()?;
    if crlf {
        text = text.strip_suffix('\r').unwrap_or(text);
    }
    Some(LineMatch {
        path: path_from_bytes(path),
        line_number,
        byte_offset,
        text: text.to_string(),
    })
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::{ffi::OsStr, os::unix::ffi::OsStrExt};
    Path::new(OsStr::from_bytes(bytes)).to_path_buf()
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, num::NonZeroUsize};
    use tempfile::TempDir;

    #[test]
    fn test_classify_code() {
        assert_eq!(classify_code(Some(0), ""), Ok(()));
        assert_eq!(classify_code(Some(1), ""), Err(LineSearchError::NoMatches));
        assert_eq!(
            classify_code(Some(2), "regex parse error\n"),
            Err(LineSearchError::MalformedPattern("regex parse error".into()))
        );
        assert!(matches!(
            classify_code(Some(101), ""),
            Err(LineSearchError::Execution(_))
        ));
        assert!(matches!(
            classify_code(None, ""),
            Err(LineSearchError::Execution(_))
        ));
    }

    #[test]
    fn test_parse_output() {
        let stdout = b"/n/US United States/UsN.txt\x001:0:Smith\r\n/n/CA Canada/CaN.txt\x003:14:Smith: the elder\n";
        let matches = parse_output(stdout, true);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].path, PathBuf::from("/n/US United States/UsN.txt"));
        assert_eq!(matches[0].text, "Smith");
        assert_eq!(matches[1].line_number, 3);
        assert_eq!(matches[1].byte_offset, 14);
        // Colons inside the line survive.
        assert_eq!(matches[1].text, "Smith: the elder");
    }

    #[test]
    fn test_parse_output_skips_garbage() {
        let matches = parse_output(b"no nul here\n", true);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_command_args() {
        let searcher = RipgrepSearcher::new();
        let root = Path::new("/names");
        let request = LineSearchRequest::new(
            "-smith",
            SearchTarget::Glob {
                root,
                pattern: "*/*N.txt",
            },
            NonZeroUsize::new(5).unwrap(),
        );
        let cmd = searcher.command(&request);
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(args.contains(&"--crlf".to_string()));
        assert!(args.contains(&"-i".to_string()));
        assert!(args.windows(2).any(|w| w == ["--max-count", "5"]));
        assert!(args.windows(2).any(|w| w == ["--glob", "**/*N.txt"]));
        assert!(args.windows(2).any(|w| w == ["--max-depth", "2"]));
        // Patterns starting with a dash are passed as a value, never a flag.
        assert!(args.windows(2).any(|w| w == ["--regexp", "-smith"]));
        assert_eq!(args.last().map(String::as_str), Some("/names"));
    }

    #[test]
    fn test_search_with_rg() {
        let searcher = RipgrepSearcher::new();
        if !searcher.is_available() {
            eprintln!("rg not found, skipping");
            return;
        }
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("US United States");
        fs::create_dir_all(&folder).unwrap();
        let path = folder.join("UsN.txt");
        fs::write(&path, "Smith\r\nsmithson\r\nJones\r\n").unwrap();

        let request = LineSearchRequest::new(
            "smith",
            SearchTarget::File(&path),
            NonZeroUsize::new(10).unwrap(),
        );
        let found = searcher.search(&request).unwrap();
        let texts: Vec<_> = found.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Smith", "smithson"]);

        let none = LineSearchRequest::new(
            "zzz",
            SearchTarget::File(&path),
            NonZeroUsize::new(10).unwrap(),
        );
        assert_eq!(searcher.search(&none), Err(LineSearchError::NoMatches));

        let bad = LineSearchRequest::new(
            "[",
            SearchTarget::File(&path),
            NonZeroUsize::new(10).unwrap(),
        );
        assert!(matches!(
            searcher.search(&bad),
            Err(LineSearchError::MalformedPattern(_))
        ));
    }

    #[test]
    fn test_missing_binary() {
        let searcher = RipgrepSearcher::with_program("/nonexistent/rg-binary");
        assert!(!searcher.is_available());
        let path = Path::new("/tmp/whatever.txt");
        let request = LineSearchRequest::new("a", SearchTarget::File(path), NonZeroUsize::MIN);
        assert!(matches!(
            searcher.search(&request),
            Err(LineSearchError::Execution(_))
        ));
    }
}
