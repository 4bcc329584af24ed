use crate::config::ParseConfig;
use crate::error::{ParseError, Result, ScopeError};
use crate::model::{Block, ParseReport, Session, SessionMetadata};
use crate::parse::record::decode_line;
use bstr::ByteSlice;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

const READ_BUFFER: usize = 64 * 1024;
const SAMPLE_ERRORS: usize = 5;

/// Streams JSONL files into sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionParser {
    config: ParseConfig,
}

impl SessionParser {
    pub fn new(config: ParseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Parse one file line by line.
    ///
    /// Bad lines are counted and skipped. The file as a whole fails only when it cannot
    /// be read or crosses the memory ceiling.
    pub async fn parse_file(&self, path: &Path) -> Result<Session> {
        let started = Instant::now();
        let ceiling = self.config.memory_ceiling_bytes;

        let fs_meta = tokio::fs::metadata(path)
            .await
            .map_err(|err| ScopeError::open_failed(path, err))?;
        if fs_meta.len() > ceiling {
            return Err(ScopeError::FileTooLarge {
                path: path.to_path_buf(),
                size: fs_meta.len(),
                limit: ceiling,
            });
        }

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|err| ScopeError::open_failed(path, err))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER, file);

        let mut buf = Vec::new();
        let mut line_no = 0usize;
        let mut consecutive_failures = 0usize;
        let mut retained = 0u64;
        let mut blocks: Vec<Block> = Vec::new();
        let mut report = ParseReport::default();

        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf).await.map_err(|err| {
                ScopeError::file_error(format!("read failed in {}", path.display()), err)
            })?;
            if read == 0 {
                break;
            }
            line_no += 1;

            let line = buf.trim();
            if line.is_empty() {
                continue;
            }
            report.non_empty_lines += 1;

            match decode_line(line_no, line) {
                Ok(block) => {
                    retained += block.retained_bytes() as u64;
                    if retained > ceiling {
                        return Err(ScopeError::MemoryCeiling {
                            path: path.to_path_buf(),
                            limit: ceiling,
                        });
                    }
                    consecutive_failures = 0;
                    report.parsed_blocks += 1;
                    blocks.push(block);
                }
                Err(err) => {
                    log::debug!("{}: {}", path.display(), err);
                    report.skipped_lines += 1;
                    consecutive_failures += 1;
                    record_sample(&mut report.sample_errors, err);

                    if consecutive_failures > self.config.max_consecutive_failures {
                        log::warn!(
                            "{}: {} consecutive bad lines, keeping the first {} blocks",
                            path.display(),
                            consecutive_failures,
                            blocks.len()
                        );
                        report.truncated = true;
                        break;
                    }
                }
            }
        }

        let elapsed = started.elapsed();
        report.elapsed_ms = elapsed.as_millis() as u64;
        if elapsed > self.config.slow_file_threshold() {
            log::warn!(
                "{} took {:?} to parse ({} lines)",
                path.display(),
                elapsed,
                report.non_empty_lines
            );
        }

        let metadata = SessionMetadata {
            size_bytes: fs_meta.len(),
            created: fs_meta.created().ok().map(DateTime::<Utc>::from),
            modified: fs_meta.modified().ok().map(DateTime::<Utc>::from),
            line_count: report.non_empty_lines,
            first_timestamp: blocks.iter().map(|b| b.timestamp).min(),
            last_timestamp: blocks.iter().map(|b| b.timestamp).max(),
        };

        Ok(Session::new(path.to_path_buf(), metadata, blocks, report))
    }
}

fn record_sample(samples: &mut Vec<ParseError>, err: ParseError) {
    if samples.len() < SAMPLE_ERRORS {
        samples.push(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record(i: usize) -> String {
        format!(
            r#"{{"type":"user","uuid":"u{i}","timestamp":"2024-05-01T10:00:{:02}Z","message":{{"role":"user","content":"message {i}"}}}}"#,
            i % 60
        )
    }

    fn write_lines(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[tokio::test]
    async fn parses_every_line_and_stays_balanced() {
        let lines: Vec<String> = (0..5).map(record).collect();
        let file = write_lines(&lines);

        let session = SessionParser::default().parse_file(file.path()).await.unwrap();

        assert_eq!(session.blocks.len(), 5);
        assert!(session.report.is_balanced());
        assert!(!session.report.truncated);
        assert_eq!(session.metadata.line_count, 5);
        assert_eq!(session.blocks[4].line, 5);
    }

    #[tokio::test]
    async fn blank_lines_are_not_counted() {
        let lines = vec![record(0), String::new(), "   ".to_string(), record(1)];
        let file = write_lines(&lines);

        let session = SessionParser::default().parse_file(file.path()).await.unwrap();

        assert_eq!(session.report.non_empty_lines, 2);
        assert_eq!(session.blocks[1].line, 4);
    }

    #[tokio::test]
    async fn bad_lines_are_skipped_and_sampled() {
        let lines = vec![record(0), "{oops".to_string(), record(2), "42".to_string()];
        let file = write_lines(&lines);

        let session = SessionParser::default().parse_file(file.path()).await.unwrap();

        assert_eq!(session.report.parsed_blocks, 2);
        assert_eq!(session.report.skipped_lines, 2);
        assert!(session.report.is_balanced());
        assert_eq!(session.report.sample_errors[0].line(), 2);
        assert_eq!(session.report.sample_errors[1], ParseError::NotAnObject { line: 4 });
    }

    #[tokio::test]
    async fn consecutive_failures_truncate_but_keep_blocks() {
        let mut lines = vec![record(0), record(1)];
        lines.extend((0..10).map(|_| "garbage".to_string()));
        lines.push(record(99));
        let file = write_lines(&lines);

        let parser = SessionParser::new(ParseConfig {
            max_consecutive_failures: 3,
            ..ParseConfig::default()
        });
        let session = parser.parse_file(file.path()).await.unwrap();

        assert!(session.report.truncated);
        assert_eq!(session.blocks.len(), 2);
        assert_eq!(session.report.skipped_lines, 4);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let lines: Vec<String> = (0..5).map(record).collect();
        let file = write_lines(&lines);

        let parser = SessionParser::new(ParseConfig {
            memory_ceiling_bytes: 16,
            ..ParseConfig::default()
        });
        let err = parser.parse_file(file.path()).await.unwrap_err();
        assert!(matches!(err, ScopeError::FileTooLarge { limit: 16, .. }));
    }

    #[tokio::test]
    async fn vanished_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = SessionParser::default()
            .parse_file(&dir.path().join("gone.jsonl"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScopeError::FileNotFound { .. }));
    }
}
