//! Lazy IP-address token source over a text log.
//!
//! Each line contributes at most one token, the first IPv4-looking match of
//! `\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b`. Lines without a match are skipped.
//! Octets are not range-checked, so `999.1.1.1` is a token.
//!
//! The source is finite and cannot be restarted; open it again to make a
//! second pass.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

static IP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("IP pattern is a valid regex")
});

/// Returns the first IP-address token in `line`, if any.
pub fn extract_ip(line: &str) -> Option<&str> {
    IP_PATTERN.find(line).map(|m| m.as_str())
}

/// Iterator over the IP tokens of a log, one per matching line.
#[derive(Debug)]
pub struct IpLogSource<R> {
    reader: R,
    buf: Vec<u8>,
    total_lines: u64,
    matched_lines: u64,
    done: bool,
}

impl IpLogSource<BufReader<File>> {
    /// Opens a log file for a single pass.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        tracing::debug!(path = %path.display(), "opened log source");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> IpLogSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            total_lines: 0,
            matched_lines: 0,
            done: false,
        }
    }

    /// Number of lines read so far.
    pub fn total_lines(&self) -> u64 {
        self.total_lines
    }

    /// Number of lines that yielded a token so far.
    pub fn matched_lines(&self) -> u64 {
        self.matched_lines
    }

    fn finish(&mut self) {
        self.done = true;
        tracing::info!(
            total_lines = self.total_lines,
            valid_ips = self.matched_lines,
            "finished reading log"
        );
    }
}

impl<R: BufRead> Iterator for IpLogSource<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.finish(),
                Ok(_) => {
                    self.total_lines += 1;
                    // undecodable bytes are replaced, never fatal
                    let line = String::from_utf8_lossy(&self.buf);
                    if let Some(ip) = extract_ip(&line) {
                        self.matched_lines += 1;
                        return Some(ip.to_owned());
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        line = self.total_lines + 1,
                        "stopped reading log"
                    );
                    self.finish();
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("127.0.0.1 - - [10/Oct/2024] \"GET / HTTP/1.1\" 200" => Some("127.0.0.1"); "access log")]
    #[test_case("from 10.0.0.1 to 10.0.0.2" => Some("10.0.0.1"); "first match only")]
    #[test_case("no address here" => None; "no match")]
    #[test_case("version 1.2.3" => None; "three groups")]
    #[test_case("999.999.999.999" => Some("999.999.999.999"); "octets not range checked")]
    #[test_case("1234.1.1.1" => None; "four digit octet")]
    #[test_case("[192.168.1.10]:8080" => Some("192.168.1.10"); "bracketed")]
    fn test_extract_ip(line: &str) -> Option<&str> {
        extract_ip(line)
    }

    #[test]
    fn test_source_skips_unmatched_lines() {
        let log = "10.0.0.1 GET /\nhealth check\n10.0.0.2 GET /a\n10.0.0.1 GET /b";
        let mut source = IpLogSource::new(log.as_bytes());
        let tokens: Vec<String> = source.by_ref().collect();

        assert_eq!(tokens, vec!["10.0.0.1", "10.0.0.2", "10.0.0.1"]);
        assert_eq!(source.total_lines(), 4);
        assert_eq!(source.matched_lines(), 3);
        assert_eq!(source.next(), None);
    }

    #[test]
    fn test_source_ignores_invalid_utf8() {
        let log: &[u8] = b"\xff\xfe 172.16.0.9 x\n\xc3\n";
        let tokens: Vec<String> = IpLogSource::new(log).collect();
        assert_eq!(tokens, vec!["172.16.0.9"]);
    }

    #[test]
    fn test_open_missing_file() {
        let err = IpLogSource::open("/definitely/not/here.log").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
