//! Minimal CLI parsing for config and run overrides.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    pub dry_run: bool,
    pub json_logs: bool,
}

impl CliOptions {
    pub fn from_args() -> Self {
        Self::parse(env::args().skip(1))
    }

    pub fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--dry-run" => options.dry_run = true,
                "--json-logs" => options.json_logs = true,
                "--config" => {
                    if let Some(value) = args.next() {
                        options.config_path = Some(PathBuf::from(value));
                    }
                }
                _ if arg.starts_with("--config=") => {
                    if let Some(value) = arg.split_once('=').map(|(_, v)| v) {
                        options.config_path = Some(PathBuf::from(value));
                    }
                }
                _ => {}
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(parse(&[]), CliOptions::default());
        let options = parse(&["--config", "/etc/renamer.yml", "--dry-run"]);
        assert_eq!(options.config_path, Some(PathBuf::from("/etc/renamer.yml")));
        assert!(options.dry_run);
        assert!(!options.json_logs);

        let options = parse(&["--config=/tmp/c.yml", "--json-logs", "--unknown"]);
        assert_eq!(options.config_path, Some(PathBuf::from("/tmp/c.yml")));
        assert!(options.json_logs);
    }
}
