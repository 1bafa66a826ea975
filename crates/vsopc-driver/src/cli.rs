//! Argument parsing matching spec.md §6's grammar byte-for-byte.
//!
//! `clap` produces `--flag=value` syntax and a different error format; this
//! external contract is a fixed two-or-three-argument positional grammar
//! with two exact error strings, so it is parsed by hand against
//! `std::env::args()` instead (see SPEC_FULL.md §1 and
//! `original_source/src/main.cpp`, which this transcribes).

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Lex,
    Parse,
    Check,
    Ir,
    Compile,
}

#[derive(Debug)]
pub struct Invocation {
    pub mode: Mode,
    pub source_path: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CliError {
    BadArgumentCount,
    BadArguments,
}

impl CliError {
    pub fn message(&self) -> &'static str {
        match self {
            CliError::BadArgumentCount => "vsopc: bad number of arguments",
            CliError::BadArguments => "vsopc: error in arguments",
        }
    }
}

/// Parse a full `argv` (including the program name at index 0), matching
/// `original_source/src/main.cpp`'s `argc`-based dispatch exactly.
pub fn parse(args: &[String]) -> Result<Invocation, CliError> {
    if args.len() != 2 && args.len() != 3 {
        return Err(CliError::BadArgumentCount);
    }
    let option = if args.len() == 3 { args[1].as_str() } else { "" };
    let mode = match option {
        "-lex" | "-l" => Mode::Lex,
        "-p" => Mode::Parse,
        "-c" => Mode::Check,
        "-i" => Mode::Ir,
        "" => Mode::Compile,
        _ => return Err(CliError::BadArguments),
    };
    let source_path = PathBuf::from(&args[args.len() - 1]);
    Ok(Invocation { mode, source_path })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn two_args_defaults_to_full_compile() {
        let inv = parse(&argv(&["vsopc", "foo.vsop"])).unwrap();
        assert_eq!(inv.mode, Mode::Compile);
        assert_eq!(inv.source_path, PathBuf::from("foo.vsop"));
    }

    #[test]
    fn recognizes_every_named_mode() {
        for (flag, mode) in [
            ("-lex", Mode::Lex),
            ("-l", Mode::Lex),
            ("-p", Mode::Parse),
            ("-c", Mode::Check),
            ("-i", Mode::Ir),
        ] {
            let inv = parse(&argv(&["vsopc", flag, "foo.vsop"])).unwrap();
            assert_eq!(inv.mode, mode, "flag {flag}");
        }
    }

    #[test]
    fn rejects_wrong_argument_count() {
        assert_eq!(parse(&argv(&["vsopc"])).unwrap_err(), CliError::BadArgumentCount);
        assert_eq!(
            parse(&argv(&["vsopc", "-p", "foo.vsop", "extra"])).unwrap_err(),
            CliError::BadArgumentCount
        );
    }

    #[test]
    fn rejects_unknown_option() {
        assert_eq!(
            parse(&argv(&["vsopc", "-x", "foo.vsop"])).unwrap_err(),
            CliError::BadArguments
        );
    }

    #[test]
    fn error_messages_match_spec_exactly() {
        assert_eq!(CliError::BadArgumentCount.message(), "vsopc: bad number of arguments");
        assert_eq!(CliError::BadArguments.message(), "vsopc: error in arguments");
    }
}
