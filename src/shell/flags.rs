//! The permissive terminal flag parser.
//!
//! Parses raw shell-line tokens into flags and positionals. Long flags
//! are `--name` or `--name=value`; short flags come from a per-command
//! alias table and may carry an attached or following value. Unknown
//! flags degrade to boolean `true` rather than aborting — the terminal
//! is exploratory, and a typo should produce a git error message, not a
//! parser panic.

use std::collections::BTreeMap;

/// Alias table entry: one short letter for one long flag.
#[derive(Clone, Copy, Debug)]
pub struct ShortSpec {
    /// The single-letter alias (`'m'`).
    pub short: char,
    /// The long flag it maps to (`"message"`).
    pub long: &'static str,
    /// Whether the flag consumes a value.
    pub takes_value: bool,
}

impl ShortSpec {
    /// Boolean short flag.
    #[must_use]
    pub const fn flag(short: char, long: &'static str) -> Self {
        Self {
            short,
            long,
            takes_value: false,
        }
    }

    /// Value-taking short flag.
    #[must_use]
    pub const fn value(short: char, long: &'static str) -> Self {
        Self {
            short,
            long,
            takes_value: true,
        }
    }
}

/// A parsed flag value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlagValue {
    /// Present without a value.
    Bool(bool),
    /// Present with a value.
    Str(String),
}

/// Parsed flags and positionals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    values: BTreeMap<String, FlagValue>,
    /// Non-flag tokens, in order (tokens after `--` included).
    pub positionals: Vec<String>,
    /// Whether a bare `--` separator appeared.
    pub saw_double_dash: bool,
    /// Tokens after the `--` separator only.
    pub after_double_dash: Vec<String>,
}

impl Flags {
    /// Parse `args` with a per-command short-alias table.
    #[must_use]
    pub fn parse(args: &[String], shorts: &[ShortSpec]) -> Self {
        let mut out = Self::default();
        let mut iter = args.iter().peekable();
        while let Some(arg) = iter.next() {
            if out.saw_double_dash {
                out.positionals.push(arg.clone());
                out.after_double_dash.push(arg.clone());
                continue;
            }
            if arg == "--" {
                out.saw_double_dash = true;
                continue;
            }
            if let Some(long) = arg.strip_prefix("--") {
                match long.split_once('=') {
                    Some((name, value)) => {
                        out.values
                            .insert(name.to_owned(), FlagValue::Str(value.to_owned()));
                    }
                    None => {
                        out.values.insert(long.to_owned(), FlagValue::Bool(true));
                    }
                }
                continue;
            }
            if let Some(rest) = arg.strip_prefix('-') {
                if rest.is_empty() {
                    out.positionals.push(arg.clone());
                    continue;
                }
                let mut chars = rest.chars();
                let first = chars.next().unwrap_or(' ');
                let attached: String = chars.collect();
                let spec = shorts.iter().find(|s| s.short == first);
                match spec {
                    Some(spec) if spec.takes_value => {
                        let value = if attached.is_empty() {
                            iter.next().cloned().unwrap_or_default()
                        } else {
                            attached
                        };
                        out.values
                            .insert(spec.long.to_owned(), FlagValue::Str(value));
                    }
                    _ => {
                        // A cluster of boolean letters; unknown letters
                        // become flags named by the letter itself.
                        for c in rest.chars() {
                            let name = shorts
                                .iter()
                                .find(|s| s.short == c)
                                .map_or_else(|| c.to_string(), |s| s.long.to_owned());
                            out.values.insert(name, FlagValue::Bool(true));
                        }
                    }
                }
                continue;
            }
            out.positionals.push(arg.clone());
        }
        out
    }

    /// Returns `true` if the flag is present (any value).
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// The flag's string value, if it carried one.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FlagValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// The first positional, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.positionals.first().map(String::as_str)
    }
}
