//! Command-line surface of pgscript.
//!
//! The binary lives in `main.rs`; the parser is here so it can be tested.

use clap::{Args, CommandFactory, Parser};
use pgscript_core::{FlagValue, RawArguments};
use std::collections::HashSet;

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "pgscript")]
#[command(about = "Run a script against PostgreSQL, optionally inside one transaction")]
#[command(version)]
#[command(long_about = "
pgscript - connect to PostgreSQL, then run a script

Usage: pgscript [CONNECTION] <SCRIPT> [SCRIPT_ARGS...]

[CONNECTION]
  Pass a postgres connection string (just like psql), and/or set the
  standard PGHOST, PGUSER, PGPORT, PGDATABASE, PGPASSWORD variables.
  Pass -X to skip connecting entirely.

[SCRIPT]
  A local path, a file:/// URL or an http(s):// URL.
  *.sql scripts are sent to the database as one batch.
  Anything else runs through the shell with DATABASE_URL, PGSSLMODE and
  PGOPTIONS exported.

Unknown flags (--name, --name=value, -n) are forwarded to the script runner.
Put script arguments that look like flags after --.

SSL MODES:
  --ssl                 TLS with certificate verification
  --ssl=prefer          Prefer TLS
  --ssl=require         Require TLS
  --ssl=reject          Reject unauthorized certificates
  --ssl=no-reject       Do not reject unauthorized certificates
  --ssl=heroku          no-reject when every host ends with .com, else no TLS
  --ssl=disabled        No TLS

EXAMPLES:
  pgscript postgres://app@localhost/app migrate.sql --begin
  PGHOST=db.example.com pgscript --ssl=heroku nightly.sh
  pgscript -X ./report.sh
")]
pub struct Cli {
    /// [CONNECTION] <SCRIPT> [SCRIPT_ARGS...]
    #[arg(value_name = "ARGS", allow_negative_numbers = true)]
    pub positionals: Vec<String>,

    /// Do not establish a connection
    #[arg(short = 'X', long = "no-connect")]
    pub no_connect: bool,

    /// Run the entire script within a single transaction
    #[arg(long)]
    pub begin: bool,

    /// TLS mode (prefer, require, reject, no-reject, heroku, disabled)
    #[arg(
        long,
        value_name = "MODE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub ssl: Option<String>,

    /// Connection pool options
    #[command(flatten)]
    pub sql: SqlArgs,

    /// Shell runner options
    #[command(flatten)]
    pub shell: ShellArgs,

    /// Increase log verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Flags clap does not know, in command-line order
    #[arg(skip)]
    pub extra_flags: Vec<(String, FlagValue)>,

    /// Number of arguments after the program name
    #[arg(skip)]
    pub argument_count: usize,
}

/// Connection pool options
#[derive(Debug, Args)]
pub struct SqlArgs {
    /// Max number of connections
    #[arg(long = "sql-max", value_name = "N")]
    pub max: Option<String>,

    /// Idle connection timeout in seconds (0 = never)
    #[arg(long = "sql-idle-timeout", value_name = "SECS")]
    pub idle_timeout: Option<String>,

    /// Connection timeout in seconds
    #[arg(long = "sql-connect-timeout", value_name = "SECS")]
    pub connect_timeout: Option<String>,

    /// Automatically prepare and cache statements (--sql-prepare[=false])
    #[arg(
        long = "sql-prepare",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub prepare: Option<bool>,

    /// Connection parameter, repeatable (--sql-var a=2 --sql-var b=hello)
    #[arg(long = "sql-var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,
}

/// Options forwarded to the shell runner
#[derive(Debug, Args)]
pub struct ShellArgs {
    /// Run shell commands quietly and hide error details
    #[arg(short, long)]
    pub quiet: bool,

    /// Shell used to run non-SQL scripts
    #[arg(long, value_name = "PATH")]
    pub shell: Option<String>,

    /// Prefix prepended to shell scripts
    #[arg(long, value_name = "COMMANDS")]
    pub prefix: Option<String>,
}

impl Cli {
    /// Parses an argument vector, program name first.
    ///
    /// Flags the launcher does not define are lifted out before clap sees
    /// them and kept in [`Cli::extra_flags`]: `--name` is boolean,
    /// `--name=value` carries a string, and each letter of an unknown short
    /// cluster is boolean. Numbers and everything after `--` stay positional.
    ///
    /// # Errors
    /// Returns the clap error for malformed known flags, `--help` and `--version`
    pub fn parse_invocation<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let program = args.next().unwrap_or_else(|| "pgscript".to_string());
        let rest: Vec<String> = args.collect();
        let argument_count = rest.len();

        let (known, extra_flags) = split_unknown_flags(rest);
        let mut cli = Self::try_parse_from(std::iter::once(program).chain(known))?;
        cli.extra_flags = extra_flags;
        cli.argument_count = argument_count;
        Ok(cli)
    }

    /// Whether the launcher was invoked without any argument.
    pub fn is_empty_invocation(&self) -> bool {
        self.argument_count == 0
    }

    /// Converts parsed arguments into the flag map the resolver consumes.
    ///
    /// Only flags present on the command line are emitted.
    pub fn to_raw_arguments(&self) -> RawArguments {
        let mut raw = RawArguments::new(self.positionals.clone());

        if self.no_connect {
            raw.set_flag("X", FlagValue::Bool(true));
        }
        if self.begin {
            raw.set_flag("begin", FlagValue::Bool(true));
        }
        if let Some(ssl) = &self.ssl {
            let value = match ssl.as_str() {
                "true" => FlagValue::Bool(true),
                other => FlagValue::Str(other.to_string()),
            };
            raw.set_flag("ssl", value);
        }

        let text_flags = [
            ("sql-max", &self.sql.max),
            ("sql-idle-timeout", &self.sql.idle_timeout),
            ("sql-connect-timeout", &self.sql.connect_timeout),
            ("shell", &self.shell.shell),
            ("prefix", &self.shell.prefix),
        ];
        for (name, value) in text_flags {
            if let Some(value) = value {
                raw.set_flag(name, FlagValue::Str(value.clone()));
            }
        }

        if let Some(prepare) = self.sql.prepare {
            raw.set_flag("sql-prepare", FlagValue::Bool(prepare));
        }
        if !self.sql.vars.is_empty() {
            raw.set_flag("sql-var", FlagValue::List(self.sql.vars.clone()));
        }
        if self.shell.quiet {
            raw.set_flag("quiet", FlagValue::Bool(true));
        }

        // Later occurrences of the same unknown flag win.
        for (name, value) in &self.extra_flags {
            raw.set_flag(name, value.clone());
        }

        raw
    }
}

/// Separates tokens clap understands from flags it does not define.
fn split_unknown_flags(args: Vec<String>) -> (Vec<String>, Vec<(String, FlagValue)>) {
    let mut command = Cli::command();
    command.build();

    let mut longs = HashSet::new();
    let mut separate_value_longs = HashSet::new();
    let mut shorts = HashSet::new();
    for arg in command.get_arguments() {
        if let Some(long) = arg.get_long() {
            let takes_value = arg
                .get_num_args()
                .is_some_and(|range| range.takes_values());
            if takes_value && !arg.is_require_equals_set() {
                separate_value_longs.insert(long.to_string());
            }
            longs.insert(long.to_string());
        }
        if let Some(short) = arg.get_short() {
            shorts.insert(short);
        }
    }

    let mut known = Vec::new();
    let mut extra = Vec::new();
    let mut tokens = args.into_iter();

    while let Some(token) = tokens.next() {
        if token == "--" {
            known.push(token);
            known.extend(tokens.by_ref());
            break;
        }

        if let Some(body) = token.strip_prefix("--") {
            let (name, value) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };
            if longs.contains(name) {
                let needs_next = value.is_none() && separate_value_longs.contains(name);
                known.push(token);
                if needs_next && let Some(next) = tokens.next() {
                    known.push(next);
                }
            } else {
                let value = value.map_or(FlagValue::Bool(true), |v| FlagValue::Str(v.to_string()));
                extra.push((name.to_string(), value));
            }
            continue;
        }

        match token.strip_prefix('-') {
            Some(cluster) if !cluster.is_empty() && token.parse::<f64>().is_err() => {
                let (recognized, unknown): (String, String) =
                    cluster.chars().partition(|c| shorts.contains(c));
                if !recognized.is_empty() {
                    known.push(format!("-{}", recognized));
                }
                extra.extend(
                    unknown
                        .chars()
                        .map(|c| (c.to_string(), FlagValue::Bool(true))),
                );
            }
            _ => known.push(token),
        }
    }

    (known, extra)
}

/// Full usage text, printed when pgscript is run without arguments.
pub fn usage() -> String {
    Cli::command().render_long_help().to_string()
}
