//! CLI help output specs.
//!
//! Verify help text displays for `sentinelctl` and its subcommands.

use crate::prelude::*;

#[test]
fn no_args_shows_usage_error() {
    // clap requires a subcommand; running bare is a usage error, not a
    // silent no-op, since every sentinelctl invocation reads the daemon.
    cli().fails().stderr_has("Usage:");
}

#[test]
fn help_shows_usage() {
    cli().args(["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn help_lists_subcommands() {
    cli().args(["--help"]).passes().stdout_has("status").stdout_has("containers").stdout_has("incidents");
}

#[test]
fn status_help_shows_usage() {
    cli().args(["status", "--help"]).passes().stdout_has("Usage:");
}

#[test]
fn incidents_help_documents_optional_id() {
    cli().args(["incidents", "--help"]).passes().stdout_has("Usage:");
}

#[test]
fn version_shows_version() {
    cli().args(["--version"]).passes().stdout_has("sentinelctl");
}
