mod cmd;

#[derive(Debug, thiserror::Error)]
enum XtaskError {
    #[error("usage: xtask <command> ...")]
    Usage,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("verification failed:\n{0}")]
    VerifyFailed(String),
    #[error("snapshot update failed: {0}")]
    SnapshotUpdateFailed(String),
    #[error("parity check failed:\n{0}")]
    ParityCheckFailed(String),
}

fn print_help(topic: Option<&str>) {
    if let Some(topic) = topic.filter(|t| !t.trim().is_empty()) {
        println!("usage: xtask {topic} ...");
        println!();
        println!("Subcommands accept `--help`/`-h` and will show a usage error.");
        println!("See: `crates/xtask/src/cmd/` for the full argument grammar.");
        return;
    }

    println!("usage: xtask <command> ...");
    println!();
    println!("Commands:");
    println!("  update-snapshots [--filter <substr>]   regenerate fixtures/**/*.golden.json");
    println!("  check-parity [--filter <substr>]       golden check + annotate round trip");
    println!("  verify                                 fmt, tests, then check-parity");
    println!();
    println!("Topics:");
    println!("  xtask help <command>");
}

fn main() -> Result<(), XtaskError> {
    let mut args = std::env::args().skip(1);
    let Some(cmd_name) = args.next() else {
        return Err(XtaskError::Usage);
    };

    if matches!(cmd_name.as_str(), "--help" | "-h") {
        print_help(None);
        return Ok(());
    }
    if cmd_name == "help" {
        print_help(args.next().as_deref());
        return Ok(());
    }

    match cmd_name.as_str() {
        "update-snapshots" => cmd::update_snapshots(args.collect()),
        "check-parity" => cmd::check_parity(args.collect()),
        "verify" => cmd::verify(args.collect()),
        other => Err(XtaskError::UnknownCommand(other.to_string())),
    }
}
