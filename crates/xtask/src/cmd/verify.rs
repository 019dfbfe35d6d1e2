use crate::XtaskError;
use crate::cmd;
use std::process::Command;

fn run_checked(what: &str, command: &mut Command) -> Result<(), XtaskError> {
    let status = command
        .status()
        .map_err(|e| XtaskError::VerifyFailed(format!("{what}: failed to spawn: {e}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(XtaskError::VerifyFailed(format!("{what}: exited with {status}")))
    }
}

/// Runs `cargo <args>` from the workspace root.
fn cargo(args: &[&str]) -> Result<(), XtaskError> {
    let what = format!("cargo {}", args.join(" "));
    println!("\n== {what} ==");
    let mut command = Command::new("cargo");
    command.args(args).current_dir(cmd::workspace_root());
    run_checked(&what, &mut command)
}

pub(crate) fn verify(args: Vec<String>) -> Result<(), XtaskError> {
    if !args.is_empty() {
        return Err(XtaskError::Usage);
    }

    cargo(&["fmt", "--check"])?;
    cargo(&["test", "--workspace"])?;

    println!("\n== fixture parity ==");
    cmd::check_parity(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_arguments_are_a_usage_error() {
        for args in [vec!["--help"], vec!["-h"], vec!["--filter", "x"]] {
            let args = args.into_iter().map(String::from).collect();
            assert!(matches!(verify(args), Err(XtaskError::Usage)));
        }
    }

    #[test]
    fn failures_name_the_command_that_ran() {
        let mut missing_tool = Command::new("trparity-no-such-program");
        let message = run_checked("missing", &mut missing_tool)
            .unwrap_err()
            .to_string();
        assert!(message.contains("missing: failed to spawn"), "{message}");

        let mut rejected = Command::new("cargo");
        rejected.arg("--no-such-flag");
        let message = run_checked("rejected", &mut rejected)
            .unwrap_err()
            .to_string();
        assert!(message.contains("rejected: exited with"), "{message}");
    }
}
