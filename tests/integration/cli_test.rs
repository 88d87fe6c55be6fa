use std::process::{Command, Output};

fn run_vitals(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vitals"))
        .args(args)
        .env_remove("VITALS_MANAGER_URL")
        .output()
        .expect("Failed to execute vitals command")
}

fn run_vitals_with_env(args: &[&str], env_vars: Vec<(&str, &str)>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vitals"));
    cmd.args(args);
    for (key, value) in env_vars {
        cmd.env(key, value);
    }
    cmd.output().expect("Failed to execute vitals command")
}

fn output_to_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_to_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

mod version_command_tests {
    use super::*;

    #[test]
    fn test_version_command_basic() {
        let output = run_vitals(&["version"]);
        let stdout = output_to_string(&output);

        assert!(output.status.success(), "version command should succeed");
        assert!(stdout.contains("vitals"));
        assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_version_command_detailed() {
        let output = run_vitals(&["version", "--detailed"]);
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        assert!(stdout.contains("Version"));
        assert!(stdout.contains("0/5 * * ? * * *"));
    }
}

mod help_tests {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        let output = run_vitals(&["--help"]);
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        for command in ["agent", "manager", "init", "query", "register", "version"] {
            assert!(stdout.contains(command), "help should mention '{}'", command);
        }
    }

    #[test]
    fn test_query_help() {
        let output = run_vitals(&["query", "--help"]);
        let stdout = output_to_string(&output);

        assert!(output.status.success());
        assert!(stdout.contains("--agent-id"));
        assert!(stdout.contains("--last"));
        assert!(stdout.contains("--format"));
    }

    #[test]
    fn test_unknown_command_fails() {
        let output = run_vitals(&["frobnicate"]);
        assert!(!output.status.success());
    }
}

mod client_command_tests {
    use super::*;

    #[test]
    fn test_query_requires_agent_id() {
        let output = run_vitals(&["query"]);
        assert!(!output.status.success());
        assert!(stderr_to_string(&output).contains("--agent-id"));
    }

    #[test]
    fn test_query_unreachable_manager_fails() {
        let output = run_vitals(&["query", "--manager", "http://127.0.0.1:9", "--agent-id", "1"]);

        assert!(!output.status.success());
        assert!(stderr_to_string(&output).contains("Error"));
    }

    #[test]
    fn test_register_rejects_bad_address() {
        let output = run_vitals(&[
            "register",
            "--manager",
            "http://127.0.0.1:9",
            "--agent-id",
            "1",
            "--address",
            "not a url",
        ]);

        assert!(!output.status.success());
        assert!(stderr_to_string(&output).contains("invalid agent address"));
    }
}

mod init_command_tests {
    use super::*;

    #[test]
    fn test_init_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("agent.db");
        let url = format!("sqlite://{}", db_path.display());

        let output = run_vitals_with_env(&["init"], vec![("DATABASE_URL", &url)]);

        assert!(
            output.status.success(),
            "init failed: {}",
            stderr_to_string(&output)
        );
        assert!(output_to_string(&output).contains("initialized"));
        assert!(db_path.exists());
    }

    #[test]
    fn test_init_rejects_non_sqlite_url() {
        let output = run_vitals_with_env(
            &["init"],
            vec![("DATABASE_URL", "postgres://localhost/vitals")],
        );

        assert!(!output.status.success());
        assert!(stderr_to_string(&output).contains("database.url"));
    }
}
