mod support;

use std::cell::RefCell;
use std::collections::BTreeMap;

use labbox_launcher::{
    ContainerRuntime, LaunchPlan, Launcher, LauncherError, RuntimeError, RuntimeOutcome,
};
use support::resolved;

fn plan_for(image: &str, interactive: bool) -> LaunchPlan {
    LaunchPlan {
        image: resolved(image),
        mounts: Vec::new(),
        ports: Vec::new(),
        env: BTreeMap::new(),
        command: Vec::new(),
        interactive,
        name: None,
        auto_remove: interactive,
    }
}

struct FakeRuntime {
    outcome: Result<RuntimeOutcome, String>,
    seen: RefCell<Vec<LaunchPlan>>,
}

impl ContainerRuntime for FakeRuntime {
    fn run(&self, plan: &LaunchPlan) -> Result<RuntimeOutcome, RuntimeError> {
        self.seen.borrow_mut().push(plan.clone());
        self.outcome.clone().map_err(RuntimeError::new)
    }
}

#[test]
fn test_nonzero_container_exit_is_a_result() {
    let rt = FakeRuntime {
        outcome: Ok(RuntimeOutcome {
            container_id: "abc123".into(),
            exit_code: 3,
        }),
        seen: RefCell::new(Vec::new()),
    };
    let plan = plan_for("ubuntu:20.04", true);
    let result = Launcher::new(&rt).launch(&plan).expect("launch");
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.container_id, "abc123");
    assert_eq!(rt.seen.borrow().as_slice(), &[plan]);
}

#[test]
fn test_runtime_failure_is_launch_error() {
    let rt = FakeRuntime {
        outcome: Err("Cannot connect to the Docker daemon".into()),
        seen: RefCell::new(Vec::new()),
    };
    let err = Launcher::new(&rt)
        .launch(&plan_for("ubuntu:20.04", false))
        .expect_err("runtime failed");
    assert!(matches!(err, LauncherError::Launch(_)), "{err:?}");
    assert!(err.to_string().contains("Docker daemon"), "{err}");
    assert_eq!(err.exit_code(), 2);
}

#[cfg(unix)]
mod docker_cli {
    use super::*;
    use crate::support::write_script;
    use labbox_launcher::DockerCli;
    use std::path::Path;

    /// Fake docker that appends each invocation to `calls.log` next to itself.
    fn fake_docker(dir: &Path, cases: &str) -> DockerCli {
        let log = dir.join("calls.log");
        let body = format!(
            "echo \"$*\" >> '{}'\ncase \"$1\" in\n{cases}\n  *) exit 0 ;;\nesac",
            log.display()
        );
        DockerCli::new(write_script(dir, "docker", &body))
    }

    fn calls(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_detached_run_reports_container_id() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_docker(dir.path(), "  run) echo f00dcafe ;;");
        let mut plan = plan_for("ubuntu:20.04", false);
        plan.env.insert("A".into(), "1".into());
        let result = Launcher::new(cli).launch(&plan).expect("launch");
        assert_eq!(result.container_id, "f00dcafe");
        assert_eq!(result.exit_code, 0);

        let calls = calls(dir.path());
        assert_eq!(calls[0], "image inspect ubuntu:20.04");
        assert!(calls[1].starts_with("run -d --cidfile "), "{calls:?}");
        assert!(calls[1].ends_with(" -e A=1 ubuntu:20.04"), "{calls:?}");
    }

    #[test]
    fn test_failed_detached_run_removes_created_container() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_docker(
            dir.path(),
            r#"  run)
    while [ $# -gt 0 ]; do
      if [ "$1" = "--cidfile" ]; then echo abc999 > "$2"; fi
      shift
    done
    echo 'Bind for 0.0.0.0:8080 failed: port is already allocated' >&2
    exit 125 ;;"#,
        );
        let err = Launcher::new(cli)
            .launch(&plan_for("ubuntu:20.04", false))
            .unwrap_err();
        assert!(matches!(err, LauncherError::Launch(_)));
        assert!(err.to_string().contains("port is already allocated"), "{err}");
        assert!(calls(dir.path()).contains(&"rm -f abc999".to_string()));
    }

    #[test]
    fn test_failed_detached_run_without_container_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_docker(dir.path(), "  run) echo 'invalid reference format' >&2; exit 125 ;;");
        let err = Launcher::new(cli)
            .launch(&plan_for("ubuntu:20.04", false))
            .unwrap_err();
        assert!(err.to_string().contains("invalid reference format"), "{err}");
        assert!(!calls(dir.path()).iter().any(|c| c.starts_with("rm")));
    }

    #[test]
    fn test_missing_image_is_pulled_first() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_docker(
            dir.path(),
            "  image) exit 1 ;;\n  run) echo c0ffee ;;",
        );
        Launcher::new(cli)
            .launch(&plan_for("magland/labbox-ephys:0.3.8", false))
            .expect("launch");
        let calls = calls(dir.path());
        assert_eq!(calls[1], "pull magland/labbox-ephys:0.3.8");
        assert!(calls[2].starts_with("run -d"));
    }

    #[test]
    fn test_failed_pull_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_docker(dir.path(), "  image) exit 1 ;;\n  pull) exit 1 ;;");
        let err = Launcher::new(cli)
            .launch(&plan_for("nope:latest", false))
            .unwrap_err();
        assert!(matches!(err, LauncherError::Launch(_)));
        assert!(err.to_string().contains("nope:latest"), "{err}");
        assert!(!calls(dir.path()).iter().any(|c| c.starts_with("run")));
    }

    #[test]
    fn test_attached_creates_then_starts() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_docker(
            dir.path(),
            "  create) echo beef01 ;;\n  start) exit 7 ;;\n  inspect) echo 2026-10-16T09:00:00Z ;;",
        );
        let result = Launcher::new(cli)
            .launch(&plan_for("ubuntu:20.04", true))
            .expect("non-zero exit is still a result");
        assert_eq!(result.container_id, "beef01");
        assert_eq!(result.exit_code, 7);

        let calls = calls(dir.path());
        assert!(calls[1].starts_with("create -i"), "{calls:?}");
        assert!(calls[1].contains("--rm"), "{calls:?}");
        assert_eq!(calls[2], "start --attach --interactive beef01");
        assert!(!calls.iter().any(|c| c.starts_with("rm")));
    }

    #[test]
    fn test_create_failure_carries_runtime_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_docker(
            dir.path(),
            "  create) echo 'invalid mount config' >&2; exit 125 ;;",
        );
        let err = Launcher::new(cli)
            .launch(&plan_for("ubuntu:20.04", true))
            .unwrap_err();
        assert!(matches!(err, LauncherError::Launch(_)));
        assert!(err.to_string().contains("invalid mount config"), "{err}");
    }

    #[test]
    fn test_never_started_container_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_docker(
            dir.path(),
            "  create) echo dead02 ;;\n  start) exit 125 ;;\n  inspect) echo 0001-01-01T00:00:00Z ;;",
        );
        let err = Launcher::new(cli)
            .launch(&plan_for("ubuntu:20.04", true))
            .unwrap_err();
        assert!(matches!(err, LauncherError::Launch(_)));
        assert!(err.to_string().contains("dead02"), "{err}");
        assert!(calls(dir.path()).contains(&"rm -f dead02".to_string()));
    }

    #[test]
    fn test_start_failure_reports_runtime_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_docker(
            dir.path(),
            r#"  create) echo dead03 ;;
  start) echo 'Error response from daemon: Bind for 0.0.0.0:8080 failed: port is already allocated' >&2; exit 1 ;;
  inspect) if [ "$3" = '{{.State.StartedAt}}' ]; then echo 0001-01-01T00:00:00Z; fi ;;"#,
        );
        let err = Launcher::new(cli)
            .launch(&plan_for("ubuntu:20.04", true))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("port is already allocated"), "{err}");
        assert!(calls(dir.path()).contains(&"rm -f dead03".to_string()));
    }

    #[test]
    fn test_start_failure_prefers_recorded_state_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_docker(
            dir.path(),
            r#"  create) echo dead04 ;;
  start) exit 1 ;;
  inspect)
    case "$3" in
      '{{.State.StartedAt}}') echo 0001-01-01T00:00:00Z ;;
      '{{.State.Error}}') echo 'driver failed programming external connectivity: port is already allocated' ;;
    esac ;;"#,
        );
        let err = Launcher::new(cli)
            .launch(&plan_for("ubuntu:20.04", true))
            .unwrap_err();
        assert!(
            err.to_string()
                .contains("driver failed programming external connectivity"),
            "{err}"
        );
    }
}
