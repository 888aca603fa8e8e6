//! Injection and teardown of failure modes
//!
//! Both directions go through one dispatcher keyed on the [`InjectSpec`]
//! variant. Nothing is retried: a failed injection is reported to the caller
//! and a failed teardown is logged by the harness.

use crate::config::{ConfigOverride, HarnessConfig};
use crate::error::InjectError;
use crate::exec::{CommandExecutor, CommandSpec};
use faultbench_catalog::{InjectSpec, SqlSource, SqlTarget};
use std::path::Path;
use std::sync::Arc;

/// Direction of a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Inject,
    Teardown,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Inject => "inject",
            Self::Teardown => "teardown",
        }
    }
}

/// Applies and reverses failure-mode side effects
#[derive(Clone)]
pub struct Injector {
    executor: Arc<dyn CommandExecutor>,
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector").finish_non_exhaustive()
    }
}

impl Injector {
    /// Create injector over a command executor
    #[inline]
    #[must_use]
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Produce a failure's side effect
    ///
    /// Returns the configuration override of a `config` injection, `None`
    /// for every other type.
    ///
    /// # Errors
    /// Returns `InjectError` if a command fails, a script cannot be read, the
    /// docker action is invalid or the type is unknown.
    pub async fn inject(
        &self,
        spec: &InjectSpec,
        config: &HarnessConfig,
    ) -> Result<Option<ConfigOverride>, InjectError> {
        self.dispatch(spec, config, Phase::Inject).await
    }

    /// Reverse a failure's side effect
    ///
    /// `config` teardowns are no-ops: the override never touched the base
    /// configuration.
    ///
    /// # Errors
    /// Same as [`Injector::inject`].
    pub async fn teardown(
        &self,
        spec: &InjectSpec,
        config: &HarnessConfig,
    ) -> Result<(), InjectError> {
        self.dispatch(spec, config, Phase::Teardown).await.map(|_| ())
    }

    async fn dispatch(
        &self,
        spec: &InjectSpec,
        config: &HarnessConfig,
        phase: Phase,
    ) -> Result<Option<ConfigOverride>, InjectError> {
        tracing::info!(phase = phase.as_str(), kind = spec.kind(), "dispatching");

        match spec {
            InjectSpec::Sql {
                target,
                source,
                via,
            } => {
                self.run_sql(*target, source, via.as_deref(), config).await?;
                Ok(None)
            }
            InjectSpec::Docker { action, service } => {
                self.docker_service(action, service, config).await?;
                Ok(None)
            }
            InjectSpec::DockerExec {
                script,
                container,
                detach,
            } => {
                let container = container.as_deref().unwrap_or(&config.default_container);
                self.docker_exec(script, container, *detach, config).await?;
                Ok(None)
            }
            InjectSpec::Kustomize { overlay } => {
                self.kubectl(config, "apply", overlay).await?;
                Ok(None)
            }
            InjectSpec::KustomizeDelete { overlay, restore } => {
                if let Err(e) = self.kubectl(config, "delete", overlay).await {
                    tracing::warn!(
                        overlay = %overlay.display(),
                        error = %e,
                        "overlay delete failed, continuing"
                    );
                }
                if let Some(restore) = restore {
                    self.kubectl(config, "apply", restore).await?;
                }
                Ok(None)
            }
            InjectSpec::Config { connection_string } => match phase {
                Phase::Inject => Ok(connection_string.as_ref().map(|conn_str| {
                    tracing::info!("overriding connection string for this failure");
                    ConfigOverride {
                        conn_str: Some(conn_str.clone()),
                    }
                })),
                Phase::Teardown => Ok(None),
            },
            InjectSpec::Noop => Ok(None),
            InjectSpec::Unknown { kind } => Err(InjectError::UnknownInjectionType(kind.clone())),
        }
    }

    async fn run_sql(
        &self,
        target: SqlTarget,
        source: &SqlSource,
        via: Option<&str>,
        config: &HarnessConfig,
    ) -> Result<(), InjectError> {
        let sql = match source {
            SqlSource::Inline(sql) => sql.clone(),
            SqlSource::File(file) => {
                let path = config.scripts_root.join(file);
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| InjectError::script_read(&path, e))?
            }
        };

        let psql_args = [
            config.connection_for(target).to_string(),
            "-v".to_string(),
            "ON_ERROR_STOP=1".to_string(),
            "-c".to_string(),
            sql,
        ];

        match via {
            None => {
                let cmd = CommandSpec::new(&config.tools.psql).args(psql_args);
                self.executor.run(&cmd).await?;
            }
            Some(container) => {
                // The helper's session has to outlive this call, so it runs detached.
                let cmd = CommandSpec::new(&config.tools.docker)
                    .args(["exec", "-d", container])
                    .arg(&config.tools.psql)
                    .args(psql_args);
                self.executor.run(&cmd).await?;
                tokio::time::sleep(config.detach_grace).await;
            }
        }
        Ok(())
    }

    async fn docker_service(
        &self,
        action: &str,
        service: &str,
        config: &HarnessConfig,
    ) -> Result<(), InjectError> {
        if action != "start" && action != "stop" {
            return Err(InjectError::InvalidDockerAction(action.to_string()));
        }

        let mut cmd = CommandSpec::new(&config.tools.docker);
        if let Some(compose) = &config.compose_file {
            cmd = cmd.args(["compose", "-f"]).arg(compose.display().to_string());
        }
        self.executor.run(&cmd.args([action, service])).await?;
        Ok(())
    }

    async fn docker_exec(
        &self,
        script: &Path,
        container: &str,
        detach: bool,
        config: &HarnessConfig,
    ) -> Result<(), InjectError> {
        let local = config.scripts_root.join(script);
        tokio::fs::metadata(&local)
            .await
            .map_err(|e| InjectError::script_read(&local, e))?;

        let file_name = script
            .file_name()
            .map_or_else(|| "faultbench.sh".into(), |n| n.to_string_lossy());
        let remote = format!("/tmp/{file_name}");
        let docker = &config.tools.docker;

        let copy = CommandSpec::new(docker)
            .arg("cp")
            .arg(local.display().to_string())
            .arg(format!("{container}:{remote}"));
        self.executor.run(&copy).await?;

        let chmod =
            CommandSpec::new(docker).args(["exec", container, "chmod", "+x", remote.as_str()]);
        self.executor.run(&chmod).await?;

        if detach {
            let exec = CommandSpec::new(docker).args(["exec", "-d", container, remote.as_str()]);
            self.executor.run(&exec).await?;
            tokio::time::sleep(config.detach_grace).await;
        } else {
            let exec = CommandSpec::new(docker).args(["exec", container, remote.as_str()]);
            self.executor.run(&exec).await?;
        }
        Ok(())
    }

    async fn kubectl(
        &self,
        config: &HarnessConfig,
        verb: &str,
        overlay: &Path,
    ) -> Result<(), InjectError> {
        let mut cmd = CommandSpec::new(&config.tools.kubectl);
        if !config.kube_context.is_empty() {
            cmd = cmd.args(["--context", config.kube_context.as_str()]);
        }
        let dir = config.overlays_root.join(overlay);
        let cmd = cmd.args([verb, "-k"]).arg(dir.display().to_string());
        self.executor.run(&cmd).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommandError;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records commands; fails any command whose line contains `fail_on`
    #[derive(Default)]
    struct Recorder {
        commands: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait::async_trait]
    impl CommandExecutor for Recorder {
        async fn run(&self, command: &CommandSpec) -> Result<String, CommandError> {
            let line = command.to_string();
            self.commands.lock().unwrap().push(line.clone());
            match self.fail_on {
                Some(pat) if line.contains(pat) => Err(CommandError::Failed {
                    command: line,
                    code: 1,
                    output: "simulated".to_string(),
                }),
                _ => Ok(String::new()),
            }
        }
    }

    fn setup(fail_on: Option<&'static str>) -> (Arc<Recorder>, Injector) {
        let recorder = Arc::new(Recorder {
            fail_on,
            ..Recorder::default()
        });
        (recorder.clone(), Injector::new(recorder))
    }

    fn config() -> HarnessConfig {
        HarnessConfig::new()
            .with_conn_str("postgres://primary/app")
            .with_replica_conn_str("postgres://replica/app")
            .with_kube_context("kind-dev")
            .with_roots("scripts", "overlays")
            .with_detach_grace(std::time::Duration::ZERO)
    }

    #[tokio::test]
    async fn inline_sql_runs_against_replica() {
        let (rec, injector) = setup(None);
        let spec = InjectSpec::Sql {
            target: SqlTarget::Replica,
            source: SqlSource::Inline("SELECT 1".to_string()),
            via: None,
        };
        injector.inject(&spec, &config()).await.unwrap();

        let cmds = rec.commands.lock().unwrap();
        assert_eq!(
            cmds.as_slice(),
            ["psql postgres://replica/app -v ON_ERROR_STOP=1 -c SELECT 1"]
        );
    }

    #[tokio::test]
    async fn sql_via_helper_runs_detached_in_container() {
        let (rec, injector) = setup(None);
        let spec = InjectSpec::Sql {
            target: SqlTarget::Primary,
            source: SqlSource::Inline("SELECT pg_sleep(600)".to_string()),
            via: Some("pg-helper".to_string()),
        };
        injector.inject(&spec, &config()).await.unwrap();

        let cmds = rec.commands.lock().unwrap();
        assert!(cmds[0].starts_with("docker exec -d pg-helper psql postgres://primary/app"));
    }

    #[tokio::test]
    async fn missing_sql_file_is_a_script_error() {
        let (rec, injector) = setup(None);
        let spec = InjectSpec::Sql {
            target: SqlTarget::Primary,
            source: SqlSource::File(PathBuf::from("does-not-exist.sql")),
            via: None,
        };
        let err = injector.inject(&spec, &config()).await.unwrap_err();
        assert!(matches!(err, InjectError::ScriptRead { .. }));
        assert!(rec.commands.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn docker_rejects_unknown_action() {
        let (_, injector) = setup(None);
        let spec = InjectSpec::Docker {
            action: "restart".to_string(),
            service: "postgres".to_string(),
        };
        let err = injector.inject(&spec, &config()).await.unwrap_err();
        assert!(matches!(err, InjectError::InvalidDockerAction(ref a) if a == "restart"));
    }

    #[tokio::test]
    async fn docker_uses_compose_file_when_configured() {
        let (rec, injector) = setup(None);
        let spec = InjectSpec::Docker {
            action: "stop".to_string(),
            service: "postgres".to_string(),
        };
        let mut cfg = config();
        injector.inject(&spec, &cfg).await.unwrap();
        cfg.compose_file = Some(PathBuf::from("stack.yml"));
        injector.teardown(&spec, &cfg).await.unwrap();

        let cmds = rec.commands.lock().unwrap();
        assert_eq!(cmds[0], "docker stop postgres");
        assert_eq!(cmds[1], "docker compose -f stack.yml stop postgres");
    }

    #[tokio::test]
    async fn kustomize_delete_is_best_effort_but_restore_is_not() {
        let (rec, injector) = setup(Some("delete"));
        let spec = InjectSpec::KustomizeDelete {
            overlay: PathBuf::from("oom"),
            restore: Some(PathBuf::from("base")),
        };
        injector.teardown(&spec, &config()).await.unwrap();
        {
            let cmds = rec.commands.lock().unwrap();
            assert_eq!(cmds.len(), 2);
            assert_eq!(cmds[1], "kubectl --context kind-dev apply -k overlays/base");
        }

        let (_, injector) = setup(Some("apply"));
        let err = injector.teardown(&spec, &config()).await.unwrap_err();
        assert!(matches!(err, InjectError::Command(_)));
    }

    #[tokio::test]
    async fn config_override_only_on_inject() {
        let (rec, injector) = setup(None);
        let spec = InjectSpec::Config {
            connection_string: Some("postgres://bogus/app".to_string()),
        };
        let o = injector.inject(&spec, &config()).await.unwrap();
        assert_eq!(o.and_then(|o| o.conn_str).as_deref(), Some("postgres://bogus/app"));

        injector.teardown(&spec, &config()).await.unwrap();
        assert!(rec.commands.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn noop_and_unknown() {
        let (rec, injector) = setup(None);
        assert_eq!(injector.inject(&InjectSpec::Noop, &config()).await.unwrap(), None);

        let spec = InjectSpec::Unknown {
            kind: "chaos_monkey".to_string(),
        };
        let err = injector.inject(&spec, &config()).await.unwrap_err();
        assert!(matches!(err, InjectError::UnknownInjectionType(ref k) if k == "chaos_monkey"));
        assert!(rec.commands.lock().unwrap().is_empty());
    }

    fn scripts_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("load.sh"), "#!/bin/sh\nsleep 600\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn docker_exec_copies_and_runs_detached_in_default_container() {
        let (rec, injector) = setup(None);
        let dir = scripts_dir();
        let cfg = config().with_roots(dir.path(), "overlays");
        let spec = InjectSpec::DockerExec {
            script: PathBuf::from("load.sh"),
            container: None,
            detach: true,
        };
        assert_eq!(injector.inject(&spec, &cfg).await.unwrap(), None);

        let local = dir.path().join("load.sh");
        let cmds = rec.commands.lock().unwrap();
        assert_eq!(
            cmds.as_slice(),
            [
                format!("docker cp {} postgres:/tmp/load.sh", local.display()),
                "docker exec postgres chmod +x /tmp/load.sh".to_string(),
                "docker exec -d postgres /tmp/load.sh".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn docker_exec_blocks_in_named_container() {
        let (rec, injector) = setup(None);
        let dir = scripts_dir();
        let cfg = config().with_roots(dir.path(), "overlays");
        let spec = InjectSpec::DockerExec {
            script: PathBuf::from("load.sh"),
            container: Some("pg-helper".to_string()),
            detach: false,
        };
        injector.inject(&spec, &cfg).await.unwrap();

        let cmds = rec.commands.lock().unwrap();
        assert_eq!(cmds.len(), 3);
        assert!(cmds[0].ends_with("pg-helper:/tmp/load.sh"));
        assert_eq!(cmds[2], "docker exec pg-helper /tmp/load.sh");
    }

    #[tokio::test]
    async fn docker_exec_stops_at_failed_step() {
        let (rec, injector) = setup(Some("chmod"));
        let dir = scripts_dir();
        let cfg = config().with_roots(dir.path(), "overlays");
        let spec = InjectSpec::DockerExec {
            script: PathBuf::from("load.sh"),
            container: None,
            detach: true,
        };
        let err = injector.inject(&spec, &cfg).await.unwrap_err();
        assert!(matches!(err, InjectError::Command(CommandError::Failed { .. })));
        assert_eq!(rec.commands.lock().unwrap().len(), 2, "exec never runs");
    }

    #[tokio::test]
    async fn docker_exec_missing_script_runs_nothing() {
        let (rec, injector) = setup(None);
        let dir = tempfile::tempdir().unwrap();
        let cfg = config().with_roots(dir.path(), "overlays");
        let spec = InjectSpec::DockerExec {
            script: PathBuf::from("absent.sh"),
            container: None,
            detach: false,
        };
        let err = injector.inject(&spec, &cfg).await.unwrap_err();
        assert!(matches!(
            err,
            InjectError::ScriptRead { ref path, .. } if path.ends_with("absent.sh")
        ));
        assert!(rec.commands.lock().unwrap().is_empty());
    }
}
