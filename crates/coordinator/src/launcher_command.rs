//! Launcher that runs one configured program per request kind.
//!
//! The program's stdout is the result: a JSON array of selection records,
//! or one path per line. A non-zero exit is a cancellation. Empty output
//! means the program wrote into the capture target, if there is one, and
//! a cancellation otherwise.

use std::{
    collections::HashMap,
    path::PathBuf,
    process::Stdio,
};

use {
    async_trait::async_trait,
    picker_config::{CommandSpec, LauncherConfig},
    tokio::process::Command,
    tracing::{debug, info, warn},
};

use crate::{
    Result,
    error::Error,
    launcher::{ExternalActionLauncher, LaunchRequest},
    types::{
        ExternalResult, HostEvent, HostEventSender, RequestKind, RequestOptions, SelectionRecord,
    },
};

pub struct CommandLauncher {
    commands: HashMap<RequestKind, CommandSpec>,
    events: HostEventSender,
}

impl CommandLauncher {
    pub fn new(config: &LauncherConfig, events: HostEventSender) -> Self {
        let commands = [
            (RequestKind::PickImage, &config.pick_image),
            (RequestKind::CaptureImage, &config.capture_image),
            (RequestKind::PickVideo, &config.pick_video),
            (RequestKind::CaptureVideo, &config.capture_video),
        ]
        .into_iter()
        .filter_map(|(kind, spec)| spec.clone().map(|spec| (kind, spec)))
        .collect();
        Self { commands, events }
    }

    fn program_for(&self, kind: RequestKind) -> Option<(PathBuf, &CommandSpec)> {
        let spec = self.commands.get(&kind)?;
        find_program(&spec.program).map(|program| (program, spec))
    }
}

/// Explicit paths must exist; bare names are looked up on `PATH`.
fn find_program(program: &str) -> Option<PathBuf> {
    if program.trim().is_empty() {
        return None;
    }
    let path = PathBuf::from(program);
    if path.components().count() > 1 {
        return path.is_file().then_some(path);
    }
    which::which(program).ok()
}

fn expand_args(spec: &CommandSpec, options: &RequestOptions, target: Option<&str>) -> Vec<String> {
    spec.args
        .iter()
        .map(|arg| {
            arg.replace("{target}", target.unwrap_or_default())
                .replace("{max_count}", &options.max_selection_count.to_string())
                .replace("{max_duration}", &options.max_video_duration_secs.to_string())
                .replace("{camera}", options.preferred_capture_device.as_str())
                .replace("{crop}", if options.crop_enabled { "true" } else { "false" })
        })
        .collect()
}

/// Map a finished process to what it selected.
pub fn parse_output(success: bool, stdout: &str, has_target: bool) -> ExternalResult {
    if !success {
        return ExternalResult::Cancelled;
    }
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return if has_target {
            ExternalResult::WroteTarget
        } else {
            ExternalResult::Cancelled
        };
    }
    if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<SelectionRecord>>(trimmed) {
            Ok(records) => return ExternalResult::Selected(records),
            Err(e) => warn!(error = %e, "launcher output is not a record list, reading lines"),
        }
    }
    ExternalResult::Selected(
        trimmed
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(SelectionRecord::from_path)
            .collect(),
    )
}

#[async_trait]
impl ExternalActionLauncher for CommandLauncher {
    fn resolve_handler(&self, kind: RequestKind) -> bool {
        self.program_for(kind).is_some()
    }

    async fn launch(&self, request: LaunchRequest<'_>) -> Result<bool> {
        let Some((program, spec)) = self.program_for(request.kind) else {
            return Ok(false);
        };
        let target = request.target.map(|t| t.path.display().to_string());
        let args = expand_args(spec, request.options, target.as_deref());

        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::external(format!("failed to spawn {}", program.display()), e))?;
        info!(
            kind = %request.kind,
            program = %program.display(),
            code = request.code,
            "launched external picker"
        );

        let code = request.code;
        let has_target = request.target.is_some();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = match child.wait_with_output().await {
                Ok(output) => {
                    if !output.status.success() {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        debug!(status = %output.status, stderr = %stderr.trim(), "external picker exited unsuccessfully");
                    }
                    parse_output(
                        output.status.success(),
                        &String::from_utf8_lossy(&output.stdout),
                        has_target,
                    )
                },
                Err(e) => {
                    warn!(error = %e, "lost external picker process");
                    ExternalResult::Cancelled
                },
            };
            if events.send(HostEvent::ExternalResult { code, result }).is_err() {
                warn!(code, "host event channel closed, dropping external result");
            }
        });
        Ok(true)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::types::CameraDevice,
        rstest::rstest,
        tokio::sync::mpsc,
    };

    #[rstest]
    #[case(false, "/a.jpg\n", false, ExternalResult::Cancelled)]
    #[case(true, "", false, ExternalResult::Cancelled)]
    #[case(true, "  \n", true, ExternalResult::WroteTarget)]
    #[case(
        true,
        "/a.jpg\n\n/b.jpg\n",
        false,
        ExternalResult::Selected(vec![
            SelectionRecord::from_path("/a.jpg"),
            SelectionRecord::from_path("/b.jpg"),
        ])
    )]
    fn parses_process_output(
        #[case] success: bool,
        #[case] stdout: &str,
        #[case] has_target: bool,
        #[case] expected: ExternalResult,
    ) {
        assert_eq!(parse_output(success, stdout, has_target), expected);
    }

    #[test]
    fn parses_json_records() {
        let out = r#"[{"path":"/raw.jpg","compressed_path":"/c.jpg","duration_ms":1200}]"#;
        let ExternalResult::Selected(records) = parse_output(true, out, false) else {
            panic!("expected records");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resolved_path(), std::path::Path::new("/c.jpg"));
        assert_eq!(records[0].duration_ms, Some(1200));
    }

    #[test]
    fn expands_placeholders() {
        let spec = CommandSpec {
            program: "pick".into(),
            args: vec![
                "--out={target}".into(),
                "--max={max_count}".into(),
                "--limit={max_duration}".into(),
                "--camera={camera}".into(),
                "--crop={crop}".into(),
            ],
        };
        let options = RequestOptions {
            max_selection_count: 3,
            max_video_duration_secs: 30,
            preferred_capture_device: CameraDevice::Front,
            crop_enabled: true,
            ..Default::default()
        };
        assert_eq!(expand_args(&spec, &options, Some("/tmp/t.mp4")), vec![
            "--out=/tmp/t.mp4",
            "--max=3",
            "--limit=30",
            "--camera=front",
            "--crop=true",
        ]);
    }

    #[test]
    fn unconfigured_or_missing_program_has_no_handler() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let launcher = CommandLauncher::new(
            &LauncherConfig {
                pick_image: Some(CommandSpec {
                    program: "/definitely/not/here/picker".into(),
                    args: vec![],
                }),
                ..Default::default()
            },
            tx,
        );
        assert!(!launcher.resolve_handler(RequestKind::PickImage));
        assert!(!launcher.resolve_handler(RequestKind::PickVideo));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn launch_posts_result_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let launcher = CommandLauncher::new(
            &LauncherConfig {
                pick_image: Some(CommandSpec {
                    program: "sh".into(),
                    args: vec!["-c".into(), "echo /x.jpg; echo /y.jpg".into()],
                }),
                ..Default::default()
            },
            tx,
        );
        if !launcher.resolve_handler(RequestKind::PickImage) {
            return;
        }
        let options = RequestOptions::default();
        let handled = launcher
            .launch(LaunchRequest {
                kind: RequestKind::PickImage,
                code: 2342,
                options: &options,
                target: None,
            })
            .await
            .unwrap();
        assert!(handled);
        assert_eq!(rx.recv().await.unwrap(), HostEvent::ExternalResult {
            code: 2342,
            result: ExternalResult::Selected(vec![
                SelectionRecord::from_path("/x.jpg"),
                SelectionRecord::from_path("/y.jpg"),
            ]),
        });
    }
}
