#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use designctl::{
    application::error::AppError,
    config,
    infra::error::InfraError,
    store::{EnvOverrides, KeySource, Store},
};
use httpmock::MockServer;
use tempfile::NamedTempFile;

use crate::args::{
    BatchRenderArgs, Commands, DesignsArgs, DesignsCmd, DiffArgs, InitArgs, ProfilesArgs,
    ProfilesCmd, RenderArgs, RenderOptionArgs, RendersCmd, TargetArgs, ValidateArgs,
};
use crate::client::{App, CliError, Ctx};
use crate::dispatch;
use crate::handlers::{batch, render};

fn app(env: EnvOverrides) -> App {
    let settings = config::defaults().expect("settings");
    App::new(settings, Store::in_memory(env), false)
}

fn app_for(server: &MockServer) -> App {
    app(EnvOverrides {
        api_key: Some("env-key".into()),
        base_url: Some(server.base_url()),
    })
}

fn ctx(server: &MockServer) -> Ctx {
    app_for(server).ctx().expect("ctx")
}

fn tmp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tmp file");
    std::io::Write::write_all(&mut file, contents.as_bytes()).expect("write tmp");
    file
}

fn design_json(id: &str, name: &str) -> String {
    format!(r#"{{"id":"{id}","name":"{name}","width":800,"height":600}}"#)
}

#[test]
fn ctx_errors_without_key() {
    let app = app(EnvOverrides::default());
    let err = app.ctx().err().expect("missing key should fail");
    assert!(matches!(err, CliError::MissingKey));
}

#[tokio::test]
async fn api_commands_need_a_key_but_store_commands_do_not() -> Result<(), CliError> {
    let app = app(EnvOverrides::default());

    let err = dispatch(&app, Commands::Whoami)
        .await
        .expect_err("whoami without key");
    assert!(matches!(err, CliError::MissingKey));

    dispatch(
        &app,
        Commands::Profiles(ProfilesArgs {
            action: ProfilesCmd::List,
        }),
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn designs_list_sends_paging_and_bearer_key() -> Result<(), CliError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/designs")
            .header("authorization", "Bearer env-key")
            .query_param("page", "2")
            .query_param("limit", "5")
            .query_param("search", "card");
        then.status(200)
            .header("content-type", "application/json")
            .body(format!(r#"{{"data":[{}],"total":6}}"#, design_json("d1", "Card")));
    });

    let app = app_for(&server);
    dispatch(
        &app,
        Commands::Designs(DesignsArgs {
            action: DesignsCmd::List {
                page: 2,
                limit: 5,
                search: Some("card".into()),
            },
        }),
    )
    .await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn render_writes_binary_to_output() -> Result<(), CliError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/render")
            .json_body_includes(r#"{"designId":"d1","format":"jpg","dynamicData":{"title":"Hi"}}"#);
        then.status(200)
            .header("content-type", "image/jpeg")
            .body("JPEG-bytes");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("card.jpg");
    let data = tmp_file(r#"{"title":"Hi"}"#);

    let ctx = ctx(&server);
    render::render(
        &ctx,
        RenderArgs {
            target: TargetArgs {
                design: Some("d1".into()),
                template: None,
            },
            options: RenderOptionArgs {
                format: Some("jpg".parse().expect("format")),
                ..RenderOptionArgs::default()
            },
            data: None,
            data_file: Some(data.path().to_path_buf()),
            output: Some(output.clone()),
            async_mode: false,
            wait: false,
            timeout: None,
        },
    )
    .await?;

    mock.assert();
    assert_eq!(std::fs::read(&output).expect("output"), b"JPEG-bytes");
    Ok(())
}

#[tokio::test]
async fn render_rejects_bad_data_before_calling_api() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST").path("/render");
        then.status(200).body("unused");
    });

    let ctx = ctx(&server);
    let err = render::render(
        &ctx,
        RenderArgs {
            target: TargetArgs {
                design: Some("d1".into()),
                template: None,
            },
            options: RenderOptionArgs::default(),
            data: Some("{not json".into()),
            data_file: None,
            output: None,
            async_mode: false,
            wait: false,
            timeout: None,
        },
    )
    .await
    .expect_err("bad data");

    assert!(matches!(err, CliError::App(AppError::DataParse { .. })));
    mock.assert_calls(0);
}

#[tokio::test]
async fn renders_wait_downloads_completed_output() -> Result<(), CliError> {
    let server = MockServer::start();
    let status = server.mock(|when, then| {
        when.method("GET").path("/render/job-1/status");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"jobId":"job-1","status":"completed","outputUrl":"/files/job-1.png"}"#);
    });
    let file = server.mock(|when, then| {
        when.method("GET")
            .path("/files/job-1.png")
            .header("authorization", "Bearer env-key");
        then.status(200)
            .header("content-type", "image/png")
            .body("PNG-bytes");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("job.png");
    let ctx = ctx(&server);
    render::handle_renders(
        &ctx,
        RendersCmd::Wait {
            job_id: "job-1".into(),
            timeout: Some(5),
            output: Some(output.clone()),
        },
    )
    .await?;

    status.assert_calls(1);
    file.assert();
    assert_eq!(std::fs::read(&output).expect("output"), b"PNG-bytes");
    Ok(())
}

#[tokio::test]
async fn renders_wait_reports_failed_job() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/render/job-2/status");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"jobId":"job-2","status":"failed","error":"font missing"}"#);
    });

    let ctx = ctx(&server);
    let err = render::handle_renders(
        &ctx,
        RendersCmd::Wait {
            job_id: "job-2".into(),
            timeout: Some(5),
            output: None,
        },
    )
    .await
    .expect_err("failed job");

    match err {
        CliError::RenderFailed { job_id, reason } => {
            assert_eq!(job_id, "job-2");
            assert_eq!(reason, "font missing");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn batch_continues_past_failures_and_reports_them() {
    let server = MockServer::start();
    let ok = server.mock(|when, then| {
        when.method("POST")
            .path("/render")
            .json_body_includes(r#"{"designId":"d1"}"#);
        then.status(200)
            .header("content-type", "image/png")
            .body("one");
    });
    let bad = server.mock(|when, then| {
        when.method("POST")
            .path("/render")
            .json_body_includes(r#"{"designId":"d2"}"#);
        then.status(404)
            .header("content-type", "application/json")
            .body(r#"{"error":"design not found"}"#);
    });
    let last = server.mock(|when, then| {
        when.method("POST")
            .path("/render")
            .json_body_includes(r#"{"designId":"d3"}"#);
        then.status(200)
            .header("content-type", "image/png")
            .body("three");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let file = tmp_file(r#"[{"designId":"d1"},{"designId":"d2"},{"designId":"d3"}]"#);
    let ctx = ctx(&server);
    let err = batch::handle(
        &ctx,
        BatchRenderArgs {
            file: file.path().to_path_buf(),
            output_dir: Some(dir.path().to_path_buf()),
            format: None,
        },
    )
    .await
    .expect_err("one item fails");

    assert!(matches!(err, CliError::BatchFailed { failed: 1, total: 3 }));
    ok.assert();
    bad.assert();
    last.assert();
    assert_eq!(std::fs::read(dir.path().join("d1.png")).expect("d1"), b"one");
    assert_eq!(std::fs::read(dir.path().join("d3.png")).expect("d3"), b"three");
    assert!(!dir.path().join("d2.png").exists());
}

#[tokio::test]
async fn diff_fetches_both_designs() -> Result<(), CliError> {
    let server = MockServer::start();
    let left = server.mock(|when, then| {
        when.method("GET").path("/designs/a");
        then.status(200)
            .header("content-type", "application/json")
            .body(design_json("a", "Card"));
    });
    let right = server.mock(|when, then| {
        when.method("GET").path("/designs/b");
        then.status(200)
            .header("content-type", "application/json")
            .body(design_json("b", "Card v2"));
    });

    let app = app_for(&server);
    dispatch(
        &app,
        Commands::Diff(DiffArgs {
            left: "a".into(),
            right: "b".into(),
        }),
    )
    .await?;
    left.assert();
    right.assert();
    Ok(())
}

#[tokio::test]
async fn profile_switch_changes_effective_key() -> Result<(), CliError> {
    let app = app(EnvOverrides::default());
    for (name, key) in [("dev", "dev-key"), ("prod", "prod-key")] {
        dispatch(
            &app,
            Commands::Profiles(ProfilesArgs {
                action: ProfilesCmd::Add {
                    name: name.into(),
                    api_key: Some(key.into()),
                    base_url: Some("https://api.example.com/v1".into()),
                    description: None,
                    force: false,
                },
            }),
        )
        .await?;
    }

    dispatch(
        &app,
        Commands::Profiles(ProfilesArgs {
            action: ProfilesCmd::Use {
                name: "prod".into(),
            },
        }),
    )
    .await?;
    let resolved = app.store.effective_api_key()?.expect("key");
    assert_eq!(resolved.key, "prod-key");
    assert_eq!(resolved.source, KeySource::Profile("prod".into()));

    let err = dispatch(
        &app,
        Commands::Profiles(ProfilesArgs {
            action: ProfilesCmd::Use {
                name: "staging".into(),
            },
        }),
    )
    .await
    .expect_err("unknown profile");
    assert!(matches!(err, CliError::App(AppError::NotFound { .. })));
    assert_eq!(app.store.effective_api_key()?.expect("key").key, "prod-key");
    Ok(())
}

#[tokio::test]
async fn init_writes_a_batch_file_that_validates() -> Result<(), CliError> {
    let app = app(EnvOverrides::default());
    let dir = tempfile::tempdir().expect("tempdir");
    let path: PathBuf = dir.path().join("batch.json");

    let init = |force| {
        Commands::Init(InitArgs {
            path: path.clone(),
            force,
        })
    };
    dispatch(&app, init(false)).await?;
    dispatch(
        &app,
        Commands::Validate(ValidateArgs {
            file: path.clone(),
            data: false,
        }),
    )
    .await?;

    let err = dispatch(&app, init(false))
        .await
        .expect_err("refuses to overwrite");
    assert!(matches!(err, CliError::InvalidInput(_)));
    dispatch(&app, init(true)).await?;
    Ok(())
}

#[tokio::test]
async fn validate_reports_item_without_target() {
    let app = app(EnvOverrides::default());
    let file = tmp_file(r#"{"renders":[{"designId":"d1"},{"format":"png"}]}"#);

    let err = dispatch(
        &app,
        Commands::Validate(ValidateArgs {
            file: file.path().to_path_buf(),
            data: false,
        }),
    )
    .await
    .expect_err("second item has no target");

    match err {
        CliError::App(AppError::Validation(message)) => assert!(message.starts_with("item 1:")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn removing_the_active_profile_drops_its_key() -> Result<(), CliError> {
    let app = app(EnvOverrides::default());
    let profiles = |action| Commands::Profiles(ProfilesArgs { action });
    dispatch(
        &app,
        profiles(ProfilesCmd::Add {
            name: "dev".into(),
            api_key: Some("dev-key".into()),
            base_url: Some("https://api.example.com/v1".into()),
            description: None,
            force: false,
        }),
    )
    .await?;
    dispatch(&app, profiles(ProfilesCmd::Use { name: "dev".into() })).await?;
    app.ctx()?;

    dispatch(&app, profiles(ProfilesCmd::Remove { name: "dev".into() })).await?;

    let err = app.ctx().err().expect("key is gone with the profile");
    assert!(matches!(err, CliError::MissingKey));
    Ok(())
}

#[tokio::test]
async fn design_ids_cannot_walk_out_of_the_designs_path() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.method("GET");
        then.status(200)
            .header("content-type", "application/json")
            .body(design_json("x", "X"));
    });

    let app = app_for(&server);
    let err = dispatch(
        &app,
        Commands::Designs(DesignsArgs {
            action: DesignsCmd::Get { id: "..".into() },
        }),
    )
    .await
    .expect_err("dot segment");

    assert!(matches!(
        err,
        CliError::App(AppError::Infra(InfraError::InvalidSegment { .. }))
    ));
    any.assert_calls(0);
}
