//! Command execution.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use fuzzctl_client::forms::{
    self, FuzzerDraft, ResourceForm, RevisionFiles, VersionDraft, VersionEdit,
};
use fuzzctl_client::models::NewFuzzer;
use fuzzctl_client::{ApiClient, ClientConfig, Transport, UploadFile};
use fuzzctl_core::{
    FuzzerId, ImageId, PoolResources, RequestOutcome, ResourceLimits, ResourceSelection,
    RevisionId, SliderBounds, UserContext,
};
use serde::Serialize;
use serde_json::json;

use crate::cli::{Cli, Command, FileArgs, ResourceArgs};
use crate::error::CliError;

/// Environment variable holding the login name.
pub const ENV_USERNAME: &str = "FUZZCTL_USERNAME";
/// Environment variable holding the login password.
pub const ENV_PASSWORD: &str = "FUZZCTL_PASSWORD";

/// Run the parsed command line.
///
/// # Errors
/// Returns a [`CliError`] for configuration problems, unreadable files, and
/// any API call that does not succeed.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::Check { resources, ram_total, fuzzer_max_ram, cpu_total } = &cli.command {
        let limits = ram_total.map(|ram_total| {
            ResourceLimits::from_pool(&PoolResources {
                cpu_total: cpu_total.unwrap_or_default(),
                ram_total,
                fuzzer_max_ram: *fuzzer_max_ram,
                ..PoolResources::default()
            })
        });
        return check(limits, *resources);
    }

    let config = client_config(&cli)?;
    let username = credential(cli.username.as_ref(), "username", ENV_USERNAME)?;
    let password = credential(cli.password.as_ref(), "password", ENV_PASSWORD)?;
    let client = ApiClient::from_config(&config)?;
    let api = &client;
    let command = cli.command;

    in_session(api, &username, &password, move |user| async move {
        execute(api, &user, command).await
    })
    .await
}

/// Log in, run `work` in the user's project, then log out.
///
/// Once the login succeeded the logout always runs, also when the user has
/// no project or `work` fails.
async fn in_session<T, F, Fut>(
    client: &ApiClient<T>,
    username: &str,
    password: &str,
    work: F,
) -> Result<(), CliError>
where
    T: Transport,
    F: FnOnce(UserContext) -> Fut,
    Fut: Future<Output = Result<(), CliError>>,
{
    let user = CliError::check(client.login(username, password).await)?;
    let result = match client.session().user() {
        Some(context) => work(context).await,
        None => Err(CliError::NoProject(user.user_id.to_string())),
    };
    if let Err(e) = CliError::check(client.logout().await) {
        tracing::warn!(error = %e, "logout failed");
    }
    result
}

async fn execute(
    client: &ApiClient,
    user: &UserContext,
    command: Command,
) -> Result<(), CliError> {
    match command {
        Command::Check { .. } => Ok(()),
        Command::Limits => print(&CliError::check(client.fuzzer_limits(user).await)?),
        Command::Images { engine } => {
            print(&CliError::check(client.list_images(user, &engine).await)?)
        }
        Command::CreateFuzzer { name, description, lang, engine, image, resources, files } => {
            let draft = FuzzerDraft {
                fuzzer: NewFuzzer::new(name, lang, engine).with_description(description),
                image_id: ImageId::new(image),
                resources: resource_form(load_limits(client, user).await, resources),
                files: read_files(&files).await?,
            };
            let (fuzzer_id, revision_id) =
                CliError::check(forms::create_fuzzer_with_version(client, user, &draft).await)?;
            print(&json!({ "fuzzer_id": fuzzer_id, "revision_id": revision_id }))
        }
        Command::CreateVersion { fuzzer, name, description, image, resources, files } => {
            let draft = VersionDraft {
                name,
                description,
                image_id: ImageId::new(image),
                resources: resource_form(load_limits(client, user).await, resources),
                files: read_files(&files).await?,
            };
            let fuzzer = FuzzerId::new(fuzzer);
            let revision_id =
                CliError::check(forms::create_version(client, user, &fuzzer, &draft).await)?;
            print(&json!({ "fuzzer_id": fuzzer, "revision_id": revision_id }))
        }
        Command::ModifyVersion { fuzzer, revision, name, description, cpu, ram, tmpfs, files } => {
            let fuzzer = FuzzerId::new(fuzzer);
            let revision = RevisionId::new(revision);
            let current = CliError::check(client.get_revision(user, &fuzzer, &revision).await)?;

            let mut resources =
                ResourceForm::with_selection(load_limits(client, user).await, current.resources);
            if let Some(cpu) = cpu {
                resources.set_cpu(cpu);
            }
            if let Some(ram) = ram {
                resources.set_ram(ram);
            }
            if let Some(tmpfs) = tmpfs {
                resources.set_tmpfs(tmpfs);
            }

            let edit = VersionEdit {
                name: name.unwrap_or_else(|| current.name.clone()),
                description: description.unwrap_or_else(|| current.description.clone()),
                resources,
                files: read_files(&files).await?,
            };
            let update = CliError::check(
                forms::modify_version(client, user, &fuzzer, &current, &edit).await,
            )?;
            print(&update)
        }
    }
}

/// Environment config with command-line overrides applied.
fn client_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config = config.with_base_url(url)?;
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

fn credential(
    flag: Option<&String>,
    what: &'static str,
    env: &'static str,
) -> Result<String, CliError> {
    flag.cloned()
        .or_else(|| std::env::var(env).ok())
        .ok_or(CliError::MissingCredential { what, env })
}

/// Fetch pool limits; the form falls back to defaults when they cannot be
/// loaded.
async fn load_limits(client: &ApiClient, user: &UserContext) -> Option<ResourceLimits> {
    match client.fuzzer_limits(user).await {
        RequestOutcome::Success(limits) => Some(limits),
        other => {
            tracing::warn!(error = ?other.message(), "resource limits unavailable, using defaults");
            None
        }
    }
}

fn resource_form(limits: Option<ResourceLimits>, args: ResourceArgs) -> ResourceForm {
    let mut form = ResourceForm::new(limits);
    form.set_cpu(args.cpu);
    form.set_ram(args.ram);
    form.set_tmpfs(args.tmpfs);
    form
}

async fn read_files(args: &FileArgs) -> Result<RevisionFiles, CliError> {
    Ok(RevisionFiles {
        binaries: read_upload(args.binaries.as_deref()).await?,
        config: read_upload(args.config.as_deref()).await?,
        seeds: read_upload(args.seeds.as_deref()).await?,
    })
}

async fn read_upload(path: Option<&Path>) -> Result<Option<UploadFile>, CliError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let content = tokio::fs::read(path)
        .await
        .map_err(|source| CliError::ReadFile { path: path.to_path_buf(), source })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "upload".to_owned(), |name| name.to_string_lossy().into_owned());
    Ok(Some(UploadFile::new(file_name, content)))
}

#[derive(Serialize)]
struct BoundsView {
    min: i64,
    max: i64,
    step: u32,
    empty: bool,
}

impl From<SliderBounds> for BoundsView {
    fn from(b: SliderBounds) -> Self {
        Self { min: b.min, max: b.max, step: b.step, empty: b.is_empty() }
    }
}

/// Print the slider bounds for a selection and gate it.
fn check(limits: Option<ResourceLimits>, args: ResourceArgs) -> Result<(), CliError> {
    let selection = ResourceSelection::new(args.cpu, args.ram, args.tmpfs);
    let form = ResourceForm::with_selection(limits, selection);
    print(&json!({
        "limits_loaded": form.validator().is_loaded(),
        "effective_ram_total": form.validator().effective_ram_total(),
        "cpu": BoundsView::from(form.cpu_bounds()),
        "ram": BoundsView::from(form.ram_bounds()),
        "tmpfs": BoundsView::from(form.tmpfs_bounds()),
    }))?;
    form.check()?;
    Ok(())
}

fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
