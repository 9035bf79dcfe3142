//! Submission flows of the revision forms.
//!
//! Each flow runs the resource gate first and only then talks to the API,
//! one wrapped call at a time. The first call that does not succeed ends the
//! flow and its outcome is returned.

use chrono::{DateTime, Local};
use fuzzctl_core::{
    CoreError, FormField, FuzzerId, ImageId, LimitValidator, RequestOutcome, ResourceLimits,
    ResourceSelection, RevisionId, SliderBounds, UserContext,
};

use crate::client::ApiClient;
use crate::models::{
    NewFuzzer, NewRevision, ResourcesUpdate, Revision, RevisionInfoUpdate, RevisionUpdate,
};
use crate::request::UploadFile;
use crate::transport::Transport;

/// Continue with a step's value or return its failure from the flow.
macro_rules! proceed {
    ($outcome:expr) => {
        match $outcome.into_result() {
            Ok(value) => value,
            Err(failure) => return failure,
        }
    };
}

/// Resource sliders of a revision form.
///
/// Holds the limits snapshot (if loaded) and the current selection. Setters
/// snap the value into the slider's live bounds and return what was applied.
#[derive(Debug, Clone, Default)]
pub struct ResourceForm {
    limits: Option<ResourceLimits>,
    selection: ResourceSelection,
}

impl ResourceForm {
    /// A form with default selection `cpu=1000, ram=1000, tmpfs=200`.
    #[must_use]
    pub fn new(limits: Option<ResourceLimits>) -> Self {
        Self { limits, selection: ResourceSelection::default() }
    }

    /// A form pre-filled with an existing revision's resources.
    #[must_use]
    pub fn with_selection(limits: Option<ResourceLimits>, selection: ResourceSelection) -> Self {
        Self { limits, selection }
    }

    #[must_use]
    pub fn limits(&self) -> Option<&ResourceLimits> {
        self.limits.as_ref()
    }

    #[must_use]
    pub fn validator(&self) -> LimitValidator<'_> {
        LimitValidator::new(self.limits.as_ref())
    }

    #[must_use]
    pub fn selection(&self) -> ResourceSelection {
        self.selection
    }

    #[must_use]
    pub fn cpu_bounds(&self) -> SliderBounds {
        self.validator().cpu_bounds()
    }

    #[must_use]
    pub fn ram_bounds(&self) -> SliderBounds {
        self.validator().ram_bounds()
    }

    /// Tmpfs bounds for the currently selected RAM.
    #[must_use]
    pub fn tmpfs_bounds(&self) -> SliderBounds {
        self.validator().tmpfs_bounds(self.selection.ram_usage)
    }

    pub fn set_cpu(&mut self, cpu: u32) -> u32 {
        self.selection.cpu_usage = snap(self.cpu_bounds(), cpu);
        self.selection.cpu_usage
    }

    /// Select RAM. The tmpfs bounds follow; the tmpfs value itself is left
    /// alone and is checked at submission.
    pub fn set_ram(&mut self, ram: u32) -> u32 {
        self.selection.ram_usage = snap(self.ram_bounds(), ram);
        self.selection.ram_usage
    }

    pub fn set_tmpfs(&mut self, tmpfs: u32) -> u32 {
        self.selection.tmpfs_size = snap(self.tmpfs_bounds(), tmpfs);
        self.selection.tmpfs_size
    }

    /// Gate the current selection.
    ///
    /// # Errors
    /// Returns [`CoreError::RamTotalLimitsViolated`] when `ram + tmpfs`
    /// leaves the allowed band.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validator().check(&self.selection)
    }
}

/// Snap `value` into `bounds`; values that fit nowhere are kept as given.
fn snap(bounds: SliderBounds, value: u32) -> u32 {
    bounds
        .clamp(i64::from(value))
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(value)
}

/// Archives picked in a revision form.
#[derive(Debug, Clone, Default)]
pub struct RevisionFiles {
    pub binaries: Option<UploadFile>,
    pub config: Option<UploadFile>,
    pub seeds: Option<UploadFile>,
}

/// Input of the create-version form.
#[derive(Debug, Clone)]
pub struct VersionDraft {
    pub name: String,
    pub description: String,
    pub image_id: ImageId,
    pub resources: ResourceForm,
    pub files: RevisionFiles,
}

/// Input of the create-fuzzer form, which also creates the first version.
#[derive(Debug, Clone)]
pub struct FuzzerDraft {
    pub fuzzer: NewFuzzer,
    pub image_id: ImageId,
    pub resources: ResourceForm,
    pub files: RevisionFiles,
}

/// Input of the modify-version form: the values as edited by the user.
#[derive(Debug, Clone)]
pub struct VersionEdit {
    pub name: String,
    pub description: String,
    pub resources: ResourceForm,
    pub files: RevisionFiles,
}

/// Name given to a version created together with its fuzzer.
#[must_use]
pub fn name_by_date(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Description given to a version created together with its fuzzer.
#[must_use]
pub fn default_description(fuzzer: &FuzzerId) -> String {
    format!("Initial version of fuzzer {fuzzer}")
}

/// Gate `form`, turning a violation into a form-level error.
fn gate(form: &ResourceForm) -> RequestOutcome<()> {
    match form.check() {
        Ok(()) => RequestOutcome::Success(()),
        Err(e) => {
            tracing::debug!(error = %e, "resource selection rejected");
            e.into()
        }
    }
}

fn required_binaries(files: &RevisionFiles) -> RequestOutcome<&UploadFile> {
    match &files.binaries {
        Some(binaries) => RequestOutcome::Success(binaries),
        None => RequestOutcome::FieldError {
            field: FormField::Binaries,
            message: "binaries archive is required".to_owned(),
        },
    }
}

/// Create a version of `fuzzer`: revision, binaries, then config and seeds
/// when picked.
pub async fn create_version<T: Transport>(
    client: &ApiClient<T>,
    user: &UserContext,
    fuzzer: &FuzzerId,
    draft: &VersionDraft,
) -> RequestOutcome<RevisionId> {
    proceed!(gate(&draft.resources));
    let binaries = proceed!(required_binaries(&draft.files));

    let revision = NewRevision {
        name: draft.name.clone(),
        description: draft.description.clone(),
        image_id: draft.image_id.clone(),
        resources: draft.resources.selection(),
    };
    let revision_id = proceed!(client.create_revision(user, fuzzer, &revision).await);
    proceed!(client.upload_binaries(user, fuzzer, &revision_id, binaries).await);
    proceed!(upload_optional(client, user, fuzzer, &revision_id, &draft.files).await);

    tracing::info!(fuzzer_id = %fuzzer, revision_id = %revision_id, "version created");
    RequestOutcome::Success(revision_id)
}

/// Create a fuzzer and its first version in one go.
pub async fn create_fuzzer_with_version<T: Transport>(
    client: &ApiClient<T>,
    user: &UserContext,
    draft: &FuzzerDraft,
) -> RequestOutcome<(FuzzerId, RevisionId)> {
    proceed!(gate(&draft.resources));
    let binaries = proceed!(required_binaries(&draft.files));

    let mut fuzzer = draft.fuzzer.clone();
    fuzzer.ci_integration = false;
    let fuzzer_id = proceed!(client.create_fuzzer(user, &fuzzer).await);

    let revision = NewRevision {
        name: name_by_date(Local::now()),
        description: default_description(&fuzzer_id),
        image_id: draft.image_id.clone(),
        resources: draft.resources.selection(),
    };
    let revision_id = proceed!(client.create_revision(user, &fuzzer_id, &revision).await);
    proceed!(client.upload_binaries(user, &fuzzer_id, &revision_id, binaries).await);
    proceed!(upload_optional(client, user, &fuzzer_id, &revision_id, &draft.files).await);

    tracing::info!(fuzzer_id = %fuzzer_id, revision_id = %revision_id, "fuzzer created");
    RequestOutcome::Success((fuzzer_id, revision_id))
}

/// Apply `edit` to `current`, sending only what changed, then upload any
/// newly picked archives.
///
/// Returns the update that was sent, empty if nothing changed.
pub async fn modify_version<T: Transport>(
    client: &ApiClient<T>,
    user: &UserContext,
    fuzzer: &FuzzerId,
    current: &Revision,
    edit: &VersionEdit,
) -> RequestOutcome<RevisionUpdate> {
    proceed!(gate(&edit.resources));

    let update = RevisionUpdate {
        info: RevisionInfoUpdate {
            // Resending an unchanged name is a name conflict.
            name: (edit.name != current.name).then(|| edit.name.clone()),
            description: (edit.description != current.description)
                .then(|| edit.description.clone()),
        },
        resources: ResourcesUpdate::diff(&current.resources, &edit.resources.selection()),
    };

    if !update.is_empty() {
        proceed!(client.update_revision(user, fuzzer, &current.id, &update).await);
    }
    if let Some(binaries) = &edit.files.binaries {
        proceed!(client.upload_binaries(user, fuzzer, &current.id, binaries).await);
    }
    proceed!(upload_optional(client, user, fuzzer, &current.id, &edit.files).await);

    RequestOutcome::Success(update)
}

async fn upload_optional<T: Transport>(
    client: &ApiClient<T>,
    user: &UserContext,
    fuzzer: &FuzzerId,
    revision: &RevisionId,
    files: &RevisionFiles,
) -> RequestOutcome<()> {
    if let Some(config) = &files.config {
        proceed!(client.upload_config(user, fuzzer, revision, config).await);
    }
    if let Some(seeds) = &files.seeds {
        proceed!(client.upload_seeds(user, fuzzer, revision, seeds).await);
    }
    RequestOutcome::Success(())
}
