//! REST operations of the control-panel API.
//!
//! Every public method is wrapped: it retries once on a stale CSRF token and
//! resolves to a [`RequestOutcome`]. Operations spanning several requests
//! are retried as a whole.

use fuzzctl_core::{
    FormField, FuzzerId, PoolId, ProjectId, RequestOutcome, ResourceLimits, RevisionId,
    UserContext, UserId,
};
use serde::de::IgnoredAny;

use crate::client::ApiClient;
use crate::models::{
    Created, Image, LoggedInUser, LoginRequest, LoginResponse, NewFuzzer, NewRevision, Page, Pool,
    Project, Revision, RevisionUpdate,
};
use crate::request::{ApiRequest, UploadFile};
use crate::response::RawResponse;
use crate::transport::Transport;

/// Unwrap a successful step or return its failure from the enclosing block.
macro_rules! step {
    ($raw:expr) => {
        match $raw.into_result() {
            Ok(value) => value,
            Err(failure) => return failure,
        }
    };
}

/// Build a request or fail the exchange without sending anything.
macro_rules! build {
    ($request:expr) => {
        match $request {
            Ok(request) => request,
            Err(e) => return RawResponse::from(e),
        }
    };
}

fn fuzzers_path(project: &ProjectId) -> String {
    format!("api/v1/projects/{project}/fuzzers")
}

fn revisions_path(project: &ProjectId, fuzzer: &FuzzerId) -> String {
    format!("api/v1/projects/{project}/fuzzers/{fuzzer}/revisions")
}

fn revision_path(user: &UserContext, fuzzer: &FuzzerId, revision: &RevisionId) -> String {
    format!("{}/{revision}", revisions_path(&user.project_id, fuzzer))
}

/// Revision archive slots accepted by the upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archive {
    Binaries,
    Config,
    Seeds,
}

impl Archive {
    /// Form field that upload errors are shown next to.
    #[must_use]
    pub fn field(self) -> FormField {
        match self {
            Self::Binaries => FormField::Binaries,
            Self::Config => FormField::Config,
            Self::Seeds => FormField::Seeds,
        }
    }

    fn segment(self) -> &'static str {
        match self {
            Self::Binaries => "binaries",
            Self::Config => "config",
            Self::Seeds => "seeds",
        }
    }
}

impl<T: Transport> ApiClient<T> {
    /// Log in, remember the issued CSRF token and select the user's most
    /// recent project.
    pub async fn login(&self, username: &str, password: &str) -> RequestOutcome<LoggedInUser> {
        let body = LoginRequest { username: username.to_owned(), password: password.to_owned() };
        let body = &body;
        let outcome = self
            .wrapped(move || async move {
                let request = build!(ApiRequest::post("api/v1/auth/login").json(body));
                let (login, headers) =
                    step!(self.execute_with_headers::<LoginResponse>(request).await);
                self.adopt_csrf_token(&headers);

                let projects: Page<Project> =
                    step!(self.execute(projects_request(&login.user_id)).await);
                RawResponse::Ok(LoggedInUser {
                    user_id: login.user_id,
                    display_name: login.display_name,
                    project: projects.items.into_iter().next(),
                })
            })
            .await;

        if let RequestOutcome::Success(user) = &outcome {
            if let Some(project) = &user.project {
                self.session().set_user(UserContext::new(user.user_id.clone(), project.id.clone()));
            }
            tracing::info!(user_id = %user.user_id, "logged in");
        }
        outcome
    }

    /// Log out. The session is cleared whatever the server answers.
    pub async fn logout(&self) -> RequestOutcome<()> {
        let outcome = self
            .wrapped(move || async move {
                self.execute::<IgnoredAny>(ApiRequest::post("api/v1/auth/logout")).await.map(drop)
            })
            .await;
        self.session().clear();
        tracing::info!("logged out");
        outcome
    }

    /// Projects of `user`, most recent first.
    pub async fn list_projects(&self, user: &UserId) -> RequestOutcome<Vec<Project>> {
        self.wrapped(move || async move {
            self.execute::<Page<Project>>(projects_request(user)).await.map(|p| p.items)
        })
        .await
    }

    pub async fn get_project(&self, user: &UserContext) -> RequestOutcome<Project> {
        self.wrapped(move || async move { self.execute(project_request(user)).await }).await
    }

    pub async fn get_pool(&self, user: &UserContext, pool: &PoolId) -> RequestOutcome<Pool> {
        self.wrapped(move || async move { self.execute(pool_request(user, pool)).await }).await
    }

    /// Resource limits for revisions of the user's current project.
    pub async fn fuzzer_limits(&self, user: &UserContext) -> RequestOutcome<ResourceLimits> {
        self.wrapped(move || async move {
            let project: Project = step!(self.execute(project_request(user)).await);
            let pool: Pool = step!(self.execute(pool_request(user, &project.pool_id)).await);
            RawResponse::Ok(ResourceLimits::from_pool(&pool.resources))
        })
        .await
    }

    pub async fn create_fuzzer(
        &self,
        user: &UserContext,
        fuzzer: &NewFuzzer,
    ) -> RequestOutcome<FuzzerId> {
        self.wrapped(move || async move {
            let request = build!(ApiRequest::post(fuzzers_path(&user.project_id))
                .query("user_id", user.user_id.as_str())
                .json(fuzzer));
            self.execute::<Created<FuzzerId>>(request).await.map(|c| c.id)
        })
        .await
    }

    pub async fn create_revision(
        &self,
        user: &UserContext,
        fuzzer: &FuzzerId,
        revision: &NewRevision,
    ) -> RequestOutcome<RevisionId> {
        self.wrapped(move || async move {
            let request = build!(ApiRequest::post(revisions_path(&user.project_id, fuzzer))
                .query("user_id", user.user_id.as_str())
                .json(revision));
            self.execute::<Created<RevisionId>>(request).await.map(|c| c.id)
        })
        .await
    }

    pub async fn get_revision(
        &self,
        user: &UserContext,
        fuzzer: &FuzzerId,
        revision: &RevisionId,
    ) -> RequestOutcome<Revision> {
        self.wrapped(move || async move {
            let request = ApiRequest::get(revision_path(user, fuzzer, revision))
                .query("user_id", user.user_id.as_str());
            self.execute(request).await
        })
        .await
    }

    /// Update a revision's information and resources. Empty halves are
    /// skipped; an empty update sends nothing.
    ///
    /// Both PATCH requests are retried as one unit: when the resources
    /// request meets a stale CSRF token, the retry sends the information
    /// request again even though it already succeeded. Both updates are
    /// idempotent, so the second write leaves the same state.
    pub async fn update_revision(
        &self,
        user: &UserContext,
        fuzzer: &FuzzerId,
        revision: &RevisionId,
        update: &RevisionUpdate,
    ) -> RequestOutcome<()> {
        self.wrapped(move || async move {
            let path = revision_path(user, fuzzer, revision);
            if !update.info.is_empty() {
                let request = build!(ApiRequest::patch(format!("{path}/information"))
                    .query("user_id", user.user_id.as_str())
                    .json(&update.info));
                step!(self.execute::<IgnoredAny>(request).await);
            }
            if !update.resources.is_empty() {
                let request = build!(ApiRequest::patch(format!("{path}/resources"))
                    .query("user_id", user.user_id.as_str())
                    .json(&update.resources));
                step!(self.execute::<IgnoredAny>(request).await);
            }
            RawResponse::Ok(())
        })
        .await
    }

    /// Upload `file` into one of a revision's archive slots. Rejections are
    /// attributed to the slot's form field.
    pub async fn upload(
        &self,
        user: &UserContext,
        fuzzer: &FuzzerId,
        revision: &RevisionId,
        archive: Archive,
        file: &UploadFile,
    ) -> RequestOutcome<()> {
        self.wrapped(move || async move {
            let path =
                format!("{}/files/{}", revision_path(user, fuzzer, revision), archive.segment());
            let request = ApiRequest::put(path)
                .query("user_id", user.user_id.as_str())
                .multipart("file", file);
            self.execute::<IgnoredAny>(request).await.map(drop).for_field(archive.field())
        })
        .await
    }

    pub async fn upload_binaries(
        &self,
        user: &UserContext,
        fuzzer: &FuzzerId,
        revision: &RevisionId,
        file: &UploadFile,
    ) -> RequestOutcome<()> {
        self.upload(user, fuzzer, revision, Archive::Binaries, file).await
    }

    pub async fn upload_config(
        &self,
        user: &UserContext,
        fuzzer: &FuzzerId,
        revision: &RevisionId,
        file: &UploadFile,
    ) -> RequestOutcome<()> {
        self.upload(user, fuzzer, revision, Archive::Config, file).await
    }

    pub async fn upload_seeds(
        &self,
        user: &UserContext,
        fuzzer: &FuzzerId,
        revision: &RevisionId,
        file: &UploadFile,
    ) -> RequestOutcome<()> {
        self.upload(user, fuzzer, revision, Archive::Seeds, file).await
    }

    /// Images of the user's project that support `engine`.
    pub async fn list_images(
        &self,
        user: &UserContext,
        engine: &str,
    ) -> RequestOutcome<Vec<Image>> {
        self.wrapped(move || async move {
            let request = ApiRequest::get(format!("api/v1/projects/{}/images", user.project_id))
                .query("user_id", user.user_id.as_str())
                .query("engines", engine);
            self.execute::<Page<Image>>(request).await.map(|p| p.items)
        })
        .await
    }
}

fn projects_request(user: &UserId) -> ApiRequest {
    ApiRequest::get("api/v1/projects").query("user_id", user.as_str())
}

fn project_request(user: &UserContext) -> ApiRequest {
    ApiRequest::get(format!("api/v1/projects/{}", user.project_id))
        .query("user_id", user.user_id.as_str())
}

fn pool_request(user: &UserContext, pool: &PoolId) -> ApiRequest {
    ApiRequest::get(format!("api/v1/pools/{pool}")).query("user_id", user.user_id.as_str())
}

#[cfg(test)]
mod tests {
    use hyper::Method;

    use super::*;
    use crate::models::{ResourcesUpdate, RevisionInfoUpdate};
    use crate::testing::{reply, reply_with_header, ScriptedTransport};

    fn user() -> UserContext {
        UserContext::new("u1", "p1")
    }

    const PROJECT: &str = r#"{"id": "p1", "name": "main", "pool_id": "pool1"}"#;
    const POOL: &str = r#"{"id": "pool1",
        "resources": {"cpu_total": 8000, "ram_total": 16000, "fuzzer_max_ram": 4000}}"#;

    #[tokio::test]
    async fn fuzzer_limits_reads_project_then_pool() {
        let client = ApiClient::with_transport(ScriptedTransport::new(vec![
            reply(200, PROJECT),
            reply(200, POOL),
        ]));

        let limits = match client.fuzzer_limits(&user()).await {
            RequestOutcome::Success(l) => l,
            other => panic!("expected limits, got {other:?}"),
        };
        assert_eq!(limits.ram.max, 4000, "per-fuzzer max wins over pool total");
        assert_eq!(limits.cpu.max, 8000);

        let paths: Vec<String> =
            client.transport().requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, ["api/v1/projects/p1", "api/v1/pools/pool1"]);
    }

    #[tokio::test]
    async fn fuzzer_limits_retries_whole_chain_on_csrf_failure() {
        let client = ApiClient::with_transport(ScriptedTransport::new(vec![
            reply(200, PROJECT),
            reply(403, r#"{"error": "stale", "code": "E_CSRF_TOKEN_INVALID"}"#),
            reply_with_header(200, "", "x-csrf-token", "t2"),
            reply(200, PROJECT),
            reply(200, POOL),
        ]));

        assert!(client.fuzzer_limits(&user()).await.is_success());
        assert_eq!(client.transport().requests().len(), 5);
    }

    #[tokio::test]
    async fn login_stores_token_and_first_project() {
        let client = ApiClient::with_transport(ScriptedTransport::new(vec![
            reply_with_header(
                200,
                r#"{"user_id": "u1", "display_name": "Ann"}"#,
                "x-csrf-token",
                "t1",
            ),
            reply(200, &format!(r#"{{"items": [{PROJECT}]}}"#)),
        ]));

        let user = match client.login("ann", "secret").await {
            RequestOutcome::Success(u) => u,
            other => panic!("expected login, got {other:?}"),
        };
        assert_eq!(user.display_name, "Ann");
        assert_eq!(client.session().csrf_token().as_deref(), Some("t1"));
        assert_eq!(client.session().user(), Some(UserContext::new("u1", "p1")));
    }

    #[tokio::test]
    async fn logout_clears_session_even_on_failure() {
        let client = ApiClient::with_transport(ScriptedTransport::new(vec![reply(500, "")]));
        client.session().set_csrf_token("t1");
        client.session().set_user(user());

        assert_eq!(client.logout().await, RequestOutcome::internal_error());
        assert_eq!(client.session().csrf_token(), None);
        assert_eq!(client.session().user(), None);
    }

    #[tokio::test]
    async fn update_revision_skips_empty_halves() {
        let client = ApiClient::with_transport(ScriptedTransport::new(vec![reply(200, "")]));
        let update = RevisionUpdate {
            resources: ResourcesUpdate { tmpfs_size: Some(300), ..Default::default() },
            ..Default::default()
        };

        let outcome = client
            .update_revision(&user(), &FuzzerId::new("f1"), &RevisionId::new("r1"), &update)
            .await;
        assert!(outcome.is_success(), "got {outcome:?}");

        let sent = client.transport().requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::PATCH);
        assert_eq!(sent[0].path, "api/v1/projects/p1/fuzzers/f1/revisions/r1/resources");
    }

    #[tokio::test]
    async fn update_revision_retry_resends_both_halves() {
        let client = ApiClient::with_transport(ScriptedTransport::new(vec![
            reply(200, ""),
            reply(403, r#"{"error": "stale", "code": "E_CSRF_TOKEN_MISMATCH"}"#),
            reply_with_header(200, "", "x-csrf-token", "t2"),
            reply(200, ""),
            reply(200, ""),
        ]));
        let update = RevisionUpdate {
            info: RevisionInfoUpdate { name: Some("v2".to_owned()), description: None },
            resources: ResourcesUpdate { ram_usage: Some(2000), ..Default::default() },
        };

        let outcome = client
            .update_revision(&user(), &FuzzerId::new("f1"), &RevisionId::new("r1"), &update)
            .await;
        assert!(outcome.is_success(), "got {outcome:?}");

        let paths: Vec<String> =
            client.transport().requests().into_iter().map(|r| r.path).collect();
        let revision = "api/v1/projects/p1/fuzzers/f1/revisions/r1";
        assert_eq!(
            paths,
            [
                format!("{revision}/information"),
                format!("{revision}/resources"),
                crate::client::CSRF_REFRESH_PATH.to_owned(),
                format!("{revision}/information"),
                format!("{revision}/resources"),
            ]
        );
    }

    #[tokio::test]
    async fn upload_errors_are_attributed_to_their_field() {
        let client = ApiClient::with_transport(ScriptedTransport::new(vec![reply(
            422,
            r#"{"error": {"code": "E_UPLOAD_FAILURE", "message": "bad archive"}}"#,
        )]));
        let file = UploadFile::new("seeds.tar.gz", &b"x"[..]);

        let outcome =
            client.upload_seeds(&user(), &FuzzerId::new("f1"), &RevisionId::new("r1"), &file).await;
        assert_eq!(
            outcome,
            RequestOutcome::FieldError {
                field: FormField::Seeds,
                message: "bad archive".to_owned(),
            }
        );
        assert_eq!(
            client.transport().requests()[0].path,
            "api/v1/projects/p1/fuzzers/f1/revisions/r1/files/seeds"
        );
    }

    #[tokio::test]
    async fn list_images_filters_by_engine() {
        let client = ApiClient::with_transport(ScriptedTransport::new(vec![reply(
            200,
            r#"{"items": [{"id": "img1", "name": "ubuntu", "engines": ["libfuzzer"]}]}"#,
        )]));

        let images = match client.list_images(&user(), "libfuzzer").await {
            RequestOutcome::Success(i) => i,
            other => panic!("expected images, got {other:?}"),
        };
        assert_eq!(images.len(), 1);
        let sent = client.transport().requests();
        assert!(sent[0].query.contains(&("engines".to_owned(), "libfuzzer".to_owned())));
    }
}
