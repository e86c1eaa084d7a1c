//! Presentation-layer join: attach user profiles to history and comment
//! rows fetched from the tasks service.

use async_trait::async_trait;
use domain_tasks::models::{TaskComment, TaskHistory};
use domain_tasks::Page;
use domain_users::UserProfile;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::client::DownstreamClient;

/// An item that references the user who produced it.
pub trait UserRef {
    fn user_id(&self) -> Uuid;
}

impl UserRef for TaskHistory {
    fn user_id(&self) -> Uuid {
        self.user_id
    }
}

impl UserRef for TaskComment {
    fn user_id(&self) -> Uuid {
        self.user_id
    }
}

/// Upstream item plus the resolved author, when the lookup succeeded.
#[derive(Debug, Serialize)]
pub struct Enriched<T: Serialize> {
    #[serde(flatten)]
    pub item: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

/// Resolves a user id to a profile under the caller's credentials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserResolver: Send + Sync {
    /// `None` when the user cannot be resolved; enrichment degrades
    /// per-item instead of failing the request.
    async fn resolve(&self, id: Uuid, bearer: &str) -> Option<UserProfile>;
}

/// Production resolver backed by the auth service's `/users/{id}` endpoint.
pub struct AuthUserResolver {
    client: DownstreamClient,
    auth_url: String,
}

impl AuthUserResolver {
    pub fn new(client: DownstreamClient, auth_url: impl Into<String>) -> Self {
        Self {
            client,
            auth_url: auth_url.into(),
        }
    }
}

#[async_trait]
impl UserResolver for AuthUserResolver {
    async fn resolve(&self, id: Uuid, bearer: &str) -> Option<UserProfile> {
        let url = format!("{}/users/{}", self.auth_url, id);
        match self.client.get_json::<UserProfile>(&url, bearer).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                debug!(user_id = %id, error = %e, "user lookup failed, leaving item unenriched");
                None
            }
        }
    }
}

/// Attach an author profile to each item. Each distinct user id is resolved
/// once, concurrently; item order and pagination metadata are preserved.
pub async fn enrich_page<T: UserRef + Serialize>(
    page: Page<T>,
    resolver: &dyn UserResolver,
    bearer: &str,
) -> Page<Enriched<T>> {
    let mut ids: Vec<Uuid> = Vec::new();
    for item in &page.data {
        if !ids.contains(&item.user_id()) {
            ids.push(item.user_id());
        }
    }

    let lookups = ids.iter().map(|id| resolver.resolve(*id, bearer));
    let resolved = join_all(lookups).await;
    let users: HashMap<Uuid, UserProfile> = ids
        .into_iter()
        .zip(resolved)
        .filter_map(|(id, profile)| profile.map(|p| (id, p)))
        .collect();

    page.map(|item| {
        let user = users.get(&item.user_id()).cloned();
        Enriched { item, user }
    })
}
