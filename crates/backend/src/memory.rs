//! In-memory Backend Module
//!
//! A [`Backend`] that keeps every app, release and token in process memory.
//! It backs the development server and the adapter tests.

use async_trait::async_trait;
use chrono::Utc;
use rand::RngCore;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, info};

use dockyard_protocol::{
    AccessToken, App, Backend, BackendError, BackendResult, ConfigPatch, ConfigVars, Deploy, Dyno,
    DynoRelease, Formation, FormationUpdate, Release, ReleaseUser, SlugRef, User, Version,
};

/// Size given to process types that were never sized explicitly
pub const DEFAULT_SIZE: &str = "1X";

/// Largest quantity a single process type can be scaled to
pub const MAX_QUANTITY: u32 = 100;

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 30;

/// Everything the backend knows about one app
#[derive(Debug, Clone)]
struct AppRecord {
    app: App,
    releases: Vec<ReleaseRecord>,
    config: ConfigVars,
    formation: BTreeMap<String, Formation>,
}

/// A release plus the config it was cut with
#[derive(Debug, Clone)]
struct ReleaseRecord {
    release: Release,
    config: ConfigVars,
}

impl AppRecord {
    fn current(&self) -> Option<&ReleaseRecord> {
        self.releases.last()
    }

    fn next_version(&self) -> Version {
        Version(self.current().map(|r| r.release.version.0 + 1).unwrap_or(1))
    }

    fn find(&self, version: Version) -> BackendResult<&ReleaseRecord> {
        self.releases
            .iter()
            .find(|r| r.release.version == version)
            .ok_or_else(|| {
                BackendError::not_found(format!("release {} of {}", version, self.app.name))
            })
    }

    /// Append a release built from `slug` and the current config
    fn cut_release(&mut self, actor: &User, slug: SlugRef, description: String) -> Release {
        let release = Release {
            id: generate_id(),
            version: self.next_version(),
            slug,
            description,
            user: ReleaseUser {
                id: actor.id.clone(),
                email: actor.name.clone(),
            },
            created_at: Utc::now(),
        };
        self.releases.push(ReleaseRecord {
            release: release.clone(),
            config: self.config.clone(),
        });
        release
    }

    fn current_slug(&self) -> SlugRef {
        self.current()
            .map(|r| r.release.slug.clone())
            .unwrap_or_else(|| SlugRef { id: generate_id() })
    }
}

#[derive(Debug, Default)]
struct State {
    apps: BTreeMap<String, AppRecord>,
    tokens: HashMap<String, AccessToken>,
}

impl State {
    fn record(&self, name: &str) -> BackendResult<&AppRecord> {
        self.apps
            .get(name)
            .ok_or_else(|| BackendError::not_found(format!("app {name}")))
    }

    fn record_mut(&mut self, name: &str) -> BackendResult<&mut AppRecord> {
        self.apps
            .get_mut(name)
            .ok_or_else(|| BackendError::not_found(format!("app {name}")))
    }

    fn insert_app(&mut self, name: &str) -> BackendResult<&mut AppRecord> {
        validate_app_name(name)?;
        if self.apps.contains_key(name) {
            return Err(BackendError::invalid(format!("name {name} is already taken")));
        }

        let record = AppRecord {
            app: App {
                id: generate_id(),
                name: name.to_string(),
                created_at: Utc::now(),
            },
            releases: Vec::new(),
            config: ConfigVars::new(),
            formation: BTreeMap::new(),
        };
        Ok(self.apps.entry(name.to_string()).or_insert(record))
    }
}

/// Process-local backend for development and tests
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token directly, bypassing credential checks
    pub async fn insert_access_token(&self, token: AccessToken) {
        self.state
            .write()
            .await
            .tokens
            .insert(token.token.clone(), token);
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn apps(&self) -> BackendResult<Vec<App>> {
        let state = self.state.read().await;
        Ok(state.apps.values().map(|r| r.app.clone()).collect())
    }

    async fn app(&self, name: &str) -> BackendResult<App> {
        let state = self.state.read().await;
        Ok(state.record(name)?.app.clone())
    }

    async fn create_app(&self, actor: &User, name: &str) -> BackendResult<App> {
        let mut state = self.state.write().await;
        let record = state.insert_app(name)?;
        info!(app = %name, user = %actor.name, "app created");
        Ok(record.app.clone())
    }

    async fn destroy_app(&self, actor: &User, name: &str) -> BackendResult<()> {
        let mut state = self.state.write().await;
        state
            .apps
            .remove(name)
            .ok_or_else(|| BackendError::not_found(format!("app {name}")))?;
        info!(app = %name, user = %actor.name, "app destroyed");
        Ok(())
    }

    async fn releases(&self, app: &str) -> BackendResult<Vec<Release>> {
        let state = self.state.read().await;
        let record = state.record(app)?;
        Ok(record.releases.iter().map(|r| r.release.clone()).collect())
    }

    async fn release(&self, app: &str, version: Version) -> BackendResult<Release> {
        let state = self.state.read().await;
        Ok(state.record(app)?.find(version)?.release.clone())
    }

    async fn rollback(&self, actor: &User, app: &str, version: Version) -> BackendResult<Release> {
        let mut state = self.state.write().await;
        let record = state.record_mut(app)?;
        let target = record.find(version)?.clone();

        record.config = target.config;
        let release = record.cut_release(
            actor,
            target.release.slug,
            format!("Rollback to {version}"),
        );
        info!(app = %app, version = %release.version, "rolled back to {}", version);
        Ok(release)
    }

    async fn config(&self, app: &str) -> BackendResult<ConfigVars> {
        let state = self.state.read().await;
        Ok(state.record(app)?.config.clone())
    }

    async fn update_config(
        &self,
        actor: &User,
        app: &str,
        patch: ConfigPatch,
    ) -> BackendResult<ConfigVars> {
        let mut state = self.state.write().await;
        let record = state.record_mut(app)?;

        let mut set = Vec::new();
        let mut unset = Vec::new();
        for (name, value) in patch {
            if name.is_empty() {
                return Err(BackendError::invalid("config var names cannot be empty"));
            }
            match value {
                Some(value) => {
                    record.config.insert(name.clone(), value);
                    set.push(name);
                }
                None => {
                    record.config.remove(&name);
                    unset.push(name);
                }
            }
        }

        let mut description = Vec::new();
        if !set.is_empty() {
            description.push(format!("Set {} config vars", set.join(",")));
        }
        if !unset.is_empty() {
            description.push(format!("Unset {} config vars", unset.join(",")));
        }

        let slug = record.current_slug();
        record.cut_release(actor, slug, description.join(". "));
        Ok(record.config.clone())
    }

    async fn dynos(&self, app: &str) -> BackendResult<Vec<Dyno>> {
        let state = self.state.read().await;
        let record = state.record(app)?;
        let Some(current) = record.current() else {
            return Ok(Vec::new());
        };

        let mut dynos = Vec::new();
        for formation in record.formation.values() {
            for n in 1..=formation.quantity {
                dynos.push(Dyno {
                    id: generate_id(),
                    name: format!("{}.{}", formation.process_type, n),
                    process_type: formation.process_type.clone(),
                    command: String::new(),
                    state: "up".to_string(),
                    size: formation.size.clone(),
                    release: DynoRelease {
                        version: current.release.version,
                    },
                    updated_at: current.release.created_at,
                });
            }
        }
        Ok(dynos)
    }

    async fn scale(
        &self,
        actor: &User,
        app: &str,
        updates: Vec<FormationUpdate>,
    ) -> BackendResult<Vec<Formation>> {
        let mut state = self.state.write().await;
        let record = state.record_mut(app)?;

        for update in &updates {
            validate_formation_update(update)?;
        }

        let mut scaled = Vec::with_capacity(updates.len());
        for update in updates {
            let entry = record
                .formation
                .entry(update.process.clone())
                .or_insert_with(|| Formation {
                    process_type: update.process.clone(),
                    quantity: 0,
                    size: DEFAULT_SIZE.to_string(),
                });
            entry.quantity = update.quantity;
            if let Some(size) = update.size {
                entry.size = size;
            }
            debug!(app = %app, process = %entry.process_type, quantity = entry.quantity, "scaled");
            scaled.push(entry.clone());
        }

        info!(app = %app, user = %actor.name, count = scaled.len(), "formation updated");
        Ok(scaled)
    }

    async fn deploy(&self, actor: &User, image: &str) -> BackendResult<Deploy> {
        let name = app_name_from_image(image)?;

        let mut state = self.state.write().await;
        if !state.apps.contains_key(&name) {
            state.insert_app(&name)?;
        }
        let record = state.record_mut(&name)?;
        if record.formation.is_empty() {
            record.formation.insert(
                "web".to_string(),
                Formation {
                    process_type: "web".to_string(),
                    quantity: 1,
                    size: DEFAULT_SIZE.to_string(),
                },
            );
        }

        let release = record.cut_release(
            actor,
            SlugRef { id: generate_id() },
            format!("Deploy {image}"),
        );
        info!(app = %name, image = %image, version = %release.version, "deployed");

        Ok(Deploy {
            id: generate_id(),
            image: image.to_string(),
            app: name,
            release,
        })
    }

    async fn create_access_token(&self, user: &User) -> BackendResult<AccessToken> {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);

        let token = AccessToken {
            token: hex::encode(bytes),
            user: user.clone(),
            expires_in: None,
        };
        self.insert_access_token(token.clone()).await;
        Ok(token)
    }

    async fn find_access_token(&self, token: &str) -> BackendResult<Option<AccessToken>> {
        let state = self.state.read().await;
        Ok(state.tokens.get(token).cloned())
    }
}

/// Check the app naming rules
pub fn validate_app_name(name: &str) -> BackendResult<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_len = (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&name.len());

    if !valid_chars || !valid_len || name.starts_with('-') {
        return Err(BackendError::invalid(format!(
            "app name {name:?} must be {MIN_NAME_LEN}-{MAX_NAME_LEN} lowercase letters, digits or dashes"
        )));
    }
    Ok(())
}

/// Check one formation change before any of its batch is applied
fn validate_formation_update(update: &FormationUpdate) -> BackendResult<()> {
    if update.process.is_empty() {
        return Err(BackendError::invalid("process type cannot be empty"));
    }
    if update.quantity > MAX_QUANTITY {
        return Err(BackendError::invalid(format!(
            "{} quantity {} exceeds the maximum of {MAX_QUANTITY}",
            update.process, update.quantity
        )));
    }
    Ok(())
}

/// `registry/org/acme-inc:v2` deploys to `acme-inc`
fn app_name_from_image(image: &str) -> BackendResult<String> {
    let repo = image
        .rsplit_once('@')
        .map(|(repo, _digest)| repo)
        .unwrap_or(image);
    let repo = match repo.rsplit_once(':') {
        Some((head, tag)) if !tag.contains('/') => head,
        _ => repo,
    };
    let name = repo.rsplit('/').next().unwrap_or_default();
    if name.is_empty() {
        return Err(BackendError::invalid(format!("invalid image: {image:?}")));
    }
    Ok(name.to_string())
}

fn generate_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
