/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::config::CoreConfig;
use crate::error::{ComposeError, ViewError, ViewResult};
use crate::paginator::Paginator;
use crate::sqlite_store::SqliteStore;
use crate::store_adapter::EntityStore;
use crate::views;
use anyhow::Result;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vidhub_protocol::{Identifier, ViewData, ViewParams, ViewType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    ParametersValidated,
    Paginated,
    Joined,
    Aggregated,
    Enriched,
    Projected,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ParametersValidated => "parameters_validated",
            Stage::Paginated => "paginated",
            Stage::Joined => "joined",
            Stage::Aggregated => "aggregated",
            Stage::Enriched => "enriched",
            Stage::Projected => "projected",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use Stage::{Aggregated as A, Enriched as E, Joined as J, Paginated as Pg, ParametersValidated as V, Projected as P};

/// Stages each view runs, in order. `Done` is implied.
pub fn stage_plan(view: ViewType) -> &'static [Stage] {
    match view {
        ViewType::ChannelProfile | ViewType::VideoDetail => &[V, J, A, E, P],
        ViewType::WatchHistory => &[V, J, P],
        ViewType::VideoFeed | ViewType::PostFeed | ViewType::CommentFeed => &[V, Pg, J, A, E, P],
        ViewType::LikedVideosFeed => &[V, Pg, J, P],
        ViewType::ChannelDashboard => &[V, J, A],
        ViewType::ChannelVideos => &[V, Pg, J, A, P],
    }
}

/// Walks one request through its stage plan and tags failures with the
/// stage that produced them.
pub struct StageTracker<'a> {
    view: ViewType,
    plan: &'static [Stage],
    next: usize,
    cancel: &'a CancellationToken,
}

impl<'a> StageTracker<'a> {
    pub fn new(view: ViewType, cancel: &'a CancellationToken) -> Self {
        Self {
            view,
            plan: stage_plan(view),
            next: 0,
            cancel,
        }
    }

    /// The stage being run, or the first one before anything started.
    pub fn current(&self) -> Stage {
        match self.next {
            0 => self.plan.first().copied().unwrap_or(Stage::Done),
            n => self.plan[n - 1],
        }
    }

    pub fn enter(&mut self, stage: Stage) -> Result<(), ComposeError> {
        match self.plan.get(self.next) {
            Some(expected) if *expected == stage => {}
            expected => {
                let msg = match expected {
                    Some(expected) => format!("entered {stage} while {expected} was due"),
                    None => format!("entered {stage} after the last planned stage"),
                };
                return Err(self.fail(ViewError::Internal(msg)));
            }
        }
        self.next += 1;
        if self.cancel.is_cancelled() {
            return Err(self.fail(ViewError::Cancelled));
        }
        debug!(view = %self.view, %stage, "stage");
        Ok(())
    }

    pub fn fail(&self, error: ViewError) -> ComposeError {
        ComposeError {
            view: self.view,
            stage: self.current(),
            error,
        }
    }

    pub fn check<T>(&self, res: ViewResult<T>) -> Result<T, ComposeError> {
        res.map_err(|e| self.fail(e))
    }

    pub fn step<T>(&mut self, stage: Stage, f: impl FnOnce() -> ViewResult<T>) -> Result<T, ComposeError> {
        self.enter(stage)?;
        self.check(f())
    }

    pub async fn run<T>(
        &mut self,
        stage: Stage,
        fut: impl Future<Output = ViewResult<T>>,
    ) -> Result<T, ComposeError> {
        self.enter(stage)?;
        let res = fut.await;
        self.check(res)
    }

    pub fn finish(self) -> Result<(), ComposeError> {
        if let Some(missed) = self.plan.get(self.next) {
            return Err(self.fail(ViewError::Internal(format!("finished before {missed}"))));
        }
        debug!(view = %self.view, stage = %Stage::Done, "stage");
        Ok(())
    }
}

/// Read-only view composer. Cheap to clone; shares nothing mutable between
/// requests.
#[derive(Clone)]
pub struct Composer {
    store: EntityStore,
    paginator: Paginator,
}

impl Composer {
    pub fn new(store: EntityStore, paginator: Paginator) -> Self {
        Self { store, paginator }
    }

    /// Opens the SQLite store named by `cfg` and wires the adapter.
    pub fn open(cfg: &CoreConfig) -> Result<Self> {
        let db_path = cfg.db_path()?;
        let db = SqliteStore::open(&db_path)?;
        db.health_check()?;
        info!(db = %db_path.display(), page_size = cfg.page_size(), "composer ready");
        let store = EntityStore::new(Arc::new(db)).with_retry_backoff(cfg.retry_backoff());
        Ok(Self::new(store, Paginator::new(cfg.page_size())))
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    pub async fn compose(
        &self,
        view: ViewType,
        params: &ViewParams,
        viewer: Option<Identifier>,
    ) -> Result<ViewData, ComposeError> {
        self.compose_with_cancel(view, params, viewer, &CancellationToken::new())
            .await
    }

    pub async fn compose_with_cancel(
        &self,
        view: ViewType,
        params: &ViewParams,
        viewer: Option<Identifier>,
        cancel: &CancellationToken,
    ) -> Result<ViewData, ComposeError> {
        let req = Request { params, viewer, cancel };
        let mut stages = StageTracker::new(view, cancel);
        let out = match view {
            ViewType::ChannelProfile => views::channel_profile(self, &req, &mut stages).await,
            ViewType::WatchHistory => views::watch_history(self, &req, &mut stages).await,
            ViewType::VideoFeed => views::video_feed(self, &req, &mut stages).await,
            ViewType::PostFeed => views::post_feed(self, &req, &mut stages).await,
            ViewType::CommentFeed => views::comment_feed(self, &req, &mut stages).await,
            ViewType::LikedVideosFeed => views::liked_videos_feed(self, &req, &mut stages).await,
            ViewType::ChannelDashboard => views::channel_dashboard(self, &req, &mut stages).await,
            ViewType::ChannelVideos => views::channel_videos(self, &req, &mut stages).await,
            ViewType::VideoDetail => views::video_detail(self, &req, &mut stages).await,
        };
        let out = out.and_then(|data| stages.finish().map(|()| data));
        if let Err(e) = &out {
            match e.error {
                ViewError::Shape(_) | ViewError::Internal(_) => {
                    warn!(view = %e.view, stage = %e.stage, "view composition failed: {}", e.error)
                }
                _ => debug!(view = %e.view, stage = %e.stage, "view composition failed: {}", e.error),
            }
        }
        out
    }
}

/// One composition request as the view functions see it.
pub(crate) struct Request<'a> {
    pub params: &'a ViewParams,
    pub viewer: Option<Identifier>,
    pub cancel: &'a CancellationToken,
}
