/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! One function per view type. Each runs exactly the stages listed for its
//! view in [`crate::pipeline::stage_plan`].

use crate::aggregate::{self, Aggregate};
use crate::entity_store::{for_each_joined_mut, Document, Filter, FindQuery, SortDirection};
use crate::error::{ComposeError, ViewError, ViewResult};
use crate::join_resolver::{self, JoinSpec};
use crate::model::{derived, fields, joined, Collection, Target, TargetKind};
use crate::paginator::{PageWindow, SortField, SortPolicy, CREATED_AT, NEWEST_FIRST};
use crate::pipeline::{Composer, Request, Stage, StageTracker};
use crate::projector::{self, project_many, Project};
use crate::store_adapter::EntityStore;
use crate::viewer_context::{self, MembershipFlag};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use vidhub_protocol::{
    ChannelProfileView, ChannelStats, ChannelVideoView, CommentView, Identifier, LikedVideoView, MediaSummaryView,
    PostView, VideoCardView, VideoDetailView, ViewData,
};

type Composed = Result<ViewData, ComposeError>;

const VIDEO_SORT: SortPolicy = SortPolicy {
    fields: &[
        CREATED_AT,
        SortField::new("views", fields::VIEWS),
        SortField::new("duration", fields::DURATION_SECS),
        SortField::new("title", fields::TITLE),
    ],
    default_field: "createdAt",
    default_direction: SortDirection::Desc,
};

const LIKES_COUNT: Aggregate = Aggregate::Count {
    of: joined::LIKES,
    into: derived::LIKES_COUNT,
};
const SUBSCRIBERS_COUNT: Aggregate = Aggregate::Count {
    of: joined::SUBSCRIBERS,
    into: derived::SUBSCRIBERS_COUNT,
};
const IS_LIKED: MembershipFlag = MembershipFlag {
    of: joined::LIKES,
    actor_field: fields::ACTOR,
    into: derived::IS_LIKED,
};
const IS_SUBSCRIBED: MembershipFlag = MembershipFlag {
    of: joined::SUBSCRIBERS,
    actor_field: fields::SOURCE,
    into: derived::IS_SUBSCRIBED,
};

fn owner_join() -> JoinSpec {
    JoinSpec::new(Collection::Accounts, fields::OWNER, fields::ID, joined::OWNER)
}

fn likes_join(kind: TargetKind) -> JoinSpec {
    JoinSpec::new(Collection::Reactions, fields::ID, fields::TARGET_ID, joined::LIKES).of_kind(kind)
}

fn subscribers_join() -> JoinSpec {
    JoinSpec::new(Collection::FollowEdges, fields::ID, fields::TARGET, joined::SUBSCRIBERS)
}

fn id_param(raw: Option<&str>, name: &str) -> ViewResult<Option<Identifier>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Identifier::parse(s)
            .map(Some)
            .map_err(|_| ViewError::Validation(format!("`{name}` is not a valid identifier"))),
    }
}

fn required_id(raw: Option<&str>, name: &str) -> ViewResult<Identifier> {
    id_param(raw, name)?.ok_or_else(|| ViewError::Validation(format!("`{name}` is required")))
}

fn required_viewer(viewer: Option<Identifier>) -> ViewResult<Identifier> {
    viewer.ok_or_else(|| ViewError::Validation("this view needs a signed-in viewer".into()))
}

/// `channelId` when given, otherwise the viewer's own channel.
fn channel_param(req: &Request<'_>) -> ViewResult<Identifier> {
    match id_param(req.params.channel_id.as_deref(), "channelId")? {
        Some(id) => Ok(id),
        None => required_viewer(req.viewer),
    }
}

async fn find_one(
    store: &EntityStore,
    collection: Collection,
    filter: Filter,
    cancel: &CancellationToken,
) -> ViewResult<Option<Document>> {
    let rows = store
        .find(collection, &FindQuery::new(filter).window(0, Some(1)), cancel)
        .await?;
    Ok(rows.into_iter().next())
}

fn single(rows: Vec<Document>) -> ViewResult<Document> {
    rows.into_iter()
        .next()
        .ok_or_else(|| ViewError::Internal("join dropped the base row".into()))
}

/// Page rows and the total behind them are fetched concurrently, then joined.
async fn fetch_page(
    store: &EntityStore,
    collection: Collection,
    filter: Filter,
    window: &PageWindow,
    joins: &[JoinSpec],
    cancel: &CancellationToken,
) -> ViewResult<(Vec<Document>, u64)> {
    let query = window.query(filter.clone());
    let (rows, total) = tokio::try_join!(
        store.find(collection, &query, cancel),
        store.count(collection, &filter, cancel),
    )?;
    let rows = join_resolver::resolve(store, rows, joins, cancel).await?;
    Ok((rows, total))
}

pub(crate) async fn channel_profile(c: &Composer, req: &Request<'_>, t: &mut StageTracker<'_>) -> Composed {
    let username = t.step(Stage::ParametersValidated, || {
        req.params
            .username
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ViewError::Validation("`username` is required".into()))
    })?;

    let store = c.store();
    let joins = [
        subscribers_join(),
        JoinSpec::new(Collection::FollowEdges, fields::ID, fields::SOURCE, joined::SUBSCRIBED_TO),
    ];
    let mut graph = t
        .run(Stage::Joined, async {
            let account = find_one(store, Collection::Accounts, Filter::eq(fields::USERNAME, username.as_str()), req.cancel)
                .await?
                .ok_or_else(|| ViewError::NotFound(format!("channel `{username}`")))?;
            single(join_resolver::resolve(store, vec![account], &joins, req.cancel).await?)
        })
        .await?;

    t.step(Stage::Aggregated, || {
        aggregate::apply(
            &mut graph,
            &[
                SUBSCRIBERS_COUNT,
                Aggregate::Count {
                    of: joined::SUBSCRIBED_TO,
                    into: derived::SUBSCRIBED_TO_COUNT,
                },
            ],
        )
    })?;
    t.step(Stage::Enriched, || {
        viewer_context::apply(&mut graph, &[IS_SUBSCRIBED], req.viewer.as_ref())
    })?;
    let view = t.step(Stage::Projected, || ChannelProfileView::project(&graph))?;
    Ok(ViewData::ChannelProfile(view))
}

pub(crate) async fn watch_history(c: &Composer, req: &Request<'_>, t: &mut StageTracker<'_>) -> Composed {
    let viewer = t.step(Stage::ParametersValidated, || required_viewer(req.viewer))?;

    let store = c.store();
    let joins = [
        JoinSpec::new(Collection::MediaItems, fields::WATCH_HISTORY, fields::ID, joined::HISTORY).with(owner_join()),
    ];
    let graph = t
        .run(Stage::Joined, async {
            let account = find_one(store, Collection::Accounts, Filter::eq(fields::ID, viewer), req.cancel)
                .await?
                .ok_or_else(|| ViewError::NotFound(format!("account {viewer}")))?;
            single(join_resolver::resolve(store, vec![account], &joins, req.cancel).await?)
        })
        .await?;

    let items = t.step(Stage::Projected, || {
        projector::project_joined::<MediaSummaryView>(&graph, joined::HISTORY)
    })?;
    Ok(ViewData::WatchHistory(items))
}

pub(crate) async fn video_feed(c: &Composer, req: &Request<'_>, t: &mut StageTracker<'_>) -> Composed {
    let (owner, query) = t.step(Stage::ParametersValidated, || {
        let owner = id_param(req.params.owner_id.as_deref(), "ownerId")?;
        let query = req
            .params
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        Ok((owner, query))
    })?;
    let window = t.step(Stage::Paginated, || c.paginator().window(req.params, &VIDEO_SORT))?;

    let mut filter = Filter::eq(fields::IS_PUBLISHED, true);
    if let Some(owner) = owner {
        filter = filter.and(Filter::eq(fields::OWNER, owner));
    }
    if let Some(q) = &query {
        filter = filter.and(Filter::Or(vec![
            Filter::contains_text(fields::TITLE, q),
            Filter::contains_text(fields::DESCRIPTION, q),
        ]));
    }
    let joins = [owner_join(), likes_join(TargetKind::Media)];
    let (mut rows, total) = t
        .run(
            Stage::Joined,
            fetch_page(c.store(), Collection::MediaItems, filter, &window, &joins, req.cancel),
        )
        .await?;

    t.step(Stage::Aggregated, || aggregate::apply_all(&mut rows, &[LIKES_COUNT]))?;
    t.step(Stage::Enriched, || {
        viewer_context::apply_all(&mut rows, &[IS_LIKED], req.viewer.as_ref())
    })?;
    let docs = t.step(Stage::Projected, || project_many::<VideoCardView>(&rows))?;
    Ok(ViewData::VideoFeed(window.page_of(docs, total)))
}

pub(crate) async fn post_feed(c: &Composer, req: &Request<'_>, t: &mut StageTracker<'_>) -> Composed {
    let owner = t.step(Stage::ParametersValidated, || {
        required_id(req.params.owner_id.as_deref(), "ownerId")
    })?;
    let window = t.step(Stage::Paginated, || c.paginator().window(req.params, &NEWEST_FIRST))?;

    let joins = [owner_join(), likes_join(TargetKind::Post)];
    let (mut rows, total) = t
        .run(
            Stage::Joined,
            fetch_page(
                c.store(),
                Collection::Posts,
                Filter::eq(fields::OWNER, owner),
                &window,
                &joins,
                req.cancel,
            ),
        )
        .await?;

    t.step(Stage::Aggregated, || aggregate::apply_all(&mut rows, &[LIKES_COUNT]))?;
    t.step(Stage::Enriched, || {
        viewer_context::apply_all(&mut rows, &[IS_LIKED], req.viewer.as_ref())
    })?;
    let docs = t.step(Stage::Projected, || project_many::<PostView>(&rows))?;
    Ok(ViewData::PostFeed(window.page_of(docs, total)))
}

pub(crate) async fn comment_feed(c: &Composer, req: &Request<'_>, t: &mut StageTracker<'_>) -> Composed {
    let target = t.step(Stage::ParametersValidated, || {
        let media = id_param(req.params.media_id.as_deref(), "mediaId")?;
        let post = id_param(req.params.post_id.as_deref(), "postId")?;
        match (media, post) {
            (Some(id), None) => Ok(Target::media(id)),
            (None, Some(id)) => Ok(Target::post(id)),
            (None, None) => Err(ViewError::Validation("one of `mediaId` or `postId` is required".into())),
            (Some(_), Some(_)) => Err(ViewError::Validation(
                "pass either `mediaId` or `postId`, not both".into(),
            )),
        }
    })?;
    let window = t.step(Stage::Paginated, || c.paginator().window(req.params, &NEWEST_FIRST))?;

    let store = c.store();
    let target_collection = match target.kind {
        TargetKind::Post => Collection::Posts,
        _ => Collection::MediaItems,
    };
    let filter = Filter::eq(fields::TARGET_KIND, target.kind.as_str()).and(Filter::eq(fields::TARGET_ID, target.id));
    let target_filter = Filter::eq(fields::ID, target.id);
    let joins = [owner_join(), likes_join(TargetKind::Comment)];
    let (mut rows, total) = t
        .run(Stage::Joined, async {
            let (exists, page) = tokio::try_join!(
                store.count(target_collection, &target_filter, req.cancel),
                fetch_page(store, Collection::Comments, filter, &window, &joins, req.cancel),
            )?;
            if exists == 0 {
                return Err(ViewError::NotFound(format!("{} {}", target.kind.as_str(), target.id)));
            }
            Ok(page)
        })
        .await?;

    t.step(Stage::Aggregated, || aggregate::apply_all(&mut rows, &[LIKES_COUNT]))?;
    t.step(Stage::Enriched, || {
        viewer_context::apply_all(&mut rows, &[IS_LIKED], req.viewer.as_ref())
    })?;
    let docs = t.step(Stage::Projected, || project_many::<CommentView>(&rows))?;
    Ok(ViewData::CommentFeed(window.page_of(docs, total)))
}

pub(crate) async fn liked_videos_feed(c: &Composer, req: &Request<'_>, t: &mut StageTracker<'_>) -> Composed {
    let viewer = t.step(Stage::ParametersValidated, || required_viewer(req.viewer))?;
    let window = t.step(Stage::Paginated, || c.paginator().window(req.params, &NEWEST_FIRST))?;

    let filter = Filter::eq(fields::ACTOR, viewer).and(Filter::eq(fields::TARGET_KIND, TargetKind::Media.as_str()));
    let joins = [JoinSpec::new(Collection::MediaItems, fields::TARGET_ID, fields::ID, joined::MEDIA).with(owner_join())];
    let (rows, total) = t
        .run(
            Stage::Joined,
            fetch_page(c.store(), Collection::Reactions, filter, &window, &joins, req.cancel),
        )
        .await?;

    let docs = t.step(Stage::Projected, || {
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            if projector::first_joined(row, joined::MEDIA)?.is_some() {
                out.push(LikedVideoView::project(row)?);
            }
        }
        Ok(out)
    })?;
    Ok(ViewData::LikedVideosFeed(window.page_of(docs, total)))
}

pub(crate) async fn channel_dashboard(c: &Composer, req: &Request<'_>, t: &mut StageTracker<'_>) -> Composed {
    let channel = t.step(Stage::ParametersValidated, || channel_param(req))?;

    let store = c.store();
    let account_filter = Filter::eq(fields::ID, channel);
    let subscribers_filter = Filter::eq(fields::TARGET, channel);
    let media_query = FindQuery::new(Filter::eq(fields::OWNER, channel));
    let joins = [likes_join(TargetKind::Media)];
    let (graph, subscribers) = t
        .run(Stage::Joined, async {
            let (accounts, subscribers, media) = tokio::try_join!(
                store.count(Collection::Accounts, &account_filter, req.cancel),
                store.count(Collection::FollowEdges, &subscribers_filter, req.cancel),
                async {
                    let media = store.find(Collection::MediaItems, &media_query, req.cancel).await?;
                    join_resolver::resolve(store, media, &joins, req.cancel).await
                },
            )?;
            if accounts == 0 {
                return Err(ViewError::NotFound(format!("channel {channel}")));
            }
            let mut graph = Document::new();
            graph.insert(
                joined::MEDIA.to_string(),
                Value::Array(media.into_iter().map(Value::Object).collect()),
            );
            Ok((graph, subscribers))
        })
        .await?;

    let stats = t.step(Stage::Aggregated, || {
        Ok(ChannelStats {
            total_subscribers: subscribers,
            total_videos: aggregate::count(&graph, joined::MEDIA)?,
            total_views: aggregate::sum(&graph, joined::MEDIA, fields::VIEWS)?,
            total_likes: aggregate::sum_of_counts(&graph, joined::MEDIA, joined::LIKES)?,
        })
    })?;
    Ok(ViewData::ChannelDashboard(stats))
}

pub(crate) async fn channel_videos(c: &Composer, req: &Request<'_>, t: &mut StageTracker<'_>) -> Composed {
    let channel = t.step(Stage::ParametersValidated, || channel_param(req))?;
    let window = t.step(Stage::Paginated, || c.paginator().window(req.params, &VIDEO_SORT))?;

    let mut filter = Filter::eq(fields::OWNER, channel);
    if req.viewer != Some(channel) {
        filter = filter.and(Filter::eq(fields::IS_PUBLISHED, true));
    }
    let joins = [likes_join(TargetKind::Media)];
    let (mut rows, total) = t
        .run(
            Stage::Joined,
            fetch_page(c.store(), Collection::MediaItems, filter, &window, &joins, req.cancel),
        )
        .await?;

    t.step(Stage::Aggregated, || aggregate::apply_all(&mut rows, &[LIKES_COUNT]))?;
    let docs = t.step(Stage::Projected, || project_many::<ChannelVideoView>(&rows))?;
    Ok(ViewData::ChannelVideos(window.page_of(docs, total)))
}

/// Unpublished media exist only for their owner.
fn visible_to(media: &Document, viewer: Option<&Identifier>) -> ViewResult<bool> {
    if media.get(fields::IS_PUBLISHED).and_then(Value::as_bool).unwrap_or(false) {
        return Ok(true);
    }
    let Some(viewer) = viewer else {
        return Ok(false);
    };
    Ok(join_resolver::local_keys(media, fields::OWNER)?.first() == Some(viewer))
}

pub(crate) async fn video_detail(c: &Composer, req: &Request<'_>, t: &mut StageTracker<'_>) -> Composed {
    let media_id = t.step(Stage::ParametersValidated, || {
        required_id(req.params.media_id.as_deref(), "mediaId")
    })?;

    let store = c.store();
    let joins = [
        owner_join().with(subscribers_join()),
        likes_join(TargetKind::Media),
        JoinSpec::new(Collection::Comments, fields::ID, fields::TARGET_ID, joined::COMMENTS).of_kind(TargetKind::Media),
    ];
    let mut graph = t
        .run(Stage::Joined, async {
            let not_found = || ViewError::NotFound(format!("media {media_id}"));
            let media = find_one(store, Collection::MediaItems, Filter::eq(fields::ID, media_id), req.cancel)
                .await?
                .ok_or_else(not_found)?;
            if !visible_to(&media, req.viewer.as_ref())? {
                return Err(not_found());
            }
            single(join_resolver::resolve(store, vec![media], &joins, req.cancel).await?)
        })
        .await?;

    t.step(Stage::Aggregated, || {
        aggregate::apply(
            &mut graph,
            &[
                LIKES_COUNT,
                Aggregate::Count {
                    of: joined::COMMENTS,
                    into: derived::COMMENTS_COUNT,
                },
            ],
        )?;
        for_each_joined_mut(&mut graph, joined::OWNER, |owner| {
            aggregate::apply(owner, &[SUBSCRIBERS_COUNT])
        })
    })?;
    t.step(Stage::Enriched, || {
        viewer_context::apply(&mut graph, &[IS_LIKED], req.viewer.as_ref())?;
        for_each_joined_mut(&mut graph, joined::OWNER, |owner| {
            viewer_context::apply(owner, &[IS_SUBSCRIBED], req.viewer.as_ref())
        })
    })?;
    let view = t.step(Stage::Projected, || VideoDetailView::project(&graph))?;
    Ok(ViewData::VideoDetail(view))
}
