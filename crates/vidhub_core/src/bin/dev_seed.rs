/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use tracing::info;
use vidhub_core::config::{load_config_file, parse_config_path};
use vidhub_core::model::{Account, Comment, FollowEdge, MediaItem, Post, Reaction, Target};
use vidhub_core::sqlite_store::SqliteStore;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let cfg_path = parse_config_path(std::env::args().skip(1))?;
    let cfg = load_config_file(&cfg_path)?;
    let db_path = cfg.db_path()?;
    let db = SqliteStore::open(&db_path)?;
    info!("seeding {}", db_path.display());

    let mut accounts = Vec::new();
    for (username, display) in [("alice", "Alice Liddell"), ("bob", "Bob Builder"), ("carol", "Carol Danvers")] {
        let mut a = Account::new(username, display, &format!("{username}@example.com"));
        a.avatar_ref = Some(format!("avatars/{username}.png"));
        accounts.push(a);
    }
    let [alice, bob, carol] = [&accounts[0], &accounts[1], &accounts[2]];

    let mut media = Vec::new();
    for (i, title) in ["Rust in ten minutes", "Async without tears", "Draft: ownership deep dive"]
        .iter()
        .enumerate()
    {
        let mut m = MediaItem::new(alice.id, title);
        m.description = format!("Episode {} of the alice channel", i + 1);
        m.duration_secs = 600.0 + 120.0 * i as f64;
        m.views = 100 * (i as i64 + 1);
        m.is_published = !title.starts_with("Draft");
        media.push(m);
    }
    let bob_clip = MediaItem::new(bob.id, "Building a shed");
    media.push(bob_clip.clone());

    let post = Post::new(alice.id, "New video every Friday.");
    let comments = [
        Comment::new(bob.id, Target::media(media[0].id), "Great intro!")?,
        Comment::new(carol.id, Target::media(media[0].id), "Could you cover lifetimes next?")?,
        Comment::new(carol.id, Target::post(post.id), "See you Friday")?,
    ];
    let reactions = [
        Reaction::new(bob.id, Target::media(media[0].id)),
        Reaction::new(carol.id, Target::media(media[0].id)),
        Reaction::new(carol.id, Target::media(media[1].id)),
        Reaction::new(alice.id, Target::media(bob_clip.id)),
        Reaction::new(bob.id, Target::post(post.id)),
        Reaction::new(alice.id, Target::comment(comments[0].id)),
    ];
    let edges = [
        FollowEdge::new(bob.id, alice.id)?,
        FollowEdge::new(carol.id, alice.id)?,
        FollowEdge::new(alice.id, bob.id)?,
    ];

    let mut viewer = carol.clone();
    viewer.watch_history = vec![media[1].id, bob_clip.id, media[0].id];

    for a in [alice, bob] {
        db.insert(a).context("insert account")?;
    }
    db.insert(&viewer).context("insert account")?;
    for m in &media {
        db.insert(m).context("insert media")?;
    }
    db.insert(&post).context("insert post")?;
    for c in &comments {
        db.insert(c).context("insert comment")?;
    }
    for r in &reactions {
        db.insert(r).context("insert reaction")?;
    }
    for e in &edges {
        db.insert(e).context("insert follow edge")?;
    }

    info!(
        accounts = accounts.len(),
        media = media.len(),
        comments = comments.len(),
        reactions = reactions.len(),
        follows = edges.len(),
        "seed complete"
    );
    for a in &accounts {
        println!("{} {}", a.username, a.id);
    }
    println!("media {}", media[0].id);
    println!("post {}", post.id);
    Ok(())
}
