use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::Args;
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::cli::utils::{output_detail, output_success};
use crate::cli::OutputFormat;
use crate::config;
use crate::database::catalog::{
    NewBusinessCategory, NewBusinessPost, NewCategory, NewEvent, NewOtherPost, NewPost,
};
use crate::database::postgres::PgStore;

#[derive(Debug, Args)]
pub struct SeedArgs {
    #[arg(help = "Path to the YAML fixture")]
    pub file: PathBuf,
}

/// Catalog fixture. Posts refer to groups, events and categories by name.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFixture {
    pub groups: Vec<String>,
    pub events: Vec<NewEvent>,
    pub categories: Vec<NewCategory>,
    pub business_categories: Vec<NewBusinessCategory>,
    pub posts: Vec<SeedPost>,
    pub other_posts: Vec<SeedOtherPost>,
    pub business_posts: Vec<SeedBusinessPost>,
}

#[derive(Debug, Deserialize)]
pub struct SeedPost {
    pub event: String,
    pub group: Option<String>,
    pub file: Option<String>,
    pub file_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedOtherPost {
    pub category: String,
    pub group: Option<String>,
    pub file: Option<String>,
    pub file_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedBusinessPost {
    pub business_category: Option<String>,
    pub group: Option<String>,
    pub profession_type: Option<String>,
    pub file: Option<String>,
    pub file_type: Option<String>,
}

impl SeedFixture {
    pub fn from_yaml(source: &str) -> anyhow::Result<Self> {
        let fixture: SeedFixture = serde_yaml::from_str(source).context("invalid seed fixture")?;
        fixture.check_references()?;
        Ok(fixture)
    }

    /// Every name a post refers to must be declared in the same fixture
    fn check_references(&self) -> anyhow::Result<()> {
        let groups: HashSet<&str> = self.groups.iter().map(String::as_str).collect();
        let events: HashSet<&str> = self.events.iter().map(|e| e.name.as_str()).collect();
        let categories: HashSet<&str> = self.categories.iter().map(|c| c.name.as_str()).collect();
        let business: HashSet<&str> = self.business_categories.iter().map(|c| c.name.as_str()).collect();

        let mut missing = Vec::new();
        for post in &self.posts {
            note_missing(&mut missing, &events, "event", Some(post.event.as_str()));
            note_missing(&mut missing, &groups, "group", post.group.as_deref());
        }
        for post in &self.other_posts {
            note_missing(&mut missing, &categories, "category", Some(post.category.as_str()));
            note_missing(&mut missing, &groups, "group", post.group.as_deref());
        }
        for post in &self.business_posts {
            note_missing(&mut missing, &business, "business category", post.business_category.as_deref());
            note_missing(&mut missing, &groups, "group", post.group.as_deref());
        }

        if !missing.is_empty() {
            bail!("fixture refers to undeclared {}", missing.join(", "));
        }
        Ok(())
    }
}

fn note_missing(missing: &mut Vec<String>, declared: &HashSet<&str>, what: &str, name: Option<&str>) {
    if let Some(name) = name {
        if !declared.contains(name) {
            missing.push(format!("{} '{}'", what, name));
        }
    }
}

fn lookup(ids: &HashMap<String, i64>, name: Option<&str>) -> Option<i64> {
    name.and_then(|n| ids.get(n).copied())
}

fn require(ids: &HashMap<String, i64>, what: &str, name: &str) -> anyhow::Result<i64> {
    ids.get(name)
        .copied()
        .with_context(|| format!("{} '{}' was not stored", what, name))
}

pub async fn handle(args: SeedArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    let fixture = SeedFixture::from_yaml(&source)?;
    if let Some(earliest) = earliest_event(&fixture) {
        if earliest < config::today() {
            tracing::warn!("Fixture contains events dated before today (earliest {})", earliest);
        }
    }
    seed(&PgStore::new(), &fixture, output_format).await
}

async fn seed(db: &PgStore, fixture: &SeedFixture, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut group_ids = HashMap::new();
    for name in &fixture.groups {
        let group = db.insert_group(name).await?;
        output_detail(output_format, &format!("group {} '{}'", group.id, group.name));
        group_ids.insert(group.name, group.id);
    }

    let mut event_ids = HashMap::new();
    for event in &fixture.events {
        let stored = db.insert_event(event).await?;
        event_ids.insert(stored.name, stored.id);
    }

    let mut category_ids = HashMap::new();
    for category in &fixture.categories {
        let stored = db.insert_category(category).await?;
        category_ids.insert(stored.name, stored.id);
    }

    let mut business_ids = HashMap::new();
    for category in &fixture.business_categories {
        let stored = db.insert_business_category(category).await?;
        business_ids.insert(stored.name, stored.id);
    }

    for post in &fixture.posts {
        db.insert_post(&NewPost {
            event_id: require(&event_ids, "event", &post.event)?,
            group_id: lookup(&group_ids, post.group.as_deref()),
            file_type: post.file_type.clone(),
            file: post.file.clone(),
        })
        .await?;
    }
    for post in &fixture.other_posts {
        db.insert_other_post(&NewOtherPost {
            category_id: require(&category_ids, "category", &post.category)?,
            group_id: lookup(&group_ids, post.group.as_deref()),
            file_type: post.file_type.clone(),
            file: post.file.clone(),
        })
        .await?;
    }
    for post in &fixture.business_posts {
        db.insert_business_post(&NewBusinessPost {
            business_category_id: lookup(&business_ids, post.business_category.as_deref()),
            group_id: lookup(&group_ids, post.group.as_deref()),
            profession_type: post.profession_type.clone(),
            file_type: post.file_type.clone(),
            file: post.file.clone(),
        })
        .await?;
    }

    output_success(
        output_format,
        "Fixture loaded; run `posterctl resync` to map new posts onto existing frames",
        Some(json!({
            "groups": fixture.groups.len(),
            "events": fixture.events.len(),
            "posts": fixture.posts.len() + fixture.other_posts.len() + fixture.business_posts.len(),
        })),
    )
}

/// Earliest event date in the fixture, used to warn about events that
/// are already past when seeding
pub fn earliest_event(fixture: &SeedFixture) -> Option<NaiveDate> {
    fixture.events.iter().map(|e| e.event_date).min()
}
