// ABOUTME: NewPipe database (version 9) records, reader and writer
// ABOUTME: Foreign keys are resolved on read and re-assigned on write

use super::merge::{
    GroupExtension, GroupRecord, MergePlan, MergeStats, PlaylistExtension, PlaylistRecord,
    RecordSet, SubscriptionRecord, VideoRecord,
};
use super::{optional_table, query_all, require_table, BackupFormat, BackupSchema, Entity};
use crate::config::BackupConfig;
use crate::error::{ConversionError, Result};
use crate::ids::{normalize_channel_id, normalize_video_id};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;

/// `service_id` of YouTube
pub const YOUTUBE_SERVICE_ID: i64 = 0;

pub const DEFAULT_STREAM_TYPE: &str = "VIDEO_STREAM";

/// `thumbnail_stream_id` of a playlist without a thumbnail
pub const NO_THUMBNAIL_STREAM: i64 = -1;

pub const SUBSCRIPTION_COLUMNS: &[&str] = &[
    "service_id",
    "url",
    "name",
    "avatar_url",
    "subscriber_count",
    "description",
    "notification_mode",
];

pub const STREAM_COLUMNS: &[&str] = &[
    "service_id",
    "url",
    "title",
    "stream_type",
    "duration",
    "uploader",
    "uploader_url",
    "thumbnail_url",
    "view_count",
    "textual_upload_date",
    "upload_date",
    "is_upload_date_approximation",
];

pub const FEED_GROUP_COLUMNS: &[&str] = &["name", "icon_id", "sort_order"];

pub const PLAYLIST_COLUMNS: &[&str] = &[
    "name",
    "is_thumbnail_permanent",
    "thumbnail_stream_id",
    "display_index",
];

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS subscriptions (
    uid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    service_id INTEGER NOT NULL,
    url TEXT,
    name TEXT,
    avatar_url TEXT,
    subscriber_count INTEGER,
    description TEXT,
    notification_mode INTEGER NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS index_subscriptions_service_id_url
    ON subscriptions (service_id, url);

CREATE TABLE IF NOT EXISTS streams (
    uid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    service_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    stream_type TEXT NOT NULL,
    duration INTEGER NOT NULL,
    uploader TEXT NOT NULL,
    uploader_url TEXT,
    thumbnail_url TEXT,
    view_count INTEGER,
    textual_upload_date TEXT,
    upload_date INTEGER,
    is_upload_date_approximation INTEGER
);
CREATE UNIQUE INDEX IF NOT EXISTS index_streams_service_id_url
    ON streams (service_id, url);

CREATE TABLE IF NOT EXISTS playlists (
    uid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT,
    is_thumbnail_permanent INTEGER NOT NULL,
    thumbnail_stream_id INTEGER NOT NULL,
    display_index INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS playlist_stream_join (
    playlist_id INTEGER NOT NULL,
    stream_id INTEGER NOT NULL,
    join_index INTEGER NOT NULL,
    PRIMARY KEY(playlist_id, join_index),
    FOREIGN KEY(playlist_id) REFERENCES playlists(uid)
        ON UPDATE CASCADE ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
    FOREIGN KEY(stream_id) REFERENCES streams(uid)
        ON UPDATE CASCADE ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
);
CREATE UNIQUE INDEX IF NOT EXISTS index_playlist_stream_join_playlist_id_join_index
    ON playlist_stream_join (playlist_id, join_index);
CREATE INDEX IF NOT EXISTS index_playlist_stream_join_stream_id
    ON playlist_stream_join (stream_id);

CREATE TABLE IF NOT EXISTS remote_playlists (
    uid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    service_id INTEGER NOT NULL,
    name TEXT,
    url TEXT,
    thumbnail_url TEXT,
    uploader TEXT,
    display_index INTEGER NOT NULL,
    stream_count INTEGER
);
CREATE UNIQUE INDEX IF NOT EXISTS index_remote_playlists_service_id_url
    ON remote_playlists (service_id, url);

CREATE TABLE IF NOT EXISTS search_history (
    creation_date INTEGER,
    service_id INTEGER NOT NULL,
    search TEXT,
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL
);
CREATE INDEX IF NOT EXISTS index_search_history_search ON search_history (search);

CREATE TABLE IF NOT EXISTS feed (
    stream_id INTEGER NOT NULL,
    subscription_id INTEGER NOT NULL,
    PRIMARY KEY(stream_id, subscription_id),
    FOREIGN KEY(stream_id) REFERENCES streams(uid)
        ON UPDATE CASCADE ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
    FOREIGN KEY(subscription_id) REFERENCES subscriptions(uid)
        ON UPDATE CASCADE ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
);
CREATE INDEX IF NOT EXISTS index_feed_subscription_id ON feed (subscription_id);

CREATE TABLE IF NOT EXISTS feed_group (
    uid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL,
    icon_id INTEGER NOT NULL,
    sort_order INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS index_feed_group_sort_order ON feed_group (sort_order);

CREATE TABLE IF NOT EXISTS feed_group_subscription_join (
    group_id INTEGER NOT NULL,
    subscription_id INTEGER NOT NULL,
    PRIMARY KEY(group_id, subscription_id),
    FOREIGN KEY(group_id) REFERENCES feed_group(uid)
        ON UPDATE CASCADE ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
    FOREIGN KEY(subscription_id) REFERENCES subscriptions(uid)
        ON UPDATE CASCADE ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
);
CREATE INDEX IF NOT EXISTS index_feed_group_subscription_join_subscription_id
    ON feed_group_subscription_join (subscription_id);

CREATE TABLE IF NOT EXISTS feed_last_updated (
    subscription_id INTEGER PRIMARY KEY NOT NULL,
    last_updated INTEGER,
    FOREIGN KEY(subscription_id) REFERENCES subscriptions(uid)
        ON UPDATE CASCADE ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
);
";

const HISTORY_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS stream_history (
    stream_id INTEGER NOT NULL,
    access_date INTEGER NOT NULL,
    repeat_count INTEGER NOT NULL,
    PRIMARY KEY(stream_id, access_date),
    FOREIGN KEY(stream_id) REFERENCES streams(uid)
        ON UPDATE CASCADE ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
);
CREATE INDEX IF NOT EXISTS index_stream_history_stream_id ON stream_history (stream_id);

CREATE TABLE IF NOT EXISTS stream_state (
    stream_id INTEGER NOT NULL,
    progress_time INTEGER NOT NULL,
    PRIMARY KEY(stream_id),
    FOREIGN KEY(stream_id) REFERENCES streams(uid)
        ON UPDATE CASCADE ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
);
";

#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub service_id: i64,
    pub url: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub subscriber_count: Option<i64>,
    pub description: Option<String>,
    pub notification_mode: i64,
}

/// A feed group; members are normalized channel ids
#[derive(Debug, Clone, PartialEq)]
pub struct FeedGroup {
    pub name: String,
    pub icon_id: i64,
    pub sort_order: i64,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub service_id: i64,
    pub url: String,
    pub title: String,
    pub stream_type: String,
    /// Seconds
    pub duration: i64,
    pub uploader: String,
    pub uploader_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub view_count: Option<i64>,
    pub textual_upload_date: Option<String>,
    /// Milliseconds since the epoch
    pub upload_date: Option<i64>,
    pub is_upload_date_approximation: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub name: String,
    pub is_thumbnail_permanent: bool,
    /// Thumbnail of the stream referenced by `thumbnail_stream_id`
    pub thumbnail_url: Option<String>,
    pub display_index: i64,
    pub streams: Vec<Stream>,
}

/// Latest access to one stream
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub stream: Stream,
    /// Milliseconds since the epoch
    pub access_date: i64,
    pub repeat_count: i64,
    /// Milliseconds into the stream
    pub progress_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPipeRecords {
    pub subscriptions: Vec<Subscription>,
    pub groups: Vec<FeedGroup>,
    pub playlists: Vec<Playlist>,
    pub history: Vec<HistoryEntry>,
}

impl SubscriptionRecord for Subscription {
    fn channel_key(&self) -> String {
        normalize_channel_id(&self.url)
    }
}

impl GroupRecord for FeedGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn members(&self) -> &[String] {
        &self.members
    }

    fn add_member(&mut self, channel_key: String) {
        self.members.push(channel_key);
    }
}

impl VideoRecord for Stream {
    fn video_key(&self) -> String {
        normalize_video_id(&self.url)
    }
}

impl VideoRecord for HistoryEntry {
    fn video_key(&self) -> String {
        self.stream.video_key()
    }
}

impl PlaylistRecord for Playlist {
    type Item = Stream;

    fn name(&self) -> &str {
        &self.name
    }

    fn items(&self) -> &[Stream] {
        &self.streams
    }

    fn push_item(&mut self, item: Stream) {
        self.streams.push(item);
    }
}

impl RecordSet for NewPipeRecords {
    type Subscription = Subscription;
    type Group = FeedGroup;
    type Playlist = Playlist;
    type History = HistoryEntry;

    fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    fn groups(&self) -> &[FeedGroup] {
        &self.groups
    }

    fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}

/// Columns the writer fills for each entity, used to check mapping tables
pub fn written_columns(entity: Entity) -> Vec<&'static str> {
    match entity {
        Entity::Subscription => SUBSCRIPTION_COLUMNS.to_vec(),
        Entity::Group => [FEED_GROUP_COLUMNS, &["subscription_id"]].concat(),
        Entity::Playlist => PLAYLIST_COLUMNS.to_vec(),
        Entity::PlaylistItem => [STREAM_COLUMNS, &["join_index"]].concat(),
        Entity::WatchHistory => [
            STREAM_COLUMNS,
            &["access_date", "repeat_count", "progress_time"],
        ]
        .concat(),
    }
}

pub struct NewPipe;

impl BackupSchema for NewPipe {
    type Records = NewPipeRecords;

    const FORMAT: BackupFormat = BackupFormat::NewPipe;

    fn create_schema(conn: &Connection, config: &BackupConfig) -> Result<()> {
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(HISTORY_SCHEMA)?;
        conn.pragma_update(None, "user_version", config.newpipe_user_version)?;
        tracing::debug!(
            "Created NewPipe schema (user_version {})",
            config.newpipe_user_version
        );
        Ok(())
    }

    fn read_records(conn: &Connection) -> Result<NewPipeRecords> {
        read_records(conn)
    }

    fn apply_plan(conn: &Connection, plan: &MergePlan<NewPipeRecords>) -> Result<MergeStats> {
        apply_plan(conn, plan)
    }
}

/// Read every record NewPipe keeps that the converter understands
///
/// # Errors
///
/// `MalformedImage` if a required table or column is missing, if a
/// non-nullable column holds NULL, or if a join row points at a missing
/// stream.
pub fn read_records(conn: &Connection) -> Result<NewPipeRecords> {
    require_table(conn, "subscriptions", SUBSCRIPTION_COLUMNS)?;
    require_table(conn, "streams", STREAM_COLUMNS)?;
    require_table(conn, "playlists", PLAYLIST_COLUMNS)?;
    require_table(
        conn,
        "playlist_stream_join",
        &["playlist_id", "stream_id", "join_index"],
    )?;
    require_table(conn, "feed_group", FEED_GROUP_COLUMNS)?;
    require_table(
        conn,
        "feed_group_subscription_join",
        &["group_id", "subscription_id"],
    )?;

    let (subscriptions, channel_keys) = read_subscriptions(conn)?;
    let streams = read_streams(conn)?;
    let playlists = read_playlists(conn, &streams)?;
    let groups = read_groups(conn, &channel_keys)?;
    let history = read_history(conn, &streams)?;

    tracing::info!(
        "Read NewPipe backup: {} subscriptions, {} groups, {} playlists, {} history entries",
        subscriptions.len(),
        groups.len(),
        playlists.len(),
        history.len()
    );

    Ok(NewPipeRecords {
        subscriptions,
        groups,
        playlists,
        history,
    })
}

fn read_subscriptions(conn: &Connection) -> Result<(Vec<Subscription>, HashMap<i64, String>)> {
    let rows = query_all(
        conn,
        "subscriptions",
        "SELECT uid, service_id, url, name, avatar_url, subscriber_count, description,
                notification_mode
         FROM subscriptions ORDER BY uid",
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<i64>>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, i64>(7)?,
            ))
        },
    )?;

    let mut subscriptions = Vec::with_capacity(rows.len());
    let mut channel_keys = HashMap::with_capacity(rows.len());

    for (uid, service_id, url, name, avatar_url, subscriber_count, description, notification_mode) in rows {
        let Some(url) = url else {
            tracing::warn!("Skipping subscription {} without a URL", uid);
            continue;
        };
        channel_keys.insert(uid, normalize_channel_id(&url));
        subscriptions.push(Subscription {
            service_id,
            url,
            name: name.unwrap_or_default(),
            avatar_url,
            subscriber_count,
            description,
            notification_mode,
        });
    }

    Ok((subscriptions, channel_keys))
}

fn read_streams(conn: &Connection) -> Result<HashMap<i64, Stream>> {
    let rows = query_all(
        conn,
        "streams",
        "SELECT uid, service_id, url, title, stream_type, duration, uploader, uploader_url,
                thumbnail_url, view_count, textual_upload_date, upload_date,
                is_upload_date_approximation
         FROM streams",
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Stream {
                    service_id: row.get(1)?,
                    url: row.get(2)?,
                    title: row.get(3)?,
                    stream_type: row.get(4)?,
                    duration: row.get(5)?,
                    uploader: row.get(6)?,
                    uploader_url: row.get(7)?,
                    thumbnail_url: row.get(8)?,
                    view_count: row.get(9)?,
                    textual_upload_date: row.get(10)?,
                    upload_date: row.get(11)?,
                    is_upload_date_approximation: row.get(12)?,
                },
            ))
        },
    )?;
    Ok(rows.into_iter().collect())
}

fn lookup_stream<'a>(streams: &'a HashMap<i64, Stream>, stream_id: i64, table: &str) -> Result<&'a Stream> {
    streams.get(&stream_id).ok_or_else(|| {
        ConversionError::malformed(format!(
            "{} references stream {} which does not exist",
            table, stream_id
        ))
    })
}

fn read_playlists(conn: &Connection, streams: &HashMap<i64, Stream>) -> Result<Vec<Playlist>> {
    let rows = query_all(
        conn,
        "playlists",
        "SELECT uid, name, is_thumbnail_permanent, thumbnail_stream_id, display_index
         FROM playlists ORDER BY uid",
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, i64>(4)?,
            ))
        },
    )?;

    let joins = query_all(
        conn,
        "playlist_stream_join",
        "SELECT playlist_id, stream_id FROM playlist_stream_join
         ORDER BY playlist_id, join_index",
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
    )?;

    let mut items: HashMap<i64, Vec<Stream>> = HashMap::new();
    for (playlist_id, stream_id) in joins {
        let stream = lookup_stream(streams, stream_id, "playlist_stream_join")?;
        items.entry(playlist_id).or_default().push(stream.clone());
    }

    let playlists = rows
        .into_iter()
        .map(
            |(uid, name, is_thumbnail_permanent, thumbnail_stream_id, display_index)| Playlist {
                name: name.unwrap_or_default(),
                is_thumbnail_permanent,
                thumbnail_url: thumbnail_stream_id
                    .filter(|id| *id != NO_THUMBNAIL_STREAM)
                    .and_then(|id| streams.get(&id))
                    .and_then(|stream| stream.thumbnail_url.clone()),
                display_index,
                streams: items.remove(&uid).unwrap_or_default(),
            },
        )
        .collect();

    Ok(playlists)
}

fn read_groups(conn: &Connection, channel_keys: &HashMap<i64, String>) -> Result<Vec<FeedGroup>> {
    let rows = query_all(
        conn,
        "feed_group",
        "SELECT uid, name, icon_id, sort_order FROM feed_group ORDER BY sort_order, uid",
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        },
    )?;

    let joins = query_all(
        conn,
        "feed_group_subscription_join",
        "SELECT group_id, subscription_id FROM feed_group_subscription_join
         ORDER BY group_id, subscription_id",
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
    )?;

    let mut members: HashMap<i64, Vec<String>> = HashMap::new();
    for (group_id, subscription_id) in joins {
        match channel_keys.get(&subscription_id) {
            Some(key) => members.entry(group_id).or_default().push(key.clone()),
            None => tracing::warn!(
                "Feed group {} references unknown subscription {}",
                group_id,
                subscription_id
            ),
        }
    }

    let mut groups: Vec<FeedGroup> = Vec::with_capacity(rows.len());
    for (uid, name, icon_id, sort_order) in rows {
        let group_members = members.remove(&uid).unwrap_or_default();
        if let Some(first) = groups.iter_mut().find(|g| g.name == name) {
            tracing::warn!("Duplicate feed group name '{}', folding members", name);
            for member in group_members {
                if !first.members.contains(&member) {
                    first.members.push(member);
                }
            }
            continue;
        }
        groups.push(FeedGroup {
            name,
            icon_id,
            sort_order,
            members: group_members,
        });
    }

    Ok(groups)
}

fn read_history(conn: &Connection, streams: &HashMap<i64, Stream>) -> Result<Vec<HistoryEntry>> {
    if !optional_table(
        conn,
        "stream_history",
        &["stream_id", "access_date", "repeat_count"],
    )? {
        return Ok(Vec::new());
    }

    let progress: HashMap<i64, i64> =
        if optional_table(conn, "stream_state", &["stream_id", "progress_time"])? {
            query_all(
                conn,
                "stream_state",
                "SELECT stream_id, progress_time FROM stream_state",
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )?
            .into_iter()
            .collect()
        } else {
            HashMap::new()
        };

    // One entry per stream: its latest access and the total repeat count
    let rows = query_all(
        conn,
        "stream_history",
        "SELECT stream_id, MAX(access_date), SUM(repeat_count) FROM stream_history
         GROUP BY stream_id ORDER BY MAX(access_date), stream_id",
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        },
    )?;

    rows.into_iter()
        .map(|(stream_id, access_date, repeat_count)| {
            let stream = lookup_stream(streams, stream_id, "stream_history")?;
            Ok(HistoryEntry {
                stream: stream.clone(),
                access_date,
                repeat_count,
                progress_ms: progress.get(&stream_id).copied(),
            })
        })
        .collect()
}

/// Stream uids by normalized video id
///
/// Streams are shared between playlists and history, so every insert goes
/// through this index to reuse an existing row for the same video.
struct StreamIndex {
    by_key: HashMap<String, i64>,
}

impl StreamIndex {
    fn load(conn: &Connection) -> Result<Self> {
        let rows = query_all(conn, "streams", "SELECT uid, url FROM streams", |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        let by_key = rows
            .into_iter()
            .map(|(uid, url)| (normalize_video_id(&url), uid))
            .collect();
        Ok(Self { by_key })
    }

    fn uid_for(&mut self, conn: &Connection, stream: &Stream) -> Result<i64> {
        let key = stream.video_key();
        if let Some(uid) = self.by_key.get(&key) {
            return Ok(*uid);
        }

        conn.execute(
            "INSERT INTO streams (service_id, url, title, stream_type, duration, uploader,
                                  uploader_url, thumbnail_url, view_count, textual_upload_date,
                                  upload_date, is_upload_date_approximation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                stream.service_id,
                stream.url,
                stream.title,
                stream.stream_type,
                stream.duration,
                stream.uploader,
                stream.uploader_url,
                stream.thumbnail_url,
                stream.view_count,
                stream.textual_upload_date,
                stream.upload_date,
                stream.is_upload_date_approximation,
            ],
        )?;
        let uid = conn.last_insert_rowid();
        self.by_key.insert(key, uid);
        Ok(uid)
    }
}

/// Write a merge plan into a NewPipe database
///
/// Runs in one transaction; on error nothing is written. Group members
/// without a subscription in the target cannot be joined and are counted in
/// the returned stats as skipped.
pub fn apply_plan(conn: &Connection, plan: &MergePlan<NewPipeRecords>) -> Result<MergeStats> {
    let tx = conn.unchecked_transaction()?;
    let mut stats = plan.stats;

    insert_subscriptions(&tx, &plan.subscriptions)?;
    let subscription_uids = subscription_index(&tx)?;
    stats.group_members_skipped += insert_groups(&tx, &plan.groups, &subscription_uids)?;
    let extension_skips = extend_groups(&tx, &plan.group_extensions, &subscription_uids)?;
    stats.group_members_added = stats.group_members_added.saturating_sub(extension_skips);
    stats.group_members_skipped += extension_skips;

    let mut streams = StreamIndex::load(&tx)?;
    insert_playlists(&tx, &mut streams, &plan.playlists)?;
    extend_playlists(&tx, &mut streams, &plan.playlist_extensions)?;

    if !plan.history.is_empty() {
        tx.execute_batch(HISTORY_SCHEMA)?;
        insert_history(&tx, &mut streams, &plan.history)?;
    }

    tx.commit()?;
    tracing::info!("✓ Wrote NewPipe records ({})", stats);
    Ok(stats)
}

fn insert_subscriptions(conn: &Connection, subscriptions: &[Subscription]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO subscriptions (service_id, url, name, avatar_url, subscriber_count,
                                              description, notification_mode)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for sub in subscriptions {
        stmt.execute(params![
            sub.service_id,
            sub.url,
            sub.name,
            sub.avatar_url,
            sub.subscriber_count,
            sub.description,
            sub.notification_mode,
        ])?;
    }
    Ok(())
}

fn subscription_index(conn: &Connection) -> Result<HashMap<String, i64>> {
    let rows = query_all(
        conn,
        "subscriptions",
        "SELECT uid, url FROM subscriptions WHERE url IS NOT NULL ORDER BY uid",
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
    )?;
    let mut index = HashMap::with_capacity(rows.len());
    for (uid, url) in rows {
        index.entry(normalize_channel_id(&url)).or_insert(uid);
    }
    Ok(index)
}

/// Join members to a group, returning how many had no subscription to join
fn join_group_members(
    conn: &Connection,
    group_uid: i64,
    group_name: &str,
    members: &[String],
    subscription_uids: &HashMap<String, i64>,
) -> Result<usize> {
    let mut skipped = 0;
    for member in members {
        match subscription_uids.get(member) {
            Some(subscription_uid) => {
                conn.execute(
                    "INSERT OR IGNORE INTO feed_group_subscription_join (group_id, subscription_id)
                     VALUES (?1, ?2)",
                    params![group_uid, subscription_uid],
                )?;
            }
            None => {
                tracing::warn!(
                    "Group '{}' member {} has no subscription in the target, skipping",
                    group_name,
                    member
                );
                skipped += 1;
            }
        }
    }
    Ok(skipped)
}

fn insert_groups(
    conn: &Connection,
    groups: &[FeedGroup],
    subscription_uids: &HashMap<String, i64>,
) -> Result<usize> {
    let mut skipped = 0;
    let mut sort_order: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM feed_group",
        [],
        |row| row.get(0),
    )?;

    for group in groups {
        conn.execute(
            "INSERT INTO feed_group (name, icon_id, sort_order) VALUES (?1, ?2, ?3)",
            params![group.name, group.icon_id, sort_order],
        )?;
        let group_uid = conn.last_insert_rowid();
        skipped += join_group_members(conn, group_uid, &group.name, &group.members, subscription_uids)?;
        sort_order += 1;
    }
    Ok(skipped)
}

fn extend_groups(
    conn: &Connection,
    extensions: &[GroupExtension],
    subscription_uids: &HashMap<String, i64>,
) -> Result<usize> {
    let mut skipped = 0;
    for extension in extensions {
        let group_uid: Option<i64> = conn
            .query_row(
                "SELECT uid FROM feed_group WHERE name = ?1 ORDER BY uid LIMIT 1",
                [&extension.group],
                |row| row.get(0),
            )
            .optional()?;
        let Some(group_uid) = group_uid else {
            tracing::warn!("Group '{}' vanished from the target, skipping", extension.group);
            skipped += extension.members.len();
            continue;
        };
        skipped += join_group_members(
            conn,
            group_uid,
            &extension.group,
            &extension.members,
            subscription_uids,
        )?;
    }
    Ok(skipped)
}

fn insert_join_rows(conn: &Connection, playlist_uid: i64, first_index: i64, stream_uids: &[i64]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO playlist_stream_join (playlist_id, stream_id, join_index) VALUES (?1, ?2, ?3)",
    )?;
    for (offset, stream_uid) in stream_uids.iter().enumerate() {
        stmt.execute(params![playlist_uid, stream_uid, first_index + offset as i64])?;
    }
    Ok(())
}

/// Resolve a playlist's thumbnail to one of its stream uids
fn thumbnail_stream_uid(playlist: &Playlist, stream_uids: &[i64]) -> i64 {
    playlist
        .thumbnail_url
        .as_ref()
        .and_then(|thumbnail| {
            playlist
                .streams
                .iter()
                .position(|s| s.thumbnail_url.as_ref() == Some(thumbnail))
        })
        .map(|position| stream_uids[position])
        .or_else(|| stream_uids.first().copied())
        .unwrap_or(NO_THUMBNAIL_STREAM)
}

fn insert_playlists(conn: &Connection, streams: &mut StreamIndex, playlists: &[Playlist]) -> Result<()> {
    for playlist in playlists {
        let stream_uids = playlist
            .streams
            .iter()
            .map(|stream| streams.uid_for(conn, stream))
            .collect::<Result<Vec<i64>>>()?;

        conn.execute(
            "INSERT INTO playlists (name, is_thumbnail_permanent, thumbnail_stream_id, display_index)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                playlist.name,
                playlist.is_thumbnail_permanent,
                thumbnail_stream_uid(playlist, &stream_uids),
                playlist.display_index,
            ],
        )?;
        let playlist_uid = conn.last_insert_rowid();
        insert_join_rows(conn, playlist_uid, 0, &stream_uids)?;
    }
    Ok(())
}

fn extend_playlists(
    conn: &Connection,
    streams: &mut StreamIndex,
    extensions: &[PlaylistExtension<Stream>],
) -> Result<()> {
    for extension in extensions {
        let playlist_uid: Option<i64> = conn
            .query_row(
                "SELECT uid FROM playlists WHERE name = ?1 ORDER BY uid LIMIT 1",
                [&extension.playlist],
                |row| row.get(0),
            )
            .optional()?;
        let Some(playlist_uid) = playlist_uid else {
            tracing::warn!(
                "Playlist '{}' vanished from the target, skipping",
                extension.playlist
            );
            continue;
        };

        let next_index: i64 = conn.query_row(
            "SELECT COALESCE(MAX(join_index), -1) + 1 FROM playlist_stream_join WHERE playlist_id = ?1",
            [playlist_uid],
            |row| row.get(0),
        )?;
        let stream_uids = extension
            .items
            .iter()
            .map(|stream| streams.uid_for(conn, stream))
            .collect::<Result<Vec<i64>>>()?;
        insert_join_rows(conn, playlist_uid, next_index, &stream_uids)?;

        if let Some(first) = stream_uids.first() {
            conn.execute(
                "UPDATE playlists SET thumbnail_stream_id = ?1
                 WHERE uid = ?2 AND thumbnail_stream_id < 0",
                params![first, playlist_uid],
            )?;
        }
    }
    Ok(())
}

fn insert_history(conn: &Connection, streams: &mut StreamIndex, history: &[HistoryEntry]) -> Result<()> {
    for entry in history {
        let stream_uid = streams.uid_for(conn, &entry.stream)?;
        conn.execute(
            "INSERT OR IGNORE INTO stream_history (stream_id, access_date, repeat_count)
             VALUES (?1, ?2, ?3)",
            params![stream_uid, entry.access_date, entry.repeat_count],
        )?;
        if let Some(progress) = entry.progress_ms {
            conn.execute(
                "INSERT OR IGNORE INTO stream_state (stream_id, progress_time) VALUES (?1, ?2)",
                params![stream_uid, progress],
            )?;
        }
    }
    Ok(())
}
