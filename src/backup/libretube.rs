// ABOUTME: LibreTube database records, reader and writer
// ABOUTME: Group membership is a JSON array of channel ids stored on the group row

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

pub const SUBSCRIPTION_COLUMNS: &[&str] = &["channelId", "name", "avatar", "verified"];

pub const GROUP_COLUMNS: &[&str] = &["name", "channels", "index"];

pub const PLAYLIST_COLUMNS: &[&str] = &["name", "thumbnailUrl"];

/// Metadata columns shared by playlist items and history items
pub const VIDEO_COLUMNS: &[&str] = &[
    "videoId",
    "title",
    "uploadDate",
    "uploader",
    "uploaderUrl",
    "uploaderAvatar",
    "thumbnailUrl",
    "duration",
];

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS localSubscription (
    channelId TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    avatar TEXT DEFAULT NULL,
    verified INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY(channelId)
);

CREATE TABLE IF NOT EXISTS subscriptionGroups (
    name TEXT NOT NULL,
    channels TEXT NOT NULL,
    "index" INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY(name)
);

CREATE TABLE IF NOT EXISTS localPlaylist (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL,
    thumbnailUrl TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS localPlaylistItem (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    playlistId INTEGER NOT NULL,
    videoId TEXT NOT NULL,
    title TEXT,
    uploadDate TEXT,
    uploader TEXT,
    uploaderUrl TEXT,
    uploaderAvatar TEXT,
    thumbnailUrl TEXT,
    duration INTEGER
);

CREATE TABLE IF NOT EXISTS searchHistoryItem (
    query TEXT NOT NULL,
    PRIMARY KEY(query)
);

CREATE TABLE IF NOT EXISTS playlistBookmark (
    playlistId TEXT NOT NULL,
    playlistName TEXT,
    thumbnailUrl TEXT,
    uploader TEXT,
    uploaderUrl TEXT,
    uploaderAvatar TEXT,
    videos INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY(playlistId)
);
"#;

const HISTORY_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS watchHistoryItem (
    videoId TEXT NOT NULL,
    title TEXT,
    uploadDate TEXT,
    uploader TEXT,
    uploaderUrl TEXT,
    uploaderAvatar TEXT,
    thumbnailUrl TEXT,
    duration INTEGER,
    PRIMARY KEY(videoId)
);

CREATE TABLE IF NOT EXISTS watchPosition (
    videoId TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY(videoId)
);
";

#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub channel_id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionGroup {
    pub name: String,
    /// Normalized channel ids
    pub channels: Vec<String>,
    pub index: i64,
}

/// Video metadata as LibreTube denormalizes it onto items and history
#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    pub video_id: String,
    pub title: Option<String>,
    /// `YYYY-MM-DD`
    pub upload_date: Option<String>,
    pub uploader: Option<String>,
    /// `/channel/<id>`
    pub uploader_url: Option<String>,
    pub uploader_avatar: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Seconds
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub name: String,
    pub thumbnail_url: String,
    pub items: Vec<Video>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub video: Video,
    /// Milliseconds into the video
    pub position_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibreTubeRecords {
    pub subscriptions: Vec<Subscription>,
    pub groups: Vec<SubscriptionGroup>,
    pub playlists: Vec<Playlist>,
    /// Oldest first
    pub history: Vec<HistoryItem>,
}

impl SubscriptionRecord for Subscription {
    fn channel_key(&self) -> String {
        normalize_channel_id(&self.channel_id)
    }
}

impl GroupRecord for SubscriptionGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn members(&self) -> &[String] {
        &self.channels
    }

    fn add_member(&mut self, channel_key: String) {
        self.channels.push(channel_key);
    }
}

impl VideoRecord for Video {
    fn video_key(&self) -> String {
        normalize_video_id(&self.video_id)
    }
}

impl VideoRecord for HistoryItem {
    fn video_key(&self) -> String {
        self.video.video_key()
    }
}

impl PlaylistRecord for Playlist {
    type Item = Video;

    fn name(&self) -> &str {
        &self.name
    }

    fn items(&self) -> &[Video] {
        &self.items
    }

    fn push_item(&mut self, item: Video) {
        self.items.push(item);
    }
}

impl RecordSet for LibreTubeRecords {
    type Subscription = Subscription;
    type Group = SubscriptionGroup;
    type Playlist = Playlist;
    type History = HistoryItem;

    fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    fn groups(&self) -> &[SubscriptionGroup] {
        &self.groups
    }

    fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    fn history(&self) -> &[HistoryItem] {
        &self.history
    }
}

/// Columns the writer fills for each entity
///
/// `id` and `rowid` stand for insertion order, which is how LibreTube keeps
/// item and history order.
pub fn written_columns(entity: Entity) -> Vec<&'static str> {
    match entity {
        Entity::Subscription => SUBSCRIPTION_COLUMNS.to_vec(),
        Entity::Group => GROUP_COLUMNS.to_vec(),
        Entity::Playlist => PLAYLIST_COLUMNS.to_vec(),
        Entity::PlaylistItem => [VIDEO_COLUMNS, &["id"]].concat(),
        Entity::WatchHistory => [VIDEO_COLUMNS, &["rowid", "position"]].concat(),
    }
}

pub struct LibreTube;

impl BackupSchema for LibreTube {
    type Records = LibreTubeRecords;

    const FORMAT: BackupFormat = BackupFormat::LibreTube;

    fn create_schema(conn: &Connection, config: &BackupConfig) -> Result<()> {
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(HISTORY_SCHEMA)?;
        if let Some(version) = config.libretube_user_version {
            conn.pragma_update(None, "user_version", version)?;
        }
        tracing::debug!("Created LibreTube schema");
        Ok(())
    }

    fn read_records(conn: &Connection) -> Result<LibreTubeRecords> {
        read_records(conn)
    }

    fn apply_plan(conn: &Connection, plan: &MergePlan<LibreTubeRecords>) -> Result<MergeStats> {
        apply_plan(conn, plan)
    }
}

const VIDEO_SELECT: &str =
    "videoId, title, uploadDate, uploader, uploaderUrl, uploaderAvatar, thumbnailUrl, duration";

/// Map a row whose columns start at `offset` with the `VIDEO_SELECT` list
fn video_from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Video> {
    Ok(Video {
        video_id: row.get(offset)?,
        title: row.get(offset + 1)?,
        upload_date: row.get(offset + 2)?,
        uploader: row.get(offset + 3)?,
        uploader_url: row.get(offset + 4)?,
        uploader_avatar: row.get(offset + 5)?,
        thumbnail_url: row.get(offset + 6)?,
        duration: row.get(offset + 7)?,
    })
}

/// Read every record LibreTube keeps that the converter understands
pub fn read_records(conn: &Connection) -> Result<LibreTubeRecords> {
    require_table(conn, "localSubscription", SUBSCRIPTION_COLUMNS)?;
    require_table(conn, "subscriptionGroups", GROUP_COLUMNS)?;
    require_table(conn, "localPlaylist", &["id", "name", "thumbnailUrl"])?;
    require_table(
        conn,
        "localPlaylistItem",
        &[VIDEO_COLUMNS, &["id", "playlistId"]].concat(),
    )?;

    let subscriptions = query_all(
        conn,
        "localSubscription",
        "SELECT channelId, name, avatar, verified FROM localSubscription ORDER BY rowid",
        |row| {
            Ok(Subscription {
                channel_id: row.get(0)?,
                name: row.get(1)?,
                avatar: row.get(2)?,
                verified: row.get(3)?,
            })
        },
    )?;

    let groups = read_groups(conn)?;
    let playlists = read_playlists(conn)?;
    let history = read_history(conn)?;

    tracing::info!(
        "Read LibreTube backup: {} subscriptions, {} groups, {} playlists, {} history entries",
        subscriptions.len(),
        groups.len(),
        playlists.len(),
        history.len()
    );

    Ok(LibreTubeRecords {
        subscriptions,
        groups,
        playlists,
        history,
    })
}

fn parse_channels(group: &str, json: &str) -> Result<Vec<String>> {
    let channels: Vec<String> = serde_json::from_str(json).map_err(|e| {
        ConversionError::malformed(format!(
            "subscriptionGroups '{}' has an invalid channel list: {}",
            group, e
        ))
    })?;
    let mut normalized: Vec<String> = Vec::with_capacity(channels.len());
    for channel in channels {
        let key = normalize_channel_id(&channel);
        if !normalized.contains(&key) {
            normalized.push(key);
        }
    }
    Ok(normalized)
}

fn read_groups(conn: &Connection) -> Result<Vec<SubscriptionGroup>> {
    let rows = query_all(
        conn,
        "subscriptionGroups",
        r#"SELECT name, channels, "index" FROM subscriptionGroups ORDER BY "index", rowid"#,
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        },
    )?;

    rows.into_iter()
        .map(|(name, channels, index)| {
            Ok(SubscriptionGroup {
                channels: parse_channels(&name, &channels)?,
                name,
                index,
            })
        })
        .collect()
}

fn read_playlists(conn: &Connection) -> Result<Vec<Playlist>> {
    let rows = query_all(
        conn,
        "localPlaylist",
        "SELECT id, name, thumbnailUrl FROM localPlaylist ORDER BY id",
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    )?;

    let items = query_all(
        conn,
        "localPlaylistItem",
        &format!(
            "SELECT playlistId, {} FROM localPlaylistItem ORDER BY id",
            VIDEO_SELECT
        ),
        |row| Ok((row.get::<_, i64>(0)?, video_from_row(row, 1)?)),
    )?;

    let mut by_playlist: HashMap<i64, Vec<Video>> = HashMap::new();
    for (playlist_id, video) in items {
        by_playlist.entry(playlist_id).or_default().push(video);
    }

    let playlists: Vec<Playlist> = rows
        .into_iter()
        .map(|(id, name, thumbnail_url)| Playlist {
            name,
            thumbnail_url,
            items: by_playlist.remove(&id).unwrap_or_default(),
        })
        .collect();

    let orphans: usize = by_playlist.values().map(Vec::len).sum();
    if orphans > 0 {
        tracing::warn!("Ignoring {} playlist item(s) without a playlist", orphans);
    }

    Ok(playlists)
}

fn read_history(conn: &Connection) -> Result<Vec<HistoryItem>> {
    if !optional_table(conn, "watchHistoryItem", VIDEO_COLUMNS)? {
        return Ok(Vec::new());
    }

    let positions: HashMap<String, i64> =
        if optional_table(conn, "watchPosition", &["videoId", "position"])? {
            query_all(
                conn,
                "watchPosition",
                "SELECT videoId, position FROM watchPosition",
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )?
            .into_iter()
            .collect()
        } else {
            HashMap::new()
        };

    let videos = query_all(
        conn,
        "watchHistoryItem",
        &format!("SELECT {} FROM watchHistoryItem ORDER BY rowid", VIDEO_SELECT),
        |row| video_from_row(row, 0),
    )?;

    Ok(videos
        .into_iter()
        .map(|video| HistoryItem {
            position_ms: positions.get(&video.video_id).copied(),
            video,
        })
        .collect())
}

/// Write a merge plan into a LibreTube database in one transaction
pub fn apply_plan(conn: &Connection, plan: &MergePlan<LibreTubeRecords>) -> Result<MergeStats> {
    let tx = conn.unchecked_transaction()?;

    insert_subscriptions(&tx, &plan.subscriptions)?;
    insert_groups(&tx, &plan.groups)?;
    extend_groups(&tx, &plan.group_extensions)?;
    insert_playlists(&tx, &plan.playlists)?;
    extend_playlists(&tx, &plan.playlist_extensions)?;

    if !plan.history.is_empty() {
        tx.execute_batch(HISTORY_SCHEMA)?;
        insert_history(&tx, &plan.history)?;
    }

    tx.commit()?;
    tracing::info!("✓ Wrote LibreTube records ({})", plan.stats);
    Ok(plan.stats)
}

fn insert_subscriptions(conn: &Connection, subscriptions: &[Subscription]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO localSubscription (channelId, name, avatar, verified)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for sub in subscriptions {
        stmt.execute(params![sub.channel_id, sub.name, sub.avatar, sub.verified])?;
    }
    Ok(())
}

fn insert_groups(conn: &Connection, groups: &[SubscriptionGroup]) -> Result<()> {
    let mut index: i64 = conn.query_row(
        r#"SELECT COALESCE(MAX("index"), -1) + 1 FROM subscriptionGroups"#,
        [],
        |row| row.get(0),
    )?;
    for group in groups {
        let channels = serde_json::to_string(&group.channels)
            .map_err(|e| ConversionError::Io(std::io::Error::other(e)))?;
        conn.execute(
            r#"INSERT OR IGNORE INTO subscriptionGroups (name, channels, "index") VALUES (?1, ?2, ?3)"#,
            params![group.name, channels, index],
        )?;
        index += 1;
    }
    Ok(())
}

fn extend_groups(conn: &Connection, extensions: &[GroupExtension]) -> Result<()> {
    for extension in extensions {
        let current: Option<String> = conn
            .query_row(
                "SELECT channels FROM subscriptionGroups WHERE name = ?1",
                [&extension.group],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            tracing::warn!("Group '{}' vanished from the target, skipping", extension.group);
            continue;
        };

        let mut channels = parse_channels(&extension.group, &current)?;
        for member in &extension.members {
            if !channels.contains(member) {
                channels.push(member.clone());
            }
        }
        let channels = serde_json::to_string(&channels)
            .map_err(|e| ConversionError::Io(std::io::Error::other(e)))?;
        conn.execute(
            "UPDATE subscriptionGroups SET channels = ?1 WHERE name = ?2",
            params![channels, extension.group],
        )?;
    }
    Ok(())
}

fn insert_items(conn: &Connection, playlist_id: i64, items: &[Video]) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO localPlaylistItem (playlistId, {})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        VIDEO_SELECT
    ))?;
    for video in items {
        stmt.execute(params![
            playlist_id,
            video.video_id,
            video.title,
            video.upload_date,
            video.uploader,
            video.uploader_url,
            video.uploader_avatar,
            video.thumbnail_url,
            video.duration,
        ])?;
    }
    Ok(())
}

fn insert_playlists(conn: &Connection, playlists: &[Playlist]) -> Result<()> {
    for playlist in playlists {
        conn.execute(
            "INSERT INTO localPlaylist (name, thumbnailUrl) VALUES (?1, ?2)",
            params![playlist.name, playlist.thumbnail_url],
        )?;
        let playlist_id = conn.last_insert_rowid();
        insert_items(conn, playlist_id, &playlist.items)?;
    }
    Ok(())
}

fn extend_playlists(conn: &Connection, extensions: &[PlaylistExtension<Video>]) -> Result<()> {
    for extension in extensions {
        let playlist_id: Option<i64> = conn
            .query_row(
                "SELECT id FROM localPlaylist WHERE name = ?1 ORDER BY id LIMIT 1",
                [&extension.playlist],
                |row| row.get(0),
            )
            .optional()?;
        let Some(playlist_id) = playlist_id else {
            tracing::warn!(
                "Playlist '{}' vanished from the target, skipping",
                extension.playlist
            );
            continue;
        };

        insert_items(conn, playlist_id, &extension.items)?;

        let thumbnail = extension
            .items
            .iter()
            .find_map(|video| video.thumbnail_url.as_deref());
        if let Some(thumbnail) = thumbnail {
            conn.execute(
                "UPDATE localPlaylist SET thumbnailUrl = ?1 WHERE id = ?2 AND thumbnailUrl = ''",
                params![thumbnail, playlist_id],
            )?;
        }
    }
    Ok(())
}

fn insert_history(conn: &Connection, history: &[HistoryItem]) -> Result<()> {
    let mut item = conn.prepare(&format!(
        "INSERT OR IGNORE INTO watchHistoryItem ({})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        VIDEO_SELECT
    ))?;
    let mut position = conn.prepare(
        "INSERT OR IGNORE INTO watchPosition (videoId, position) VALUES (?1, ?2)",
    )?;
    for entry in history {
        let video = &entry.video;
        item.execute(params![
            video.video_id,
            video.title,
            video.upload_date,
            video.uploader,
            video.uploader_url,
            video.uploader_avatar,
            video.thumbnail_url,
            video.duration,
        ])?;
        if let Some(ms) = entry.position_ms {
            position.execute(params![video.video_id, ms])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::merge::plan_merge;

    fn video(id: &str) -> Video {
        Video {
            video_id: id.to_string(),
            title: Some(format!("Video {}", id)),
            upload_date: Some("2024-01-15".to_string()),
            uploader: Some("Uploader".to_string()),
            uploader_url: Some("/channel/UCaaaaaaaaaaaaaaaaaaaaaa".to_string()),
            uploader_avatar: None,
            thumbnail_url: Some(format!("https://i.ytimg.com/vi/{}/hq.jpg", id)),
            duration: Some(212),
        }
    }

    fn sample() -> LibreTubeRecords {
        LibreTubeRecords {
            subscriptions: vec![Subscription {
                channel_id: "UCaaaaaaaaaaaaaaaaaaaaaa".to_string(),
                name: "Channel A".to_string(),
                avatar: Some("https://yt3.ggpht.com/a.jpg".to_string()),
                verified: true,
            }],
            groups: vec![SubscriptionGroup {
                name: "Music".to_string(),
                channels: vec!["UCaaaaaaaaaaaaaaaaaaaaaa".to_string()],
                index: 0,
            }],
            playlists: vec![Playlist {
                name: "Favorites".to_string(),
                thumbnail_url: "https://i.ytimg.com/vi/v1aaaaaaaaa/hq.jpg".to_string(),
                items: vec![video("v1aaaaaaaaa"), video("v2aaaaaaaaa")],
            }],
            history: vec![
                HistoryItem {
                    video: video("v2aaaaaaaaa"),
                    position_ms: None,
                },
                HistoryItem {
                    video: video("v1aaaaaaaaa"),
                    position_ms: Some(42_000),
                },
            ],
        }
    }

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        LibreTube::create_schema(&conn, &BackupConfig::default()).unwrap();
        conn
    }

    #[test]
    fn test_write_then_read_back() {
        let conn = fresh();
        let records = sample();
        apply_plan(&conn, &plan_merge(&LibreTubeRecords::default(), &records)).unwrap();
        assert_eq!(read_records(&conn).unwrap(), records);
    }

    #[test]
    fn test_user_version_only_when_configured() {
        let conn = fresh();
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 0);

        let conn = Connection::open_in_memory().unwrap();
        let config = BackupConfig {
            libretube_user_version: Some(17),
            ..BackupConfig::default()
        };
        LibreTube::create_schema(&conn, &config).unwrap();
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 17);
    }

    #[test]
    fn test_invalid_channel_json_is_malformed() {
        let conn = fresh();
        conn.execute(
            r#"INSERT INTO subscriptionGroups (name, channels, "index") VALUES ('Bad', 'not json', 0)"#,
            [],
        )
        .unwrap();
        let err = read_records(&conn).unwrap_err();
        assert!(matches!(err, ConversionError::MalformedImage(_)));
        assert!(err.to_string().contains("Bad"));
    }

    #[test]
    fn test_group_extension_rewrites_channels_as_union() {
        let conn = fresh();
        apply_plan(&conn, &plan_merge(&LibreTubeRecords::default(), &sample())).unwrap();

        let incoming = LibreTubeRecords {
            groups: vec![SubscriptionGroup {
                name: "Music".to_string(),
                channels: vec![
                    "UCbbbbbbbbbbbbbbbbbbbbbb".to_string(),
                    "UCaaaaaaaaaaaaaaaaaaaaaa".to_string(),
                ],
                index: 4,
            }],
            ..Default::default()
        };
        let current = read_records(&conn).unwrap();
        apply_plan(&conn, &plan_merge(&current, &incoming)).unwrap();

        let channels: String = conn
            .query_row(
                "SELECT channels FROM subscriptionGroups WHERE name = 'Music'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(
            channels,
            r#"["UCaaaaaaaaaaaaaaaaaaaaaa","UCbbbbbbbbbbbbbbbbbbbbbb"]"#
        );
    }

    #[test]
    fn test_missing_history_tables_read_as_empty() {
        let conn = fresh();
        conn.execute_batch("DROP TABLE watchHistoryItem; DROP TABLE watchPosition;")
            .unwrap();
        assert!(read_records(&conn).unwrap().history.is_empty());
    }

    #[test]
    fn test_missing_required_table_is_malformed() {
        let conn = fresh();
        conn.execute_batch("DROP TABLE localPlaylistItem").unwrap();
        assert!(matches!(
            read_records(&conn),
            Err(ConversionError::MalformedImage(_))
        ));
    }

    #[test]
    fn test_empty_thumbnail_is_filled_on_append() {
        let conn = fresh();
        let mut existing = sample();
        existing.playlists[0].items.clear();
        existing.playlists[0].thumbnail_url.clear();
        apply_plan(&conn, &plan_merge(&LibreTubeRecords::default(), &existing)).unwrap();

        let incoming = LibreTubeRecords {
            playlists: vec![sample().playlists[0].clone()],
            ..Default::default()
        };
        let current = read_records(&conn).unwrap();
        apply_plan(&conn, &plan_merge(&current, &incoming)).unwrap();

        let read = read_records(&conn).unwrap();
        assert_eq!(read.playlists[0].items.len(), 2);
        assert_eq!(
            read.playlists[0].thumbnail_url,
            "https://i.ytimg.com/vi/v1aaaaaaaaa/hq.jpg"
        );
    }
}
