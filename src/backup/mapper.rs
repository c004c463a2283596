// ABOUTME: Field-level translation between NewPipe and LibreTube records
// ABOUTME: Static per-entity rule tables drive both the typed mappers and the mapping report

use super::libretube::{self, LibreTubeRecords};
use super::Direction;
use super::newpipe::{self, NewPipeRecords, DEFAULT_STREAM_TYPE, YOUTUBE_SERVICE_ID};
use crate::ids::{
    channel_path, is_youtube_channel_id, is_youtube_video_id, normalize_channel_id,
    normalize_video_id, youtube_channel_url, youtube_video_url,
};
use chrono::{DateTime, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;

/// Logical entity kinds shared by both formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Entity {
    Subscription,
    Group,
    Playlist,
    PlaylistItem,
    WatchHistory,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Subscription => "subscription",
            Entity::Group => "group",
            Entity::Playlist => "playlist",
            Entity::PlaylistItem => "playlist item",
            Entity::WatchHistory => "watch history",
        };
        f.write_str(name)
    }
}

/// Named value conversions used by `FieldRule::Convert`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    EpochMsToDate,
    DateToEpochMs,
    ChannelUrlToId,
    ChannelIdToUrl,
    VideoUrlToId,
    VideoIdToUrl,
    ChannelUrlToPath,
    ChannelPathToUrl,
    /// Playlist thumbnail stream reference to that stream's thumbnail URL
    ThumbnailStreamToUrl,
    /// Thumbnail URL to the uid of the item stream carrying it
    ThumbnailUrlToStream,
    /// Join rows to a JSON array of channel ids
    MemberJoinsToJson,
    JsonToMemberJoins,
    /// Position to insertion order and back
    InsertionOrder,
    /// Insertion order to synthetic timestamps ending at the operation time
    InsertionOrderToTimestamp,
    TimestampToInsertionOrder,
    /// Relative order kept, renumbered to follow the target's current maximum
    RenumberAfterMax,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Int(i64),
    Text(&'static str),
    Null,
}

/// How one target column is filled, or one source column discarded
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRule {
    Copy {
        from: &'static str,
        to: &'static str,
    },
    Convert {
        from: &'static str,
        to: &'static str,
        conversion: Conversion,
    },
    Default {
        to: &'static str,
        value: DefaultValue,
    },
    /// Source column with no target equivalent
    Drop { from: &'static str },
}

impl FieldRule {
    pub fn target(&self) -> Option<&'static str> {
        match self {
            FieldRule::Copy { to, .. }
            | FieldRule::Convert { to, .. }
            | FieldRule::Default { to, .. } => Some(to),
            FieldRule::Drop { .. } => None,
        }
    }

    pub fn source(&self) -> Option<&'static str> {
        match self {
            FieldRule::Copy { from, .. }
            | FieldRule::Convert { from, .. }
            | FieldRule::Drop { from } => Some(from),
            FieldRule::Default { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntityMapping {
    pub entity: Entity,
    pub rules: &'static [FieldRule],
}

use Conversion as C;
use FieldRule as R;

#[rustfmt::skip]
const NP_STREAM_TO_LT_VIDEO: &[FieldRule] = &[
    R::Convert { from: "url", to: "videoId", conversion: C::VideoUrlToId },
    R::Copy { from: "title", to: "title" },
    R::Convert { from: "upload_date", to: "uploadDate", conversion: C::EpochMsToDate },
    R::Copy { from: "uploader", to: "uploader" },
    R::Convert { from: "uploader_url", to: "uploaderUrl", conversion: C::ChannelUrlToPath },
    R::Default { to: "uploaderAvatar", value: DefaultValue::Null },
    R::Copy { from: "thumbnail_url", to: "thumbnailUrl" },
    R::Copy { from: "duration", to: "duration" },
    R::Drop { from: "service_id" },
    R::Drop { from: "stream_type" },
    R::Drop { from: "view_count" },
    R::Drop { from: "textual_upload_date" },
    R::Drop { from: "is_upload_date_approximation" },
];

/// NewPipe to LibreTube, one table per entity
#[rustfmt::skip]
pub static NEWPIPE_TO_LIBRETUBE: &[EntityMapping] = &[
    EntityMapping {
        entity: Entity::Subscription,
        rules: &[
            R::Convert { from: "url", to: "channelId", conversion: C::ChannelUrlToId },
            R::Copy { from: "name", to: "name" },
            R::Copy { from: "avatar_url", to: "avatar" },
            R::Default { to: "verified", value: DefaultValue::Int(0) },
            R::Drop { from: "service_id" },
            R::Drop { from: "subscriber_count" },
            R::Drop { from: "description" },
            R::Drop { from: "notification_mode" },
        ],
    },
    EntityMapping {
        entity: Entity::Group,
        rules: &[
            R::Copy { from: "name", to: "name" },
            R::Convert { from: "subscription_id", to: "channels", conversion: C::MemberJoinsToJson },
            R::Convert { from: "sort_order", to: "index", conversion: C::RenumberAfterMax },
            R::Drop { from: "icon_id" },
        ],
    },
    EntityMapping {
        entity: Entity::Playlist,
        rules: &[
            R::Copy { from: "name", to: "name" },
            R::Convert {
                from: "thumbnail_stream_id",
                to: "thumbnailUrl",
                conversion: C::ThumbnailStreamToUrl,
            },
            R::Drop { from: "is_thumbnail_permanent" },
            R::Drop { from: "display_index" },
        ],
    },
    EntityMapping {
        entity: Entity::PlaylistItem,
        rules: &[
            R::Convert { from: "join_index", to: "id", conversion: C::InsertionOrder },
        ],
    },
    EntityMapping {
        entity: Entity::WatchHistory,
        rules: &[
            R::Convert { from: "access_date", to: "rowid", conversion: C::TimestampToInsertionOrder },
            R::Copy { from: "progress_time", to: "position" },
            R::Drop { from: "repeat_count" },
        ],
    },
];

#[rustfmt::skip]
const LT_VIDEO_TO_NP_STREAM: &[FieldRule] = &[
    R::Convert { from: "videoId", to: "url", conversion: C::VideoIdToUrl },
    R::Copy { from: "title", to: "title" },
    R::Convert { from: "uploadDate", to: "upload_date", conversion: C::DateToEpochMs },
    R::Copy { from: "uploadDate", to: "textual_upload_date" },
    R::Copy { from: "uploader", to: "uploader" },
    R::Convert { from: "uploaderUrl", to: "uploader_url", conversion: C::ChannelPathToUrl },
    R::Copy { from: "thumbnailUrl", to: "thumbnail_url" },
    R::Copy { from: "duration", to: "duration" },
    R::Drop { from: "uploaderAvatar" },
    R::Default { to: "service_id", value: DefaultValue::Int(YOUTUBE_SERVICE_ID) },
    R::Default { to: "stream_type", value: DefaultValue::Text(DEFAULT_STREAM_TYPE) },
    R::Default { to: "view_count", value: DefaultValue::Null },
    R::Default { to: "is_upload_date_approximation", value: DefaultValue::Int(0) },
];

/// LibreTube to NewPipe, one table per entity
#[rustfmt::skip]
pub static LIBRETUBE_TO_NEWPIPE: &[EntityMapping] = &[
    EntityMapping {
        entity: Entity::Subscription,
        rules: &[
            R::Convert { from: "channelId", to: "url", conversion: C::ChannelIdToUrl },
            R::Copy { from: "name", to: "name" },
            R::Copy { from: "avatar", to: "avatar_url" },
            R::Drop { from: "verified" },
            R::Default { to: "service_id", value: DefaultValue::Int(YOUTUBE_SERVICE_ID) },
            R::Default { to: "subscriber_count", value: DefaultValue::Null },
            R::Default { to: "description", value: DefaultValue::Null },
            R::Default { to: "notification_mode", value: DefaultValue::Int(0) },
        ],
    },
    EntityMapping {
        entity: Entity::Group,
        rules: &[
            R::Copy { from: "name", to: "name" },
            R::Convert { from: "channels", to: "subscription_id", conversion: C::JsonToMemberJoins },
            R::Convert { from: "index", to: "sort_order", conversion: C::RenumberAfterMax },
            R::Default { to: "icon_id", value: DefaultValue::Int(0) },
        ],
    },
    EntityMapping {
        entity: Entity::Playlist,
        rules: &[
            R::Copy { from: "name", to: "name" },
            R::Convert {
                from: "thumbnailUrl",
                to: "thumbnail_stream_id",
                conversion: C::ThumbnailUrlToStream,
            },
            R::Default { to: "is_thumbnail_permanent", value: DefaultValue::Int(0) },
            R::Default { to: "display_index", value: DefaultValue::Int(-1) },
        ],
    },
    EntityMapping {
        entity: Entity::PlaylistItem,
        rules: &[R::Convert { from: "id", to: "join_index", conversion: C::InsertionOrder }],
    },
    EntityMapping {
        entity: Entity::WatchHistory,
        rules: &[
            R::Convert { from: "rowid", to: "access_date", conversion: C::InsertionOrderToTimestamp },
            R::Copy { from: "position", to: "progress_time" },
            R::Default { to: "repeat_count", value: DefaultValue::Int(1) },
        ],
    },
];

/// Full rule list of an entity for one direction
///
/// Playlist items and history entries share the video metadata rules,
/// which are kept in one list per direction and prepended here.
pub fn rules_for(direction: Direction, entity: Entity) -> Vec<FieldRule> {
    let (table, video_rules) = match direction {
        Direction::ToLibretube => (NEWPIPE_TO_LIBRETUBE, NP_STREAM_TO_LT_VIDEO),
        Direction::ToNewpipe => (LIBRETUBE_TO_NEWPIPE, LT_VIDEO_TO_NP_STREAM),
    };
    let own = table
        .iter()
        .find(|mapping| mapping.entity == entity)
        .map(|mapping| mapping.rules)
        .unwrap_or(&[]);
    match entity {
        Entity::PlaylistItem | Entity::WatchHistory => [video_rules, own].concat(),
        _ => own.to_vec(),
    }
}

/// What a mapping pass dropped, defaulted and skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingReport {
    /// Non-empty source values with no target column
    pub dropped: BTreeMap<(Entity, &'static str), usize>,
    /// Target columns filled with a default value
    pub defaulted: BTreeMap<(Entity, &'static str), usize>,
    pub skipped: Vec<String>,
}

impl MappingReport {
    /// Count the drops and defaults the table prescribes for one record
    ///
    /// `present` tells whether the record has a non-empty value for a source
    /// field.
    fn account(&mut self, rules: &[FieldRule], entity: Entity, present: impl Fn(&str) -> bool) {
        for rule in rules {
            match rule {
                FieldRule::Drop { from } if present(*from) => {
                    *self.dropped.entry((entity, *from)).or_default() += 1;
                }
                FieldRule::Default { to, .. } => {
                    *self.defaulted.entry((entity, *to)).or_default() += 1;
                }
                _ => {}
            }
        }
    }

    pub(crate) fn skip(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.skipped.push(message);
    }

    pub fn is_lossless(&self) -> bool {
        self.dropped.is_empty() && self.skipped.is_empty()
    }

    /// Log the report at info level
    pub fn log_summary(&self) {
        for ((entity, field), count) in &self.dropped {
            tracing::info!("Dropped {} value(s) of {} field '{}'", count, entity, field);
        }
        for ((entity, field), count) in &self.defaulted {
            tracing::debug!("Defaulted {} field '{}' on {} record(s)", entity, field, count);
        }
        if !self.skipped.is_empty() {
            tracing::info!("Skipped {} record(s) with no equivalent", self.skipped.len());
        }
    }
}

/// Convert epoch milliseconds to a `YYYY-MM-DD` date (UTC)
pub fn epoch_ms_to_date(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Parse a `YYYY-MM-DD` date (or an RFC 3339 timestamp) to epoch milliseconds
pub fn date_to_epoch_ms(date: &str) -> Option<i64> {
    let date = date.trim();
    if let Ok(day) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return day
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc3339(date)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn stream_to_video(
    stream: &newpipe::Stream,
    rules: &[FieldRule],
    entity: Entity,
    report: &mut MappingReport,
    extra_present: impl Fn(&str) -> bool,
) -> Option<libretube::Video> {
    let video_id = normalize_video_id(&stream.url);
    if stream.service_id != YOUTUBE_SERVICE_ID || !is_youtube_video_id(&video_id) {
        report.skip(format!(
            "Skipping {} '{}': {} is not a YouTube video",
            entity, stream.title, stream.url
        ));
        return None;
    }

    report.account(rules, entity, |field| match field {
        "stream_type" => stream.stream_type != DEFAULT_STREAM_TYPE,
        "view_count" => stream.view_count.is_some(),
        "textual_upload_date" => non_empty(&stream.textual_upload_date),
        "is_upload_date_approximation" => stream.is_upload_date_approximation == Some(true),
        other => extra_present(other),
    });

    let uploader_url = stream.uploader_url.as_deref().map(|url| {
        let channel = normalize_channel_id(url);
        if is_youtube_channel_id(&channel) {
            channel_path(&channel)
        } else {
            url.to_string()
        }
    });

    Some(libretube::Video {
        video_id,
        title: Some(stream.title.clone()),
        upload_date: stream.upload_date.and_then(epoch_ms_to_date),
        uploader: Some(stream.uploader.clone()),
        uploader_url,
        uploader_avatar: None,
        thumbnail_url: stream.thumbnail_url.clone(),
        duration: Some(stream.duration),
    })
}

/// Map NewPipe records to LibreTube records
///
/// Records of services other than YouTube have no LibreTube equivalent and
/// are skipped and reported.
pub fn newpipe_to_libretube(source: &NewPipeRecords) -> (LibreTubeRecords, MappingReport) {
    let direction = Direction::ToLibretube;
    let mut report = MappingReport::default();
    let mut target = LibreTubeRecords::default();

    let rules = rules_for(direction, Entity::Subscription);
    for sub in &source.subscriptions {
        let channel_id = normalize_channel_id(&sub.url);
        if sub.service_id != YOUTUBE_SERVICE_ID || !is_youtube_channel_id(&channel_id) {
            report.skip(format!(
                "Skipping subscription '{}': {} is not a YouTube channel",
                sub.name, sub.url
            ));
            continue;
        }
        report.account(&rules, Entity::Subscription, |field| match field {
            "subscriber_count" => sub.subscriber_count.is_some_and(|n| n > 0),
            "description" => non_empty(&sub.description),
            "notification_mode" => sub.notification_mode != 0,
            _ => false,
        });
        target.subscriptions.push(libretube::Subscription {
            channel_id,
            name: sub.name.clone(),
            avatar: sub.avatar_url.clone(),
            verified: false,
        });
    }

    let rules = rules_for(direction, Entity::Group);
    for group in &source.groups {
        report.account(&rules, Entity::Group, |field| {
            field == "icon_id" && group.icon_id != 0
        });
        target.groups.push(libretube::SubscriptionGroup {
            name: group.name.clone(),
            channels: group
                .members
                .iter()
                .filter(|member| is_youtube_channel_id(member))
                .cloned()
                .collect(),
            index: group.sort_order,
        });
    }

    let playlist_rules = rules_for(direction, Entity::Playlist);
    let item_rules = rules_for(direction, Entity::PlaylistItem);
    for playlist in &source.playlists {
        report.account(&playlist_rules, Entity::Playlist, |field| match field {
            "is_thumbnail_permanent" => playlist.is_thumbnail_permanent,
            "display_index" => playlist.display_index >= 0,
            _ => false,
        });
        let items: Vec<libretube::Video> = playlist
            .streams
            .iter()
            .filter_map(|stream| {
                stream_to_video(stream, &item_rules, Entity::PlaylistItem, &mut report, |_| false)
            })
            .collect();
        let thumbnail_url = playlist
            .thumbnail_url
            .clone()
            .or_else(|| items.iter().find_map(|video| video.thumbnail_url.clone()))
            .unwrap_or_default();
        target.playlists.push(libretube::Playlist {
            name: playlist.name.clone(),
            thumbnail_url,
            items,
        });
    }

    let rules = rules_for(direction, Entity::WatchHistory);
    for entry in &source.history {
        let repeated = |field: &str| field == "repeat_count" && entry.repeat_count > 1;
        let Some(video) =
            stream_to_video(&entry.stream, &rules, Entity::WatchHistory, &mut report, repeated)
        else {
            continue;
        };
        target.history.push(libretube::HistoryItem {
            video,
            position_ms: entry.progress_ms,
        });
    }

    (target, report)
}

fn video_to_stream(
    video: &libretube::Video,
    rules: &[FieldRule],
    entity: Entity,
    report: &mut MappingReport,
) -> newpipe::Stream {
    report.account(rules, entity, |field| {
        field == "uploaderAvatar" && non_empty(&video.uploader_avatar)
    });

    let uploader_url = video.uploader_url.as_deref().map(|url| {
        let channel = normalize_channel_id(url);
        if is_youtube_channel_id(&channel) {
            youtube_channel_url(&channel)
        } else {
            url.to_string()
        }
    });

    newpipe::Stream {
        service_id: YOUTUBE_SERVICE_ID,
        url: youtube_video_url(&normalize_video_id(&video.video_id)),
        title: video.title.clone().unwrap_or_default(),
        stream_type: DEFAULT_STREAM_TYPE.to_string(),
        duration: video.duration.unwrap_or(0),
        uploader: video.uploader.clone().unwrap_or_default(),
        uploader_url,
        thumbnail_url: video.thumbnail_url.clone(),
        view_count: None,
        textual_upload_date: video.upload_date.clone(),
        upload_date: video.upload_date.as_deref().and_then(date_to_epoch_ms),
        is_upload_date_approximation: Some(false),
    }
}

/// Map LibreTube records to NewPipe records
///
/// LibreTube keeps no watch timestamps, so history entries get synthetic
/// access dates ending at `now_ms`, one millisecond apart, in history order.
pub fn libretube_to_newpipe(source: &LibreTubeRecords, now_ms: i64) -> (NewPipeRecords, MappingReport) {
    let direction = Direction::ToNewpipe;
    let mut report = MappingReport::default();
    let mut target = NewPipeRecords::default();

    let rules = rules_for(direction, Entity::Subscription);
    for sub in &source.subscriptions {
        report.account(&rules, Entity::Subscription, |field| {
            field == "verified" && sub.verified
        });
        target.subscriptions.push(newpipe::Subscription {
            service_id: YOUTUBE_SERVICE_ID,
            url: youtube_channel_url(&normalize_channel_id(&sub.channel_id)),
            name: sub.name.clone(),
            avatar_url: sub.avatar.clone(),
            subscriber_count: None,
            description: None,
            notification_mode: 0,
        });
    }

    let rules = rules_for(direction, Entity::Group);
    for group in &source.groups {
        report.account(&rules, Entity::Group, |_| false);
        target.groups.push(newpipe::FeedGroup {
            name: group.name.clone(),
            icon_id: 0,
            sort_order: group.index,
            members: group.channels.clone(),
        });
    }

    let playlist_rules = rules_for(direction, Entity::Playlist);
    let item_rules = rules_for(direction, Entity::PlaylistItem);
    for playlist in &source.playlists {
        report.account(&playlist_rules, Entity::Playlist, |_| false);
        let streams = playlist
            .items
            .iter()
            .map(|video| video_to_stream(video, &item_rules, Entity::PlaylistItem, &mut report))
            .collect();
        target.playlists.push(newpipe::Playlist {
            name: playlist.name.clone(),
            is_thumbnail_permanent: false,
            thumbnail_url: Some(playlist.thumbnail_url.clone()).filter(|url| !url.is_empty()),
            display_index: -1,
            streams,
        });
    }

    let rules = rules_for(direction, Entity::WatchHistory);
    let newest = source.history.len() as i64 - 1;
    for (position, entry) in source.history.iter().enumerate() {
        let stream = video_to_stream(&entry.video, &rules, Entity::WatchHistory, &mut report);
        target.history.push(newpipe::HistoryEntry {
            stream,
            access_date: now_ms - (newest - position as i64),
            repeat_count: 1,
            progress_ms: entry.position_ms,
        });
    }

    (target, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    const ENTITIES: [Entity; 5] = [
        Entity::Subscription,
        Entity::Group,
        Entity::Playlist,
        Entity::PlaylistItem,
        Entity::WatchHistory,
    ];

    fn sorted(columns: Vec<&'static str>) -> BTreeSet<&'static str> {
        columns.into_iter().collect()
    }

    #[test]
    fn test_tables_fill_every_libretube_column() {
        for entity in ENTITIES {
            let targets = rules_for(Direction::ToLibretube, entity)
                .iter()
                .filter_map(FieldRule::target)
                .collect();
            assert_eq!(
                sorted(targets),
                sorted(libretube::written_columns(entity)),
                "{}",
                entity
            );
        }
    }

    #[test]
    fn test_tables_fill_every_newpipe_column() {
        for entity in ENTITIES {
            let targets = rules_for(Direction::ToNewpipe, entity)
                .iter()
                .filter_map(FieldRule::target)
                .collect();
            assert_eq!(
                sorted(targets),
                sorted(newpipe::written_columns(entity)),
                "{}",
                entity
            );
        }
    }

    #[test]
    fn test_tables_consume_every_source_column() {
        for entity in ENTITIES {
            let sources: BTreeSet<_> = rules_for(Direction::ToLibretube, entity)
                .iter()
                .filter_map(FieldRule::source)
                .collect();
            assert_eq!(sources, sorted(newpipe::written_columns(entity)), "{}", entity);

            let sources: BTreeSet<_> = rules_for(Direction::ToNewpipe, entity)
                .iter()
                .filter_map(FieldRule::source)
                .collect();
            assert_eq!(sources, sorted(libretube::written_columns(entity)), "{}", entity);
        }
    }

    #[test]
    fn test_group_order_is_renumbered_in_both_directions() {
        for (direction, from, to) in [
            (Direction::ToLibretube, "sort_order", "index"),
            (Direction::ToNewpipe, "index", "sort_order"),
        ] {
            assert!(rules_for(direction, Entity::Group).contains(&FieldRule::Convert {
                from,
                to,
                conversion: Conversion::RenumberAfterMax,
            }));
        }
    }

    #[test]
    fn test_dates() {
        assert_eq!(epoch_ms_to_date(1_705_276_800_000).as_deref(), Some("2024-01-15"));
        assert_eq!(date_to_epoch_ms("2024-01-15"), Some(1_705_276_800_000));
        assert_eq!(
            date_to_epoch_ms("2024-01-15T00:00:00Z"),
            Some(1_705_276_800_000)
        );
        assert_eq!(date_to_epoch_ms("yesterday"), None);
    }

    fn np_stream(url: &str, service_id: i64) -> newpipe::Stream {
        newpipe::Stream {
            service_id,
            url: url.to_string(),
            title: "Title".to_string(),
            stream_type: DEFAULT_STREAM_TYPE.to_string(),
            duration: 90,
            uploader: "Someone".to_string(),
            uploader_url: Some("https://www.youtube.com/channel/UCaaaaaaaaaaaaaaaaaaaaaa".to_string()),
            thumbnail_url: Some("https://i.ytimg.com/vi/x/hq.jpg".to_string()),
            view_count: Some(1000),
            textual_upload_date: None,
            upload_date: Some(1_705_276_800_000),
            is_upload_date_approximation: Some(false),
        }
    }

    #[test]
    fn test_newpipe_stream_maps_to_libretube_video() {
        let source = NewPipeRecords {
            playlists: vec![newpipe::Playlist {
                name: "Favorites".to_string(),
                is_thumbnail_permanent: false,
                thumbnail_url: None,
                display_index: -1,
                streams: vec![np_stream("https://www.youtube.com/watch?v=dQw4w9WgXcQ", 0)],
            }],
            ..Default::default()
        };
        let (target, report) = newpipe_to_libretube(&source);
        let video = &target.playlists[0].items[0];
        assert_eq!(video.video_id, "dQw4w9WgXcQ");
        assert_eq!(video.upload_date.as_deref(), Some("2024-01-15"));
        assert_eq!(
            video.uploader_url.as_deref(),
            Some("/channel/UCaaaaaaaaaaaaaaaaaaaaaa")
        );
        assert_eq!(
            target.playlists[0].thumbnail_url,
            "https://i.ytimg.com/vi/x/hq.jpg"
        );
        assert_eq!(report.dropped.get(&(Entity::PlaylistItem, "view_count")), Some(&1));
        assert_eq!(
            report.defaulted.get(&(Entity::PlaylistItem, "uploaderAvatar")),
            Some(&1)
        );
    }

    #[test]
    fn test_non_youtube_records_are_skipped() {
        let source = NewPipeRecords {
            subscriptions: vec![newpipe::Subscription {
                service_id: 1,
                url: "https://soundcloud.com/artist".to_string(),
                name: "Artist".to_string(),
                avatar_url: None,
                subscriber_count: None,
                description: None,
                notification_mode: 0,
            }],
            history: vec![newpipe::HistoryEntry {
                stream: np_stream("https://soundcloud.com/artist/track", 1),
                access_date: 1,
                repeat_count: 1,
                progress_ms: None,
            }],
            ..Default::default()
        };
        let (target, report) = newpipe_to_libretube(&source);
        assert!(target.subscriptions.is_empty());
        assert!(target.history.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(!report.is_lossless());
    }

    #[test]
    fn test_libretube_subscription_gets_newpipe_defaults() {
        let source = LibreTubeRecords {
            subscriptions: vec![libretube::Subscription {
                channel_id: "UCaaaaaaaaaaaaaaaaaaaaaa".to_string(),
                name: "Channel".to_string(),
                avatar: None,
                verified: false,
            }],
            ..Default::default()
        };
        let (target, report) = libretube_to_newpipe(&source, 0);
        let sub = &target.subscriptions[0];
        assert_eq!(sub.url, "https://www.youtube.com/channel/UCaaaaaaaaaaaaaaaaaaaaaa");
        assert_eq!(sub.service_id, YOUTUBE_SERVICE_ID);
        assert_eq!(sub.notification_mode, 0);
        assert_eq!(sub.subscriber_count, None);
        assert!(report.is_lossless());
    }

    #[test]
    fn test_history_gets_ordered_synthetic_timestamps() {
        let video = |id: &str| libretube::Video {
            video_id: id.to_string(),
            title: None,
            upload_date: None,
            uploader: None,
            uploader_url: None,
            uploader_avatar: None,
            thumbnail_url: None,
            duration: None,
        };
        let source = LibreTubeRecords {
            history: vec![
                libretube::HistoryItem { video: video("aaaaaaaaaaa"), position_ms: None },
                libretube::HistoryItem { video: video("bbbbbbbbbbb"), position_ms: Some(5) },
                libretube::HistoryItem { video: video("ccccccccccc"), position_ms: None },
            ],
            ..Default::default()
        };
        let (target, _) = libretube_to_newpipe(&source, 10_000);
        let dates: Vec<i64> = target.history.iter().map(|h| h.access_date).collect();
        assert_eq!(dates, vec![9_998, 9_999, 10_000]);
        assert_eq!(target.history[1].progress_ms, Some(5));

        let stream = &target.history[0].stream;
        assert_eq!(stream.title, "");
        assert_eq!(stream.uploader, "");
        assert_eq!(stream.duration, 0);
        assert_eq!(stream.stream_type, DEFAULT_STREAM_TYPE);
    }

    #[test]
    fn test_round_trip_preserves_identifiers() {
        let source = NewPipeRecords {
            subscriptions: vec![newpipe::Subscription {
                service_id: 0,
                url: "https://www.youtube.com/channel/UCaaaaaaaaaaaaaaaaaaaaaa".to_string(),
                name: "A".to_string(),
                avatar_url: None,
                subscriber_count: None,
                description: None,
                notification_mode: 0,
            }],
            history: vec![newpipe::HistoryEntry {
                stream: np_stream("https://youtu.be/dQw4w9WgXcQ", 0),
                access_date: 7,
                repeat_count: 1,
                progress_ms: None,
            }],
            ..Default::default()
        };
        let (libretube, _) = newpipe_to_libretube(&source);
        let (back, _) = libretube_to_newpipe(&libretube, 100);
        assert_eq!(
            normalize_channel_id(&back.subscriptions[0].url),
            normalize_channel_id(&source.subscriptions[0].url)
        );
        assert_eq!(
            normalize_video_id(&back.history[0].stream.url),
            normalize_video_id(&source.history[0].stream.url)
        );
    }
}
