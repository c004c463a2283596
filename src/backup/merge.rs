// ABOUTME: Merge planning between an existing target record set and incoming records
// ABOUTME: Decides what to insert so that merges deduplicate and never remove anything

use std::collections::{HashMap, HashSet};
use std::fmt;

/// A subscription, identified by its normalized channel id
pub trait SubscriptionRecord {
    fn channel_key(&self) -> String;
}

/// A named group of subscriptions
///
/// Members are normalized channel ids.
pub trait GroupRecord {
    fn name(&self) -> &str;
    fn members(&self) -> &[String];
    fn add_member(&mut self, channel_key: String);
}

/// Anything that refers to one video
pub trait VideoRecord {
    fn video_key(&self) -> String;
}

pub trait PlaylistRecord {
    type Item: VideoRecord + Clone;

    fn name(&self) -> &str;
    fn items(&self) -> &[Self::Item];
    fn push_item(&mut self, item: Self::Item);
}

/// The record set of one backup format
pub trait RecordSet {
    type Subscription: SubscriptionRecord + Clone;
    type Group: GroupRecord + Clone;
    type Playlist: PlaylistRecord + Clone;
    type History: VideoRecord + Clone;

    fn subscriptions(&self) -> &[Self::Subscription];
    fn groups(&self) -> &[Self::Group];
    fn playlists(&self) -> &[Self::Playlist];
    fn history(&self) -> &[Self::History];
}

pub type ItemOf<R> = <<R as RecordSet>::Playlist as PlaylistRecord>::Item;

/// Members to add to a group that already exists in the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupExtension {
    pub group: String,
    pub members: Vec<String>,
}

/// Items to append to a playlist that already exists in the target
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistExtension<I> {
    pub playlist: String,
    pub items: Vec<I>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub subscriptions_added: usize,
    pub subscriptions_skipped: usize,
    pub groups_added: usize,
    pub groups_extended: usize,
    pub group_members_added: usize,
    /// Members dropped by the writer because the target cannot hold them
    pub group_members_skipped: usize,
    pub playlists_added: usize,
    pub playlists_extended: usize,
    pub playlist_items_added: usize,
    pub playlist_items_skipped: usize,
    pub history_added: usize,
    pub history_skipped: usize,
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "subscriptions +{} (skipped {}), groups +{} (extended {} with {} members), \
             group members skipped {}, playlists +{} (extended {}), playlist items +{} (skipped {}), history +{} (skipped {})",
            self.subscriptions_added,
            self.subscriptions_skipped,
            self.groups_added,
            self.groups_extended,
            self.group_members_added,
            self.group_members_skipped,
            self.playlists_added,
            self.playlists_extended,
            self.playlist_items_added,
            self.playlist_items_skipped,
            self.history_added,
            self.history_skipped
        )
    }
}

/// Everything a writer has to insert into the target image
pub struct MergePlan<R: RecordSet> {
    pub subscriptions: Vec<R::Subscription>,
    pub groups: Vec<R::Group>,
    pub group_extensions: Vec<GroupExtension>,
    pub playlists: Vec<R::Playlist>,
    pub playlist_extensions: Vec<PlaylistExtension<ItemOf<R>>>,
    pub history: Vec<R::History>,
    pub stats: MergeStats,
}

impl<R: RecordSet> MergePlan<R> {
    fn empty() -> Self {
        Self {
            subscriptions: Vec::new(),
            groups: Vec::new(),
            group_extensions: Vec::new(),
            playlists: Vec::new(),
            playlist_extensions: Vec::new(),
            history: Vec::new(),
            stats: MergeStats::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
            && self.groups.is_empty()
            && self.group_extensions.is_empty()
            && self.playlists.is_empty()
            && self.playlist_extensions.is_empty()
            && self.history.is_empty()
    }
}

/// Where an incoming playlist's items end up
enum PlaylistSlot {
    Existing(usize),
    Planned(usize),
}

/// Plan the inserts that merge `incoming` into `existing`
///
/// Rules:
/// - subscriptions match by normalized channel id; the existing one wins
/// - groups match by exact name; unmatched names become new groups, matched
///   ones only gain the members they lack
/// - playlists match by name; matched ones only gain the items (by
///   normalized video id) they lack, in source order
/// - history entries match by normalized video id
///
/// Converting is merging into an empty record set.
pub fn plan_merge<R: RecordSet>(existing: &R, incoming: &R) -> MergePlan<R> {
    let mut plan = MergePlan::empty();

    plan_subscriptions(existing, incoming, &mut plan);
    plan_groups(existing, incoming, &mut plan);
    plan_playlists(existing, incoming, &mut plan);
    plan_history(existing, incoming, &mut plan);

    tracing::debug!("Merge plan: {}", plan.stats);
    plan
}

fn plan_subscriptions<R: RecordSet>(existing: &R, incoming: &R, plan: &mut MergePlan<R>) {
    let mut known: HashSet<String> = existing
        .subscriptions()
        .iter()
        .map(SubscriptionRecord::channel_key)
        .collect();

    for subscription in incoming.subscriptions() {
        if known.insert(subscription.channel_key()) {
            plan.subscriptions.push(subscription.clone());
            plan.stats.subscriptions_added += 1;
        } else {
            plan.stats.subscriptions_skipped += 1;
        }
    }
}

fn plan_groups<R: RecordSet>(existing: &R, incoming: &R, plan: &mut MergePlan<R>) {
    let mut existing_members: HashMap<&str, HashSet<String>> = HashMap::new();
    for group in existing.groups() {
        existing_members
            .entry(group.name())
            .or_default()
            .extend(group.members().iter().cloned());
    }

    let mut extension_index: HashMap<String, usize> = HashMap::new();
    let mut planned_index: HashMap<String, usize> = HashMap::new();

    for group in incoming.groups() {
        let name = group.name();

        if let Some(members) = existing_members.get_mut(name) {
            let slot = *extension_index.entry(name.to_string()).or_insert_with(|| {
                plan.group_extensions.push(GroupExtension {
                    group: name.to_string(),
                    members: Vec::new(),
                });
                plan.group_extensions.len() - 1
            });
            for member in group.members() {
                if members.insert(member.clone()) {
                    plan.group_extensions[slot].members.push(member.clone());
                }
            }
        } else if let Some(&slot) = planned_index.get(name) {
            let planned = &mut plan.groups[slot];
            for member in group.members() {
                if !planned.members().contains(member) {
                    planned.add_member(member.clone());
                }
            }
        } else {
            planned_index.insert(name.to_string(), plan.groups.len());
            plan.groups.push(group.clone());
        }
    }

    plan.group_extensions.retain(|ext| !ext.members.is_empty());
    plan.stats.groups_added = plan.groups.len();
    plan.stats.groups_extended = plan.group_extensions.len();
    plan.stats.group_members_added = plan
        .group_extensions
        .iter()
        .map(|ext| ext.members.len())
        .sum();
}

fn plan_playlists<R: RecordSet>(existing: &R, incoming: &R, plan: &mut MergePlan<R>) {
    // Video keys per playlist name, for existing and planned playlists alike
    let mut keys: HashMap<String, HashSet<String>> = HashMap::new();
    let mut slots: HashMap<String, PlaylistSlot> = HashMap::new();

    for playlist in existing.playlists() {
        // Duplicate names in the target: the first playlist is the match
        if keys.contains_key(playlist.name()) {
            continue;
        }
        keys.insert(
            playlist.name().to_string(),
            playlist.items().iter().map(VideoRecord::video_key).collect(),
        );
    }

    for playlist in incoming.playlists() {
        let name = playlist.name().to_string();

        let Some(known) = keys.get_mut(&name) else {
            keys.insert(
                name.clone(),
                playlist.items().iter().map(VideoRecord::video_key).collect(),
            );
            slots.insert(name, PlaylistSlot::Planned(plan.playlists.len()));
            plan.playlists.push(playlist.clone());
            plan.stats.playlist_items_added += playlist.items().len();
            continue;
        };

        let slot = slots.entry(name.clone()).or_insert_with(|| {
            plan.playlist_extensions.push(PlaylistExtension {
                playlist: name.clone(),
                items: Vec::new(),
            });
            PlaylistSlot::Existing(plan.playlist_extensions.len() - 1)
        });

        for item in playlist.items() {
            if !known.insert(item.video_key()) {
                plan.stats.playlist_items_skipped += 1;
                continue;
            }
            plan.stats.playlist_items_added += 1;
            match slot {
                PlaylistSlot::Existing(i) => plan.playlist_extensions[*i].items.push(item.clone()),
                PlaylistSlot::Planned(i) => plan.playlists[*i].push_item(item.clone()),
            }
        }
    }

    plan.playlist_extensions.retain(|ext| !ext.items.is_empty());
    plan.stats.playlists_added = plan.playlists.len();
    plan.stats.playlists_extended = plan.playlist_extensions.len();
}

fn plan_history<R: RecordSet>(existing: &R, incoming: &R, plan: &mut MergePlan<R>) {
    let mut known: HashSet<String> = existing.history().iter().map(VideoRecord::video_key).collect();

    for entry in incoming.history() {
        if known.insert(entry.video_key()) {
            plan.history.push(entry.clone());
            plan.stats.history_added += 1;
        } else {
            plan.stats.history_skipped += 1;
        }
    }
}
