//! Domain models for the media carousel.

use crate::error::{MediaError, Result};
use bridge_traits::store::MediaDocument;
use serde::{Deserialize, Serialize};

/// Inclusive bounds for the shared slide duration, in seconds.
pub const SLIDE_DURATION_MIN_SECS: u32 = 5;
pub const SLIDE_DURATION_MAX_SECS: u32 = 45;

/// Dwell time used before the settings document has ever been published.
pub const SLIDE_DURATION_DEFAULT_SECS: u32 = 5;

/// Kind of media a carousel entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Infer the kind from an upload's MIME type.
    ///
    /// Returns `None` for anything outside the `image/*` / `video/*`
    /// allow-list; callers turn that into a validation error.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        if content_type.starts_with("image/") {
            Some(MediaKind::Image)
        } else if content_type.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Parse the wire form stored in the media document (`"image"`/`"video"`).
    pub fn from_wire(value: &str) -> Self {
        if value == "video" {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    /// Wire form stored in the media document.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// One entry of the canonical carousel list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub url: String,
    pub kind: MediaKind,
    pub file_name: String,
    /// Position in the carousel; canonical lists hold a contiguous 0-based
    /// permutation of these.
    pub order: u32,
}

impl MediaItem {
    /// Build the domain item from its wire document.
    pub fn from_document(doc: &MediaDocument) -> Self {
        Self {
            id: doc.id.clone(),
            url: doc.url.clone(),
            kind: MediaKind::from_wire(&doc.media_type),
            file_name: doc.file_name.clone(),
            order: doc.order,
        }
    }
}

/// One entry of the loop list: the canonical list concatenated with itself
/// so the carousel can scroll past its nominal end into a visually identical
/// duplicate before wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopItem {
    /// Synthetic per-render id distinguishing the two occurrences of the
    /// same underlying record: `"{media_id}-{loop_index}"`.
    pub sortable_id: String,
    pub item: MediaItem,
}

/// Build the loop list for a canonical list.
///
/// The result is always exactly twice as long as the input, and
/// `loop[k].item.id == loop[k mod n].item.id` for every `k`.
pub fn build_loop_list(items: &[MediaItem]) -> Vec<LoopItem> {
    items
        .iter()
        .chain(items.iter())
        .enumerate()
        .map(|(index, item)| LoopItem {
            sortable_id: format!("{}-{}", item.id, index),
            item: item.clone(),
        })
        .collect()
}

/// Recover the underlying media id from a sortable id by stripping the
/// positional suffix (everything after the final hyphen).
pub fn original_id(sortable_id: &str) -> &str {
    match sortable_id.rsplit_once('-') {
        Some((head, _)) => head,
        None => sortable_id,
    }
}

/// Classic array move: remove the element at `from` and reinsert it at `to`.
///
/// Out-of-range indices are a caller bug; the coordinator validates them
/// against the canonical list before calling.
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    let element = items.remove(from);
    items.insert(to, element);
}

/// Whether `order` fields form the contiguous 0-based permutation the
/// canonical list invariant demands. Items must already be sorted by order.
pub fn orders_are_contiguous(items: &[MediaItem]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(index, item)| item.order as usize == index)
}

/// The single shared settings record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideSettings {
    pub slide_duration_secs: u32,
}

impl SlideSettings {
    pub fn validate(&self) -> Result<()> {
        if (SLIDE_DURATION_MIN_SECS..=SLIDE_DURATION_MAX_SECS).contains(&self.slide_duration_secs) {
            Ok(())
        } else {
            Err(MediaError::InvalidSlideDuration {
                secs: self.slide_duration_secs,
                min: SLIDE_DURATION_MIN_SECS,
                max: SLIDE_DURATION_MAX_SECS,
            })
        }
    }
}

impl Default for SlideSettings {
    fn default() -> Self {
        Self {
            slide_duration_secs: SLIDE_DURATION_DEFAULT_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, order: u32) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            url: format!("https://blob/{}", id),
            kind: MediaKind::Image,
            file_name: format!("{}.png", id),
            order,
        }
    }

    #[test]
    fn test_kind_from_content_type() {
        assert_eq!(
            MediaKind::from_content_type("image/png"),
            Some(MediaKind::Image)
        );
        assert_eq!(
            MediaKind::from_content_type("video/mp4"),
            Some(MediaKind::Video)
        );
        assert_eq!(MediaKind::from_content_type("application/pdf"), None);
        assert_eq!(MediaKind::from_content_type("audio/mpeg"), None);
    }

    #[test]
    fn test_loop_list_is_double_and_aligned() {
        let items = vec![item("a", 0), item("b", 1), item("c", 2)];
        let looped = build_loop_list(&items);

        assert_eq!(looped.len(), items.len() * 2);
        for (k, entry) in looped.iter().enumerate() {
            assert_eq!(entry.item.id, looped[k % items.len()].item.id);
        }
    }

    #[test]
    fn test_loop_list_sortable_ids_are_unique() {
        let items = vec![item("a", 0), item("b", 1)];
        let looped = build_loop_list(&items);

        let mut ids: Vec<_> = looped.iter().map(|l| l.sortable_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), looped.len());
    }

    #[test]
    fn test_original_id_strips_positional_suffix() {
        assert_eq!(original_id("abc123-0"), "abc123");
        assert_eq!(original_id("abc123-5"), "abc123");
        // Backend ids may themselves contain hyphens; only the final
        // segment is the loop position.
        assert_eq!(original_id("550e8400-e29b-41d4-3"), "550e8400-e29b-41d4");
        assert_eq!(original_id("plain"), "plain");
    }

    #[test]
    fn test_loop_round_trip_through_sortable_ids() {
        let items = vec![item("x-1", 0), item("y-2", 1)];
        for entry in build_loop_list(&items) {
            assert_eq!(original_id(&entry.sortable_id), entry.item.id);
        }
    }

    #[test]
    fn test_array_move_matches_remove_and_reinsert() {
        let mut v = vec!["a", "b", "c", "d"];
        array_move(&mut v, 0, 2);
        assert_eq!(v, vec!["b", "c", "a", "d"]);

        let mut v = vec!["a", "b", "c", "d"];
        array_move(&mut v, 3, 0);
        assert_eq!(v, vec!["d", "a", "b", "c"]);

        let mut v = vec!["a", "b"];
        array_move(&mut v, 1, 1);
        assert_eq!(v, vec!["a", "b"]);
    }

    #[test]
    fn test_orders_are_contiguous() {
        assert!(orders_are_contiguous(&[item("a", 0), item("b", 1)]));
        assert!(!orders_are_contiguous(&[item("a", 0), item("b", 2)]));
        assert!(orders_are_contiguous(&[]));
    }

    #[test]
    fn test_slide_settings_bounds() {
        assert!(SlideSettings {
            slide_duration_secs: 5
        }
        .validate()
        .is_ok());
        assert!(SlideSettings {
            slide_duration_secs: 45
        }
        .validate()
        .is_ok());
        assert!(SlideSettings {
            slide_duration_secs: 4
        }
        .validate()
        .is_err());
        assert!(SlideSettings {
            slide_duration_secs: 46
        }
        .validate()
        .is_err());
        assert_eq!(SlideSettings::default().slide_duration_secs, 5);
    }

    #[test]
    fn test_from_document_infers_kind() {
        let doc = MediaDocument {
            id: "m1".into(),
            url: "https://blob/m1".into(),
            media_type: "video".into(),
            file_name: "clip.mp4".into(),
            order: 1,
            created_at: None,
        };
        let item = MediaItem::from_document(&doc);
        assert_eq!(item.kind, MediaKind::Video);
        assert_eq!(item.order, 1);
    }
}
