use crate::harvest::segments::{MediaKind, QualityKey, StreamSegment};

/// Segments of one rendition, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentGroup {
    pub kind: MediaKind,
    pub quality: QualityKey,
    pub segments: Vec<StreamSegment>,
}

impl SegmentGroup {
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.url.as_str())
    }
}

/// Partition segments into (kind, quality) buckets, ordered by first appearance.
pub fn group_by_quality(segments: &[StreamSegment]) -> Vec<SegmentGroup> {
    let mut groups: Vec<SegmentGroup> = Vec::new();

    for segment in segments {
        match groups
            .iter_mut()
            .find(|g| g.kind == segment.kind && g.quality == segment.quality)
        {
            Some(group) => group.segments.push(segment.clone()),
            None => groups.push(SegmentGroup {
                kind: segment.kind,
                quality: segment.quality,
                segments: vec![segment.clone()],
            }),
        }
    }

    groups
}

/// The groups chosen for reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    pub video: &'a SegmentGroup,
    pub audio: Option<&'a SegmentGroup>,
}

/// Pick the video rendition with the largest pixel area and the first audio rendition.
///
/// Video groups without a parseable resolution only win when nothing else exists.
/// Returns `None` when no video was captured.
pub fn select_best(groups: &[SegmentGroup]) -> Option<Selection<'_>> {
    let video = groups
        .iter()
        .filter(|g| g.kind == MediaKind::Video)
        .fold(None::<&SegmentGroup>, |best, g| match best {
            None => Some(g),
            Some(b) if g.quality.pixel_area() > b.quality.pixel_area() => Some(g),
            Some(b) => Some(b),
        })?;

    let audio = groups.iter().find(|g| g.kind == MediaKind::Audio);

    Some(Selection { video, audio })
}
