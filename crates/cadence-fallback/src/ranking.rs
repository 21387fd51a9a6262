//! Deterministic match ranking over a source's search results, per the
//! design's four-tier priority rule.

use cadence_upstream::Song;

/// Picks the best match for `(target_name, target_artist)` among
/// `candidates`, in upstream-returned order. Priority, first non-empty
/// bucket wins:
///
/// 1. Case-folded exact name match, and (if `target_artist` is non-empty)
///    the candidate's artist contains it, case-folded.
/// 2. Case-folded exact name match, any artist.
/// 3. Case-folded substring of the name.
/// 4. The first candidate, as a last resort.
pub fn best_match<'a>(
    candidates: &'a [Song],
    target_name: &str,
    target_artist: &str,
) -> Option<&'a Song> {
    if candidates.is_empty() {
        return None;
    }

    let target_name = target_name.to_lowercase();
    let target_artist = target_artist.to_lowercase();

    if !target_artist.is_empty() {
        if let Some(song) = candidates.iter().find(|song| {
            song.name.to_lowercase() == target_name
                && song.artist.to_lowercase().contains(&target_artist)
        }) {
            return Some(song);
        }
    }

    if let Some(song) = candidates
        .iter()
        .find(|song| song.name.to_lowercase() == target_name)
    {
        return Some(song);
    }

    if let Some(song) = candidates
        .iter()
        .find(|song| song.name.to_lowercase().contains(&target_name))
    {
        return Some(song);
    }

    candidates.first()
}
