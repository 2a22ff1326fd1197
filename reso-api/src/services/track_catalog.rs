//! Fixed genre to Spotify track id catalogue used by playlist generation

/// Most tracks a generated playlist receives
pub const MAX_PLAYLIST_TRACKS: usize = 20;

const CATALOG: &[(&str, &[&str])] = &[
    ("Pop", &["5Z01UMMf7V1o0MzF86s6WJ", "7KXjTSCq5nL1LoYtL7XAwS", "0e7ipj03S05BNilyu5bRzt"]),
    ("Rock", &["4cluDES4hQEUhmXj6TXkSo", "3ZrRvdLDTzVxcMcyqErHfE", "7ouMYWpwJ422jRcDASZB7P"]),
    ("Hip Hop", &["7LR85XLWw2yXqKBSI5brbG", "2mfUa8bLs2s5N4VaqJZ4lZ", "1zi7xx7UVEFkmKfv06H8x0"]),
    ("R&B", &["0GO8y8jQk1PkHzS31d699N", "4VXIryQMWpIdGgYR4TrjT1", "5dn6QANKbf76pANGVubKlw"]),
    ("Electronic", &["7ImZeAqaqrSYZQyXGNUU7Z", "05wIrZSwuaVWhcv5FfqeH0", "0DiDStADDVh3SvAsoJAFMk"]),
    ("Jazz", &["2bgTY4UwhfBYhGT4HUYStN", "74X1epeRfdVdAkp1vZiTK8", "5mVfkKRwdjDzpP5IVWTgAD"]),
    ("Classical", &["1JSTJqkT5qHq8MDJnJbRE1", "7G7tgvGJDQQQ19EGXpFRiQ", "6JdX9MGiAMPLQ5N343LEX6"]),
    ("Country", &["1c8gk2PeTE04A1pHN0YYRs", "55S2PQgSMYAhgoTCcGCDlV", "5MwynWK9s4hlyKHqzpIv29"]),
    ("Folk", &["1r1fPuhj9H4VdXr7mNJ0r5", "0hDQV9X1Da5JrwhK8Qch3S", "1o1Rlg42UCf2r88NvPPSrN"]),
    ("Indie", &["0tQ9vBYpldCuikPsbgOVKA", "3qQbCzHBycnDpGskqOWY0E", "4rZLdXVDBVXMJyJNSp9Nqy"]),
];

/// Track ids for one genre (exact name match)
pub fn tracks_for_genre(genre: &str) -> &'static [&'static str] {
    CATALOG
        .iter()
        .find(|(name, _)| *name == genre)
        .map(|(_, ids)| *ids)
        .unwrap_or(&[])
}

/// Track ids for `genres` in order, without duplicates, capped at
/// [`MAX_PLAYLIST_TRACKS`]
pub fn select_tracks(genres: &[String]) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for id in genres.iter().flat_map(|g| tracks_for_genre(g)) {
        if selected.len() == MAX_PLAYLIST_TRACKS {
            break;
        }
        if !selected.iter().any(|s| s == id) {
            selected.push(id.to_string());
        }
    }
    selected
}
