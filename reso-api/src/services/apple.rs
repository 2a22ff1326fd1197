//! Apple Music link helpers

use super::spotify::spotify_track_url;
use super::streaming::is_ios;

pub const DEFAULT_COUNTRY: &str = "us";

pub fn apple_track_url(track_id: &str, country: &str) -> String {
    format!("https://music.apple.com/{}/song/{}", country, track_id)
}

pub fn apple_playlist_url(playlist_id: &str, country: &str) -> String {
    format!("https://music.apple.com/{}/playlist/{}", country, playlist_id)
}

pub fn apple_track_app_link(track_id: &str) -> String {
    format!("music://song/{}", track_id)
}

pub fn apple_playlist_app_link(playlist_id: &str) -> String {
    format!("music://playlist/{}", playlist_id)
}

/// Best single link for a track on the requesting device
///
/// iOS with an Apple id opens the Music app; otherwise Spotify web, then
/// Apple web, then `"#"`.
pub fn optimized_music_link(
    apple_music_id: Option<&str>,
    spotify_id: Option<&str>,
    user_agent: &str,
) -> String {
    let apple_music_id = apple_music_id.filter(|id| !id.is_empty());
    let spotify_id = spotify_id.filter(|id| !id.is_empty());

    match (apple_music_id, spotify_id) {
        (Some(apple), _) if is_ios(user_agent) => apple_track_app_link(apple),
        (_, Some(spotify)) => spotify_track_url(spotify),
        (Some(apple), None) => apple_track_url(apple, DEFAULT_COUNTRY),
        (None, None) => "#".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)";
    const LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64)";

    #[test]
    fn test_urls() {
        assert_eq!(apple_track_url("123", "gb"), "https://music.apple.com/gb/song/123");
        assert_eq!(
            apple_playlist_url("pl.1", DEFAULT_COUNTRY),
            "https://music.apple.com/us/playlist/pl.1"
        );
        assert_eq!(apple_track_app_link("123"), "music://song/123");
        assert_eq!(apple_playlist_app_link("pl.1"), "music://playlist/pl.1");
    }

    #[test]
    fn test_optimized_link_precedence() {
        assert_eq!(optimized_music_link(Some("123"), Some("abc"), IPAD), "music://song/123");
        assert_eq!(
            optimized_music_link(Some("123"), Some("abc"), LINUX),
            "https://open.spotify.com/track/abc"
        );
        assert_eq!(
            optimized_music_link(Some("123"), None, LINUX),
            "https://music.apple.com/us/song/123"
        );
        assert_eq!(
            optimized_music_link(None, Some("abc"), IPAD),
            "https://open.spotify.com/track/abc"
        );
        assert_eq!(optimized_music_link(None, None, IPAD), "#");
        assert_eq!(optimized_music_link(Some(""), None, LINUX), "#");
    }
}
