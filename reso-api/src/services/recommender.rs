//! Daily recommendation engine
//!
//! Picks songs sharing a genre with the user's favourites, tops up with the
//! most played songs, and never repeats a song already recommended to the
//! same user.

use crate::db::{profiles, recommendations, songs};
use crate::db::recommendations::RecommendedSong;
use rand::seq::SliceRandom;
use rand::Rng;
use reso_common::db::Song;
use reso_common::{LogArea, Result};
use sqlx::SqlitePool;
use tracing::debug;

pub const EXPLANATION_TEMPLATES: &[&str] = &[
    "Based on your interest in {genre}",
    "Similar to artists you enjoy",
    "Popular in genres you like",
    "Trending in {genre}",
    "Featured in our {genre} collection",
    "Matches your listening patterns",
    "Recommended by listeners with similar taste",
];

/// Random template with `{genre}` filled from the song's genres
pub fn explanation_for<R: Rng + ?Sized>(song: &Song, rng: &mut R) -> String {
    let genre = song
        .genres
        .choose(rng)
        .map(String::as_str)
        .unwrap_or("music");
    let template = EXPLANATION_TEMPLATES
        .choose(rng)
        .copied()
        .unwrap_or(EXPLANATION_TEMPLATES[0]);
    template.replace("{genre}", genre)
}

/// Up to `limit` songs the user has not been recommended yet
pub async fn select_songs(pool: &SqlitePool, user_id: &str, limit: i64) -> Result<Vec<Song>> {
    let genres = profiles::favorite_genres(pool, user_id).await?;

    let mut selected = songs::find_unrecommended_in_genres(pool, user_id, &genres, limit).await?;
    let genre_matches = selected.len();

    if (selected.len() as i64) < limit {
        let exclude: Vec<String> = selected.iter().map(|s| s.id.clone()).collect();
        let fill = songs::find_popular_unrecommended(
            pool,
            user_id,
            &exclude,
            limit - selected.len() as i64,
        )
        .await?;
        selected.extend(fill);
    }

    debug!(
        area = %LogArea::ApiRecommendations,
        user_id,
        genre_matches,
        total = selected.len(),
        "Selected recommendation candidates"
    );

    Ok(selected)
}

/// Select, explain and persist a fresh batch of recommendations
pub async fn generate_recommendations(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<RecommendedSong>> {
    let selected = select_songs(pool, user_id, limit).await?;

    let explained: Vec<(Song, String)> = {
        let mut rng = rand::thread_rng();
        selected
            .into_iter()
            .map(|song| {
                let explanation = explanation_for(&song, &mut rng);
                (song, explanation)
            })
            .collect()
    };

    let mut saved = Vec::with_capacity(explained.len());
    for (song, explanation) in explained {
        let recommendation =
            recommendations::insert_recommendation(pool, user_id, &song.id, &explanation).await?;
        saved.push(RecommendedSong {
            recommendation,
            song,
        });
    }

    Ok(saved)
}
