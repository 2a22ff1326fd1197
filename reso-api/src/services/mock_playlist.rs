//! Offline playlist generator
//!
//! Builds plausible-looking playlists from small per-genre tables. Used when
//! no LLM is configured and whenever the LLM exchange fails.

use super::generator::{genre_phrase, GeneratedPlaylist, GeneratedTrack, PlaylistGenerationParams};
use rand::seq::SliceRandom;
use rand::Rng;

const DEFAULT_MOOD: &str = "energetic";
const DEFAULT_GENRE: &str = "Pop";
const DEFAULT_ERA: &str = "2020s";
/// Year used when the era does not name a decade
const FALLBACK_YEAR: &str = "2022";

struct GenreData {
    artists: &'static [&'static str],
    albums: &'static [&'static str],
    title_prefixes: &'static [&'static str],
}

const POP: GenreData = GenreData {
    artists: &["Taylor Swift", "Ariana Grande", "The Weeknd", "Dua Lipa", "Harry Styles", "Olivia Rodrigo"],
    albums: &["Midnights", "Positions", "After Hours", "Future Nostalgia", "Fine Line", "SOUR"],
    title_prefixes: &["Love", "Dance", "Sweet", "Night", "Summer", "Heart"],
};

const HIP_HOP: GenreData = GenreData {
    artists: &["Kendrick Lamar", "Drake", "J. Cole", "Megan Thee Stallion", "Tyler, The Creator"],
    albums: &[
        "Mr. Morale & The Big Steppers",
        "Certified Lover Boy",
        "The Off-Season",
        "Good News",
        "CALL ME IF YOU GET LOST",
    ],
    title_prefixes: &["Flow", "Beat", "Rhythm", "City", "Dream", "Move"],
};

const ROCK: GenreData = GenreData {
    artists: &["Arctic Monkeys", "Tame Impala", "The Killers", "Twenty One Pilots", "Imagine Dragons"],
    albums: &["AM", "Currents", "Imploding the Mirage", "Scaled and Icy", "Mercury – Act 1"],
    title_prefixes: &["Electric", "Wild", "Storm", "Midnight", "Epic", "Freedom"],
};

const ELECTRONIC: GenreData = GenreData {
    artists: &["Calvin Harris", "Daft Punk", "Disclosure", "Flume", "ODESZA"],
    albums: &[
        "Funk Wav Bounces Vol. 1",
        "Random Access Memories",
        "Energy",
        "Palaces",
        "A Moment Apart",
    ],
    title_prefixes: &["Pulse", "Wave", "Digital", "Neon", "Cyber", "Space"],
};

const TITLE_SUFFIXES: &[&str] = &["Nights", "Dreams", "Love", "Life", "Time", "Soul", "Heart"];
const PRODUCTION: &[&str] = &["catchy", "melodic", "rhythmic", "pulsating", "smooth"];
const LYRICS: &[&str] = &["emotional", "upbeat", "chill", "energetic", "thoughtful"];

fn genre_data(genre: &str) -> &'static GenreData {
    match genre {
        "Hip-Hop" => &HIP_HOP,
        "Rock" => &ROCK,
        "Electronic" => &ELECTRONIC,
        _ => &POP,
    }
}

pub fn mood_description(mood: &str) -> &'static str {
    match mood {
        "energetic" => "high-energy",
        "chill" => "relaxed",
        "melancholy" => "introspective",
        "happy" => "uplifting",
        "focus" => "concentration-enhancing",
        "romantic" => "intimate",
        _ => "distinctive",
    }
}

pub fn era_description(era: &str) -> &'static str {
    match era {
        "60s" => "classic 1960s",
        "70s" => "iconic 1970s",
        "80s" => "nostalgic 1980s",
        "90s" => "golden era 1990s",
        "00s" => "early 2000s",
        "10s" => "2010s",
        "20s" => "contemporary",
        "mix" => "cross-era",
        _ => "contemporary",
    }
}

fn cover_colors(mood: &str) -> &'static str {
    match mood {
        "energetic" => "vibrant",
        "chill" => "cool",
        "melancholy" => "muted",
        _ => "warm",
    }
}

/// Mid-decade year for eras like "2010s" or "80s"
pub fn year_for_era(era: &str) -> String {
    let Some(decade) = era.strip_suffix('s') else {
        return FALLBACK_YEAR.to_string();
    };
    if !decade.ends_with('0') || !decade.chars().all(|c| c.is_ascii_digit()) {
        return FALLBACK_YEAR.to_string();
    }

    match decade.len() {
        4 => format!("{}5", &decade[..3]),
        2 => {
            let century = if decade.as_bytes()[0] >= b'3' { "19" } else { "20" };
            format!("{}{}5", century, &decade[..1])
        }
        _ => FALLBACK_YEAR.to_string(),
    }
}

fn pick<'a, R: Rng + ?Sized>(items: &[&'a str], rng: &mut R) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

pub fn generate_mock_playlist<R: Rng + ?Sized>(
    params: &PlaylistGenerationParams,
    rng: &mut R,
) -> GeneratedPlaylist {
    let mood = params
        .mood
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MOOD);
    let era = params
        .era
        .as_deref()
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_ERA);
    let genres: Vec<String> = params
        .genres()
        .map(<[String]>::to_vec)
        .unwrap_or_else(|| vec![DEFAULT_GENRE.to_string()]);

    let primary_genre = genres[0].clone();
    let data = genre_data(&primary_genre);
    let year = year_for_era(era);

    let mut track_genres = vec![primary_genre.clone()];
    track_genres.extend(genres.get(1).cloned());

    let tracks: Vec<GeneratedTrack> = (0..params.track_count())
        .map(|_| {
            let artist = pick(data.artists, rng);
            GeneratedTrack {
                title: format!(
                    "{} {}",
                    pick(data.title_prefixes, rng),
                    pick(TITLE_SUFFIXES, rng)
                ),
                artist: artist.to_string(),
                album: Some(pick(data.albums, rng).to_string()),
                year: Some(year.clone()),
                explanation: format!(
                    "This {} track by {} perfectly captures the {} vibe of the playlist with its {} production and {} lyrics.",
                    primary_genre.to_lowercase(),
                    artist,
                    mood,
                    pick(PRODUCTION, rng),
                    pick(LYRICS, rng)
                ),
                genres: Some(track_genres.clone()),
            }
        })
        .collect();

    let mood_adjective = mood_description(mood);
    let era_text = era_description(era);
    let genre_list = genres.join(", ");

    GeneratedPlaylist {
        name: params.name.clone(),
        description: params
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| {
                format!("A {} playlist featuring {} {}", mood_adjective, era_text, genre_list)
            }),
        explanation: format!(
            "This playlist brings together {} {} tracks in the {} from the {} era, creating a \
             cohesive journey through sound that captures the essence of {} energy. Each track \
             was selected to maintain the flow while offering enough variety to keep the \
             listener engaged.",
            tracks.len(),
            mood_adjective,
            genre_phrase(&genres),
            era_text,
            mood
        ),
        cover_description: Some(format!(
            "An abstract image with {} colors representing the {} nature of the playlist, \
             potentially featuring elements of {} {} culture.",
            cover_colors(mood),
            mood_adjective,
            era_text,
            primary_genre.to_lowercase()
        )),
        tracks,
    }
}
