//! Free-text hint extraction for the chat endpoint.
//!
//! Pattern matching over English, Japanese and Chinese keywords.
//! Deliberately permissive: over-matching only tightens the candidate
//! pool (and is subject to relaxation downstream), while a missed
//! pattern degrades to "no constraint". Pure and infallible by
//! construction; an absent signal is an absent field, never an error.

use meizan_core::{Hints, Season};
use once_cell::sync::Lazy;
use regex::Regex;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: Lazy<Regex> = Lazy::new(|| Regex::new($re).expect("valid pattern"));
    };
}

pattern!(TOKYO, "新宿|東京|tokyo|shinjuku");
pattern!(OSAKA, "大阪|osaka");
// Travel-time / proximity qualifiers that turn a city mention into a
// "start from this city" signal rather than e.g. a region request.
pattern!(THREE_HOURS, r"3\s*个?小时|3\s*hours|三小时|3\s*時間");
pattern!(SHINKANSEN, "新幹線|新干线|shinkansen");
pattern!(NEARBY, "near|close to|day trip|近く|近郊|周辺|日帰り|附近|周边");

pattern!(SPRING, "春|spring|3月|4月|5月");
pattern!(SUMMER, "夏|summer|6月|7月|8月");
pattern!(AUTUMN, "秋|autumn|fall|红叶|紅葉|9月|10月|11月");
pattern!(WINTER, "冬|winter|雪|12月|1月|2月");

pattern!(STARS_5, "5\\s*星|五星");
pattern!(STARS_4, "4\\s*星|四星");
pattern!(STARS_3, "3\\s*星|三星");
pattern!(STARS_2, "2\\s*星|二星|两星");
pattern!(STARS_1, "1\\s*星|一星");

static REGION_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("九州|kyushu", "九州"),
        ("北海道|hokkaido", "北海道"),
        ("東北|东北|tohoku", "東北"),
        ("関東|关东|kanto", "関東"),
        ("中部|chubu", "中部"),
        ("関西|关西|kansai", "関西"),
        (r"中国地方|中国地区|\bchugoku\b", "中国"),
        ("四国|shikoku", "四国"),
    ]
    .into_iter()
    .map(|(re, label)| (Regex::new(re).expect("valid pattern"), label))
    .collect()
});

/// Length of the longest consecutive run of `★` in the text.
fn longest_star_run(text: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '★' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

fn star_hints(text: &str) -> Vec<String> {
    let run = longest_star_run(text);
    let numeral = [&STARS_1, &STARS_2, &STARS_3, &STARS_4, &STARS_5];
    let mut out = Vec::new();
    for n in (1..=5).rev() {
        // A run of N glyphs also matches every shorter glyph pattern;
        // the selector treats the list as an allow-list, so widening it
        // this way only loosens the constraint.
        if run >= n || numeral[n - 1].is_match(text) {
            out.push("★".repeat(n));
        }
    }
    out
}

fn season_hint(text: &str) -> Option<Season> {
    // Checked in fixed order with later matches winning, so mixed
    // mentions ("from summer into autumn") resolve to the later season.
    let mut season = None;
    if SPRING.is_match(text) {
        season = Some(Season::Spring);
    }
    if SUMMER.is_match(text) {
        season = Some(Season::Summer);
    }
    if AUTUMN.is_match(text) {
        season = Some(Season::Autumn);
    }
    if WINTER.is_match(text) {
        season = Some(Season::Winter);
    }
    season
}

fn region_hints(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (re, label) in REGION_PATTERNS.iter() {
        if re.is_match(text) && !out.iter().any(|r| r == label) {
            out.push((*label).to_string());
        }
    }
    out
}

/// Mine soft hints from the latest user-authored message.
pub fn extract(text: &str) -> Hints {
    let t = text.to_lowercase();

    let near_tokyo = TOKYO.is_match(&t) && (THREE_HOURS.is_match(&t) || NEARBY.is_match(&t));
    let near_osaka = OSAKA.is_match(&t) && (SHINKANSEN.is_match(&t) || NEARBY.is_match(&t));

    let stars = star_hints(&t);
    let regions = region_hints(&t);

    Hints {
        near_tokyo,
        near_osaka,
        season: season_hint(&t),
        difficulty_stars: (!stars.is_empty()).then_some(stars),
        regions: (!regions.is_empty()).then_some(regions),
    }
}
